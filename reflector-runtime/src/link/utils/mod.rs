pub mod task_park;
