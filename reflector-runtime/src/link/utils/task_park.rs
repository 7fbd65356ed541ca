//! A task_park is a cache for task handles shared by the two sides of a
//! link. A task can store its waker there before sleeping and expect the
//! other side to wake it when the blocker has been cleared. The ingressor
//! and egressor of a `QueueLink`, for instance, both sleep when they find
//! the channel joining them full or, respectively, empty; each relies on the
//! other to call `wake()` through the task_park once it has made progress.
//! The `Dead` state prevents one side from sleeping when the other has
//! dropped and can no longer awaken it.

use crossbeam::atomic::AtomicCell;
use futures::task;
use std::sync::Arc;

/// The state machine of a task_park.
///
/// `Dead`: one side of the link has dropped; the task_park can no longer be
/// relied upon, and a task attempting to park must self-wake instead.
///
/// `Empty`: no task is currently parked.
///
/// `Parked`: a waker is parked here; the standard way to sleep.
///
/// `IndirectParked`: an atomic reference to a waker parked in several
/// task_parks at once. Used by the priority join egressor, which sleeps on
/// both of its ingress channels but must only be woken once; the first
/// ingressor to enqueue swaps a `None` into the shared cell, so later
/// ingressors do not over-schedule the egressor.
pub enum TaskParkState {
    Dead,
    Empty,
    Parked(task::Waker),
    IndirectParked(Arc<AtomicCell<Option<task::Waker>>>),
}

/// Swaps in the provided TaskParkState, waking any task found parked.
/// Returns `true` if the provided state was parked, ie the task_park is not
/// dead.
fn swap_and_wake(task_park: &Arc<AtomicCell<TaskParkState>>, swap: TaskParkState) -> bool {
    match task_park.swap(swap) {
        TaskParkState::Dead => {
            task_park.store(TaskParkState::Dead);
            false
        }
        TaskParkState::Empty => true,
        TaskParkState::Parked(task) => {
            task.wake();
            true
        }
        TaskParkState::IndirectParked(task) => {
            if let Some(task) = task.swap(None) {
                task.wake();
            }
            true
        }
    }
}

/// Wakes the task parked here, if any, without parking the caller.
pub fn unpark_and_wake(task_park: &Arc<AtomicCell<TaskParkState>>) {
    swap_and_wake(task_park, TaskParkState::Empty);
}

/// Wakes the task parked here, if any, and parks the caller's waker in its
/// place. Use when the current task is about to sleep.
pub fn park_and_wake(task_park: &Arc<AtomicCell<TaskParkState>>, task: task::Waker) {
    if !swap_and_wake(task_park, TaskParkState::Parked(task.clone())) {
        task.wake();
    }
}

/// Like `park_and_wake`, but parks a shared handle to the caller's waker so
/// it may reside in several task_parks without over-notification. Returns
/// `false` if this task_park is dead.
pub fn indirect_park_and_wake(
    task_park: &Arc<AtomicCell<TaskParkState>>,
    task: Arc<AtomicCell<Option<task::Waker>>>,
) -> bool {
    swap_and_wake(task_park, TaskParkState::IndirectParked(task))
}

/// Wakes the task parked here, if any, and marks the task_park `Dead`. Use
/// when the caller is dropping and will not be able to awaken peers in the
/// future.
pub fn die_and_wake(task_park: &Arc<AtomicCell<TaskParkState>>) {
    swap_and_wake(task_park, TaskParkState::Dead);
}
