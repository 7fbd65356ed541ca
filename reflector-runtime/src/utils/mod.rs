/// Helpers for assembling a pipeline with its I/O channels and driving it
/// on a tokio runtime.
pub mod runner;
