pub mod app;
pub mod clock;
pub mod error;
pub mod idea_manager;
pub mod ids;
pub mod state_store;
pub mod sync;
pub mod task_manager;
pub mod timer_runtime;

#[cfg(test)]
pub(crate) mod test_support;
