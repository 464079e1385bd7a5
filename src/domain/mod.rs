pub mod display;
pub mod error;
pub mod models;
pub mod tasks;
pub mod timer;
