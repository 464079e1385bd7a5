pub mod config;
pub mod credential_store;
pub mod document_store;
pub mod error;
pub mod logging;
