pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod transport;

pub use error::SyncError;
pub use services::{SendOutcome, SyncController, SyncEvent, SyncView};
