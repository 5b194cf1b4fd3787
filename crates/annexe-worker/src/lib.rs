//! Lifecycle notification worker for the Annexe backend.

pub mod error;
pub mod notifier;

pub use error::{WorkerError, WorkerResult};
pub use notifier::Notifier;
