//! Transactional mail for the Annexe backend.
//!
//! Account lifecycle mail (verification, welcome, password reset) and
//! auction notifications (started, ended, winner) rendered from inline
//! templates and delivered through an HTTP mail provider.

pub mod client;
pub mod error;
pub mod templates;
pub mod types;

pub use client::{MailClient, MailConfig};
pub use error::{MailError, MailResult};
