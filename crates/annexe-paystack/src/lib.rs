//! Paystack integration for the Annexe backend.
//!
//! Bank listing, account resolution and subscription creation against
//! the Paystack REST API.

pub mod client;
pub mod error;
pub mod types;

pub use client::{PaystackClient, PaystackConfig};
pub use error::{PaystackError, PaystackResult};
pub use types::{Bank, ResolvedAccount, Subscription, SubscriptionRequest};
