//! Request handlers.

pub mod auctions;
pub mod bank;
pub mod health;
pub mod users;
pub mod watchlist;
