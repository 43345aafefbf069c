//! Core domain concepts shared across all subdomains.
//!
//! - [`user::UserId`] — key for every piece of per-user state
//! - [`error::DomainError`] — domain-level errors

pub mod error;
pub mod user;
