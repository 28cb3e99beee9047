//! ptokens-core: Shared types, errors, amounts and configuration
//!
//! This crate provides the foundational types used across the pTokens workspace.

pub mod amount;
pub mod config;
pub mod errors;
pub mod types;

pub use amount::{format_amount, to_off_chain, to_on_chain, AmountError};
pub use config::*;
pub use errors::*;
pub use types::*;
