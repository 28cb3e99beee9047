//! ptokens-transfer: cross-chain transfer orchestration for pTokens
//!
//! - `deposit`: node-issued deposit addresses, verified against a local derivation
//! - `monitor`: polling loops correlating native chain, bridge node and host chain
//! - `redeem`: redeem preconditions and the burn-to-payout flow
//! - `handle`: the awaitable, event-emitting handle every transfer returns
//! - `client`: `PTokenClient`, composing all of the above for one pToken

pub mod client;
pub mod deposit;
pub mod events;
pub mod handle;
pub mod monitor;
pub mod poll;
pub mod redeem;

pub use client::PTokenClient;
pub use deposit::{DepositAddress, DepositEngine, NonceRegistry};
pub use events::{Direction, Stage, TransferEvent, TransferStatus};
pub use handle::{Progress, TransferHandle};
pub use monitor::{IssueResult, Monitor};
pub use poll::{poll_until, Poll, PollSchedule};
pub use redeem::{RedeemResult, RedeemRules, Redeemer};

pub use host_chain::RedeemOptions;
