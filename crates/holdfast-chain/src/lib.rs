//! Holdfast Chain Gateway
//!
//! Wraps calls against the deployed escrow contract: deposit-registration
//! lookup, release to the seller, refund to the buyer. The gateway is a
//! stateless proxy; it owns no persistent state and its side effects (fund
//! movement) are not idempotent, which is why callers must win a ledger
//! claim before invoking it.
//!
//! Contract calls either fully apply or revert. `release`/`refund` wait for
//! on-chain confirmation before returning, bounded by the configured
//! timeout; an unconfirmed call is reported as a failure and must never be
//! assumed to have succeeded.

pub mod gateway;
pub mod mock;
pub mod relay;

pub use gateway::{ChainConfig, ChainGateway, EscrowDeposit};
pub use mock::MockChainGateway;
pub use relay::RelayChainGateway;
