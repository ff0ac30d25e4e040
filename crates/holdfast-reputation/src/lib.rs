//! Holdfast Reputation Recorder
//!
//! Computes score deltas for resolved disputes and appends them as
//! immutable events through the ledger store. A wallet's aggregate score is
//! the materialized sum over its events; tiers are discrete brackets over
//! that sum.
//!
//! Penalties follow a power law over the transaction amount with asymmetric
//! coefficients: a refund (buyer wins) costs the seller more than a release
//! (seller wins) costs the buyer.

pub mod recorder;
pub mod score;
pub mod tier;

pub use recorder::{best_effort, ReputationRecorder};
pub use score::{
    dispute_penalty, sale_reward, PENALTY_EXPONENT, REFUND_SELLER_COEFFICIENT,
    RELEASE_BUYER_COEFFICIENT, SALE_COEFFICIENT,
};
pub use tier::{MemoryTierLog, Tier, TierLog, TierTransition, TracingTierLog};
