use cosmwasm_std::{OverflowError, StdError, Uint128};
use cw_utils::PaymentError;
use futarchy::escrow::EscrowError;
use futarchy::pool::PoolError;
use futarchy::proposal::ProposalState;
use futarchy_checkpoint_buffer::error::BufferError;
use thiserror::Error;

/// This enum describes governance contract errors
#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Payment(#[from] PaymentError),

    #[error("{0}")]
    Escrow(#[from] EscrowError),

    #[error("{0}")]
    Pool(#[from] PoolError),

    #[error("{0}")]
    Buffer(#[from] BufferError),

    #[error("Unauthorized")]
    Unauthorized {},

    #[error("Event of zero amount")]
    InvalidZeroAmount {},

    #[error("Unknown outcome index {outcome}")]
    UnknownOutcome { outcome: u8 },

    #[error("Outcome count must be between {min} and {max}")]
    OutcomeCountOutOfRange { min: u8, max: u8 },

    #[error("Outcome action list is limited to {max} entries")]
    ActionListFull { max: u32 },

    #[error("Split ratio must be between 1 and 99 percent")]
    InvalidRatio {},

    #[error("Swap returned less than the requested minimum")]
    SlippageExceeded {},

    #[error("Coin denom does not belong to this DAO")]
    InvalidCoinType {},

    #[error("Operation not allowed in proposal state {current}")]
    InvalidState { current: ProposalState },

    #[error("Actions can only be staged while the proposal is in premarket")]
    PremarketLocked {},

    #[error("Review period has not elapsed yet")]
    ReviewPeriodNotElapsed {},

    #[error("Trading period has not elapsed yet")]
    TradingPeriodNotElapsed {},

    #[error("Trading has ended for this proposal")]
    TradingWindowClosed {},

    #[error("Execution window has closed")]
    ExecutionWindowClosed {},

    #[error("Spot pool is already held by proposal {proposal_id}")]
    SpotPoolBusy { proposal_id: u64 },

    #[error("LP shares are locked until the active proposal finalizes")]
    LpLockedInProposal {},

    #[error("Complete set operations require equal conditional balances across every outcome")]
    CompleteSetMismatch {},

    #[error("Conditional balance is insufficient")]
    InsufficientSupply {},

    #[error("Treasury balance is insufficient")]
    InsufficientTreasury {},

    #[error("Proposal fee mismatch: expected {expected}")]
    FeeMismatch { expected: Uint128 },

    #[error("Escrow still holds conditional deposits")]
    EscrowNotEmpty {},

    #[error("Spot oracle has not accumulated a full window yet")]
    SpotOracleNotReady {},

    #[error("Spot price left the no-arbitrage band and could not be re-centered")]
    NoArbBandViolated {},

    #[error("No profitable arbitrage across the conditional markets")]
    NoProfitableArbitrage {},

    #[error("Action type {action_type} has no handler and no dispatcher is configured")]
    UnknownActionType { action_type: String },

    #[error("Grant tier threshold has not been reached")]
    GrantLocked {},

    #[error("Grant tier already claimed")]
    GrantAlreadyClaimed {},

    #[error("Nothing to claim yet")]
    NothingToClaim {},

    #[error("Failed to migrate the contract")]
    MigrationError {},
}

impl From<OverflowError> for ContractError {
    fn from(o: OverflowError) -> Self {
        StdError::from(o).into()
    }
}
