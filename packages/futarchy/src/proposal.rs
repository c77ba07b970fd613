use std::fmt;

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Binary, Uint128};

use crate::dao::DaoParams;
use crate::math::SignedU128;

/// Outcome index 0 is always the REJECT outcome.
pub const REJECT_OUTCOME: u8 = 0;

/// A market needs at least REJECT plus one alternative.
pub const MIN_OUTCOMES: u8 = 2;

/// The five proposal lifecycle states, in transition order.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum ProposalState {
    Premarket,
    Review,
    Trading,
    AwaitingExecution,
    Finalized,
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProposalState::Premarket => "premarket",
            ProposalState::Review => "review",
            ProposalState::Trading => "trading",
            ProposalState::AwaitingExecution => "awaiting_execution",
            ProposalState::Finalized => "finalized",
        };
        f.write_str(s)
    }
}

/// A governance proposal resolved by conditional prediction markets.
#[cw_serde]
pub struct Proposal {
    pub id: u64,
    pub title: String,
    pub introduction: String,
    pub metadata: String,
    pub proposer: Addr,
    /// Number of outcomes including REJECT (outcome 0)
    pub outcome_count: u8,
    /// Human-readable message per outcome
    pub outcome_messages: Vec<String>,
    pub state: ProposalState,
    pub created_at_ms: u64,
    pub review_started_at_ms: Option<u64>,
    pub trading_started_at_ms: Option<u64>,
    /// Deadline after which trading can be finalized; fixed when trading starts
    pub trading_ended_at_ms: Option<u64>,
    pub execution_deadline_ms: Option<u64>,
    /// Outcome selected by TWAP comparison at trading end
    pub market_winner: Option<u8>,
    /// Outcome whose actions actually executed, `None` on failure or timeout
    pub executed_outcome: Option<u8>,
    pub execution_error: Option<String>,
    /// Fee collected at creation, refundable until trading starts
    pub fee_paid: Uint128,
    pub version: u64,
}

/// A typed, staged treasury instruction. Executed only if its outcome wins.
///
/// Unknown tags are forwarded verbatim to the DAO's pluggable action
/// dispatcher, if one is configured.
#[cw_serde]
pub enum ProposalAction {
    /// Emits the text as an event attribute; has no other effect
    Memo { text: String },
    /// Sends treasury coins to a recipient
    Transfer {
        recipient: String,
        denom: String,
        amount: Uint128,
    },
    /// Opens a linear vesting stream paid from the treasury
    CreateStream {
        recipient: String,
        denom: String,
        amount: Uint128,
        start_ms: u64,
        duration_ms: u64,
    },
    /// Creates an oracle-conditional grant whose tiers unlock on the spot
    /// TWAP moving past per-tier thresholds relative to the creation TWAP
    CreateGrant {
        denom: String,
        tiers: Vec<GrantTier>,
    },
    /// Adjusts the market-making subset of the DAO parameters
    UpdateTradingParams {
        amm_fee_bps: Option<u16>,
        spot_fee_bps: Option<u16>,
        twap_step_max: Option<Uint128>,
        twap_start_delay_ms: Option<u64>,
    },
    /// Replaces the full DAO parameter set
    UpdateDaoConfig { params: Box<DaoParams> },
    /// Opaque payload routed to the external action dispatcher by tag
    Unknown { action_type: String, payload: Binary },
}

impl ProposalAction {
    /// The stable tag identifying this action kind.
    pub fn action_type(&self) -> &str {
        match self {
            ProposalAction::Memo { .. } => "memo",
            ProposalAction::Transfer { .. } => "transfer",
            ProposalAction::CreateStream { .. } => "create_stream",
            ProposalAction::CreateGrant { .. } => "create_grant",
            ProposalAction::UpdateTradingParams { .. } => "update_trading_params",
            ProposalAction::UpdateDaoConfig { .. } => "update_dao_config",
            ProposalAction::Unknown { action_type, .. } => action_type,
        }
    }
}

/// One recipient slot of an oracle-conditional grant.
#[cw_serde]
pub struct GrantTier {
    pub recipient: String,
    pub amount: Uint128,
    /// Signed TWAP movement (relative to the grant baseline) that unlocks
    /// this tier
    pub threshold: SignedU128,
}

/// Third-party backing attached to one outcome of a proposal.
#[cw_serde]
pub struct Sponsorship {
    pub sponsor: Addr,
    /// Additive bias applied to the outcome's TWAP delta at winner selection
    pub threshold_bias: SignedU128,
}

/// An oracle-conditional grant. Funds are reserved from the treasury at
/// creation; each tier pays out once the spot TWAP has moved past its
/// threshold.
#[cw_serde]
pub struct Grant {
    pub id: u64,
    pub denom: String,
    /// Spot TWAP at grant creation
    pub baseline_twap: Uint128,
    pub tiers: Vec<GrantTierState>,
    pub created_at_ms: u64,
    pub version: u64,
}

#[cw_serde]
pub struct GrantTierState {
    pub recipient: Addr,
    pub amount: Uint128,
    pub threshold: SignedU128,
    pub claimed: bool,
}

/// A linear vesting stream paid from the treasury.
#[cw_serde]
pub struct Stream {
    pub id: u64,
    pub recipient: Addr,
    pub denom: String,
    pub total: Uint128,
    pub claimed: Uint128,
    pub start_ms: u64,
    pub duration_ms: u64,
    pub version: u64,
}

impl Stream {
    /// Total amount vested by `now_ms`, including what was already claimed.
    pub fn vested(&self, now_ms: u64) -> Uint128 {
        if now_ms <= self.start_ms {
            return Uint128::zero();
        }
        let elapsed = (now_ms - self.start_ms).min(self.duration_ms);
        if self.duration_ms == 0 {
            return self.total;
        }
        self.total.multiply_ratio(elapsed, self.duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_vests_linearly() {
        let stream = Stream {
            id: 1,
            recipient: Addr::unchecked("grantee"),
            denom: "ustable".to_string(),
            total: Uint128::new(1_000),
            claimed: Uint128::zero(),
            start_ms: 1_000,
            duration_ms: 10_000,
            version: 0,
        };

        assert_eq!(stream.vested(500), Uint128::zero());
        assert_eq!(stream.vested(1_000), Uint128::zero());
        assert_eq!(stream.vested(6_000), Uint128::new(500));
        assert_eq!(stream.vested(11_000), Uint128::new(1_000));
        assert_eq!(stream.vested(u64::MAX), Uint128::new(1_000));
    }

    #[test]
    fn action_tags_are_stable() {
        let actions = [
            (
                ProposalAction::Memo {
                    text: "gm".to_string(),
                },
                "memo",
            ),
            (
                ProposalAction::Unknown {
                    action_type: "upgrade_package".to_string(),
                    payload: Binary::default(),
                },
                "upgrade_package",
            ),
        ];
        for (action, tag) in actions {
            assert_eq!(action.action_type(), tag);
        }
    }
}
