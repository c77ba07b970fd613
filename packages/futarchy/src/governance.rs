use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Addr, Uint128};

use crate::dao::DaoParams;
use crate::escrow::{Side, TokenEscrow};
use crate::math::SignedU128;
use crate::pool::{Amm, SwapDirection, SwapResult};
use crate::proposal::{Grant, Proposal, ProposalAction, Stream};
use crate::spot::{LpPosition, SpotPool};

/// This structure stores the basic settings for creating a new governance
/// contract. Instantiated by the factory, one instance per DAO.
#[cw_serde]
pub struct InstantiateMsg {
    /// Address allowed to change DAO parameters directly
    pub owner: String,
    pub dao_name: String,
    /// Native denom of the DAO's own coin
    pub asset_denom: String,
    /// Native denom of the quote coin
    pub stable_denom: String,
    pub params: DaoParams,
    /// Contract receiving unknown staged actions at execution time
    pub action_dispatcher: Option<String>,
}

/// This structure describes the execute messages of the governance contract.
#[cw_serde]
pub enum ExecuteMsg {
    /// Opens a new proposal in PREMARKET. The proposal fee
    /// (`proposal_fee_per_outcome * outcome_count`, in stable coins) must be
    /// attached.
    CreateProposal {
        title: String,
        introduction: String,
        metadata: String,
        /// One message per outcome; index 0 is REJECT
        outcome_messages: Vec<String>,
    },
    /// Appends an action to an outcome's list. PREMARKET only.
    StageAction {
        proposal_id: u64,
        outcome: u8,
        action: ProposalAction,
    },
    /// Pledges a TWAP bias for one outcome, checked at winner selection.
    /// Attached funds are donated to the treasury. Allowed until trading
    /// starts.
    Sponsor {
        proposal_id: u64,
        outcome: u8,
        threshold_bias: SignedU128,
    },
    /// Aborts a proposal before trading and refunds the fee. Proposer only.
    CancelProposal { proposal_id: u64 },
    /// PREMARKET → REVIEW. Creates the escrow and locks the action lists.
    AdvanceToReview { proposal_id: u64 },
    /// REVIEW → TRADING. Quantum-splits spot liquidity into one conditional
    /// market per outcome. Uses the DAO's configured ratio unless overridden.
    AdvanceToTrading {
        proposal_id: u64,
        split_ratio_pct: Option<u8>,
    },
    /// TRADING → AWAITING_EXECUTION. Freezes TWAPs, selects the winner and
    /// recombines the winning market's liquidity into the spot pool.
    Finalize { proposal_id: u64 },
    /// AWAITING_EXECUTION → FINALIZED. Runs the winning outcome's actions,
    /// or records a timeout if the execution window has passed.
    Execute { proposal_id: u64 },
    /// Swaps against the spot pool. The offered coins must be attached.
    SwapSpot {
        direction: SwapDirection,
        min_out: Uint128,
        to: Option<String>,
    },
    /// Swaps conditional coins inside one outcome's market.
    SwapConditional {
        proposal_id: u64,
        outcome: u8,
        direction: SwapDirection,
        amount_in: Uint128,
        min_out: Uint128,
    },
    /// Deposits attached spot coins for one conditional coin per outcome.
    MintCompleteSet { proposal_id: u64, side: Side },
    /// Burns one conditional coin per outcome for the underlying spot coin.
    BurnCompleteSet {
        proposal_id: u64,
        side: Side,
        amount: Uint128,
    },
    /// Redeems winning-outcome conditional coins 1:1. FINALIZED only.
    Redeem {
        proposal_id: u64,
        outcome: u8,
        side: Side,
        amount: Uint128,
    },
    /// Adds spot liquidity; both denoms must be attached. Disabled while a
    /// proposal holds the pool.
    ProvideLiquidity { min_lp: Option<Uint128> },
    /// Burns LIVE LP shares for spot coins. Disabled while a proposal holds
    /// the pool.
    WithdrawLiquidity {
        lp_amount: Uint128,
        min_asset: Option<Uint128>,
        min_stable: Option<Uint128>,
    },
    /// Queues LP shares for withdrawal; they become claimable once the
    /// current proposal (if any) finalizes.
    MarkForWithdrawal { lp_amount: Uint128 },
    /// Burns WITHDRAW_ONLY LP shares for spot coins.
    ClaimWithdrawal { lp_amount: Uint128 },
    /// Runs the no-arbitrage routine across the active proposal's markets.
    Arbitrage {
        proposal_id: u64,
        min_profit: Uint128,
    },
    /// Pays out a grant tier whose TWAP threshold has been reached.
    ClaimGrant { grant_id: u64, tier: u32 },
    /// Pays out the vested part of a stream.
    ClaimStream { stream_id: u64 },
    /// Donates attached coins to the treasury.
    Deposit {},
    /// Replaces the DAO parameters. Owner only.
    UpdateConfig { params: Box<DaoParams> },
}

/// This structure describes the query messages of the governance contract.
#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    #[returns(ConfigResponse)]
    Config {},
    #[returns(Proposal)]
    Proposal { proposal_id: u64 },
    #[returns(Vec<Proposal>)]
    Proposals {
        start_after: Option<u64>,
        limit: Option<u32>,
    },
    #[returns(Vec<ProposalAction>)]
    Actions { proposal_id: u64, outcome: u8 },
    #[returns(Vec<SponsorshipResponse>)]
    Sponsorships { proposal_id: u64 },
    #[returns(TokenEscrow)]
    Escrow { proposal_id: u64 },
    #[returns(ConditionalBalanceResponse)]
    ConditionalBalance {
        proposal_id: u64,
        outcome: u8,
        address: String,
    },
    #[returns(Amm)]
    Amm { proposal_id: u64, outcome: u8 },
    /// Per-outcome TWAPs of the proposal's conditional markets, projected to
    /// the current block time
    #[returns(TwapsResponse)]
    Twaps { proposal_id: u64 },
    /// The no-arbitrage price band implied by the conditional markets
    #[returns(BandResponse)]
    NoArbBand { proposal_id: u64 },
    #[returns(SpotPool)]
    SpotPool {},
    #[returns(Uint128)]
    SpotPrice {},
    /// Spot TWAP over the configured PCW window
    #[returns(Uint128)]
    SpotTwap {},
    #[returns(LpPosition)]
    LpPosition { address: String },
    #[returns(SwapResult)]
    SimulateSpotSwap {
        direction: SwapDirection,
        amount_in: Uint128,
    },
    #[returns(SwapResult)]
    SimulateConditionalSwap {
        proposal_id: u64,
        outcome: u8,
        direction: SwapDirection,
        amount_in: Uint128,
    },
    #[returns(TreasuryResponse)]
    Treasury {},
    #[returns(Grant)]
    Grant { grant_id: u64 },
    #[returns(Vec<Grant>)]
    Grants {
        start_after: Option<u64>,
        limit: Option<u32>,
    },
    #[returns(Stream)]
    Stream { stream_id: u64 },
    #[returns(Vec<Stream>)]
    Streams {
        start_after: Option<u64>,
        limit: Option<u32>,
    },
}

#[cw_serde]
pub struct MigrateMsg {}

#[cw_serde]
pub struct ConfigResponse {
    pub owner: Addr,
    pub factory: Addr,
    pub dao_name: String,
    pub asset_denom: String,
    pub stable_denom: String,
    pub params: DaoParams,
    pub action_dispatcher: Option<Addr>,
}

#[cw_serde]
pub struct SponsorshipResponse {
    pub outcome: u8,
    pub sponsor: Addr,
    pub threshold_bias: SignedU128,
}

#[cw_serde]
pub struct ConditionalBalanceResponse {
    pub asset: Uint128,
    pub stable: Uint128,
}

#[cw_serde]
pub struct TwapsResponse {
    pub twaps: Vec<Uint128>,
}

#[cw_serde]
pub struct BandResponse {
    pub floor: Uint128,
    pub ceiling: Uint128,
    pub spot_price: Uint128,
}

#[cw_serde]
pub struct TreasuryResponse {
    pub asset: Uint128,
    pub stable: Uint128,
}
