use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, StdResult, Storage, Uint128};
use cw_storage_plus::{Item, Map};

use futarchy::dao::DaoParams;
use futarchy::escrow::{Side, TokenEscrow};
use futarchy::oracle::Checkpoint;
use futarchy::pool::Amm;
use futarchy::proposal::{Grant, Proposal, ProposalAction, Sponsorship, Stream};
use futarchy::spot::{LpPosition, SpotPool};
use futarchy_checkpoint_buffer::CheckpointBuffer;

/// This structure stores the main config parameters of the governance
/// contract.
#[cw_serde]
pub struct Config {
    /// The factory that instantiated this DAO
    pub factory: Addr,
    /// The DAO admin
    pub owner: Addr,
    pub dao_name: String,
    /// Native denom of the DAO's own coin
    pub asset_denom: String,
    /// Native denom of the quote coin
    pub stable_denom: String,
    pub params: DaoParams,
    /// Contract receiving unknown staged actions at execution time
    pub action_dispatcher: Option<Addr>,
}

impl Config {
    pub fn denom(&self, side: Side) -> &str {
        match side {
            Side::Asset => &self.asset_denom,
            Side::Stable => &self.stable_denom,
        }
    }
}

/// A user's conditional coin balances for one (proposal, outcome) pair.
#[cw_serde]
#[derive(Default)]
pub struct ConditionalBalance {
    pub asset: Uint128,
    pub stable: Uint128,
}

impl ConditionalBalance {
    pub fn side(&self, side: Side) -> Uint128 {
        match side {
            Side::Asset => self.asset,
            Side::Stable => self.stable,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut Uint128 {
        match side {
            Side::Asset => &mut self.asset,
            Side::Stable => &mut self.stable,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.asset.is_zero() && self.stable.is_zero()
    }
}

/// Treasury coins spendable by winning proposal actions. Kept as an explicit
/// ledger so pool reserves and escrow backing can never be spent.
#[cw_serde]
#[derive(Default)]
pub struct Treasury {
    pub asset: Uint128,
    pub stable: Uint128,
}

impl Treasury {
    pub fn side_mut(&mut self, side: Side) -> &mut Uint128 {
        match side {
            Side::Asset => &mut self.asset,
            Side::Stable => &mut self.stable,
        }
    }
}

pub const CONFIG: Item<Config> = Item::new("config");

pub const TREASURY: Item<Treasury> = Item::new("treasury");

pub const SPOT_POOL: Item<SpotPool> = Item::new("spot_pool");

/// Committed spot oracle checkpoints
pub const SPOT_CHECKPOINTS: CheckpointBuffer<Checkpoint> =
    CheckpointBuffer::new("spot_cp_state", "spot_cp");

/// Retained checkpoint history; four PCW windows worth of checkpoints
pub const SPOT_CHECKPOINT_CAPACITY: u32 = 64;

pub const PROPOSAL_SEQ: Item<u64> = Item::new("proposal_seq");
pub const GRANT_SEQ: Item<u64> = Item::new("grant_seq");
pub const STREAM_SEQ: Item<u64> = Item::new("stream_seq");

pub const PROPOSALS: Map<u64, Proposal> = Map::new("proposals");

/// Staged actions per (proposal, outcome)
pub const ACTIONS: Map<(u64, u8), Vec<ProposalAction>> = Map::new("actions");

/// Sponsorships per (proposal, outcome)
pub const SPONSORSHIPS: Map<(u64, u8), Sponsorship> = Map::new("sponsorships");

/// Escrow per proposal; the escrow id equals the proposal id
pub const ESCROWS: Map<u64, TokenEscrow> = Map::new("escrows");

/// Conditional coin ledger per (proposal, outcome, holder)
pub const CONDITIONAL_BALANCES: Map<(u64, u8, &Addr), ConditionalBalance> =
    Map::new("conditional_balances");

/// Conditional markets per (proposal, outcome); exist only during trading
pub const AMMS: Map<(u64, u8), Amm> = Map::new("amms");

pub const LP_POSITIONS: Map<&Addr, LpPosition> = Map::new("lp_positions");

pub const GRANTS: Map<u64, Grant> = Map::new("grants");

pub const STREAMS: Map<u64, Stream> = Map::new("streams");

fn next_id(storage: &mut dyn Storage, seq: &Item<u64>) -> StdResult<u64> {
    let id = seq.may_load(storage)?.unwrap_or_default() + 1;
    seq.save(storage, &id)?;
    Ok(id)
}

pub fn next_proposal_id(storage: &mut dyn Storage) -> StdResult<u64> {
    next_id(storage, &PROPOSAL_SEQ)
}

pub fn next_grant_id(storage: &mut dyn Storage) -> StdResult<u64> {
    next_id(storage, &GRANT_SEQ)
}

pub fn next_stream_id(storage: &mut dyn Storage) -> StdResult<u64> {
    next_id(storage, &STREAM_SEQ)
}

/// Entity writes bump the version so every durable object carries a
/// monotonic version number.
pub fn save_proposal(storage: &mut dyn Storage, proposal: &mut Proposal) -> StdResult<()> {
    proposal.version += 1;
    PROPOSALS.save(storage, proposal.id, proposal)
}

pub fn save_escrow(storage: &mut dyn Storage, escrow: &mut TokenEscrow) -> StdResult<()> {
    escrow.version += 1;
    ESCROWS.save(storage, escrow.proposal_id, escrow)
}

pub fn save_spot_pool(storage: &mut dyn Storage, pool: &mut SpotPool) -> StdResult<()> {
    pool.version += 1;
    SPOT_POOL.save(storage, pool)
}

pub fn save_amm(
    storage: &mut dyn Storage,
    proposal_id: u64,
    outcome: u8,
    amm: &mut Amm,
) -> StdResult<()> {
    amm.version += 1;
    AMMS.save(storage, (proposal_id, outcome), amm)
}

/// Loads all conditional markets of a proposal, ordered by outcome.
pub fn load_amms(
    storage: &dyn Storage,
    proposal_id: u64,
    outcome_count: u8,
) -> StdResult<Vec<Amm>> {
    (0..outcome_count)
        .map(|outcome| AMMS.load(storage, (proposal_id, outcome)))
        .collect()
}

pub fn save_amms(
    storage: &mut dyn Storage,
    proposal_id: u64,
    amms: &mut [Amm],
) -> StdResult<()> {
    for (outcome, amm) in amms.iter_mut().enumerate() {
        save_amm(storage, proposal_id, outcome as u8, amm)?;
    }
    Ok(())
}
