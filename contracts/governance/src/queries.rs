use cosmwasm_std::{Deps, Env, Order, StdError, StdResult, Uint128};
use cw_storage_plus::Bound;

use futarchy::governance::{
    BandResponse, ConditionalBalanceResponse, ConfigResponse, SponsorshipResponse,
    TreasuryResponse, TwapsResponse,
};
use futarchy::now_ms;
use futarchy::pool::{compute_swap, Amm, SwapDirection, SwapResult};
use futarchy::proposal::{Grant, Proposal, ProposalAction, Stream};
use futarchy::spot::LpPosition;

use crate::arbitrage::compute_band;
use crate::spot_pool::{current_spot_twap, normalized_position};
use crate::state::{
    load_amms, ACTIONS, AMMS, CONDITIONAL_BALANCES, CONFIG, ESCROWS, GRANTS, PROPOSALS,
    SPONSORSHIPS, SPOT_POOL, STREAMS, TREASURY,
};

/// The maximum number of items a listing query returns
const MAX_LIMIT: u32 = 30;
/// The default number of items a listing query returns
const DEFAULT_LIMIT: u32 = 10;

pub fn query_config(deps: Deps) -> StdResult<ConfigResponse> {
    let config = CONFIG.load(deps.storage)?;
    Ok(ConfigResponse {
        owner: config.owner,
        factory: config.factory,
        dao_name: config.dao_name,
        asset_denom: config.asset_denom,
        stable_denom: config.stable_denom,
        params: config.params,
        action_dispatcher: config.action_dispatcher,
    })
}

pub fn query_proposals(
    deps: Deps,
    start_after: Option<u64>,
    limit: Option<u32>,
) -> StdResult<Vec<Proposal>> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;
    PROPOSALS
        .range(
            deps.storage,
            start_after.map(Bound::exclusive),
            None,
            Order::Ascending,
        )
        .take(limit)
        .map(|item| Ok(item?.1))
        .collect()
}

pub fn query_actions(
    deps: Deps,
    proposal_id: u64,
    outcome: u8,
) -> StdResult<Vec<ProposalAction>> {
    Ok(ACTIONS
        .may_load(deps.storage, (proposal_id, outcome))?
        .unwrap_or_default())
}

pub fn query_sponsorships(deps: Deps, proposal_id: u64) -> StdResult<Vec<SponsorshipResponse>> {
    let proposal = PROPOSALS.load(deps.storage, proposal_id)?;
    let mut sponsorships = vec![];
    for outcome in 0..proposal.outcome_count {
        if let Some(sponsorship) = SPONSORSHIPS.may_load(deps.storage, (proposal_id, outcome))? {
            sponsorships.push(SponsorshipResponse {
                outcome,
                sponsor: sponsorship.sponsor,
                threshold_bias: sponsorship.threshold_bias,
            });
        }
    }
    Ok(sponsorships)
}

pub fn query_conditional_balance(
    deps: Deps,
    proposal_id: u64,
    outcome: u8,
    address: String,
) -> StdResult<ConditionalBalanceResponse> {
    let address = deps.api.addr_validate(&address)?;
    let balance = CONDITIONAL_BALANCES
        .may_load(deps.storage, (proposal_id, outcome, &address))?
        .unwrap_or_default();
    Ok(ConditionalBalanceResponse {
        asset: balance.asset,
        stable: balance.stable,
    })
}

pub fn query_twaps(deps: Deps, env: Env, proposal_id: u64) -> StdResult<TwapsResponse> {
    let proposal = PROPOSALS.load(deps.storage, proposal_id)?;
    let amms = load_amms(deps.storage, proposal_id, proposal.outcome_count)?;
    let now = now_ms(&env);
    let twaps = amms
        .iter()
        .map(|amm| amm.oracle.twap(now).unwrap_or(amm.oracle.initial_price))
        .collect();
    Ok(TwapsResponse { twaps })
}

pub fn query_no_arb_band(deps: Deps, proposal_id: u64) -> StdResult<BandResponse> {
    let proposal = PROPOSALS.load(deps.storage, proposal_id)?;
    let amms = load_amms(deps.storage, proposal_id, proposal.outcome_count)?;
    let pool = SPOT_POOL.load(deps.storage)?;

    let (floor, ceiling) = compute_band(pool.fee_bps, &amms)
        .map_err(|err| StdError::generic_err(err.to_string()))?;
    let spot_price = pool
        .price()
        .map_err(|err| StdError::generic_err(err.to_string()))?;

    Ok(BandResponse {
        floor,
        ceiling,
        spot_price,
    })
}

pub fn query_spot_price(deps: Deps) -> StdResult<Uint128> {
    let pool = SPOT_POOL.load(deps.storage)?;
    pool.price()
        .map_err(|err| StdError::generic_err(err.to_string()))
}

pub fn query_spot_twap(deps: Deps, env: Env) -> StdResult<Uint128> {
    let pool = SPOT_POOL.load(deps.storage)?;
    current_spot_twap(deps.storage, &pool, now_ms(&env))?
        .ok_or_else(|| StdError::generic_err("spot oracle has not accumulated a full window yet"))
}

pub fn query_lp_position(deps: Deps, address: String) -> StdResult<LpPosition> {
    let address = deps.api.addr_validate(&address)?;
    normalized_position(deps.storage, &address)
}

pub fn query_simulate_spot_swap(
    deps: Deps,
    direction: SwapDirection,
    amount_in: Uint128,
) -> StdResult<SwapResult> {
    let pool = SPOT_POOL.load(deps.storage)?;
    let (offer_reserve, ask_reserve) = match direction {
        SwapDirection::StableForAsset => (pool.total_stable(), pool.total_asset()),
        SwapDirection::AssetForStable => (pool.total_asset(), pool.total_stable()),
    };
    compute_swap(offer_reserve, ask_reserve, amount_in, pool.fee_bps)
        .map_err(|err| StdError::generic_err(err.to_string()))
}

pub fn query_simulate_conditional_swap(
    deps: Deps,
    proposal_id: u64,
    outcome: u8,
    direction: SwapDirection,
    amount_in: Uint128,
) -> StdResult<SwapResult> {
    let amm: Amm = AMMS.load(deps.storage, (proposal_id, outcome))?;
    let (offer_reserve, ask_reserve) = match direction {
        SwapDirection::StableForAsset => (amm.reserve_stable, amm.reserve_asset),
        SwapDirection::AssetForStable => (amm.reserve_asset, amm.reserve_stable),
    };
    compute_swap(offer_reserve, ask_reserve, amount_in, amm.fee_bps)
        .map_err(|err| StdError::generic_err(err.to_string()))
}

pub fn query_treasury(deps: Deps) -> StdResult<TreasuryResponse> {
    let treasury = TREASURY.load(deps.storage)?;
    Ok(TreasuryResponse {
        asset: treasury.asset,
        stable: treasury.stable,
    })
}

pub fn query_grants(
    deps: Deps,
    start_after: Option<u64>,
    limit: Option<u32>,
) -> StdResult<Vec<Grant>> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;
    GRANTS
        .range(
            deps.storage,
            start_after.map(Bound::exclusive),
            None,
            Order::Ascending,
        )
        .take(limit)
        .map(|item| Ok(item?.1))
        .collect()
}

pub fn query_streams(
    deps: Deps,
    start_after: Option<u64>,
    limit: Option<u32>,
) -> StdResult<Vec<Stream>> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;
    STREAMS
        .range(
            deps.storage,
            start_after.map(Bound::exclusive),
            None,
            Order::Ascending,
        )
        .take(limit)
        .map(|item| Ok(item?.1))
        .collect()
}

pub fn query_escrow(deps: Deps, proposal_id: u64) -> StdResult<futarchy::escrow::TokenEscrow> {
    ESCROWS.load(deps.storage, proposal_id)
}
