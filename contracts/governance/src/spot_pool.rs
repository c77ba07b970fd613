use cosmwasm_std::{
    attr, coin, Addr, BankMsg, Coin, DepsMut, Env, Event, MessageInfo, Response, StdResult,
    Storage, Uint128,
};
use cw_utils::must_pay;

use futarchy::now_ms;
use futarchy::pool::{PoolError, SwapDirection};
use futarchy::proposal::ProposalState;
use futarchy::spot::{LpPosition, SpotPool};

use crate::arbitrage::maybe_enforce_band;
use crate::error::ContractError;
use crate::state::{
    save_spot_pool, Config, CONFIG, LP_POSITIONS, PROPOSALS, SPOT_CHECKPOINTS, SPOT_POOL,
};

/// Records a spot price observation and commits a checkpoint when one is
/// due. Called after every operation that can move the spot price.
pub fn observe_spot(
    storage: &mut dyn Storage,
    pool: &mut SpotPool,
    now_ms: u64,
) -> Result<(), ContractError> {
    if pool.total_asset().is_zero() || pool.total_stable().is_zero() {
        return Ok(());
    }
    let price = pool.price()?;
    if let Some(checkpoint) = pool.oracle.observe(price, now_ms) {
        SPOT_CHECKPOINTS.push(storage, &checkpoint)?;
    }
    Ok(())
}

/// Spot TWAP over the configured window, or `None` while the oracle has not
/// accumulated a full window of history yet.
pub fn current_spot_twap(
    storage: &dyn Storage,
    pool: &SpotPool,
    now_ms: u64,
) -> StdResult<Option<Uint128>> {
    let target = now_ms.saturating_sub(pool.oracle.window_size_ms);
    let checkpoint = SPOT_CHECKPOINTS
        .find_at_or_before(storage, target)
        .map_err(cosmwasm_std::StdError::from)?;
    Ok(checkpoint.and_then(|cp| pool.oracle.twap_since(&cp, now_ms)))
}

/// Extracts the DAO's two denoms from attached funds, rejecting foreign
/// coins.
pub fn deposits_from_funds(
    info: &MessageInfo,
    config: &Config,
) -> Result<(Uint128, Uint128), ContractError> {
    let mut asset = Uint128::zero();
    let mut stable = Uint128::zero();
    for coin in &info.funds {
        if coin.denom == config.asset_denom {
            asset += coin.amount;
        } else if coin.denom == config.stable_denom {
            stable += coin.amount;
        } else {
            return Err(ContractError::InvalidCoinType {});
        }
    }
    Ok((asset, stable))
}

/// Loads a holder's LP position, flipping TRANSITIONING shares into
/// WITHDRAW_ONLY once the proposal they were queued under has finalized its
/// market.
pub fn normalized_position(storage: &dyn Storage, holder: &Addr) -> StdResult<LpPosition> {
    let mut position = LP_POSITIONS.may_load(storage, holder)?.unwrap_or_default();
    if let Some(proposal_id) = position.transitioning_proposal {
        let resolved = match PROPOSALS.may_load(storage, proposal_id)? {
            Some(proposal) => matches!(
                proposal.state,
                ProposalState::AwaitingExecution | ProposalState::Finalized
            ),
            None => true,
        };
        if resolved {
            position.withdraw_only += position.transitioning;
            position.transitioning = Uint128::zero();
            position.transitioning_proposal = None;
        }
    }
    Ok(position)
}

pub fn save_position(
    storage: &mut dyn Storage,
    holder: &Addr,
    position: &LpPosition,
) -> StdResult<()> {
    if position.total().is_zero() && position.transitioning_proposal.is_none() {
        LP_POSITIONS.remove(storage, holder);
        Ok(())
    } else {
        LP_POSITIONS.save(storage, holder, position)
    }
}

fn refund_coins(config: &Config, asset: Uint128, stable: Uint128) -> Vec<Coin> {
    let mut out = vec![];
    if !asset.is_zero() {
        out.push(coin(asset.u128(), &config.asset_denom));
    }
    if !stable.is_zero() {
        out.push(coin(stable.u128(), &config.stable_denom));
    }
    out
}

/// Provides liquidity to the LIVE bucket. Both denoms must be attached.
pub fn execute_provide_liquidity(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    min_lp: Option<Uint128>,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut pool = SPOT_POOL.load(deps.storage)?;
    if pool.active_proposal_id.is_some() {
        return Err(ContractError::LpLockedInProposal {});
    }

    let (asset_in, stable_in) = deposits_from_funds(&info, &config)?;
    if asset_in.is_zero() || stable_in.is_zero() {
        return Err(ContractError::InvalidZeroAmount {});
    }

    let shares = pool.provide(asset_in, stable_in)?;
    if let Some(min_lp) = min_lp {
        if shares < min_lp {
            return Err(ContractError::SlippageExceeded {});
        }
    }

    let mut position = normalized_position(deps.storage, &info.sender)?;
    position.live += shares;
    save_position(deps.storage, &info.sender, &position)?;

    let now = now_ms(&env);
    observe_spot(deps.storage, &mut pool, now)?;
    save_spot_pool(deps.storage, &mut pool)?;

    Ok(Response::new().add_attributes(vec![
        attr("action", "provide_liquidity"),
        attr("sender", info.sender),
        attr("asset_in", asset_in),
        attr("stable_in", stable_in),
        attr("share", shares),
    ]))
}

/// Burns LIVE LP shares for spot coins. Only while no proposal holds the
/// pool.
pub fn execute_withdraw_liquidity(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    lp_amount: Uint128,
    min_asset: Option<Uint128>,
    min_stable: Option<Uint128>,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut pool = SPOT_POOL.load(deps.storage)?;
    if pool.active_proposal_id.is_some() {
        return Err(ContractError::LpLockedInProposal {});
    }

    let mut position = normalized_position(deps.storage, &info.sender)?;
    if position.live < lp_amount {
        return Err(PoolError::InsufficientLiquidity {}.into());
    }
    position.live -= lp_amount;

    let (asset_out, stable_out) = pool.withdraw(lp_amount)?;
    if asset_out < min_asset.unwrap_or_default() || stable_out < min_stable.unwrap_or_default() {
        return Err(ContractError::SlippageExceeded {});
    }

    save_position(deps.storage, &info.sender, &position)?;
    let now = now_ms(&env);
    observe_spot(deps.storage, &mut pool, now)?;
    save_spot_pool(deps.storage, &mut pool)?;

    let mut response = Response::new();
    let refund = refund_coins(&config, asset_out, stable_out);
    if !refund.is_empty() {
        response = response.add_message(BankMsg::Send {
            to_address: info.sender.to_string(),
            amount: refund,
        });
    }

    Ok(response
        .add_attributes(vec![
            attr("action", "withdraw_liquidity"),
            attr("sender", info.sender),
            attr("withdrawn_share", lp_amount),
            attr("asset_out", asset_out),
            attr("stable_out", stable_out),
        ]))
}

/// Queues LP shares for withdrawal. With an active proposal they move to
/// TRANSITIONING and become claimable after finalization; otherwise they go
/// straight to WITHDRAW_ONLY.
pub fn execute_mark_for_withdrawal(
    deps: DepsMut,
    info: MessageInfo,
    lp_amount: Uint128,
) -> Result<Response, ContractError> {
    let mut pool = SPOT_POOL.load(deps.storage)?;
    let mut position = normalized_position(deps.storage, &info.sender)?;
    if position.live < lp_amount {
        return Err(PoolError::InsufficientLiquidity {}.into());
    }

    pool.mark_for_withdrawal(lp_amount)?;
    position.live -= lp_amount;
    let bucket = if let Some(proposal_id) = pool.active_proposal_id {
        position.transitioning += lp_amount;
        position.transitioning_proposal = Some(proposal_id);
        "transitioning"
    } else {
        position.withdraw_only += lp_amount;
        "withdraw_only"
    };

    save_position(deps.storage, &info.sender, &position)?;
    save_spot_pool(deps.storage, &mut pool)?;

    Ok(Response::new().add_attributes(vec![
        attr("action", "mark_for_withdrawal"),
        attr("sender", info.sender),
        attr("share", lp_amount),
        attr("bucket", bucket),
    ]))
}

/// Burns WITHDRAW_ONLY LP shares for spot coins.
pub fn execute_claim_withdrawal(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    lp_amount: Uint128,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut pool = SPOT_POOL.load(deps.storage)?;
    let mut position = normalized_position(deps.storage, &info.sender)?;

    if position.withdraw_only < lp_amount {
        if !position.transitioning.is_zero() {
            return Err(ContractError::LpLockedInProposal {});
        }
        return Err(PoolError::InsufficientLiquidity {}.into());
    }
    position.withdraw_only -= lp_amount;

    let (asset_out, stable_out) = pool.claim(lp_amount)?;

    save_position(deps.storage, &info.sender, &position)?;
    let now = now_ms(&env);
    observe_spot(deps.storage, &mut pool, now)?;
    save_spot_pool(deps.storage, &mut pool)?;

    let mut response = Response::new();
    let refund = refund_coins(&config, asset_out, stable_out);
    if !refund.is_empty() {
        response = response.add_message(BankMsg::Send {
            to_address: info.sender.to_string(),
            amount: refund,
        });
    }

    Ok(response
        .add_attributes(vec![
            attr("action", "claim_withdrawal"),
            attr("sender", info.sender),
            attr("claimed_share", lp_amount),
            attr("asset_out", asset_out),
            attr("stable_out", stable_out),
        ]))
}

/// Swaps against the spot pool. Runs the no-arbitrage guard afterwards when
/// a proposal's markets are live.
pub fn execute_swap_spot(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    direction: SwapDirection,
    min_out: Uint128,
    to: Option<String>,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut pool = SPOT_POOL.load(deps.storage)?;

    let (offer_denom, ask_denom) = match direction {
        SwapDirection::StableForAsset => (&config.stable_denom, &config.asset_denom),
        SwapDirection::AssetForStable => (&config.asset_denom, &config.stable_denom),
    };
    let offer_amount = must_pay(&info, offer_denom)?;

    let result = pool.swap(direction, offer_amount)?;
    if result.return_amount < min_out {
        return Err(ContractError::SlippageExceeded {});
    }

    let now = now_ms(&env);
    let arb = maybe_enforce_band(deps.storage, &mut pool, now)?;
    observe_spot(deps.storage, &mut pool, now)?;
    save_spot_pool(deps.storage, &mut pool)?;

    let receiver = to
        .map(|to| deps.api.addr_validate(&to))
        .transpose()?
        .unwrap_or_else(|| info.sender.clone());

    let mut response = Response::new();
    if !result.return_amount.is_zero() {
        response = response.add_message(BankMsg::Send {
            to_address: receiver.to_string(),
            amount: vec![coin(result.return_amount.u128(), ask_denom)],
        });
    }
    let mut response = response
        .add_event(
            Event::new("swap_executed")
                .add_attribute("market", "spot")
                .add_attribute("offer_amount", offer_amount)
                .add_attribute("return_amount", result.return_amount),
        )
        .add_attributes(vec![
            attr("action", "swap_spot"),
            attr("sender", info.sender),
            attr("receiver", receiver),
            attr("offer_amount", offer_amount),
            attr("return_amount", result.return_amount),
            attr("commission_amount", result.commission_amount),
        ]);
    if let Some(arb) = arb {
        response = response.add_event(arb.into_event());
    }

    Ok(response)
}
