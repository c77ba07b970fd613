use cosmwasm_std::{
    attr, DepsMut, Env, Event, Isqrt, MessageInfo, Response, StdError, Storage, Uint128, Uint256,
    Uint512,
};

use futarchy::escrow::{Side, TokenEscrow};
use futarchy::math::{saturating_into_u128, MAX_BPS};
use futarchy::now_ms;
use futarchy::pool::{Amm, SwapDirection};
use futarchy::proposal::ProposalState;
use futarchy::spot::SpotPool;

use crate::error::ContractError;
use crate::spot_pool::observe_spot;
use crate::state::{load_amms, save_amms, save_escrow, save_spot_pool, ESCROWS, PROPOSALS};

/// Grid resolution of the profit search.
const SEARCH_STEPS: u128 = 32;

/// A completed arbitrage cycle. Inputs and profits are denominated in the
/// stable coin.
pub struct ArbExecution {
    pub direction: SwapDirection,
    pub input: Uint128,
    pub profit: Uint128,
}

impl ArbExecution {
    pub fn into_event(self) -> Event {
        Event::new("arbitrage_executed")
            .add_attribute("direction", direction_label(self.direction))
            .add_attribute("input", self.input)
            .add_attribute("profit", self.profit)
    }
}

fn direction_label(direction: SwapDirection) -> &'static str {
    match direction {
        SwapDirection::StableForAsset => "stable_for_asset",
        SwapDirection::AssetForStable => "asset_for_stable",
    }
}

/// The no-arbitrage bounds implied by the conditional market prices and the
/// fee schedule:
/// `floor   = (1 - f_s) * min_i((1 - f_i) * p_i)`
/// `ceiling = (1 / (1 - f_s)) * sum_i(p_i / (1 - f_i))`
pub fn compute_band(
    spot_fee_bps: u16,
    amms: &[Amm],
) -> Result<(Uint128, Uint128), ContractError> {
    let mut floor_inner = Uint128::MAX;
    let mut ceiling_inner = Uint256::zero();
    for amm in amms {
        let price = amm.price()?;
        let keep = (MAX_BPS - amm.fee_bps) as u128;
        floor_inner = floor_inner.min(price.multiply_ratio(keep, MAX_BPS as u128));
        ceiling_inner = ceiling_inner
            .saturating_add(price.full_mul(MAX_BPS as u128) / Uint256::from(keep));
    }

    let spot_keep = (MAX_BPS - spot_fee_bps) as u128;
    let floor = floor_inner.multiply_ratio(spot_keep, MAX_BPS as u128);
    let ceiling = ceiling_inner.saturating_mul(Uint256::from(MAX_BPS as u128))
        / Uint256::from(spot_keep);

    Ok((floor, saturating_into_u128(ceiling)))
}

/// Net stable profit of one full cycle with `input` stable coins, or `None`
/// when the cycle loses money or cannot be simulated.
fn simulate_profit(
    pool: &SpotPool,
    amms: &[Amm],
    direction: SwapDirection,
    input: Uint128,
) -> Option<Uint128> {
    match direction {
        // Spot asset is cheap: buy it on spot, split into complete sets,
        // sell in every conditional market, burn the stable set.
        SwapDirection::StableForAsset => {
            let bought = pool.simulate_feeless(SwapDirection::StableForAsset, input).ok()?;
            let mut min_out: Option<Uint128> = None;
            for amm in amms {
                let out = amm
                    .simulate_feeless(SwapDirection::AssetForStable, bought)
                    .ok()?;
                min_out = Some(min_out.map_or(out, |m| m.min(out)));
            }
            min_out?.checked_sub(input).ok()
        }
        // Spot asset is expensive: mint stable sets, buy conditional asset
        // everywhere, burn the asset set, sell it on spot.
        SwapDirection::AssetForStable => {
            let mut min_out: Option<Uint128> = None;
            for amm in amms {
                let out = amm
                    .simulate_feeless(SwapDirection::StableForAsset, input)
                    .ok()?;
                min_out = Some(min_out.map_or(out, |m| m.min(out)));
            }
            let recovered = pool
                .simulate_feeless(SwapDirection::AssetForStable, min_out?)
                .ok()?;
            recovered.checked_sub(input).ok()
        }
    }
}

fn sat512_to_u128(value: Uint512) -> Uint128 {
    Uint256::try_from(value)
        .map(saturating_into_u128)
        .unwrap_or(Uint128::MAX)
}

/// Closed-form profit-maximizing input for a feeless two-pool cycle
/// `(a1, b1) -> (a2, b2)`: `x* = (sqrt(a1 b1 a2 b2) - a1 a2) / (a2 + b1)`.
fn optimal_two_pool_input(a1: Uint128, b1: Uint128, a2: Uint128, b2: Uint128) -> Uint128 {
    let product = Uint512::from(a1.full_mul(b1)) * Uint512::from(a2.full_mul(b2));
    let root = product.isqrt();
    let offset = Uint512::from(a1.full_mul(a2));
    if root <= offset {
        return Uint128::zero();
    }
    let denominator = Uint512::from(Uint256::from(a2) + Uint256::from(b1));
    sat512_to_u128((root - offset) / denominator)
}

/// Seeds the search with the closed-form optimum against the market that
/// binds the complete-set leg.
fn seed_input(pool: &SpotPool, amms: &[Amm], direction: SwapDirection) -> Uint128 {
    let binding = match direction {
        SwapDirection::StableForAsset => amms
            .iter()
            .min_by_key(|amm| amm.price().unwrap_or(Uint128::MAX)),
        SwapDirection::AssetForStable => amms
            .iter()
            .max_by_key(|amm| amm.price().unwrap_or(Uint128::zero())),
    };
    let Some(binding) = binding else {
        return Uint128::zero();
    };

    match direction {
        SwapDirection::StableForAsset => optimal_two_pool_input(
            pool.total_stable(),
            pool.total_asset(),
            binding.reserve_asset,
            binding.reserve_stable,
        ),
        SwapDirection::AssetForStable => optimal_two_pool_input(
            binding.reserve_stable,
            binding.reserve_asset,
            pool.total_asset(),
            pool.total_stable(),
        ),
    }
}

fn consider(
    pool: &SpotPool,
    amms: &[Amm],
    direction: SwapDirection,
    input: Uint128,
    max_input: Uint128,
    best: &mut Option<(Uint128, Uint128)>,
) {
    if input.is_zero() || input > max_input {
        return;
    }
    let Some(profit) = simulate_profit(pool, amms, direction, input) else {
        return;
    };
    if profit.is_zero() {
        return;
    }
    let replace = match best {
        None => true,
        Some((best_input, best_profit)) => {
            profit > *best_profit || (profit == *best_profit && input < *best_input)
        }
    };
    if replace {
        *best = Some((input, profit));
    }
}

/// Deterministic profit search: the closed-form seed plus a coarse grid with
/// early pruning once profits decline past the peak. Ties prefer the smaller
/// input.
pub fn best_input(
    pool: &SpotPool,
    amms: &[Amm],
    direction: SwapDirection,
    max_input: Uint128,
) -> Option<(Uint128, Uint128)> {
    let mut best = None;

    consider(pool, amms, direction, seed_input(pool, amms, direction), max_input, &mut best);

    let step = (max_input.u128() / SEARCH_STEPS).max(1);
    let mut last_profit = Uint128::zero();
    for i in 1..=SEARCH_STEPS {
        let input = Uint128::new(step.saturating_mul(i));
        if input > max_input {
            break;
        }
        match simulate_profit(pool, amms, direction, input) {
            Some(profit) => {
                consider(pool, amms, direction, input, max_input, &mut best);
                if profit < last_profit {
                    break;
                }
                last_profit = profit;
            }
            None => {
                if !last_profit.is_zero() {
                    break;
                }
            }
        }
    }

    best
}

fn max_input_for(pool: &SpotPool) -> Uint128 {
    (pool.total_stable() / Uint128::new(2)).max(Uint128::one())
}

/// Executes one arbitrage cycle across all outcomes, burning the resulting
/// complete set back into spot coins. Residual conditional coins above the
/// binding leg accrue to the per-market fee buckets; the net profit accrues
/// to the spot pool's stable fee bucket.
pub fn execute_arbitrage(
    pool: &mut SpotPool,
    amms: &mut [Amm],
    escrow: &mut TokenEscrow,
    direction: SwapDirection,
    input: Uint128,
    now_ms: u64,
) -> Result<ArbExecution, ContractError> {
    let profit = match direction {
        SwapDirection::StableForAsset => {
            let bought = pool.swap_feeless(SwapDirection::StableForAsset, input)?;
            escrow.mint_complete_set(Side::Asset, bought)?;

            let mut outs = Vec::with_capacity(amms.len());
            for amm in amms.iter_mut() {
                outs.push(amm.swap_feeless(SwapDirection::AssetForStable, bought, now_ms)?);
            }
            let burnable = outs
                .iter()
                .min()
                .copied()
                .ok_or_else(|| StdError::generic_err("no conditional markets"))?;
            escrow.burn_complete_set(Side::Stable, burnable)?;
            for (amm, out) in amms.iter_mut().zip(outs) {
                amm.fees_stable += out - burnable;
            }

            burnable
                .checked_sub(input)
                .map_err(|_| ContractError::NoProfitableArbitrage {})?
        }
        SwapDirection::AssetForStable => {
            escrow.mint_complete_set(Side::Stable, input)?;

            let mut outs = Vec::with_capacity(amms.len());
            for amm in amms.iter_mut() {
                outs.push(amm.swap_feeless(SwapDirection::StableForAsset, input, now_ms)?);
            }
            let burnable = outs
                .iter()
                .min()
                .copied()
                .ok_or_else(|| StdError::generic_err("no conditional markets"))?;
            escrow.burn_complete_set(Side::Asset, burnable)?;
            for (amm, out) in amms.iter_mut().zip(outs) {
                amm.fees_asset += out - burnable;
            }

            let recovered = pool.swap_feeless(SwapDirection::AssetForStable, burnable)?;
            recovered
                .checked_sub(input)
                .map_err(|_| ContractError::NoProfitableArbitrage {})?
        }
    };

    pool.fees_stable += profit;
    escrow.assert_solvent()?;

    Ok(ArbExecution {
        direction,
        input,
        profit,
    })
}

/// Checks the no-arbitrage band after a swap and, when the spot price left
/// it, runs the optimal arbitrage to re-center it. A residual violation is
/// tolerated only when no profitable cycle remains (rounding dust);
/// otherwise the transaction reverts.
pub fn maybe_enforce_band(
    storage: &mut dyn Storage,
    pool: &mut SpotPool,
    now_ms: u64,
) -> Result<Option<ArbExecution>, ContractError> {
    let Some(proposal_id) = pool.active_proposal_id else {
        return Ok(None);
    };
    let proposal = PROPOSALS.load(storage, proposal_id)?;
    if proposal.state != ProposalState::Trading
        || now_ms >= proposal.trading_ended_at_ms.unwrap_or(u64::MAX)
    {
        return Ok(None);
    }

    let mut amms = load_amms(storage, proposal_id, proposal.outcome_count)?;
    let (floor, ceiling) = compute_band(pool.fee_bps, &amms)?;
    let price = pool.price()?;
    if price >= floor && price <= ceiling {
        return Ok(None);
    }

    let direction = if price < floor {
        SwapDirection::StableForAsset
    } else {
        SwapDirection::AssetForStable
    };

    let mut escrow = ESCROWS.load(storage, proposal_id)?;
    let arb = match best_input(pool, &amms, direction, max_input_for(pool)) {
        Some((input, _)) => Some(execute_arbitrage(
            pool, &mut amms, &mut escrow, direction, input, now_ms,
        )?),
        None => None,
    };

    let (floor, ceiling) = compute_band(pool.fee_bps, &amms)?;
    let price = pool.price()?;
    if price < floor || price > ceiling {
        let direction = if price < floor {
            SwapDirection::StableForAsset
        } else {
            SwapDirection::AssetForStable
        };
        if best_input(pool, &amms, direction, max_input_for(pool)).is_some() {
            return Err(ContractError::NoArbBandViolated {});
        }
    }

    save_amms(storage, proposal_id, &mut amms)?;
    save_escrow(storage, &mut escrow)?;

    Ok(arb)
}

/// Keeper entry point: runs the better of the two arbitrage directions
/// against the active proposal's markets.
pub fn execute_arbitrage_cmd(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    proposal_id: u64,
    min_profit: Uint128,
) -> Result<Response, ContractError> {
    let proposal = PROPOSALS.load(deps.storage, proposal_id)?;
    if proposal.state != ProposalState::Trading {
        return Err(ContractError::InvalidState {
            current: proposal.state,
        });
    }
    let now = now_ms(&env);
    if now >= proposal.trading_ended_at_ms.unwrap_or(u64::MAX) {
        return Err(ContractError::TradingWindowClosed {});
    }

    let mut pool = crate::state::SPOT_POOL.load(deps.storage)?;
    let mut amms = load_amms(deps.storage, proposal_id, proposal.outcome_count)?;
    let mut escrow = ESCROWS.load(deps.storage, proposal_id)?;

    let max_input = max_input_for(&pool);
    let mut candidate: Option<(SwapDirection, Uint128, Uint128)> = None;
    for direction in [SwapDirection::StableForAsset, SwapDirection::AssetForStable] {
        if let Some((input, profit)) = best_input(&pool, &amms, direction, max_input) {
            let replace = match &candidate {
                None => true,
                Some((_, best_in, best_profit)) => {
                    profit > *best_profit || (profit == *best_profit && input < *best_in)
                }
            };
            if replace {
                candidate = Some((direction, input, profit));
            }
        }
    }

    let Some((direction, input, profit)) = candidate else {
        return Err(ContractError::NoProfitableArbitrage {});
    };
    if profit < min_profit {
        return Err(ContractError::NoProfitableArbitrage {});
    }

    let arb = execute_arbitrage(&mut pool, &mut amms, &mut escrow, direction, input, now)?;

    save_amms(deps.storage, proposal_id, &mut amms)?;
    save_escrow(deps.storage, &mut escrow)?;
    observe_spot(deps.storage, &mut pool, now)?;
    save_spot_pool(deps.storage, &mut pool)?;

    let event = Event::new("arbitrage_executed")
        .add_attribute("direction", direction_label(arb.direction))
        .add_attribute("input", arb.input)
        .add_attribute("profit", arb.profit);

    Ok(Response::new().add_event(event).add_attributes(vec![
        attr("action", "arbitrage"),
        attr("sender", info.sender),
        attr("proposal_id", proposal_id.to_string()),
    ]))
}
