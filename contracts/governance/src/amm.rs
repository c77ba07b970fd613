use cosmwasm_std::{attr, DepsMut, Env, Event, MessageInfo, Response, Uint128};

use futarchy::escrow::Side;
use futarchy::now_ms;
use futarchy::pool::SwapDirection;
use futarchy::proposal::ProposalState;

use crate::arbitrage::maybe_enforce_band;
use crate::error::ContractError;
use crate::escrow::{add_balance, sub_balance};
use crate::spot_pool::observe_spot;
use crate::state::{save_amm, save_spot_pool, AMMS, PROPOSALS, SPOT_POOL};

/// Swaps a holder's conditional coins inside one outcome's market, then runs
/// the no-arbitrage guard against the spot pool.
pub fn execute_swap_conditional(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    proposal_id: u64,
    outcome: u8,
    direction: SwapDirection,
    amount_in: Uint128,
    min_out: Uint128,
) -> Result<Response, ContractError> {
    if amount_in.is_zero() {
        return Err(ContractError::InvalidZeroAmount {});
    }

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
    if outcome >= proposal.outcome_count {
        return Err(ContractError::UnknownOutcome { outcome });
    }

    let (offer_side, ask_side) = match direction {
        SwapDirection::StableForAsset => (Side::Stable, Side::Asset),
        SwapDirection::AssetForStable => (Side::Asset, Side::Stable),
    };

    sub_balance(
        deps.storage,
        proposal_id,
        outcome,
        &info.sender,
        offer_side,
        amount_in,
        ContractError::InsufficientSupply {},
    )?;

    let mut amm = AMMS.load(deps.storage, (proposal_id, outcome))?;
    let result = amm.swap(direction, amount_in, now)?;
    if result.return_amount < min_out {
        return Err(ContractError::SlippageExceeded {});
    }
    save_amm(deps.storage, proposal_id, outcome, &mut amm)?;

    add_balance(
        deps.storage,
        proposal_id,
        outcome,
        &info.sender,
        ask_side,
        result.return_amount,
    )?;

    // A conditional price move shifts the no-arbitrage band around the spot
    // price, so the guard runs here as well.
    let mut pool = SPOT_POOL.load(deps.storage)?;
    let arb = maybe_enforce_band(deps.storage, &mut pool, now)?;
    observe_spot(deps.storage, &mut pool, now)?;
    save_spot_pool(deps.storage, &mut pool)?;

    let mut response = Response::new()
        .add_event(
            Event::new("swap_executed")
                .add_attribute("market", "conditional")
                .add_attribute("proposal_id", proposal_id.to_string())
                .add_attribute("outcome", outcome.to_string())
                .add_attribute("offer_amount", amount_in)
                .add_attribute("return_amount", result.return_amount),
        )
        .add_attributes(vec![
            attr("action", "swap_conditional"),
            attr("sender", info.sender),
            attr("proposal_id", proposal_id.to_string()),
            attr("outcome", outcome.to_string()),
            attr("offer_side", offer_side.as_str()),
            attr("offer_amount", amount_in),
            attr("return_amount", result.return_amount),
            attr("commission_amount", result.commission_amount),
        ]);
    if let Some(arb) = arb {
        response = response.add_event(arb.into_event());
    }

    Ok(response)
}
