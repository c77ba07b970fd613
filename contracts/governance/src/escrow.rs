use cosmwasm_std::{
    attr, coins, Addr, BankMsg, DepsMut, MessageInfo, Response, StdResult, Storage, Uint128,
};
use cw_utils::must_pay;

use futarchy::escrow::Side;
use futarchy::proposal::ProposalState;

use crate::error::ContractError;
use crate::state::{save_escrow, CONDITIONAL_BALANCES, CONFIG, ESCROWS, PROPOSALS};

/// Credits conditional coins to a holder's ledger balance.
pub fn add_balance(
    storage: &mut dyn Storage,
    proposal_id: u64,
    outcome: u8,
    holder: &Addr,
    side: Side,
    amount: Uint128,
) -> StdResult<()> {
    CONDITIONAL_BALANCES.update(storage, (proposal_id, outcome, holder), |balance| -> StdResult<_> {
        let mut balance = balance.unwrap_or_default();
        *balance.side_mut(side) = balance.side(side).checked_add(amount)?;
        Ok(balance)
    })?;
    Ok(())
}

/// Debits conditional coins from a holder's ledger balance, failing with
/// `shortfall_error` when the balance does not cover the amount.
pub fn sub_balance(
    storage: &mut dyn Storage,
    proposal_id: u64,
    outcome: u8,
    holder: &Addr,
    side: Side,
    amount: Uint128,
    shortfall_error: ContractError,
) -> Result<(), ContractError> {
    let key = (proposal_id, outcome, holder);
    let mut balance = CONDITIONAL_BALANCES.may_load(storage, key)?.unwrap_or_default();
    let remaining = balance
        .side(side)
        .checked_sub(amount)
        .map_err(|_| shortfall_error)?;
    *balance.side_mut(side) = remaining;

    if balance.is_empty() {
        CONDITIONAL_BALANCES.remove(storage, key);
    } else {
        CONDITIONAL_BALANCES.save(storage, key, &balance)?;
    }
    Ok(())
}

/// Deposits attached spot coins and mints one conditional coin of the given
/// side for every outcome of the proposal.
pub fn execute_mint_complete_set(
    deps: DepsMut,
    info: MessageInfo,
    proposal_id: u64,
    side: Side,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let proposal = PROPOSALS.load(deps.storage, proposal_id)?;
    if proposal.state == ProposalState::Premarket {
        return Err(ContractError::InvalidState {
            current: proposal.state,
        });
    }

    let amount = must_pay(&info, config.denom(side))?;

    let mut escrow = ESCROWS.load(deps.storage, proposal_id)?;
    escrow.mint_complete_set(side, amount)?;
    for outcome in 0..escrow.outcome_count {
        add_balance(deps.storage, proposal_id, outcome, &info.sender, side, amount)?;
    }
    save_escrow(deps.storage, &mut escrow)?;

    Ok(Response::new().add_attributes(vec![
        attr("action", "mint_complete_set"),
        attr("proposal_id", proposal_id.to_string()),
        attr("sender", info.sender),
        attr("side", side.as_str()),
        attr("amount", amount),
    ]))
}

/// Burns one conditional coin of the given side from every outcome and pays
/// out the underlying spot coin.
pub fn execute_burn_complete_set(
    deps: DepsMut,
    info: MessageInfo,
    proposal_id: u64,
    side: Side,
    amount: Uint128,
) -> Result<Response, ContractError> {
    if amount.is_zero() {
        return Err(ContractError::InvalidZeroAmount {});
    }
    let config = CONFIG.load(deps.storage)?;

    let mut escrow = ESCROWS.load(deps.storage, proposal_id)?;
    for outcome in 0..escrow.outcome_count {
        sub_balance(
            deps.storage,
            proposal_id,
            outcome,
            &info.sender,
            side,
            amount,
            ContractError::CompleteSetMismatch {},
        )?;
    }
    escrow.burn_complete_set(side, amount)?;
    save_escrow(deps.storage, &mut escrow)?;

    Ok(Response::new()
        .add_message(BankMsg::Send {
            to_address: info.sender.to_string(),
            amount: coins(amount.u128(), config.denom(side)),
        })
        .add_attributes(vec![
            attr("action", "burn_complete_set"),
            attr("proposal_id", proposal_id.to_string()),
            attr("sender", info.sender),
            attr("side", side.as_str()),
            attr("amount", amount),
        ]))
}

/// Redeems winning-outcome conditional coins 1:1 against the escrow.
pub fn execute_redeem(
    deps: DepsMut,
    info: MessageInfo,
    proposal_id: u64,
    outcome: u8,
    side: Side,
    amount: Uint128,
) -> Result<Response, ContractError> {
    if amount.is_zero() {
        return Err(ContractError::InvalidZeroAmount {});
    }
    let config = CONFIG.load(deps.storage)?;
    let proposal = PROPOSALS.load(deps.storage, proposal_id)?;
    if proposal.state != ProposalState::Finalized {
        return Err(ContractError::InvalidState {
            current: proposal.state,
        });
    }
    // A finalized proposal always carries its market winner
    let winner = proposal
        .market_winner
        .ok_or(ContractError::Std(cosmwasm_std::StdError::generic_err(
            "finalized proposal without market winner",
        )))?;

    let mut escrow = ESCROWS.load(deps.storage, proposal_id)?;
    escrow.redeem_winning(winner, outcome, side, amount)?;
    sub_balance(
        deps.storage,
        proposal_id,
        outcome,
        &info.sender,
        side,
        amount,
        ContractError::InsufficientSupply {},
    )?;
    save_escrow(deps.storage, &mut escrow)?;

    Ok(Response::new()
        .add_message(BankMsg::Send {
            to_address: info.sender.to_string(),
            amount: coins(amount.u128(), config.denom(side)),
        })
        .add_attributes(vec![
            attr("action", "redeem"),
            attr("proposal_id", proposal_id.to_string()),
            attr("sender", info.sender),
            attr("outcome", outcome.to_string()),
            attr("side", side.as_str()),
            attr("amount", amount),
        ]))
}
