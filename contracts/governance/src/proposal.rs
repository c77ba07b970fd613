use cosmwasm_std::{
    attr, coins, BankMsg, DepsMut, Env, Event, MessageInfo, Response, StdError, Uint128,
};
use cw_utils::must_pay;
use itertools::Itertools;

use futarchy::math::SignedU128;
use futarchy::now_ms;
use futarchy::proposal::{
    Proposal, ProposalAction, ProposalState, Sponsorship, MIN_OUTCOMES, REJECT_OUTCOME,
};

use crate::actions::{commit_plan, plan_actions, validate_action};
use crate::error::ContractError;
use crate::quantum::{quantum_split, recombine};
use crate::spot_pool::{deposits_from_funds, observe_spot};
use crate::state::{
    load_amms, next_proposal_id, save_proposal, save_spot_pool, ACTIONS, CONFIG, ESCROWS,
    PROPOSALS, SPONSORSHIPS, SPOT_POOL, TREASURY,
};

/// Opens a proposal in PREMARKET. The spot oracle must have accumulated a
/// full window, and the per-outcome fee must be attached in stable coins.
pub fn execute_create_proposal(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    title: String,
    introduction: String,
    metadata: String,
    outcome_messages: Vec<String>,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let now = now_ms(&env);

    let count = outcome_messages.len();
    if count < MIN_OUTCOMES as usize || count > config.params.max_outcomes as usize {
        return Err(ContractError::OutcomeCountOutOfRange {
            min: MIN_OUTCOMES,
            max: config.params.max_outcomes,
        });
    }
    let outcome_count = count as u8;

    let pool = SPOT_POOL.load(deps.storage)?;
    crate::spot_pool::current_spot_twap(deps.storage, &pool, now)?
        .ok_or(ContractError::SpotOracleNotReady {})?;

    let fee = config
        .params
        .proposal_fee_per_outcome
        .checked_mul(Uint128::from(outcome_count))?;
    let paid = must_pay(&info, &config.stable_denom)?;
    if paid != fee {
        return Err(ContractError::FeeMismatch { expected: fee });
    }
    TREASURY.update(deps.storage, |mut treasury| -> Result<_, ContractError> {
        treasury.stable = treasury.stable.checked_add(fee)?;
        Ok(treasury)
    })?;

    let id = next_proposal_id(deps.storage)?;
    let mut proposal = Proposal {
        id,
        title: title.clone(),
        introduction,
        metadata,
        proposer: info.sender.clone(),
        outcome_count,
        outcome_messages,
        state: ProposalState::Premarket,
        created_at_ms: now,
        review_started_at_ms: None,
        trading_started_at_ms: None,
        trading_ended_at_ms: None,
        execution_deadline_ms: None,
        market_winner: None,
        executed_outcome: None,
        execution_error: None,
        fee_paid: fee,
        version: 0,
    };
    save_proposal(deps.storage, &mut proposal)?;

    Ok(Response::new()
        .add_event(
            Event::new("proposal_created")
                .add_attribute("proposal_id", id.to_string())
                .add_attribute("proposer", &info.sender)
                .add_attribute("outcome_count", outcome_count.to_string()),
        )
        .add_attributes(vec![
            attr("action", "create_proposal"),
            attr("proposal_id", id.to_string()),
            attr("title", title),
            attr("fee", fee),
        ]))
}

/// Appends an action to one outcome's staged list. PREMARKET only, proposer
/// only.
pub fn execute_stage_action(
    deps: DepsMut,
    info: MessageInfo,
    proposal_id: u64,
    outcome: u8,
    action: ProposalAction,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let proposal = PROPOSALS.load(deps.storage, proposal_id)?;

    if proposal.state != ProposalState::Premarket {
        return Err(ContractError::PremarketLocked {});
    }
    if info.sender != proposal.proposer {
        return Err(ContractError::Unauthorized {});
    }
    if outcome >= proposal.outcome_count {
        return Err(ContractError::UnknownOutcome { outcome });
    }
    validate_action(deps.api, &config, &action)?;

    let max = config.params.max_actions_per_outcome;
    let action_type = action.action_type().to_string();
    ACTIONS.update(
        deps.storage,
        (proposal_id, outcome),
        |staged| -> Result<_, ContractError> {
            let mut staged = staged.unwrap_or_default();
            if staged.len() as u32 >= max {
                return Err(ContractError::ActionListFull { max });
            }
            staged.push(action);
            Ok(staged)
        },
    )?;

    Ok(Response::new().add_attributes(vec![
        attr("action", "stage_action"),
        attr("proposal_id", proposal_id.to_string()),
        attr("outcome", outcome.to_string()),
        attr("action_type", action_type),
    ]))
}

/// Attaches a sponsorship bias to one outcome. Allowed until trading starts;
/// attached funds are donated to the treasury.
pub fn execute_sponsor(
    deps: DepsMut,
    info: MessageInfo,
    proposal_id: u64,
    outcome: u8,
    threshold_bias: SignedU128,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let proposal = PROPOSALS.load(deps.storage, proposal_id)?;

    if !matches!(
        proposal.state,
        ProposalState::Premarket | ProposalState::Review
    ) {
        return Err(ContractError::InvalidState {
            current: proposal.state,
        });
    }
    if outcome == REJECT_OUTCOME || outcome >= proposal.outcome_count {
        return Err(ContractError::UnknownOutcome { outcome });
    }

    if let Some(existing) = SPONSORSHIPS.may_load(deps.storage, (proposal_id, outcome))? {
        if existing.sponsor != info.sender {
            return Err(ContractError::Unauthorized {});
        }
    }
    SPONSORSHIPS.save(
        deps.storage,
        (proposal_id, outcome),
        &Sponsorship {
            sponsor: info.sender.clone(),
            threshold_bias,
        },
    )?;

    let (asset_in, stable_in) = deposits_from_funds(&info, &config)?;
    if !asset_in.is_zero() || !stable_in.is_zero() {
        TREASURY.update(deps.storage, |mut treasury| -> Result<_, ContractError> {
            treasury.asset = treasury.asset.checked_add(asset_in)?;
            treasury.stable = treasury.stable.checked_add(stable_in)?;
            Ok(treasury)
        })?;
    }

    Ok(Response::new().add_attributes(vec![
        attr("action", "sponsor"),
        attr("proposal_id", proposal_id.to_string()),
        attr("outcome", outcome.to_string()),
        attr("sponsor", info.sender),
        attr("threshold_bias", threshold_bias.to_string()),
    ]))
}

/// Aborts a proposal before its markets open and refunds the fee. The escrow
/// must not hold any deposits.
pub fn execute_cancel_proposal(
    deps: DepsMut,
    info: MessageInfo,
    proposal_id: u64,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let proposal = PROPOSALS.load(deps.storage, proposal_id)?;

    if !matches!(
        proposal.state,
        ProposalState::Premarket | ProposalState::Review
    ) {
        return Err(ContractError::InvalidState {
            current: proposal.state,
        });
    }
    if info.sender != proposal.proposer {
        return Err(ContractError::Unauthorized {});
    }
    if let Some(escrow) = ESCROWS.may_load(deps.storage, proposal_id)? {
        if !escrow.spot_asset.is_zero() || !escrow.spot_stable.is_zero() {
            return Err(ContractError::EscrowNotEmpty {});
        }
    }

    TREASURY.update(deps.storage, |mut treasury| -> Result<_, ContractError> {
        treasury.stable = treasury
            .stable
            .checked_sub(proposal.fee_paid)
            .map_err(|_| ContractError::InsufficientTreasury {})?;
        Ok(treasury)
    })?;

    PROPOSALS.remove(deps.storage, proposal_id);
    ESCROWS.remove(deps.storage, proposal_id);
    for outcome in 0..proposal.outcome_count {
        ACTIONS.remove(deps.storage, (proposal_id, outcome));
        SPONSORSHIPS.remove(deps.storage, (proposal_id, outcome));
    }

    let mut response = Response::new();
    if !proposal.fee_paid.is_zero() {
        response = response.add_message(BankMsg::Send {
            to_address: proposal.proposer.to_string(),
            amount: coins(proposal.fee_paid.u128(), &config.stable_denom),
        });
    }

    Ok(response.add_attributes(vec![
        attr("action", "cancel_proposal"),
        attr("proposal_id", proposal_id.to_string()),
        attr("refund", proposal.fee_paid),
    ]))
}

/// PREMARKET → REVIEW: creates the escrow (registering the per-outcome
/// conditional coin ledgers) and locks the action lists. Permissionless.
pub fn execute_advance_to_review(
    deps: DepsMut,
    env: Env,
    proposal_id: u64,
) -> Result<Response, ContractError> {
    let mut proposal = PROPOSALS.load(deps.storage, proposal_id)?;
    if proposal.state != ProposalState::Premarket {
        return Err(ContractError::InvalidState {
            current: proposal.state,
        });
    }

    let mut escrow = futarchy::escrow::TokenEscrow::new(proposal_id, proposal.outcome_count);
    crate::state::save_escrow(deps.storage, &mut escrow)?;

    let now = now_ms(&env);
    proposal.state = ProposalState::Review;
    proposal.review_started_at_ms = Some(now);
    save_proposal(deps.storage, &mut proposal)?;

    Ok(Response::new()
        .add_event(
            Event::new("advanced_to_review")
                .add_attribute("proposal_id", proposal_id.to_string())
                .add_attribute("escrow_id", proposal_id.to_string()),
        )
        .add_attributes(vec![
            attr("action", "advance_to_review"),
            attr("proposal_id", proposal_id.to_string()),
        ]))
}

/// REVIEW → TRADING: quantum-splits spot liquidity into the conditional
/// markets and takes the spot pool's single-proposal lock.
pub fn execute_advance_to_trading(
    deps: DepsMut,
    env: Env,
    proposal_id: u64,
    split_ratio_pct: Option<u8>,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut proposal = PROPOSALS.load(deps.storage, proposal_id)?;
    if proposal.state != ProposalState::Review {
        return Err(ContractError::InvalidState {
            current: proposal.state,
        });
    }

    let now = now_ms(&env);
    let review_started = proposal.review_started_at_ms.unwrap_or(u64::MAX);
    if now < review_started.saturating_add(config.params.review_period_ms) {
        return Err(ContractError::ReviewPeriodNotElapsed {});
    }

    let mut pool = SPOT_POOL.load(deps.storage)?;
    if let Some(holder) = pool.active_proposal_id {
        return Err(ContractError::SpotPoolBusy {
            proposal_id: holder,
        });
    }

    let ratio = split_ratio_pct.unwrap_or(config.params.conditional_liquidity_ratio_pct);
    if !(1..=99).contains(&ratio) {
        return Err(ContractError::InvalidRatio {});
    }

    let (split_asset, split_stable) =
        quantum_split(deps.storage, &config, &proposal, &mut pool, ratio, now)?;
    save_spot_pool(deps.storage, &mut pool)?;

    proposal.state = ProposalState::Trading;
    proposal.trading_started_at_ms = Some(now);
    proposal.trading_ended_at_ms = Some(now.saturating_add(config.params.trading_period_ms));
    save_proposal(deps.storage, &mut proposal)?;

    Ok(Response::new()
        .add_event(
            Event::new("advanced_to_trading")
                .add_attribute("proposal_id", proposal_id.to_string())
                .add_attribute("split_ratio_pct", ratio.to_string())
                .add_attribute("split_asset", split_asset)
                .add_attribute("split_stable", split_stable),
        )
        .add_attributes(vec![
            attr("action", "advance_to_trading"),
            attr("proposal_id", proposal_id.to_string()),
        ]))
}

/// Selects the market winner from frozen TWAPs. Candidates are the non-REJECT
/// outcomes whose biased TWAP delta over REJECT strictly exceeds the win
/// threshold; among them the highest TWAP wins, ties to the lowest index.
pub fn select_winner(
    twaps: &[Uint128],
    biases: &[SignedU128],
    win_threshold: &SignedU128,
) -> u8 {
    let reject_twap = twaps[REJECT_OUTCOME as usize];
    let mut winner = REJECT_OUTCOME;
    let mut best_twap: Option<Uint128> = None;

    for (i, twap) in twaps.iter().enumerate().skip(1) {
        let delta = SignedU128::from_diff(*twap, reject_twap).saturating_add(biases[i]);
        if delta > *win_threshold && best_twap.map_or(true, |best| *twap > best) {
            winner = i as u8;
            best_twap = Some(*twap);
        }
    }

    winner
}

/// TRADING → AWAITING_EXECUTION: freezes the per-market TWAPs, picks the
/// winner and recombines the winning market into the spot pool.
pub fn execute_finalize(
    deps: DepsMut,
    env: Env,
    proposal_id: u64,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut proposal = PROPOSALS.load(deps.storage, proposal_id)?;
    if proposal.state != ProposalState::Trading {
        return Err(ContractError::InvalidState {
            current: proposal.state,
        });
    }

    let now = now_ms(&env);
    let trading_end = proposal
        .trading_ended_at_ms
        .ok_or_else(|| StdError::generic_err("trading proposal without end timestamp"))?;
    if now < trading_end {
        return Err(ContractError::TradingPeriodNotElapsed {});
    }

    let amms = load_amms(deps.storage, proposal_id, proposal.outcome_count)?;
    let twaps: Vec<Uint128> = amms
        .iter()
        .map(|amm| amm.oracle.twap(trading_end).unwrap_or(amm.oracle.initial_price))
        .collect();
    let biases: Vec<SignedU128> = (0..proposal.outcome_count)
        .map(|outcome| {
            Ok(SPONSORSHIPS
                .may_load(deps.storage, (proposal_id, outcome))?
                .map(|s| s.threshold_bias)
                .unwrap_or(SignedU128::ZERO))
        })
        .collect::<Result<_, StdError>>()?;

    let winner = select_winner(&twaps, &biases, &config.params.twap_win_threshold);

    let mut pool = SPOT_POOL.load(deps.storage)?;
    let (recombined_asset, recombined_stable) =
        recombine(deps.storage, &proposal, &mut pool, winner)?;
    observe_spot(deps.storage, &mut pool, now)?;
    save_spot_pool(deps.storage, &mut pool)?;

    let deadline = now.saturating_add(config.params.execution_window_ms);
    proposal.state = ProposalState::AwaitingExecution;
    proposal.market_winner = Some(winner);
    proposal.execution_deadline_ms = Some(deadline);
    save_proposal(deps.storage, &mut proposal)?;

    Ok(Response::new()
        .add_event(
            Event::new("proposal_market_finalized")
                .add_attribute("proposal_id", proposal_id.to_string())
                .add_attribute("winning_outcome", winner.to_string())
                .add_attribute("approved", (winner != REJECT_OUTCOME).to_string()),
        )
        .add_event(
            Event::new("execution_window_started")
                .add_attribute("proposal_id", proposal_id.to_string())
                .add_attribute("market_winner", winner.to_string())
                .add_attribute("execution_deadline", deadline.to_string()),
        )
        .add_attributes(vec![
            attr("action", "finalize"),
            attr("proposal_id", proposal_id.to_string()),
            attr("twaps", twaps.iter().join(",")),
            attr("winner", winner.to_string()),
            attr("recombined_asset", recombined_asset),
            attr("recombined_stable", recombined_stable),
        ]))
}

/// AWAITING_EXECUTION → FINALIZED: runs the winning outcome's actions once.
/// A failing handler or a closed execution window still finalizes the
/// proposal, with `executed_outcome` left empty.
pub fn execute_execute(
    deps: DepsMut,
    env: Env,
    proposal_id: u64,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut proposal = PROPOSALS.load(deps.storage, proposal_id)?;
    if proposal.state != ProposalState::AwaitingExecution {
        return Err(ContractError::InvalidState {
            current: proposal.state,
        });
    }

    let now = now_ms(&env);
    let deadline = proposal.execution_deadline_ms.unwrap_or_default();
    if now > deadline {
        proposal.state = ProposalState::Finalized;
        proposal.executed_outcome = None;
        proposal.execution_error =
            Some(ContractError::ExecutionWindowClosed {}.to_string());
        save_proposal(deps.storage, &mut proposal)?;

        return Ok(Response::new()
            .add_event(
                Event::new("execution_timed_out")
                    .add_attribute("proposal_id", proposal_id.to_string()),
            )
            .add_attributes(vec![
                attr("action", "execute"),
                attr("proposal_id", proposal_id.to_string()),
                attr("result", "timed_out"),
            ]));
    }

    let winner = proposal
        .market_winner
        .ok_or_else(|| StdError::generic_err("awaiting proposal without market winner"))?;

    // REJECT wins: nothing executes
    if winner == REJECT_OUTCOME {
        proposal.state = ProposalState::Finalized;
        proposal.executed_outcome = Some(REJECT_OUTCOME);
        save_proposal(deps.storage, &mut proposal)?;

        return Ok(Response::new()
            .add_event(
                Event::new("proposal_execution_succeeded")
                    .add_attribute("proposal_id", proposal_id.to_string())
                    .add_attribute("executed_outcome", REJECT_OUTCOME.to_string()),
            )
            .add_attributes(vec![
                attr("action", "execute"),
                attr("proposal_id", proposal_id.to_string()),
                attr("result", "rejected"),
            ]));
    }

    let actions = ACTIONS
        .may_load(deps.storage, (proposal_id, winner))?
        .unwrap_or_default();
    let mut pool = SPOT_POOL.load(deps.storage)?;

    let response = match plan_actions(deps.storage, deps.api, &config, &pool, &actions, now) {
        Ok(mut plan) => {
            commit_plan(deps.storage, &mut pool, &mut plan)?;
            save_spot_pool(deps.storage, &mut pool)?;
            proposal.executed_outcome = Some(winner);

            Response::new()
                .add_messages(plan.messages)
                .add_event(
                    Event::new("proposal_execution_succeeded")
                        .add_attribute("proposal_id", proposal_id.to_string())
                        .add_attribute("executed_outcome", winner.to_string())
                        .add_attribute("actions", actions.len().to_string()),
                )
                .add_attributes(vec![
                    attr("action", "execute"),
                    attr("proposal_id", proposal_id.to_string()),
                    attr("result", "executed"),
                ])
                .add_attributes(plan.attributes)
        }
        Err(err) => {
            proposal.executed_outcome = None;
            proposal.execution_error = Some(err.to_string());

            Response::new().add_attributes(vec![
                attr("action", "execute"),
                attr("proposal_id", proposal_id.to_string()),
                attr("result", "failed"),
                attr("execution_error", err.to_string()),
            ])
        }
    };

    proposal.state = ProposalState::Finalized;
    save_proposal(deps.storage, &mut proposal)?;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(value: u128) -> Uint128 {
        Uint128::new(value)
    }

    #[test]
    fn reject_wins_without_challengers() {
        let twaps = vec![p(100), p(100), p(100)];
        let biases = vec![SignedU128::ZERO; 3];
        assert_eq!(select_winner(&twaps, &biases, &SignedU128::ZERO), 0);
    }

    #[test]
    fn highest_twap_above_threshold_wins() {
        let twaps = vec![p(100), p(150), p(250)];
        let biases = vec![SignedU128::ZERO; 3];
        assert_eq!(select_winner(&twaps, &biases, &SignedU128::ZERO), 2);
    }

    #[test]
    fn equal_twaps_pick_the_lowest_index() {
        let twaps = vec![p(100), p(100), p(300), p(300)];
        let biases = vec![SignedU128::ZERO; 4];
        assert_eq!(select_winner(&twaps, &biases, &SignedU128::ZERO), 2);
    }

    #[test]
    fn threshold_must_be_strictly_exceeded() {
        let twaps = vec![p(100), p(150)];
        let biases = vec![SignedU128::ZERO; 2];
        assert_eq!(
            select_winner(&twaps, &biases, &SignedU128::positive(50u128)),
            0
        );
        assert_eq!(
            select_winner(&twaps, &biases, &SignedU128::positive(49u128)),
            1
        );
    }

    #[test]
    fn sponsorship_bias_is_additive() {
        let twaps = vec![p(100), p(90)];
        let mut biases = vec![SignedU128::ZERO; 2];
        assert_eq!(select_winner(&twaps, &biases, &SignedU128::ZERO), 0);

        biases[1] = SignedU128::positive(20u128);
        assert_eq!(select_winner(&twaps, &biases, &SignedU128::ZERO), 1);
    }

    #[test]
    fn negative_threshold_lets_laggards_win() {
        let twaps = vec![p(100), p(95)];
        let biases = vec![SignedU128::ZERO; 2];
        assert_eq!(
            select_winner(&twaps, &biases, &SignedU128::negative(10u128)),
            1
        );
    }
}
