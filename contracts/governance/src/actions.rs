use cosmwasm_std::{
    attr, coins, Addr, Api, Attribute, BankMsg, CosmosMsg, Storage, Uint128, WasmMsg,
};

use futarchy::escrow::Side;
use futarchy::proposal::{Grant, GrantTierState, ProposalAction, Stream};
use futarchy::spot::SpotPool;

use crate::error::ContractError;
use crate::spot_pool::current_spot_twap;
use crate::state::{
    next_grant_id, next_stream_id, Config, Treasury, CONFIG, GRANTS, STREAMS, TREASURY,
};

fn side_of_denom(config: &Config, denom: &str) -> Result<Side, ContractError> {
    if denom == config.asset_denom {
        Ok(Side::Asset)
    } else if denom == config.stable_denom {
        Ok(Side::Stable)
    } else {
        Err(ContractError::InvalidCoinType {})
    }
}

fn debit(treasury: &mut Treasury, side: Side, amount: Uint128) -> Result<(), ContractError> {
    let balance = treasury.side_mut(side);
    *balance = balance
        .checked_sub(amount)
        .map_err(|_| ContractError::InsufficientTreasury {})?;
    Ok(())
}

/// Stage-time validation: the tag must be known (or a dispatcher configured)
/// and all embedded addresses, denoms and amounts must be well-formed.
pub fn validate_action(
    api: &dyn Api,
    config: &Config,
    action: &ProposalAction,
) -> Result<(), ContractError> {
    match action {
        ProposalAction::Memo { .. } => Ok(()),
        ProposalAction::Transfer {
            recipient,
            denom,
            amount,
        } => {
            api.addr_validate(recipient)?;
            side_of_denom(config, denom)?;
            if amount.is_zero() {
                return Err(ContractError::InvalidZeroAmount {});
            }
            Ok(())
        }
        ProposalAction::CreateStream {
            recipient,
            denom,
            amount,
            ..
        } => {
            api.addr_validate(recipient)?;
            side_of_denom(config, denom)?;
            if amount.is_zero() {
                return Err(ContractError::InvalidZeroAmount {});
            }
            Ok(())
        }
        ProposalAction::CreateGrant { denom, tiers } => {
            side_of_denom(config, denom)?;
            if tiers.is_empty() {
                return Err(ContractError::InvalidZeroAmount {});
            }
            for tier in tiers {
                api.addr_validate(&tier.recipient)?;
                if tier.amount.is_zero() {
                    return Err(ContractError::InvalidZeroAmount {});
                }
            }
            Ok(())
        }
        ProposalAction::UpdateTradingParams { .. } => Ok(()),
        ProposalAction::UpdateDaoConfig { params } => {
            params.validate()?;
            Ok(())
        }
        ProposalAction::Unknown { action_type, .. } => {
            if config.action_dispatcher.is_none() {
                return Err(ContractError::UnknownActionType {
                    action_type: action_type.clone(),
                });
            }
            Ok(())
        }
    }
}

/// Everything a successful execution run wants to persist and emit.
/// Collected in memory first so a failing handler leaves no partial writes.
pub struct ExecutionPlan {
    pub messages: Vec<CosmosMsg>,
    pub attributes: Vec<Attribute>,
    pub config: Option<Config>,
    pub treasury: Treasury,
    pub grants: Vec<Grant>,
    pub streams: Vec<Stream>,
    pub spot_fee_bps: Option<u16>,
}

/// Runs the winning outcome's handlers in order, producing an execution
/// plan. The first failing handler aborts the whole run.
pub fn plan_actions(
    storage: &dyn Storage,
    api: &dyn Api,
    config: &Config,
    pool: &SpotPool,
    actions: &[ProposalAction],
    now_ms: u64,
) -> Result<ExecutionPlan, ContractError> {
    let mut plan = ExecutionPlan {
        messages: vec![],
        attributes: vec![],
        config: None,
        treasury: TREASURY.load(storage)?,
        grants: vec![],
        streams: vec![],
        spot_fee_bps: None,
    };
    let mut new_config = config.clone();
    let mut config_changed = false;

    for action in actions {
        match action {
            ProposalAction::Memo { text } => {
                plan.attributes.push(attr("memo", text));
            }
            ProposalAction::Transfer {
                recipient,
                denom,
                amount,
            } => {
                let recipient = api.addr_validate(recipient)?;
                debit(&mut plan.treasury, side_of_denom(&new_config, denom)?, *amount)?;
                plan.messages.push(
                    BankMsg::Send {
                        to_address: recipient.to_string(),
                        amount: coins(amount.u128(), denom),
                    }
                    .into(),
                );
                plan.attributes
                    .push(attr("transfer", format!("{amount}{denom} to {recipient}")));
            }
            ProposalAction::CreateStream {
                recipient,
                denom,
                amount,
                start_ms,
                duration_ms,
            } => {
                let recipient = api.addr_validate(recipient)?;
                debit(&mut plan.treasury, side_of_denom(&new_config, denom)?, *amount)?;
                plan.streams.push(Stream {
                    id: 0,
                    recipient,
                    denom: denom.clone(),
                    total: *amount,
                    claimed: Uint128::zero(),
                    start_ms: *start_ms,
                    duration_ms: *duration_ms,
                    version: 0,
                });
            }
            ProposalAction::CreateGrant { denom, tiers } => {
                side_of_denom(&new_config, denom)?;
                let baseline = current_spot_twap(storage, pool, now_ms)?
                    .ok_or(ContractError::SpotOracleNotReady {})?;

                let mut total = Uint128::zero();
                let mut tier_states = Vec::with_capacity(tiers.len());
                for tier in tiers {
                    total = total.checked_add(tier.amount)?;
                    tier_states.push(GrantTierState {
                        recipient: api.addr_validate(&tier.recipient)?,
                        amount: tier.amount,
                        threshold: tier.threshold,
                        claimed: false,
                    });
                }
                debit(&mut plan.treasury, side_of_denom(&new_config, denom)?, total)?;

                plan.grants.push(Grant {
                    id: 0,
                    denom: denom.clone(),
                    baseline_twap: baseline,
                    tiers: tier_states,
                    created_at_ms: now_ms,
                    version: 0,
                });
            }
            ProposalAction::UpdateTradingParams {
                amm_fee_bps,
                spot_fee_bps,
                twap_step_max,
                twap_start_delay_ms,
            } => {
                if let Some(bps) = amm_fee_bps {
                    new_config.params.amm_fee_bps = *bps;
                }
                if let Some(bps) = spot_fee_bps {
                    new_config.params.spot_fee_bps = *bps;
                    plan.spot_fee_bps = Some(*bps);
                }
                if let Some(step) = twap_step_max {
                    new_config.params.twap_step_max = *step;
                }
                if let Some(delay) = twap_start_delay_ms {
                    new_config.params.twap_start_delay_ms = *delay;
                }
                new_config.params.validate()?;
                config_changed = true;
                plan.attributes.push(attr("updated", "trading_params"));
            }
            ProposalAction::UpdateDaoConfig { params } => {
                params.validate()?;
                new_config.params = *params.clone();
                plan.spot_fee_bps = Some(params.spot_fee_bps);
                config_changed = true;
                plan.attributes.push(attr("updated", "dao_config"));
            }
            ProposalAction::Unknown {
                action_type,
                payload,
            } => {
                let dispatcher = new_config.action_dispatcher.as_ref().ok_or_else(|| {
                    ContractError::UnknownActionType {
                        action_type: action_type.clone(),
                    }
                })?;
                plan.messages.push(
                    WasmMsg::Execute {
                        contract_addr: dispatcher.to_string(),
                        msg: payload.clone(),
                        funds: vec![],
                    }
                    .into(),
                );
                plan.attributes.push(attr("dispatched", action_type));
            }
        }
    }

    if config_changed {
        plan.config = Some(new_config);
    }
    Ok(plan)
}

/// Persists an execution plan. Messages and attributes stay with the caller.
pub fn commit_plan(
    storage: &mut dyn Storage,
    pool: &mut SpotPool,
    plan: &mut ExecutionPlan,
) -> Result<(), ContractError> {
    TREASURY.save(storage, &plan.treasury)?;
    if let Some(config) = &plan.config {
        CONFIG.save(storage, config)?;
    }
    if let Some(bps) = plan.spot_fee_bps {
        pool.fee_bps = bps;
    }
    for grant in plan.grants.iter_mut() {
        grant.id = next_grant_id(storage)?;
        grant.version = 1;
        GRANTS.save(storage, grant.id, grant)?;
    }
    for stream in plan.streams.iter_mut() {
        stream.id = next_stream_id(storage)?;
        stream.version = 1;
        STREAMS.save(storage, stream.id, stream)?;
    }
    Ok(())
}
