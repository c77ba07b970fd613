use cosmwasm_std::{
    attr, entry_point, to_json_binary, Binary, Deps, DepsMut, Env, MessageInfo, Response,
    StdError, StdResult,
};
use cw2::{get_contract_version, set_contract_version};

use futarchy::governance::{ExecuteMsg, InstantiateMsg, MigrateMsg, QueryMsg};
use futarchy::now_ms;
use futarchy::oracle::PcwOracle;
use futarchy::spot::SpotPool;

use crate::error::ContractError;
use crate::state::{
    Config, Treasury, CONFIG, SPOT_CHECKPOINTS, SPOT_CHECKPOINT_CAPACITY, SPOT_POOL, TREASURY,
};
use crate::{amm, arbitrage, escrow, grants, proposal, queries, spot_pool};

/// Contract name that is used for migration.
const CONTRACT_NAME: &str = "futarchy-governance";
/// Contract version that is used for migration.
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Creates a new governance contract with the specified parameters in the
/// [`InstantiateMsg`]. One instance governs one DAO.
#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    if msg.asset_denom == msg.stable_denom {
        return Err(StdError::generic_err("asset and stable denoms must differ").into());
    }
    msg.params.validate()?;

    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    let config = Config {
        factory: info.sender,
        owner: deps.api.addr_validate(&msg.owner)?,
        dao_name: msg.dao_name.clone(),
        asset_denom: msg.asset_denom,
        stable_denom: msg.stable_denom,
        action_dispatcher: msg
            .action_dispatcher
            .map(|addr| deps.api.addr_validate(&addr))
            .transpose()?,
        params: msg.params,
    };

    let oracle = PcwOracle::new(
        config.params.pcw_window_ms,
        config.params.pcw_max_movement_ppm,
        now_ms(&env),
    );
    let pool = SpotPool::new(config.params.spot_fee_bps, oracle);

    CONFIG.save(deps.storage, &config)?;
    TREASURY.save(deps.storage, &Treasury::default())?;
    SPOT_POOL.save(deps.storage, &pool)?;
    SPOT_CHECKPOINTS.init(deps.storage, SPOT_CHECKPOINT_CAPACITY)?;

    Ok(Response::new().add_attributes(vec![
        attr("action", "instantiate"),
        attr("dao_name", msg.dao_name),
    ]))
}

/// Exposes all the execute functions available in the contract.
#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        ExecuteMsg::CreateProposal {
            title,
            introduction,
            metadata,
            outcome_messages,
        } => proposal::execute_create_proposal(
            deps,
            env,
            info,
            title,
            introduction,
            metadata,
            outcome_messages,
        ),
        ExecuteMsg::StageAction {
            proposal_id,
            outcome,
            action,
        } => proposal::execute_stage_action(deps, info, proposal_id, outcome, action),
        ExecuteMsg::Sponsor {
            proposal_id,
            outcome,
            threshold_bias,
        } => proposal::execute_sponsor(deps, info, proposal_id, outcome, threshold_bias),
        ExecuteMsg::CancelProposal { proposal_id } => {
            proposal::execute_cancel_proposal(deps, info, proposal_id)
        }
        ExecuteMsg::AdvanceToReview { proposal_id } => {
            proposal::execute_advance_to_review(deps, env, proposal_id)
        }
        ExecuteMsg::AdvanceToTrading {
            proposal_id,
            split_ratio_pct,
        } => proposal::execute_advance_to_trading(deps, env, proposal_id, split_ratio_pct),
        ExecuteMsg::Finalize { proposal_id } => proposal::execute_finalize(deps, env, proposal_id),
        ExecuteMsg::Execute { proposal_id } => proposal::execute_execute(deps, env, proposal_id),
        ExecuteMsg::SwapSpot {
            direction,
            min_out,
            to,
        } => spot_pool::execute_swap_spot(deps, env, info, direction, min_out, to),
        ExecuteMsg::SwapConditional {
            proposal_id,
            outcome,
            direction,
            amount_in,
            min_out,
        } => amm::execute_swap_conditional(
            deps,
            env,
            info,
            proposal_id,
            outcome,
            direction,
            amount_in,
            min_out,
        ),
        ExecuteMsg::MintCompleteSet { proposal_id, side } => {
            escrow::execute_mint_complete_set(deps, info, proposal_id, side)
        }
        ExecuteMsg::BurnCompleteSet {
            proposal_id,
            side,
            amount,
        } => escrow::execute_burn_complete_set(deps, info, proposal_id, side, amount),
        ExecuteMsg::Redeem {
            proposal_id,
            outcome,
            side,
            amount,
        } => escrow::execute_redeem(deps, info, proposal_id, outcome, side, amount),
        ExecuteMsg::ProvideLiquidity { min_lp } => {
            spot_pool::execute_provide_liquidity(deps, env, info, min_lp)
        }
        ExecuteMsg::WithdrawLiquidity {
            lp_amount,
            min_asset,
            min_stable,
        } => spot_pool::execute_withdraw_liquidity(
            deps, env, info, lp_amount, min_asset, min_stable,
        ),
        ExecuteMsg::MarkForWithdrawal { lp_amount } => {
            spot_pool::execute_mark_for_withdrawal(deps, info, lp_amount)
        }
        ExecuteMsg::ClaimWithdrawal { lp_amount } => {
            spot_pool::execute_claim_withdrawal(deps, env, info, lp_amount)
        }
        ExecuteMsg::Arbitrage {
            proposal_id,
            min_profit,
        } => arbitrage::execute_arbitrage_cmd(deps, env, info, proposal_id, min_profit),
        ExecuteMsg::ClaimGrant { grant_id, tier } => {
            grants::execute_claim_grant(deps, env, info, grant_id, tier)
        }
        ExecuteMsg::ClaimStream { stream_id } => {
            grants::execute_claim_stream(deps, env, info, stream_id)
        }
        ExecuteMsg::Deposit {} => execute_deposit(deps, info),
        ExecuteMsg::UpdateConfig { params } => execute_update_config(deps, info, *params),
    }
}

/// Donates attached coins to the treasury.
fn execute_deposit(deps: DepsMut, info: MessageInfo) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let (asset, stable) = spot_pool::deposits_from_funds(&info, &config)?;
    if asset.is_zero() && stable.is_zero() {
        return Err(ContractError::InvalidZeroAmount {});
    }

    TREASURY.update(deps.storage, |mut treasury| -> Result<_, ContractError> {
        treasury.asset = treasury.asset.checked_add(asset)?;
        treasury.stable = treasury.stable.checked_add(stable)?;
        Ok(treasury)
    })?;

    Ok(Response::new().add_attributes(vec![
        attr("action", "deposit"),
        attr("sender", info.sender),
        attr("asset", asset),
        attr("stable", stable),
    ]))
}

/// Replaces the DAO parameters. Owner only; new parameters apply to
/// proposals created afterwards.
fn execute_update_config(
    deps: DepsMut,
    info: MessageInfo,
    params: futarchy::dao::DaoParams,
) -> Result<Response, ContractError> {
    let mut config = CONFIG.load(deps.storage)?;
    if info.sender != config.owner {
        return Err(ContractError::Unauthorized {});
    }
    params.validate()?;

    let mut pool = SPOT_POOL.load(deps.storage)?;
    pool.fee_bps = params.spot_fee_bps;
    crate::state::save_spot_pool(deps.storage, &mut pool)?;

    config.params = params;
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new().add_attributes(vec![attr("action", "update_config")]))
}

/// Exposes all the queries available in the contract.
#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::Config {} => to_json_binary(&queries::query_config(deps)?),
        QueryMsg::Proposal { proposal_id } => {
            to_json_binary(&crate::state::PROPOSALS.load(deps.storage, proposal_id)?)
        }
        QueryMsg::Proposals { start_after, limit } => {
            to_json_binary(&queries::query_proposals(deps, start_after, limit)?)
        }
        QueryMsg::Actions {
            proposal_id,
            outcome,
        } => to_json_binary(&queries::query_actions(deps, proposal_id, outcome)?),
        QueryMsg::Sponsorships { proposal_id } => {
            to_json_binary(&queries::query_sponsorships(deps, proposal_id)?)
        }
        QueryMsg::Escrow { proposal_id } => {
            to_json_binary(&queries::query_escrow(deps, proposal_id)?)
        }
        QueryMsg::ConditionalBalance {
            proposal_id,
            outcome,
            address,
        } => to_json_binary(&queries::query_conditional_balance(
            deps,
            proposal_id,
            outcome,
            address,
        )?),
        QueryMsg::Amm {
            proposal_id,
            outcome,
        } => to_json_binary(&crate::state::AMMS.load(deps.storage, (proposal_id, outcome))?),
        QueryMsg::Twaps { proposal_id } => {
            to_json_binary(&queries::query_twaps(deps, env, proposal_id)?)
        }
        QueryMsg::NoArbBand { proposal_id } => {
            to_json_binary(&queries::query_no_arb_band(deps, proposal_id)?)
        }
        QueryMsg::SpotPool {} => to_json_binary(&SPOT_POOL.load(deps.storage)?),
        QueryMsg::SpotPrice {} => to_json_binary(&queries::query_spot_price(deps)?),
        QueryMsg::SpotTwap {} => to_json_binary(&queries::query_spot_twap(deps, env)?),
        QueryMsg::LpPosition { address } => {
            to_json_binary(&queries::query_lp_position(deps, address)?)
        }
        QueryMsg::SimulateSpotSwap {
            direction,
            amount_in,
        } => to_json_binary(&queries::query_simulate_spot_swap(deps, direction, amount_in)?),
        QueryMsg::SimulateConditionalSwap {
            proposal_id,
            outcome,
            direction,
            amount_in,
        } => to_json_binary(&queries::query_simulate_conditional_swap(
            deps,
            proposal_id,
            outcome,
            direction,
            amount_in,
        )?),
        QueryMsg::Treasury {} => to_json_binary(&queries::query_treasury(deps)?),
        QueryMsg::Grant { grant_id } => {
            to_json_binary(&crate::state::GRANTS.load(deps.storage, grant_id)?)
        }
        QueryMsg::Grants { start_after, limit } => {
            to_json_binary(&queries::query_grants(deps, start_after, limit)?)
        }
        QueryMsg::Stream { stream_id } => {
            to_json_binary(&crate::state::STREAMS.load(deps.storage, stream_id)?)
        }
        QueryMsg::Streams { start_after, limit } => {
            to_json_binary(&queries::query_streams(deps, start_after, limit)?)
        }
    }
}

/// Manages the contract migration.
#[cfg_attr(not(feature = "library"), entry_point)]
pub fn migrate(deps: DepsMut, _env: Env, _msg: MigrateMsg) -> Result<Response, ContractError> {
    let contract_version = get_contract_version(deps.storage)?;
    if contract_version.contract != CONTRACT_NAME {
        return Err(ContractError::MigrationError {});
    }

    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    Ok(Response::default().add_attributes([
        ("previous_contract_name", contract_version.contract.as_str()),
        (
            "previous_contract_version",
            contract_version.version.as_str(),
        ),
        ("new_contract_name", CONTRACT_NAME),
        ("new_contract_version", CONTRACT_VERSION),
    ]))
}
