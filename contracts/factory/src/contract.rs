use cosmwasm_std::{
    attr, entry_point, to_json_binary, Binary, Deps, DepsMut, Env, Event, MessageInfo, Order,
    Reply, ReplyOn, Response, StdResult, SubMsg, WasmMsg,
};
use cw2::{get_contract_version, set_contract_version};
use cw_storage_plus::Bound;
use cw_utils::parse_reply_instantiate_data;

use futarchy::common::{claim_ownership, drop_ownership_proposal, propose_new_owner};
use futarchy::dao::DaoParams;
use futarchy::factory::{Config, DaoRecord, ExecuteMsg, InstantiateMsg, MigrateMsg, QueryMsg};
use futarchy::governance::InstantiateMsg as GovernanceInstantiateMsg;

use crate::error::ContractError;
use crate::state::{next_dao_id, TmpDaoInfo, CONFIG, DAOS, OWNERSHIP_PROPOSAL, TMP_DAO_INFO};

/// Contract name that is used for migration.
const CONTRACT_NAME: &str = "futarchy-factory";
/// Contract version that is used for migration.
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");
/// A `reply` call code ID used for governance instantiation sub-messages.
const INSTANTIATE_DAO_REPLY_ID: u64 = 1;

/// ## Pagination settings
/// The maximum limit for reading DAOs from [`DAOS`]
const MAX_LIMIT: u32 = 30;
/// The default limit for reading DAOs from [`DAOS`]
const DEFAULT_LIMIT: u32 = 10;

/// Creates a new contract with the specified parameters in the
/// [`InstantiateMsg`].
#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    _info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    let config = Config {
        owner: deps.api.addr_validate(&msg.owner)?,
        governance_code_id: msg.governance_code_id,
    };
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new())
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
        ExecuteMsg::CreateDao {
            dao_name,
            asset_denom,
            stable_denom,
            params,
            dao_owner,
            action_dispatcher,
        } => create_dao(
            deps,
            info,
            dao_name,
            asset_denom,
            stable_denom,
            params,
            dao_owner,
            action_dispatcher,
        ),
        ExecuteMsg::UpdateConfig { governance_code_id } => {
            update_config(deps, info, governance_code_id)
        }
        ExecuteMsg::ProposeNewOwner { owner, expires_in } => {
            let config = CONFIG.load(deps.storage)?;
            propose_new_owner(
                deps,
                info,
                env,
                owner,
                expires_in,
                config.owner,
                OWNERSHIP_PROPOSAL,
            )
            .map_err(Into::into)
        }
        ExecuteMsg::DropOwnershipProposal {} => {
            let config = CONFIG.load(deps.storage)?;
            drop_ownership_proposal(deps, info, config.owner, OWNERSHIP_PROPOSAL)
                .map_err(Into::into)
        }
        ExecuteMsg::ClaimOwnership {} => {
            claim_ownership(deps, info, env, OWNERSHIP_PROPOSAL, |deps, new_owner| {
                CONFIG.update(deps.storage, |mut config| -> StdResult<_> {
                    config.owner = new_owner;
                    Ok(config)
                })?;
                Ok(())
            })
            .map_err(Into::into)
        }
    }
}

/// Instantiates a governance contract for a new DAO. The DAO is registered
/// once the instantiation reply arrives.
#[allow(clippy::too_many_arguments)]
fn create_dao(
    deps: DepsMut,
    info: MessageInfo,
    dao_name: String,
    asset_denom: String,
    stable_denom: String,
    params: DaoParams,
    dao_owner: Option<String>,
    action_dispatcher: Option<String>,
) -> Result<Response, ContractError> {
    if asset_denom == stable_denom {
        return Err(ContractError::DoublingDenoms {});
    }
    params.validate()?;

    let config = CONFIG.load(deps.storage)?;
    let dao_owner = dao_owner.unwrap_or_else(|| info.sender.to_string());
    deps.api.addr_validate(&dao_owner)?;

    let dao_id = next_dao_id(deps.storage)?;
    TMP_DAO_INFO.save(
        deps.storage,
        &TmpDaoInfo {
            dao_id,
            name: dao_name.clone(),
            asset_denom: asset_denom.clone(),
            stable_denom: stable_denom.clone(),
        },
    )?;

    let sub_msg = SubMsg {
        msg: WasmMsg::Instantiate {
            admin: None,
            code_id: config.governance_code_id,
            msg: to_json_binary(&GovernanceInstantiateMsg {
                owner: dao_owner,
                dao_name: dao_name.clone(),
                asset_denom,
                stable_denom,
                params,
                action_dispatcher,
            })?,
            funds: vec![],
            label: format!("Futarchy DAO {dao_name}"),
        }
        .into(),
        id: INSTANTIATE_DAO_REPLY_ID,
        gas_limit: None,
        reply_on: ReplyOn::Success,
    };

    Ok(Response::new().add_submessage(sub_msg).add_attributes(vec![
        attr("action", "create_dao"),
        attr("dao_id", dao_id.to_string()),
        attr("dao_name", dao_name),
    ]))
}

/// Updates the governance code id used for new DAOs. Owner only.
fn update_config(
    deps: DepsMut,
    info: MessageInfo,
    governance_code_id: Option<u64>,
) -> Result<Response, ContractError> {
    let mut config = CONFIG.load(deps.storage)?;
    if info.sender != config.owner {
        return Err(ContractError::Unauthorized {});
    }

    if let Some(code_id) = governance_code_id {
        config.governance_code_id = code_id;
    }
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new().add_attributes(vec![attr("action", "update_config")]))
}

/// The entry point to the contract for processing replies from submessages.
#[cfg_attr(not(feature = "library"), entry_point)]
pub fn reply(deps: DepsMut, _env: Env, msg: Reply) -> Result<Response, ContractError> {
    if msg.id != INSTANTIATE_DAO_REPLY_ID {
        return Err(
            cosmwasm_std::StdError::generic_err(format!("Unknown reply ID: {}", msg.id)).into(),
        );
    }

    let tmp = TMP_DAO_INFO.load(deps.storage)?;
    let res = parse_reply_instantiate_data(msg)?;
    let governance_addr = deps.api.addr_validate(&res.contract_address)?;

    let record = DaoRecord {
        dao_id: tmp.dao_id,
        name: tmp.name,
        governance_addr: governance_addr.clone(),
        asset_denom: tmp.asset_denom,
        stable_denom: tmp.stable_denom,
    };
    DAOS.save(deps.storage, tmp.dao_id, &record)?;
    TMP_DAO_INFO.remove(deps.storage);

    Ok(Response::new()
        .add_event(
            Event::new("dao_created")
                .add_attribute("dao_id", record.dao_id.to_string())
                .add_attribute("dao_name", record.name)
                .add_attribute("governance_addr", &governance_addr),
        )
        .add_attributes(vec![
            attr("action", "register_dao"),
            attr("governance_addr", governance_addr),
        ]))
}

/// Exposes all the queries available in the contract.
#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, _env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::Config {} => to_json_binary(&CONFIG.load(deps.storage)?),
        QueryMsg::Dao { dao_id } => to_json_binary(&DAOS.load(deps.storage, dao_id)?),
        QueryMsg::Daos { start_after, limit } => {
            to_json_binary(&read_daos(deps, start_after, limit)?)
        }
    }
}

/// Reads DAO records according to the `start_after` and `limit` variables.
fn read_daos(
    deps: Deps,
    start_after: Option<u64>,
    limit: Option<u32>,
) -> StdResult<Vec<DaoRecord>> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;
    DAOS.range(
        deps.storage,
        start_after.map(Bound::exclusive),
        None,
        Order::Ascending,
    )
    .take(limit)
    .map(|item| Ok(item?.1))
    .collect()
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
