use cosmwasm_schema::cw_serde;
use cosmwasm_std::{attr, Addr, DepsMut, Env, MessageInfo, Response, StdError, StdResult};
use cw_storage_plus::Item;

/// Longest allowed lifetime of an ownership transfer proposal, in seconds.
const MAX_PROPOSAL_TTL: u64 = 1_209_600;

/// A pending two-step contract ownership transfer.
#[cw_serde]
pub struct OwnershipProposal {
    /// The proposed new owner
    pub owner: Addr,
    /// Expiry of the proposal as a block timestamp in seconds
    pub ttl: u64,
}

/// Starts an ownership transfer. Only the current owner may call this.
pub fn propose_new_owner(
    deps: DepsMut,
    info: MessageInfo,
    env: Env,
    new_owner: String,
    expires_in: u64,
    current_owner: Addr,
    store: Item<OwnershipProposal>,
) -> StdResult<Response> {
    if info.sender != current_owner {
        return Err(StdError::generic_err("Unauthorized"));
    }

    let new_owner = deps.api.addr_validate(&new_owner)?;
    if new_owner == current_owner {
        return Err(StdError::generic_err("New owner cannot be same"));
    }
    if expires_in > MAX_PROPOSAL_TTL {
        return Err(StdError::generic_err(format!(
            "Parameter expires_in cannot be higher than {MAX_PROPOSAL_TTL}"
        )));
    }

    store.save(
        deps.storage,
        &OwnershipProposal {
            owner: new_owner.clone(),
            ttl: env.block.time.seconds() + expires_in,
        },
    )?;

    Ok(Response::new().add_attributes(vec![
        attr("action", "propose_new_owner"),
        attr("new_owner", new_owner),
    ]))
}

/// Cancels a pending ownership transfer. Only the current owner may call
/// this.
pub fn drop_ownership_proposal(
    deps: DepsMut,
    info: MessageInfo,
    current_owner: Addr,
    store: Item<OwnershipProposal>,
) -> StdResult<Response> {
    if info.sender != current_owner {
        return Err(StdError::generic_err("Unauthorized"));
    }

    store.remove(deps.storage);

    Ok(Response::new().add_attributes(vec![attr("action", "drop_ownership_proposal")]))
}

/// Completes an ownership transfer. Only the proposed owner may call this;
/// `on_claimed` persists the new owner in the caller's config.
pub fn claim_ownership(
    deps: DepsMut,
    info: MessageInfo,
    env: Env,
    store: Item<OwnershipProposal>,
    on_claimed: fn(DepsMut, Addr) -> StdResult<()>,
) -> StdResult<Response> {
    let proposal = store
        .load(deps.storage)
        .map_err(|_| StdError::generic_err("Ownership proposal not found"))?;

    if info.sender != proposal.owner {
        return Err(StdError::generic_err("Unauthorized"));
    }
    if env.block.time.seconds() > proposal.ttl {
        return Err(StdError::generic_err("Ownership proposal expired"));
    }

    store.remove(deps.storage);
    on_claimed(deps, proposal.owner.clone())?;

    Ok(Response::new().add_attributes(vec![
        attr("action", "claim_ownership"),
        attr("new_owner", proposal.owner),
    ]))
}
