use cosmwasm_std::{attr, coins, BankMsg, DepsMut, Env, MessageInfo, Response, StdError};

use futarchy::math::SignedU128;
use futarchy::now_ms;

use crate::error::ContractError;
use crate::spot_pool::current_spot_twap;
use crate::state::{GRANTS, SPOT_POOL, STREAMS};

/// Pays out one grant tier once the spot TWAP has moved past its threshold
/// relative to the grant baseline. Permissionless; coins go to the tier
/// recipient.
pub fn execute_claim_grant(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    grant_id: u64,
    tier_index: u32,
) -> Result<Response, ContractError> {
    let pool = SPOT_POOL.load(deps.storage)?;
    let mut grant = GRANTS.load(deps.storage, grant_id)?;

    let now = now_ms(&env);
    let twap = current_spot_twap(deps.storage, &pool, now)?
        .ok_or(ContractError::SpotOracleNotReady {})?;
    let movement = SignedU128::from_diff(twap, grant.baseline_twap);

    let tier = grant
        .tiers
        .get_mut(tier_index as usize)
        .ok_or_else(|| StdError::generic_err(format!("unknown grant tier {tier_index}")))?;
    if tier.claimed {
        return Err(ContractError::GrantAlreadyClaimed {});
    }
    if movement < tier.threshold {
        return Err(ContractError::GrantLocked {});
    }
    tier.claimed = true;
    let recipient = tier.recipient.clone();
    let amount = tier.amount;

    grant.version += 1;
    GRANTS.save(deps.storage, grant_id, &grant)?;

    Ok(Response::new()
        .add_message(BankMsg::Send {
            to_address: recipient.to_string(),
            amount: coins(amount.u128(), &grant.denom),
        })
        .add_attributes(vec![
            attr("action", "claim_grant"),
            attr("sender", info.sender),
            attr("grant_id", grant_id.to_string()),
            attr("tier", tier_index.to_string()),
            attr("recipient", recipient),
            attr("amount", amount),
        ]))
}

/// Pays out the vested, unclaimed part of a stream to its recipient.
pub fn execute_claim_stream(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    stream_id: u64,
) -> Result<Response, ContractError> {
    let mut stream = STREAMS.load(deps.storage, stream_id)?;

    let now = now_ms(&env);
    let payout = stream.vested(now).saturating_sub(stream.claimed);
    if payout.is_zero() {
        return Err(ContractError::NothingToClaim {});
    }

    stream.claimed += payout;
    stream.version += 1;
    STREAMS.save(deps.storage, stream_id, &stream)?;

    Ok(Response::new()
        .add_message(BankMsg::Send {
            to_address: stream.recipient.to_string(),
            amount: coins(payout.u128(), &stream.denom),
        })
        .add_attributes(vec![
            attr("action", "claim_stream"),
            attr("sender", info.sender),
            attr("stream_id", stream_id.to_string()),
            attr("recipient", stream.recipient),
            attr("amount", payout),
        ]))
}
