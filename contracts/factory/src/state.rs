use cosmwasm_schema::cw_serde;
use cosmwasm_std::{StdResult, Storage};
use cw_storage_plus::{Item, Map};

use futarchy::common::OwnershipProposal;
use futarchy::factory::{Config, DaoRecord};

/// This is an intermediate structure for storing the DAO registration data
/// of an in-flight governance instantiation. It is consumed in the
/// submessage reply.
#[cw_serde]
pub struct TmpDaoInfo {
    pub dao_id: u64,
    pub name: String,
    pub asset_denom: String,
    pub stable_denom: String,
}

/// Saves factory settings
pub const CONFIG: Item<Config> = Item::new("config");

/// Saves the registration data of the DAO being instantiated
pub const TMP_DAO_INFO: Item<TmpDaoInfo> = Item::new("tmp_dao_info");

pub const DAO_SEQ: Item<u64> = Item::new("dao_seq");

/// Saves registered DAOs (from oldest to latest)
pub const DAOS: Map<u64, DaoRecord> = Map::new("daos");

/// Stores the latest contract ownership transfer proposal
pub const OWNERSHIP_PROPOSAL: Item<OwnershipProposal> = Item::new("ownership_proposal");

pub fn next_dao_id(storage: &mut dyn Storage) -> StdResult<u64> {
    let id = DAO_SEQ.may_load(storage)?.unwrap_or_default() + 1;
    DAO_SEQ.save(storage, &id)?;
    Ok(id)
}
