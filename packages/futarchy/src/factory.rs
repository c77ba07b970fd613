use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::Addr;

use crate::dao::DaoParams;

/// This structure holds the main factory parameters.
#[cw_serde]
pub struct Config {
    /// Address allowed to change factory settings
    pub owner: Addr,
    /// Code identifier of the governance contract instantiated per DAO
    pub governance_code_id: u64,
}

/// This structure stores the basic settings for creating a new factory
/// contract.
#[cw_serde]
pub struct InstantiateMsg {
    pub owner: String,
    pub governance_code_id: u64,
}

/// This structure describes the execute messages of the factory.
#[cw_serde]
pub enum ExecuteMsg {
    /// Instantiates a governance contract for a new DAO and registers it.
    CreateDao {
        dao_name: String,
        asset_denom: String,
        stable_denom: String,
        params: DaoParams,
        /// DAO admin; defaults to the caller
        dao_owner: Option<String>,
        /// Contract receiving unknown staged actions at execution time
        action_dispatcher: Option<String>,
    },
    /// Updates the governance code id used for new DAOs.
    UpdateConfig { governance_code_id: Option<u64> },
    /// Starts a two-step ownership transfer.
    ProposeNewOwner { owner: String, expires_in: u64 },
    /// Cancels a pending ownership transfer.
    DropOwnershipProposal {},
    /// Completes the transfer; callable by the proposed owner only.
    ClaimOwnership {},
}

/// This structure describes the query messages of the factory.
#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    #[returns(Config)]
    Config {},
    #[returns(DaoRecord)]
    Dao { dao_id: u64 },
    #[returns(Vec<DaoRecord>)]
    Daos {
        start_after: Option<u64>,
        limit: Option<u32>,
    },
}

#[cw_serde]
pub struct MigrateMsg {}

/// A registered DAO.
#[cw_serde]
pub struct DaoRecord {
    pub dao_id: u64,
    pub name: String,
    pub governance_addr: Addr,
    pub asset_denom: String,
    pub stable_denom: String,
}
