use cosmwasm_std::StdError;
use cw_utils::ParseReplyError;
use thiserror::Error;

/// This enum describes factory contract errors
#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    ParseReply(#[from] ParseReplyError),

    #[error("Unauthorized")]
    Unauthorized {},

    #[error("Asset and stable denoms must differ")]
    DoublingDenoms {},

    #[error("Failed to migrate the contract")]
    MigrationError {},
}
