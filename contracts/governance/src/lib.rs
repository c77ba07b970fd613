pub mod actions;
pub mod amm;
pub mod arbitrage;
pub mod contract;
pub mod error;
pub mod escrow;
pub mod grants;
pub mod proposal;
pub mod quantum;
pub mod queries;
pub mod spot_pool;
pub mod state;
