pub mod common;
pub mod dao;
pub mod escrow;
pub mod factory;
pub mod governance;
pub mod math;
pub mod oracle;
pub mod pool;
pub mod proposal;
pub mod spot;

use cosmwasm_std::Env;

/// Millisecond timestamp of the current block. All protocol timers are kept
/// in milliseconds of the host's monotonic block clock.
pub fn now_ms(env: &Env) -> u64 {
    env.block.time.nanos() / 1_000_000
}
