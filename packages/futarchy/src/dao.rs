use cosmwasm_schema::cw_serde;
use cosmwasm_std::{StdError, StdResult, Uint128};

use crate::math::{SignedU128, PPM};
use crate::proposal::MIN_OUTCOMES;

/// Upper bound for swap fees, 10%.
pub const MAX_FEE_BPS: u16 = 1_000;

/// Per-DAO protocol parameters. Everything a proposal's lifecycle consults
/// lives here; updates apply to proposals created afterwards.
#[cw_serde]
pub struct DaoParams {
    /// Minimum time a proposal spends in REVIEW
    pub review_period_ms: u64,
    /// Length of the TRADING phase
    pub trading_period_ms: u64,
    /// Time allowed for executing the winning outcome after trading ends
    pub execution_window_ms: u64,
    /// Swap fee of each conditional market, in bps
    pub amm_fee_bps: u16,
    /// Swap fee of the spot pool, in bps
    pub spot_fee_bps: u16,
    pub max_outcomes: u8,
    pub max_actions_per_outcome: u32,
    /// Proposal fee in stable coins, charged per outcome
    pub proposal_fee_per_outcome: Uint128,
    /// Warm-up before conditional TWAP oracles start accumulating
    pub twap_start_delay_ms: u64,
    /// Max movement of a conditional TWAP observation per update
    pub twap_step_max: Uint128,
    /// Signed margin by which an outcome's TWAP must beat REJECT's to win.
    /// A sponsored outcome's bias is added to its TWAP delta before this
    /// comparison.
    pub twap_win_threshold: SignedU128,
    /// Fraction of spot liquidity split into conditional markets, 1-99
    pub conditional_liquidity_ratio_pct: u8,
    /// Floor for each conditional market's initial reserves per side
    pub min_conditional_liquidity: Uint128,
    /// Averaging window of the spot (PCW) oracle
    pub pcw_window_ms: u64,
    /// Max movement between spot oracle checkpoints, in ppm
    pub pcw_max_movement_ppm: u64,
}

impl DaoParams {
    pub fn validate(&self) -> StdResult<()> {
        if self.review_period_ms == 0
            || self.trading_period_ms == 0
            || self.execution_window_ms == 0
        {
            return Err(StdError::generic_err(
                "review, trading and execution periods must be positive",
            ));
        }
        if self.amm_fee_bps > MAX_FEE_BPS || self.spot_fee_bps > MAX_FEE_BPS {
            return Err(StdError::generic_err(format!(
                "swap fees must not exceed {MAX_FEE_BPS} bps"
            )));
        }
        if self.max_outcomes < MIN_OUTCOMES {
            return Err(StdError::generic_err(format!(
                "max_outcomes must be at least {MIN_OUTCOMES}"
            )));
        }
        if self.max_actions_per_outcome == 0 {
            return Err(StdError::generic_err(
                "max_actions_per_outcome must be positive",
            ));
        }
        if !(1..=99).contains(&self.conditional_liquidity_ratio_pct) {
            return Err(StdError::generic_err(
                "conditional_liquidity_ratio_pct must be between 1 and 99",
            ));
        }
        if self.twap_step_max.is_zero() {
            return Err(StdError::generic_err("twap_step_max must be positive"));
        }
        if self.twap_win_threshold.negative && self.twap_win_threshold.magnitude.is_zero() {
            return Err(StdError::generic_err(
                "twap_win_threshold must not be negative zero",
            ));
        }
        if self.pcw_window_ms == 0 {
            return Err(StdError::generic_err("pcw_window_ms must be positive"));
        }
        if self.pcw_max_movement_ppm == 0 || self.pcw_max_movement_ppm > PPM {
            return Err(StdError::generic_err(format!(
                "pcw_max_movement_ppm must be within (0, {PPM}]"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn valid_params() -> DaoParams {
        DaoParams {
            review_period_ms: 30_000,
            trading_period_ms: 60_000,
            execution_window_ms: 120_000,
            amm_fee_bps: 30,
            spot_fee_bps: 30,
            max_outcomes: 8,
            max_actions_per_outcome: 16,
            proposal_fee_per_outcome: Uint128::new(1_000_000),
            twap_start_delay_ms: 0,
            twap_step_max: Uint128::new(crate::math::PRICE_SCALE),
            twap_win_threshold: SignedU128::ZERO,
            conditional_liquidity_ratio_pct: 50,
            min_conditional_liquidity: Uint128::new(1_000),
            pcw_window_ms: 60_000,
            pcw_max_movement_ppm: 100_000,
        }
    }

    #[test]
    fn valid_params_pass() {
        valid_params().validate().unwrap();
    }

    #[test]
    fn ratio_bounds_enforced() {
        for pct in [0u8, 100] {
            let mut params = valid_params();
            params.conditional_liquidity_ratio_pct = pct;
            assert!(params.validate().is_err());
        }
    }

    #[test]
    fn fee_bounds_enforced() {
        let mut params = valid_params();
        params.amm_fee_bps = MAX_FEE_BPS + 1;
        assert!(params.validate().is_err());
    }
}
