use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Uint128, Uint256};
use futarchy_checkpoint_buffer::Timestamped;

use crate::math::{saturating_into_u128, PPM};

/// Number of checkpoints the spot oracle lays down per averaging window.
pub const PCW_CHECKPOINT_FANOUT: u64 = 16;

/// Cumulative-price oracle attached to every conditional AMM.
///
/// A raw TWAP over prices could be pushed around with a few extremely large
/// outliers, so each observation may move from the previous one by at most
/// `step_max` price units. Observations made before `start_time_ms +
/// start_delay_ms` update the running observation but not the accumulator.
#[cw_serde]
pub struct TwapOracle {
    /// Price the oracle was seeded with when the market opened
    pub initial_price: Uint128,
    /// Running sum of `observation * elapsed_ms`
    pub cumulative_price: Uint256,
    /// The last (clamped) observation
    pub last_price: Uint128,
    pub last_timestamp_ms: u64,
    pub start_time_ms: u64,
    pub start_delay_ms: u64,
    /// The most an observation can move per update
    pub step_max: Uint128,
}

impl TwapOracle {
    pub fn new(initial_price: Uint128, now_ms: u64, start_delay_ms: u64, step_max: Uint128) -> Self {
        Self {
            initial_price,
            cumulative_price: Uint256::zero(),
            last_price: initial_price,
            last_timestamp_ms: now_ms,
            start_time_ms: now_ms,
            start_delay_ms,
            step_max,
        }
    }

    /// Timestamp at which the accumulator starts collecting.
    pub fn effective_start_ms(&self) -> u64 {
        self.start_time_ms.saturating_add(self.start_delay_ms)
    }

    fn clamp_step(&self, price: Uint128) -> Uint128 {
        if price > self.last_price {
            price.min(self.last_price.saturating_add(self.step_max))
        } else {
            price.max(self.last_price.saturating_sub(self.step_max))
        }
    }

    /// Records a price observation. Out-of-order timestamps are ignored so
    /// observations within one oracle stay strictly monotone.
    pub fn write_observation(&mut self, price: Uint128, now_ms: u64) {
        if now_ms < self.last_timestamp_ms {
            return;
        }

        let observed = self.clamp_step(price);
        let start = self.effective_start_ms();
        if now_ms > start {
            // The first post-warm-up observation must not be weighted with
            // the whole warm-up period.
            let since = self.last_timestamp_ms.max(start);
            let elapsed = u128::from(now_ms - since);
            self.cumulative_price = self
                .cumulative_price
                .saturating_add(observed.full_mul(elapsed));
        }

        self.last_price = observed;
        self.last_timestamp_ms = now_ms;
    }

    /// Time-weighted average price over `[effective_start, now_ms]`, with the
    /// running observation projected up to `now_ms`. `None` while the oracle
    /// is still warming up.
    pub fn twap(&self, now_ms: u64) -> Option<Uint128> {
        let start = self.effective_start_ms();
        if now_ms <= start {
            return None;
        }

        let since = self.last_timestamp_ms.max(start);
        let projected = self
            .cumulative_price
            .saturating_add(self.last_price.full_mul(u128::from(now_ms - since)));
        let elapsed = Uint256::from(u128::from(now_ms - start));

        Some(saturating_into_u128(projected / elapsed))
    }
}

/// A committed spot-oracle checkpoint. Kept in a ring so historical window
/// queries stay bounded.
#[cw_serde]
pub struct Checkpoint {
    pub timestamp_ms: u64,
    pub cumulative_price: Uint256,
    pub price: Uint128,
}

impl Timestamped for Checkpoint {
    fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }
}

/// Price-change-windowed oracle for the spot pool.
///
/// Observations are clamped to `max_movement_ppm` of the price at the last
/// committed checkpoint, and a new checkpoint is committed roughly every
/// `window_size_ms / PCW_CHECKPOINT_FANOUT`.
#[cw_serde]
pub struct PcwOracle {
    pub window_size_ms: u64,
    pub max_movement_ppm: u64,
    pub checkpoint_cadence_ms: u64,
    pub cumulative_price: Uint256,
    pub last_price: Uint128,
    pub last_timestamp_ms: u64,
    pub last_checkpoint_price: Uint128,
    pub last_checkpoint_ms: Option<u64>,
}

impl PcwOracle {
    pub fn new(window_size_ms: u64, max_movement_ppm: u64, now_ms: u64) -> Self {
        Self {
            window_size_ms,
            max_movement_ppm,
            checkpoint_cadence_ms: (window_size_ms / PCW_CHECKPOINT_FANOUT).max(1),
            cumulative_price: Uint256::zero(),
            last_price: Uint128::zero(),
            last_timestamp_ms: now_ms,
            last_checkpoint_price: Uint128::zero(),
            last_checkpoint_ms: None,
        }
    }

    fn clamp_movement(&self, price: Uint128) -> Uint128 {
        if self.last_checkpoint_price.is_zero() {
            return price;
        }
        let bound = self
            .last_checkpoint_price
            .multiply_ratio(self.max_movement_ppm, PPM);
        if price > self.last_checkpoint_price {
            price.min(self.last_checkpoint_price.saturating_add(bound))
        } else {
            price.max(self.last_checkpoint_price.saturating_sub(bound))
        }
    }

    /// Records a spot price observation. Returns a checkpoint when one is due
    /// for committing to the ring.
    pub fn observe(&mut self, price: Uint128, now_ms: u64) -> Option<Checkpoint> {
        if now_ms < self.last_timestamp_ms {
            return None;
        }

        let observed = self.clamp_movement(price);
        let elapsed = u128::from(now_ms - self.last_timestamp_ms);
        if !self.last_price.is_zero() {
            self.cumulative_price = self
                .cumulative_price
                .saturating_add(self.last_price.full_mul(elapsed));
        }
        self.last_price = observed;
        self.last_timestamp_ms = now_ms;

        let checkpoint_due = match self.last_checkpoint_ms {
            None => true,
            Some(committed) => now_ms.saturating_sub(committed) >= self.checkpoint_cadence_ms,
        };
        if checkpoint_due {
            self.last_checkpoint_ms = Some(now_ms);
            self.last_checkpoint_price = observed;
            Some(Checkpoint {
                timestamp_ms: now_ms,
                cumulative_price: self.cumulative_price,
                price: observed,
            })
        } else {
            None
        }
    }

    /// The accumulator projected to `now_ms` using the running observation.
    pub fn projected_cumulative(&self, now_ms: u64) -> Uint256 {
        let elapsed = u128::from(now_ms.saturating_sub(self.last_timestamp_ms));
        self.cumulative_price
            .saturating_add(self.last_price.full_mul(elapsed))
    }

    /// Average price between `checkpoint` and `now_ms`.
    pub fn twap_since(&self, checkpoint: &Checkpoint, now_ms: u64) -> Option<Uint128> {
        let elapsed = now_ms.checked_sub(checkpoint.timestamp_ms)?;
        if elapsed == 0 {
            return None;
        }
        let accumulated = self
            .projected_cumulative(now_ms)
            .saturating_sub(checkpoint.cumulative_price);

        Some(saturating_into_u128(
            accumulated / Uint256::from(u128::from(elapsed)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::math::PRICE_SCALE;

    use super::*;

    const P: u128 = PRICE_SCALE;

    #[test]
    fn twap_is_initial_price_without_observations() {
        let oracle = TwapOracle::new(Uint128::new(P), 1_000, 0, Uint128::new(P));
        assert_eq!(oracle.twap(61_000), Some(Uint128::new(P)));
    }

    #[test]
    fn twap_reflects_projected_observation() {
        let mut oracle = TwapOracle::new(Uint128::new(P), 0, 0, Uint128::MAX);
        oracle.write_observation(Uint128::new(3 * P), 10_000);
        // 3P attributed over [0, 10s], then projected over [10s, 20s]
        assert_eq!(oracle.twap(20_000), Some(Uint128::new(3 * P)));
    }

    #[test]
    fn step_clamp_limits_single_observation() {
        let step = Uint128::new(P / 100);
        let mut oracle = TwapOracle::new(Uint128::new(P), 0, 0, step);
        oracle.write_observation(Uint128::new(50 * P), 1_000);
        assert_eq!(oracle.last_price, Uint128::new(P) + step);

        oracle.write_observation(Uint128::zero(), 2_000);
        assert_eq!(oracle.last_price, Uint128::new(P));
    }

    #[test]
    fn warm_up_skips_accumulator() {
        let mut oracle = TwapOracle::new(Uint128::new(P), 0, 30_000, Uint128::MAX);
        oracle.write_observation(Uint128::new(5 * P), 10_000);
        assert_eq!(oracle.cumulative_price, Uint256::zero());
        assert_eq!(oracle.last_price, Uint128::new(5 * P));
        assert_eq!(oracle.twap(20_000), None);

        // First accumulated interval starts at the effective start, not at
        // the last warm-up observation.
        oracle.write_observation(Uint128::new(5 * P), 40_000);
        assert_eq!(
            oracle.cumulative_price,
            Uint128::new(5 * P).full_mul(10_000u128)
        );
        assert_eq!(oracle.twap(40_000), Some(Uint128::new(5 * P)));
    }

    #[test]
    fn out_of_order_observations_are_ignored() {
        let mut oracle = TwapOracle::new(Uint128::new(P), 10_000, 0, Uint128::MAX);
        oracle.write_observation(Uint128::new(2 * P), 20_000);
        let snapshot = oracle.clone();
        oracle.write_observation(Uint128::new(9 * P), 15_000);
        assert_eq!(oracle, snapshot);
    }

    #[test]
    fn observation_saturates_instead_of_wrapping() {
        let mut oracle = TwapOracle::new(Uint128::MAX, 0, 0, Uint128::MAX);
        oracle.write_observation(Uint128::MAX, u64::MAX);
        assert_eq!(oracle.twap(u64::MAX), Some(Uint128::MAX));
    }

    proptest! {
        /// Consecutive observation contributions never differ by more than
        /// the configured step.
        #[test]
        fn step_clamp_bound_holds(
            prices in prop::collection::vec(0u128..u128::MAX / 1_000_000, 1..40),
            step in 1u128..P,
        ) {
            let mut oracle = TwapOracle::new(Uint128::new(P), 0, 0, Uint128::new(step));
            let mut prev = oracle.last_price;
            for (i, price) in prices.into_iter().enumerate() {
                oracle.write_observation(Uint128::new(price), (i as u64 + 1) * 500);
                let diff = prev.abs_diff(oracle.last_price);
                prop_assert!(diff <= Uint128::new(step));
                prev = oracle.last_price;
            }
        }
    }

    #[test]
    fn pcw_clamps_against_last_checkpoint() {
        let mut oracle = PcwOracle::new(60_000, 50_000, 0); // 5% per checkpoint
        // First observation commits the first checkpoint unclamped.
        let cp = oracle.observe(Uint128::new(P), 0);
        assert!(cp.is_some());

        // Within the cadence no checkpoint is produced and movement is
        // clamped to 5% of the checkpoint price.
        assert_eq!(oracle.observe(Uint128::new(2 * P), 1_000), None);
        assert_eq!(oracle.last_price, Uint128::new(P + P / 20));
    }

    #[test]
    fn pcw_checkpoint_cadence() {
        let mut oracle = PcwOracle::new(160_000, 1_000_000, 0);
        assert_eq!(oracle.checkpoint_cadence_ms, 10_000);

        assert!(oracle.observe(Uint128::new(P), 0).is_some());
        assert!(oracle.observe(Uint128::new(P), 4_000).is_none());
        assert!(oracle.observe(Uint128::new(P), 10_000).is_some());
    }

    #[test]
    fn pcw_twap_since_checkpoint() {
        let mut oracle = PcwOracle::new(100_000, 1_000_000, 0);
        let cp = oracle.observe(Uint128::new(P), 0).unwrap();
        oracle.observe(Uint128::new(3 * P), 50_000);
        // P held for 50s, then 3P held for 50s
        assert_eq!(
            oracle.twap_since(&cp, 100_000),
            Some(Uint128::new(2 * P))
        );
    }
}
