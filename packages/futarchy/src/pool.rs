use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Isqrt, Uint128, Uint256};
use thiserror::Error;

use crate::math::{saturating_into_u128, MAX_BPS, PRICE_SCALE};
use crate::oracle::TwapOracle;

/// LP shares locked forever on the first liquidity provision.
pub const MINIMUM_LIQUIDITY_AMOUNT: Uint128 = Uint128::new(1_000);

/// This enum describes constant-product pool errors
#[derive(Error, Debug, PartialEq)]
pub enum PoolError {
    #[error("Insufficient liquidity to perform the operation")]
    InsufficientLiquidity {},

    #[error("Constant product invariant violated")]
    ProductInvariantViolated {},

    #[error("Initial liquidity must be more than {}", MINIMUM_LIQUIDITY_AMOUNT)]
    MinimumLiquidityAmount {},

    #[error("Bucket reserves do not sum up to pool reserves")]
    BucketSumMismatch {},
}

/// Swap direction in an asset/stable pair.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum SwapDirection {
    /// Offer stable coins, receive asset coins
    StableForAsset,
    /// Offer asset coins, receive stable coins
    AssetForStable,
}

impl SwapDirection {
    pub fn invert(&self) -> Self {
        match self {
            SwapDirection::StableForAsset => SwapDirection::AssetForStable,
            SwapDirection::AssetForStable => SwapDirection::StableForAsset,
        }
    }
}

/// Outcome of a swap computation. The commission is denominated in the
/// offered coin and accrues to a protocol fee bucket, never to reserves.
#[cw_serde]
pub struct SwapResult {
    pub return_amount: Uint128,
    pub commission_amount: Uint128,
}

/// Constant-product swap with the fee deducted from the input:
/// `x_eff = x * (10_000 - fee_bps) / 10_000`,
/// `out = ask * x_eff / (offer + x_eff)`.
pub fn compute_swap(
    offer_reserve: Uint128,
    ask_reserve: Uint128,
    offer_amount: Uint128,
    fee_bps: u16,
) -> Result<SwapResult, PoolError> {
    if offer_reserve.is_zero() || ask_reserve.is_zero() || offer_amount.is_zero() {
        return Err(PoolError::InsufficientLiquidity {});
    }

    let offer_eff = offer_amount.multiply_ratio((MAX_BPS - fee_bps) as u128, MAX_BPS as u128);
    let commission_amount = offer_amount - offer_eff;

    let numerator = ask_reserve.full_mul(offer_eff);
    let denominator = Uint256::from(offer_reserve) + Uint256::from(offer_eff);
    let return_amount = saturating_into_u128(numerator / denominator);

    // Reserves must stay strictly positive
    if return_amount >= ask_reserve {
        return Err(PoolError::InsufficientLiquidity {});
    }

    Ok(SwapResult {
        return_amount,
        commission_amount,
    })
}

/// Pool price scaled by [`PRICE_SCALE`]: stable units per asset unit.
pub fn pool_price(reserve_asset: Uint128, reserve_stable: Uint128) -> Result<Uint128, PoolError> {
    if reserve_asset.is_zero() {
        return Err(PoolError::InsufficientLiquidity {});
    }
    Ok(saturating_into_u128(
        reserve_stable.full_mul(PRICE_SCALE) / Uint256::from(reserve_asset),
    ))
}

/// LP shares for the first liquidity provision: `sqrt(a * s)` minus the
/// permanently locked dust.
pub fn initial_shares(asset_in: Uint128, stable_in: Uint128) -> Result<Uint128, PoolError> {
    let shares = saturating_into_u128(asset_in.full_mul(stable_in).isqrt());
    let shares = shares
        .checked_sub(MINIMUM_LIQUIDITY_AMOUNT)
        .map_err(|_| PoolError::MinimumLiquidityAmount {})?;
    if shares.is_zero() {
        return Err(PoolError::MinimumLiquidityAmount {});
    }
    Ok(shares)
}

/// One conditional market: a constant-product pool over an outcome's
/// conditional asset and conditional stable, with its own oracle and
/// per-side protocol fee buckets.
#[cw_serde]
pub struct Amm {
    pub reserve_asset: Uint128,
    pub reserve_stable: Uint128,
    pub fee_bps: u16,
    pub fees_asset: Uint128,
    pub fees_stable: Uint128,
    pub oracle: TwapOracle,
    pub version: u64,
}

impl Amm {
    pub fn new(
        reserve_asset: Uint128,
        reserve_stable: Uint128,
        fee_bps: u16,
        oracle: TwapOracle,
    ) -> Self {
        Self {
            reserve_asset,
            reserve_stable,
            fee_bps,
            fees_asset: Uint128::zero(),
            fees_stable: Uint128::zero(),
            oracle,
            version: 0,
        }
    }

    pub fn k(&self) -> Uint256 {
        self.reserve_asset.full_mul(self.reserve_stable)
    }

    pub fn price(&self) -> Result<Uint128, PoolError> {
        pool_price(self.reserve_asset, self.reserve_stable)
    }

    fn reserves(&self, direction: SwapDirection) -> (Uint128, Uint128) {
        match direction {
            SwapDirection::StableForAsset => (self.reserve_stable, self.reserve_asset),
            SwapDirection::AssetForStable => (self.reserve_asset, self.reserve_stable),
        }
    }

    fn apply(
        &mut self,
        direction: SwapDirection,
        offer_eff: Uint128,
        return_amount: Uint128,
    ) -> Result<(), PoolError> {
        let k_before = self.k();
        match direction {
            SwapDirection::StableForAsset => {
                self.reserve_stable += offer_eff;
                self.reserve_asset -= return_amount;
            }
            SwapDirection::AssetForStable => {
                self.reserve_asset += offer_eff;
                self.reserve_stable -= return_amount;
            }
        }
        if self.k() < k_before {
            return Err(PoolError::ProductInvariantViolated {});
        }
        Ok(())
    }

    /// Swaps against the market, accruing the commission to the offer-side
    /// fee bucket and recording a post-swap oracle observation.
    pub fn swap(
        &mut self,
        direction: SwapDirection,
        offer_amount: Uint128,
        now_ms: u64,
    ) -> Result<SwapResult, PoolError> {
        let (offer_reserve, ask_reserve) = self.reserves(direction);
        let result = compute_swap(offer_reserve, ask_reserve, offer_amount, self.fee_bps)?;

        self.apply(
            direction,
            offer_amount - result.commission_amount,
            result.return_amount,
        )?;
        match direction {
            SwapDirection::StableForAsset => self.fees_stable += result.commission_amount,
            SwapDirection::AssetForStable => self.fees_asset += result.commission_amount,
        }

        let price = self.price()?;
        self.oracle.write_observation(price, now_ms);

        Ok(result)
    }

    /// Commission-free swap used by the protocol's own arbitrage legs.
    pub fn swap_feeless(
        &mut self,
        direction: SwapDirection,
        offer_amount: Uint128,
        now_ms: u64,
    ) -> Result<Uint128, PoolError> {
        let (offer_reserve, ask_reserve) = self.reserves(direction);
        let result = compute_swap(offer_reserve, ask_reserve, offer_amount, 0)?;

        self.apply(direction, offer_amount, result.return_amount)?;
        let price = self.price()?;
        self.oracle.write_observation(price, now_ms);

        Ok(result.return_amount)
    }

    /// Simulates a commission-free swap without touching state.
    pub fn simulate_feeless(
        &self,
        direction: SwapDirection,
        offer_amount: Uint128,
    ) -> Result<Uint128, PoolError> {
        let (offer_reserve, ask_reserve) = self.reserves(direction);
        Ok(compute_swap(offer_reserve, ask_reserve, offer_amount, 0)?.return_amount)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn amm(asset: u128, stable: u128, fee_bps: u16) -> Amm {
        let oracle = TwapOracle::new(
            pool_price(asset.into(), stable.into()).unwrap(),
            0,
            0,
            Uint128::MAX,
        );
        Amm::new(asset.into(), stable.into(), fee_bps, oracle)
    }

    #[test]
    fn swap_output_matches_xyk_formula() {
        // 1% fee: x_eff = 9_900, out = 1_000_000 * 9_900 / 1_009_900
        let result = compute_swap(
            Uint128::new(1_000_000),
            Uint128::new(1_000_000),
            Uint128::new(10_000),
            100,
        )
        .unwrap();
        assert_eq!(result.return_amount, Uint128::new(9_802));
        assert_eq!(result.commission_amount, Uint128::new(100));
    }

    #[test]
    fn swap_rejects_empty_pool() {
        assert_eq!(
            compute_swap(Uint128::zero(), Uint128::new(5), Uint128::new(1), 0),
            Err(PoolError::InsufficientLiquidity {})
        );
    }

    #[test]
    fn swap_does_not_panic_on_extreme_reserves() {
        let result = compute_swap(
            Uint128::new(u128::MAX / 2),
            Uint128::new(u128::MAX / 1_000_000_000),
            Uint128::new(1_000_000_000),
            30,
        )
        .unwrap();
        // fee shaved the effective input below two ask units
        assert_eq!(result.return_amount, Uint128::new(1));
    }

    #[test]
    fn price_is_scaled_ratio() {
        assert_eq!(
            pool_price(Uint128::new(2_000), Uint128::new(1_000)).unwrap(),
            Uint128::new(PRICE_SCALE / 2)
        );
        assert_eq!(
            pool_price(Uint128::zero(), Uint128::new(1)),
            Err(PoolError::InsufficientLiquidity {})
        );
    }

    #[test]
    fn initial_shares_locks_dust() {
        assert_eq!(
            initial_shares(Uint128::new(1_000_000), Uint128::new(1_000_000)).unwrap(),
            Uint128::new(999_000)
        );
        assert_eq!(
            initial_shares(Uint128::new(100), Uint128::new(100)),
            Err(PoolError::MinimumLiquidityAmount {})
        );
    }

    #[test]
    fn fees_accrue_to_buckets_not_reserves() {
        let mut pool = amm(1_000_000, 1_000_000, 100);
        let result = pool
            .swap(SwapDirection::StableForAsset, Uint128::new(10_000), 1_000)
            .unwrap();
        assert_eq!(pool.fees_stable, result.commission_amount);
        assert_eq!(pool.reserve_stable, Uint128::new(1_009_900));
    }

    proptest! {
        /// The product invariant never decreases across swaps.
        #[test]
        fn k_never_decreases(
            asset in 1_000u128..u128::MAX / 1_000_000_000,
            stable in 1_000u128..u128::MAX / 1_000_000_000,
            offer in 1u128..1_000_000_000,
            fee in 0u16..1_000,
            dir in prop::bool::ANY,
        ) {
            let mut pool = amm(asset, stable, fee);
            let direction = if dir {
                SwapDirection::StableForAsset
            } else {
                SwapDirection::AssetForStable
            };
            let k_before = pool.k();
            if pool.swap(direction, Uint128::new(offer), 1_000).is_ok() {
                prop_assert!(pool.k() >= k_before);
            }
        }
    }
}
