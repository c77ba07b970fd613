use cosmwasm_schema::cw_serde;
use cosmwasm_std::Uint128;

use crate::oracle::PcwOracle;
use crate::pool::{
    compute_swap, initial_shares, pool_price, PoolError, SwapDirection, SwapResult,
    MINIMUM_LIQUIDITY_AMOUNT,
};

/// One partition of the spot pool's liquidity. LP shares in a bucket claim a
/// proportional cut of that bucket's reserves only.
#[cw_serde]
#[derive(Default)]
pub struct Bucket {
    pub reserve_asset: Uint128,
    pub reserve_stable: Uint128,
    pub lp_shares: Uint128,
}

/// Reserves the quantum split moved out of each bucket and into the
/// conditional markets. Recombination restores the recovered spot coins to
/// the originating buckets pro rata to these amounts.
#[cw_serde]
#[derive(Default)]
pub struct SplitOut {
    pub live_asset: Uint128,
    pub live_stable: Uint128,
    pub transitioning_asset: Uint128,
    pub transitioning_stable: Uint128,
}

impl SplitOut {
    pub fn total_asset(&self) -> Uint128 {
        self.live_asset + self.transitioning_asset
    }

    pub fn total_stable(&self) -> Uint128 {
        self.live_stable + self.transitioning_stable
    }
}

/// A user's LP shares per bucket. The `transitioning_proposal` marker makes
/// the TRANSITIONING → WITHDRAW_ONLY flip lazy: positions are normalized on
/// access once the marking proposal's market has been finalized.
#[cw_serde]
#[derive(Default)]
pub struct LpPosition {
    pub live: Uint128,
    pub transitioning: Uint128,
    pub withdraw_only: Uint128,
    pub transitioning_proposal: Option<u64>,
}

impl LpPosition {
    pub fn total(&self) -> Uint128 {
        self.live + self.transitioning + self.withdraw_only
    }
}

/// The DAO's spot pool: a single constant-product market whose LP tokens and
/// reserves are partitioned into LIVE / TRANSITIONING / WITHDRAW_ONLY
/// buckets. At most one proposal may hold it at a time.
#[cw_serde]
pub struct SpotPool {
    pub live: Bucket,
    pub transitioning: Bucket,
    pub withdraw_only: Bucket,
    pub fee_bps: u16,
    pub fees_asset: Uint128,
    pub fees_stable: Uint128,
    pub active_proposal_id: Option<u64>,
    pub split_out: SplitOut,
    pub oracle: PcwOracle,
    pub version: u64,
}

impl SpotPool {
    pub fn new(fee_bps: u16, oracle: PcwOracle) -> Self {
        Self {
            live: Bucket::default(),
            transitioning: Bucket::default(),
            withdraw_only: Bucket::default(),
            fee_bps,
            fees_asset: Uint128::zero(),
            fees_stable: Uint128::zero(),
            active_proposal_id: None,
            split_out: SplitOut::default(),
            oracle,
            version: 0,
        }
    }

    pub fn total_asset(&self) -> Uint128 {
        self.live.reserve_asset + self.transitioning.reserve_asset + self.withdraw_only.reserve_asset
    }

    pub fn total_stable(&self) -> Uint128 {
        self.live.reserve_stable
            + self.transitioning.reserve_stable
            + self.withdraw_only.reserve_stable
    }

    pub fn total_lp_shares(&self) -> Uint128 {
        self.live.lp_shares + self.transitioning.lp_shares + self.withdraw_only.lp_shares
    }

    pub fn price(&self) -> Result<Uint128, PoolError> {
        pool_price(self.total_asset(), self.total_stable())
    }

    /// Re-partitions new pool totals across buckets, keeping each bucket's
    /// previous share. Rounding residue lands in LIVE.
    fn set_totals(&mut self, new_asset: Uint128, new_stable: Uint128) -> Result<(), PoolError> {
        let old_asset = self.total_asset();
        let old_stable = self.total_stable();
        if old_asset.is_zero() || old_stable.is_zero() {
            return Err(PoolError::InsufficientLiquidity {});
        }

        let trans_asset = new_asset.multiply_ratio(self.transitioning.reserve_asset, old_asset);
        let wo_asset = new_asset.multiply_ratio(self.withdraw_only.reserve_asset, old_asset);
        let trans_stable = new_stable.multiply_ratio(self.transitioning.reserve_stable, old_stable);
        let wo_stable = new_stable.multiply_ratio(self.withdraw_only.reserve_stable, old_stable);

        self.transitioning.reserve_asset = trans_asset;
        self.transitioning.reserve_stable = trans_stable;
        self.withdraw_only.reserve_asset = wo_asset;
        self.withdraw_only.reserve_stable = wo_stable;
        self.live.reserve_asset = new_asset - trans_asset - wo_asset;
        self.live.reserve_stable = new_stable - trans_stable - wo_stable;

        Ok(())
    }

    /// Swaps against the combined bucket reserves. The commission accrues to
    /// the offer-side fee bucket; bucket reserves keep their proportions.
    pub fn swap(
        &mut self,
        direction: SwapDirection,
        offer_amount: Uint128,
    ) -> Result<SwapResult, PoolError> {
        let total_asset = self.total_asset();
        let total_stable = self.total_stable();
        let (offer_reserve, ask_reserve) = match direction {
            SwapDirection::StableForAsset => (total_stable, total_asset),
            SwapDirection::AssetForStable => (total_asset, total_stable),
        };

        let result = compute_swap(offer_reserve, ask_reserve, offer_amount, self.fee_bps)?;
        let offer_eff = offer_amount - result.commission_amount;

        let (new_asset, new_stable) = match direction {
            SwapDirection::StableForAsset => (
                total_asset - result.return_amount,
                total_stable + offer_eff,
            ),
            SwapDirection::AssetForStable => (
                total_asset + offer_eff,
                total_stable - result.return_amount,
            ),
        };
        self.set_totals(new_asset, new_stable)?;

        match direction {
            SwapDirection::StableForAsset => self.fees_stable += result.commission_amount,
            SwapDirection::AssetForStable => self.fees_asset += result.commission_amount,
        }

        Ok(result)
    }

    /// Commission-free swap used by the protocol's own arbitrage legs.
    pub fn swap_feeless(
        &mut self,
        direction: SwapDirection,
        offer_amount: Uint128,
    ) -> Result<Uint128, PoolError> {
        let fee_bps = self.fee_bps;
        self.fee_bps = 0;
        let result = self.swap(direction, offer_amount);
        self.fee_bps = fee_bps;
        Ok(result?.return_amount)
    }

    /// Simulates a commission-free swap without touching state.
    pub fn simulate_feeless(
        &self,
        direction: SwapDirection,
        offer_amount: Uint128,
    ) -> Result<Uint128, PoolError> {
        let (offer_reserve, ask_reserve) = match direction {
            SwapDirection::StableForAsset => (self.total_stable(), self.total_asset()),
            SwapDirection::AssetForStable => (self.total_asset(), self.total_stable()),
        };
        Ok(compute_swap(offer_reserve, ask_reserve, offer_amount, 0)?.return_amount)
    }

    /// Adds liquidity to the LIVE bucket, minting LP shares. Imbalanced
    /// deposits are priced at the lower of the two sides.
    pub fn provide(&mut self, asset_in: Uint128, stable_in: Uint128) -> Result<Uint128, PoolError> {
        if asset_in.is_zero() || stable_in.is_zero() {
            return Err(PoolError::InsufficientLiquidity {});
        }

        let total_lp = self.total_lp_shares();
        let shares = if total_lp.is_zero() {
            let shares = initial_shares(asset_in, stable_in)?;
            // The dust lock stays in LIVE and is owned by nobody
            self.live.lp_shares = shares + MINIMUM_LIQUIDITY_AMOUNT;
            self.live.reserve_asset = asset_in;
            self.live.reserve_stable = stable_in;
            return Ok(shares);
        } else if self.live.lp_shares.is_zero() {
            // Re-seeding an emptied LIVE bucket: price against pool totals
            std::cmp::min(
                asset_in.multiply_ratio(total_lp, self.total_asset()),
                stable_in.multiply_ratio(total_lp, self.total_stable()),
            )
        } else {
            std::cmp::min(
                asset_in.multiply_ratio(self.live.lp_shares, self.live.reserve_asset),
                stable_in.multiply_ratio(self.live.lp_shares, self.live.reserve_stable),
            )
        };

        if shares.is_zero() {
            return Err(PoolError::InsufficientLiquidity {});
        }

        self.live.lp_shares += shares;
        self.live.reserve_asset += asset_in;
        self.live.reserve_stable += stable_in;

        Ok(shares)
    }

    /// Burns LP shares from the LIVE bucket for a proportional cut of its
    /// reserves. Only callable while no proposal holds the pool.
    pub fn withdraw(&mut self, lp_amount: Uint128) -> Result<(Uint128, Uint128), PoolError> {
        self.take_from_bucket_live(lp_amount)
    }

    fn take_from_bucket_live(
        &mut self,
        lp_amount: Uint128,
    ) -> Result<(Uint128, Uint128), PoolError> {
        if lp_amount.is_zero() || lp_amount > self.live.lp_shares {
            return Err(PoolError::InsufficientLiquidity {});
        }
        let asset_out = self
            .live
            .reserve_asset
            .multiply_ratio(lp_amount, self.live.lp_shares);
        let stable_out = self
            .live
            .reserve_stable
            .multiply_ratio(lp_amount, self.live.lp_shares);

        self.live.lp_shares -= lp_amount;
        self.live.reserve_asset -= asset_out;
        self.live.reserve_stable -= stable_out;

        Ok((asset_out, stable_out))
    }

    /// Moves LP shares (plus their proportional reserves and split-out
    /// attribution) out of LIVE. With an active proposal they queue in
    /// TRANSITIONING; otherwise they land in WITHDRAW_ONLY directly.
    pub fn mark_for_withdrawal(&mut self, lp_amount: Uint128) -> Result<(), PoolError> {
        if lp_amount.is_zero() || lp_amount > self.live.lp_shares {
            return Err(PoolError::InsufficientLiquidity {});
        }

        let live_lp_before = self.live.lp_shares;
        let moved_split_asset = self
            .split_out
            .live_asset
            .multiply_ratio(lp_amount, live_lp_before);
        let moved_split_stable = self
            .split_out
            .live_stable
            .multiply_ratio(lp_amount, live_lp_before);
        let (asset_out, stable_out) = self.take_from_bucket_live(lp_amount)?;

        let target = if self.active_proposal_id.is_some() {
            self.split_out.live_asset -= moved_split_asset;
            self.split_out.live_stable -= moved_split_stable;
            self.split_out.transitioning_asset += moved_split_asset;
            self.split_out.transitioning_stable += moved_split_stable;
            &mut self.transitioning
        } else {
            &mut self.withdraw_only
        };

        target.lp_shares += lp_amount;
        target.reserve_asset += asset_out;
        target.reserve_stable += stable_out;

        Ok(())
    }

    /// Burns LP shares from the WITHDRAW_ONLY bucket for spot coins.
    pub fn claim(&mut self, lp_amount: Uint128) -> Result<(Uint128, Uint128), PoolError> {
        if lp_amount.is_zero() || lp_amount > self.withdraw_only.lp_shares {
            return Err(PoolError::InsufficientLiquidity {});
        }
        let asset_out = self
            .withdraw_only
            .reserve_asset
            .multiply_ratio(lp_amount, self.withdraw_only.lp_shares);
        let stable_out = self
            .withdraw_only
            .reserve_stable
            .multiply_ratio(lp_amount, self.withdraw_only.lp_shares);

        self.withdraw_only.lp_shares -= lp_amount;
        self.withdraw_only.reserve_asset -= asset_out;
        self.withdraw_only.reserve_stable -= stable_out;

        Ok((asset_out, stable_out))
    }

    /// Carves the configured fraction out of the LIVE and TRANSITIONING
    /// buckets (independently) for conditional market funding. LP shares are
    /// untouched. Returns the total split amounts per side.
    pub fn quantum_split(&mut self, ratio_pct: u8) -> Result<(Uint128, Uint128), PoolError> {
        let live_asset = self.live.reserve_asset.multiply_ratio(ratio_pct, 100u32);
        let live_stable = self.live.reserve_stable.multiply_ratio(ratio_pct, 100u32);
        let trans_asset = self
            .transitioning
            .reserve_asset
            .multiply_ratio(ratio_pct, 100u32);
        let trans_stable = self
            .transitioning
            .reserve_stable
            .multiply_ratio(ratio_pct, 100u32);

        self.live.reserve_asset -= live_asset;
        self.live.reserve_stable -= live_stable;
        self.transitioning.reserve_asset -= trans_asset;
        self.transitioning.reserve_stable -= trans_stable;

        self.split_out = SplitOut {
            live_asset,
            live_stable,
            transitioning_asset: trans_asset,
            transitioning_stable: trans_stable,
        };

        Ok((live_asset + trans_asset, live_stable + trans_stable))
    }

    /// Returns recombined spot coins to the buckets they were split from,
    /// pro rata to the split-out attribution, then merges TRANSITIONING into
    /// WITHDRAW_ONLY and releases the pool.
    pub fn recombine(&mut self, recovered_asset: Uint128, recovered_stable: Uint128) {
        let split_asset = self.split_out.total_asset();
        let split_stable = self.split_out.total_stable();

        let trans_asset = if split_asset.is_zero() {
            Uint128::zero()
        } else {
            recovered_asset.multiply_ratio(self.split_out.transitioning_asset, split_asset)
        };
        let trans_stable = if split_stable.is_zero() {
            Uint128::zero()
        } else {
            recovered_stable.multiply_ratio(self.split_out.transitioning_stable, split_stable)
        };

        self.live.reserve_asset += recovered_asset - trans_asset;
        self.live.reserve_stable += recovered_stable - trans_stable;
        self.transitioning.reserve_asset += trans_asset;
        self.transitioning.reserve_stable += trans_stable;

        self.withdraw_only.lp_shares += self.transitioning.lp_shares;
        self.withdraw_only.reserve_asset += self.transitioning.reserve_asset;
        self.withdraw_only.reserve_stable += self.transitioning.reserve_stable;
        self.transitioning = Bucket::default();

        self.split_out = SplitOut::default();
        self.active_proposal_id = None;
    }

    /// Checks that bucket reserves sum up to the expected pool totals.
    pub fn assert_bucket_sum(
        &self,
        expected_asset: Uint128,
        expected_stable: Uint128,
    ) -> Result<(), PoolError> {
        if self.total_asset() != expected_asset || self.total_stable() != expected_stable {
            return Err(PoolError::BucketSumMismatch {});
        }
        Ok(())
    }
}
