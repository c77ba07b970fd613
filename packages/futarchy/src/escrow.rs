use cosmwasm_schema::cw_serde;
use cosmwasm_std::{OverflowError, Uint128};
use thiserror::Error;

/// This enum describes escrow accounting errors
#[derive(Error, Debug, PartialEq)]
pub enum EscrowError {
    #[error("{0}")]
    Overflow(#[from] OverflowError),

    #[error("Unknown outcome index {outcome}")]
    UnknownOutcome { outcome: u8 },

    #[error("Conditional supply is insufficient for the requested burn")]
    InsufficientSupply {},

    #[error("Only winning outcome tokens can be redeemed")]
    NotAWinner {},

    #[error("Conditional supply exceeds spot backing")]
    SupplyExceedsBacking {},
}

/// The two coin sides every outcome market trades.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum Side {
    Asset,
    Stable,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Asset => "asset",
            Side::Stable => "stable",
        }
    }
}

/// Owns the spot collateral backing all conditional coins of one proposal.
///
/// Supplies are tracked per outcome and per side; the spot balances back
/// every outcome simultaneously via the complete-set identity: withdrawing
/// spot requires burning the same amount from every outcome's supply.
#[cw_serde]
pub struct TokenEscrow {
    pub proposal_id: u64,
    pub outcome_count: u8,
    /// Conditional asset supply per outcome
    pub supply_asset: Vec<Uint128>,
    /// Conditional stable supply per outcome
    pub supply_stable: Vec<Uint128>,
    /// Spot asset backing held by the escrow
    pub spot_asset: Uint128,
    /// Spot stable backing held by the escrow
    pub spot_stable: Uint128,
    pub version: u64,
}

impl TokenEscrow {
    pub fn new(proposal_id: u64, outcome_count: u8) -> Self {
        Self {
            proposal_id,
            outcome_count,
            supply_asset: vec![Uint128::zero(); outcome_count as usize],
            supply_stable: vec![Uint128::zero(); outcome_count as usize],
            spot_asset: Uint128::zero(),
            spot_stable: Uint128::zero(),
            version: 0,
        }
    }

    fn check_outcome(&self, outcome: u8) -> Result<usize, EscrowError> {
        if outcome >= self.outcome_count {
            return Err(EscrowError::UnknownOutcome { outcome });
        }
        Ok(outcome as usize)
    }

    pub fn supplies(&self, side: Side) -> &[Uint128] {
        match side {
            Side::Asset => &self.supply_asset,
            Side::Stable => &self.supply_stable,
        }
    }

    fn supplies_mut(&mut self, side: Side) -> &mut Vec<Uint128> {
        match side {
            Side::Asset => &mut self.supply_asset,
            Side::Stable => &mut self.supply_stable,
        }
    }

    pub fn backing(&self, side: Side) -> Uint128 {
        match side {
            Side::Asset => self.spot_asset,
            Side::Stable => self.spot_stable,
        }
    }

    fn backing_mut(&mut self, side: Side) -> &mut Uint128 {
        match side {
            Side::Asset => &mut self.spot_asset,
            Side::Stable => &mut self.spot_stable,
        }
    }

    pub fn supply(&self, outcome: u8, side: Side) -> Result<Uint128, EscrowError> {
        let i = self.check_outcome(outcome)?;
        Ok(self.supplies(side)[i])
    }

    fn max_supply(&self, side: Side) -> Uint128 {
        self.supplies(side).iter().copied().max().unwrap_or_default()
    }

    /// The largest amount for which a complete-set burn can still succeed.
    pub fn max_complete_burnable(&self, side: Side) -> Uint128 {
        self.supplies(side).iter().copied().min().unwrap_or_default()
    }

    /// Deposits `amount` spot coins and mints the same amount of conditional
    /// coins for `outcome` only. The deposit keeps backing every other
    /// outcome as well, so a later spot withdrawal must burn from all of
    /// them simultaneously.
    pub fn deposit_and_mint(
        &mut self,
        outcome: u8,
        side: Side,
        amount: Uint128,
    ) -> Result<(), EscrowError> {
        let i = self.check_outcome(outcome)?;
        *self.backing_mut(side) = self.backing(side).checked_add(amount)?;
        let supplies = self.supplies_mut(side);
        supplies[i] = supplies[i].checked_add(amount)?;
        Ok(())
    }

    /// Burns `amount` conditional coins of `outcome` and withdraws the same
    /// amount of spot coins. Only allowed while the remaining backing still
    /// covers every outcome's supply, which confines single-sided withdrawal
    /// to previously single-sided-minted surplus.
    pub fn burn_and_withdraw(
        &mut self,
        outcome: u8,
        side: Side,
        amount: Uint128,
    ) -> Result<(), EscrowError> {
        let i = self.check_outcome(outcome)?;
        let supply = self.supplies(side)[i]
            .checked_sub(amount)
            .map_err(|_| EscrowError::InsufficientSupply {})?;
        let backing = self
            .backing(side)
            .checked_sub(amount)
            .map_err(|_| EscrowError::InsufficientSupply {})?;

        let max_remaining = self
            .supplies(side)
            .iter()
            .enumerate()
            .map(|(j, s)| if j == i { supply } else { *s })
            .max()
            .unwrap_or_default();
        if backing < max_remaining {
            return Err(EscrowError::InsufficientSupply {});
        }

        self.supplies_mut(side)[i] = supply;
        *self.backing_mut(side) = backing;
        Ok(())
    }

    /// Deposits `amount` spot coins and mints `amount` conditional coins for
    /// every outcome at once.
    pub fn mint_complete_set(&mut self, side: Side, amount: Uint128) -> Result<(), EscrowError> {
        *self.backing_mut(side) = self.backing(side).checked_add(amount)?;
        for supply in self.supplies_mut(side).iter_mut() {
            *supply = supply.checked_add(amount)?;
        }
        Ok(())
    }

    /// Burns `amount` conditional coins from every outcome and withdraws
    /// `amount` spot coins.
    pub fn burn_complete_set(&mut self, side: Side, amount: Uint128) -> Result<(), EscrowError> {
        if self.supplies(side).iter().any(|s| *s < amount) {
            return Err(EscrowError::InsufficientSupply {});
        }
        let backing = self
            .backing(side)
            .checked_sub(amount)
            .map_err(|_| EscrowError::SupplyExceedsBacking {})?;

        for supply in self.supplies_mut(side).iter_mut() {
            *supply -= amount;
        }
        *self.backing_mut(side) = backing;
        Ok(())
    }

    /// Redeems winning-outcome conditional coins 1:1 against the backing.
    pub fn redeem_winning(
        &mut self,
        market_winner: u8,
        outcome: u8,
        side: Side,
        amount: Uint128,
    ) -> Result<(), EscrowError> {
        let i = self.check_outcome(outcome)?;
        if outcome != market_winner {
            return Err(EscrowError::NotAWinner {});
        }
        let supply = self.supplies(side)[i]
            .checked_sub(amount)
            .map_err(|_| EscrowError::InsufficientSupply {})?;
        let backing = self
            .backing(side)
            .checked_sub(amount)
            .map_err(|_| EscrowError::SupplyExceedsBacking {})?;

        self.supplies_mut(side)[i] = supply;
        *self.backing_mut(side) = backing;
        Ok(())
    }

    /// Complete-set burn used when recombining the winning market's reserves
    /// back into spot. Losing outcome supplies are dead at this point, so
    /// they burn saturating; the winner burns exactly.
    pub fn recombine_burn(
        &mut self,
        winner: u8,
        side: Side,
        amount: Uint128,
    ) -> Result<(), EscrowError> {
        let w = self.check_outcome(winner)?;
        let winner_supply = self.supplies(side)[w]
            .checked_sub(amount)
            .map_err(|_| EscrowError::InsufficientSupply {})?;
        let backing = self
            .backing(side)
            .checked_sub(amount)
            .map_err(|_| EscrowError::SupplyExceedsBacking {})?;

        for (i, supply) in self.supplies_mut(side).iter_mut().enumerate() {
            if i == w {
                *supply = winner_supply;
            } else {
                *supply = supply.saturating_sub(amount);
            }
        }
        *self.backing_mut(side) = backing;
        Ok(())
    }

    /// Verifies the complete-set invariant. Must hold in every reachable
    /// state; a violation is a fatal internal-consistency failure.
    pub fn assert_solvent(&self) -> Result<(), EscrowError> {
        for side in [Side::Asset, Side::Stable] {
            if self.max_supply(side) > self.backing(side) {
                return Err(EscrowError::SupplyExceedsBacking {});
            }
        }
        Ok(())
    }
}
