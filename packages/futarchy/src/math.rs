use std::cmp::Ordering;
use std::fmt;

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Uint128, Uint256};

/// Fixed-point scale for all protocol prices. A price is the number of stable
/// units per asset unit multiplied by `PRICE_SCALE`.
pub const PRICE_SCALE: u128 = 1_000_000_000_000;

/// Basis point denominator used by every fee schedule.
pub const MAX_BPS: u16 = 10_000;

/// Parts-per-million denominator used by the spot oracle movement clamp.
pub const PPM: u64 = 1_000_000;

/// A 128-bit magnitude with an explicit sign.
///
/// Thresholds are stored bit-faithfully across layers, so this is kept as a
/// tiny value type instead of a native signed integer. Constructors normalize
/// negative zero to positive zero.
#[cw_serde]
#[derive(Copy, Default, Eq)]
pub struct SignedU128 {
    pub magnitude: Uint128,
    pub negative: bool,
}

impl SignedU128 {
    pub const ZERO: SignedU128 = SignedU128 {
        magnitude: Uint128::zero(),
        negative: false,
    };

    pub fn positive(magnitude: impl Into<Uint128>) -> Self {
        Self {
            magnitude: magnitude.into(),
            negative: false,
        }
    }

    pub fn negative(magnitude: impl Into<Uint128>) -> Self {
        let magnitude = magnitude.into();
        Self {
            negative: !magnitude.is_zero(),
            magnitude,
        }
    }

    /// Signed difference `a - b`.
    pub fn from_diff(a: Uint128, b: Uint128) -> Self {
        if a >= b {
            Self::positive(a - b)
        } else {
            Self::negative(b - a)
        }
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.negative && !self.magnitude.is_zero()
    }

    pub fn neg(self) -> Self {
        if self.is_negative() {
            Self::positive(self.magnitude)
        } else {
            Self::negative(self.magnitude)
        }
    }

    /// Saturating signed addition. Magnitudes never wrap.
    pub fn saturating_add(self, other: Self) -> Self {
        match (self.is_negative(), other.is_negative()) {
            (false, false) => Self::positive(self.magnitude.saturating_add(other.magnitude)),
            (true, true) => Self::negative(self.magnitude.saturating_add(other.magnitude)),
            _ => {
                if self.magnitude >= other.magnitude {
                    Self {
                        magnitude: self.magnitude - other.magnitude,
                        negative: self.is_negative() && self.magnitude != other.magnitude,
                    }
                } else {
                    Self {
                        magnitude: other.magnitude - self.magnitude,
                        negative: other.is_negative(),
                    }
                }
            }
        }
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        self.saturating_add(other.neg())
    }
}

impl PartialOrd for SignedU128 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SignedU128 {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_negative(), other.is_negative()) {
            (false, false) => self.magnitude.cmp(&other.magnitude),
            (true, true) => other.magnitude.cmp(&self.magnitude),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
        }
    }
}

impl fmt::Display for SignedU128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-{}", self.magnitude)
        } else {
            write!(f, "{}", self.magnitude)
        }
    }
}

/// Narrows a 256-bit value back to 128 bits, saturating at `Uint128::MAX`.
pub fn saturating_into_u128(value: Uint256) -> Uint128 {
    Uint128::try_from(value).unwrap_or(Uint128::MAX)
}
