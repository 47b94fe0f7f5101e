//! Live standings: the pairwise crosstable and the score ledger.

pub mod crosstable;
pub mod ledger;
pub mod stats;

pub use crosstable::{Cell, Crosstable, CrosstableSnapshot, Outcome};
pub use ledger::{Ledger, Standing};
pub use stats::{PlayerStats, compute_stats, inactive_players, pick_winners};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ops::{Add, AddAssign};

/// Score in exact half points
///
/// Serialized as a decimal number (`1.5`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Points(u32);

impl Points {
    pub const ZERO: Points = Points(0);
    pub const HALF: Points = Points(1);
    pub const ONE: Points = Points(2);

    pub const fn from_half_points(halves: u32) -> Self {
        Self(halves)
    }

    pub const fn half_points(&self) -> u32 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.0) / 2.0
    }
}

impl Add for Points {
    type Output = Points;

    fn add(self, rhs: Points) -> Points {
        Points(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Points {
    fn add_assign(&mut self, rhs: Points) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for Points {
    fn sum<I: Iterator<Item = Points>>(iter: I) -> Points {
        iter.fold(Points::ZERO, Add::add)
    }
}

impl std::fmt::Display for Points {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 % 2 == 0 {
            write!(f, "{}", self.0 / 2)
        } else {
            write!(f, "{}.5", self.0 / 2)
        }
    }
}

impl Serialize for Points {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Points {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        let halves = value * 2.0;
        if !halves.is_finite() || halves < 0.0 || halves.fract() != 0.0 || halves > f64::from(u32::MAX) {
            return Err(serde::de::Error::custom(format!(
                "score {value} is not a non-negative multiple of 0.5"
            )));
        }
        Ok(Points(halves as u32))
    }
}
