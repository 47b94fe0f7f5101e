//! Rating cohorts: the static bands players matchmake within.
//!
//! Each band also fixes the tournament time control and carries the tables
//! used to place a player from a Lichess classical or Chess.com rapid rating.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Rating band `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cohort {
    start: u32,
    end: u32,
}

/// Upper bound of the open-ended top band
const TOP_BAND_END: u32 = 4000;

/// Every cohort, ascending
pub const COHORTS: [Cohort; 23] = [
    Cohort::band(0, 300),
    Cohort::band(300, 400),
    Cohort::band(400, 500),
    Cohort::band(500, 600),
    Cohort::band(600, 700),
    Cohort::band(700, 800),
    Cohort::band(800, 900),
    Cohort::band(900, 1000),
    Cohort::band(1000, 1100),
    Cohort::band(1100, 1200),
    Cohort::band(1200, 1300),
    Cohort::band(1300, 1400),
    Cohort::band(1400, 1500),
    Cohort::band(1500, 1600),
    Cohort::band(1600, 1700),
    Cohort::band(1700, 1800),
    Cohort::band(1800, 1900),
    Cohort::band(1900, 2000),
    Cohort::band(2000, 2100),
    Cohort::band(2100, 2200),
    Cohort::band(2200, 2300),
    Cohort::band(2300, 2400),
    Cohort::band(2400, TOP_BAND_END),
];

/// Lichess classical rating range per cohort, same order as [`COHORTS`]
const LICHESS_CLASSICAL: [(u32, u32); 23] = [
    (0, 1250),
    (1250, 1310),
    (1310, 1370),
    (1370, 1435),
    (1435, 1500),
    (1500, 1550),
    (1550, 1665),
    (1665, 1730),
    (1730, 1795),
    (1795, 1850),
    (1850, 1910),
    (1910, 1970),
    (1970, 2030),
    (2030, 2090),
    (2090, 2150),
    (2150, 2225),
    (2225, 2310),
    (2310, 2370),
    (2370, 2410),
    (2410, 2440),
    (2440, 2500),
    (2500, 2640),
    (2640, 4000),
];

/// Time control for games in a cohort's tournaments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeControl {
    /// Base time in minutes
    pub minutes: u32,
    /// Increment per move in seconds
    pub increment_secs: u32,
}

impl std::fmt::Display for TimeControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}+{}", self.minutes, self.increment_secs)
    }
}

impl Cohort {
    const fn band(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Look up the cohort starting at `start`
    pub fn from_start(start: u32) -> Option<Cohort> {
        COHORTS.iter().copied().find(|c| c.start == start)
    }

    /// Cohort containing `rating`
    pub fn containing(rating: u32) -> Option<Cohort> {
        COHORTS.iter().copied().find(|c| c.contains(rating))
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn contains(&self, rating: u32) -> bool {
        rating >= self.start && rating < self.end
    }

    fn position(&self) -> usize {
        COHORTS
            .iter()
            .position(|c| c == self)
            .unwrap_or_default()
    }

    /// The adjacent band below, if any
    pub fn lower(&self) -> Option<Cohort> {
        self.position()
            .checked_sub(1)
            .map(|idx| COHORTS[idx])
    }

    /// The adjacent band above, if any
    pub fn upper(&self) -> Option<Cohort> {
        COHORTS.get(self.position() + 1).copied()
    }

    /// Bands searched during matchmaking: own band, then one band down, then one band up
    pub fn search_bands(&self) -> Vec<Cohort> {
        std::iter::once(*self)
            .chain(self.lower())
            .chain(self.upper())
            .collect()
    }

    /// Game length and increment for this band
    pub fn time_control(&self) -> TimeControl {
        let (minutes, increment_secs) = match self.start {
            0..=700 => (30, 0),
            800..=1100 => (30, 30),
            1200..=1500 => (45, 30),
            1600..=1900 => (60, 30),
            _ => (90, 30),
        };
        TimeControl {
            minutes,
            increment_secs,
        }
    }

    /// Human-readable name, e.g. `1000-1100` or `2400+`
    pub fn display_name(&self) -> String {
        if self.end == TOP_BAND_END {
            format!("{}+", self.start)
        } else {
            format!("{}-{}", self.start, self.end)
        }
    }

    /// Stable storage key, e.g. `COHORT_1000_1100`
    pub fn key(&self) -> String {
        format!("COHORT_{}_{}", self.start, self.end)
    }

    /// Cohort for a Lichess classical rating
    pub fn for_lichess_rating(rating: u32) -> Option<Cohort> {
        LICHESS_CLASSICAL
            .iter()
            .position(|&(lo, hi)| rating >= lo && rating < hi)
            .map(|idx| COHORTS[idx])
    }

    /// Cohort for a Chess.com rapid rating
    pub fn for_chesscom_rating(rating: u32) -> Option<Cohort> {
        COHORTS
            .iter()
            .copied()
            .find(|c| rating >= c.chesscom_rapid_start() && rating < c.chesscom_rapid_end())
    }

    fn chesscom_rapid_start(&self) -> u32 {
        match self.start {
            0 => 0,
            1900 => 2165,
            2000 => 2275,
            2100 => 2360,
            2200 => 2425,
            2300 => 2485,
            2400 => 2550,
            other => other + 250,
        }
    }

    fn chesscom_rapid_end(&self) -> u32 {
        match self.start {
            0 => 550,
            1800 => 2165,
            1900 => 2275,
            2000 => 2360,
            2100 => 2425,
            2200 => 2485,
            2300 => 2550,
            2400 => TOP_BAND_END,
            _ => self.chesscom_rapid_start() + 100,
        }
    }
}

impl std::fmt::Display for Cohort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Error parsing a cohort name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown cohort: {0}")]
pub struct UnknownCohort(pub String);

impl FromStr for Cohort {
    type Err = UnknownCohort;

    /// Accepts `1000-1100`, `2400+` and `COHORT_1000_1100`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let start = if let Some(rest) = trimmed.strip_prefix("COHORT_") {
            rest.split('_').next()
        } else if let Some(top) = trimmed.strip_suffix('+') {
            Some(top)
        } else {
            trimmed.split('-').next()
        };

        let cohort = start
            .and_then(|v| v.parse::<u32>().ok())
            .and_then(Cohort::from_start)
            .ok_or_else(|| UnknownCohort(s.to_string()))?;

        if cohort.display_name() == trimmed || cohort.key() == trimmed {
            Ok(cohort)
        } else {
            Err(UnknownCohort(s.to_string()))
        }
    }
}

impl TryFrom<String> for Cohort {
    type Error = UnknownCohort;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cohort> for String {
    fn from(cohort: Cohort) -> Self {
        cohort.display_name()
    }
}
