//! Schedule data: rounds of pairings and byes.

use serde::{Deserialize, Serialize};

use crate::player::PlayerId;

/// One game of a round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub white: PlayerId,
    pub black: PlayerId,
    /// Open challenge link, when one was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_url: Option<String>,
}

impl Pairing {
    pub fn new(white: PlayerId, black: PlayerId) -> Self {
        Self {
            white,
            black,
            challenge_url: None,
        }
    }

    pub fn involves(&self, player: &PlayerId) -> bool {
        &self.white == player || &self.black == player
    }

    /// Opponent of `player` in this game
    pub fn opponent_of(&self, player: &PlayerId) -> Option<&PlayerId> {
        if &self.white == player {
            Some(&self.black)
        } else if &self.black == player {
            Some(&self.white)
        } else {
            None
        }
    }
}

/// Entry of a round: a game, or a player sitting out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundEntry {
    Game(Pairing),
    Bye { player: PlayerId },
}

impl RoundEntry {
    pub fn involves(&self, player: &PlayerId) -> bool {
        match self {
            RoundEntry::Game(pairing) => pairing.involves(player),
            RoundEntry::Bye { player: p } => p == player,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// 1-based round number
    pub number: u32,
    pub entries: Vec<RoundEntry>,
}

impl Round {
    pub fn pairings(&self) -> impl Iterator<Item = &Pairing> {
        self.entries.iter().filter_map(|e| match e {
            RoundEntry::Game(p) => Some(p),
            RoundEntry::Bye { .. } => None,
        })
    }

    pub fn bye(&self) -> Option<&PlayerId> {
        self.entries.iter().find_map(|e| match e {
            RoundEntry::Bye { player } => Some(player),
            RoundEntry::Game(_) => None,
        })
    }
}

/// Complete round-robin schedule; empty until the tournament starts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schedule {
    rounds: Vec<Round>,
}

impl Schedule {
    pub fn new(rounds: Vec<Round>) -> Self {
        Self { rounds }
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn pairings(&self) -> impl Iterator<Item = &Pairing> {
        self.rounds.iter().flat_map(Round::pairings)
    }

    pub fn pairings_mut(&mut self) -> impl Iterator<Item = &mut Pairing> {
        self.rounds
            .iter_mut()
            .flat_map(|round| round.entries.iter_mut())
            .filter_map(|entry| match entry {
                RoundEntry::Game(p) => Some(p),
                RoundEntry::Bye { .. } => None,
            })
    }

    /// Scheduled game between two players, in either colour
    pub fn find_pairing(&self, a: &PlayerId, b: &PlayerId) -> Option<&Pairing> {
        self.pairings().find(|p| p.involves(a) && p.involves(b))
    }

    pub fn clear(&mut self) {
        self.rounds.clear();
    }
}
