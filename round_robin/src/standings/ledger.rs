//! Score ledger for a tournament's active roster.

use serde::{Deserialize, Serialize};

use super::Points;
use crate::errors::{TournamentError, TournamentResult};
use crate::player::PlayerId;

/// One ranked ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub player: PlayerId,
    pub score: Points,
}

/// Player scores, kept in roster insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: Vec<Standing>,
}

impl Ledger {
    /// Every member starts at zero
    pub fn initialize(roster: &[PlayerId]) -> Self {
        Self {
            entries: roster
                .iter()
                .map(|player| Standing {
                    player: player.clone(),
                    score: Points::ZERO,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, player: &PlayerId) -> bool {
        self.position(player).is_some()
    }

    pub fn score(&self, player: &PlayerId) -> Option<Points> {
        self.position(player).map(|idx| self.entries[idx].score)
    }

    fn position(&self, player: &PlayerId) -> Option<usize> {
        self.entries.iter().position(|e| &e.player == player)
    }

    fn require(&self, player: &PlayerId) -> TournamentResult<usize> {
        self.position(player)
            .ok_or_else(|| TournamentError::UnknownMember(player.clone()))
    }

    pub fn add_player(&mut self, player: PlayerId, starting: Points) -> TournamentResult<()> {
        if self.contains(&player) {
            return Err(TournamentError::DuplicateMember(player));
        }
        self.entries.push(Standing {
            player,
            score: starting,
        });
        Ok(())
    }

    pub fn remove_player(&mut self, player: &PlayerId) -> TournamentResult<Points> {
        let idx = self.require(player)?;
        Ok(self.entries.remove(idx).score)
    }

    pub fn adjust(&mut self, player: &PlayerId, delta: Points) -> TournamentResult<()> {
        let idx = self.require(player)?;
        self.entries[idx].score += delta;
        Ok(())
    }

    /// Adjust two players at once; neither changes unless both are members
    pub fn adjust_pair(
        &mut self,
        first: (&PlayerId, Points),
        second: (&PlayerId, Points),
    ) -> TournamentResult<()> {
        let a = self.require(first.0)?;
        let b = self.require(second.0)?;
        self.entries[a].score += first.1;
        self.entries[b].score += second.1;
        Ok(())
    }

    /// One point to every remaining member for the game lost to a withdrawal
    pub fn compensate_withdrawal(&mut self) {
        for entry in &mut self.entries {
            entry.score += Points::ONE;
        }
    }

    /// Standings by descending score; ties keep insertion order
    pub fn rank(&self) -> Vec<Standing> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }

    /// Whether the ledger holds exactly the roster's members
    pub fn matches_roster(&self, roster: &[PlayerId]) -> bool {
        self.entries.len() == roster.len() && roster.iter().all(|p| self.contains(p))
    }
}
