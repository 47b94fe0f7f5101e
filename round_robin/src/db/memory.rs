//! In-memory stores for tests and database-less development servers.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::repository::{PlayerStore, TournamentStore};
use super::{StoreError, StoreResult};
use crate::cohort::Cohort;
use crate::player::{Platform, Player, PlayerId};
use crate::tournament::models::{Tournament, TournamentId, TournamentStatus};

/// Tournaments kept in creation order behind a lock
#[derive(Default)]
pub struct MemoryTournamentStore {
    tournaments: RwLock<Vec<Tournament>>,
}

impl MemoryTournamentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tournaments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tournaments.read().await.is_empty()
    }

    async fn filtered<F>(&self, predicate: F) -> Vec<Tournament>
    where
        F: Fn(&Tournament) -> bool,
    {
        self.tournaments
            .read()
            .await
            .iter()
            .filter(|t| predicate(t))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TournamentStore for MemoryTournamentStore {
    async fn get(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        Ok(self
            .tournaments
            .read()
            .await
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn insert(&self, tournament: &Tournament) -> StoreResult<()> {
        let mut tournaments = self.tournaments.write().await;
        if tournaments.iter().any(|t| t.id == tournament.id) {
            return Err(StoreError::Duplicate(tournament.id));
        }
        tournaments.push(tournament.clone());
        Ok(())
    }

    async fn find_by_cohort_and_status(
        &self,
        cohort: Cohort,
        status: TournamentStatus,
    ) -> StoreResult<Vec<Tournament>> {
        Ok(self
            .filtered(|t| t.cohort == cohort && t.status() == status)
            .await)
    }

    async fn find_by_member(&self, player: &PlayerId) -> StoreResult<Vec<Tournament>> {
        Ok(self.filtered(|t| t.is_member(player)).await)
    }

    async fn list(
        &self,
        cohort: Option<Cohort>,
        status: Option<TournamentStatus>,
    ) -> StoreResult<Vec<Tournament>> {
        Ok(self
            .filtered(|t| {
                cohort.is_none_or(|c| t.cohort == c) && status.is_none_or(|s| t.status() == s)
            })
            .await)
    }

    async fn max_sequence(&self, cohort: Cohort) -> StoreResult<u32> {
        Ok(self
            .tournaments
            .read()
            .await
            .iter()
            .filter(|t| t.cohort == cohort)
            .map(|t| t.sequence)
            .max()
            .unwrap_or(0))
    }

    async fn compare_and_swap(
        &self,
        tournament: &Tournament,
        expected_version: i64,
    ) -> StoreResult<Tournament> {
        let mut tournaments = self.tournaments.write().await;
        let slot = tournaments
            .iter_mut()
            .find(|t| t.id == tournament.id)
            .ok_or(StoreError::Missing(tournament.id))?;

        if slot.version != expected_version {
            return Err(StoreError::Conflict {
                id: tournament.id,
                expected: expected_version,
            });
        }

        let mut stored = tournament.clone();
        stored.version = expected_version + 1;
        *slot = stored.clone();
        Ok(stored)
    }
}

/// Players keyed by id
#[derive(Default)]
pub struct MemoryPlayerStore {
    players: RwLock<HashMap<PlayerId, Player>>,
}

impl MemoryPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlayerStore for MemoryPlayerStore {
    async fn get(&self, id: &PlayerId) -> StoreResult<Option<Player>> {
        Ok(self.players.read().await.get(id).cloned())
    }

    async fn find_by_platform_handle(
        &self,
        platform: Platform,
        handle: &str,
    ) -> StoreResult<Option<Player>> {
        Ok(self
            .players
            .read()
            .await
            .values()
            .find(|p| p.owns_handle(platform, handle))
            .cloned())
    }

    async fn upsert(&self, player: &Player) -> StoreResult<()> {
        let mut players = self.players.write().await;
        for (platform, handle) in &player.handles {
            let taken = players
                .values()
                .any(|other| other.id != player.id && other.owns_handle(*platform, handle));
            if taken {
                return Err(StoreError::HandleTaken {
                    platform: *platform,
                    handle: handle.clone(),
                });
            }
        }
        players.insert(player.id.clone(), player.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn cohort() -> Cohort {
        Cohort::from_start(1200).unwrap()
    }

    fn player(id: &str, lichess: &str) -> Player {
        Player::new(
            PlayerId::new(id).unwrap(),
            id,
            BTreeMap::from([(Platform::Lichess, lichess.to_string())]),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryTournamentStore::new();
        assert!(store.is_empty().await);
        let first = Tournament::new(cohort(), 1, 8, false).unwrap();
        let second = Tournament::new(cohort(), 2, 8, false).unwrap();
        store.insert(&first).await.unwrap();
        store.insert(&second).await.unwrap();
        assert_eq!(store.len().await, 2);

        assert!(matches!(
            store.insert(&first).await,
            Err(StoreError::Duplicate(_))
        ));

        let waiting = store
            .find_by_cohort_and_status(cohort(), TournamentStatus::Waiting)
            .await
            .unwrap();
        assert_eq!(waiting.len(), 2);
        assert_eq!(waiting[0].id, first.id);
        assert_eq!(store.max_sequence(cohort()).await.unwrap(), 2);
        assert_eq!(
            store
                .max_sequence(Cohort::from_start(0).unwrap())
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_compare_and_swap() {
        let store = MemoryTournamentStore::new();
        let t = Tournament::new(cohort(), 1, 8, false).unwrap();
        store.insert(&t).await.unwrap();

        let stored = store.compare_and_swap(&t, 0).await.unwrap();
        assert_eq!(stored.version, 1);

        let err = store.compare_and_swap(&t, 0).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 0, .. }));

        let other = Tournament::new(cohort(), 2, 8, false).unwrap();
        assert!(matches!(
            store.compare_and_swap(&other, 0).await,
            Err(StoreError::Missing(_))
        ));
    }

    #[tokio::test]
    async fn test_player_handles() {
        let store = MemoryPlayerStore::new();
        store.upsert(&player("alice", "AliceL")).await.unwrap();

        let found = store
            .find_by_platform_handle(Platform::Lichess, "alicel")
            .await
            .unwrap();
        assert_eq!(found.map(|p| p.id.to_string()), Some("alice".to_string()));

        assert!(matches!(
            store.upsert(&player("bob", "ALICEL")).await,
            Err(StoreError::HandleTaken { .. })
        ));

        store.upsert(&player("alice", "alice2")).await.unwrap();
        assert!(
            store
                .find_by_platform_handle(Platform::Lichess, "AliceL")
                .await
                .unwrap()
                .is_none()
        );
    }
}
