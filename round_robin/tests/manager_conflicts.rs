//! Conditional-write conflict handling in the manager
//!
//! A store wrapper loses a configurable number of conditional writes so the
//! re-match in `register` and the bounded retry of other writes run
//! deterministically.

use async_trait::async_trait;
use round_robin::db::{
    MemoryPlayerStore, MemoryTournamentStore, StoreError, StoreResult, TournamentStore,
};
use round_robin::player::{Platform, Player, PlayerId};
use round_robin::providers::ProviderRegistry;
use round_robin::tournament::{
    ManagerConfig, Tournament, TournamentId, TournamentManager, TournamentStatus,
};
use round_robin::{Cohort, TournamentError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Memory store whose next `compare_and_swap` calls report a conflict
struct ConflictingStore {
    inner: MemoryTournamentStore,
    conflicts: AtomicU32,
    /// Apply the write before reporting the conflict, as a racing writer would
    write_through: AtomicBool,
}

impl ConflictingStore {
    fn new() -> Self {
        Self {
            inner: MemoryTournamentStore::new(),
            conflicts: AtomicU32::new(0),
            write_through: AtomicBool::new(false),
        }
    }

    fn lose_next(&self, writes: u32, write_through: bool) {
        self.write_through.store(write_through, Ordering::SeqCst);
        self.conflicts.store(writes, Ordering::SeqCst);
    }

    fn remaining(&self) -> u32 {
        self.conflicts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TournamentStore for ConflictingStore {
    async fn get(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        self.inner.get(id).await
    }

    async fn insert(&self, tournament: &Tournament) -> StoreResult<()> {
        self.inner.insert(tournament).await
    }

    async fn find_by_cohort_and_status(
        &self,
        cohort: Cohort,
        status: TournamentStatus,
    ) -> StoreResult<Vec<Tournament>> {
        self.inner.find_by_cohort_and_status(cohort, status).await
    }

    async fn find_by_member(&self, player: &PlayerId) -> StoreResult<Vec<Tournament>> {
        self.inner.find_by_member(player).await
    }

    async fn list(
        &self,
        cohort: Option<Cohort>,
        status: Option<TournamentStatus>,
    ) -> StoreResult<Vec<Tournament>> {
        self.inner.list(cohort, status).await
    }

    async fn max_sequence(&self, cohort: Cohort) -> StoreResult<u32> {
        self.inner.max_sequence(cohort).await
    }

    async fn compare_and_swap(
        &self,
        tournament: &Tournament,
        expected_version: i64,
    ) -> StoreResult<Tournament> {
        let lose = self
            .conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !lose {
            return self.inner.compare_and_swap(tournament, expected_version).await;
        }
        if self.write_through.load(Ordering::SeqCst) {
            self.inner.compare_and_swap(tournament, expected_version).await?;
        }
        Err(StoreError::Conflict {
            id: tournament.id,
            expected: expected_version,
        })
    }
}

fn setup() -> (Arc<ConflictingStore>, TournamentManager) {
    let store = Arc::new(ConflictingStore::new());
    let config = ManagerConfig {
        capacity: 4,
        ..ManagerConfig::default()
    };
    let manager = TournamentManager::new(
        store.clone(),
        Arc::new(MemoryPlayerStore::new()),
        ProviderRegistry::new(),
        config,
    );
    (store, manager)
}

fn id(name: &str) -> PlayerId {
    PlayerId::new(name).unwrap()
}

fn player(name: &str) -> Player {
    Player::new(
        id(name),
        name.to_uppercase(),
        BTreeMap::from([(Platform::Lichess, format!("{name}_li"))]),
    )
    .unwrap()
}

fn cohort() -> Cohort {
    Cohort::containing(1250).unwrap()
}

#[tokio::test]
async fn test_register_rematches_after_one_conflict() {
    let (store, manager) = setup();
    manager.register(player("a"), cohort()).await.unwrap();

    store.lose_next(1, false);
    let registered = manager.register(player("b"), cohort()).await.unwrap();

    assert_eq!(store.remaining(), 0);
    assert_eq!(registered.tournament.players, 2);
    let stored = manager.get(registered.tournament.id).await.unwrap();
    assert!(stored.roster().contains(&id("b")));
}

#[tokio::test]
async fn test_register_surfaces_second_conflict() {
    let (store, manager) = setup();
    manager.register(player("a"), cohort()).await.unwrap();

    store.lose_next(2, false);
    let err = manager.register(player("b"), cohort()).await.unwrap_err();

    assert!(matches!(err, TournamentError::ConcurrencyConflict(_)));
    assert!(!err.is_retryable());
    let open = manager
        .list(Some(cohort()), Some(TournamentStatus::Waiting))
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].players, 1);
}

#[tokio::test]
async fn test_rematch_sees_membership_won_by_racing_write() {
    let (store, manager) = setup();
    manager.register(player("a"), cohort()).await.unwrap();

    // the same player lands through the racing write
    store.lose_next(1, true);
    let err = manager.register(player("b"), cohort()).await.unwrap_err();

    assert!(matches!(
        err,
        TournamentError::DuplicateMembership { ref player, .. } if *player == id("b")
    ));
    let placements = store.find_by_member(&id("b")).await.unwrap();
    assert_eq!(placements.len(), 1);
    assert_eq!(
        placements[0].roster().iter().filter(|p| **p == id("b")).count(),
        1
    );
}

#[tokio::test]
async fn test_join_tournament_rechecks_membership_on_retry() {
    let (store, manager) = setup();
    let first = manager.register(player("a"), cohort()).await.unwrap();
    manager.register(player("b"), cohort()).await.unwrap();
    manager.withdraw(&id("b")).await.unwrap();

    store.lose_next(1, true);
    let err = manager
        .join_tournament(first.tournament.id, &id("b"))
        .await
        .unwrap_err();

    assert!(matches!(err, TournamentError::DuplicateMembership { .. }));
    assert_eq!(store.find_by_member(&id("b")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_retries_within_attempt_budget() {
    let (store, manager) = setup();
    for name in ["a", "b"] {
        manager.register(player(name), cohort()).await.unwrap();
    }

    let attempts = manager.config().commit_attempts;
    store.lose_next(attempts - 1, false);
    let report = manager.withdraw(&id("a")).await.unwrap();

    assert_eq!(store.remaining(), 0);
    assert_eq!(report.tournament.players, 1);
    assert!(store.find_by_member(&id("a")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_surfaces_conflict_after_attempt_budget() {
    let (store, manager) = setup();
    for name in ["a", "b"] {
        manager.register(player(name), cohort()).await.unwrap();
    }

    let attempts = manager.config().commit_attempts;
    store.lose_next(attempts, false);
    let err = manager.withdraw(&id("a")).await.unwrap_err();

    assert!(matches!(err, TournamentError::ConcurrencyConflict(_)));
    assert_eq!(store.remaining(), 0);
    assert_eq!(store.find_by_member(&id("a")).await.unwrap().len(), 1);
}
