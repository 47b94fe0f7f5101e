//! Integration tests for the tournament lifecycle
//!
//! These drive the manager end to end against the in-memory stores with
//! scripted platform providers.

use async_trait::async_trait;
use round_robin::db::{MemoryPlayerStore, MemoryTournamentStore, PlayerStore};
use round_robin::player::{Platform, Player, PlayerId};
use round_robin::providers::{
    ChallengeLinkProvider, ChallengeRequest, GameResultProvider, PlatformGame, ProviderError,
    ProviderRegistry, ProviderResult, SearchWindow,
};
use round_robin::standings::{Cell, Points};
use round_robin::tournament::{
    GameOutcome, JoinOutcome, ManagerConfig, TournamentManager, TournamentStatus,
    WithdrawOutcome,
};
use round_robin::{Cohort, TournamentError};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Reports the same finished game for every URL
struct ScriptedResults {
    game: PlatformGame,
}

#[async_trait]
impl GameResultProvider for ScriptedResults {
    fn platform(&self) -> Platform {
        Platform::Lichess
    }

    async fn fetch_result(
        &self,
        _game_url: &str,
        _player_handle: &str,
        _window: &SearchWindow,
    ) -> ProviderResult<Option<PlatformGame>> {
        Ok(Some(self.game.clone()))
    }
}

struct CountingChallenges {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl ChallengeLinkProvider for CountingChallenges {
    fn platform(&self) -> Platform {
        Platform::Lichess
    }

    async fn create_challenge(&self, request: &ChallengeRequest) -> ProviderResult<Option<String>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::Malformed("challenge rejected".to_string()));
        }
        assert_eq!(request.time_control.to_string(), "30+30");
        Ok(Some(format!("https://lichess.org/challenge{n}")))
    }
}

fn config(capacity: usize, automode: bool) -> ManagerConfig {
    ManagerConfig {
        capacity,
        automode,
        provider_attempts: 2,
        provider_backoff: Duration::from_millis(1),
        ..Default::default()
    }
}

fn manager_with(config: ManagerConfig, providers: ProviderRegistry) -> TournamentManager {
    TournamentManager::new(
        Arc::new(MemoryTournamentStore::new()),
        Arc::new(MemoryPlayerStore::new()),
        providers,
        config,
    )
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
    Cohort::containing(1050).unwrap()
}

async fn register_all(manager: &TournamentManager, names: &[&str]) -> Vec<JoinOutcome> {
    let mut outcomes = Vec::new();
    for name in names {
        outcomes.push(manager.register(player(name), cohort()).await.unwrap().outcome);
    }
    outcomes
}

#[tokio::test]
async fn test_full_tournament_starts_and_opens_sibling() {
    let manager = manager_with(config(8, false), ProviderRegistry::new());
    let names = ["p1", "p2", "p3", "p4", "p5", "p6", "p7", "p8"];
    let outcomes = register_all(&manager, &names).await;

    assert!(outcomes[..7].iter().all(|o| *o == JoinOutcome::Joined));
    assert_eq!(outcomes[7], JoinOutcome::Started);

    let running = manager
        .list(Some(cohort()), Some(TournamentStatus::Running))
        .await
        .unwrap();
    assert_eq!(running.len(), 1);
    let tournament = manager.get(running[0].id).await.unwrap();
    assert_eq!(tournament.schedule().rounds().len(), 7);
    assert!(
        tournament
            .schedule()
            .rounds()
            .iter()
            .all(|round| round.pairings().count() == 4)
    );
    assert!(tournament.start_date().is_some());
    assert!(tournament.check_invariants().is_ok());

    let waiting = manager
        .list(Some(cohort()), Some(TournamentStatus::Waiting))
        .await
        .unwrap();
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].cohort, cohort());
    assert_eq!(waiting[0].players, 0);

    // the ninth player lands in the sibling
    let placed = manager.register(player("p9"), cohort()).await.unwrap();
    assert_eq!(placed.tournament.id, waiting[0].id);
}

#[tokio::test]
async fn test_withdrawal_from_four_player_tournament() {
    let manager = manager_with(config(4, false), ProviderRegistry::new());
    register_all(&manager, &["p1", "p2", "p3", "p4"]).await;

    let report = manager.withdraw(&id("p3")).await.unwrap();
    assert_eq!(
        report.outcome,
        WithdrawOutcome::ScheduleCleared {
            needed: 4,
            current: 3
        }
    );
    assert!(matches!(
        report.outcome.schedule_error(),
        Some(TournamentError::InsufficientPlayers {
            needed: 4,
            current: 3
        })
    ));

    let tournament = manager.get(report.tournament.id).await.unwrap();
    assert_eq!(tournament.roster(), &[id("p1"), id("p2"), id("p4")]);
    assert_eq!(tournament.crosstable().size(), 3);
    assert!(tournament.schedule().is_empty());
    for name in ["p1", "p2", "p4"] {
        assert_eq!(tournament.ledger().score(&id(name)), Some(Points::ONE));
    }
    assert!(tournament.check_invariants().is_ok());

    // one more withdrawal would leave two players
    manager.withdraw(&id("p4")).await.unwrap_err();
    let unchanged = manager.get(report.tournament.id).await.unwrap();
    assert_eq!(unchanged.roster().len(), 3);
}

#[tokio::test]
async fn test_submitted_game_is_applied_once() {
    let game = PlatformGame {
        game_id: "abcdEFGH".to_string(),
        white: "P1_LI".to_string(),
        black: "p2_li".to_string(),
        outcome: GameOutcome::WhiteWins,
        played_at: None,
    };
    let providers =
        ProviderRegistry::new().with_result_provider(Arc::new(ScriptedResults { game }));
    let manager = manager_with(config(4, false), providers);
    register_all(&manager, &["p1", "p2", "p3", "p4"]).await;
    let tournament_id = manager.withdraw(&id("p4")).await.unwrap().tournament.id;

    let url = "https://lichess.org/abcdEFGH";
    let submitted = manager.submit_game(&id("p2"), url).await.unwrap();
    assert_eq!(submitted.game_id, "lichess:abcdEFGH");
    assert_eq!(submitted.result.white, id("p1"));
    assert_eq!(submitted.scores.white_score, Points::from_half_points(4));
    assert_eq!(submitted.scores.black_score, Points::ONE);

    let after_first = manager.get(tournament_id).await.unwrap();
    assert_eq!(after_first.crosstable().cell(0, 1), Some(Cell::Win));
    assert_eq!(after_first.crosstable().cell(1, 0), Some(Cell::Loss));

    let err = manager.submit_game(&id("p1"), url).await.unwrap_err();
    assert!(matches!(err, TournamentError::AlreadySubmitted(_)));

    let after_second = manager.get(tournament_id).await.unwrap();
    assert_eq!(after_second.crosstable(), after_first.crosstable());
    assert_eq!(after_second.ledger(), after_first.ledger());
    assert_eq!(after_second.version, after_first.version);
}

#[tokio::test]
async fn test_outsider_cannot_submit_a_game() {
    let game = PlatformGame {
        game_id: "abcdEFGH".to_string(),
        white: "p1_li".to_string(),
        black: "p2_li".to_string(),
        outcome: GameOutcome::Draw,
        played_at: None,
    };
    let providers =
        ProviderRegistry::new().with_result_provider(Arc::new(ScriptedResults { game }));
    let manager = manager_with(config(4, false), providers);
    register_all(&manager, &["p1", "p2", "p3", "p4"]).await;

    let err = manager
        .submit_game(&id("p3"), "https://lichess.org/abcdEFGH")
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::UnverifiedParticipant(_)));

    // a Chess.com URL needs a linked Chess.com account
    let err = manager
        .submit_game(&id("p1"), "https://www.chess.com/game/live/123")
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::UnverifiedParticipant(_)));
}

#[tokio::test]
async fn test_automode_attaches_challenge_links() {
    let challenges = Arc::new(CountingChallenges {
        calls: AtomicUsize::new(0),
        fail: false,
    });
    let providers = ProviderRegistry::new().with_challenge_provider(challenges.clone());
    let manager = manager_with(config(4, true), providers);
    register_all(&manager, &["p1", "p2", "p3", "p4"]).await;

    let running = manager
        .list(None, Some(TournamentStatus::Running))
        .await
        .unwrap();
    let tournament = manager.get(running[0].id).await.unwrap();
    assert_eq!(challenges.calls.load(Ordering::SeqCst), 6);
    assert!(
        tournament
            .schedule()
            .pairings()
            .all(|p| p.challenge_url.is_some())
    );
}

#[tokio::test]
async fn test_failed_challenge_links_do_not_block_start() {
    let challenges = Arc::new(CountingChallenges {
        calls: AtomicUsize::new(0),
        fail: true,
    });
    let providers = ProviderRegistry::new().with_challenge_provider(challenges.clone());
    let manager = manager_with(config(4, true), providers);
    let outcomes = register_all(&manager, &["p1", "p2", "p3", "p4"]).await;
    assert_eq!(outcomes[3], JoinOutcome::Started);

    let running = manager
        .list(None, Some(TournamentStatus::Running))
        .await
        .unwrap();
    let tournament = manager.get(running[0].id).await.unwrap();
    assert!(tournament.schedule().pairings().all(|p| p.challenge_url.is_none()));
}

#[tokio::test]
async fn test_close_picks_winner() {
    let game = PlatformGame {
        game_id: "abcdEFGH".to_string(),
        white: "p1_li".to_string(),
        black: "p2_li".to_string(),
        outcome: GameOutcome::WhiteWins,
        played_at: None,
    };
    let providers =
        ProviderRegistry::new().with_result_provider(Arc::new(ScriptedResults { game }));
    let manager = manager_with(config(4, false), providers);
    register_all(&manager, &["p1", "p2", "p3", "p4"]).await;
    let tournament_id = manager
        .submit_game(&id("p1"), "https://lichess.org/abcdEFGH")
        .await
        .unwrap()
        .tournament
        .id;

    let outcome = manager.close(tournament_id).await.unwrap();
    assert_eq!(outcome.winners, vec![id("p1")]);
    assert_eq!(outcome.inactive, vec![id("p3"), id("p4")]);

    let standings = manager.standings(tournament_id).await.unwrap();
    assert_eq!(standings.status, TournamentStatus::Closed);
    assert_eq!(standings.winners, vec![id("p1")]);
    assert_eq!(standings.crosstable.grid[0][1], Cell::Win);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_never_overfill() {
    let tournaments = Arc::new(MemoryTournamentStore::new());
    let players = Arc::new(MemoryPlayerStore::new());
    let manager = TournamentManager::new(
        tournaments,
        players.clone(),
        ProviderRegistry::new(),
        config(5, false),
    );

    let mut handles = Vec::new();
    for i in 0..24 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            manager
                .register(player(&format!("racer{i}")), cohort())
                .await
        }));
    }

    let mut placed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(
                TournamentError::ConcurrencyConflict(_) | TournamentError::CapacityExhausted { .. },
            ) => {}
            Err(e) => panic!("unexpected registration failure: {e}"),
        }
    }

    let all = manager.list(None, None).await.unwrap();
    let mut members = HashSet::new();
    for summary in &all {
        assert!(summary.players <= summary.capacity);
        let tournament = manager.get(summary.id).await.unwrap();
        assert!(tournament.check_invariants().is_ok());
        for member in tournament.roster() {
            assert!(members.insert(member.clone()), "{member} placed twice");
        }
    }
    assert_eq!(members.len(), placed);

    for member in &members {
        assert!(players.get(member).await.unwrap().is_some(), "{member} not stored");
    }
}
