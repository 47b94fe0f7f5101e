/// Property-based tests for pairing generation and tournament bookkeeping
///
/// These tests check the schedule shape for every supported roster size and
/// that random sequences of results and withdrawals never break the
/// crosstable or the ledger.
use chrono::Utc;
use proptest::prelude::*;
use round_robin::player::PlayerId;
use round_robin::schedule::{RoundEntry, generate};
use round_robin::tournament::{
    GameOutcome, GameResult, Tournament, TournamentStatus, ingest, lifecycle,
};
use round_robin::{Cohort, TournamentError};
use std::collections::BTreeSet;

fn roster(n: usize) -> Vec<PlayerId> {
    (0..n).map(|i| PlayerId::new(format!("p{i}")).unwrap()).collect()
}

// A RUNNING tournament whose roster filled its capacity
fn running_tournament(n: usize) -> Tournament {
    let cohort = Cohort::from_start(1600).unwrap();
    let mut tournament = Tournament::new(cohort, 1, n, false).unwrap();
    for player in roster(n) {
        lifecycle::join(&mut tournament, player, Utc::now()).unwrap();
    }
    assert_eq!(tournament.status(), TournamentStatus::Running);
    tournament
}

fn outcome_strategy() -> impl Strategy<Value = GameOutcome> {
    prop_oneof![
        Just(GameOutcome::WhiteWins),
        Just(GameOutcome::BlackWins),
        Just(GameOutcome::Draw),
    ]
}

#[derive(Debug, Clone)]
enum Op {
    Game {
        white: usize,
        black: usize,
        outcome: GameOutcome,
        game: u8,
    },
    Withdraw(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..10, 0usize..10, outcome_strategy(), 0u8..20).prop_map(
            |(white, black, outcome, game)| Op::Game { white, black, outcome, game }
        ),
        1 => (0usize..10).prop_map(Op::Withdraw),
    ]
}

fn apply(tournament: &mut Tournament, op: &Op) -> Result<(), TournamentError> {
    let members = tournament.roster().to_vec();
    match *op {
        Op::Game {
            white,
            black,
            outcome,
            game,
        } => {
            let result = GameResult {
                white: members[white % members.len()].clone(),
                black: members[black % members.len()].clone(),
                outcome,
            };
            ingest::ingest(tournament, &format!("lichess:g{game}"), &result).map(|_| ())
        }
        Op::Withdraw(index) => {
            lifecycle::withdraw(tournament, &members[index % members.len()]).map(|_| ())
        }
    }
}

proptest! {
    #[test]
    fn test_every_pair_meets_exactly_once(n in 4usize..=16) {
        let players = roster(n);
        let schedule = generate(&players).unwrap();

        let expected_rounds = if n % 2 == 0 { n - 1 } else { n };
        prop_assert_eq!(schedule.rounds().len(), expected_rounds);

        let mut pairs = BTreeSet::new();
        for pairing in schedule.pairings() {
            prop_assert_ne!(&pairing.white, &pairing.black);
            let key = if pairing.white < pairing.black {
                (pairing.white.clone(), pairing.black.clone())
            } else {
                (pairing.black.clone(), pairing.white.clone())
            };
            prop_assert!(pairs.insert(key), "pair scheduled twice");
        }
        prop_assert_eq!(pairs.len(), n * (n - 1) / 2);
    }

    #[test]
    fn test_each_player_once_per_round(n in 4usize..=16) {
        let players = roster(n);
        let schedule = generate(&players).unwrap();
        let mut byes = BTreeSet::new();

        for round in schedule.rounds() {
            let mut seen = BTreeSet::new();
            for entry in &round.entries {
                match entry {
                    RoundEntry::Game(pairing) => {
                        prop_assert!(seen.insert(pairing.white.clone()));
                        prop_assert!(seen.insert(pairing.black.clone()));
                    }
                    RoundEntry::Bye { player } => {
                        prop_assert!(seen.insert(player.clone()));
                        prop_assert!(byes.insert(player.clone()), "second bye");
                    }
                }
            }
            prop_assert_eq!(seen.len(), n);
        }
        prop_assert_eq!(byes.len(), if n % 2 == 0 { 0 } else { n });
    }

    #[test]
    fn test_generation_is_deterministic(n in 4usize..=12) {
        let players = roster(n);
        prop_assert_eq!(generate(&players).unwrap(), generate(&players).unwrap());
    }

    #[test]
    fn test_bookkeeping_survives_random_operations(
        n in 4usize..=10,
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let mut tournament = running_tournament(n);

        for op in &ops {
            let before = tournament.clone();
            if apply(&mut tournament, op).is_err() {
                // rejected operations leave no trace
                prop_assert_eq!(&tournament, &before);
            }

            prop_assert!(tournament.crosstable().is_consistent());
            prop_assert!(tournament.ledger().matches_roster(tournament.roster()));
            prop_assert!(tournament.roster().len() <= tournament.capacity);
            prop_assert!(tournament.check_invariants().is_ok());
        }
    }

    #[test]
    fn test_resubmitting_a_game_changes_nothing(
        n in 4usize..=10,
        white in 0usize..10,
        offset in 1usize..10,
        outcome in outcome_strategy(),
    ) {
        let mut tournament = running_tournament(n);
        let members = tournament.roster().to_vec();
        let white = white % n;
        let black = (white + 1 + offset % (n - 1)) % n;
        let result = GameResult {
            white: members[white].clone(),
            black: members[black].clone(),
            outcome,
        };

        ingest::ingest(&mut tournament, "chesscom:42", &result).unwrap();
        let once = tournament.clone();
        let again = ingest::ingest(&mut tournament, "chesscom:42", &result);

        prop_assert!(matches!(again, Err(TournamentError::AlreadySubmitted(_))));
        prop_assert_eq!(tournament, once);
    }
}
