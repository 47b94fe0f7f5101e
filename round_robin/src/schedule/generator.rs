//! Circle-method round-robin pairing.
//!
//! One seat is fixed at slot `n-1` while the other `n-1` players rotate, so
//! every pair meets exactly once over `n-1` rounds. Odd rosters get a bye
//! placeholder in the fixed seat, which makes the player at slot `r` sit out
//! round `r`.

use super::models::{Pairing, Round, RoundEntry, Schedule};
use crate::errors::{TournamentError, TournamentResult};
use crate::player::PlayerId;

/// Fewest players a schedule is generated for
pub const MIN_PLAYERS: usize = 4;

/// Rotation slots `(a, b)` of every board in round `round`
fn round_slots(n: usize, round: usize) -> impl Iterator<Item = (usize, usize)> {
    let m = n - 1;
    (0..n / 2).map(move |board| {
        let a = (round + board) % m;
        let b = if board == 0 { m } else { (m - board + round) % m };
        (a, b)
    })
}

/// Generate the full schedule for `roster`
///
/// Deterministic in roster order. Even rounds give white to slot `a`, odd
/// rounds to slot `b`.
pub fn generate(roster: &[PlayerId]) -> TournamentResult<Schedule> {
    if roster.len() < MIN_PLAYERS {
        return Err(TournamentError::InsufficientPlayers {
            needed: MIN_PLAYERS,
            current: roster.len(),
        });
    }

    let mut seats: Vec<Option<&PlayerId>> = roster.iter().map(Some).collect();
    if seats.len() % 2 == 1 {
        seats.push(None);
    }
    let n = seats.len();

    let rounds = (0..n - 1)
        .map(|r| {
            let entries = round_slots(n, r)
                .filter_map(|(a, b)| {
                    let (white, black) = if r % 2 == 0 { (a, b) } else { (b, a) };
                    match (seats[white], seats[black]) {
                        (Some(w), Some(b)) => {
                            Some(RoundEntry::Game(Pairing::new(w.clone(), b.clone())))
                        }
                        (Some(p), None) | (None, Some(p)) => {
                            Some(RoundEntry::Bye { player: p.clone() })
                        }
                        (None, None) => None,
                    }
                })
                .collect();
            Round {
                number: r as u32 + 1,
                entries,
            }
        })
        .collect();

    Ok(Schedule::new(rounds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn roster(n: usize) -> Vec<PlayerId> {
        (0..n)
            .map(|i| PlayerId::new(format!("P{i}")).unwrap())
            .collect()
    }

    fn names(p: &Pairing) -> (&str, &str) {
        (p.white.as_str(), p.black.as_str())
    }

    #[test]
    fn test_too_few_players() {
        let err = generate(&roster(3)).unwrap_err();
        assert!(matches!(
            err,
            TournamentError::InsufficientPlayers {
                needed: 4,
                current: 3
            }
        ));
    }

    #[test]
    fn test_four_player_schedule() {
        let schedule = generate(&roster(4)).unwrap();
        let rounds: Vec<Vec<(&str, &str)>> = schedule
            .rounds()
            .iter()
            .map(|r| r.pairings().map(names).collect())
            .collect();

        assert_eq!(
            rounds,
            vec![
                vec![("P0", "P3"), ("P1", "P2")],
                vec![("P3", "P1"), ("P0", "P2")],
                vec![("P2", "P3"), ("P0", "P1")],
            ]
        );
    }

    #[test]
    fn test_eight_players_full_round_robin() {
        let players = roster(8);
        let schedule = generate(&players).unwrap();
        assert_eq!(schedule.rounds().len(), 7);

        let mut seen = HashSet::new();
        for round in schedule.rounds() {
            assert_eq!(round.pairings().count(), 4);
            assert!(round.bye().is_none());
            for p in round.pairings() {
                let key = if p.white < p.black {
                    (p.white.clone(), p.black.clone())
                } else {
                    (p.black.clone(), p.white.clone())
                };
                assert!(seen.insert(key), "pair met twice");
            }
        }
        assert_eq!(seen.len(), 28);
    }

    #[test]
    fn test_odd_roster_gets_byes() {
        let players = roster(5);
        let schedule = generate(&players).unwrap();
        assert_eq!(schedule.rounds().len(), 5);

        for (r, round) in schedule.rounds().iter().enumerate() {
            assert_eq!(round.bye(), Some(&players[r]));
            assert_eq!(round.pairings().count(), 2);
        }
        assert_eq!(schedule.pairings().count(), 10);
    }

    #[test]
    fn test_deterministic() {
        let players = roster(7);
        assert_eq!(generate(&players).unwrap(), generate(&players).unwrap());
    }
}
