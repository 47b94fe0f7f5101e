//! Cohort matchmaking: which WAITING tournament a new registrant joins.

use super::models::Tournament;
use crate::cohort::Cohort;
use crate::errors::{TournamentError, TournamentResult};
use crate::player::PlayerId;

/// Pick the tournament `player` should join
///
/// Searches `cohort`, then the band below, then the band above. Within a band
/// the earliest-created eligible tournament wins. `candidates` may hold
/// tournaments of any band and status; ineligible ones are skipped.
pub fn assign<'a>(
    player: &PlayerId,
    cohort: Cohort,
    candidates: &'a [Tournament],
) -> TournamentResult<&'a Tournament> {
    let bands = cohort.search_bands();

    let chosen = bands.iter().find_map(|band| {
        candidates
            .iter()
            .filter(|t| t.cohort == *band && t.accepts(player))
            .min_by_key(|t| (t.created_at, t.sequence))
    });
    chosen.ok_or(TournamentError::CapacityExhausted { searched: bands })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::lifecycle::join;
    use chrono::{Duration, Utc};

    fn player(name: &str) -> PlayerId {
        PlayerId::new(name).unwrap()
    }

    fn cohort(start: u32) -> Cohort {
        Cohort::from_start(start).unwrap()
    }

    fn tournament(start: u32, sequence: u32, age_secs: i64) -> Tournament {
        let mut t = Tournament::new(cohort(start), sequence, 4, false).unwrap();
        t.created_at = Utc::now() - Duration::seconds(age_secs);
        t
    }

    #[test]
    fn test_prefers_own_band_oldest_first() {
        let candidates = vec![
            tournament(900, 1, 100),
            tournament(1000, 2, 10),
            tournament(1000, 1, 50),
        ];
        let chosen = assign(&player("p"), cohort(1000), &candidates).unwrap();
        assert_eq!(chosen.cohort, cohort(1000));
        assert_eq!(chosen.sequence, 1);
    }

    #[test]
    fn test_falls_back_lower_then_upper() {
        let candidates = vec![tournament(1100, 1, 100), tournament(900, 1, 10)];
        let chosen = assign(&player("p"), cohort(1000), &candidates).unwrap();
        assert_eq!(chosen.cohort, cohort(900));

        let candidates = vec![tournament(1100, 1, 100)];
        let chosen = assign(&player("p"), cohort(1000), &candidates).unwrap();
        assert_eq!(chosen.cohort, cohort(1100));
    }

    #[test]
    fn test_skips_full_running_and_member() {
        let mut full = tournament(1000, 1, 100);
        for name in ["a", "b", "c", "d"] {
            join(&mut full, player(name), Utc::now()).unwrap();
        }
        let mut with_member = tournament(1000, 2, 50);
        join(&mut with_member, player("p"), Utc::now()).unwrap();
        let open = tournament(1000, 3, 10);

        let candidates = vec![full, with_member, open];
        let chosen = assign(&player("p"), cohort(1000), &candidates).unwrap();
        assert_eq!(chosen.sequence, 3);
    }

    #[test]
    fn test_capacity_exhausted_names_all_bands() {
        let candidates = vec![tournament(1500, 1, 0)];
        match assign(&player("p"), cohort(1000), &candidates) {
            Err(TournamentError::CapacityExhausted { searched }) => {
                assert_eq!(searched, vec![cohort(1000), cohort(900), cohort(1100)]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
