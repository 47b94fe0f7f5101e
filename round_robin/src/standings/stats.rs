//! Per-player statistics and winner selection.

use serde::{Deserialize, Serialize};

use super::{Cell, Crosstable, Ledger, Points};
use crate::player::PlayerId;

/// Game record of one roster member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub player: PlayerId,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub played: u32,
    /// Points from games only
    pub game_points: Points,
    /// Ledger score, including withdrawal compensation
    pub score: Points,
    /// Sum of beaten opponents' game points plus half of drawn opponents'
    pub sonneborn_berger: f64,
}

/// Statistics for every roster member, in roster order
pub fn compute_stats(roster: &[PlayerId], crosstable: &Crosstable, ledger: &Ledger) -> Vec<PlayerStats> {
    roster
        .iter()
        .enumerate()
        .map(|(row, player)| {
            let mut stats = PlayerStats {
                player: player.clone(),
                wins: 0,
                draws: 0,
                losses: 0,
                played: 0,
                game_points: crosstable.points(row),
                score: ledger.score(player).unwrap_or_default(),
                sonneborn_berger: 0.0,
            };
            let mut sb_quarters = 0u32;

            for col in 0..crosstable.size() {
                let opponent_halves = crosstable.points(col).half_points();
                match crosstable.cell(row, col) {
                    Some(Cell::Win) => {
                        stats.wins += 1;
                        sb_quarters += 2 * opponent_halves;
                    }
                    Some(Cell::Draw) => {
                        stats.draws += 1;
                        sb_quarters += opponent_halves;
                    }
                    Some(Cell::Loss) => stats.losses += 1,
                    _ => continue,
                }
                stats.played += 1;
            }

            stats.sonneborn_berger = f64::from(sb_quarters) / 4.0;
            stats
        })
        .collect()
}

/// Players sharing first place
///
/// Highest score wins, then Sonneborn-Berger; everyone still level shares
/// the win. Nobody wins when the top score is zero.
pub fn pick_winners(stats: &[PlayerStats]) -> Vec<PlayerId> {
    let Some(top_score) = stats.iter().map(|s| s.score).max() else {
        return Vec::new();
    };
    if top_score == Points::ZERO {
        return Vec::new();
    }

    let leaders: Vec<&PlayerStats> = stats.iter().filter(|s| s.score == top_score).collect();
    let top_tiebreak = leaders
        .iter()
        .map(|s| s.sonneborn_berger)
        .fold(f64::MIN, f64::max);

    leaders
        .into_iter()
        .filter(|s| s.sonneborn_berger == top_tiebreak)
        .map(|s| s.player.clone())
        .collect()
}

/// Roster members who completed no game
pub fn inactive_players(stats: &[PlayerStats]) -> Vec<PlayerId> {
    stats
        .iter()
        .filter(|s| s.played == 0)
        .map(|s| s.player.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standings::Outcome;

    fn setup(n: usize) -> (Vec<PlayerId>, Crosstable, Ledger) {
        let roster: Vec<PlayerId> = (0..n)
            .map(|i| PlayerId::new(format!("p{i}")).unwrap())
            .collect();
        let ledger = Ledger::initialize(&roster);
        (roster, Crosstable::initialize(n), ledger)
    }

    fn play(
        roster: &[PlayerId],
        table: &mut Crosstable,
        ledger: &mut Ledger,
        a: usize,
        b: usize,
        outcome: Outcome,
    ) {
        table.record(a, b, outcome).unwrap();
        let (pa, pb) = outcome.points();
        ledger.adjust(&roster[a], pa).unwrap();
        ledger.adjust(&roster[b], pb).unwrap();
    }

    #[test]
    fn test_counts_and_sonneborn_berger() {
        let (roster, mut table, mut ledger) = setup(4);
        play(&roster, &mut table, &mut ledger, 0, 1, Outcome::FirstWins);
        play(&roster, &mut table, &mut ledger, 0, 2, Outcome::Draw);
        play(&roster, &mut table, &mut ledger, 1, 2, Outcome::FirstWins);

        let stats = compute_stats(&roster, &table, &ledger);
        assert_eq!(stats[0].wins, 1);
        assert_eq!(stats[0].draws, 1);
        assert_eq!(stats[0].played, 2);
        assert_eq!(stats[0].game_points, Points::from_half_points(3));
        // beat p1 (1 point) + half of p2 (0.5 points)
        assert_eq!(stats[0].sonneborn_berger, 1.25);
        assert_eq!(stats[3].played, 0);
        assert_eq!(inactive_players(&stats), vec![roster[3].clone()]);
    }

    #[test]
    fn test_tiebreak_decides_winner() {
        let (roster, mut table, mut ledger) = setup(4);
        // p0 and p1 both finish on 2 points
        play(&roster, &mut table, &mut ledger, 0, 2, Outcome::FirstWins);
        play(&roster, &mut table, &mut ledger, 0, 3, Outcome::FirstWins);
        play(&roster, &mut table, &mut ledger, 1, 0, Outcome::FirstWins);
        play(&roster, &mut table, &mut ledger, 2, 1, Outcome::FirstWins);
        play(&roster, &mut table, &mut ledger, 1, 3, Outcome::FirstWins);

        let stats = compute_stats(&roster, &table, &ledger);
        assert_eq!(stats[0].score, stats[1].score);
        assert_eq!(pick_winners(&stats), vec![roster[1].clone()]);
    }

    #[test]
    fn test_shared_win_and_no_winner() {
        let (roster, mut table, mut ledger) = setup(4);
        let stats = compute_stats(&roster, &table, &ledger);
        assert!(pick_winners(&stats).is_empty());

        play(&roster, &mut table, &mut ledger, 0, 1, Outcome::Draw);
        let stats = compute_stats(&roster, &table, &ledger);
        assert_eq!(pick_winners(&stats), vec![roster[0].clone(), roster[1].clone()]);
    }
}
