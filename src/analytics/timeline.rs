//! Round-by-round timeline reconstruction.
//!
//! Turns one raw match into an ordered sequence of round events with a
//! running score, plus fixed-size pagination for page-by-page navigation.
//!
//! The upstream kill array is match-wide and NOT guaranteed chronological;
//! kills are grouped by round index and sorted by in-round time before any
//! first-blood determination. Reconstruction is pure: callers re-derive
//! from the match id on every page navigation rather than caching.

use serde::{Deserialize, Serialize};

use crate::models::{MatchRecord, Side};

/// Rounds shown per timeline page.
pub const ROUNDS_PER_PAGE: usize = 3;

/// One kill in a reconstructed round, with roster names resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillSummary {
    /// Milliseconds into the round.
    pub time_in_round: u64,
    pub killer: String,
    pub killer_side: Option<Side>,
    pub victim: String,
    pub victim_side: Option<Side>,
    pub weapon: String,
}

/// Spike plant within a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantSummary {
    pub site: Option<String>,
    pub player: String,
}

/// Spike defuse within a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefuseSummary {
    pub player: String,
}

/// One reconstructed round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTimeline {
    /// 1-based round number.
    pub number: usize,

    pub winner: Option<Side>,
    pub end_type: String,

    /// Running score after this round.
    pub blue_score: u32,
    pub red_score: u32,

    /// First kill of the round after time-sorting.
    pub first_blood: Option<KillSummary>,

    /// All kills, ascending by in-round time.
    pub kills: Vec<KillSummary>,

    pub plant: Option<PlantSummary>,
    pub defuse: Option<DefuseSummary>,
}

fn resolve_name(record: &MatchRecord, puuid: &str) -> (String, Option<Side>) {
    match record.player_by_puuid(puuid) {
        Some(p) => (p.name.clone(), p.side()),
        None => ("Unknown".to_string(), None),
    }
}

/// Reconstruct the ordered round timeline for one match.
///
/// Rounds with an unparseable winner are still emitted (winner `None`) but
/// do not advance the running score; their kills are processed normally.
pub fn reconstruct(record: &MatchRecord) -> Vec<RoundTimeline> {
    let mut timeline = Vec::with_capacity(record.rounds.len());
    let mut blue_score = 0u32;
    let mut red_score = 0u32;

    for (index, round) in record.rounds.iter().enumerate() {
        let winner = Side::parse(&round.winning_team);
        match winner {
            Some(Side::Blue) => blue_score += 1,
            Some(Side::Red) => red_score += 1,
            None => {}
        }

        let mut round_kills: Vec<&crate::models::KillEvent> =
            record.kills.iter().filter(|k| k.round == index).collect();
        round_kills.sort_by_key(|k| k.kill_time_in_round);

        let kills: Vec<KillSummary> = round_kills
            .iter()
            .map(|k| {
                let (killer, killer_side) = resolve_name(record, &k.killer_puuid);
                let (victim, victim_side) = resolve_name(record, &k.victim_puuid);
                KillSummary {
                    time_in_round: k.kill_time_in_round,
                    killer,
                    killer_side,
                    victim,
                    victim_side,
                    weapon: k.weapon_name().to_string(),
                }
            })
            .collect();

        let plant = round.plant_events.as_ref().map(|p| PlantSummary {
            site: p.plant_site.clone(),
            player: p
                .planted_by
                .as_ref()
                .map(|r| resolve_name(record, &r.puuid).0)
                .unwrap_or_else(|| "Unknown".to_string()),
        });

        let defuse = round.defuse_events.as_ref().and_then(|d| {
            d.defused_by.as_ref().map(|r| DefuseSummary {
                player: resolve_name(record, &r.puuid).0,
            })
        });

        timeline.push(RoundTimeline {
            number: index + 1,
            winner,
            end_type: round.end_type.clone(),
            blue_score,
            red_score,
            first_blood: kills.first().cloned(),
            kills,
            plant,
            defuse,
        });
    }

    timeline
}

/// One page of a reconstructed timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePage {
    pub page: usize,
    pub total_pages: usize,
    pub rounds: Vec<RoundTimeline>,
    pub has_previous: bool,
    pub has_next: bool,
}

/// Total pages for a round count at the fixed page size.
///
/// An empty timeline still has one (empty) page so navigation stays
/// well-defined.
pub fn total_pages(round_count: usize) -> usize {
    round_count.div_ceil(ROUNDS_PER_PAGE).max(1)
}

/// Slice a page out of a reconstructed timeline.
///
/// The requested page clamps into `[1, total_pages]`; `has_previous` and
/// `has_next` are false at the respective boundaries.
pub fn paginate(rounds: &[RoundTimeline], requested: usize) -> TimelinePage {
    let total = total_pages(rounds.len());
    let page = requested.clamp(1, total);
    let start = (page - 1) * ROUNDS_PER_PAGE;
    let end = (start + ROUNDS_PER_PAGE).min(rounds.len());
    let slice = if start < rounds.len() {
        rounds[start..end].to_vec()
    } else {
        Vec::new()
    };

    TimelinePage {
        page,
        total_pages: total,
        rounds: slice,
        has_previous: page > 1,
        has_next: page < total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KillEvent, PlayerSnapshot, Roster, RoundRecord};

    fn kill(round: usize, time: u64, killer: &str, victim: &str) -> KillEvent {
        KillEvent {
            round,
            kill_time_in_round: time,
            killer_puuid: killer.to_string(),
            victim_puuid: victim.to_string(),
            damage_weapon_name: Some("Vandal".to_string()),
        }
    }

    fn round(winner: &str) -> RoundRecord {
        RoundRecord {
            winning_team: winner.to_string(),
            end_type: "Eliminated".to_string(),
            plant_events: None,
            defuse_events: None,
        }
    }

    fn named_player(puuid: &str, name: &str, team: &str) -> PlayerSnapshot {
        PlayerSnapshot {
            puuid: puuid.to_string(),
            name: name.to_string(),
            tag: "1".to_string(),
            team: team.to_string(),
            ..Default::default()
        }
    }

    fn match_with(rounds: Vec<RoundRecord>, kills: Vec<KillEvent>) -> MatchRecord {
        MatchRecord {
            rounds,
            kills,
            players: Roster {
                all_players: vec![
                    named_player("A", "Alice", "Blue"),
                    named_player("B", "Bob", "Red"),
                    named_player("C", "Cara", "Red"),
                    named_player("D", "Dan", "Blue"),
                ],
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_first_blood_after_time_sort() {
        // Raw order has (A→B, t=10) before (C→D, t=5); first blood must be C→D.
        let record = match_with(
            vec![round("Blue")],
            vec![kill(0, 10, "A", "B"), kill(0, 5, "C", "D")],
        );

        let timeline = reconstruct(&record);
        let fb = timeline[0].first_blood.as_ref().unwrap();
        assert_eq!(fb.killer, "Cara");
        assert_eq!(fb.victim, "Dan");
        assert_eq!(fb.time_in_round, 5);
    }

    #[test]
    fn test_kills_non_decreasing_by_time() {
        let record = match_with(
            vec![round("Blue"), round("Red")],
            vec![
                kill(0, 300, "A", "B"),
                kill(0, 100, "B", "A"),
                kill(0, 200, "C", "D"),
                kill(1, 50, "D", "C"),
                kill(1, 10, "A", "C"),
            ],
        );

        for rt in reconstruct(&record) {
            for pair in rt.kills.windows(2) {
                assert!(pair[0].time_in_round <= pair[1].time_in_round);
            }
        }
    }

    #[test]
    fn test_running_score() {
        let record = match_with(
            vec![round("Blue"), round("Blue"), round("Red")],
            vec![],
        );

        let timeline = reconstruct(&record);
        assert_eq!((timeline[0].blue_score, timeline[0].red_score), (1, 0));
        assert_eq!((timeline[1].blue_score, timeline[1].red_score), (2, 0));
        assert_eq!((timeline[2].blue_score, timeline[2].red_score), (2, 1));
    }

    #[test]
    fn test_unknown_winner_does_not_score() {
        let record = match_with(vec![round("???"), round("Red")], vec![]);
        let timeline = reconstruct(&record);
        assert_eq!(timeline[0].winner, None);
        assert_eq!((timeline[0].blue_score, timeline[0].red_score), (0, 0));
        assert_eq!((timeline[1].blue_score, timeline[1].red_score), (0, 1));
    }

    #[test]
    fn test_unknown_puuid_resolves_to_unknown() {
        let record = match_with(vec![round("Blue")], vec![kill(0, 1, "ghost", "A")]);
        let timeline = reconstruct(&record);
        let fb = timeline[0].first_blood.as_ref().unwrap();
        assert_eq!(fb.killer, "Unknown");
        assert_eq!(fb.victim, "Alice");
    }

    #[test]
    fn test_round_without_kills() {
        let record = match_with(vec![round("Blue")], vec![]);
        let timeline = reconstruct(&record);
        assert!(timeline[0].first_blood.is_none());
        assert!(timeline[0].kills.is_empty());
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0), 1);
        assert_eq!(total_pages(1), 1);
        assert_eq!(total_pages(3), 1);
        assert_eq!(total_pages(4), 2);
        assert_eq!(total_pages(24), 8);
        assert_eq!(total_pages(25), 9);
    }

    fn rounds(n: usize) -> Vec<RoundTimeline> {
        let record = match_with((0..n).map(|_| round("Blue")).collect(), vec![]);
        reconstruct(&record)
    }

    #[test]
    fn test_paginate_boundaries() {
        let timeline = rounds(7); // 3 pages

        let first = paginate(&timeline, 1);
        assert_eq!(first.total_pages, 3);
        assert!(!first.has_previous);
        assert!(first.has_next);
        assert_eq!(first.rounds.len(), 3);
        assert_eq!(first.rounds[0].number, 1);

        let last = paginate(&timeline, 3);
        assert!(last.has_previous);
        assert!(!last.has_next);
        assert_eq!(last.rounds.len(), 1);
        assert_eq!(last.rounds[0].number, 7);
    }

    #[test]
    fn test_paginate_clamps_out_of_range() {
        let timeline = rounds(7);

        let beyond = paginate(&timeline, 99);
        assert_eq!(beyond.page, 3);
        assert!(!beyond.has_next);

        let zero = paginate(&timeline, 0);
        assert_eq!(zero.page, 1);
        assert!(!zero.has_previous);
    }

    #[test]
    fn test_paginate_empty_timeline() {
        let page = paginate(&[], 1);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert!(page.rounds.is_empty());
        assert!(!page.has_previous);
        assert!(!page.has_next);
    }
}
