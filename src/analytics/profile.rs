//! Profile stat aggregation.
//!
//! Reduces a window of raw matches into "top category" picks (agent, map,
//! weapon, duo partner) and cumulative performance numbers for one target
//! identity. Pure and deterministic: category ties break by first-encounter
//! order during iteration.

use serde::{Deserialize, Serialize};

use crate::models::MatchRecord;

/// A category value with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: u32,
}

/// Insertion-ordered frequency map.
///
/// Keys keep the order they were first seen, which gives `top()` a stable,
/// deterministic tie-break. Category sizes here are tiny (agents, maps,
/// weapons over ≤20 matches), so linear scans are fine.
#[derive(Debug, Default)]
struct FrequencyCounter {
    items: Vec<(String, u32)>,
}

impl FrequencyCounter {
    fn bump(&mut self, key: &str) {
        match self.items.iter_mut().find(|(k, _)| k == key) {
            Some((_, count)) => *count += 1,
            None => self.items.push((key.to_string(), 1)),
        }
    }

    /// Highest-count entry; first-encountered wins ties. Empty → `None`.
    fn top(&self) -> Option<CategoryCount> {
        let mut best: Option<&(String, u32)> = None;
        for item in &self.items {
            if best.map(|(_, c)| item.1 > *c).unwrap_or(true) {
                best = Some(item);
            }
        }
        best.map(|(name, count)| CategoryCount {
            name: name.clone(),
            count: *count,
        })
    }
}

/// Aggregated profile summary over a match window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub top_agent: Option<CategoryCount>,
    pub top_map: Option<CategoryCount>,
    pub top_weapon: Option<CategoryCount>,
    pub top_duo: Option<CategoryCount>,

    /// Kills per death; equals total kills when deaths are zero.
    pub kda: f64,

    /// Headshot percentage, rounded; zero when no shots landed.
    pub headshot_pct: u32,

    pub total_kills: u32,

    /// Matches in the window where the identity appeared.
    pub matches_played: u32,

    /// Win percentage over the matches played, rounded.
    pub win_rate_pct: u32,
}

/// Aggregate top-category and cumulative stats for one identity.
///
/// Matches missing their roster are skipped; maps still count only for
/// matches where the identity appears so every category describes the same
/// match set. Weapon attribution counts only kill events whose killer is
/// the target's in-match player id.
pub fn summarize(matches: &[MatchRecord], name: &str, tag: &str) -> ProfileSummary {
    let mut agents = FrequencyCounter::default();
    let mut maps = FrequencyCounter::default();
    let mut weapons = FrequencyCounter::default();
    let mut duos = FrequencyCounter::default();

    let mut kills = 0u32;
    let mut deaths = 0u32;
    let mut headshots = 0u32;
    let mut total_shots = 0u32;
    let mut played = 0u32;
    let mut wins = 0u32;

    for record in matches {
        let Some(player) = record.find_player(name, tag) else {
            continue;
        };
        played += 1;

        kills += player.stats.kills;
        deaths += player.stats.deaths;
        headshots += player.stats.headshots;
        total_shots += player.stats.total_shots();

        if !player.character.is_empty() {
            agents.bump(&player.character);
        }
        if let Some(map) = record.metadata.as_ref().map(|m| m.map.as_str()) {
            if !map.is_empty() {
                maps.bump(map);
            }
        }
        if let Some(side) = player.side() {
            if record.side_won(side) {
                wins += 1;
            }
        }

        for kill in record.kills.iter().filter(|k| k.killer_puuid == player.puuid) {
            weapons.bump(kill.weapon_name());
        }

        if let Some(party_id) = player.party_id.as_deref() {
            for teammate in record.players.all_players.iter().filter(|p| {
                p.team == player.team
                    && p.puuid != player.puuid
                    && p.party_id.as_deref() == Some(party_id)
            }) {
                duos.bump(&format!("{}#{}", teammate.name, teammate.tag));
            }
        }
    }

    let kda = if deaths > 0 {
        kills as f64 / deaths as f64
    } else {
        kills as f64
    };
    let headshot_pct = if total_shots > 0 {
        (headshots as f64 / total_shots as f64 * 100.0).round() as u32
    } else {
        0
    };
    let win_rate_pct = if played > 0 {
        (wins as f64 / played as f64 * 100.0).round() as u32
    } else {
        0
    };

    ProfileSummary {
        top_agent: agents.top(),
        top_map: maps.top(),
        top_weapon: weapons.top(),
        top_duo: duos.top(),
        kda,
        headshot_pct,
        total_kills: kills,
        matches_played: played,
        win_rate_pct,
    }
}

/// Per-agent performance over a match window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentBreakdown {
    pub agent: String,
    pub played: u32,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub wins: u32,
}

/// Per-agent stats for one identity, sorted descending by matches played.
/// Ties keep first-encounter order (stable sort).
pub fn agent_breakdown(matches: &[MatchRecord], name: &str, tag: &str) -> Vec<AgentBreakdown> {
    let mut breakdown: Vec<AgentBreakdown> = Vec::new();

    for record in matches {
        let Some(player) = record.find_player(name, tag) else {
            continue;
        };
        if player.character.is_empty() {
            continue;
        }

        let won = player
            .side()
            .map(|side| record.side_won(side))
            .unwrap_or(false);

        let stats = match breakdown.iter_mut().find(|b| b.agent == player.character) {
            Some(existing) => existing,
            None => {
                breakdown.push(AgentBreakdown {
                    agent: player.character.clone(),
                    ..Default::default()
                });
                breakdown.last_mut().unwrap()
            }
        };

        stats.played += 1;
        stats.kills += player.stats.kills;
        stats.deaths += player.stats.deaths;
        stats.assists += player.stats.assists;
        if won {
            stats.wins += 1;
        }
    }

    breakdown.sort_by(|a, b| b.played.cmp(&a.played));
    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        KillEvent, MatchMetadata, PlayerSnapshot, PlayerStats, Roster, TeamResult, TeamScores,
    };

    fn player(puuid: &str, name: &str, agent: &str, team: &str, party: &str) -> PlayerSnapshot {
        PlayerSnapshot {
            puuid: puuid.to_string(),
            name: name.to_string(),
            tag: "1".to_string(),
            team: team.to_string(),
            character: agent.to_string(),
            party_id: Some(party.to_string()),
            stats: PlayerStats::default(),
        }
    }

    fn base_match(map: &str) -> MatchRecord {
        MatchRecord {
            metadata: Some(MatchMetadata {
                matchid: "m".to_string(),
                map: map.to_string(),
                mode: "Competitive".to_string(),
                game_start: 0,
            }),
            teams: Some(TeamScores {
                red: Some(TeamResult {
                    has_won: false,
                    rounds_won: 5,
                }),
                blue: Some(TeamResult {
                    has_won: true,
                    rounds_won: 13,
                }),
            }),
            ..Default::default()
        }
    }

    fn kill(killer: &str, weapon: Option<&str>) -> KillEvent {
        KillEvent {
            killer_puuid: killer.to_string(),
            victim_puuid: "v".to_string(),
            damage_weapon_name: weapon.map(|w| w.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_window() {
        let summary = summarize(&[], "Brim", "1");
        assert_eq!(summary.top_agent, None);
        assert_eq!(summary.top_map, None);
        assert_eq!(summary.matches_played, 0);
        assert_eq!(summary.kda, 0.0);
        assert_eq!(summary.headshot_pct, 0);
    }

    #[test]
    fn test_kda_zero_deaths_guard() {
        let mut m = base_match("Ascent");
        let mut p = player("me", "Brim", "Jett", "Blue", "pt");
        p.stats.kills = 7;
        p.stats.deaths = 0;
        m.players = Roster {
            all_players: vec![p],
        };

        let summary = summarize(&[m], "Brim", "1");
        assert_eq!(summary.kda, 7.0);
    }

    #[test]
    fn test_headshot_pct() {
        let mut m = base_match("Ascent");
        let mut p = player("me", "Brim", "Jett", "Blue", "pt");
        p.stats.headshots = 1;
        p.stats.bodyshots = 2;
        p.stats.legshots = 0;
        m.players = Roster {
            all_players: vec![p],
        };

        let summary = summarize(&[m], "Brim", "1");
        // 1/3 → 33%
        assert_eq!(summary.headshot_pct, 33);
    }

    #[test]
    fn test_top_category_tie_break_first_encountered() {
        let mut m1 = base_match("Ascent");
        m1.players = Roster {
            all_players: vec![player("me", "Brim", "Jett", "Blue", "pt")],
        };
        let mut m2 = base_match("Bind");
        m2.players = Roster {
            all_players: vec![player("me", "Brim", "Sova", "Blue", "pt")],
        };

        // Jett and Sova each once; Jett seen first.
        let summary = summarize(&[m1, m2], "Brim", "1");
        assert_eq!(summary.top_agent.unwrap().name, "Jett");
    }

    #[test]
    fn test_weapon_attribution_only_own_kills() {
        let mut m = base_match("Ascent");
        m.players = Roster {
            all_players: vec![
                player("me", "Brim", "Jett", "Blue", "pt"),
                player("other", "Foe", "Sova", "Red", "pt2"),
            ],
        };
        m.kills = vec![
            kill("me", Some("Vandal")),
            kill("other", Some("Operator")),
            kill("me", None), // → Ability
        ];

        let summary = summarize(&[m], "Brim", "1");
        let top = summary.top_weapon.unwrap();
        // Vandal and Ability tie at 1; Vandal encountered first.
        assert_eq!(top.name, "Vandal");
    }

    #[test]
    fn test_top_duo_same_party_same_team_only() {
        let mut m = base_match("Ascent");
        m.players = Roster {
            all_players: vec![
                player("me", "Brim", "Jett", "Blue", "party-a"),
                player("friend", "Duo", "Sova", "Blue", "party-a"),
                player("stranger", "Solo", "Omen", "Blue", "party-b"),
                player("enemy", "Foe", "Raze", "Red", "party-a"),
            ],
        };

        let summary = summarize(&[m], "Brim", "1");
        assert_eq!(summary.top_duo.unwrap().name, "Duo#1");
    }

    #[test]
    fn test_map_counts_only_when_identity_appears() {
        let m1 = base_match("Ascent"); // roster empty, identity absent
        let mut m2 = base_match("Bind");
        m2.players = Roster {
            all_players: vec![player("me", "Brim", "Jett", "Blue", "pt")],
        };

        let summary = summarize(&[m1, m2], "Brim", "1");
        assert_eq!(summary.matches_played, 1);
        assert_eq!(summary.top_map.unwrap().name, "Bind");
    }

    #[test]
    fn test_agent_breakdown_sorted_by_played() {
        let mut matches = Vec::new();
        for agent in ["Jett", "Sova", "Jett"] {
            let mut m = base_match("Ascent");
            let mut p = player("me", "Brim", agent, "Blue", "pt");
            p.stats.kills = 10;
            m.players = Roster {
                all_players: vec![p],
            };
            matches.push(m);
        }

        let breakdown = agent_breakdown(&matches, "Brim", "1");
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].agent, "Jett");
        assert_eq!(breakdown[0].played, 2);
        assert_eq!(breakdown[0].kills, 20);
        assert_eq!(breakdown[0].wins, 2);
        assert_eq!(breakdown[1].agent, "Sova");
    }
}
