//! Upstream match data models.
//!
//! These structs mirror the JSON shape returned by the match-history API:
//! match metadata, team results, a round list, a flat kill-event array
//! tagged with round indices, and the full player roster with cumulative
//! per-player stats. Matches are ephemeral: fetched, processed, discarded.
//!
//! Sub-objects the upstream sometimes omits are `Option` or defaulted so a
//! single malformed record never aborts processing of its siblings.

use chrono::{NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Team side within a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Blue,
    Red,
}

impl Side {
    /// Parse a side from the upstream's free-form team string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "blue" => Some(Side::Blue),
            "red" => Some(Side::Red),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Blue => write!(f, "Blue"),
            Side::Red => write!(f, "Red"),
        }
    }
}

/// One raw match as returned by the upstream provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchRecord {
    pub metadata: Option<MatchMetadata>,

    #[serde(default)]
    pub players: Roster,

    pub teams: Option<TeamScores>,

    #[serde(default)]
    pub rounds: Vec<RoundRecord>,

    /// Flat kill array for the whole match, tagged with round indices.
    /// Upstream order is NOT guaranteed chronological.
    #[serde(default)]
    pub kills: Vec<KillEvent>,
}

impl MatchRecord {
    /// Find a player in the roster by name and tag (case-insensitive).
    pub fn find_player(&self, name: &str, tag: &str) -> Option<&PlayerSnapshot> {
        self.players.all_players.iter().find(|p| {
            p.name.eq_ignore_ascii_case(name) && p.tag.eq_ignore_ascii_case(tag)
        })
    }

    /// Find a player in the roster by puuid.
    pub fn player_by_puuid(&self, puuid: &str) -> Option<&PlayerSnapshot> {
        self.players.all_players.iter().find(|p| p.puuid == puuid)
    }

    /// Whether the given side won the match.
    pub fn side_won(&self, side: Side) -> bool {
        self.teams
            .as_ref()
            .and_then(|t| t.result(side))
            .map(|r| r.has_won)
            .unwrap_or(false)
    }

    /// Calendar date (UTC) the match started on, when metadata is present.
    pub fn played_on(&self) -> Option<NaiveDate> {
        let start = self.metadata.as_ref()?.game_start;
        Utc.timestamp_opt(start, 0).single().map(|dt| dt.date_naive())
    }
}

/// Match-level metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchMetadata {
    #[serde(default)]
    pub matchid: String,

    #[serde(default)]
    pub map: String,

    #[serde(default)]
    pub mode: String,

    /// Match start as a unix timestamp (seconds).
    #[serde(default)]
    pub game_start: i64,
}

/// Player roster wrapper, matching the upstream envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub all_players: Vec<PlayerSnapshot>,
}

/// One player's state within a single match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    #[serde(default)]
    pub puuid: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub tag: String,

    /// Team string as reported upstream ("Blue"/"Red").
    #[serde(default)]
    pub team: String,

    /// Agent played this match.
    #[serde(default)]
    pub character: String,

    /// Party grouping id; players sharing one queued together.
    pub party_id: Option<String>,

    #[serde(default)]
    pub stats: PlayerStats,
}

impl PlayerSnapshot {
    pub fn side(&self) -> Option<Side> {
        Side::parse(&self.team)
    }
}

/// Cumulative per-player stats for one match.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PlayerStats {
    #[serde(default)]
    pub kills: u32,
    #[serde(default)]
    pub deaths: u32,
    #[serde(default)]
    pub assists: u32,
    #[serde(default)]
    pub headshots: u32,
    #[serde(default)]
    pub bodyshots: u32,
    #[serde(default)]
    pub legshots: u32,
}

impl PlayerStats {
    pub fn total_shots(&self) -> u32 {
        self.headshots + self.bodyshots + self.legshots
    }
}

/// Per-team results for a match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamScores {
    pub red: Option<TeamResult>,
    pub blue: Option<TeamResult>,
}

impl TeamScores {
    pub fn result(&self, side: Side) -> Option<&TeamResult> {
        match side {
            Side::Red => self.red.as_ref(),
            Side::Blue => self.blue.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TeamResult {
    #[serde(default)]
    pub has_won: bool,
    #[serde(default)]
    pub rounds_won: u32,
}

/// One round within a match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Winning side string as reported upstream.
    #[serde(default)]
    pub winning_team: String,

    /// How the round ended ("Eliminated", "Bomb defused", ...).
    #[serde(default)]
    pub end_type: String,

    pub plant_events: Option<PlantEvents>,

    pub defuse_events: Option<DefuseEvents>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlantEvents {
    pub plant_site: Option<String>,
    pub planted_by: Option<PlayerRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefuseEvents {
    pub defused_by: Option<PlayerRef>,
}

/// Minimal player reference inside round sub-objects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerRef {
    #[serde(default)]
    pub puuid: String,
}

/// One kill event from the match-wide kill array.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KillEvent {
    /// Zero-based round index this kill belongs to.
    #[serde(default)]
    pub round: usize,

    /// Milliseconds into the round.
    #[serde(default)]
    pub kill_time_in_round: u64,

    #[serde(default)]
    pub killer_puuid: String,

    #[serde(default)]
    pub victim_puuid: String,

    pub damage_weapon_name: Option<String>,
}

impl KillEvent {
    /// Weapon label for display and frequency counting.
    ///
    /// Missing weapon names and the upstream's "Ultimate" marker both
    /// normalize to "Ability".
    pub fn weapon_name(&self) -> &str {
        match self.damage_weapon_name.as_deref() {
            None | Some("Ultimate") => "Ability",
            Some(w) => w,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_parse() {
        assert_eq!(Side::parse("Blue"), Some(Side::Blue));
        assert_eq!(Side::parse("RED"), Some(Side::Red));
        assert_eq!(Side::parse("neutral"), None);
    }

    #[test]
    fn test_weapon_name_normalization() {
        let mut kill = KillEvent::default();
        assert_eq!(kill.weapon_name(), "Ability");

        kill.damage_weapon_name = Some("Ultimate".to_string());
        assert_eq!(kill.weapon_name(), "Ability");

        kill.damage_weapon_name = Some("Vandal".to_string());
        assert_eq!(kill.weapon_name(), "Vandal");
    }

    #[test]
    fn test_find_player_case_insensitive() {
        let record = MatchRecord {
            players: Roster {
                all_players: vec![PlayerSnapshot {
                    puuid: "p1".to_string(),
                    name: "Brim".to_string(),
                    tag: "1234".to_string(),
                    ..Default::default()
                }],
            },
            ..Default::default()
        };

        assert!(record.find_player("brim", "1234").is_some());
        assert!(record.find_player("BRIM", "1234").is_some());
        assert!(record.find_player("brim", "9999").is_none());
    }

    #[test]
    fn test_played_on() {
        let record = MatchRecord {
            metadata: Some(MatchMetadata {
                // 2025-06-15T12:00:00Z
                game_start: 1749988800,
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(
            record.played_on(),
            Some(chrono::NaiveDate::from_ymd_opt(2025, 6, 15).unwrap())
        );

        let empty = MatchRecord::default();
        assert_eq!(empty.played_on(), None);
    }

    #[test]
    fn test_deserialize_tolerates_missing_sections() {
        // Only metadata present; rounds/kills/players absent.
        let json = r#"{"metadata":{"matchid":"m1","map":"Ascent","mode":"Competitive","game_start":100}}"#;
        let record: MatchRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.metadata.as_ref().unwrap().map, "Ascent");
        assert!(record.rounds.is_empty());
        assert!(record.kills.is_empty());
        assert!(record.players.all_players.is_empty());
        assert!(record.teams.is_none());
    }

    #[test]
    fn test_side_won() {
        let record = MatchRecord {
            teams: Some(TeamScores {
                red: Some(TeamResult {
                    has_won: true,
                    rounds_won: 13,
                }),
                blue: Some(TeamResult {
                    has_won: false,
                    rounds_won: 7,
                }),
            }),
            ..Default::default()
        };

        assert!(record.side_won(Side::Red));
        assert!(!record.side_won(Side::Blue));
        assert!(!MatchRecord::default().side_won(Side::Red));
    }
}
