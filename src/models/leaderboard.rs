use super::round::GameMode;
use serde::{Deserialize, Serialize};

/// Maximum number of entries kept across all modes.
pub const MAX_LEADERBOARD_ENTRIES: usize = 100;

/// One recorded score.
///
/// Created when a session ends with a positive score; never edited afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub mode: GameMode,
    pub player_name: String,
    pub score: u32,
    /// Creation time in milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl LeaderboardEntry {
    /// Star rating shown next to the entry: one star per 100 points, at most 5.
    pub fn stars(&self) -> u32 {
        (self.score / 100).min(5)
    }
}

/// Display label for a 1-based rank; the podium gets medals.
pub fn rank_label(rank: usize) -> String {
    match rank {
        1 => "🥇".to_string(),
        2 => "🥈".to_string(),
        3 => "🥉".to_string(),
        n => n.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(score: u32) -> LeaderboardEntry {
        LeaderboardEntry {
            mode: GameMode::Easy,
            player_name: "Ada".to_string(),
            score,
            timestamp: 0,
        }
    }

    #[test]
    fn test_stars() {
        assert_eq!(entry(0).stars(), 0);
        assert_eq!(entry(250).stars(), 2);
        assert_eq!(entry(900).stars(), 5);
    }

    #[test]
    fn test_rank_label() {
        assert_eq!(rank_label(1), "🥇");
        assert_eq!(rank_label(4), "4");
    }

    #[test]
    fn test_entry_json_shape() {
        let json = serde_json::to_value(entry(100)).unwrap();
        assert_eq!(json["mode"], "easy");
        assert_eq!(json["playerName"], "Ada");
        assert_eq!(json["score"], 100);
    }
}
