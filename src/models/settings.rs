use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest player name accepted by the settings form.
pub const MAX_PLAYER_NAME_CHARS: usize = 24;

/// Name recorded on the leaderboard when the player left theirs empty.
pub const ANONYMOUS_PLAYER: &str = "Anonymous";

/// Colour theme key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Neon,
    Dark,
    Retro,
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "neon" => Ok(Theme::Neon),
            "dark" => Ok(Theme::Dark),
            "retro" => Ok(Theme::Retro),
            other => Err(format!("unknown theme: {other}")),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Theme::Neon => "neon",
            Theme::Dark => "dark",
            Theme::Retro => "retro",
        };
        f.write_str(name)
    }
}

/// User preferences persisted under the `game-settings` key.
///
/// The struct-level `#[serde(default)]` gives the shallow merge the store
/// relies on: fields present in the stored JSON win, missing ones come from
/// [`Settings::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub player_name: String,

    /// Master volume in `[0, 1]`
    pub master_volume: f32,

    pub music_on: bool,

    pub sfx_on: bool,

    /// Avatar as a `data:` URL. Persisted as an empty string when unset.
    #[serde(
        rename = "avatarDataUrl",
        serialize_with = "serialize_avatar",
        deserialize_with = "deserialize_avatar"
    )]
    pub avatar: Option<String>,

    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            player_name: "Player".to_string(),
            master_volume: 0.5,
            music_on: true,
            sfx_on: true,
            avatar: None,
            theme: Theme::Neon,
        }
    }
}

impl Settings {
    /// Copy with the name truncated to [`MAX_PLAYER_NAME_CHARS`] and the
    /// volume clamped into `[0, 1]`.
    pub fn normalized(&self) -> Self {
        let mut copy = self.clone();
        copy.player_name = copy.player_name.chars().take(MAX_PLAYER_NAME_CHARS).collect();
        copy.master_volume = if copy.master_volume.is_nan() {
            Settings::default().master_volume
        } else {
            copy.master_volume.clamp(0.0, 1.0)
        };
        copy
    }

    /// Name written to the leaderboard.
    pub fn leaderboard_name(&self) -> &str {
        leaderboard_name(&self.player_name)
    }

    /// Encoded size of the avatar in bytes, 0 when unset.
    pub fn avatar_len(&self) -> usize {
        self.avatar.as_ref().map_or(0, String::len)
    }
}

/// `name` trimmed, or [`ANONYMOUS_PLAYER`] when nothing is left.
pub fn leaderboard_name(name: &str) -> &str {
    match name.trim() {
        "" => ANONYMOUS_PLAYER,
        trimmed => trimmed,
    }
}

fn serialize_avatar<S>(avatar: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(avatar.as_deref().unwrap_or_default())
}

fn deserialize_avatar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()))
}
