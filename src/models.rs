use serde::Deserialize;
use std::fmt;

/// Country or region code from a Lichess profile, or the bucket for players without one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Flag {
    Code(String),
    Unknown,
}

impl Flag {
    pub fn as_str(&self) -> &str {
        match self {
            Flag::Code(code) => code,
            Flag::Unknown => "Unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Flag::Unknown)
    }
}

impl From<Option<String>> for Flag {
    fn from(code: Option<String>) -> Self {
        match code {
            Some(code) if !code.trim().is_empty() => Flag::Code(code),
            _ => Flag::Unknown,
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Games export (one JSON object per ndjson line) ---

#[derive(Deserialize, Debug, Clone)]
pub struct GameRecord {
    pub id: String,
    pub players: Players,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Players {
    pub white: Player,
    pub black: Player,
}

// NOTE: AI and anonymous players carry no `user` object.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Player {
    #[serde(default)]
    pub user: Option<LightUser>,
    #[serde(default)]
    pub rating: Option<u32>,
    #[serde(default)]
    pub flag: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LightUser {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub flag: Option<String>,
}

impl Player {
    /// Whether this side is the account `username`, ignoring case.
    pub fn is_user(&self, username: &str) -> bool {
        self.user.as_ref().is_some_and(|user| {
            user.name.eq_ignore_ascii_case(username)
                || user
                    .id
                    .as_deref()
                    .is_some_and(|id| id.eq_ignore_ascii_case(username))
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.name.as_str())
    }

    pub fn flag(&self) -> Flag {
        let code = self
            .user
            .as_ref()
            .and_then(|user| user.flag.clone())
            .or_else(|| self.flag.clone());
        Flag::from(code)
    }
}

// --- User profile ---

#[derive(Deserialize, Debug, Default)]
pub struct UserProfile {
    #[serde(default)]
    pub profile: Option<ProfileDetails>,
    #[serde(default)]
    pub count: Option<GameCounts>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ProfileDetails {
    #[serde(default)]
    pub flag: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct GameCounts {
    pub all: u64,
}
