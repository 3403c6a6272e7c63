use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

static CHALLENGE_DIR: Dir = include_dir!("assets/challenges");

/// Difficulty drives the attempt time limit. Anything the store hands us
/// that we do not recognize falls back to a generous default.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    #[serde(other)]
    Unknown,
}

impl Difficulty {
    /// Time limit for one attempt, in seconds.
    pub fn time_limit_secs(&self) -> u32 {
        match self {
            Difficulty::Easy => 1200,
            Difficulty::Medium => 900,
            Difficulty::Hard => 600,
            Difficulty::Unknown => 1800,
        }
    }
}

impl FromStr for Difficulty {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "medium" => Difficulty::Medium,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Unknown,
        })
    }
}

/// A code snippet to type against, immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub title: String,
    pub language: String,
    pub difficulty: Difficulty,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Challenge {
    pub fn time_limit_secs(&self) -> u32 {
        self.difficulty.time_limit_secs()
    }
}

/// The challenge set shipped with the binary, used to seed an empty store.
pub fn seed_challenges() -> Vec<Challenge> {
    let mut challenges = Vec::new();
    for file in CHALLENGE_DIR.files() {
        let contents = file
            .contents_utf8()
            .expect("embedded challenge file is not utf-8");
        let mut parsed: Vec<Challenge> =
            serde_json::from_str(contents).expect("embedded challenge file is not valid json");
        challenges.append(&mut parsed);
    }
    challenges.sort_by(|a, b| a.id.cmp(&b.id));
    challenges
}
