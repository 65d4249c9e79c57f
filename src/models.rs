use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Reads a possibly missing, null or negative count and clamps it to zero.
fn clamp_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(match raw {
        Some(value) if value.is_finite() && value > 0.0 => value.trunc() as u64,
        _ => 0,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSkill {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "clamp_count")]
    pub solved: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicCategory {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub topics: Vec<TopicSkill>,
}

/// One point-in-time sync result from the external stats source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStatsSnapshot {
    #[serde(default, deserialize_with = "clamp_count")]
    pub total_solved: u64,
    #[serde(default)]
    pub topic_skills: Vec<TopicCategory>,
}

impl RawStatsSnapshot {
    /// All topics across every category, in source order.
    pub fn topics(&self) -> impl Iterator<Item = &TopicSkill> {
        self.topic_skills.iter().flat_map(|category| category.topics.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationPoint {
    pub label: String,
    pub score: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarPoint {
    pub subject: String,
    pub value: u64,
    pub scale_max: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedStats {
    pub topics_learned: usize,
    pub total_solved: u64,
    pub total_attempted: u64,
    pub accuracy_rate: f64,
    pub weak_areas: Vec<String>,
    pub streak_days: u32,
    pub reputation_history: Vec<ReputationPoint>,
    pub skill_radar: Vec<RadarPoint>,
}

impl DerivedStats {
    /// Fields synthesized from solve counts rather than measured.
    pub fn estimated_fields() -> &'static [&'static str] {
        &[
            "accuracyRate",
            "totalAttempted",
            "streakDays",
            "reputationHistory",
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolvedProblem {
    pub topic: String,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub style_score: f64,
    pub posted_at: DateTime<Utc>,
}

/// Activity used by badge rules. Posts may arrive in any order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityHistory {
    #[serde(default)]
    pub solved_problems: Vec<SolvedProblem>,
    #[serde(default)]
    pub posts: Vec<Post>,
}

/// Everything a badge rule may look at. Both halves must come from the
/// same sync so rules never see a mix of two snapshots.
#[derive(Debug, Clone, Copy)]
pub struct ActivityContext<'a> {
    pub user_stats: &'a DerivedStats,
    pub activity: &'a ActivityHistory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reflection {
    pub ai_question: String,
    pub user_answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolvedProblemHistoryEntry {
    pub id: String,
    pub topic_name: String,
    pub problem_title: String,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub reflections: Vec<Reflection>,
}
