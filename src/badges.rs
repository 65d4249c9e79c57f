//! Badge rules and their evaluation.
//!
//! The catalog is a table of [`BadgeRule`]s whose predicates are plain data,
//! so adding a badge means adding a row. Every rule is checked on its own: a
//! rule that cannot be evaluated is logged and counted as not earned.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::models::{ActivityContext, Difficulty};

pub const GRAPH_GOD: &str = "GRAPH_GOD";
pub const STREAK_MASTER: &str = "STREAK_MASTER";
pub const CLEAN_CODER: &str = "CLEAN_CODER";

/// Ids of earned badges. Ordered so output is stable between runs.
pub type EarnedBadgeSet = BTreeSet<String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RulePredicate {
    /// Solved problems matching both topic and difficulty.
    #[serde(rename_all = "camelCase")]
    SolvedCount {
        topic: String,
        difficulty: Difficulty,
        at_least: u64,
    },
    #[serde(rename_all = "camelCase")]
    StreakAtLeast { days: u32 },
    /// Mean style score of the latest `window` posts, strictly above
    /// `threshold`. Uses every post when fewer than `window` exist.
    #[serde(rename_all = "camelCase")]
    StyleAverageAbove { window: usize, threshold: f64 },
    #[serde(rename_all = "camelCase")]
    TotalSolvedAtLeast { count: u64 },
    #[serde(rename_all = "camelCase")]
    TopicsLearnedAtLeast { count: usize },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    #[error("unknown rule kind")]
    UnknownKind,
    #[error("rule topic is empty")]
    EmptyTopic,
    #[error("style window must be at least one post")]
    EmptyWindow,
    #[error("threshold is not a finite number")]
    InvalidThreshold,
    #[error("post style score is not a finite number: {0}")]
    InvalidStyleScore(f64),
}

impl RulePredicate {
    pub fn check(&self, context: &ActivityContext<'_>) -> Result<bool, RuleError> {
        match self {
            RulePredicate::SolvedCount {
                topic,
                difficulty,
                at_least,
            } => {
                let topic = topic.trim();
                if topic.is_empty() {
                    return Err(RuleError::EmptyTopic);
                }
                let solved = context
                    .activity
                    .solved_problems
                    .iter()
                    .filter(|problem| {
                        problem.difficulty == *difficulty
                            && problem.topic.trim().eq_ignore_ascii_case(topic)
                    })
                    .count() as u64;
                Ok(solved >= *at_least)
            }
            RulePredicate::StreakAtLeast { days } => Ok(context.user_stats.streak_days >= *days),
            RulePredicate::StyleAverageAbove { window, threshold } => {
                if *window == 0 {
                    return Err(RuleError::EmptyWindow);
                }
                if !threshold.is_finite() {
                    return Err(RuleError::InvalidThreshold);
                }
                // Newest first by timestamp; the stable sort keeps input order on ties.
                let mut by_recency: Vec<_> = context.activity.posts.iter().collect();
                by_recency.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
                let recent: Vec<f64> = by_recency
                    .into_iter()
                    .take(*window)
                    .map(|post| post.style_score)
                    .collect();
                if recent.is_empty() {
                    return Ok(false);
                }
                if let Some(bad) = recent.iter().find(|score| !score.is_finite()) {
                    return Err(RuleError::InvalidStyleScore(*bad));
                }
                let mean = recent.iter().sum::<f64>() / recent.len() as f64;
                Ok(mean > *threshold)
            }
            RulePredicate::TotalSolvedAtLeast { count } => {
                Ok(context.user_stats.total_solved >= *count)
            }
            RulePredicate::TopicsLearnedAtLeast { count } => {
                Ok(context.user_stats.topics_learned >= *count)
            }
            RulePredicate::Unknown => Err(RuleError::UnknownKind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeRule {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    pub rule: RulePredicate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BadgeOutcome {
    pub id: String,
    pub name: String,
    pub earned: bool,
    pub error: Option<RuleError>,
}

/// The badges shipped with the platform.
pub fn default_catalog() -> Vec<BadgeRule> {
    vec![
        BadgeRule {
            id: GRAPH_GOD.to_string(),
            name: "Graph God".to_string(),
            description: "Solved 50 Graph problems (Hard).".to_string(),
            icon: "fa-diagram-project".to_string(),
            color: "bg-purple-600".to_string(),
            rule: RulePredicate::SolvedCount {
                topic: "Graph".to_string(),
                difficulty: Difficulty::Hard,
                at_least: 50,
            },
        },
        BadgeRule {
            id: STREAK_MASTER.to_string(),
            name: "Streak Master".to_string(),
            description: "Achieved a 30-day continuous streak.".to_string(),
            icon: "fa-fire-flame-curved".to_string(),
            color: "bg-orange-500".to_string(),
            rule: RulePredicate::StreakAtLeast { days: 30 },
        },
        BadgeRule {
            id: CLEAN_CODER.to_string(),
            name: "Clean Coder".to_string(),
            description: "Maintained an average Style Score > 9.0 on last 20 posts.".to_string(),
            icon: "fa-sparkles".to_string(),
            color: "bg-emerald-500".to_string(),
            rule: RulePredicate::StyleAverageAbove {
                window: 20,
                threshold: 9.0,
            },
        },
    ]
}

/// Checks every rule in catalog order and reports each result.
pub fn evaluate_detailed(catalog: &[BadgeRule], context: &ActivityContext<'_>) -> Vec<BadgeOutcome> {
    catalog
        .iter()
        .map(|badge| {
            let (earned, error) = match badge.rule.check(context) {
                Ok(earned) => (earned, None),
                Err(err) => {
                    warn!(badge = %badge.id, error = %err, "badge rule failed, treating as not earned");
                    (false, Some(err))
                }
            };
            BadgeOutcome {
                id: badge.id.clone(),
                name: badge.name.clone(),
                earned,
                error,
            }
        })
        .collect()
}

pub fn evaluate(catalog: &[BadgeRule], context: &ActivityContext<'_>) -> EarnedBadgeSet {
    evaluate_detailed(catalog, context)
        .into_iter()
        .filter(|outcome| outcome.earned)
        .map(|outcome| outcome.id)
        .collect()
}

/// Badges in `current` that were not in `previous`.
pub fn newly_earned(previous: &EarnedBadgeSet, current: &EarnedBadgeSet) -> EarnedBadgeSet {
    current.difference(previous).cloned().collect()
}
