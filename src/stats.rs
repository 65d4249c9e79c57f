//! Dashboard statistics derived from a raw telemetry snapshot.
//!
//! Several outputs are heuristics standing in for data the stats source does
//! not provide (pass/fail counts, attempt counts, a streak feed, reputation
//! history). They are kept behind the constants below and listed by
//! [`DerivedStats::estimated_fields`] so presenters can label them.

use tracing::debug;

use crate::models::{DerivedStats, RadarPoint, RawStatsSnapshot, ReputationPoint};

pub const RADAR_AXES: usize = 6;
pub const RADAR_SCALE_FLOOR: u64 = 150;
pub const WEAK_AREA_COUNT: usize = 2;

/// Accuracy shown before anything has been solved.
pub const DEFAULT_ACCURACY: f64 = 78.0;
pub const ACCURACY_BASE: f64 = 80.0;
pub const ACCURACY_BONUS_CAP: f64 = 15.0;
pub const SOLVES_PER_ACCURACY_POINT: f64 = 50.0;

pub const ATTEMPT_RATIO: f64 = 1.15;

/// Estimate only: the real streak comes from a feed this source lacks.
pub const PLACEHOLDER_STREAK_DAYS: u32 = 7;

pub const REPUTATION_POINTS: u64 = 5;
pub const REPUTATION_STEP_FLOOR: u64 = 5;

/// Derives display-ready statistics. `None` means nothing has synced yet.
pub fn derive(snapshot: Option<&RawStatsSnapshot>) -> Option<DerivedStats> {
    let snapshot = snapshot?;
    let total_solved = snapshot.total_solved;
    let topics: Vec<_> = snapshot.topics().collect();

    let scale_max = topics
        .iter()
        .map(|topic| topic.solved)
        .fold(RADAR_SCALE_FLOOR, u64::max);
    let skill_radar = topics
        .iter()
        .take(RADAR_AXES)
        .map(|topic| RadarPoint {
            subject: topic.name.clone(),
            value: topic.solved,
            scale_max,
        })
        .collect();

    // sort_by_key is stable, so ties keep source order.
    let mut ranked = topics.clone();
    ranked.sort_by_key(|topic| topic.solved);
    let weak_areas = ranked
        .iter()
        .take(WEAK_AREA_COUNT)
        .map(|topic| topic.name.clone())
        .collect();

    let stats = DerivedStats {
        topics_learned: topics.len(),
        total_solved,
        total_attempted: estimate_attempted(total_solved),
        accuracy_rate: estimate_accuracy(total_solved),
        weak_areas,
        streak_days: PLACEHOLDER_STREAK_DAYS,
        reputation_history: reputation_trend(total_solved),
        skill_radar,
    };

    debug!(
        total_solved,
        topics = stats.topics_learned,
        scale_max,
        "derived dashboard stats"
    );
    Some(stats)
}

pub fn estimate_accuracy(total_solved: u64) -> f64 {
    if total_solved == 0 {
        return DEFAULT_ACCURACY;
    }
    let bonus = (total_solved as f64 / SOLVES_PER_ACCURACY_POINT).min(ACCURACY_BONUS_CAP);
    ACCURACY_BASE + bonus
}

pub fn estimate_attempted(total_solved: u64) -> u64 {
    let attempted = (total_solved as f64 * ATTEMPT_RATIO).round() as u64;
    attempted.max(total_solved)
}

/// Synthetic monthly trend `M1..M5`, linear in total solves.
pub fn reputation_trend(total_solved: u64) -> Vec<ReputationPoint> {
    let step = (total_solved / REPUTATION_POINTS).max(REPUTATION_STEP_FLOOR);
    (1..=REPUTATION_POINTS)
        .map(|month| ReputationPoint {
            label: format!("M{month}"),
            score: step.saturating_mul(month),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TopicCategory, TopicSkill};

    fn topic(name: &str, solved: u64) -> TopicSkill {
        TopicSkill {
            name: name.to_string(),
            solved,
        }
    }

    fn snapshot(total_solved: u64, categories: Vec<Vec<TopicSkill>>) -> RawStatsSnapshot {
        RawStatsSnapshot {
            total_solved,
            topic_skills: categories
                .into_iter()
                .enumerate()
                .map(|(idx, topics)| TopicCategory {
                    category: format!("category-{idx}"),
                    topics,
                })
                .collect(),
        }
    }

    #[test]
    fn absent_snapshot_yields_nothing() {
        assert!(derive(None).is_none());
    }

    #[test]
    fn arrays_and_dp_scenario() {
        let input = snapshot(100, vec![vec![topic("Arrays", 80), topic("DP", 5)]]);
        let stats = derive(Some(&input)).unwrap();

        assert_eq!(stats.weak_areas, vec!["DP".to_string(), "Arrays".to_string()]);
        assert_eq!(stats.skill_radar.len(), 2);
        assert!(stats.skill_radar.iter().all(|point| point.scale_max == 150));
        assert_eq!(stats.skill_radar[0].subject, "Arrays");
        assert_eq!(stats.skill_radar[0].value, 80);
        assert_eq!(stats.total_attempted, 115);
        assert!((stats.accuracy_rate - 82.0).abs() < 1e-9);
    }

    #[test]
    fn zero_solves_use_fixed_defaults() {
        let input = snapshot(0, vec![vec![topic("Arrays", 0)]]);
        let stats = derive(Some(&input)).unwrap();

        assert_eq!(stats.accuracy_rate, 78.0);
        assert_eq!(stats.total_attempted, 0);
        let scores: Vec<u64> = stats.reputation_history.iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![5, 10, 15, 20, 25]);
    }

    #[test]
    fn accuracy_bonus_is_capped() {
        assert!((estimate_accuracy(2_000) - 95.0).abs() < 1e-9);
        assert!((estimate_accuracy(25) - 80.5).abs() < 1e-9);
    }

    #[test]
    fn attempted_never_below_solved() {
        assert_eq!(estimate_attempted(1), 1);
        assert_eq!(estimate_attempted(20), 23);
        assert_eq!(estimate_attempted(342), 393);
    }

    #[test]
    fn reputation_has_five_non_decreasing_points() {
        for total in [0, 4, 24, 25, 342, 10_000] {
            let trend = reputation_trend(total);
            let step = (total / 5).max(5);
            assert_eq!(trend.len(), 5);
            assert!(trend.windows(2).all(|pair| pair[0].score <= pair[1].score));
            assert_eq!(trend[4].score, 5 * step);
            assert_eq!(trend[0].label, "M1");
            assert_eq!(trend[4].label, "M5");
        }
    }

    #[test]
    fn topics_learned_counts_flattened_topics() {
        let input = snapshot(
            30,
            vec![
                vec![topic("Arrays", 10), topic("Strings", 4)],
                vec![topic("Graphs", 9)],
                vec![],
            ],
        );
        let stats = derive(Some(&input)).unwrap();
        assert_eq!(stats.topics_learned, 3);
    }

    #[test]
    fn radar_takes_first_six_with_shared_scale() {
        let topics: Vec<TopicSkill> = (0..8)
            .map(|idx| topic(&format!("T{idx}"), idx * 40))
            .collect();
        let input = snapshot(500, vec![topics]);
        let stats = derive(Some(&input)).unwrap();

        assert_eq!(stats.skill_radar.len(), 6);
        // T7 is not plotted but still sets the scale.
        assert!(stats.skill_radar.iter().all(|point| point.scale_max == 280));
        assert!(stats
            .skill_radar
            .iter()
            .all(|point| point.value <= point.scale_max));
    }

    #[test]
    fn weak_areas_break_ties_by_source_order() {
        let input = snapshot(
            20,
            vec![
                vec![topic("Trees", 3), topic("Heaps", 1)],
                vec![topic("Tries", 1), topic("Greedy", 1)],
            ],
        );
        let stats = derive(Some(&input)).unwrap();
        assert_eq!(stats.weak_areas, vec!["Heaps".to_string(), "Tries".to_string()]);
    }

    #[test]
    fn weak_areas_shrink_with_few_topics() {
        let one = derive(Some(&snapshot(3, vec![vec![topic("Arrays", 3)]]))).unwrap();
        assert_eq!(one.weak_areas, vec!["Arrays".to_string()]);

        let none = derive(Some(&snapshot(3, vec![]))).unwrap();
        assert!(none.weak_areas.is_empty());
        assert!(none.skill_radar.is_empty());
        assert_eq!(none.topics_learned, 0);
    }

    #[test]
    fn derivation_is_repeatable() {
        let input = snapshot(
            342,
            vec![vec![topic("Arrays", 120), topic("Trees", 98), topic("DP", 65)]],
        );
        assert_eq!(derive(Some(&input)), derive(Some(&input)));
    }

    #[test]
    fn streak_is_the_placeholder() {
        let stats = derive(Some(&snapshot(50, vec![]))).unwrap();
        assert_eq!(stats.streak_days, PLACEHOLDER_STREAK_DAYS);
        assert!(DerivedStats::estimated_fields().contains(&"streakDays"));
    }
}
