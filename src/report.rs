use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::badges::BadgeOutcome;
use crate::journal::GroupedJournal;
use crate::models::DerivedStats;

#[derive(Debug, Clone, PartialEq)]
pub struct TopicJournalSummary {
    pub topic: String,
    pub problems: usize,
    pub reflections: usize,
    pub latest: Option<DateTime<Utc>>,
}

pub fn summarize_journal(journal: &GroupedJournal) -> Vec<TopicJournalSummary> {
    journal
        .iter()
        .map(|group| TopicJournalSummary {
            topic: group.topic.clone(),
            problems: group.entries.len(),
            reflections: group.entries.iter().map(|e| e.reflections.len()).sum(),
            latest: group.entries.iter().map(|e| e.completed_at).max(),
        })
        .collect()
}

fn write_stats(output: &mut String, stats: &DerivedStats) {
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Topics learned: {}", stats.topics_learned);
    let _ = writeln!(output, "- Problems solved: {}", stats.total_solved);
    let _ = writeln!(output, "- Attempts (estimated): {}", stats.total_attempted);
    let _ = writeln!(output, "- Accuracy (estimated): {:.1}%", stats.accuracy_rate);
    let _ = writeln!(output, "- Streak (estimated): {} days", stats.streak_days);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weak Areas");
    if stats.weak_areas.is_empty() {
        let _ = writeln!(output, "No topics synced yet.");
    } else {
        for topic in stats.weak_areas.iter() {
            let _ = writeln!(output, "- {topic}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Skill Radar");
    if stats.skill_radar.is_empty() {
        let _ = writeln!(output, "No topics synced yet.");
    } else {
        for point in stats.skill_radar.iter() {
            let _ = writeln!(
                output,
                "- {}: {} / {}",
                point.subject, point.value, point.scale_max
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Reputation Trend (estimated)");
    let trend: Vec<String> = stats
        .reputation_history
        .iter()
        .map(|point| format!("{} {}", point.label, point.score))
        .collect();
    let _ = writeln!(output, "{}", trend.join(" -> "));
}

pub fn build_report(
    identity: &str,
    stats: Option<&DerivedStats>,
    badges: &[BadgeOutcome],
    journal: &GroupedJournal,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Learning Progress Dashboard");
    let _ = writeln!(output, "Generated for {identity}");
    let _ = writeln!(output);

    match stats {
        Some(stats) => write_stats(&mut output, stats),
        None => {
            let _ = writeln!(output, "## Overview");
            let _ = writeln!(output, "Stats have not been synced yet.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Trophy Case");
    if badges.is_empty() {
        let _ = writeln!(output, "No badges evaluated.");
    } else {
        for badge in badges.iter() {
            let state = if badge.earned { "earned" } else { "locked" };
            let _ = writeln!(output, "- {} ({})", badge.name, state);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Mastery Journal");
    if journal.is_empty() {
        let _ = writeln!(
            output,
            "Your journal is empty. Solve problems to see reflections here!"
        );
    } else {
        for summary in summarize_journal(journal).iter() {
            let latest = summary
                .latest
                .map(|at| at.date_naive().to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                output,
                "- {}: {} problems, {} reflections (latest {})",
                summary.topic, summary.problems, summary.reflections, latest
            );
        }

        for group in journal.iter() {
            let _ = writeln!(output);
            let _ = writeln!(output, "### {}", group.topic);
            for entry in group.entries.iter() {
                let _ = writeln!(
                    output,
                    "- {} ({})",
                    entry.problem_title,
                    entry.completed_at.date_naive()
                );
                for reflection in entry.reflections.iter() {
                    let _ = writeln!(output, "  - Q: {}", reflection.ai_question);
                    let _ = writeln!(output, "    A: {}", reflection.user_answer);
                }
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal;
    use crate::models::{
        RawStatsSnapshot, Reflection, SolvedProblemHistoryEntry, TopicCategory, TopicSkill,
    };
    use crate::stats;
    use chrono::TimeZone;

    fn sample_entry(id: &str, topic: &str, day: u32) -> SolvedProblemHistoryEntry {
        SolvedProblemHistoryEntry {
            id: id.to_string(),
            topic_name: topic.to_string(),
            problem_title: format!("Problem {id}"),
            completed_at: Utc.with_ymd_and_hms(2026, 1, day, 8, 0, 0).unwrap(),
            reflections: vec![Reflection {
                ai_question: "Why a heap?".to_string(),
                user_answer: "Need the smallest element repeatedly.".to_string(),
            }],
        }
    }

    #[test]
    fn summary_counts_reflections_and_latest() {
        let grouped = journal::group(vec![
            sample_entry("a", "Heaps", 20),
            sample_entry("b", "Heaps", 12),
            sample_entry("c", "Trees", 3),
        ]);
        let summaries = summarize_journal(&grouped);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].topic, "Heaps");
        assert_eq!(summaries[0].problems, 2);
        assert_eq!(summaries[0].reflections, 2);
        assert_eq!(
            summaries[0].latest,
            Some(Utc.with_ymd_and_hms(2026, 1, 20, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn report_handles_missing_stats_and_empty_journal() {
        let empty = journal::group(Vec::<SolvedProblemHistoryEntry>::new());
        let report = build_report("nobody", None, &[], &empty);
        assert!(report.contains("Stats have not been synced yet."));
        assert!(report.contains("No badges evaluated."));
        assert!(report.contains("Your journal is empty."));
    }

    #[test]
    fn report_lists_stats_badges_and_journal() {
        let snapshot = RawStatsSnapshot {
            total_solved: 100,
            topic_skills: vec![TopicCategory {
                category: "core".to_string(),
                topics: vec![
                    TopicSkill {
                        name: "Arrays".to_string(),
                        solved: 80,
                    },
                    TopicSkill {
                        name: "DP".to_string(),
                        solved: 5,
                    },
                ],
            }],
        };
        let derived = stats::derive(Some(&snapshot)).unwrap();
        let badges = vec![BadgeOutcome {
            id: "STREAK_MASTER".to_string(),
            name: "Streak Master".to_string(),
            earned: false,
            error: None,
        }];
        let grouped = journal::group(vec![sample_entry("a", "Heaps", 20)]);

        let report = build_report("alex", Some(&derived), &badges, &grouped);
        assert!(report.contains("Generated for alex"));
        assert!(report.contains("- DP\n"));
        assert!(report.contains("- Arrays: 80 / 150"));
        assert!(report.contains("M1 20 -> M2 40"));
        assert!(report.contains("- Streak Master (locked)"));
        assert!(report.contains("### Heaps"));
        assert!(report.contains("  - Q: Why a heap?"));
    }
}
