use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{
    ActivityHistory, Difficulty, Post, RawStatsSnapshot, Reflection, SolvedProblem,
    SolvedProblemHistoryEntry, TopicCategory, TopicSkill,
};

pub const DEMO_IDENTITY: &str = "alexdev_leetcode";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn ensure_learner(pool: &PgPool, identity: &str, display_name: &str) -> anyhow::Result<Uuid> {
    let learner_id: Uuid = sqlx::query(
        r#"
        INSERT INTO progress_dashboard.learners (id, identity, display_name)
        VALUES ($1, $2, $3)
        ON CONFLICT (identity) DO UPDATE
        SET identity = EXCLUDED.identity
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(identity)
    .bind(display_name)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(learner_id)
}

async fn find_learner(pool: &PgPool, identity: &str) -> anyhow::Result<Option<Uuid>> {
    let row = sqlx::query("SELECT id FROM progress_dashboard.learners WHERE identity = $1")
        .bind(identity)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| row.get("id")))
}

/// Stores a freshly synced snapshot for `identity`.
pub async fn record_snapshot(
    pool: &PgPool,
    identity: &str,
    snapshot: &RawStatsSnapshot,
) -> anyhow::Result<()> {
    let learner_id = ensure_learner(pool, identity, identity).await?;

    sqlx::query(
        r#"
        INSERT INTO progress_dashboard.snapshots (id, learner_id, payload, synced_at)
        VALUES ($1, $2, $3, NOW())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(learner_id)
    .bind(Json(snapshot))
    .execute(pool)
    .await?;

    info!(identity, total_solved = snapshot.total_solved, "recorded stats snapshot");
    Ok(())
}

/// Up to `limit` stored snapshots for `identity`, newest first.
pub async fn recent_snapshots(
    pool: &PgPool,
    identity: &str,
    limit: i64,
) -> anyhow::Result<Vec<RawStatsSnapshot>> {
    let rows = sqlx::query(
        r#"
        SELECT s.payload
        FROM progress_dashboard.snapshots s
        JOIN progress_dashboard.learners l ON l.id = s.learner_id
        WHERE l.identity = $1
        ORDER BY s.synced_at DESC
        LIMIT $2
        "#,
    )
    .bind(identity)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut snapshots = Vec::with_capacity(rows.len());
    for row in rows {
        let Json(snapshot): Json<RawStatsSnapshot> = row
            .try_get("payload")
            .context("stored snapshot payload is not a stats snapshot")?;
        snapshots.push(snapshot);
    }
    Ok(snapshots)
}

pub async fn latest_snapshot(
    pool: &PgPool,
    identity: &str,
) -> anyhow::Result<Option<RawStatsSnapshot>> {
    Ok(recent_snapshots(pool, identity, 1).await?.into_iter().next())
}

/// Journal entries for `identity`, most recent first.
pub async fn fetch_journal(
    pool: &PgPool,
    identity: &str,
) -> anyhow::Result<Vec<SolvedProblemHistoryEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT e.id AS row_id, e.entry_id, e.topic_name, e.problem_title, e.completed_at,
               r.ai_question, r.user_answer
        FROM progress_dashboard.journal_entries e
        JOIN progress_dashboard.learners l ON l.id = e.learner_id
        LEFT JOIN progress_dashboard.reflections r ON r.journal_entry_id = e.id
        WHERE l.identity = $1
        ORDER BY e.completed_at DESC, e.id, r.position
        "#,
    )
    .bind(identity)
    .fetch_all(pool)
    .await?;

    let mut entries: Vec<SolvedProblemHistoryEntry> = Vec::new();
    let mut last_row: Option<Uuid> = None;

    for row in rows {
        let row_id: Uuid = row.get("row_id");
        if last_row != Some(row_id) {
            entries.push(SolvedProblemHistoryEntry {
                id: row.get("entry_id"),
                topic_name: row.get("topic_name"),
                problem_title: row.get("problem_title"),
                completed_at: row.get("completed_at"),
                reflections: Vec::new(),
            });
            last_row = Some(row_id);
        }

        let question: Option<String> = row.get("ai_question");
        let answer: Option<String> = row.get("user_answer");
        if let (Some(ai_question), Some(user_answer), Some(entry)) =
            (question, answer, entries.last_mut())
        {
            entry.reflections.push(Reflection {
                ai_question,
                user_answer,
            });
        }
    }

    Ok(entries)
}

pub async fn fetch_activity(pool: &PgPool, identity: &str) -> anyhow::Result<ActivityHistory> {
    let Some(learner_id) = find_learner(pool, identity).await? else {
        return Ok(ActivityHistory::default());
    };

    let solved_rows = sqlx::query(
        "SELECT topic, difficulty FROM progress_dashboard.solved_problems WHERE learner_id = $1",
    )
    .bind(learner_id)
    .fetch_all(pool)
    .await?;

    let mut solved_problems = Vec::with_capacity(solved_rows.len());
    for row in solved_rows {
        let topic: String = row.get("topic");
        let raw: String = row.get("difficulty");
        match raw.parse::<Difficulty>() {
            Ok(difficulty) => solved_problems.push(SolvedProblem { topic, difficulty }),
            Err(err) => warn!(identity, topic = %topic, error = %err, "skipping solved problem"),
        }
    }

    let post_rows = sqlx::query(
        r#"
        SELECT style_score, posted_at
        FROM progress_dashboard.posts
        WHERE learner_id = $1
        ORDER BY posted_at DESC
        "#,
    )
    .bind(learner_id)
    .fetch_all(pool)
    .await?;

    let posts = post_rows
        .into_iter()
        .map(|row| Post {
            style_score: row.get("style_score"),
            posted_at: row.get("posted_at"),
        })
        .collect();

    Ok(ActivityHistory {
        solved_problems,
        posts,
    })
}

async fn upsert_journal_entry(
    pool: &PgPool,
    learner_id: Uuid,
    entry_id: &str,
    topic_name: &str,
    problem_title: &str,
    completed_at: DateTime<Utc>,
) -> anyhow::Result<Uuid> {
    let row_id: Uuid = sqlx::query(
        r#"
        INSERT INTO progress_dashboard.journal_entries
        (id, learner_id, entry_id, topic_name, problem_title, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (learner_id, entry_id) DO UPDATE
        SET topic_name = EXCLUDED.topic_name,
            problem_title = EXCLUDED.problem_title,
            completed_at = EXCLUDED.completed_at
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(learner_id)
    .bind(entry_id)
    .bind(topic_name)
    .bind(problem_title)
    .bind(completed_at)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(row_id)
}

async fn insert_reflection(
    pool: &PgPool,
    journal_entry_id: Uuid,
    position: i32,
    reflection: &Reflection,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO progress_dashboard.reflections
        (id, journal_entry_id, position, ai_question, user_answer)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (journal_entry_id, position) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(journal_entry_id)
    .bind(position)
    .bind(&reflection.ai_question)
    .bind(&reflection.user_answer)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Reads journal rows from CSV, one row per reflection. Rows sharing an
/// `entry_id` collapse into one entry whose reflections keep file order;
/// the first row of an entry supplies its topic, title and timestamp.
pub fn read_journal_csv<R: std::io::Read>(
    mut reader: csv::Reader<R>,
) -> anyhow::Result<Vec<SolvedProblemHistoryEntry>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        entry_id: String,
        topic_name: String,
        problem_title: String,
        completed_at: DateTime<Utc>,
        ai_question: String,
        user_answer: String,
    }

    let mut entries: Vec<SolvedProblemHistoryEntry> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid journal row {}", line + 1))?;
        let slot = *slots.entry(row.entry_id.clone()).or_insert_with(|| {
            entries.push(SolvedProblemHistoryEntry {
                id: row.entry_id.clone(),
                topic_name: row.topic_name.clone(),
                problem_title: row.problem_title.clone(),
                completed_at: row.completed_at,
                reflections: Vec::new(),
            });
            entries.len() - 1
        });
        entries[slot].reflections.push(Reflection {
            ai_question: row.ai_question,
            user_answer: row.user_answer,
        });
    }

    Ok(entries)
}

async fn stored_reflections(
    pool: &PgPool,
    journal_entry_id: Uuid,
) -> anyhow::Result<(Vec<Reflection>, i32)> {
    let rows = sqlx::query(
        r#"
        SELECT position, ai_question, user_answer
        FROM progress_dashboard.reflections
        WHERE journal_entry_id = $1
        ORDER BY position
        "#,
    )
    .bind(journal_entry_id)
    .fetch_all(pool)
    .await?;

    let mut next_position = 0;
    let mut stored = Vec::with_capacity(rows.len());
    for row in rows {
        let position: i32 = row.get("position");
        next_position = next_position.max(position + 1);
        stored.push(Reflection {
            ai_question: row.get("ai_question"),
            user_answer: row.get("user_answer"),
        });
    }
    Ok((stored, next_position))
}

/// Imports journal reflections from CSV. Reflections already stored for an
/// entry are skipped; new ones are appended after the entry's last position,
/// so an entry may be extended by later files.
pub async fn import_journal_csv(
    pool: &PgPool,
    identity: &str,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let entries = read_journal_csv(reader)?;
    let learner_id = ensure_learner(pool, identity, identity).await?;
    let mut inserted = 0usize;

    for entry in entries.iter() {
        let row_id = upsert_journal_entry(
            pool,
            learner_id,
            &entry.id,
            &entry.topic_name,
            &entry.problem_title,
            entry.completed_at,
        )
        .await?;

        let (stored, mut next_position) = stored_reflections(pool, row_id).await?;
        for reflection in entry.reflections.iter() {
            if stored.contains(reflection) {
                continue;
            }
            if insert_reflection(pool, row_id, next_position, reflection).await? {
                inserted += 1;
            }
            next_position += 1;
        }
    }

    info!(identity, inserted, path = %csv_path.display(), "imported journal reflections");
    Ok(inserted)
}

fn demo_snapshot() -> RawStatsSnapshot {
    let topic = |name: &str, solved: u64| TopicSkill {
        name: name.to_string(),
        solved,
    };
    RawStatsSnapshot {
        total_solved: 342,
        topic_skills: vec![
            TopicCategory {
                category: "Fundamental".to_string(),
                topics: vec![topic("Arrays", 120), topic("Strings", 110), topic("Linked Lists", 12)],
            },
            TopicCategory {
                category: "Intermediate".to_string(),
                topics: vec![topic("Trees", 98), topic("Greedy", 85), topic("Graphs", 45)],
            },
            TopicCategory {
                category: "Advanced".to_string(),
                topics: vec![topic("Dynamic Programming", 65)],
            },
        ],
    }
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let learner_id = ensure_learner(pool, DEMO_IDENTITY, "Alex Dev").await?;
    record_snapshot(pool, DEMO_IDENTITY, &demo_snapshot()).await?;

    let base = Utc
        .with_ymd_and_hms(2026, 2, 2, 18, 0, 0)
        .single()
        .context("invalid seed timestamp")?;

    let journal = vec![
        (
            "seed-j-001",
            "Graphs",
            "Number of Islands",
            base,
            vec![
                (
                    "Why did you mark cells visited before pushing them?",
                    "Otherwise the same cell is queued twice and the BFS blows up.",
                ),
                (
                    "What would change for diagonal neighbours?",
                    "Only the direction list, eight offsets instead of four.",
                ),
            ],
        ),
        (
            "seed-j-002",
            "Dynamic Programming",
            "Climbing Stairs",
            base - Duration::days(1),
            vec![(
                "Which subproblem does dp[i] represent?",
                "Ways to reach step i, built from the two steps below it.",
            )],
        ),
        (
            "seed-j-003",
            "Graphs",
            "Course Schedule",
            base - Duration::days(3),
            vec![(
                "How did you detect the cycle?",
                "Kahn's algorithm: if not every course gets dequeued there is a cycle.",
            )],
        ),
    ];

    for (entry_id, topic, title, completed_at, reflections) in journal {
        let row_id =
            upsert_journal_entry(pool, learner_id, entry_id, topic, title, completed_at).await?;
        for (position, (question, answer)) in reflections.into_iter().enumerate() {
            let reflection = Reflection {
                ai_question: question.to_string(),
                user_answer: answer.to_string(),
            };
            insert_reflection(pool, row_id, position as i32, &reflection).await?;
        }
    }

    for idx in 0..52i64 {
        sqlx::query(
            r#"
            INSERT INTO progress_dashboard.solved_problems
            (id, learner_id, topic, difficulty, solved_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(learner_id)
        .bind("Graph")
        .bind(Difficulty::Hard.as_str())
        .bind(base - Duration::days(idx))
        .bind(format!("seed-graph-hard-{idx:03}"))
        .execute(pool)
        .await?;
    }

    for idx in 0..22i64 {
        let style_score = 9.1 + (idx % 8) as f64 * 0.1;
        sqlx::query(
            r#"
            INSERT INTO progress_dashboard.posts
            (id, learner_id, style_score, posted_at, source_key)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(learner_id)
        .bind(style_score)
        .bind(base - Duration::hours(idx * 9))
        .bind(format!("seed-post-{idx:03}"))
        .execute(pool)
        .await?;
    }

    Ok(())
}
