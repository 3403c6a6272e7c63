use crate::store::AttemptRecord;
use chrono::{DateTime, Local};
use itertools::Itertools;
use time_humanize::HumanTime;

/// Aggregated view of a user's attempts at one challenge.
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeSummary {
    pub challenge_id: String,
    pub attempts: usize,
    pub best_wpm: u32,
    pub mean_accuracy: u8,
    pub completed_count: usize,
    pub last_attempt: DateTime<Local>,
}

/// Per-challenge summaries, ordered by challenge id.
pub fn summarize(records: &[AttemptRecord]) -> Vec<ChallengeSummary> {
    let mut summaries = Vec::new();
    for (challenge_id, group) in &records
        .iter()
        .sorted_by(|a, b| a.challenge_id.cmp(&b.challenge_id))
        .chunk_by(|r| r.challenge_id.clone())
    {
        let group: Vec<&AttemptRecord> = group.collect();
        let attempts = group.len();
        let accuracy_sum: u64 = group.iter().map(|r| r.accuracy_percent as u64).sum();
        summaries.push(ChallengeSummary {
            challenge_id,
            attempts,
            best_wpm: group.iter().map(|r| r.wpm).max().unwrap_or(0),
            mean_accuracy: ((accuracy_sum + attempts as u64 / 2) / attempts as u64) as u8,
            completed_count: group.iter().filter(|r| r.completed).count(),
            last_attempt: group
                .iter()
                .map(|r| r.created_at)
                .max()
                .unwrap_or_else(Local::now),
        });
    }
    summaries
}

/// Write attempt rows as csv, newest first as given.
pub fn export_csv<W: std::io::Write>(records: &[AttemptRecord], writer: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "date",
        "challenge_id",
        "wpm",
        "accuracy",
        "time_seconds",
        "completed",
    ])?;
    for record in records {
        wtr.write_record([
            record.created_at.to_rfc3339(),
            record.challenge_id.clone(),
            record.wpm.to_string(),
            record.accuracy_percent.to_string(),
            record.elapsed_secs.to_string(),
            record.completed.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// "2 minutes ago" style rendering for history listings.
pub fn humanize_since(created_at: DateTime<Local>) -> String {
    let secs = (Local::now() - created_at).num_seconds().max(0);
    // negative offsets read as the past
    HumanTime::from(-secs).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn record(challenge_id: &str, wpm: u32, accuracy: u8, completed: bool) -> AttemptRecord {
        AttemptRecord {
            user_id: "alice".to_string(),
            challenge_id: challenge_id.to_string(),
            wpm,
            accuracy_percent: accuracy,
            elapsed_secs: 60,
            completed,
            created_at: Local::now(),
        }
    }

    #[test]
    fn summarize_empty_is_empty() {
        assert!(summarize(&[]).is_empty());
    }

    #[test]
    fn summarize_groups_by_challenge() {
        let records = vec![
            record("rust-001", 30, 90, true),
            record("rust-002", 25, 80, false),
            record("rust-001", 40, 95, true),
        ];
        let summaries = summarize(&records);
        assert_eq!(summaries.len(), 2);

        let first = &summaries[0];
        assert_eq!(first.challenge_id, "rust-001");
        assert_eq!(first.attempts, 2);
        assert_eq!(first.best_wpm, 40);
        // (90 + 95) / 2, rounded
        assert_eq!(first.mean_accuracy, 93);
        assert_eq!(first.completed_count, 2);

        let second = &summaries[1];
        assert_eq!(second.challenge_id, "rust-002");
        assert_eq!(second.attempts, 1);
        assert_eq!(second.completed_count, 0);
    }

    #[test]
    fn summarize_tracks_latest_attempt() {
        let mut old = record("rust-001", 30, 90, true);
        old.created_at = Local::now() - TimeDelta::hours(2);
        let recent = record("rust-001", 35, 92, true);
        let latest = recent.created_at;
        let summaries = summarize(&[old, recent]);
        assert_eq!(summaries[0].last_attempt, latest);
    }

    #[test]
    fn export_writes_header_and_rows() {
        let records = vec![record("rust-001", 30, 90, true)];
        let mut out = Vec::new();
        export_csv(&records, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,challenge_id,wpm,accuracy,time_seconds,completed"
        );
        let row = lines.next().unwrap();
        assert!(row.contains("rust-001"));
        assert!(row.contains(",30,90,60,true"));
    }

    #[test]
    fn humanize_mentions_the_past() {
        let when = Local::now() - TimeDelta::minutes(5);
        let text = humanize_since(when);
        assert!(text.contains("ago"), "unexpected rendering: {}", text);
    }
}
