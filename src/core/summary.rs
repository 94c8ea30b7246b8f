//! Human-readable rendering of a snapshot and of transition alerts.

use std::fmt::Write;

use chrono::{DateTime, Local, Utc};

use super::models::{Snapshot, Transition};

pub const NO_TASKS: &str = "No download tasks found.";

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const MIB: f64 = 1024.0 * 1024.0;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format(TIME_FORMAT).to_string()
}

/// Render every job in the snapshot. Returns [`NO_TASKS`] for an empty snapshot.
pub fn render(snapshot: &Snapshot) -> String {
    if snapshot.is_empty() {
        return NO_TASKS.to_string();
    }

    let mut out = String::new();
    match snapshot.polled_at {
        Some(at) => {
            let _ = writeln!(out, "📋 Current Download Status (as of {})\n", local_time(at));
        }
        None => out.push_str("📋 Current Download Status\n\n"),
    }

    for job in &snapshot.jobs {
        let _ = writeln!(out, "📦 {}", job.title);
        let _ = writeln!(out, "   Status: {}", job.status);
        let _ = writeln!(out, "   Size: {:.2} GiB", job.size as f64 / GIB);

        if let Some(duration) = job.download_duration_secs() {
            let hours = duration as f64 / 3600.0;
            let _ = writeln!(out, "   ⬇️ Downloaded: {:.2} hours", hours);

            if duration > 0 {
                let speed = job.size as f64 / duration as f64;
                let _ = writeln!(out, "   ⬇️ Average Speed: {:.2} MiB/s", speed / MIB);
            }
        }
        out.push('\n');
    }

    out
}

/// Alert text sent to admin recipients for one transition.
pub fn transition_message(transition: &Transition, observed_at: DateTime<Utc>) -> String {
    format!(
        "🔔 Status Change Alert:\n\nTask: {}\nPrevious Status: {}\nNew Status: {}\n\nLast updated: {}",
        transition.title,
        transition.previous,
        transition.current,
        local_time(observed_at)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Job, JobDetail};

    fn finished_job(started: i64, completed: i64) -> Job {
        let mut job: Job = serde_json::from_value(serde_json::json!({
            "id": "dbid_1",
            "title": "archive.tar",
            "status": "finished",
            "size": 2u64 * 1024 * 1024 * 1024,
        }))
        .unwrap();
        job.additional.detail = JobDetail {
            started_time: started,
            completed_time: completed,
        };
        job
    }

    #[test]
    fn test_empty_snapshot_returns_sentinel() {
        assert_eq!(render(&Snapshot::default()), NO_TASKS);
    }

    #[test]
    fn test_render_finished_job_with_throughput() {
        // 2 GiB over 1024 seconds is 2 MiB/s.
        let snapshot = Snapshot::new(vec![finished_job(1_000, 2_024)], Utc::now());
        let text = render(&snapshot);

        assert!(text.contains("📦 archive.tar"));
        assert!(text.contains("Status: finished"));
        assert!(text.contains("Size: 2.00 GiB"));
        assert!(text.contains("Downloaded: 0.28 hours"));
        assert!(text.contains("Average Speed: 2.00 MiB/s"));
    }

    #[test]
    fn test_equal_timestamps_omit_throughput() {
        let snapshot = Snapshot::new(vec![finished_job(1_000, 1_000)], Utc::now());
        let text = render(&snapshot);

        assert!(text.contains("Size: 2.00 GiB"));
        assert!(!text.contains("Average Speed"));
        assert!(!text.contains("Downloaded:"));
    }

    #[test]
    fn test_unfinished_job_omits_elapsed() {
        let snapshot = Snapshot::new(vec![finished_job(1_000, 0)], Utc::now());
        assert!(!render(&snapshot).contains("hours"));
    }

    #[test]
    fn test_transition_message_names_both_states() {
        let transition = Transition {
            job_id: "dbid_1".into(),
            title: "archive.tar".into(),
            previous: "downloading".into(),
            current: "error".into(),
        };
        let text = transition_message(&transition, Utc::now());

        assert!(text.contains("Task: archive.tar"));
        assert!(text.contains("Previous Status: downloading"));
        assert!(text.contains("New Status: error"));
    }
}
