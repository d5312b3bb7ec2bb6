//! Terminal progress view fed by orchestrator events.

use reelsmith_core::{QueueSummary, RunEvent};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

/// One line per event; `None` for events with nothing to show.
pub fn render(event: &RunEvent) -> Option<String> {
    match event {
        RunEvent::TaskUpdated { task } => Some(format!(
            "[{}] {:<16} {}",
            task.id,
            task.status.to_string(),
            task.log
        )),
        RunEvent::RunFinished {
            summary,
            downloads,
            halted_on_auth,
        } => {
            let mut line = format!(
                "{} | {downloads} file(s) saved",
                summary_line(summary)
            );
            if *halted_on_auth {
                line.push_str(" | halted: credential rejected");
            }
            Some(line)
        }
    }
}

pub fn summary_line(summary: &QueueSummary) -> String {
    let mut line = format!(
        "{}/{} completed ({}%), {} failed, {} stopped",
        summary.completed,
        summary.total,
        summary.progress_percent(),
        summary.failed,
        summary.stopped
    );
    if let Some(idx) = summary.active_index {
        line.push_str(&format!(", task {} in flight", idx + 1));
    }
    line
}

/// Print events until the run finishes or the orchestrator goes away.
pub async fn follow(mut rx: broadcast::Receiver<RunEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let Some(line) = render(&event) {
                    println!("{line}");
                }
                if matches!(event, RunEvent::RunFinished { .. }) {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "progress view fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use reelsmith_core::{Task, TaskStatus};

    use super::*;

    #[test]
    fn renders_task_lines_and_summary() {
        let mut task = Task::new(7, "duan", "a", "b");
        task.status = TaskStatus::WaitingVideo;
        task.log = "Image done. Waiting 10s...".to_owned();
        let line = render(&RunEvent::TaskUpdated { task }).unwrap();
        assert!(line.starts_with("[007] WAITING_VIDEO"));
        assert!(line.ends_with("Waiting 10s..."));

        let summary = QueueSummary {
            total: 4,
            completed: 3,
            failed: 1,
            ..QueueSummary::default()
        };
        let line = render(&RunEvent::RunFinished {
            summary,
            downloads: 6,
            halted_on_auth: true,
        })
        .unwrap();
        assert_eq!(
            line,
            "3/4 completed (75%), 1 failed, 0 stopped | 6 file(s) saved | halted: credential rejected"
        );
    }

    #[test]
    fn summary_names_the_in_flight_task() {
        let summary = QueueSummary {
            total: 3,
            completed: 1,
            active_index: Some(1),
            ..QueueSummary::default()
        };
        assert_eq!(
            summary_line(&summary),
            "1/3 completed (33%), 0 failed, 0 stopped, task 2 in flight"
        );
    }

    #[tokio::test]
    async fn follow_stops_at_run_finished() {
        let (tx, rx) = broadcast::channel(8);
        tx.send(RunEvent::RunFinished {
            summary: QueueSummary::default(),
            downloads: 0,
            halted_on_auth: false,
        })
        .unwrap();
        // The sender stays alive, so returning proves RunFinished ended the loop.
        follow(rx).await;
        drop(tx);
    }
}
