//! Cosmetic progress ticker shown while a plan is being generated.
//!
//! The stages are not tied to any real work: the ticker advances on a timer
//! and is only forced to the end once generation has finished.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Labels of the progress stages, in display order.
pub const STAGE_LABELS: [&str; 5] = [
    "Analyzing your profile",
    "Calculating specific calorie needs",
    "Balancing your macronutrients",
    "Structuring optimal water intake",
    "Finalizing your AI fitness plan",
];

/// Snapshot of a ticker, as served to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub completed_stages: usize,
    pub stages: usize,
    pub labels: &'static [&'static str],
    pub finished: bool,
}

impl ProgressSnapshot {
    pub fn from_completed(completed_stages: usize) -> Self {
        Self {
            completed_stages,
            stages: STAGE_LABELS.len(),
            labels: &STAGE_LABELS,
            finished: completed_stages >= STAGE_LABELS.len(),
        }
    }
}

/// Timer-driven stage counter.
///
/// Holds at `stages - 1` until [`finish`](Self::finish). The timer task is
/// aborted when the ticker is dropped, whichever way generation ends.
pub struct ProgressTicker {
    tx: Arc<watch::Sender<usize>>,
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    /// Start ticking every `interval`.
    pub fn start(interval: Duration) -> Self {
        let (tx, _) = watch::channel(0usize);
        let tx = Arc::new(tx);
        let cap = STAGE_LABELS.len() - 1;

        let ticker_tx = Arc::clone(&tx);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);
            interval.tick().await; // first tick is immediate
            loop {
                interval.tick().await;
                let advanced = ticker_tx.send_if_modified(|completed| {
                    if *completed < cap {
                        *completed += 1;
                        true
                    } else {
                        false
                    }
                });
                if !advanced {
                    break;
                }
            }
        });

        Self { tx, handle }
    }

    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.tx.subscribe()
    }

    pub fn completed(&self) -> usize {
        *self.tx.borrow()
    }

    /// Stop the timer and mark every stage complete.
    pub fn finish(self) {
        self.handle.abort();
        self.tx.send_replace(STAGE_LABELS.len());
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn holds_below_last_stage_until_finished() {
        let ticker = ProgressTicker::start(Duration::from_millis(5));
        let rx = ticker.subscribe();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(ticker.completed(), STAGE_LABELS.len() - 1);

        ticker.finish();
        assert_eq!(*rx.borrow(), STAGE_LABELS.len());
        assert!(ProgressSnapshot::from_completed(*rx.borrow()).finished);
    }

    #[tokio::test]
    async fn starts_at_zero() {
        let ticker = ProgressTicker::start(Duration::from_secs(60));
        assert_eq!(ticker.completed(), 0);
    }

    #[tokio::test]
    async fn drop_stops_the_timer() {
        let ticker = ProgressTicker::start(Duration::from_millis(5));
        let rx = ticker.subscribe();
        drop(ticker);
        tokio::time::sleep(Duration::from_millis(20)).await;

        let frozen = *rx.borrow();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*rx.borrow(), frozen);
        assert!(frozen < STAGE_LABELS.len());
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let json = serde_json::to_value(ProgressSnapshot::from_completed(2)).unwrap();
        assert_eq!(json["completedStages"], 2);
        assert_eq!(json["stages"], 5);
        assert_eq!(json["labels"][0], "Analyzing your profile");
        assert_eq!(json["finished"], false);
    }
}
