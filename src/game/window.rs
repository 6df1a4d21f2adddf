//! Timed reaction collection with an optional forced stop.
//!
//! A window yields reaction events until its deadline passes or its
//! [`StopHandle`] fires, whichever comes first. Stopping an already closed
//! window does nothing.

use crate::types::ReactionEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Elapsed,
    Stopped,
}

/// Forces a window closed before its deadline
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    /// One-shot stop after `delay`
    pub fn stop_after(&self, delay: Duration) {
        let handle = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            handle.stop();
        });
    }
}

enum Step {
    Event(ReactionEvent),
    Drained,
    Close(CloseReason),
}

pub struct CollectionWindow {
    events: mpsc::UnboundedReceiver<ReactionEvent>,
    drained: bool,
    deadline: Instant,
    stop_rx: watch::Receiver<bool>,
    stop: StopHandle,
    closed: Option<CloseReason>,
}

impl CollectionWindow {
    pub fn open(events: mpsc::UnboundedReceiver<ReactionEvent>, duration: Duration) -> Self {
        let (tx, stop_rx) = watch::channel(false);
        Self {
            events,
            drained: false,
            deadline: Instant::now() + duration,
            stop_rx,
            stop: StopHandle { tx: Arc::new(tx) },
            closed: None,
        }
    }

    /// A window nobody can react to; it only waits out its deadline
    pub fn idle(duration: Duration) -> Self {
        let (_tx, rx) = mpsc::unbounded_channel();
        Self::open(rx, duration)
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.closed
    }

    /// Next event in arrival order, or `None` once the window has closed
    pub async fn next_event(&mut self) -> Option<ReactionEvent> {
        loop {
            if self.closed.is_some() {
                return None;
            }

            let step = tokio::select! {
                biased;
                _ = stopped(&mut self.stop_rx) => Step::Close(CloseReason::Stopped),
                _ = tokio::time::sleep_until(self.deadline) => Step::Close(CloseReason::Elapsed),
                event = self.events.recv(), if !self.drained => match event {
                    Some(event) => Step::Event(event),
                    None => Step::Drained,
                },
            };

            match step {
                Step::Event(event) => return Some(event),
                // The event source went away; keep the timer running
                Step::Drained => self.drained = true,
                Step::Close(reason) => {
                    tracing::debug!("Collection window closed: {:?}", reason);
                    self.closed = Some(reason);
                }
            }
        }
    }
}

async fn stopped(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Emoji, ReactionKind};

    fn assert_elapsed(start: Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(100),
            "expected ~{:?}, got {:?}",
            expected,
            elapsed
        );
    }

    fn event(user: &str) -> ReactionEvent {
        ReactionEvent {
            kind: ReactionKind::Added,
            message_id: "m".to_string(),
            channel_id: "general".to_string(),
            user_id: user.to_string(),
            user_is_bot: false,
            emoji: Emoji::standard("🍕"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_elapses() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut window = CollectionWindow::open(rx, Duration::from_secs(10));
        let start = Instant::now();

        tx.send(event("alice")).unwrap();
        tx.send(event("bob")).unwrap();

        assert_eq!(window.next_event().await.unwrap().user_id, "alice");
        assert_eq!(window.next_event().await.unwrap().user_id, "bob");
        assert!(window.next_event().await.is_none());

        assert_eq!(window.close_reason(), Some(CloseReason::Elapsed));
        assert_elapsed(start, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_after_closes_early() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut window = CollectionWindow::open(rx, Duration::from_secs(15));
        let start = Instant::now();

        window.stop_handle().stop_after(Duration::from_secs(5));
        assert!(window.next_event().await.is_none());

        assert_eq!(window.close_reason(), Some(CloseReason::Stopped));
        assert_elapsed(start, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_after_deadline_is_noop() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut window = CollectionWindow::open(rx, Duration::from_secs(2));
        let handle = window.stop_handle();
        handle.stop_after(Duration::from_secs(5));

        assert!(window.next_event().await.is_none());
        assert_eq!(window.close_reason(), Some(CloseReason::Elapsed));

        handle.stop();
        assert!(window.next_event().await.is_none());
        assert_eq!(window.close_reason(), Some(CloseReason::Elapsed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_source_waits_for_deadline() {
        let mut window = CollectionWindow::idle(Duration::from_secs(3));
        let start = Instant::now();

        assert!(window.next_event().await.is_none());
        assert_elapsed(start, Duration::from_secs(3));
    }
}
