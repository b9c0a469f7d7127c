//! Status / Progress Channel (C8).
//!
//! An optional observer receives events from the crawl. Delivery is
//! best-effort: a full channel drops the event rather than blocking a
//! worker, since the crawl must never be back-pressured by a slow or
//! absent observer.

use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

use crate::error::FailureKind;
use crate::model::AttributePath;

#[derive(Debug, Clone)]
pub enum StatusEvent {
    Queued(AttributePath),
    Started(AttributePath),
    Described(AttributePath),
    Failed(AttributePath, FailureKind),
    FinderDone,
    Drained,
}

/// The worker-facing half: cheap to clone, cheap to call when no observer
/// is configured.
#[derive(Clone)]
pub struct StatusChannel {
    tx: Option<SyncSender<StatusEvent>>,
}

impl StatusChannel {
    /// No observer configured: every `emit` is a no-op.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Create a connected pair. The channel is modestly bounded — an
    /// observer that can't keep up loses events rather than ever stalling
    /// a worker.
    pub fn new(capacity: usize) -> (Self, Receiver<StatusEvent>) {
        let (tx, rx) = mpsc::sync_channel(capacity);
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, event: StatusEvent) {
        if let Some(tx) = &self.tx {
            match tx.try_send(event) {
                Ok(()) | Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Disconnected(_)) => {}
            }
        }
    }
}

/// Running tallies of a status stream, the shape the CLI boundary's
/// progress display and end-of-run summary both consume.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusCounts {
    pub queued: u64,
    pub started: u64,
    pub described: u64,
    pub failed: u64,
}

impl StatusCounts {
    pub fn apply(&mut self, event: &StatusEvent) {
        match event {
            StatusEvent::Queued(_) => self.queued += 1,
            StatusEvent::Started(_) => self.started += 1,
            StatusEvent::Described(_) => self.described += 1,
            StatusEvent::Failed(_, _) => self.failed += 1,
            StatusEvent::FinderDone | StatusEvent::Drained => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_channel_never_blocks() {
        let channel = StatusChannel::disabled();
        for _ in 0..1000 {
            channel.emit(StatusEvent::Queued(AttributePath::from("pkg")));
        }
    }

    #[test]
    fn full_channel_drops_instead_of_blocking() {
        let (channel, rx) = StatusChannel::new(1);
        channel.emit(StatusEvent::Queued(AttributePath::from("a")));
        channel.emit(StatusEvent::Queued(AttributePath::from("b")));
        channel.emit(StatusEvent::Queued(AttributePath::from("c")));
        // At most the capacity is buffered; extras are dropped, not queued.
        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert!(received <= 1);
    }

    #[test]
    fn counts_tally_events() {
        let mut counts = StatusCounts::default();
        counts.apply(&StatusEvent::Queued(AttributePath::from("a")));
        counts.apply(&StatusEvent::Described(AttributePath::from("a")));
        counts.apply(&StatusEvent::Failed(
            AttributePath::from("b"),
            FailureKind::Eval,
        ));
        assert_eq!(counts.queued, 1);
        assert_eq!(counts.described, 1);
        assert_eq!(counts.failed, 1);
    }
}
