//! Outbound half of a connection as seen by everything except the writer
//! task: a bounded queue of complete frames.

use anyhow::{Result, anyhow};
use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};

/// What the writer task is asked to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Frame(Bytes),
    /// Flush what is queued, then shut the socket down.
    Close,
}

/// Result of a non-blocking send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Queued,
    /// The queue is at capacity; the frame was not sent.
    Full,
    /// The writer has gone away.
    Closed,
}

#[derive(Debug, Clone)]
pub struct Transport {
    tx: mpsc::Sender<Outbound>,
}

impl Transport {
    /// A transport and the receiving end its writer task drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queue a frame, waiting for room if the writer is behind.
    pub async fn send(&self, frame: Bytes) -> Result<()> {
        self.tx
            .send(Outbound::Frame(frame))
            .await
            .map_err(|_| anyhow!("connection writer has gone away"))
    }

    /// Queue a frame only if there is room right now.
    pub fn offer(&self, frame: Bytes) -> Offer {
        match self.tx.try_send(Outbound::Frame(frame)) {
            Ok(()) => Offer::Queued,
            Err(TrySendError::Full(_)) => Offer::Full,
            Err(TrySendError::Closed(_)) => Offer::Closed,
        }
    }

    /// Ask the writer to finish. A writer that is already gone is fine.
    pub async fn close(&self) {
        let _ = self.tx.send(Outbound::Close).await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offer_reports_full_queue_without_waiting() {
        let (transport, mut rx) = Transport::channel(1);
        assert_eq!(transport.offer(Bytes::from_static(b"a")), Offer::Queued);
        assert_eq!(transport.offer(Bytes::from_static(b"b")), Offer::Full);

        assert_eq!(rx.recv().await, Some(Outbound::Frame(Bytes::from_static(b"a"))));
        drop(rx);
        assert_eq!(transport.offer(Bytes::from_static(b"c")), Offer::Closed);
        assert!(transport.is_closed());
        assert!(transport.send(Bytes::from_static(b"d")).await.is_err());
    }

    #[tokio::test]
    async fn close_follows_queued_frames() {
        let (transport, mut rx) = Transport::channel(4);
        transport.send(Bytes::from_static(b"x")).await.unwrap();
        transport.close().await;
        assert_eq!(rx.recv().await, Some(Outbound::Frame(Bytes::from_static(b"x"))));
        assert_eq!(rx.recv().await, Some(Outbound::Close));
    }
}
