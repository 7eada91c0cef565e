//! Push channel for one upload-id.

use crate::error::{PushError, PushResult};
use crate::message::PushMessage;
use futures_util::{Sink, SinkExt};
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Unique identifier for a socket connection.
pub type ConnectionId = String;

/// Subscriber state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    /// Open and accepting messages
    Open,
    /// Close requested, flushing
    Closing,
    /// Writer finished
    Closed,
}

/// The sending half of a subscriber's socket.
///
/// Sending only enqueues; the socket write happens in the writer task, so
/// callers never block on a slow client.
#[derive(Debug, Clone)]
pub struct Subscriber {
    /// Upload-id this subscriber listens to
    pub upload_id: String,
    /// Identifier of the underlying connection
    pub connection_id: ConnectionId,
    /// Remote address
    pub remote_addr: Option<SocketAddr>,
    state: Arc<RwLock<SubscriberState>>,
    tx: mpsc::UnboundedSender<PushMessage>,
}

impl Subscriber {
    /// Create a subscriber and the receiver its writer drains.
    pub fn channel(
        upload_id: impl Into<String>,
        remote_addr: Option<SocketAddr>,
    ) -> (Self, mpsc::UnboundedReceiver<PushMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Self {
            upload_id: upload_id.into(),
            connection_id: uuid::Uuid::new_v4().to_string(),
            remote_addr,
            state: Arc::new(RwLock::new(SubscriberState::Open)),
            tx,
        };
        (subscriber, rx)
    }

    /// Get the subscriber state.
    pub fn state(&self) -> SubscriberState {
        *self.state.read()
    }

    /// Check if the subscriber is open.
    pub fn is_open(&self) -> bool {
        self.state() == SubscriberState::Open && !self.tx.is_closed()
    }

    /// Queue a message.
    pub fn send(&self, message: PushMessage) -> PushResult<()> {
        if self.state() != SubscriberState::Open {
            return Err(PushError::ConnectionClosed);
        }
        self.tx
            .send(message)
            .map_err(|e| PushError::Send(e.to_string()))
    }

    /// Ask the writer to close the socket.
    pub fn close(&self) {
        let mut state = self.state.write();
        if *state == SubscriberState::Open {
            *state = SubscriberState::Closing;
            let _ = self.tx.send(PushMessage::Close);
        }
    }

    pub(crate) fn set_state(&self, state: SubscriberState) {
        *self.state.write() = state;
    }
}

/// Drains a subscriber's queue into its socket.
pub(crate) struct SubscriberWriter<S> {
    sink: S,
    rx: mpsc::UnboundedReceiver<PushMessage>,
}

impl<S> SubscriberWriter<S>
where
    S: Sink<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    pub fn new(sink: S, rx: mpsc::UnboundedReceiver<PushMessage>) -> Self {
        Self { sink, rx }
    }

    /// Run until a close message is sent or the queue is dropped.
    pub async fn run(mut self) -> PushResult<()> {
        while let Some(message) = self.rx.recv().await {
            let is_close = message.is_close();

            if let Err(e) = self.sink.send(message.into()).await {
                tracing::warn!(error = %e, "Failed to write progress message");
                return Err(PushError::Protocol(e));
            }

            if is_close {
                break;
            }
        }

        let _ = self.sink.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_after_close_fails() {
        let (subscriber, mut rx) = Subscriber::channel("up-1", None);
        subscriber.send(PushMessage::Text("a".into())).unwrap();
        subscriber.close();
        assert_eq!(subscriber.state(), SubscriberState::Closing);
        assert!(matches!(
            subscriber.send(PushMessage::Text("b".into())),
            Err(PushError::ConnectionClosed)
        ));

        assert_eq!(rx.try_recv().unwrap(), PushMessage::Text("a".into()));
        assert_eq!(rx.try_recv().unwrap(), PushMessage::Close);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_not_open() {
        let (subscriber, rx) = Subscriber::channel("up-1", None);
        drop(rx);
        assert!(!subscriber.is_open());
        assert!(matches!(
            subscriber.send(PushMessage::Close),
            Err(PushError::Send(_))
        ));
    }

    #[test]
    fn test_connection_ids_are_unique() {
        let (a, _ra) = Subscriber::channel("same", None);
        let (b, _rb) = Subscriber::channel("same", None);
        assert_ne!(a.connection_id, b.connection_id);
    }
}
