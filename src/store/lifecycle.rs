//! Connection state and connect/disconnect notifications

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::backend::ClientEvent;

/// Connection state of a session store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Notifications a host application can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Connect,
    Disconnect,
}

pub(crate) struct Lifecycle {
    state: Mutex<ConnectionState>,
    events: broadcast::Sender<StoreEvent>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(ConnectionState::Disconnected),
            events,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Move to `Connecting`; false if a connection is already up or underway
    pub(crate) fn begin_connect(&self) -> bool {
        let mut state = self.state.lock();
        if *state != ConnectionState::Disconnected {
            return false;
        }
        *state = ConnectionState::Connecting;
        true
    }

    pub(crate) fn mark_connected(&self) {
        self.transition(ConnectionState::Connected, StoreEvent::Connect);
    }

    pub(crate) fn mark_disconnected(&self) {
        self.transition(ConnectionState::Disconnected, StoreEvent::Disconnect);
    }

    fn transition(&self, next: ConnectionState, event: StoreEvent) {
        {
            let mut state = self.state.lock();
            if *state == next {
                return;
            }
            *state = next;
        }
        tracing::debug!(?event, "connection state changed");
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Forward client lifecycle events into the store's state machine
pub(crate) fn spawn_watcher(
    lifecycle: Arc<Lifecycle>,
    mut client_events: broadcast::Receiver<ClientEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match client_events.recv().await {
                Ok(ClientEvent::NodeAdded) => lifecycle.mark_connected(),
                Ok(ClientEvent::Disconnected) => lifecycle.mark_disconnected(),
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "client events lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
