//! Connection session manager: owns the WebSocket lifecycle, the fixed
//! interval reconnect loop, and session-identity registration.

use std::sync::{Arc, Mutex};

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::events::{ClientEvent, ServerEvent};
use crate::config::ChannelConfig;
use crate::error::{RelayError, Result};
use crate::pipeline::messages::{ConnectionState, CoordinatorEvent};

/// Session identity persisted across reconnects. The coordinator writes it
/// when `session_registered` arrives; the connection task reads it on every
/// (re)connect.
pub type SessionStore = Arc<Mutex<Option<String>>>;

/// Read the stored identity.
pub(crate) fn stored_session(store: &SessionStore) -> Option<String> {
    match store.lock() {
        Ok(store) => store.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Replace the stored identity.
pub(crate) fn store_session(store: &SessionStore, session_id: String) {
    match store.lock() {
        Ok(mut store) => *store = Some(session_id),
        Err(poisoned) => *poisoned.into_inner() = Some(session_id),
    }
}

/// Handle for sending events to the server and observing channel state.
pub struct ConnectionHandle {
    outbound_tx: mpsc::UnboundedSender<ClientEvent>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl ConnectionHandle {
    /// Queue an event for the server. Dropped silently while disconnected.
    pub fn send(&self, event: ClientEvent) {
        let _ = self.outbound_tx.send(event);
    }

    /// Current channel state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch channel for awaiting state changes.
    #[must_use]
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }
}

/// Spawn the connection task.
///
/// The task maintains one logical connection until the token is cancelled:
/// connection loss is never fatal, it just restarts the fixed-interval retry
/// loop. State changes are published both on the returned watch channel and
/// as [`CoordinatorEvent::Connection`] messages.
pub fn spawn(
    config: ChannelConfig,
    session: SessionStore,
    inbound_tx: mpsc::UnboundedSender<CoordinatorEvent>,
    cancel: CancellationToken,
) -> ConnectionHandle {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

    tokio::spawn(connection_loop(
        config,
        session,
        inbound_tx,
        outbound_rx,
        state_tx,
        cancel,
    ));

    ConnectionHandle {
        outbound_tx,
        state_rx,
    }
}

async fn connection_loop(
    config: ChannelConfig,
    session: SessionStore,
    inbound_tx: mpsc::UnboundedSender<CoordinatorEvent>,
    mut outbound_rx: mpsc::UnboundedReceiver<ClientEvent>,
    state_tx: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
) {
    let interval = config.reconnect_interval();

    loop {
        if cancel.is_cancelled() {
            break;
        }

        publish_state(&state_tx, &inbound_tx, ConnectionState::Connecting);

        let outcome = run_connected(
            &config,
            &session,
            &inbound_tx,
            &mut outbound_rx,
            &state_tx,
            &cancel,
        )
        .await;

        match outcome {
            Ok(()) => break, // token cancelled, clean shutdown
            Err(e) => {
                warn!("server channel lost: {e}");
                publish_state(&state_tx, &inbound_tx, ConnectionState::Disconnected);
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(interval) => {}
                }
            }
        }
    }

    publish_state(&state_tx, &inbound_tx, ConnectionState::Disconnected);
}

/// One connected episode. Returns `Ok(())` only on cancellation; any
/// transport failure returns `Err` so the outer loop retries.
async fn run_connected(
    config: &ChannelConfig,
    session: &SessionStore,
    inbound_tx: &mpsc::UnboundedSender<CoordinatorEvent>,
    outbound_rx: &mut mpsc::UnboundedReceiver<ClientEvent>,
    state_tx: &watch::Sender<ConnectionState>,
    cancel: &CancellationToken,
) -> Result<()> {
    let connected = tokio::select! {
        () = cancel.cancelled() => return Ok(()),
        connected = connect_async(config.url.as_str()) => connected,
    };
    let (ws_stream, _) = connected.map_err(|e| RelayError::Channel(format!("connect: {e}")))?;
    let (mut write, mut read) = ws_stream.split();

    publish_state(state_tx, inbound_tx, ConnectionState::Connected);
    info!(url = %config.url, "server channel connected");

    // Re-register the held identity; skipped when none has been assigned yet.
    if let Some(session_id) = stored_session(session) {
        send_event(
            &mut write,
            &ClientEvent::ClientRegisterSession { session_id },
        )
        .await?;
    }

    loop {
        tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => forward_server_event(&text, inbound_tx),
                Some(Ok(Message::Close(_))) | None => {
                    return Err(RelayError::Channel("closed by server".into()));
                }
                Some(Err(e)) => return Err(RelayError::Channel(format!("read error: {e}"))),
                _ => {} // Binary, Ping/Pong handled by tungstenite.
            },
            Some(event) = outbound_rx.recv() => {
                send_event(&mut write, &event).await?;
            }
        }
    }
}

async fn send_event<S>(write: &mut S, event: &ClientEvent) -> Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let json = serde_json::to_string(event)
        .map_err(|e| RelayError::Channel(format!("encode: {e}")))?;
    write
        .send(Message::Text(json))
        .await
        .map_err(|e| RelayError::Channel(format!("send error: {e}")))
}

fn forward_server_event(text: &str, inbound_tx: &mpsc::UnboundedSender<CoordinatorEvent>) {
    match serde_json::from_str::<ServerEvent>(text) {
        Ok(event) => {
            let _ = inbound_tx.send(CoordinatorEvent::Server(event));
        }
        Err(e) => debug!("ignoring unparseable server event: {e}"),
    }
}

fn publish_state(
    state_tx: &watch::Sender<ConnectionState>,
    inbound_tx: &mpsc::UnboundedSender<CoordinatorEvent>,
    state: ConnectionState,
) {
    let _ = state_tx.send(state);
    let _ = inbound_tx.send(CoordinatorEvent::Connection(state));
}
