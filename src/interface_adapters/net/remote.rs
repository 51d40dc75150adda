// Client-side transport that plays against a server over a websocket.

use crate::domain::state::EntityId;
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage, parse_id};
use crate::use_cases::{Intent, Transport, TransportError, WorldUpdate};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

enum Outgoing {
    Text(String),
    Close,
}

/// Remote transport: intents go out as [`ClientMessage`]s and snapshots come back as
/// [`WorldUpdate`]s. Dropping it closes the socket.
pub struct RemoteTransport {
    outgoing_tx: mpsc::Sender<Outgoing>,
    world_tx: broadcast::Sender<WorldUpdate>,
    identity_rx: watch::Receiver<Option<EntityId>>,
}

impl RemoteTransport {
    /// Connects to `url` (`ws://host:port/ws` or `/chapter?...`) and starts the socket tasks.
    pub async fn connect(url: &str, capacity: usize) -> Result<Self, TransportError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (mut sink, mut stream) = stream.split();

        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Outgoing>(capacity);
        let (world_tx, _world_rx) = broadcast::channel::<WorldUpdate>(capacity);
        let (identity_tx, identity_rx) = watch::channel::<Option<EntityId>>(None);

        tokio::spawn(async move {
            while let Some(outgoing) = outgoing_rx.recv().await {
                let result = match outgoing {
                    Outgoing::Text(txt) => sink.send(Message::Text(txt.into())).await,
                    Outgoing::Close => break,
                };
                if let Err(e) = result {
                    warn!(error = %e, "remote send failed");
                    return;
                }
            }
            let _ = sink.close().await;
            debug!("remote writer exiting");
        });

        let reader_world_tx = world_tx.clone();
        tokio::spawn(async move {
            while let Some(incoming) = stream.next().await {
                let text = match incoming {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(frame)) => {
                        info!(?frame, "server closed connection");
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(error = %e, "remote recv failed");
                        break;
                    }
                };

                match serde_json::from_str::<ServerMessage>(text.as_str()) {
                    Ok(ServerMessage::Identity { player_id }) => match parse_id(&player_id) {
                        Ok(id) => {
                            identity_tx.send_replace(Some(id));
                        }
                        Err(e) => warn!(error = %e, "bad identity from server"),
                    },
                    Ok(ServerMessage::WorldUpdate(dto)) => match WorldUpdate::try_from(dto) {
                        Ok(update) => {
                            let _ = reader_world_tx.send(update);
                        }
                        Err(e) => warn!(error = %e, "bad world update from server"),
                    },
                    Ok(ServerMessage::Rejected { reason }) => {
                        warn!(%reason, "server rejected intent");
                    }
                    Err(e) => warn!(error = %e, "failed to parse server message"),
                }
            }
            debug!("remote reader exiting");
        });

        Ok(Self {
            outgoing_tx,
            world_tx,
            identity_rx,
        })
    }

    /// Player id assigned by the server, once the identity message has arrived.
    pub fn player_id(&self) -> Option<EntityId> {
        *self.identity_rx.borrow()
    }

    /// Waits for the server to assign an identity.
    pub async fn identity(&self) -> Result<EntityId, TransportError> {
        let mut rx = self.identity_rx.clone();
        let id = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| TransportError::Closed)?;
        (*id).ok_or(TransportError::Closed)
    }
}

impl Transport for RemoteTransport {
    fn send(&self, intent: Intent) -> Result<(), TransportError> {
        let outgoing = match ClientMessage::from_intent(&intent) {
            Some(message) => Outgoing::Text(
                serde_json::to_string(&message)
                    .map_err(|e| TransportError::Protocol(e.to_string()))?,
            ),
            None => Outgoing::Close,
        };

        match self.outgoing_tx.try_send(outgoing) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(TransportError::Full),
            Err(TrySendError::Closed(_)) => Err(TransportError::Closed),
        }
    }

    fn snapshots(&self) -> broadcast::Receiver<WorldUpdate> {
        self.world_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn when_nothing_listens_then_connect_fails() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let result = RemoteTransport::connect(&format!("ws://{addr}/ws"), 8).await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }
}
