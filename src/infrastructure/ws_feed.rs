// WebSocket feed transport - Reconnecting client for the UPS push channel
use crate::application::feed_adapter::{FeedError, FeedTransport, TransportEvent};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

const SNAPSHOT_REQUEST: &str = r#"{"type":"request_snapshot"}"#;
const EVENT_BUFFER: usize = 256;

/// Outbound side handed to the feed adapter. Frames are forwarded to
/// whichever connection is currently open.
pub struct WebSocketFeed {
    control: mpsc::UnboundedSender<String>,
}

impl FeedTransport for WebSocketFeed {
    fn request_snapshot(&self) -> Result<(), FeedError> {
        self.control
            .send(SNAPSHOT_REQUEST.to_string())
            .map_err(|_| FeedError::Transport("feed task has stopped".to_string()))
    }
}

/// Spawn the connection task. Every (re)connect is reported as
/// `Connected`, every lost connection as `Disconnected`.
pub fn spawn_websocket_feed(
    url: String,
    reconnect_delay: Duration,
) -> (WebSocketFeed, mpsc::Receiver<TransportEvent>) {
    let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
    let (control_tx, control_rx) = mpsc::unbounded_channel();

    tokio::spawn(run_connection_loop(url, reconnect_delay, events_tx, control_rx));

    (WebSocketFeed { control: control_tx }, events_rx)
}

async fn run_connection_loop(
    url: String,
    reconnect_delay: Duration,
    events: mpsc::Sender<TransportEvent>,
    mut control: mpsc::UnboundedReceiver<String>,
) {
    loop {
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                info!("Connected to feed {}", url);
                if events.send(TransportEvent::Connected).await.is_err() {
                    return;
                }

                let (mut write, mut read) = stream.split();
                loop {
                    tokio::select! {
                        frame = read.next() => match frame {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<Value>(&text) {
                                    Ok(value) => {
                                        let event = TransportEvent::Message(value);
                                        if events.send(event).await.is_err() {
                                            return;
                                        }
                                    }
                                    Err(e) => debug!("Ignoring non-JSON feed frame: {}", e),
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                info!("Feed {} closed", url);
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                warn!("Feed {} read error: {}", url, e);
                                break;
                            }
                        },
                        outbound = control.recv() => match outbound {
                            Some(text) => {
                                if let Err(e) = write.send(Message::Text(text)).await {
                                    warn!("Feed {} write error: {}", url, e);
                                    break;
                                }
                            }
                            // Adapter dropped, nobody is listening any more.
                            None => return,
                        },
                    }
                }

                if events.send(TransportEvent::Disconnected).await.is_err() {
                    return;
                }
            }
            Err(e) => warn!("Feed connection to {} failed: {}", url, e),
        }

        // Requests queued while offline are stale by the time we reconnect.
        while control.try_recv().is_ok() {}
        tokio::time::sleep(reconnect_delay).await;
    }
}
