//! WebSocket bridge a browser extension's content script connects to.
//!
//! The desired recording state fans out to every connected page as
//! `startRecording`/`stopRecording` control messages; raw page events funnel
//! back into one channel the backend drains. State is a `watch` channel
//! rather than a command stream, so a page that connects late still learns
//! whether it should be listening.

use futures::{Sink, SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info};
use weaver_engine::protocol::{ControlMessage, PageEvent};

pub struct BridgeServer {
    port: u16,
}

pub struct BridgeHandle {
    /// Actual bound address (the server may be started on port 0).
    pub addr: SocketAddr,
    pub desired_tx: watch::Sender<bool>,
    pub event_rx: mpsc::Receiver<PageEvent>,
}

impl BridgeServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn start(&self) -> Result<BridgeHandle, Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        let listener = TcpListener::bind(&addr).await?;
        let addr = listener.local_addr()?;
        info!("Bridge listening on: {}", addr);

        let (desired_tx, desired_rx) = watch::channel(false);
        let (event_tx, event_rx) = mpsc::channel(256);

        tokio::spawn(async move {
            info!("Bridge accept loop started");
            while let Ok((stream, _)) = listener.accept().await {
                if let Ok(peer) = stream.peer_addr() {
                    info!("Accepted TCP connection from: {}", peer);
                }
                tokio::spawn(accept_connection(
                    stream,
                    desired_rx.clone(),
                    event_tx.clone(),
                ));
            }
        });

        Ok(BridgeHandle {
            addr,
            desired_tx,
            event_rx,
        })
    }
}

fn control_for(recording: bool) -> ControlMessage {
    if recording {
        ControlMessage::StartRecording
    } else {
        ControlMessage::StopRecording
    }
}

async fn accept_connection(
    stream: TcpStream,
    mut desired: watch::Receiver<bool>,
    event_tx: mpsc::Sender<PageEvent>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("Error during the websocket handshake occurred: {}", e);
            return;
        }
    };

    info!("New WebSocket connection established");
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // A page that connects while a recording is live must start listening
    // right away, not on the next state flip.
    if *desired.borrow_and_update() {
        if send_control(&mut ws_sender, ControlMessage::StartRecording)
            .await
            .is_err()
        {
            return;
        }
    }

    loop {
        tokio::select! {
            // Session state change -> control message to the extension
            changed = desired.changed() => {
                if changed.is_err() {
                    break;
                }
                let control = control_for(*desired.borrow_and_update());
                if send_control(&mut ws_sender, control).await.is_err() {
                    break;
                }
            }

            // Raw event from the extension -> session
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<PageEvent>(&text) {
                            Ok(event) => {
                                if event_tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                error!("Failed to parse event from extension: {} | Text: {}", e, text);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket closed");
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
}

async fn send_control<S>(ws_sender: &mut S, control: ControlMessage) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let json = match serde_json::to_string(&control) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to encode control message: {}", e);
            return Err(());
        }
    };
    if let Err(e) = ws_sender.send(Message::Text(json)).await {
        error!("Failed to send control message: {}", e);
        return Err(());
    }
    Ok(())
}
