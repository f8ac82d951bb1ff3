use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use heartline_common::{ClientFrame, ServerFrame};

/// What the consumer sees coming off a channel, in receipt order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Frame(ServerFrame),

    /// The connection is gone — server close, network failure, and local
    /// `close()` all look the same. Delivered exactly once, last.
    Closed,
}

/// One live duplex connection to the matching backend.
///
/// Opening the channel sends the session credential as the first frame on
/// the socket. Each view owns at most one channel and tears it down on every
/// exit path; dropping the value closes the connection too.
pub struct SessionChannel {
    out_tx: mpsc::Sender<ClientFrame>,
    event_rx: mpsc::Receiver<ChannelEvent>,
    shutdown: CancellationToken,
}

impl SessionChannel {
    /// Connect and immediately hand over the caller's session credential.
    pub async fn open(url: &str, sessid: &str) -> Result<Self> {
        let (ws_stream, _) = connect_async(url)
            .await
            .with_context(|| format!("connecting live channel at {url}"))?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        // Handshake goes out before anything else touches the socket.
        let handshake = serde_json::to_string(&ClientFrame::handshake(sessid))?;
        ws_sender
            .send(WsMessage::Text(handshake.into()))
            .await
            .context("sending live-channel handshake")?;

        let (out_tx, mut out_rx) = mpsc::channel::<ClientFrame>(100);
        let (event_tx, event_rx) = mpsc::channel::<ChannelEvent>(100);
        let shutdown = CancellationToken::new();

        // Task: serialize outbound frames onto the socket
        let send_token = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = send_token.cancelled() => break,
                    frame = out_rx.recv() => {
                        let Some(frame) = frame else { break };
                        let json = match serde_json::to_string(&frame) {
                            Ok(j) => j,
                            Err(_) => continue,
                        };
                        if ws_sender.send(WsMessage::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
            }
            let _ = ws_sender.close().await;
        });

        // Task: decode inbound frames and report the close, whatever caused it
        let recv_token = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = recv_token.cancelled() => break,
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(WsMessage::Text(text))) => {
                                let frame = ServerFrame::decode(&text);
                                if event_tx.send(ChannelEvent::Frame(frame)).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(WsMessage::Close(_))) | None => break,
                            Some(Ok(_)) => continue,
                            Some(Err(err)) => {
                                debug!("live channel read error: {err}");
                                break;
                            }
                        }
                    }
                }
            }
            // Wake the send half so the socket actually goes away.
            recv_token.cancel();
            let _ = event_tx.send(ChannelEvent::Closed).await;
        });

        Ok(Self {
            out_tx,
            event_rx,
            shutdown,
        })
    }

    /// Next event in receipt order. After `Closed` has been delivered this
    /// only ever returns `None`.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.event_rx.recv().await
    }

    /// Best-effort transmit: frames offered to a channel that is no longer
    /// open are dropped silently.
    pub fn send(&self, frame: ClientFrame) {
        if self.shutdown.is_cancelled() || self.out_tx.try_send(frame).is_err() {
            debug!("dropping frame offered to a closed channel");
        }
    }

    /// Tear the connection down. Safe to call any number of times, including
    /// on a channel that never finished opening.
    pub fn close(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for SessionChannel {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
