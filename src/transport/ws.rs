//! WebSocket implementation of [`ConversationTransport`].
//!
//! One open socket maps to one session. A reader task turns provider
//! messages into [`TransportEvent`]s; a writer task owns the sink and
//! serializes audio chunks, pongs, and the close frame so the socket is
//! never written from two places.

use std::time::Duration;

use base64::Engine;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use super::protocol::{ClientEvent, ServerEvent, UserAudioChunk};
use super::{ConversationTransport, OpenSession, SessionHandle, TransportError, TransportEvent};
use crate::audio::AudioFrame;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const EVENT_BUFFER: usize = 64;

enum Command {
    Audio(Vec<u8>),
    Pong(u64),
    End,
}

pub struct RealtimeTransport;

impl RealtimeTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RealtimeTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ConversationTransport for RealtimeTransport {
    async fn open(
        &self,
        signed_url: &str,
        audio: mpsc::Receiver<AudioFrame>,
    ) -> Result<OpenSession, TransportError> {
        info!("opening streaming session");

        let (stream, _response) = timeout(CONNECT_TIMEOUT, connect_async(signed_url))
            .await
            .map_err(|_| TransportError::Connect("connection timed out".to_string()))?
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let (sink, source) = stream.split();
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(EVENT_BUFFER);

        tokio::spawn(write_loop(sink, cmd_rx));
        tokio::spawn(read_loop(source, event_tx, cmd_tx.clone()));
        tokio::spawn(forward_audio(audio, cmd_tx.clone()));

        Ok(OpenSession {
            events: event_rx,
            handle: Box::new(WsHandle { commands: cmd_tx }),
        })
    }
}

struct WsHandle {
    commands: mpsc::Sender<Command>,
}

#[async_trait::async_trait]
impl SessionHandle for WsHandle {
    async fn end(&self) -> Result<(), TransportError> {
        self.commands
            .send(Command::End)
            .await
            .map_err(|_| TransportError::Closed)
    }
}

async fn write_loop(
    mut sink: impl Sink<WsMessage, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    mut commands: mpsc::Receiver<Command>,
) {
    while let Some(cmd) = commands.recv().await {
        let result = match cmd {
            Command::Audio(pcm) => {
                let chunk = UserAudioChunk {
                    user_audio_chunk: base64::engine::general_purpose::STANDARD.encode(pcm),
                };
                match serde_json::to_string(&chunk) {
                    Ok(text) => sink.send(WsMessage::Text(text)).await,
                    Err(e) => {
                        warn!("failed to serialize audio chunk: {}", e);
                        Ok(())
                    }
                }
            }
            Command::Pong(event_id) => match serde_json::to_string(&ClientEvent::Pong { event_id })
            {
                Ok(text) => sink.send(WsMessage::Text(text)).await,
                Err(e) => {
                    warn!("failed to serialize pong: {}", e);
                    Ok(())
                }
            },
            Command::End => {
                if let Err(e) = sink.send(WsMessage::Close(None)).await {
                    warn!("failed to send close frame: {}", e);
                }
                break;
            }
        };

        if let Err(e) = result {
            warn!("websocket write failed: {}", e);
            break;
        }
    }

    debug!("transport write loop finished");
}

async fn read_loop(
    mut source: impl Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
    events: mpsc::Sender<TransportEvent>,
    commands: mpsc::Sender<Command>,
) {
    while let Some(message) = source.next().await {
        match message {
            Ok(WsMessage::Text(text)) => {
                let event = match serde_json::from_str::<ServerEvent>(&text) {
                    Ok(ev) => ev,
                    Err(e) => {
                        debug!("unparseable provider message: {}", e);
                        continue;
                    }
                };

                match event {
                    ServerEvent::ConversationInitiationMetadata { .. } => {
                        if events.send(TransportEvent::Connected).await.is_err() {
                            break;
                        }
                    }
                    ServerEvent::AgentResponse {
                        agent_response_event,
                    } => {
                        let ev = TransportEvent::Message {
                            source: "ai".to_string(),
                            text: agent_response_event.agent_response,
                        };
                        if events.send(ev).await.is_err() {
                            break;
                        }
                    }
                    ServerEvent::UserTranscript {
                        user_transcription_event,
                    } => {
                        let ev = TransportEvent::Message {
                            source: "user".to_string(),
                            text: user_transcription_event.user_transcript,
                        };
                        if events.send(ev).await.is_err() {
                            break;
                        }
                    }
                    ServerEvent::Ping { ping_event } => {
                        let _ = commands.send(Command::Pong(ping_event.event_id)).await;
                    }
                    ServerEvent::Other => {}
                }
            }
            Ok(WsMessage::Close(_)) => {
                debug!("provider closed the stream");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                let _ = events.send(TransportEvent::Error(e.to_string())).await;
                return;
            }
        }
    }

    let _ = events.send(TransportEvent::Disconnected).await;
    debug!("transport read loop finished");
}

async fn forward_audio(mut audio: mpsc::Receiver<AudioFrame>, commands: mpsc::Sender<Command>) {
    while let Some(frame) = audio.recv().await {
        let pcm: Vec<u8> = frame
            .samples
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();

        if commands.send(Command::Audio(pcm)).await.is_err() {
            break;
        }
    }

    debug!("audio forwarding finished");
}
