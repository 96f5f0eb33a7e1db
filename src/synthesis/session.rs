//! Streaming synthesis session
//!
//! One session drives exactly one request through the realtime
//! protocol: connect, await the creation acknowledgment, send
//! configuration + text + finish, then drain audio events to the
//! caller's frame callback. No retries happen here; a session either
//! fully succeeds or fails once, and the caller owns retry policy.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::protocol::{ClientEvent, ServerEvent, SessionParams};
use super::request::SynthesisRequest;
use crate::cache::AudioCache;
use crate::{Error, Result};

/// Production realtime endpoint
pub const DEFAULT_ENDPOINT: &str = "wss://dashscope.aliyuncs.com/api-ws/v1/realtime";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

/// Protocol phases, entered in order and never revisited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Opening the transport
    Connecting,
    /// Waiting for the mandatory creation acknowledgment
    AwaitingCreated,
    /// Sending configuration, text, and the finish directive
    Streaming,
    /// Reading audio events until a terminal event
    Draining,
    /// Terminal success
    Finished,
    /// Terminal failure
    Failed,
}

/// Single-use orchestrator for one synthesis request
///
/// Owns the transport and the state machine for the duration of the
/// request, consults the cache before opening any connection, and
/// writes back to it on success. Consumed by [`run`](Self::run), so a
/// session cannot be reused across requests.
pub struct SynthesisSession<'a> {
    api_key: String,
    endpoint: String,
    cache: Option<&'a AudioCache>,
    state: SessionState,
}

impl<'a> SynthesisSession<'a> {
    /// Create a session against the production endpoint
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            cache: None,
            state: SessionState::Connecting,
        }
    }

    /// Override the endpoint URL (tests point this at a local server)
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Attach an audio cache consulted before the network and written
    /// back on success
    #[must_use]
    pub fn with_cache(mut self, cache: &'a AudioCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Run the request to completion, forwarding every audio frame to
    /// `on_frame` in receipt order
    ///
    /// On a cache hit no transport is opened and the callback receives
    /// the cached bytes. Frames already delivered are never retracted
    /// by a later failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] on connect/read/write failure or an
    /// end-of-stream without a terminal event, [`Error::Protocol`] on
    /// events violating the mandatory ordering, and [`Error::Server`]
    /// when the server reports an explicit error
    pub async fn run<F>(mut self, request: &SynthesisRequest, mut on_frame: F) -> Result<()>
    where
        F: FnMut(&[u8]),
    {
        if let Some(cache) = self.cache {
            let key = request.fingerprint();
            if let Some(pcm) = cache.lookup(&key).await {
                tracing::debug!(key = %key, bytes = pcm.len(), "cache hit");
                on_frame(&pcm);
                self.transition(SessionState::Finished);
                return Ok(());
            }
        }

        let (mut writer, mut reader) = match self.connect(&request.model).await {
            Ok(pair) => pair,
            Err(e) => {
                self.transition(SessionState::Failed);
                return Err(e);
            }
        };

        self.transition(SessionState::AwaitingCreated);
        if let Err(e) = Self::await_created(&mut reader).await {
            self.transition(SessionState::Failed);
            return Err(e);
        }

        self.transition(SessionState::Streaming);
        if let Err(e) = Self::send_request(&mut writer, request).await {
            self.transition(SessionState::Failed);
            return Err(e);
        }

        self.transition(SessionState::Draining);
        let mut collected = Vec::new();
        match Self::drain(&mut reader, &mut on_frame, &mut collected).await {
            Ok(()) => {
                let _ = writer.close().await;
                self.transition(SessionState::Finished);
                if let Some(cache) = self.cache {
                    cache.store(&request.fingerprint(), &collected).await;
                }
                Ok(())
            }
            Err(e) => {
                self.transition(SessionState::Failed);
                Err(e)
            }
        }
    }

    async fn connect(&self, model: &str) -> Result<(WsWriter, WsReader)> {
        let url = format!("{}?model={model}", self.endpoint);

        let mut ws_request = url
            .into_client_request()
            .map_err(|e| Error::Transport(format!("invalid endpoint: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| Error::Transport(format!("invalid credential: {e}")))?;
        ws_request.headers_mut().insert(AUTHORIZATION, bearer);

        tracing::debug!(model, "opening synthesis transport");
        let (stream, _response) = connect_async(ws_request)
            .await
            .map_err(|e| Error::Transport(format!("websocket dial: {e}")))?;
        Ok(stream.split())
    }

    async fn await_created(reader: &mut WsReader) -> Result<()> {
        match next_inbound(reader).await? {
            Inbound::Text(text) => match ServerEvent::parse(&text) {
                Some(ServerEvent::SessionCreated) => Ok(()),
                Some(event) => Err(Error::Protocol(format!(
                    "expected session.created, got {event:?}"
                ))),
                None => Err(Error::Protocol("unparseable first event".to_string())),
            },
            Inbound::Binary => Err(Error::Protocol(
                "expected session.created, got binary frame".to_string(),
            )),
            Inbound::Closed => Err(Error::Transport(
                "connection closed before session.created".to_string(),
            )),
        }
    }

    async fn send_request(writer: &mut WsWriter, request: &SynthesisRequest) -> Result<()> {
        let events = [
            ClientEvent::SessionUpdate {
                session: SessionParams::for_request(request),
            },
            ClientEvent::TextAppend {
                text: request.text.clone(),
            },
            ClientEvent::Finish,
        ];

        for event in events {
            let json = event.to_json()?;
            writer
                .send(Message::text(json))
                .await
                .map_err(|e| Error::Transport(format!("write: {e}")))?;
        }
        Ok(())
    }

    async fn drain<F>(reader: &mut WsReader, on_frame: &mut F, collected: &mut Vec<u8>) -> Result<()>
    where
        F: FnMut(&[u8]),
    {
        loop {
            let text = match next_inbound(reader).await? {
                Inbound::Text(text) => text,
                // Unexpected frame kinds are skipped like unknown events
                Inbound::Binary => continue,
                Inbound::Closed => {
                    return Err(Error::Transport(
                        "connection closed before session.finished".to_string(),
                    ));
                }
            };

            match ServerEvent::parse(&text) {
                Some(ServerEvent::AudioDelta { delta }) => {
                    let pcm = BASE64
                        .decode(delta)
                        .map_err(|e| Error::Protocol(format!("invalid audio payload: {e}")))?;
                    on_frame(&pcm);
                    collected.extend_from_slice(&pcm);
                }
                Some(ServerEvent::ResponseDone) => {
                    tracing::trace!("response turn complete");
                }
                Some(ServerEvent::SessionFinished) => return Ok(()),
                Some(ServerEvent::Error { raw }) => return Err(Error::Server(raw)),
                Some(ServerEvent::SessionCreated) => {
                    return Err(Error::Protocol(
                        "unexpected session.created while draining".to_string(),
                    ));
                }
                Some(ServerEvent::Unknown { raw }) => {
                    tracing::trace!(event = %raw, "ignoring unrecognized event");
                }
                None => {
                    tracing::trace!("ignoring unparseable event");
                }
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        tracing::trace!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }
}

enum Inbound {
    Text(String),
    Binary,
    Closed,
}

/// Next data frame, skipping control frames the library answers itself
async fn next_inbound(reader: &mut WsReader) -> Result<Inbound> {
    loop {
        match reader.next().await {
            None => return Ok(Inbound::Closed),
            Some(Err(e)) => return Err(Error::Transport(format!("read: {e}"))),
            Some(Ok(Message::Text(text))) => return Ok(Inbound::Text(text.as_str().to_owned())),
            Some(Ok(Message::Binary(_))) => return Ok(Inbound::Binary),
            Some(Ok(Message::Close(_))) => return Ok(Inbound::Closed),
            Some(Ok(_)) => {}
        }
    }
}
