//! MCP transport layer implementations.
//!
//! Supports newline-delimited JSON over stdio (or any async byte pipe) and
//! the server side of the HTTP/SSE transport.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use crate::error::{Error, Result};
use crate::mcp::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// Buffered frames per direction before senders wait.
const CHANNEL_CAPACITY: usize = 100;

/// A message that can be sent or received.
#[derive(Debug, Clone)]
pub enum Message {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
}

impl Message {
    /// Decode one JSON-RPC frame.
    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        let has_id = value.get("id").is_some_and(|id| !id.is_null());

        if value.get("method").is_some() {
            if has_id {
                Ok(Message::Request(serde_json::from_value(value)?))
            } else {
                Ok(Message::Notification(serde_json::from_value(value)?))
            }
        } else if has_id && (value.get("result").is_some() || value.get("error").is_some()) {
            Ok(Message::Response(serde_json::from_value(value)?))
        } else {
            Err(Error::McpProtocol(
                "Frame is not a JSON-RPC request, response or notification".to_string(),
            ))
        }
    }

    /// Encode as a single-line JSON string.
    pub fn to_json(&self) -> Result<String> {
        let json = match self {
            Message::Request(req) => serde_json::to_string(req)?,
            Message::Response(res) => serde_json::to_string(res)?,
            Message::Notification(notif) => serde_json::to_string(notif)?,
        };
        Ok(json)
    }
}

/// Transport trait for MCP communication.
#[async_trait]
pub trait Transport: Send {
    /// Start the transport, returning channels for messages.
    async fn start(&mut self) -> Result<(mpsc::Receiver<Message>, mpsc::Sender<Message>)>;

    /// Stop the transport.
    async fn stop(&mut self) -> Result<()>;
}

/// Newline-delimited JSON-RPC over an async reader/writer pair.
pub struct LineTransport<R, W> {
    io: Option<(R, W)>,
    writer_task: Option<JoinHandle<()>>,
}

/// Stdio transport for MCP. One instance lives for the whole process.
pub type StdioTransport = LineTransport<Stdin, Stdout>;

impl StdioTransport {
    /// Create a new stdio transport.
    pub fn new() -> Self {
        Self::from_io(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> LineTransport<R, W> {
    /// Wrap an arbitrary reader/writer pair.
    pub fn from_io(reader: R, writer: W) -> Self {
        Self {
            io: Some((reader, writer)),
            writer_task: None,
        }
    }
}

#[async_trait]
impl<R, W> Transport for LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn start(&mut self) -> Result<(mpsc::Receiver<Message>, mpsc::Sender<Message>)> {
        let (reader, mut writer) = self
            .io
            .take()
            .ok_or_else(|| Error::Internal("transport already started".to_string()))?;

        // Channel for incoming messages (from the reader)
        let (incoming_tx, incoming_rx) = mpsc::channel::<Message>(CHANNEL_CAPACITY);
        // Channel for outgoing messages (to the writer)
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        debug!("EOF on input, stopping transport");
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }

                        trace!("Received: {}", trimmed);

                        match Message::parse(trimmed) {
                            Ok(msg) => {
                                if incoming_tx.send(msg).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => error!("Failed to parse message: {} ({})", trimmed, e),
                        }
                    }
                    Err(e) => {
                        error!("Error reading input: {}", e);
                        break;
                    }
                }
            }
        });

        let writer_task = tokio::spawn(async move {
            while let Some(msg) = outgoing_rx.recv().await {
                let json = match msg.to_json() {
                    Ok(s) => s,
                    Err(e) => {
                        error!("Error serializing message: {}", e);
                        continue;
                    }
                };

                trace!("Sending: {}", json);
                if let Err(e) = writer.write_all(json.as_bytes()).await {
                    error!("Error writing output: {}", e);
                    break;
                }
                if let Err(e) = writer.write_all(b"\n").await {
                    error!("Error writing newline: {}", e);
                    break;
                }
                if let Err(e) = writer.flush().await {
                    error!("Error flushing output: {}", e);
                    break;
                }
            }
        });
        self.writer_task = Some(writer_task);

        Ok((incoming_rx, outgoing_tx))
    }

    /// Waits for queued output to be written. Every outgoing sender must have
    /// been dropped first.
    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.writer_task.take() {
            task.await
                .map_err(|e| Error::Internal(format!("writer task failed: {}", e)))?;
        }
        Ok(())
    }
}

/// Server side of one SSE session.
///
/// Frames pushed with [`SseTransport::send`] are drained by the open SSE
/// response. Client frames arrive separately as HTTP POSTs.
#[derive(Debug)]
pub struct SseTransport {
    session_id: String,
    sender: mpsc::Sender<Message>,
    closed: AtomicBool,
}

impl SseTransport {
    /// Create a transport for `session_id`, returning the receiving half that
    /// feeds the event stream.
    pub fn new(session_id: impl Into<String>) -> (Arc<Self>, mpsc::Receiver<Message>) {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        let transport = Arc::new(Self {
            session_id: session_id.into(),
            sender,
            closed: AtomicBool::new(false),
        });
        (transport, receiver)
    }

    /// The session this transport belongs to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Push one frame onto the stream.
    pub async fn send(&self, message: Message) -> Result<()> {
        if self.is_closed() {
            return Err(Error::TransportClosed(self.session_id.clone()));
        }

        self.sender.send(message).await.map_err(|_| {
            self.closed.store(true, Ordering::SeqCst);
            Error::TransportClosed(self.session_id.clone())
        })
    }

    /// Mark the transport closed. Later sends fail.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// True once closed explicitly or once the stream side has gone away.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.sender.is_closed()
    }
}
