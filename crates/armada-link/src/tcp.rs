//! TCP link to a radio modem daemon.
//!
//! The serial modem is owned by a small daemon (one per base station)
//! that exposes it over TCP as newline-delimited JSON frames:
//!
//! ```text
//! {"a": "<source or destination address>", "p": { ...envelope... }}
//! ```
//!
//! The address `"*"` addresses every modem in range (broadcast).
//!
//! [`TcpModemLink::open`] spawns an internal socket-reader task so that
//! `read_frame` stays a non-blocking poll as the [`RadioLink`] contract
//! requires; a lost connection surfaces as a read error, which sends the
//! bridge back to its supervisor for a reconnect.

use armada_types::ArmadaError;
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::link::{LinkAddress, RadioLink, RawFrame};

/// Wildcard destination understood by the modem daemon.
pub const BROADCAST_ADDR: &str = "*";

/// Frames buffered between the socket-reader task and `read_frame`.
const FRAME_BUFFER: usize = 256;

/// Radio link backed by a TCP connection to the modem daemon.
pub struct TcpModemLink {
    endpoint: String,
    frames: Option<mpsc::Receiver<RawFrame>>,
    writer: Option<OwnedWriteHalf>,
    reader_task: Option<JoinHandle<()>>,
}

impl TcpModemLink {
    /// Create an unopened link to `endpoint` (`host:port`).
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            frames: None,
            writer: None,
            reader_task: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn teardown(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        self.writer = None;
        self.frames = None;
    }

    async fn write_frame(&mut self, address: &str, payload: &[u8]) -> Result<(), ArmadaError> {
        // Payloads are always JSON envelopes; re-embed rather than
        // double-encode so the daemon sees one object per line.
        let body: Value =
            serde_json::from_slice(payload).map_err(|e| ArmadaError::transport("write", e))?;
        let mut line = json!({"a": address, "p": body}).to_string();
        line.push('\n');

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| ArmadaError::transport("write", "link not open"))?;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ArmadaError::transport("write", e))
    }

    fn parse_line(line: &str) -> Option<RawFrame> {
        let value: Value = serde_json::from_str(line).ok()?;
        let address = value.get("a")?.as_str()?;
        let payload = value.get("p")?;
        Some(RawFrame {
            source: LinkAddress::new(address),
            payload: payload.to_string().into_bytes(),
        })
    }
}

#[async_trait]
impl RadioLink for TcpModemLink {
    async fn open(&mut self) -> Result<(), ArmadaError> {
        self.teardown();

        let stream = TcpStream::connect(&self.endpoint)
            .await
            .map_err(|e| ArmadaError::transport("open", e))?;
        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::channel(FRAME_BUFFER);

        self.reader_task = Some(tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match TcpModemLink::parse_line(&line) {
                        Some(frame) => {
                            if tx.send(frame).await.is_err() {
                                break;
                            }
                        }
                        None => warn!("modem daemon sent an unparseable frame, skipping"),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "modem socket read error");
                        break;
                    }
                }
            }
            // Dropping `tx` here is what turns `read_frame` into an error
            // and sends the bridge back to the supervisor.
        }));

        self.writer = Some(write_half);
        self.frames = Some(rx);
        info!(endpoint = %self.endpoint, "modem link open");
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Option<RawFrame>, ArmadaError> {
        let frames = self
            .frames
            .as_mut()
            .ok_or_else(|| ArmadaError::transport("read", "link not open"))?;
        match frames.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                Err(ArmadaError::transport("read", "modem connection lost"))
            }
        }
    }

    async fn send(&mut self, address: &LinkAddress, payload: &[u8]) -> Result<(), ArmadaError> {
        self.write_frame(address.as_str(), payload).await
    }

    async fn broadcast(&mut self, payload: &[u8]) -> Result<(), ArmadaError> {
        self.write_frame(BROADCAST_ADDR, payload).await
    }

    async fn close(&mut self) {
        self.teardown();
        info!(endpoint = %self.endpoint, "modem link closed");
    }
}
