//! Request/response client for a fleet node

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use robofleet_shared::codec::{FrameDecoder, FrameEncoder};
use robofleet_shared::{Envelope, Header, Payload, Request, Response};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

/// A single console connection to a node
pub struct FleetClient {
    client_id: String,
    stream: TcpStream,
    decoder: FrameDecoder,
    encoder: FrameEncoder,
    sequence_id: u64,
    request_timeout: Duration,
}

impl FleetClient {
    pub async fn connect(
        addr: &str,
        client_id: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("connecting to node at {}", addr))?;
        debug!("Connected to {}", addr);

        Ok(Self {
            client_id: client_id.into(),
            stream,
            decoder: FrameDecoder::new(),
            encoder: FrameEncoder::new(),
            sequence_id: 0,
            request_timeout,
        })
    }

    fn next_sequence_id(&mut self) -> u64 {
        self.sequence_id += 1;
        self.sequence_id
    }

    /// Send `request` and wait for the response that acknowledges it
    pub async fn request(&mut self, request: Request) -> Result<Response> {
        let seq = self.next_sequence_id();
        let kind = request.name();

        self.encoder
            .encode(&Envelope::request(&self.client_id, seq, request))?;
        let frame: Bytes = self.encoder.take();
        self.stream.write_all(&frame).await?;
        debug!("Sent {} (seq={}, {} bytes)", kind, seq, frame.len());

        match timeout(self.request_timeout, self.await_reply(seq)).await {
            Ok(reply) => reply,
            Err(_) => bail!(
                "no response to {} (seq={}) within {:?}",
                kind,
                seq,
                self.request_timeout
            ),
        }
    }

    async fn await_reply(&mut self, seq: u64) -> Result<Response> {
        let mut buf = vec![0u8; 4096];
        loop {
            while let Some(envelope) = self.decoder.decode_next()? {
                let ack = envelope.header.ack_sequence_id;
                match envelope.payload {
                    Payload::Response(response) if ack == Some(seq) => return Ok(response),
                    // the node could not read our request
                    Payload::Response(response)
                        if ack == Some(Header::UNREADABLE_ACK) && response.is_error() =>
                    {
                        return Ok(response)
                    }
                    _ => warn!(
                        "Ignoring frame from {} (ack={:?}), waiting for seq={}",
                        envelope.header.sender_id, ack, seq
                    ),
                }
            }

            let n = self.stream.read(&mut buf).await?;
            if n == 0 {
                bail!("node closed the connection before answering seq={}", seq);
            }
            self.decoder.extend(&buf[..n]);
        }
    }
}
