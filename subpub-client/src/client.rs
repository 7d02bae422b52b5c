use std::collections::{HashSet, VecDeque};

use anyhow::Context;
use bytes::{Bytes, BytesMut};
use subpub_protocol::{
    ErrorResponse, Event, Frame, FrameType, OpCode, ProtocolError, PublishRequest, RequestPayload,
    ResponsePayload, SubscribeRequest, UnsubscribeRequest,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// A message delivered to one of this connection's subscriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedEvent {
    pub subscription_id: u32,
    pub subject: String,
    pub published_at: u64,
    pub data: Bytes,
}

impl ReceivedEvent {
    fn from_frame(frame: Frame) -> Result<Self, ProtocolError> {
        let event = Event::deserialize(frame.payload)?;
        Ok(ReceivedEvent {
            subscription_id: frame.correlation_id,
            subject: event.subject,
            published_at: event.published_at,
            data: event.data,
        })
    }
}

pub struct SubPubClient {
    stream: TcpStream,
    correlation_id: u32,
    buf: BytesMut,
    /// Ids of open subscriptions; new requests never reuse them.
    subscriptions: HashSet<u32>,
    /// Events that showed up while a response was awaited.
    pending_events: VecDeque<ReceivedEvent>,
}

impl SubPubClient {
    pub async fn connect(addr: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .context("Failed to connect to SubPub server")?;

        Ok(SubPubClient {
            stream,
            correlation_id: 0,
            buf: BytesMut::with_capacity(4096),
            subscriptions: HashSet::new(),
            pending_events: VecDeque::new(),
        })
    }

    async fn send_request(&mut self, op_code: OpCode, data: Bytes) -> Result<u32, ProtocolError> {
        self.correlation_id = next_correlation_id(self.correlation_id, &self.subscriptions);

        let payload = RequestPayload::new(op_code, data);
        let frame = Frame::new(FrameType::Request, self.correlation_id, payload.serialize());

        let mut buf = BytesMut::new();
        frame.encode(&mut buf);
        self.stream
            .write_all(&buf)
            .await
            .map_err(ProtocolError::IoError)?;
        Ok(self.correlation_id)
    }

    async fn read_frame(&mut self) -> Result<Frame, ProtocolError> {
        loop {
            if let Some(frame) = Frame::decode(&mut self.buf)? {
                return Ok(frame);
            }

            let n = self
                .stream
                .read_buf(&mut self.buf)
                .await
                .map_err(ProtocolError::IoError)?;
            if n == 0 {
                return Err(ProtocolError::ConnectionClosed);
            }
        }
    }

    /// Reads until the answer to `correlation_id` arrives, parking any
    /// events in between.
    async fn read_response(
        &mut self,
        correlation_id: u32,
        op_code: OpCode,
    ) -> Result<Bytes, ProtocolError> {
        loop {
            let frame = self.read_frame().await?;
            match frame.frame_type {
                FrameType::Event => {
                    let event = ReceivedEvent::from_frame(frame)?;
                    self.pending_events.push_back(event);
                }
                FrameType::Response if frame.correlation_id == correlation_id => {
                    return ResponsePayload::deserialize(frame.payload)?.expect_op(op_code);
                }
                FrameType::Error if frame.correlation_id == correlation_id => {
                    return Err(ErrorResponse::deserialize(frame.payload)?.into_error());
                }
                other => {
                    return Err(ProtocolError::PayloadError(format!(
                        "unexpected {:?} frame for correlation id {} while waiting on {}",
                        other, frame.correlation_id, correlation_id
                    )));
                }
            }
        }
    }

    pub async fn publish(&mut self, subject: &str, data: &[u8]) -> Result<(), ProtocolError> {
        let req = PublishRequest {
            subject: subject.to_string(),
            data: Bytes::copy_from_slice(data),
        };

        let id = self.send_request(OpCode::Publish, req.serialize()).await?;
        self.read_response(id, OpCode::Publish).await?;
        Ok(())
    }

    /// Opens a subscription and returns its id. Events for it carry the same
    /// id in [`ReceivedEvent::subscription_id`].
    pub async fn subscribe(&mut self, subject: &str) -> Result<u32, ProtocolError> {
        let req = SubscribeRequest {
            subject: subject.to_string(),
        };

        let id = self.send_request(OpCode::Subscribe, req.serialize()).await?;
        self.read_response(id, OpCode::Subscribe).await?;
        self.subscriptions.insert(id);
        Ok(id)
    }

    pub async fn unsubscribe(&mut self, subscription_id: u32) -> Result<(), ProtocolError> {
        let req = UnsubscribeRequest { subscription_id };

        let id = self.send_request(OpCode::Unsubscribe, req.serialize()).await?;
        self.read_response(id, OpCode::Unsubscribe).await?;
        self.subscriptions.remove(&subscription_id);
        Ok(())
    }

    /// Waits for the next event on any subscription of this connection.
    pub async fn next_event(&mut self) -> Result<ReceivedEvent, ProtocolError> {
        if let Some(event) = self.pending_events.pop_front() {
            return Ok(event);
        }

        let frame = self.read_frame().await?;
        match frame.frame_type {
            FrameType::Event => ReceivedEvent::from_frame(frame),
            other => Err(ProtocolError::PayloadError(format!(
                "unexpected {:?} frame while waiting for events",
                other
            ))),
        }
    }
}

/// Next id after `current`, wrapping around and skipping ids still held by
/// open subscriptions.
fn next_correlation_id(current: u32, open: &HashSet<u32>) -> u32 {
    let mut id = current.wrapping_add(1);
    while open.contains(&id) {
        id = id.wrapping_add(1);
    }
    id
}
