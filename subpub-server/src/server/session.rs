use std::collections::HashMap;
use std::net::SocketAddr;

use anyhow::bail;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use subpub::Subscription;
use subpub_protocol::{
    ErrorResponse, Event, Frame, FrameType, OpCode, ProtocolError, PublishRequest, RequestPayload,
    ResponsePayload, StatusCode, SubscribeRequest, UnsubscribeRequest,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::server::status::{empty_request, malformed, rejection};
use crate::types::{Publication, SharedEngine};

/// Serves one connection until the peer leaves, a frame cannot be decoded or
/// the server shuts down. Subscriptions opened on the connection never
/// outlive it.
pub(crate) async fn run(
    stream: TcpStream,
    peer: SocketAddr,
    engine: SharedEngine,
    shutdown: watch::Receiver<()>,
    outbound_buffer: usize,
) -> anyhow::Result<()> {
    let (reader, writer) = stream.into_split();
    let (outbound, outbound_rx) = mpsc::channel(outbound_buffer);
    // ends by itself once the session and every subscription handler are gone
    tokio::spawn(write_frames(writer, outbound_rx, peer));

    let mut session = Session {
        peer,
        engine,
        outbound,
        subscriptions: HashMap::new(),
    };
    let result = session.read_requests(reader, shutdown).await;
    session.release().await;
    result
}

struct Session {
    peer: SocketAddr,
    engine: SharedEngine,
    outbound: mpsc::Sender<Frame>,
    /// Keyed by the correlation id of the Subscribe request.
    subscriptions: HashMap<u32, Subscription<Publication>>,
}

impl Session {
    async fn read_requests(
        &mut self,
        mut reader: OwnedReadHalf,
        mut shutdown: watch::Receiver<()>,
    ) -> anyhow::Result<()> {
        let mut buf = BytesMut::with_capacity(4096);

        loop {
            let n = tokio::select! {
                read = reader.read_buf(&mut buf) => read.map_err(ProtocolError::IoError)?,
                _ = shutdown.changed() => {
                    debug!(peer = %self.peer, "closing session on shutdown");
                    return Ok(());
                }
            };

            if n == 0 {
                debug!(peer = %self.peer, "peer closed the connection");
                return Ok(());
            }

            while let Some(frame) = Frame::decode(&mut buf)? {
                if frame.frame_type != FrameType::Request {
                    warn!(peer = %self.peer, frame_type = ?frame.frame_type, "ignoring non-request frame");
                    continue;
                }

                let reply = self.dispatch(frame.correlation_id, frame.payload).await;
                if self.outbound.send(reply).await.is_err() {
                    bail!("connection writer is gone");
                }
            }
        }
    }

    async fn dispatch(&mut self, correlation_id: u32, payload: Bytes) -> Frame {
        let request = match RequestPayload::deserialize(payload) {
            Ok(request) => request,
            Err(e) => return error_frame(correlation_id, malformed(e)),
        };

        let outcome = match request.op_code {
            OpCode::Subscribe => self.subscribe(correlation_id, request.data).await,
            OpCode::Publish => self.publish(request.data).await,
            OpCode::Unsubscribe => self.unsubscribe(request.data).await,
        };

        match outcome {
            Ok(()) => Frame::new(
                FrameType::Response,
                correlation_id,
                ResponsePayload::ack(request.op_code).serialize(),
            ),
            Err(resp) => {
                debug!(
                    peer = %self.peer,
                    op = ?request.op_code,
                    status = ?resp.status,
                    message = %resp.message,
                    "request rejected"
                );
                error_frame(correlation_id, resp)
            }
        }
    }

    async fn subscribe(&mut self, subscription_id: u32, data: Bytes) -> Result<(), ErrorResponse> {
        let req = SubscribeRequest::deserialize(data).map_err(malformed)?;
        if req.subject.is_empty() {
            return Err(empty_request());
        }
        if self.subscriptions.contains_key(&subscription_id) {
            return Err(ErrorResponse::new(
                StatusCode::InvalidArgument,
                format!("subscription id {} already in use", subscription_id),
            ));
        }

        let events = self.outbound.clone();
        let subject = req.subject.clone();
        let handler = move |publication: Publication| {
            let event = Event {
                subject: subject.clone(),
                published_at: publication.published_at,
                data: publication.data,
            };
            let frame = Frame::new(FrameType::Event, subscription_id, event.serialize());
            // runs on the delivery thread, so waiting here holds back this
            // subscriber's mailbox rather than the runtime
            if events.blocking_send(frame).is_err() {
                debug!(subscription_id, "connection gone, event dropped");
            }
        };

        let subscription = self
            .engine
            .subscribe(&req.subject, handler)
            .await
            .map_err(|e| rejection("subscribe failed", &e))?;
        debug!(
            peer = %self.peer,
            subject = %req.subject,
            subscription_id,
            subscriber_id = subscription.id(),
            "subscription opened"
        );
        self.subscriptions.insert(subscription_id, subscription);
        Ok(())
    }

    async fn publish(&self, data: Bytes) -> Result<(), ErrorResponse> {
        let req = PublishRequest::deserialize(data).map_err(malformed)?;
        if req.subject.is_empty() || req.data.is_empty() {
            return Err(empty_request());
        }

        let publication = Publication {
            data: req.data,
            published_at: Utc::now().timestamp_millis().max(0) as u64,
        };
        self.engine
            .publish(&req.subject, publication)
            .await
            .map_err(|e| rejection("publish failed", &e))
    }

    async fn unsubscribe(&mut self, data: Bytes) -> Result<(), ErrorResponse> {
        let req = UnsubscribeRequest::deserialize(data).map_err(malformed)?;
        let subscription = self
            .subscriptions
            .remove(&req.subscription_id)
            .ok_or_else(|| {
                ErrorResponse::new(
                    StatusCode::NotFound,
                    format!("no subscription {}", req.subscription_id),
                )
            })?;
        subscription.unsubscribe().await;
        Ok(())
    }

    async fn release(&mut self) {
        let released = self.subscriptions.len();
        for (_, subscription) in self.subscriptions.drain() {
            subscription.unsubscribe().await;
        }
        if released > 0 {
            debug!(peer = %self.peer, released, "session subscriptions released");
        }
    }
}

fn error_frame(correlation_id: u32, resp: ErrorResponse) -> Frame {
    Frame::new(FrameType::Error, correlation_id, resp.serialize())
}

async fn write_frames(
    mut writer: OwnedWriteHalf,
    mut frames: mpsc::Receiver<Frame>,
    peer: SocketAddr,
) {
    let mut out = BytesMut::with_capacity(4096);

    while let Some(frame) = frames.recv().await {
        out.clear();
        frame.encode(&mut out);
        // coalesce whatever else is already queued into the same write
        while let Ok(next) = frames.try_recv() {
            next.encode(&mut out);
        }

        if let Err(e) = writer.write_all(&out).await {
            debug!(%peer, error = %e, "write failed, closing connection output");
            return;
        }
    }

    let _ = writer.shutdown().await;
}
