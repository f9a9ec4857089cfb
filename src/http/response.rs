//! Response relay.
//!
//! # Responsibilities
//! - Copy the backend status and headers to the client response
//! - Stream the backend body to the client in small chunks as it arrives
//!
//! # Design Decisions
//! - The body is relayed frame by frame; no bulk copy and no buffering of the
//!   whole response. Every chunk is handed to the client connection as soon as
//!   it is read, and the connection flushes whenever the relay has nothing else
//!   ready, so event streams are delivered promptly
//! - Frames larger than [`RELAY_CHUNK_SIZE`] are split without copying
//! - A client that goes away simply drops the relay, which drops the backend body
//! - Trailers are not relayed

use std::error::Error as StdError;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::body::Body;
use axum::http::{Response, StatusCode};
use hyper::body::{Body as HttpBody, Bytes, Frame, SizeHint};
use thiserror::Error;

use crate::observability::metrics;

/// Largest body frame handed to the client connection at once.
pub const RELAY_CHUNK_SIZE: usize = 4096;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Backend body failure after the response head was sent.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("error reading from backend: {0}")]
    Upstream(#[source] BoxError),
}

/// Build the client response for a backend response.
pub fn relay_response<B>(response: Response<B>) -> Response<Body>
where
    B: HttpBody<Data = Bytes> + Send + Unpin + 'static,
    B::Error: Into<BoxError>,
{
    let (parts, body) = response.into_parts();
    let relay = ChunkedRelay::new(body, parts.status);
    Response::from_parts(parts, Body::new(relay))
}

/// Body that relays an upstream body in chunks of at most
/// [`RELAY_CHUNK_SIZE`] bytes.
pub struct ChunkedRelay<B> {
    upstream: B,
    pending: Bytes,
    status: StatusCode,
    relayed: u64,
    finished: bool,
}

impl<B> ChunkedRelay<B> {
    pub fn new(upstream: B, status: StatusCode) -> Self {
        Self {
            upstream,
            pending: Bytes::new(),
            status,
            relayed: 0,
            finished: false,
        }
    }

    fn next_chunk(&mut self) -> Frame<Bytes> {
        let len = self.pending.len().min(RELAY_CHUNK_SIZE);
        self.relayed += len as u64;
        Frame::data(self.pending.split_to(len))
    }
}

impl<B> HttpBody for ChunkedRelay<B>
where
    B: HttpBody<Data = Bytes> + Unpin,
    B::Error: Into<BoxError>,
{
    type Data = Bytes;
    type Error = RelayError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, RelayError>>> {
        let this = self.get_mut();
        loop {
            if !this.pending.is_empty() {
                return Poll::Ready(Some(Ok(this.next_chunk())));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match ready!(Pin::new(&mut this.upstream).poll_frame(cx)) {
                Some(Ok(frame)) => {
                    if let Ok(data) = frame.into_data() {
                        this.pending = data;
                    }
                }
                Some(Err(e)) => {
                    this.finished = true;
                    let e: BoxError = e.into();
                    tracing::error!(error = %e, relayed_bytes = this.relayed, "Error reading from backend");
                    return Poll::Ready(Some(Err(RelayError::Upstream(e))));
                }
                None => {
                    this.finished = true;
                    metrics::record_relayed_bytes(this.relayed);
                    tracing::info!(
                        status_code = this.status.as_u16(),
                        relayed_bytes = this.relayed,
                        "Request completed"
                    );
                    return Poll::Ready(None);
                }
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.finished && self.pending.is_empty()
    }

    fn size_hint(&self) -> SizeHint {
        let buffered = self.pending.len() as u64;
        if self.finished {
            return SizeHint::with_exact(buffered);
        }
        let upstream = self.upstream.size_hint();
        let mut hint = SizeHint::new();
        hint.set_lower(upstream.lower() + buffered);
        if let Some(upper) = upstream.upper() {
            hint.set_upper(upper + buffered);
        }
        hint
    }
}

impl<B> Drop for ChunkedRelay<B> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(relayed_bytes = self.relayed, "Client connection closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use http_body_util::{BodyExt, Full, StreamBody};
    use std::convert::Infallible;

    #[tokio::test]
    async fn large_frame_is_split_in_order() {
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let mut relay = ChunkedRelay::new(Full::new(Bytes::from(payload.clone())), StatusCode::OK);

        let mut sizes = Vec::new();
        let mut received = Vec::new();
        while let Some(frame) = relay.frame().await {
            let data = frame.unwrap().into_data().unwrap();
            sizes.push(data.len());
            received.extend_from_slice(&data);
        }

        assert_eq!(sizes, [4096, 4096, 1808]);
        assert_eq!(received, payload);
        assert!(relay.is_end_stream());
    }

    #[tokio::test]
    async fn small_frames_pass_through_one_by_one() {
        let frames = stream::iter(vec![
            Ok::<_, Infallible>(Frame::data(Bytes::from_static(b"data: 1\n\n"))),
            Ok(Frame::data(Bytes::from_static(b"data: 2\n\n"))),
        ]);
        let mut relay = ChunkedRelay::new(StreamBody::new(frames), StatusCode::OK);

        let first = relay.frame().await.unwrap().unwrap().into_data().unwrap();
        assert_eq!(first, "data: 1\n\n");
        let second = relay.frame().await.unwrap().unwrap().into_data().unwrap();
        assert_eq!(second, "data: 2\n\n");
        assert!(relay.frame().await.is_none());
    }

    #[tokio::test]
    async fn upstream_error_stops_the_relay() {
        let frames = stream::iter(vec![
            Ok(Frame::data(Bytes::from_static(b"partial"))),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ]);
        let mut relay = ChunkedRelay::new(StreamBody::new(frames), StatusCode::OK);

        let first = relay.frame().await.unwrap().unwrap();
        assert_eq!(first.into_data().unwrap(), "partial");

        let err = relay.frame().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("reset"));
        assert!(relay.frame().await.is_none());
    }

    #[tokio::test]
    async fn trailers_are_dropped() {
        let mut trailers = axum::http::HeaderMap::new();
        trailers.insert("x-checksum", "abc".parse().unwrap());
        let frames = stream::iter(vec![
            Ok::<_, Infallible>(Frame::data(Bytes::from_static(b"body"))),
            Ok(Frame::trailers(trailers)),
        ]);
        let relay = ChunkedRelay::new(StreamBody::new(frames), StatusCode::OK);

        let collected = relay.collect().await.unwrap();
        assert!(collected.trailers().is_none());
        assert_eq!(collected.to_bytes(), "body");
    }

    #[test]
    fn size_hint_tracks_exact_upstream() {
        let relay = ChunkedRelay::new(Full::new(Bytes::from_static(b"hello")), StatusCode::OK);
        assert_eq!(relay.size_hint().exact(), Some(5));
    }

    #[tokio::test]
    async fn relay_response_copies_head() {
        let upstream = Response::builder()
            .status(StatusCode::ACCEPTED)
            .header("content-type", "text/event-stream")
            .header("x-multi", "1")
            .header("x-multi", "2")
            .body(Full::new(Bytes::from_static(b"ok")))
            .unwrap();

        let response = relay_response(upstream);
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()["content-type"], "text/event-stream");
        let multi: Vec<_> = response.headers().get_all("x-multi").iter().collect();
        assert_eq!(multi, ["1", "2"]);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "ok");
    }
}
