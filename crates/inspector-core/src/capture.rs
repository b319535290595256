//! Body capture with replay.
//!
//! A request body is a single-consumption stream. [`capture_request`] drains
//! it into memory and puts an equivalent [`ReplayBody`] back into the
//! request, so handlers further down the pipeline read exactly the bytes
//! they would have read without the recorder.

use crate::error::{BoxError, InspectorError};
use bytes::{Bytes, BytesMut};
use http::Request;
use http_body::Body;
use http_body_util::{BodyExt, Full};
use std::pin::pin;

/// Body type handed to downstream handlers after capture.
pub type ReplayBody = Full<Bytes>;

/// Bytes drained from a request body.
#[derive(Debug)]
pub struct CapturedBody {
    bytes: Bytes,
    error: Option<InspectorError>,
}

impl CapturedBody {
    /// Every byte that was read, including a partial read before a failure.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// The stream error, when the body could not be read to the end.
    pub fn error(&self) -> Option<&InspectorError> {
        self.error.as_ref()
    }

    /// Whether the body was read to completion.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Text stored in the record.
    ///
    /// Empty when the read failed. Invalid UTF-8 is replaced, and the text is
    /// cut to `max_bytes` when a limit is given.
    pub fn recorded_text(&self, max_bytes: Option<usize>) -> String {
        if !self.is_complete() {
            return String::new();
        }
        let bytes = match max_bytes {
            Some(max) if self.bytes.len() > max => &self.bytes[..max],
            _ => &self.bytes[..],
        };
        String::from_utf8_lossy(bytes).into_owned()
    }

    /// Fresh body holding the same bytes.
    pub fn replay(&self) -> ReplayBody {
        Full::new(self.bytes.clone())
    }
}

/// Drain `body` frame by frame.
///
/// Trailers are ignored. A stream error stops the read and is kept on the
/// result alongside the bytes that arrived before it.
pub async fn capture_body<B>(body: B) -> CapturedBody
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let mut body = pin!(body);
    let mut buf = BytesMut::new();

    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                if let Ok(data) = frame.into_data() {
                    buf.extend_from_slice(&data);
                }
            }
            Err(err) => {
                let err = InspectorError::BodyRead(err.into());
                tracing::warn!(error = %err, read_bytes = buf.len(), "Request body capture failed");
                return CapturedBody {
                    bytes: buf.freeze(),
                    error: Some(err),
                };
            }
        }
    }

    CapturedBody {
        bytes: buf.freeze(),
        error: None,
    }
}

/// Capture the body of `req` and rebuild the request around a replayable
/// copy of it. Method, URI, headers and extensions are carried over untouched.
pub async fn capture_request<B>(req: Request<B>) -> (Request<ReplayBody>, CapturedBody)
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let (parts, body) = req.into_parts();
    let captured = capture_body(body).await;
    let req = Request::from_parts(parts, captured.replay());
    (req, captured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use http_body::Frame;
    use http_body_util::{Empty, StreamBody};
    use std::io;

    async fn read_all(body: ReplayBody) -> Bytes {
        body.collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_capture_and_replay() {
        let req = Request::post("/items")
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from_static(br#"{"a":1}"#)))
            .unwrap();

        let (req, captured) = capture_request(req).await;

        assert!(captured.is_complete());
        assert_eq!(captured.recorded_text(None), r#"{"a":1}"#);
        assert_eq!(req.headers()["content-type"], "application/json");
        assert_eq!(req.uri().path(), "/items");
        assert_eq!(read_all(req.into_body()).await, Bytes::from_static(br#"{"a":1}"#));
    }

    #[tokio::test]
    async fn test_empty_body() {
        let captured = capture_body(Empty::<Bytes>::new()).await;
        assert!(captured.is_complete());
        assert!(captured.bytes().is_empty());
        assert_eq!(captured.recorded_text(None), "");
    }

    #[tokio::test]
    async fn test_multi_frame_body() {
        let chunks: Vec<Result<Frame<Bytes>, io::Error>> = vec![
            Ok(Frame::data(Bytes::from_static(b"hello "))),
            Ok(Frame::data(Bytes::from_static(b"world"))),
        ];
        let captured = capture_body(StreamBody::new(stream::iter(chunks))).await;

        assert_eq!(captured.bytes().as_ref(), b"hello world");
        assert_eq!(read_all(captured.replay()).await.as_ref(), b"hello world");
    }

    #[tokio::test]
    async fn test_failed_read_keeps_partial_bytes() {
        let chunks: Vec<Result<Frame<Bytes>, io::Error>> = vec![
            Ok(Frame::data(Bytes::from_static(b"part"))),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ];
        let captured = capture_body(StreamBody::new(stream::iter(chunks))).await;

        assert!(!captured.is_complete());
        assert!(matches!(captured.error(), Some(InspectorError::BodyRead(_))));
        assert_eq!(captured.recorded_text(None), "");
        assert_eq!(read_all(captured.replay()).await.as_ref(), b"part");
    }

    #[tokio::test]
    async fn test_recorded_text_truncation() {
        let captured = capture_body(Full::new(Bytes::from_static(b"0123456789"))).await;

        assert_eq!(captured.recorded_text(Some(4)), "0123");
        assert_eq!(captured.recorded_text(Some(64)), "0123456789");
        assert_eq!(read_all(captured.replay()).await.len(), 10);
    }

    #[tokio::test]
    async fn test_non_utf8_body_is_lossy() {
        let captured = capture_body(Full::new(Bytes::from_static(&[0x66, 0xff, 0x6f]))).await;
        assert_eq!(captured.recorded_text(None), "f\u{fffd}o");
        assert_eq!(captured.bytes().as_ref(), &[0x66, 0xff, 0x6f]);
    }
}
