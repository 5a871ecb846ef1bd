//! Upstream SSE to surface frame translation.
//!
//! The upstream body arrives in arbitrary byte chunks. Bytes are buffered
//! until a full line is available, each line is decoded on its own, and
//! every delta becomes exactly one surface frame. A line is never decoded
//! before its terminator has arrived, so the output does not depend on how
//! the body happened to be chunked.

use std::collections::VecDeque;

use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt, stream::BoxStream};
use serde_json::Value;
use tracing::{debug, warn};

use relaylm_core::{FinishReason, RelayError, RelayResult, StreamFrame, SurfaceProtocol};

use crate::dialect::Generation;
use crate::format::{DONE_SENTINEL, SurfaceFormatter};

/// What one complete upstream line means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// A delta chunk.
    Frame(StreamFrame),
    /// The end-of-stream sentinel.
    Done,
    /// Padding, comments, non-data SSE fields, or chunks without a choice.
    Skip,
}

/// Decode one complete line of an upstream SSE body.
///
/// The sentinel check runs on the line with any `data:` prefix stripped.
/// Unparsable payloads come back as [`RelayError::MalformedChunk`].
pub fn decode_line(line: &str) -> RelayResult<LineEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return Ok(LineEvent::Skip);
    }

    let payload = match trimmed.strip_prefix("data:") {
        Some(data) => data.trim(),
        None if is_sse_field(trimmed) => return Ok(LineEvent::Skip),
        None => trimmed,
    };

    if payload == DONE_SENTINEL {
        return Ok(LineEvent::Done);
    }
    if payload.is_empty() {
        return Ok(LineEvent::Skip);
    }

    let chunk: Value = serde_json::from_str(payload)
        .map_err(|e| RelayError::MalformedChunk(format!("{e}: {payload}")))?;
    if !chunk.is_object() {
        return Err(RelayError::MalformedChunk(payload.to_string()));
    }

    let Some(choice) = chunk["choices"].get(0) else {
        return Ok(LineEvent::Skip);
    };

    Ok(LineEvent::Frame(StreamFrame {
        role: choice["delta"]["role"].as_str().map(str::to_string),
        content_delta: choice["delta"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        finish_reason: choice["finish_reason"].as_str().map(FinishReason::parse),
    }))
}

fn is_sse_field(line: &str) -> bool {
    ["event:", "id:", "retry:"]
        .iter()
        .any(|field| line.starts_with(field))
}

/// Longest unterminated line kept before it is dropped.
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Accumulates raw bytes and hands out complete lines.
#[derive(Debug)]
pub struct LineBuffer {
    buf: BytesMut,
    /// Bytes of `buf` already known to hold no terminator.
    scanned: usize,
    max_line: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            scanned: 0,
            max_line,
        }
    }

    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete line without its terminator, if one is buffered.
    pub fn next_line(&mut self) -> Option<String> {
        let Some(offset) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') else {
            self.scanned = self.buf.len();
            return None;
        };
        let end = self.scanned + offset;
        let line = self.buf.split_to(end + 1);
        self.scanned = 0;
        Some(String::from_utf8_lossy(&line[..end]).into_owned())
    }

    /// Drop a partial line that has grown past the limit. Returns the
    /// number of bytes dropped.
    pub fn discard_oversized(&mut self) -> usize {
        if self.buf.len() <= self.max_line || self.scanned < self.buf.len() {
            return 0;
        }
        let dropped = self.buf.len();
        self.buf.clear();
        self.scanned = 0;
        dropped
    }

    /// Whatever is left once the upstream has closed.
    pub fn take_remainder(&mut self) -> Option<String> {
        self.scanned = 0;
        if self.buf.is_empty() {
            return None;
        }
        let rest = self.buf.split();
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// State threaded through the `unfold` stream.
struct TranslatorState<E> {
    upstream: BoxStream<'static, Result<Bytes, E>>,
    lines: LineBuffer,
    formatter: SurfaceFormatter,
    pending: VecDeque<Bytes>,
    frames: usize,
    finish_reason: Option<FinishReason>,
    finished: bool,
}

impl<E> TranslatorState<E> {
    fn handle_line(&mut self, line: &str) {
        match decode_line(line) {
            Ok(LineEvent::Frame(frame)) => {
                self.frames += 1;
                self.pending.push_back(self.formatter.delta_frame(&frame));
                if frame.finish_reason.is_some() {
                    self.finish_reason = frame.finish_reason;
                }
            }
            Ok(LineEvent::Done) => self.finish(),
            Ok(LineEvent::Skip) => {}
            Err(e) => warn!("Skipping upstream line: {e}"),
        }
    }

    fn finish(&mut self) {
        debug!(frames = self.frames, model = %self.formatter.model(), "Upstream stream finished");
        let terminal = self.formatter.terminal_frame(self.finish_reason.as_ref());
        self.pending.push_back(terminal);
        self.finished = true;
    }
}

/// Translate an upstream SSE byte stream into surface frames.
///
/// Yields one item per frame. Reading from the upstream only happens when
/// the consumer asks for the next item, and dropping the returned stream
/// drops the upstream body with it.
///
/// The terminal frame follows the sentinel or, if the upstream closes
/// without one, the last buffered line. An upstream read error ends the
/// stream with that error and no terminal frame.
pub fn translate<S, E>(
    upstream: S,
    formatter: SurfaceFormatter,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + std::fmt::Display + Send + 'static,
{
    let state = TranslatorState {
        upstream: upstream.boxed(),
        lines: LineBuffer::default(),
        formatter,
        pending: VecDeque::new(),
        frames: 0,
        finish_reason: None,
        finished: false,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(out) = st.pending.pop_front() {
                return Some((Ok(out), st));
            }
            if st.finished {
                return None;
            }

            if let Some(line) = st.lines.next_line() {
                st.handle_line(&line);
                continue;
            }
            let dropped = st.lines.discard_oversized();
            if dropped > 0 {
                warn!(bytes = dropped, "Dropping oversized upstream line");
            }

            match st.upstream.next().await {
                Some(Ok(chunk)) => st.lines.extend(&chunk),
                Some(Err(e)) => {
                    warn!(frames = st.frames, "Upstream stream error: {e}");
                    st.finished = true;
                    return Some((Err(std::io::Error::other(e)), st));
                }
                None => {
                    if let Some(rest) = st.lines.take_remainder() {
                        st.handle_line(&rest);
                    }
                    if !st.finished {
                        st.finish();
                    }
                }
            }
        }
    })
}

/// Stream a live upstream response to the client.
pub fn stream_response(upstream: reqwest::Response, formatter: SurfaceFormatter) -> Response {
    let content_type = formatter.stream_content_type();
    let surface = formatter.surface();
    let frames = translate(upstream.bytes_stream(), formatter);
    build_stream_response(content_type, surface, Body::from_stream(frames))
}

/// Stream a single non-streamed answer as one delta plus the terminal frame.
pub fn one_shot_response(generation: &Generation, formatter: &SurfaceFormatter) -> Response {
    let frames = formatter
        .one_shot_frames(generation)
        .into_iter()
        .map(Ok::<_, std::io::Error>);
    build_stream_response(
        formatter.stream_content_type(),
        formatter.surface(),
        Body::from_stream(futures_util::stream::iter(frames)),
    )
}

fn build_stream_response(
    content_type: &'static str,
    surface: SurfaceProtocol,
    body: Body,
) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header("content-type", content_type)
        .header("cache-control", "no-cache");
    if surface == SurfaceProtocol::OpenAiCompatible {
        // Disable nginx buffering
        builder = builder.header("x-accel-buffering", "no");
    }
    builder
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
