//! Incremental decoding of upstream `text/event-stream` bodies.

use std::fmt::Display;

use folio_core::FolioError;
use futures::{future, stream, Stream, StreamExt};

use crate::{LlmStream, StreamChunk};

/// Longest line accepted from an upstream before the stream is abandoned.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Reassembles `data:` payloads from arbitrarily split byte chunks.
///
/// Bytes are buffered until a full line is available, so multi-byte UTF-8
/// sequences and lines split across chunks decode correctly. Comments,
/// other SSE fields and the `[DONE]` marker are skipped.
#[derive(Debug)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
    /// Prefix of `pending` already known to hold no newline.
    scanned: usize,
    max_line: usize,
}

impl Default for SseLineBuffer {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self { pending: Vec::new(), scanned: 0, max_line }
    }

    /// Feeds a chunk and returns the payloads of every line it completed.
    ///
    /// Fails once an unterminated line grows past the configured limit; the
    /// buffered bytes are discarded.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, FolioError> {
        self.pending.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        let mut line_start = 0;
        while let Some(offset) = self.pending[self.scanned..].iter().position(|&b| b == b'\n') {
            let line_end = self.scanned + offset;
            if let Some(payload) = data_payload(&self.pending[line_start..=line_end]) {
                payloads.push(payload);
            }
            line_start = line_end + 1;
            self.scanned = line_start;
        }

        self.pending.drain(..line_start);
        self.scanned = self.pending.len();

        if self.pending.len() > self.max_line {
            let len = self.pending.len();
            self.pending.clear();
            self.scanned = 0;
            return Err(FolioError::UpstreamFailure(format!(
                "upstream event line exceeds {} bytes ({len} buffered)",
                self.max_line
            )));
        }

        Ok(payloads)
    }

    /// Flushes a final line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.pending);
        self.scanned = 0;
        data_payload(&line)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\r', '\n']);
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(data.to_string())
}

/// Turns an upstream byte stream into an [`LlmStream`] using a per-event parser.
pub fn decode_stream<S, B, E, F>(bytes: S, parse: F) -> LlmStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
    F: Fn(&str) -> Vec<Result<StreamChunk, FolioError>> + Send + 'static,
{
    // A trailing `None` marks end of input so the buffer can be flushed.
    let mapped = bytes
        .map(Some)
        .chain(stream::once(future::ready(None)))
        .scan(SseLineBuffer::new(), move |buffer, item| {
            let chunks: Vec<Result<StreamChunk, FolioError>> = match item {
                Some(Err(e)) => vec![Err(FolioError::UpstreamFailure(e.to_string()))],
                Some(Ok(bytes)) => match buffer.push(bytes.as_ref()) {
                    Ok(payloads) => payloads.iter().flat_map(|payload| parse(payload)).collect(),
                    Err(e) => vec![Err(e)],
                },
                None => buffer.finish().map(|payload| parse(&payload)).unwrap_or_default(),
            };
            future::ready(Some(chunks))
        })
        .flat_map(stream::iter);

    Box::pin(mapped)
}
