//! Decoding of the daemon's multiplexed log stream.
//!
//! A non-TTY container's log endpoint interleaves stdout and stderr as a
//! sequence of frames. Each frame starts with an eight byte header
//! (`[stream, 0, 0, 0, len_be32...]`) followed by `len` payload bytes. The
//! [`Demuxer`] strips the headers and hands back the payloads in arrival
//! order, regardless of how the transport chunked the bytes.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};

use crate::error::RuntimeError;

pub const HEADER_LEN: usize = 8;

/// Logical stream a frame belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamKind {
    Stdin = 0,
    Stdout = 1,
    Stderr = 2,
}

impl StreamKind {
    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(StreamKind::Stdin),
            1 => Some(StreamKind::Stdout),
            2 => Some(StreamKind::Stderr),
            _ => None,
        }
    }
}

/// Build a single frame. Used by adapters that receive already separated
/// stdout/stderr and by tests.
pub fn encode_frame(kind: StreamKind, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.push(kind as u8);
    frame.extend_from_slice(&[0, 0, 0]);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Framing {
    /// Not enough bytes seen yet to tell.
    Unknown,
    Framed,
    /// TTY containers write their output without headers.
    Raw,
}

/// How the input ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndOfStream {
    /// Ended on a frame boundary.
    Clean,
    /// Ended inside a header or a payload shorter than promised.
    Truncated,
}

/// Incremental frame decoder.
#[derive(Debug)]
pub struct Demuxer {
    header: [u8; HEADER_LEN],
    filled: usize,
    remaining: usize,
    framing: Framing,
}

impl Default for Demuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl Demuxer {
    pub fn new() -> Self {
        Self {
            header: [0; HEADER_LEN],
            filled: 0,
            remaining: 0,
            framing: Framing::Unknown,
        }
    }

    /// Feed the next chunk of raw bytes, appending decoded payload to `out`.
    pub fn feed(&mut self, mut input: &[u8], out: &mut Vec<u8>) {
        if self.framing == Framing::Raw {
            out.extend_from_slice(input);
            return;
        }

        while !input.is_empty() {
            if self.remaining > 0 {
                let take = self.remaining.min(input.len());
                out.extend_from_slice(&input[..take]);
                self.remaining -= take;
                input = &input[take..];
                continue;
            }

            let need = HEADER_LEN - self.filled;
            let take = need.min(input.len());
            self.header[self.filled..self.filled + take].copy_from_slice(&input[..take]);
            self.filled += take;
            input = &input[take..];

            if self.framing == Framing::Unknown && !self.looks_framed() {
                self.framing = Framing::Raw;
                out.extend_from_slice(&self.header[..self.filled]);
                out.extend_from_slice(input);
                self.filled = 0;
                return;
            }

            if self.filled < HEADER_LEN {
                return;
            }

            self.framing = Framing::Framed;
            let len = u32::from_be_bytes([
                self.header[4],
                self.header[5],
                self.header[6],
                self.header[7],
            ]);
            self.remaining = len as usize;
            self.filled = 0;
        }
    }

    /// Report whether the bytes seen so far ended on a frame boundary.
    pub fn finish(&self) -> EndOfStream {
        if self.filled > 0 && self.framing == Framing::Unknown {
            // A handful of bytes too short to be a header is just raw text.
            return EndOfStream::Clean;
        }
        if self.filled > 0 || self.remaining > 0 {
            EndOfStream::Truncated
        } else {
            EndOfStream::Clean
        }
    }

    /// Bytes still buffered in a partial header while the framing is
    /// undetermined. Flushed as text when the stream ends early.
    pub fn pending_raw(&self) -> &[u8] {
        if self.framing == Framing::Unknown {
            &self.header[..self.filled]
        } else {
            &[]
        }
    }

    fn looks_framed(&self) -> bool {
        let seen = &self.header[..self.filled];
        if let Some(&tag) = seen.first() {
            if StreamKind::from_tag(tag).is_none() {
                return false;
            }
        }
        seen.iter().skip(1).take(3).all(|&b| b == 0)
    }
}

/// Holds back an incomplete UTF-8 sequence at the end of a chunk so that a
/// multi-byte character split across reads is decoded once, intact.
#[derive(Debug, Default)]
pub struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.pending.clear();
                    return text;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match err.error_len() {
                        // Incomplete sequence at the end: keep it for next time.
                        None => {
                            self.pending.drain(..valid);
                            return text;
                        }
                        Some(bad) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                    }
                }
            }
        }
    }

    pub fn flush(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, RuntimeError>> + Send>>;

/// One step of a [`LogReader`].
#[derive(Debug, PartialEq)]
pub enum Chunk {
    Text(String),
    /// The producer closed the stream. Also reported for truncated frames,
    /// which is how a graceful connection close looks on the wire.
    End,
    Failed(String),
}

/// Pulls raw bytes from a log stream and yields clean text.
pub struct LogReader {
    source: ByteStream,
    demuxer: Demuxer,
    carry: Utf8Carry,
    finished: bool,
}

impl LogReader {
    pub fn new(source: ByteStream) -> Self {
        Self {
            source,
            demuxer: Demuxer::new(),
            carry: Utf8Carry::default(),
            finished: false,
        }
    }

    /// Read until at least one byte of text is available or the stream ends.
    pub async fn next_chunk(&mut self) -> Chunk {
        if self.finished {
            return Chunk::End;
        }
        let mut out = Vec::new();
        loop {
            match self.source.next().await {
                Some(Ok(bytes)) => {
                    self.demuxer.feed(&bytes, &mut out);
                    if out.is_empty() {
                        continue;
                    }
                    let text = self.carry.decode(&out);
                    if text.is_empty() {
                        out.clear();
                        continue;
                    }
                    return Chunk::Text(text);
                }
                Some(Err(err)) => {
                    self.finished = true;
                    return Chunk::Failed(err.to_string());
                }
                None => {
                    self.finished = true;
                    let mut tail = self.carry.decode(self.demuxer.pending_raw());
                    tail.push_str(&self.carry.flush());
                    if self.demuxer.finish() == EndOfStream::Truncated {
                        tracing::debug!("log stream ended inside a frame");
                    }
                    return if tail.is_empty() { Chunk::End } else { Chunk::Text(tail) };
                }
            }
        }
    }
}
