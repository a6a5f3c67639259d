//! Length-prefixed request/response service.
//!
//! A host process writes `<len>\n<markdown bytes>` and reads back
//! `<len>\n<html bytes>`, one request at a time. Any failure is terminal:
//! the worker stops without answering the failing request and the host is
//! expected to respawn it. Diagnostics go through `tracing`, never onto the
//! response channel.

use std::io::{self, BufRead, Read, Write};

use tracing::{debug, error, info};

use crate::arena::Arena;
use crate::error::Error;
use crate::markdown_to_html_in;

/// Limits applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Longest accepted length line, excluding the `\n`.
    pub max_header_len: usize,
    /// Largest accepted payload in bytes.
    pub max_input_len: usize,
    /// Arena budget for one request's tree.
    pub max_arena_bytes: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_header_len: 32,
            max_input_len: 10 * 1024 * 1024,
            max_arena_bytes: 256 * 1024 * 1024,
        }
    }
}

impl WorkerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_header_len(mut self, len: usize) -> Self {
        self.max_header_len = len;
        self
    }

    pub fn with_max_input_len(mut self, len: usize) -> Self {
        self.max_input_len = len;
        self
    }

    pub fn with_max_arena_bytes(mut self, bytes: usize) -> Self {
        self.max_arena_bytes = bytes;
        self
    }
}

/// Why a worker stopped.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("invalid length header: {0}")]
    InvalidLengthHeader(String),
    #[error("request of {len} bytes exceeds the {max} byte limit")]
    InputTooLarge { len: usize, max: usize },
    #[error("failed to read request: {0}")]
    ReadFailed(#[source] io::Error),
    #[error("failed to write response: {0}")]
    WriteFailed(#[source] io::Error),
    #[error("conversion failed: {0}")]
    Convert(#[from] Error),
    /// `serve` was called after an earlier failure.
    #[error("worker already failed and serves no further requests")]
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Ready to read the next length header.
    AwaitingRequest,
    /// A request failed; nothing more will be served.
    Fatal,
}

/// Serves conversion requests from `reader`, answering on `writer`.
///
/// # Example
///
/// ```rust
/// use tinymark_core::{Worker, WorkerConfig, WorkerState};
///
/// let input: &[u8] = b"13\n# Hello World";
/// let mut worker = Worker::new(input, Vec::new(), WorkerConfig::default());
/// worker.serve().unwrap();
///
/// assert_eq!(worker.state(), WorkerState::AwaitingRequest);
/// assert_eq!(worker.into_writer(), b"20\n<h1>Hello World</h1>");
/// ```
#[derive(Debug)]
pub struct Worker<R, W> {
    reader: R,
    writer: W,
    config: WorkerConfig,
    arena: Arena,
    state: WorkerState,
    served: u64,
}

impl<R: BufRead, W: Write> Worker<R, W> {
    pub fn new(reader: R, writer: W, config: WorkerConfig) -> Self {
        Self {
            reader,
            writer,
            arena: Arena::with_limit(config.max_arena_bytes),
            config,
            state: WorkerState::AwaitingRequest,
            served: 0,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Give back the response sink.
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Number of requests answered so far.
    pub fn requests_served(&self) -> u64 {
        self.served
    }

    /// Serve requests until clean end of input or the first failure.
    ///
    /// Returns `Ok(())` when the input ends exactly at a frame boundary. Any
    /// error moves the worker to [`WorkerState::Fatal`]; a fatal worker
    /// serves nothing further and answers every later call with
    /// [`WorkerError::Fatal`].
    pub fn serve(&mut self) -> Result<(), WorkerError> {
        if self.state == WorkerState::Fatal {
            return Err(WorkerError::Fatal);
        }

        loop {
            let outcome = self.serve_one();
            // Request memory is released before the next header is read.
            self.arena.reset();
            match outcome {
                Ok(true) => {}
                Ok(false) => {
                    info!(served = self.served, "input closed, worker exiting");
                    return Ok(());
                }
                Err(err) => {
                    self.state = WorkerState::Fatal;
                    error!(error = %err, served = self.served, "worker failed");
                    return Err(err);
                }
            }
        }
    }

    /// Handle a single request. `Ok(false)` means clean end of input.
    fn serve_one(&mut self) -> Result<bool, WorkerError> {
        let len = match self.read_header()? {
            Some(len) => len,
            None => return Ok(false),
        };
        if len > self.config.max_input_len {
            return Err(WorkerError::InputTooLarge {
                len,
                max: self.config.max_input_len,
            });
        }

        let input = self.read_payload(len)?;

        let html = markdown_to_html_in(&self.arena, &input)?;

        write_frame(&mut self.writer, &html).map_err(WorkerError::WriteFailed)?;
        self.served += 1;
        debug!(
            request = self.served,
            input_len = len,
            output_len = html.len(),
            "served request"
        );
        Ok(true)
    }

    /// Read one length line; `None` on end of input before any byte.
    fn read_header(&mut self) -> Result<Option<usize>, WorkerError> {
        let limit = self.config.max_header_len as u64 + 1;
        let mut header = Vec::new();
        let read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut header)
            .map_err(WorkerError::ReadFailed)?;

        if read == 0 {
            return Ok(None);
        }
        if header.last() != Some(&b'\n') {
            let reason = if read as u64 >= limit {
                format!("longer than {} bytes", self.config.max_header_len)
            } else {
                "input ended inside the length line".to_string()
            };
            return Err(WorkerError::InvalidLengthHeader(reason));
        }
        header.pop();
        parse_length(&header).map(Some)
    }

    fn read_payload(&mut self, len: usize) -> Result<Vec<u8>, WorkerError> {
        let mut input = Vec::new();
        input
            .try_reserve_exact(len)
            .map_err(|_| WorkerError::ReadFailed(io::ErrorKind::OutOfMemory.into()))?;
        (&mut self.reader)
            .take(len as u64)
            .read_to_end(&mut input)
            .map_err(WorkerError::ReadFailed)?;

        if input.len() < len {
            return Err(WorkerError::ReadFailed(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {} payload bytes, got {}", len, input.len()),
            )));
        }
        Ok(input)
    }
}

/// Write `payload` as one `<len>\n<payload>` frame and flush.
///
/// The frame is assembled first so the sink sees a single write.
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let mut frame = Vec::with_capacity(payload.len() + 21);
    writeln!(frame, "{}", payload.len())?;
    frame.extend_from_slice(payload);
    writer.write_all(&frame)?;
    writer.flush()
}

fn parse_length(header: &[u8]) -> Result<usize, WorkerError> {
    if header.is_empty() {
        return Err(WorkerError::InvalidLengthHeader("empty".to_string()));
    }

    header.iter().try_fold(0usize, |acc, &b| {
        if !b.is_ascii_digit() {
            return Err(WorkerError::InvalidLengthHeader(format!(
                "unexpected byte 0x{:02x}",
                b
            )));
        }
        acc.checked_mul(10)
            .and_then(|n| n.checked_add(usize::from(b - b'0')))
            .ok_or_else(|| WorkerError::InvalidLengthHeader("length overflows".to_string()))
    })
}
