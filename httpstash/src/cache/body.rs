//! Body replay for aborted store writes.
//!
//! When a write into the store fails part-way, the caller must still see the
//! complete original stream. The bytes already consumed live in the staging
//! file, so the replacement body reads them back from there before handing
//! over to whatever is left of the original body.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

use tempfile::TempDir;

use crate::http::Body;

/// What follows the staged bytes in a replayed body.
pub(crate) enum Tail {
    /// The original stream was fully consumed.
    Done,
    /// Unread remainder of the original stream.
    Rest(Body),
    /// Reading the original stream failed; surface the same error.
    Failed(io::Error),
}

/// Reader that yields a stored I/O error on every call.
struct FailedReader {
    kind: io::ErrorKind,
    message: String,
}

impl Read for FailedReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(self.kind, self.message.clone()))
    }
}

/// Staged prefix plus tail, holding the staging directory alive until the
/// body is dropped.
struct ReplayReader {
    inner: Box<dyn Read + Send>,
    _staging: TempDir,
}

impl Read for ReplayReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Build a body that replays `written` staged bytes, then `pending`, then `tail`.
pub(crate) fn replay_body(
    mut staged: File,
    written: u64,
    pending: Vec<u8>,
    tail: Tail,
    staging: TempDir,
    content_length: Option<u64>,
) -> Body {
    let tail: Box<dyn Read + Send> = match tail {
        Tail::Done => Box::new(io::empty()),
        Tail::Rest(body) => Box::new(body),
        Tail::Failed(e) => Box::new(FailedReader {
            kind: e.kind(),
            message: e.to_string(),
        }),
    };

    let prefix: Box<dyn Read + Send> = match staged.seek(SeekFrom::Start(0)) {
        Ok(_) => Box::new(staged.take(written)),
        Err(e) => Box::new(FailedReader {
            kind: e.kind(),
            message: format!("failed to rewind staged body: {}", e),
        }),
    };

    let reader = ReplayReader {
        inner: Box::new(prefix.chain(Cursor::new(pending)).chain(tail)),
        _staging: staging,
    };
    Body::from_reader(reader, content_length)
}
