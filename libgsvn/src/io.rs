//! Framed I/O (C1): a buffered reader with one-byte pushback over an
//! [`AsyncRead`], plus a thin write-all-or-fail extension over
//! [`AsyncWrite`]. Everything above this layer (the s-expression codec,
//! the delta codec's varint reader) is built only on these primitives so
//! that it works identically over a TCP socket, a child process pipe
//! (`--inetd`), or an in-memory buffer in tests.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// wraps an [`AsyncRead`] with one byte of pushback, mirroring
/// `svn-proto.c`'s `readc`/`unreadc` pair. Unexpected end of stream while a
/// caller expects more bytes is fatal at this layer: callers see a plain
/// `io::ErrorKind::UnexpectedEof`.
pub struct FramedReader<R> {
    inner: R,
    pending: Option<u8>,
}

impl<R: AsyncRead + Unpin> FramedReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, pending: None }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// read one byte, or `None` on a clean end of stream
    pub async fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(b) = self.pending.take() {
            return Ok(Some(b));
        }
        let mut buf = [0u8; 1];
        let n = self.inner.read(&mut buf).await?;
        if n == 0 { Ok(None) } else { Ok(Some(buf[0])) }
    }

    /// push one byte back; at most one byte may be pending at a time
    pub fn unread_byte(&mut self, byte: u8) {
        debug_assert!(self.pending.is_none(), "at most one byte of pushback is supported");
        self.pending = Some(byte);
    }

    /// read exactly `n` bytes, failing with `UnexpectedEof` otherwise
    pub async fn read_exact_n(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        if let Some(b) = self.pending.take() {
            buf[0] = b;
            filled = 1;
        }
        if filled < n {
            self.inner.read_exact(&mut buf[filled..]).await?;
        }
        Ok(buf)
    }
}

#[async_trait::async_trait]
pub trait FramedWrite: AsyncWrite + Unpin + Send {
    async fn write_all_or_fail(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes).await?;
        self.flush().await
    }
}

impl<W: AsyncWrite + Unpin + Send> FramedWrite for W {}
