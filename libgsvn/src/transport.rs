//! Connection transports (C10, partial): how bytes reach the `svnserve`
//! process on the other end of [`crate::protocol::Client`]. Grounded on
//! `libbit::transport`'s `SshTransport`: a `pin_project`-ed struct wrapping
//! a spawned child's piped stdin/stdout, manually forwarding
//! `AsyncRead`/`AsyncWrite` so the whole thing can be handed to
//! [`crate::protocol::Client::connect`] as one `IO` type.

use crate::error::{GsvnError, GsvnResult};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::process::Stdio as StdStdio;
use std::task::{Context, Poll};
use tokio::io::{self, AsyncRead, AsyncWrite, BufReader, ReadBuf};
use tokio::net::TcpStream;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// `svn://host[:port]/path` talks raw TCP to `svnserve`; this is just a
/// thin dial helper since [`TcpStream`] already implements both traits.
pub async fn dial_tcp(host: &str, port: u16) -> GsvnResult<TcpStream> {
    TcpStream::connect((host, port))
        .await
        .map_err(|e| GsvnError::protocol(format!("failed to connect to {}:{}: {}", host, port, e)))
}

pin_project! {
    /// `svn+ssh://` (or any externally-tunnelled transport): a subprocess
    /// speaking the wire protocol over its own stdin/stdout, most commonly
    /// `ssh host svnserve -t`.
    pub struct TunnelTransport {
        child: Child,
        stdin: ChildStdin,
        #[pin]
        stdout: BufReader<ChildStdout>,
    }
}

impl TunnelTransport {
    /// spawns `program args...` with stdin/stdout piped and stderr
    /// inherited so tunnel diagnostics still reach the user's terminal
    pub fn spawn(program: &str, args: &[String]) -> GsvnResult<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(StdStdio::piped())
            .stdout(StdStdio::piped())
            .stderr(StdStdio::inherit())
            .spawn()
            .map_err(|e| GsvnError::protocol(format!("failed to spawn `{}`: {}", program, e)))?;
        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = BufReader::new(child.stdout.take().expect("piped stdout"));
        Ok(Self { child, stdin, stdout })
    }

    /// waits for the tunnel subprocess to exit, after the session above it
    /// has finished (or failed) cleanly
    pub async fn wait(&mut self) -> GsvnResult<()> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| GsvnError::protocol(format!("tunnel wait failed: {}", e)))?;
        if !status.success() {
            return Err(GsvnError::protocol(format!("tunnel exited with {}", status)));
        }
        Ok(())
    }
}

impl AsyncRead for TunnelTransport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.project().stdout.poll_read(cx, buf)
    }
}

impl AsyncWrite for TunnelTransport {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stdin).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stdin).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stdin).poll_shutdown(cx)
    }
}

/// `inetd`-style stdio transport: `svnserve -i` run locally over the
/// process's own stdin/stdout, used by `svn+local` style setups
pub struct StdioTransport {
    stdin: io::Stdin,
    stdout: io::Stdout,
}

impl StdioTransport {
    pub fn new() -> Self {
        Self { stdin: io::stdin(), stdout: io::stdout() }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncRead for StdioTransport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stdin).poll_read(cx, buf)
    }
}

impl AsyncWrite for StdioTransport {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stdout).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stdout).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stdout).poll_shutdown(cx)
    }
}

/// the pieces of an `svn://` or `svn+ssh://` URL [`dial_tcp`]/
/// [`TunnelTransport::spawn`] need; `svn+file://` and bare paths aren't
/// represented here since they never open a wire connection at all
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvnUrl {
    pub tunnel: Option<String>,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl SvnUrl {
    pub fn parse(url: &str) -> GsvnResult<Self> {
        let rest = url.strip_prefix("svn://").map(|r| (None, r)).or_else(|| {
            url.strip_prefix("svn+").and_then(|r| {
                let (tunnel, rest) = r.split_once("://")?;
                Some((Some(tunnel.to_string()), rest))
            })
        });
        let (tunnel, rest) = rest
            .ok_or_else(|| GsvnError::protocol(format!("not an svn url: `{}`", url)))?;

        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
        let (host, port) = match authority.split_once(':') {
            Some((h, p)) => (
                h.to_string(),
                p.parse().map_err(|_| GsvnError::protocol(format!("bad port in `{}`", url)))?,
            ),
            None => (authority.to_string(), 3690),
        };
        Ok(Self { tunnel, host, port, path: format!("/{}", path) })
    }
}

#[cfg(test)]
mod tests;
