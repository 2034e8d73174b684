//! A stream which is either plain or wrapped in client-side TLS.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project::pin_project;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_rustls::client::TlsStream;

/// Either a plain stream, or the same stream after a completed TLS handshake.
#[derive(Debug)]
#[pin_project(project = MaybeTlsProj)]
pub enum MaybeTlsStream<IO> {
    /// No TLS was negotiated.
    Plain(#[pin] IO),

    /// The handshake completed and all traffic is encrypted.
    Tls(#[pin] Box<TlsStream<IO>>),
}

impl<IO> MaybeTlsStream<IO> {
    /// Returns true if this stream is encrypted.
    pub fn is_tls(&self) -> bool {
        matches!(self, MaybeTlsStream::Tls(_))
    }

    /// The DER encoded certificate chain the server presented, if any.
    pub fn peer_certificates(&self) -> Option<&[rustls::pki_types::CertificateDer<'static>]> {
        match self {
            MaybeTlsStream::Plain(_) => None,
            MaybeTlsStream::Tls(stream) => stream.get_ref().1.peer_certificates(),
        }
    }
}

impl<IO> From<TlsStream<IO>> for MaybeTlsStream<IO> {
    fn from(stream: TlsStream<IO>) -> Self {
        MaybeTlsStream::Tls(Box::new(stream))
    }
}

impl<IO> AsyncRead for MaybeTlsStream<IO>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.project() {
            MaybeTlsProj::Plain(stream) => stream.poll_read(cx, buf),
            MaybeTlsProj::Tls(stream) => stream.poll_read(cx, buf),
        }
    }
}

impl<IO> AsyncWrite for MaybeTlsStream<IO>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.project() {
            MaybeTlsProj::Plain(stream) => stream.poll_write(cx, buf),
            MaybeTlsProj::Tls(stream) => stream.poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            MaybeTlsProj::Plain(stream) => stream.poll_flush(cx),
            MaybeTlsProj::Tls(stream) => stream.poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            MaybeTlsProj::Plain(stream) => stream.poll_shutdown(cx),
            MaybeTlsProj::Tls(stream) => stream.poll_shutdown(cx),
        }
    }
}
