//! Framed, cancel-safe reading and writing of IMAP responses.
//!
//! IMAP uses CRLF-terminated lines; a line ending in a literal marker
//! `{n}` continues with `n` raw bytes and then the rest of the response.

#![allow(clippy::missing_errors_doc)]

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Maximum literal size to prevent memory exhaustion.
pub const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024;

/// Line-oriented connection to the server.
///
/// Received bytes stay in an internal buffer until a complete response is
/// available, so dropping a pending [`Transport::read_line`] future loses
/// nothing.
pub struct Transport<S> {
    stream: Option<S>,
    buf: BytesMut,
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
            buf: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
        }
    }

    /// Reads one complete response, literals included.
    ///
    /// Fails with [`Error::Timeout`] if nothing complete arrived in time
    /// and with [`Error::ConnectionClosed`] on EOF or after [`close`].
    ///
    /// [`close`]: Transport::close
    pub async fn read_line(&mut self, timeout: Duration) -> Result<Bytes> {
        match tokio::time::timeout(timeout, self.read_response()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(timeout)),
        }
    }

    async fn read_response(&mut self) -> Result<Bytes> {
        loop {
            if let Some(len) = frame_len(&self.buf)? {
                let response = self.buf.split_to(len).freeze();
                tracing::trace!(response = %String::from_utf8_lossy(&response).trim_end(), "S:");
                return Ok(response);
            }

            let stream = self.stream.as_mut().ok_or(Error::ConnectionClosed)?;
            if stream.read_buf(&mut self.buf).await? == 0 {
                self.stream = None;
                return Err(Error::ConnectionClosed);
            }
        }
    }

    /// Writes raw bytes and flushes.
    pub async fn write_line(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::ConnectionClosed)?;
        let written = async {
            stream.write_all(bytes).await?;
            stream.flush().await
        }
        .await;

        written.map_err(|e| match e.kind() {
            std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted => Error::ConnectionClosed,
            _ => Error::Io(e),
        })
    }

    /// Shuts the stream down. Calling it again does nothing.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::debug!(error = %e, "Error while closing connection");
            }
        }
        self.buf.clear();
    }

    /// Returns true once the stream has been closed or hit EOF.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Takes the stream out, e.g. to wrap it in TLS. The transport is
    /// closed afterwards.
    ///
    /// Fails if the server already sent bytes past the last response, since
    /// those would belong to the old, unencrypted layer.
    pub fn take_stream(&mut self) -> Result<S> {
        if !self.buf.is_empty() {
            return Err(Error::Protocol(
                "Unexpected data before TLS negotiation".to_string(),
            ));
        }
        self.stream.take().ok_or(Error::ConnectionClosed)
    }
}

/// Finds the position of CRLF in a buffer.
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Length of the first complete response in `buf`, if there is one.
fn frame_len(buf: &[u8]) -> Result<Option<usize>> {
    let mut pos = 0;
    loop {
        let rest = &buf[pos..];
        let Some(crlf) = find_crlf(rest) else {
            if rest.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
            return Ok(None);
        };
        if crlf > MAX_LINE_LENGTH {
            return Err(Error::Protocol("line too long".to_string()));
        }

        let line_end = pos + crlf + 2;
        let Some(literal_len) = parse_literal_length(&rest[..crlf]) else {
            return Ok(Some(line_end));
        };
        if literal_len > MAX_LITERAL_SIZE {
            return Err(Error::Protocol(format!(
                "literal too large: {literal_len} bytes (max {MAX_LITERAL_SIZE})"
            )));
        }

        pos = line_end + literal_len;
        if buf.len() < pos {
            return Ok(None);
        }
    }
}

/// Parses a literal length from the end of a line (CRLF stripped).
///
/// Matches `{123}` or `{123+}`.
fn parse_literal_length(line: &[u8]) -> Option<usize> {
    let inner = line.strip_suffix(b"}")?;
    let inner = inner.strip_suffix(b"+").unwrap_or(inner);
    let open = inner.iter().rposition(|&b| b == b'{')?;
    let digits = &inner[open + 1..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn test_find_crlf() {
        assert_eq!(find_crlf(b"hello\r\n"), Some(5));
        assert_eq!(find_crlf(b"\r\n"), Some(0));
        assert_eq!(find_crlf(b"just\n"), None);
    }

    #[test]
    fn test_parse_literal_length() {
        assert_eq!(parse_literal_length(b"BODY {123}"), Some(123));
        assert_eq!(parse_literal_length(b"BODY {123+}"), Some(123));
        assert_eq!(parse_literal_length(b"{0}"), Some(0));
        assert_eq!(parse_literal_length(b"no literal"), None);
        assert_eq!(parse_literal_length(b"wrong {abc}"), None);
        assert_eq!(parse_literal_length(b"empty {}"), None);
    }

    #[test]
    fn test_frame_len_waits_for_literal() {
        assert_eq!(frame_len(b"* 1 FETCH (BODY {5}\r\nhel").unwrap(), None);
        assert_eq!(
            frame_len(b"* 1 FETCH (BODY {5}\r\nhello)\r\n* next").unwrap(),
            Some(29)
        );
    }

    #[test]
    fn test_frame_len_literal_limit() {
        let line = format!("* 1 FETCH (BODY {{{}}}\r\n", MAX_LITERAL_SIZE + 1);
        assert!(frame_len(line.as_bytes()).is_err());
    }

    #[test]
    fn test_frame_len_line_limit() {
        let line = vec![b'a'; MAX_LINE_LENGTH + 1];
        assert!(frame_len(&line).is_err());
    }

    #[tokio::test]
    async fn test_read_simple_line() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut transport = Transport::new(mock);
        let response = transport.read_line(SECOND).await.unwrap();
        assert_eq!(&response[..], b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn test_read_split_across_chunks() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY {5}\r\n")
            .read(b"hel")
            .read(b"lo)\r\n* 2 EXISTS\r\n")
            .build();
        let mut transport = Transport::new(mock);
        let first = transport.read_line(SECOND).await.unwrap();
        assert_eq!(&first[..], b"* 1 FETCH (BODY {5}\r\nhello)\r\n");
        let second = transport.read_line(SECOND).await.unwrap();
        assert_eq!(&second[..], b"* 2 EXISTS\r\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_keeps_partial_data() {
        let mock = Builder::new()
            .read(b"* 3 EXI")
            .wait(Duration::from_secs(5))
            .read(b"STS\r\n")
            .build();
        let mut transport = Transport::new(mock);

        let err = transport.read_line(SECOND).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));

        let response = transport.read_line(Duration::from_secs(10)).await.unwrap();
        assert_eq!(&response[..], b"* 3 EXISTS\r\n");
    }

    #[tokio::test]
    async fn test_eof_is_connection_closed() {
        let mock = Builder::new().read(b"* OK bye\r\n").build();
        let mut transport = Transport::new(mock);
        transport.read_line(SECOND).await.unwrap();
        let err = transport.read_line(SECOND).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn test_take_stream_rejects_buffered_data() {
        let mock = Builder::new().read(b"A0002 OK Begin TLS\r\n* junk").build();
        let mut transport = Transport::new(mock);
        transport.read_line(SECOND).await.unwrap();
        assert!(transport.take_stream().is_err());
    }

    #[tokio::test]
    async fn test_write_and_idempotent_close() {
        let mock = Builder::new().write(b"A0001 NOOP\r\n").build();
        let mut transport = Transport::new(mock);
        transport.write_line(b"A0001 NOOP\r\n").await.unwrap();
        transport.close().await;
        transport.close().await;
        assert!(matches!(
            transport.write_line(b"A0002 NOOP\r\n").await,
            Err(Error::ConnectionClosed)
        ));
        assert!(matches!(
            transport.read_line(SECOND).await,
            Err(Error::ConnectionClosed)
        ));
    }
}
