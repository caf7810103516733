// SPDX-License-Identifier: MIT

//! Wire format: one JSON value per line (`\n`-terminated) on the data
//! channel. Workers speak this over stdin/the duplicated stdout fd; the
//! daemon speaks it over its Unix socket.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Request, Response};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed before a message was received")]
    Closed,
    #[error("malformed line: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn encode<T: Serialize>(value: &T) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(value).map_err(ProtocolError::Decode)?;
    line.push('\n');
    Ok(line)
}

pub fn decode<T: DeserializeOwned>(line: &str) -> Result<T, ProtocolError> {
    serde_json::from_str(line.trim_end()).map_err(ProtocolError::Decode)
}

/// Reads and decodes the next newline-terminated message from `reader`.
/// Returns `Err(ProtocolError::Closed)` on a clean EOF with no partial data.
pub async fn read_message<R, T>(reader: &mut BufReader<R>) -> Result<T, ProtocolError>
where
    R: tokio::io::AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Err(ProtocolError::Closed);
    }
    decode(&line)
}

/// Encodes and writes `value` as one line, flushing so the peer observes it
/// immediately (the data channel is otherwise unbuffered request/response).
pub async fn write_message<W, T>(writer: &mut W, value: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let line = encode(value)?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_request<R>(reader: &mut BufReader<R>) -> Result<Request, ProtocolError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    read_message(reader).await
}

pub async fn write_response<W>(writer: &mut W, response: &Response) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    write_message(writer, response).await
}

#[cfg(test)]
mod tests {
    use tokio::io::BufReader;

    use super::*;

    #[test]
    fn encode_appends_single_newline() {
        let line = encode(&Response::Ready).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[tokio::test]
    async fn write_then_read_roundtrips() {
        let mut buf: Vec<u8> = Vec::new();
        write_message(&mut buf, &Request::Hello).await.unwrap();
        let mut reader = BufReader::new(buf.as_slice());
        let decoded: Request = read_message(&mut reader).await.unwrap();
        assert_eq!(decoded, Request::Hello);
    }

    #[tokio::test]
    async fn read_on_empty_stream_is_closed() {
        let mut reader = BufReader::new(&b""[..]);
        let err = read_message::<_, Request>(&mut reader).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Closed));
    }

    #[tokio::test]
    async fn malformed_line_is_decode_error() {
        let mut reader = BufReader::new(&b"not json\n"[..]);
        let err = read_message::<_, Request>(&mut reader).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }
}
