use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::RpcError;

pub(crate) const MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

/// Reads one newline-terminated JSON frame.
///
/// # Errors
///
/// Returns an error when the peer closed the connection, the frame is too
/// large or not UTF-8, or the JSON does not decode into `T`.
pub(crate) async fn read_frame<R, T>(reader: &mut R) -> Result<T, RpcError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut buffer: Vec<u8> = Vec::with_capacity(1024);
    let limit = u64::try_from(MAX_MESSAGE_BYTES)
        .unwrap_or(u64::MAX)
        .saturating_add(1);
    let bytes = (&mut *reader)
        .take(limit)
        .read_until(b'\n', &mut buffer)
        .await
        .map_err(|err| RpcError::io("read wire message", err))?;
    if bytes == 0 {
        return Err(RpcError::ConnectionClosed);
    }
    if buffer.len() > MAX_MESSAGE_BYTES {
        return Err(RpcError::MessageTooLarge {
            max_bytes: MAX_MESSAGE_BYTES,
        });
    }
    if buffer.ends_with(b"\n") {
        buffer.pop();
        if buffer.ends_with(b"\r") {
            buffer.pop();
        }
    }
    let line = std::str::from_utf8(&buffer).map_err(|err| RpcError::InvalidUtf8 { source: err })?;
    serde_json::from_str::<T>(line).map_err(|err| RpcError::deserialize("wire message", err))
}

/// Writes one JSON frame followed by a newline and flushes it.
///
/// # Errors
///
/// Returns an error when encoding or writing fails.
pub(crate) async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut payload =
        serde_json::to_string(message).map_err(|err| RpcError::serialize("wire message", err))?;
    payload.push('\n');
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|err| RpcError::io("send wire message", err))?;
    writer
        .flush()
        .await
        .map_err(|err| RpcError::io("flush wire message", err))
}
