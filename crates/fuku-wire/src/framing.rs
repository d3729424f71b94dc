//! Newline-delimited JSON framing over an async byte stream: one JSON value
//! per line, read with `AsyncBufReadExt::read_line` and written with a
//! trailing `\n`.

use fuku_core::ProtocolError;
use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Frames larger than this are rejected before they are parsed, so a
/// misbehaving peer can't make us buffer an unbounded line.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Reads one newline-delimited JSON frame, or `Ok(None)` on a clean EOF
/// before any bytes of a new frame arrive.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .await
        .map_err(|err| ProtocolError::MalformedJson(err.to_string()))?;
    if read == 0 {
        return Ok(None);
    }
    if line.len() > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(line.len(), MAX_FRAME_BYTES));
    }
    let trimmed = line.trim_end_matches(['\n', '\r']);
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|err| ProtocolError::MalformedJson(err.to_string()))
}

/// Writes one value as a single line of JSON followed by `\n`, flushing so
/// the peer sees it immediately.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line =
        serde_json::to_string(value).map_err(|err| ProtocolError::MalformedJson(err.to_string()))?;
    if line.len() > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(line.len(), MAX_FRAME_BYTES));
    }
    line.push('\n');
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|err| ProtocolError::MalformedJson(err.to_string()))?;
    writer
        .flush()
        .await
        .map_err(|err| ProtocolError::MalformedJson(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{LogFrame, SubscribeRequest};

    #[tokio::test]
    async fn writes_and_reads_a_subscribe_request() {
        let mut buf = Vec::new();
        let req = SubscribeRequest { services: vec!["web".into()] };
        write_frame(&mut buf, &req).await.unwrap();
        assert_eq!(buf.last(), Some(&b'\n'));

        let mut reader = buf.as_slice();
        let back: SubscribeRequest = read_frame(&mut reader).await.unwrap().unwrap();
        assert_eq!(back, req);
    }

    #[tokio::test]
    async fn writes_and_reads_a_log_frame() {
        let mut buf = Vec::new();
        let frame = LogFrame::new("web", "hello");
        write_frame(&mut buf, &frame).await.unwrap();

        let mut reader = buf.as_slice();
        let back: LogFrame = read_frame(&mut reader).await.unwrap().unwrap();
        assert_eq!(back, frame);
    }

    #[tokio::test]
    async fn read_frame_on_clean_eof_returns_none() {
        let mut reader: &[u8] = b"";
        let result: Option<LogFrame> = read_frame(&mut reader).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn read_frame_rejects_malformed_json() {
        let mut reader: &[u8] = b"not json\n";
        let result = read_frame::<_, LogFrame>(&mut reader).await;
        assert!(matches!(result, Err(ProtocolError::MalformedJson(_))));
    }

    #[tokio::test]
    async fn read_frame_rejects_an_oversized_line() {
        let oversized = "x".repeat(MAX_FRAME_BYTES + 1);
        let mut reader = oversized.as_bytes();
        let result = read_frame::<_, LogFrame>(&mut reader).await;
        assert!(matches!(result, Err(ProtocolError::FrameTooLarge(_, _))));
    }

    #[tokio::test]
    async fn multiple_frames_are_read_in_order() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &LogFrame::new("web", "one")).await.unwrap();
        write_frame(&mut buf, &LogFrame::new("web", "two")).await.unwrap();

        let mut reader = buf.as_slice();
        let first: LogFrame = read_frame(&mut reader).await.unwrap().unwrap();
        let second: LogFrame = read_frame(&mut reader).await.unwrap().unwrap();
        assert_eq!(first.message, "one");
        assert_eq!(second.message, "two");
    }
}
