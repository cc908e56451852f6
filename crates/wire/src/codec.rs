//! Length-prefixed framing
//!
//! Frame layout:
//!
//! ```text
//! | len: u32 LE | payload: len bytes of UTF-8 JSON |
//! ```

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, WireError};

/// Largest accepted payload (16 MiB)
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Write one frame and flush
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(WireError::FrameTooLarge {
            len: payload.len(),
            max: MAX_FRAME_LEN,
        });
    }
    let len = payload.len() as u32;
    writer
        .write_all(&len.to_le_bytes())
        .await
        .map_err(|e| WireError::io("write frame header", e))?;
    writer
        .write_all(payload)
        .await
        .map_err(|e| WireError::io("write frame payload", e))?;
    writer
        .flush()
        .await
        .map_err(|e| WireError::io("flush frame", e))
}

/// Read one frame. Returns `None` on a clean end of stream before a header.
///
/// An end of stream inside the header is `ConnectionClosed`.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    let mut filled = 0;
    while filled < header.len() {
        let n = reader
            .read(&mut header[filled..])
            .await
            .map_err(|e| WireError::io("read frame header", e))?;
        if n == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(WireError::ConnectionClosed)
            };
        }
        filled += n;
    }
    let len = u32::from_le_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(WireError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            WireError::ConnectionClosed
        } else {
            WireError::io("read frame payload", e)
        }
    })?;
    Ok(Some(payload))
}
