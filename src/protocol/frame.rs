//! Frame protocol
//!
//! Every batch travels as one frame:
//!
//! ```text
//! ┌──────────────────────────────┬──────────────────────────┐
//! │ Length (8 bytes)             │ Body (Length bytes)      │
//! │ ASCII hex, zero padded       │ one encoded Batch        │
//! └──────────────────────────────┴──────────────────────────┘
//! ```
//!
//! Reading is two-phase: exactly [`HEADER_SIZE`] bytes, then exactly the declared
//! number of body bytes. Both phases resume across short transport reads, and the
//! body buffer is allocated only after the header passed validation, so a corrupt
//! or hostile peer cannot make the reader allocate more than [`MAX_FRAME_SIZE`].

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::{ConnectionError, FrameError};

/// Size of the length header in bytes
pub const HEADER_SIZE: usize = 8;

/// Largest body a frame may declare (16 MiB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Encode just the header for a body of `len` bytes.
pub fn encode_header(len: usize) -> Result<[u8; HEADER_SIZE], FrameError> {
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::PayloadTooLarge { len, max: MAX_FRAME_SIZE });
    }

    let text = format!("{:0width$x}", len, width = HEADER_SIZE);
    let mut header = [0u8; HEADER_SIZE];
    header.copy_from_slice(text.as_bytes());
    Ok(header)
}

/// Prepend the length header to a payload.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    let header = encode_header(payload.len())?;
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&header);
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Parse a header into the body length it declares.
pub fn decode_header(header: &[u8]) -> Result<usize, FrameError> {
    if header.len() != HEADER_SIZE {
        return Err(FrameError::malformed_header(
            header,
            format!("expected {} bytes, got {}", HEADER_SIZE, header.len()),
        ));
    }

    let mut len = 0usize;
    for &byte in header {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            _ => return Err(FrameError::malformed_header(header, "not a hexadecimal length")),
        };
        // Eight hex digits fit in 32 bits, so this cannot overflow usize.
        len = (len << 4) | digit as usize;
    }

    if len > MAX_FRAME_SIZE {
        return Err(FrameError::malformed_header(
            header,
            format!("declared length {} exceeds maximum {}", len, MAX_FRAME_SIZE),
        ));
    }

    Ok(len)
}

/// Read one complete frame body from `reader`.
///
/// Transport failures, including end of stream at any point, are `ReadFailed`;
/// a bad header is a protocol violation.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, ConnectionError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header).await.map_err(ConnectionError::read_failed)?;
    let len = decode_header(&header)?;

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.map_err(ConnectionError::read_failed)?;

    trace!(len, "Read frame");
    Ok(body)
}

/// Write one payload as a frame and flush it.
///
/// Header and body go out as a single buffer, so a completed write is exactly
/// one frame. A write cut short by a local close can leave a partial frame on
/// the wire; the peer then sees a read failure once the stream ends.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<usize, ConnectionError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let frame = encode_frame(payload)?;
    writer.write_all(&frame).await.map_err(ConnectionError::write_failed)?;
    writer.flush().await.map_err(ConnectionError::write_failed)?;

    trace!(len = payload.len(), "Wrote frame");
    Ok(frame.len())
}
