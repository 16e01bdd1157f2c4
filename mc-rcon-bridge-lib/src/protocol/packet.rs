use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::RconError;

pub const PACKET_TYPE_LOGIN: i32 = 3;
pub const PACKET_TYPE_EXEC_COMMAND: i32 = 2;
/// Shares its value with `PACKET_TYPE_EXEC_COMMAND`; direction tells them apart
pub const PACKET_TYPE_AUTH_RESPONSE: i32 = 2;
pub const PACKET_TYPE_RESPONSE_VALUE: i32 = 0;

/// The longest command body a Minecraft server accepts
pub const MAX_COMMAND_LEN: usize = 1446;

/// Size of the ID, type, and trailing NUL bytes
const PACKET_OVERHEAD: usize = 10;

/// The largest incoming packet we are willing to allocate for
///
/// Servers split longer responses into several packets of at most 4096 body
/// bytes each.
pub const MAX_PACKET_LEN: usize = 4096 + PACKET_OVERHEAD;

/// A single RCON packet
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub id: i32,
    pub kind: i32,
    pub body: String,
}

impl Packet {
    pub fn new<S: Into<String>>(id: i32, kind: i32, body: S) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }

    /// Serializes this packet, length prefix included
    pub fn encode(&self) -> Vec<u8> {
        let body = self.body.as_bytes();
        let len = body.len() + PACKET_OVERHEAD;

        let mut buf = Vec::with_capacity(len + 4);
        buf.extend_from_slice(&(len as i32).to_le_bytes());
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.extend_from_slice(&self.kind.to_le_bytes());
        buf.extend_from_slice(body);
        buf.extend_from_slice(&[0, 0]);
        buf
    }

    /// Writes this packet to `writer` and flushes it
    pub async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> Result<(), RconError> {
        writer.write_all(&self.encode()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Reads one packet from `reader`
    ///
    /// Returns `RconError::Closed` if the stream ends before a full packet has
    /// been read.
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self, RconError> {
        let mut len_buf = [0u8; 4];
        read_exact_or_closed(reader, &mut len_buf).await?;
        let len = i32::from_le_bytes(len_buf);

        if len < PACKET_OVERHEAD as i32 || len as usize > MAX_PACKET_LEN {
            return Err(RconError::Malformed(format!(
                "packet length {} outside of {}..={}",
                len, PACKET_OVERHEAD, MAX_PACKET_LEN
            )));
        }

        let mut buf = vec![0u8; len as usize];
        read_exact_or_closed(reader, &mut buf).await?;

        let (header, rest) = buf.split_at(8);
        let (body, terminator) = rest.split_at(rest.len() - 2);
        if terminator != [0, 0] {
            return Err(RconError::Malformed(
                "packet is not terminated by two NUL bytes".into(),
            ));
        }

        Ok(Self {
            id: i32::from_le_bytes([header[0], header[1], header[2], header[3]]),
            kind: i32::from_le_bytes([header[4], header[5], header[6], header[7]]),
            body: String::from_utf8_lossy(body).into_owned(),
        })
    }
}

async fn read_exact_or_closed<R: AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut [u8],
) -> Result<(), RconError> {
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(RconError::Closed),
        Err(e) => Err(e.into()),
    }
}
