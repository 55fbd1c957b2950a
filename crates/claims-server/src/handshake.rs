//! Dimension handshake sent to a player on every world-info event.

use std::io::{self, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};
use bytes::{BufMut, Bytes, BytesMut};
use claims_core::PlayerId;

/// Outbound transport for encoded packets.
pub trait PacketSink {
    fn send_to_player(&self, player: PlayerId, packet: Bytes);
}

/// Tells the client which features the server runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientboundHandshake {
    pub claims_enabled: bool,
    pub parties_enabled: bool,
}

impl ClientboundHandshake {
    /// Discriminator of this message on the claims channel.
    pub const ID: u8 = 0x00;

    /// Payload without the discriminator.
    pub fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(u8::from(self.claims_enabled))?;
        writer.write_u8(u8::from(self.parties_enabled))?;
        Ok(())
    }

    pub fn decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            claims_enabled: read_bool(reader)?,
            parties_enabled: read_bool(reader)?,
        })
    }

    /// Framed packet: discriminator followed by the payload.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(3);
        buf.put_u8(Self::ID);
        buf.put_u8(u8::from(self.claims_enabled));
        buf.put_u8(u8::from(self.parties_enabled));
        buf.freeze()
    }
}

fn read_bool<R: Read>(reader: &mut R) -> io::Result<bool> {
    match reader.read_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid boolean byte {other:#04x}"),
        )),
    }
}
