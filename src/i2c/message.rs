// Licensed under the Apache-2.0 license

//! One direction-tagged segment of an I2C transaction.

/// Buffer of a message. The variant is the transfer direction.
#[derive(Debug)]
pub enum MessageBuf<'b> {
    Write(&'b [u8]),
    Read(&'b mut [u8]),
}

/// A 7-bit addressed read or write. A slice of messages forms one
/// transaction with a repeated start between segments.
#[derive(Debug)]
pub struct Message<'b> {
    pub addr: u8,
    pub buf: MessageBuf<'b>,
}

impl<'b> Message<'b> {
    #[must_use]
    pub fn write(addr: u8, bytes: &'b [u8]) -> Self {
        Self {
            addr,
            buf: MessageBuf::Write(bytes),
        }
    }

    #[must_use]
    pub fn read(addr: u8, buf: &'b mut [u8]) -> Self {
        Self {
            addr,
            buf: MessageBuf::Read(buf),
        }
    }

    #[must_use]
    pub fn is_read(&self) -> bool {
        matches!(self.buf, MessageBuf::Read(_))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match &self.buf {
            MessageBuf::Write(bytes) => bytes.len(),
            MessageBuf::Read(buf) => buf.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Address byte as it goes on the wire: address shifted left, R/W in bit 0.
    #[must_use]
    pub fn address_byte(&self) -> u32 {
        (u32::from(self.addr) << 1) | u32::from(self.is_read())
    }

    /// Byte `pos` of a write message.
    pub(crate) fn outgoing(&self, pos: usize) -> Option<u8> {
        match &self.buf {
            MessageBuf::Write(bytes) => bytes.get(pos).copied(),
            MessageBuf::Read(_) => None,
        }
    }

    /// Store a received byte at `pos` of a read message.
    pub(crate) fn store(&mut self, pos: usize, byte: u8) {
        if let MessageBuf::Read(buf) = &mut self.buf {
            if let Some(slot) = buf.get_mut(pos) {
                *slot = byte;
            }
        }
    }
}
