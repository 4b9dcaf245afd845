//! Serial channel capability
//!
//! The transaction engine never touches a port directly. Whatever owns the
//! physical transport (baud rate, pins, parity) hands it something that
//! implements [`Channel`].

use serde::{Deserialize, Serialize};
use std::io;
use std::time::Duration;

/// Byte-level capability over a serial link
pub trait Channel {
    /// Whether the channel can accept a frame right now
    fn is_writable(&mut self) -> bool;

    /// Write a single byte
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    /// Block until a byte is available or `timeout` elapses.
    ///
    /// Returns `Ok(false)` when the timeout elapsed with nothing to read.
    fn byte_ready_within(&mut self, timeout: Duration) -> io::Result<bool>;

    /// Read one byte. Only called after `byte_ready_within` returned `true`.
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Write every byte of `data` in order
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        for &byte in data {
            self.write_byte(byte)?;
        }
        Ok(())
    }
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn is_writable(&mut self) -> bool {
        (**self).is_writable()
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        (**self).write_byte(byte)
    }

    fn byte_ready_within(&mut self, timeout: Duration) -> io::Result<bool> {
        (**self).byte_ready_within(timeout)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        (**self).read_byte()
    }
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn is_writable(&mut self) -> bool {
        (**self).is_writable()
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        (**self).write_byte(byte)
    }

    fn byte_ready_within(&mut self, timeout: Duration) -> io::Result<bool> {
        (**self).byte_ready_within(timeout)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        (**self).read_byte()
    }
}

/// Line terminator written at the end of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// Single `\n`
    #[default]
    Lf,
    /// `\r\n`, what the ESP AT firmware documents
    CrLf,
}

impl LineEnding {
    /// Bytes of the terminator sequence
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            LineEnding::Lf => b"\n",
            LineEnding::CrLf => b"\r\n",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sink(Vec<u8>);

    impl Channel for Sink {
        fn is_writable(&mut self) -> bool {
            true
        }

        fn write_byte(&mut self, byte: u8) -> io::Result<()> {
            self.0.push(byte);
            Ok(())
        }

        fn byte_ready_within(&mut self, _timeout: Duration) -> io::Result<bool> {
            Ok(false)
        }

        fn read_byte(&mut self) -> io::Result<u8> {
            Err(io::ErrorKind::UnexpectedEof.into())
        }
    }

    #[test]
    fn test_write_all_through_reference() {
        let mut sink = Sink(Vec::new());
        {
            let mut borrowed = &mut sink;
            Channel::write_all(&mut borrowed, b"AT\n").unwrap();
        }
        assert_eq!(sink.0, b"AT\n".to_vec());
    }

    #[test]
    fn test_line_ending_bytes() {
        assert_eq!(LineEnding::Lf.as_bytes(), b"\n");
        assert_eq!(LineEnding::CrLf.as_bytes(), b"\r\n");
    }
}
