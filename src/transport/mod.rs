//! # Printer Transport Layer
//!
//! The byte-stream side of a printer connection, expressed as two traits:
//!
//! - [`Device`]: a printer that can be asked for a channel, either through
//!   one of its advertised service records or through a fixed channel number
//! - [`Channel`]: an open byte stream to that printer
//!
//! ## Available Transports
//!
//! - [`bluetooth`]: Bluetooth RFCOMM (Linux)

use std::io;

use uuid::Uuid;

use crate::printer::PrinterConfig;

pub mod bluetooth;

pub use bluetooth::{BluetoothDevice, RfcommChannel};

/// Serial Port Profile service class, advertised by most receipt printers.
pub const SERIAL_PORT_SERVICE: Uuid = Uuid::from_u128(0x0000_1101_0000_1000_8000_0080_5f9b_34fb);

/// An open, bidirectional byte stream to one printer.
pub trait Channel: Send {
    /// Write the whole buffer or fail.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush and release the stream. Called at most once by the session.
    fn close(&mut self) -> io::Result<()>;
}

/// A printer that can open channels.
///
/// The two `open_*` methods are the two ways of obtaining a channel; the
/// [negotiator](crate::negotiate::ChannelNegotiator) decides which to use.
pub trait Device: Send + Sync + 'static {
    type Channel: Channel + 'static;

    /// Human-readable identifier (e.g. a MAC address), used in logs
    fn address(&self) -> &str;

    /// Service identifiers advertised by the device, in advertised order
    fn service_uuids(&self) -> &[Uuid];

    /// Apply transport settings (write chunking) before any channel is
    /// opened. The session calls this once when it takes the device.
    fn configure(&mut self, _config: &PrinterConfig) {}

    /// Open a channel through the service record identified by `service`.
    fn open_service(&self, service: Uuid) -> io::Result<Self::Channel>;

    /// Open a channel directly on a fixed channel number.
    fn open_channel(&self, channel: u8) -> io::Result<Self::Channel>;
}
