//! # Tintero - Bluetooth Receipt Printer Library
//!
//! Tintero drives ESC/POS receipt printers over Bluetooth RFCOMM. It
//! provides:
//!
//! - **Raster encoding**: RGB images to `GS v 0` bit image frames
//! - **Control commands**: Alignment, bold, line spacing, feeds
//! - **Connection negotiation**: Service-record channel first, fixed
//!   channel number as fallback
//! - **Sessions**: One owned channel per printer, closed exactly once
//!
//! ## Quick Start
//!
//! ```no_run
//! use tintero::{BluetoothDevice, PrinterSession};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let device = BluetoothDevice::new("00:11:22:33:44:55")?;
//! let mut session = PrinterSession::new(device);
//!
//! // Negotiation runs on tokio's blocking pool
//! session.connect().await?;
//!
//! let logo = image::open("logo.png")?;
//! session.print_image(&logo)?;
//! session.feed_paper()?;
//! session.disconnect();
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | ESC/POS command builders and raster encoder |
//! | [`transport`] | Channel/device traits, Bluetooth RFCOMM backend |
//! | [`negotiate`] | Two-strategy channel negotiation |
//! | [`session`] | Printer session façade |
//! | [`printer`] | Configuration |
//! | [`error`] | Error types |
//!
//! ## Logging
//!
//! The library logs through [`tracing`]; install a subscriber to see
//! connection and write events.

pub mod error;
pub mod negotiate;
pub mod printer;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use error::{ConnectError, EncodeError, SessionError, WriteError};
pub use negotiate::{ChannelNegotiator, ConnectionOutcome};
pub use printer::PrinterConfig;
pub use protocol::graphics::{Bitmap, RasterEncoder, RasterImage};
pub use session::PrinterSession;
pub use transport::{BluetoothDevice, Channel, Device};
