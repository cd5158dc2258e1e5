//! # Printer Session
//!
//! [`PrinterSession`] owns the connection to one printer and exposes the
//! printing operations.
//!
//! ## Lifecycle
//!
//! ```text
//! Disconnected ──connect()──► Connected ──disconnect()──► Disconnected
//!                                 │
//!                           write failure
//!                                 ▼
//!                              Broken ──disconnect()/connect()──► ...
//! ```
//!
//! - Print operations on a `Disconnected` session fail with
//!   [`SessionError::NotConnected`].
//! - A transport failure closes the channel; the failing call returns
//!   [`WriteError::Io`] and later calls return [`WriteError::ChannelClosed`]
//!   until the caller reconnects. Nothing is retried automatically.
//! - The channel is closed exactly once, whether by `disconnect`, a write
//!   failure, a reconnect, or dropping the session.
//!
//! ## Ordering
//!
//! Print operations take `&mut self`, so bytes reach the channel in the
//! order the calls were made. Share a session between threads behind a
//! mutex.
//!
//! ## Example
//!
//! ```no_run
//! use tintero::{BluetoothDevice, PrinterSession};
//! use tintero::protocol::text::Alignment;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let device = BluetoothDevice::new("00:11:22:33:44:55")?;
//! let mut session = PrinterSession::new(device);
//!
//! session.connect().await?;
//! session.set_align(Alignment::Center)?;
//! session.print_text("Hello\n")?;
//! session.feed_paper()?;
//! session.disconnect();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::error::{ConnectError, SessionError, WriteError};
use crate::negotiate::ChannelNegotiator;
use crate::printer::PrinterConfig;
use crate::protocol::graphics::RasterImage;
use crate::protocol::{commands, text};
use crate::transport::{Channel, Device};

pub use crate::protocol::text::Alignment;

enum Link<C> {
    Disconnected,
    Connected(C),
    /// Closed after a transport failure
    Broken,
}

/// A connection to one printer plus its settings.
pub struct PrinterSession<D: Device> {
    device: Arc<D>,
    config: PrinterConfig,
    link: Link<D::Channel>,
}

impl<D: Device> PrinterSession<D> {
    pub fn new(device: D) -> Self {
        Self::with_config(device, PrinterConfig::DEFAULT)
    }

    /// Create a session, handing `config` to the device so channels it
    /// opens use the configured write chunking.
    pub fn with_config(mut device: D, config: PrinterConfig) -> Self {
        device.configure(&config);
        Self {
            device: Arc::new(device),
            config,
            link: Link::Disconnected,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.link, Link::Connected(_))
    }

    // ========================================================================
    // CONNECTION
    // ========================================================================

    /// Negotiate a channel to the device without blocking the async caller.
    ///
    /// Any existing channel is closed first. On failure nothing is stored
    /// and the session stays disconnected; call `connect` again to retry.
    ///
    /// A panic inside the device's open calls is re-raised here.
    #[instrument(skip(self), fields(device = %self.device.address()))]
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        self.disconnect();

        let negotiator =
            ChannelNegotiator::new(Arc::clone(&self.device), self.config.fallback_channel);
        let outcome = match negotiator.spawn().await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => return Err(ConnectError::Interrupted(e.to_string()).into()),
        };

        let channel = outcome.into_result()?;
        info!("Printer connected");
        self.link = Link::Connected(channel);
        Ok(())
    }

    /// Close the channel if one is open. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        self.close_link();
        self.link = Link::Disconnected;
    }

    /// Alias for [`disconnect`](Self::disconnect).
    #[inline]
    pub fn finish(&mut self) {
        self.disconnect();
    }

    fn close_link(&mut self) {
        if let Link::Connected(mut channel) = std::mem::replace(&mut self.link, Link::Disconnected) {
            match channel.close() {
                Ok(()) => info!(device = %self.device.address(), "Printer disconnected"),
                Err(e) => warn!(device = %self.device.address(), error = %e, "Error while closing channel"),
            }
        }
    }

    // ========================================================================
    // PRINTING
    // ========================================================================

    /// Write raw bytes to the printer.
    pub fn print_raw(&mut self, data: &[u8]) -> Result<(), SessionError> {
        let channel = match &mut self.link {
            Link::Connected(channel) => channel,
            Link::Disconnected => return Err(SessionError::NotConnected),
            Link::Broken => return Err(WriteError::ChannelClosed.into()),
        };

        if let Err(e) = channel.write_all(data) {
            warn!(error = %e, bytes = data.len(), "Write failed, closing channel");
            self.close_link();
            self.link = Link::Broken;
            return Err(WriteError::Io(e).into());
        }
        Ok(())
    }

    /// Encode `image` as a raster frame and write it.
    ///
    /// The connection is checked before encoding, so an unconnected session
    /// reports [`SessionError::NotConnected`] even for an oversized image.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn print_image<I: RasterImage + ?Sized>(&mut self, image: &I) -> Result<(), SessionError> {
        self.ensure_connected()?;
        let frame = self.config.encoder().encode(image)?;
        debug!(bytes = frame.len(), "Raster frame encoded");
        self.print_raw(&frame)
    }

    /// Write text, folding Czech/Slovak diacritics to ASCII.
    pub fn print_text(&mut self, s: &str) -> Result<(), SessionError> {
        self.print_raw(&text::encode(s))
    }

    /// Print a rule of underscores across the paper.
    pub fn print_line(&mut self) -> Result<(), SessionError> {
        let rule = text::rule(self.config.line_columns);
        self.print_text(&rule)
    }

    pub fn add_new_line(&mut self) -> Result<(), SessionError> {
        self.print_raw(&commands::new_line())
    }

    /// Write `count` new lines one at a time, returning how many were
    /// written before any failure.
    pub fn add_new_lines(&mut self, count: usize) -> Result<usize, SessionError> {
        self.ensure_connected()?;
        let mut written = 0;
        for _ in 0..count {
            if self.add_new_line().is_err() {
                break;
            }
            written += 1;
        }
        Ok(written)
    }

    /// Feed a few blank lines so the last printed line clears the tear bar.
    pub fn feed_paper(&mut self) -> Result<(), SessionError> {
        self.print_raw(&commands::feed())
    }

    pub fn set_align(&mut self, alignment: Alignment) -> Result<(), SessionError> {
        self.print_raw(&text::align(alignment))
    }

    pub fn set_line_spacing(&mut self, spacing: u8) -> Result<(), SessionError> {
        self.print_raw(&text::line_spacing(spacing))
    }

    pub fn set_bold(&mut self, enabled: bool) -> Result<(), SessionError> {
        self.print_raw(&text::bold(enabled))
    }

    fn ensure_connected(&self) -> Result<(), SessionError> {
        match self.link {
            Link::Connected(_) => Ok(()),
            Link::Disconnected => Err(SessionError::NotConnected),
            Link::Broken => Err(WriteError::ChannelClosed.into()),
        }
    }
}

impl<D: Device> Drop for PrinterSession<D> {
    fn drop(&mut self) {
        self.close_link();
    }
}
