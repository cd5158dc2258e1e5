//! # Error Types
//!
//! This module defines the error types used throughout the tintero library.
//! Each concern gets its own enum so callers can tell a bad image apart from
//! a dead connection or a session that was never connected.

use thiserror::Error;

/// Errors raised while turning an image into a raster frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// Width or height is zero
    #[error("Image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// Bytes per row or row count does not fit the single-byte header fields.
    ///
    /// Images wider than 2040 dots or taller than 255 dots cannot be sent in
    /// one raster frame. Resize or crop before retrying.
    #[error("Image too large for raster mode: {bytes_per_row} bytes per row, {rows} rows (max 255 each)")]
    DimensionOverflow { bytes_per_row: u32, rows: u32 },
}

/// Errors raised while negotiating a channel to a device.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// Channel creation through the advertised service record failed
    #[error("Service channel failed: {0}")]
    PrimaryFailed(String),

    /// Channel creation through the fixed channel number failed
    #[error("Fallback channel failed: {0}")]
    FallbackFailed(String),

    /// The negotiation task was cancelled before reporting an outcome
    /// (runtime shutting down)
    #[error("Negotiation interrupted: {0}")]
    Interrupted(String),
}

/// Errors raised while writing to an established channel.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The channel is gone (closed after an earlier transport failure)
    #[error("Channel closed")]
    ChannelClosed,

    /// The transport rejected the write
    #[error("Write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by [`PrinterSession`](crate::session::PrinterSession).
#[derive(Debug, Error)]
pub enum SessionError {
    /// A print or control operation was issued before a successful connect
    #[error("Printer session is not connected")]
    NotConnected,

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Connect(#[from] ConnectError),
}
