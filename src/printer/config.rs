//! # Printer Configuration
//!
//! Connection and rendering settings for a receipt printer session.
//!
//! ## Usage
//!
//! ```
//! use std::time::Duration;
//! use tintero::printer::PrinterConfig;
//!
//! let config = PrinterConfig::DEFAULT
//!     .with_fallback_channel(2)
//!     .with_chunk_delay(Duration::from_millis(5));
//!
//! assert_eq!(config.fallback_channel, 2);
//! assert_eq!(config.line_columns, 32);
//! ```

use std::time::Duration;

use crate::protocol::graphics::{DEFAULT_INK_THRESHOLD, InkRule, RasterEncoder};

/// # Printer Configuration
///
/// ## Connection
///
/// - **fallback_channel**: RFCOMM channel tried when the service record
///   channel cannot be opened. Most cheap receipt printers listen on 1.
///
/// ## Bluetooth Tuning
///
/// - **chunk_size**: Maximum bytes per underlying write
/// - **chunk_delay**: Pause between chunks of a large write
///
/// ## Rendering
///
/// - **ink_threshold** / **ink_rule**: Raster thresholding, see
///   [`InkRule`]
/// - **line_columns**: Characters per line (58mm paper, font A)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrinterConfig {
    /// RFCOMM channel for the fallback strategy
    pub fallback_channel: u8,

    /// Maximum bytes per write
    pub chunk_size: usize,

    /// Delay between chunks
    pub chunk_delay: Duration,

    /// Channel value at or below which a channel counts as dark
    pub ink_threshold: u8,

    /// How channels combine into an ink decision
    pub ink_rule: InkRule,

    /// Character columns per printed line
    pub line_columns: usize,
}

impl PrinterConfig {
    /// # Generic 58mm Bluetooth Receipt Printer
    ///
    /// | Property | Value |
    /// |----------|-------|
    /// | Fallback channel | 1 |
    /// | Chunk size | 4096 bytes |
    /// | Chunk delay | 2 ms |
    /// | Ink threshold | 160, all channels |
    /// | Columns | 32 |
    pub const DEFAULT: Self = Self {
        fallback_channel: 1,
        chunk_size: 4096,
        chunk_delay: Duration::from_millis(2),
        ink_threshold: DEFAULT_INK_THRESHOLD,
        ink_rule: InkRule::AllChannelsDark,
        line_columns: 32,
    };

    pub fn with_fallback_channel(mut self, channel: u8) -> Self {
        self.fallback_channel = channel;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn with_ink_threshold(mut self, threshold: u8) -> Self {
        self.ink_threshold = threshold;
        self
    }

    pub fn with_ink_rule(mut self, rule: InkRule) -> Self {
        self.ink_rule = rule;
        self
    }

    pub fn with_line_columns(mut self, columns: usize) -> Self {
        self.line_columns = columns;
        self
    }

    /// Raster encoder using this configuration's thresholding.
    pub fn encoder(&self) -> RasterEncoder {
        RasterEncoder::new()
            .with_threshold(self.ink_threshold)
            .with_rule(self.ink_rule)
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = PrinterConfig::default();
        assert_eq!(config.fallback_channel, 1);
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.chunk_delay, Duration::from_millis(2));
        assert_eq!(config.ink_threshold, 160);
        assert_eq!(config.ink_rule, InkRule::AllChannelsDark);
        assert_eq!(config.line_columns, 32);
    }

    #[test]
    fn test_builders_override() {
        let config = PrinterConfig::DEFAULT
            .with_chunk_size(512)
            .with_ink_threshold(100)
            .with_ink_rule(InkRule::AnyChannelDark)
            .with_line_columns(48);
        assert_eq!(config.chunk_size, 512);
        assert_eq!(config.line_columns, 48);

        let encoder = config.encoder();
        assert_eq!(encoder.threshold(), 100);
        assert_eq!(encoder.rule(), InkRule::AnyChannelDark);
    }
}
