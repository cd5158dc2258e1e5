//! # ESC/POS Basic Commands
//!
//! Byte constants shared by the command builders, plus the paper movement
//! commands (new line, feed).
//!
//! ## Escape Sequence Structure
//!
//! Commands follow these patterns:
//! - Single byte: `LF`
//! - Three bytes: `ESC a n`, `ESC E n`, `ESC 3 n`
//! - Header + payload: `GS v 0 m xL xH yL yH d1...dk`
//!
//! ## Byte Order
//!
//! Multi-byte integers use **little-endian** encoding:
//! - `u16` value 0x1234 is sent as bytes `[0x34, 0x12]`

/// ESC (Escape) - Command prefix byte
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - Extended command prefix
///
/// Used for graphics commands such as `GS v 0` (raster bit image).
pub const GS: u8 = 0x1D;

/// LF (Line Feed) - Print and advance one line
pub const LF: u8 = 0x0A;

/// Number of new lines emitted by [`feed`].
pub const FEED_LINES: usize = 4;

/// # Print and Line Feed (LF)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | Hex     | 0A    |
///
/// ## Example
///
/// ```
/// use tintero::protocol::commands;
///
/// assert_eq!(commands::new_line(), vec![0x0A]);
/// ```
#[inline]
pub fn new_line() -> Vec<u8> {
    vec![LF]
}

/// Feed the paper by [`FEED_LINES`] blank lines.
///
/// Receipt printers keep a few lines between the print head and the tear
/// bar, so a short feed after the last line makes the output reachable.
pub fn feed() -> Vec<u8> {
    vec![LF; FEED_LINES]
}

/// Encode a `u16` as little-endian bytes `[low, high]`.
#[inline]
pub fn u16_le(n: u16) -> [u8; 2] {
    n.to_le_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_line() {
        assert_eq!(new_line(), vec![0x0A]);
    }

    #[test]
    fn test_feed_is_four_line_feeds() {
        assert_eq!(feed(), vec![0x0A, 0x0A, 0x0A, 0x0A]);
    }

    #[test]
    fn test_u16_le() {
        assert_eq!(u16_le(0x1234), [0x34, 0x12]);
        assert_eq!(u16_le(72), [72, 0]);
    }
}
