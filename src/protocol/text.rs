//! # ESC/POS Text Commands
//!
//! Fixed control sequences for text styling, and the plain-text encoder
//! used before text is written to the printer.
//!
//! | Style | Command | Bytes |
//! |-------|---------|-------|
//! | Alignment | ESC a n | 1B 61 n |
//! | Line spacing | ESC 3 n | 1B 33 n |
//! | Bold | ESC E n | 1B 45 n |
//!
//! ## Text Encoding
//!
//! Cheap receipt printers ship with a single-byte code page and no way to
//! render accented Central European letters. [`encode`] folds the Czech and
//! Slovak diacritics to their base ASCII letter; everything else passes
//! through as UTF-8.

use super::commands::ESC;

// ============================================================================
// TEXT ALIGNMENT
// ============================================================================

/// Text alignment options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

/// # Select Justification (ESC a n)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC a n |
/// | Hex     | 1B 61 n |
///
/// - `n = 0`: Left alignment (default)
/// - `n = 1`: Center alignment
/// - `n = 2`: Right alignment
///
/// ## Example
///
/// ```
/// use tintero::protocol::text::{align, Alignment};
///
/// assert_eq!(align(Alignment::Center), vec![0x1B, 0x61, 0x01]);
/// ```
pub fn align(alignment: Alignment) -> Vec<u8> {
    vec![ESC, b'a', alignment as u8]
}

/// Convenience function for left alignment
#[inline]
pub fn align_left() -> Vec<u8> {
    align(Alignment::Left)
}

/// Convenience function for center alignment
#[inline]
pub fn align_center() -> Vec<u8> {
    align(Alignment::Center)
}

/// Convenience function for right alignment
#[inline]
pub fn align_right() -> Vec<u8> {
    align(Alignment::Right)
}

// ============================================================================
// LINE SPACING
// ============================================================================

/// # Set Line Spacing (ESC 3 n)
///
/// Sets the line spacing to `n` motion units. Takes effect from the next
/// line feed.
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC 3 n |
/// | Hex     | 1B 33 n |
pub fn line_spacing(n: u8) -> Vec<u8> {
    vec![ESC, b'3', n]
}

// ============================================================================
// EMPHASIS
// ============================================================================

/// # Turn Emphasized Mode On/Off (ESC E n)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC E n |
/// | Hex     | 1B 45 01 (on) / 1B 45 00 (off) |
pub fn bold(enabled: bool) -> Vec<u8> {
    vec![ESC, b'E', enabled as u8]
}

#[inline]
pub fn bold_on() -> Vec<u8> {
    bold(true)
}

#[inline]
pub fn bold_off() -> Vec<u8> {
    bold(false)
}

// ============================================================================
// PLAIN TEXT
// ============================================================================

/// Encode text for the printer, replacing Czech/Slovak diacritics with
/// their base letter.
///
/// ```
/// use tintero::protocol::text::encode;
///
/// assert_eq!(encode("Příliš žluťoučký kůň"), b"Prilis zlutoucky kun".to_vec());
/// ```
pub fn encode(text: &str) -> Vec<u8> {
    text.chars().map(fold_diacritic).collect::<String>().into_bytes()
}

fn fold_diacritic(ch: char) -> char {
    match ch {
        'á' => 'a',
        'č' => 'c',
        'ď' => 'd',
        'é' | 'ě' => 'e',
        'í' => 'i',
        'ň' => 'n',
        'ó' => 'o',
        'ř' => 'r',
        'š' => 's',
        'ť' => 't',
        'ú' | 'ů' => 'u',
        'ý' => 'y',
        'ž' => 'z',
        'Á' => 'A',
        'Č' => 'C',
        'Ď' => 'D',
        'É' | 'Ě' => 'E',
        'Í' => 'I',
        'Ň' => 'N',
        'Ó' => 'O',
        'Ř' => 'R',
        'Š' => 'S',
        'Ť' => 'T',
        'Ú' | 'Ů' => 'U',
        'Ý' => 'Y',
        'Ž' => 'Z',
        other => other,
    }
}

/// A rule line of `columns` underscores.
pub fn rule(columns: usize) -> String {
    "_".repeat(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_bytes() {
        assert_eq!(align_left(), vec![0x1B, 0x61, 0x00]);
        assert_eq!(align_center(), vec![0x1B, 0x61, 0x01]);
        assert_eq!(align_right(), vec![0x1B, 0x61, 0x02]);
    }

    #[test]
    fn test_default_alignment_is_left() {
        assert_eq!(align(Alignment::default()), align_left());
    }

    #[test]
    fn test_line_spacing() {
        assert_eq!(line_spacing(0), vec![0x1B, 0x33, 0x00]);
        assert_eq!(line_spacing(30), vec![0x1B, 0x33, 30]);
        assert_eq!(line_spacing(255), vec![0x1B, 0x33, 0xFF]);
    }

    #[test]
    fn test_bold() {
        assert_eq!(bold_on(), vec![0x1B, 0x45, 0x01]);
        assert_eq!(bold_off(), vec![0x1B, 0x45, 0x00]);
    }

    #[test]
    fn test_encode_ascii_passthrough() {
        assert_eq!(encode("Total: 42.00\n"), b"Total: 42.00\n".to_vec());
    }

    #[test]
    fn test_encode_folds_uppercase() {
        assert_eq!(encode("ČŘŠŽÝÁÍÉĚÚŮŤĎŇÓ"), b"CRSZYAIEEUUTDNO".to_vec());
    }

    #[test]
    fn test_encode_keeps_other_unicode() {
        // Only the Czech set is folded
        assert_eq!(encode("ß"), "ß".as_bytes().to_vec());
    }

    #[test]
    fn test_rule() {
        assert_eq!(rule(4), "____");
        assert_eq!(rule(32).len(), 32);
    }
}
