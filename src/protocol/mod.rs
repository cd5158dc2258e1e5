//! # ESC/POS Protocol Implementation
//!
//! Low-level command builders for ESC/POS receipt printers.
//!
//! ## Module Structure
//!
//! - [`commands`]: Byte constants, new line and paper feed
//! - [`text`]: Alignment, bold, line spacing, plain-text encoding
//! - [`graphics`]: Raster bit image encoding (`GS v 0`)
//!
//! ## Usage Example
//!
//! ```
//! use tintero::protocol::{commands, graphics, text};
//! use tintero::protocol::graphics::Bitmap;
//!
//! let mut data = Vec::new();
//!
//! data.extend(text::align_center());
//! data.extend(text::bold_on());
//! data.extend(text::encode("Účtenka\n"));
//! data.extend(text::bold_off());
//!
//! let logo = Bitmap::filled(64, 16, Bitmap::BLACK);
//! data.extend(graphics::encode(&logo)?);
//!
//! data.extend(commands::feed());
//! # Ok::<(), tintero::EncodeError>(())
//! ```

pub mod commands;
pub mod graphics;
pub mod text;
