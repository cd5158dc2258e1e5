//! # Printer Module
//!
//! Printer-side settings shared by the transport and the session.
//!
//! ## Modules
//!
//! - [`config`]: Connection, chunking and rendering settings

pub mod config;

pub use config::PrinterConfig;
