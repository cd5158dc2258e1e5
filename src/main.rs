//! # Tintero CLI
//!
//! Command-line interface for Bluetooth receipt printing.
//!
//! ## Usage
//!
//! ```bash
//! # Print an image (scaled down to 384 dots wide)
//! tintero image 00:11:22:33:44:55 logo.png
//!
//! # Print a line of text, centered and bold
//! tintero text 00:11:22:33:44:55 "Děkujeme za nákup" --align center --bold
//!
//! # Encode an image to raw printer commands without a printer
//! tintero encode logo.png -o logo.bin
//!
//! # Printer listens on RFCOMM channel 2 instead of 1
//! tintero --channel 2 text 00:11:22:33:44:55 "hello"
//! ```
//!
//! Set `RUST_LOG=tintero=debug` to see negotiation details.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use image::DynamicImage;
use image::imageops::FilterType;
use tracing::info;
use uuid::Uuid;

use tintero::{
    BluetoothDevice, PrinterConfig, PrinterSession,
    protocol::graphics::{self, InkRule, MAX_ROWS, MAX_WIDTH_DOTS},
    protocol::text::Alignment,
    transport::SERIAL_PORT_SERVICE,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Tintero - Bluetooth receipt printer utility
#[derive(Parser, Debug)]
#[command(name = "tintero")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// RFCOMM channel used when the service channel cannot be opened
    #[arg(long, global = true, default_value_t = PrinterConfig::DEFAULT.fallback_channel)]
    channel: u8,

    /// Service UUID advertised by the printer (repeatable)
    #[arg(long = "service", global = true, value_name = "UUID")]
    services: Vec<Uuid>,

    /// Channel value at or below which a pixel channel counts as dark
    #[arg(long, global = true, default_value_t = PrinterConfig::DEFAULT.ink_threshold)]
    threshold: u8,

    /// Print a pixel when any channel is dark, not only when all are
    #[arg(long, global = true)]
    any_channel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print an image file
    Image {
        /// Printer Bluetooth address (XX:XX:XX:XX:XX:XX)
        address: String,

        /// Image file (PNG, JPEG, ...)
        file: PathBuf,

        /// Maximum print width in dots; wider images are scaled down
        #[arg(long, default_value = "384")]
        width: u32,

        #[arg(long, value_enum, default_value_t = AlignArg::Center)]
        align: AlignArg,
    },

    /// Print a line of text
    Text {
        /// Printer Bluetooth address (XX:XX:XX:XX:XX:XX)
        address: String,

        text: String,

        #[arg(long, value_enum, default_value_t = AlignArg::Left)]
        align: AlignArg,

        #[arg(long)]
        bold: bool,

        /// Line spacing in motion units
        #[arg(long)]
        spacing: Option<u8>,
    },

    /// Encode an image to raster commands and write them to a file
    Encode {
        file: PathBuf,

        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Maximum print width in dots; wider images are scaled down
        #[arg(long, default_value = "384")]
        width: u32,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum AlignArg {
    Left,
    Center,
    Right,
}

impl From<AlignArg> for Alignment {
    fn from(arg: AlignArg) -> Self {
        match arg {
            AlignArg::Left => Alignment::Left,
            AlignArg::Center => Alignment::Center,
            AlignArg::Right => Alignment::Right,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tintero=info".into()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), BoxError> {
    let cli = Cli::parse();

    let rule = if cli.any_channel {
        InkRule::AnyChannelDark
    } else {
        InkRule::AllChannelsDark
    };
    let config = PrinterConfig::DEFAULT
        .with_fallback_channel(cli.channel)
        .with_ink_threshold(cli.threshold)
        .with_ink_rule(rule);

    match cli.command {
        Commands::Image {
            address,
            file,
            width,
            align,
        } => {
            let img = load_image(&file, width)?;
            let mut session = open_session(&address, cli.services, config).await?;

            session.set_align(align.into())?;
            for strip in graphics::strips(&img, MAX_ROWS) {
                session.print_image(&strip)?;
            }
            session.feed_paper()?;
            session.disconnect();
            println!("Printed {} ({}x{})", file.display(), img.width(), img.height());
        }
        Commands::Text {
            address,
            text,
            align,
            bold,
            spacing,
        } => {
            let mut session = open_session(&address, cli.services, config).await?;

            session.set_align(align.into())?;
            if let Some(spacing) = spacing {
                session.set_line_spacing(spacing)?;
            }
            session.set_bold(bold)?;
            session.print_text(&text)?;
            session.add_new_line()?;
            if bold {
                session.set_bold(false)?;
            }
            session.feed_paper()?;
            session.disconnect();
            println!("Printed successfully!");
        }
        Commands::Encode {
            file,
            output,
            width,
        } => {
            let img = load_image(&file, width)?;
            let encoder = config.encoder();

            let mut data = Vec::new();
            for strip in graphics::strips(&img, MAX_ROWS) {
                data.extend(encoder.encode(&strip)?);
            }
            std::fs::write(&output, &data)?;
            println!("Wrote {} bytes to {}", data.len(), output.display());
        }
    }

    Ok(())
}

/// Load an image and scale it down to at most `max_width` dots.
fn load_image(path: &Path, max_width: u32) -> Result<DynamicImage, BoxError> {
    let max_width = max_width.clamp(1, MAX_WIDTH_DOTS);
    let img = image::open(path)?;
    if img.width() <= max_width {
        return Ok(img);
    }

    info!(from = img.width(), to = max_width, "Scaling image");
    Ok(img.resize(max_width, u32::MAX, FilterType::Lanczos3))
}

async fn open_session(
    address: &str,
    services: Vec<Uuid>,
    config: PrinterConfig,
) -> Result<PrinterSession<BluetoothDevice>, BoxError> {
    let services = if services.is_empty() {
        vec![SERIAL_PORT_SERVICE]
    } else {
        services
    };
    let device = BluetoothDevice::new(address)?.with_services(services);

    println!("Connecting to {}...", address.to_uppercase());
    let mut session = PrinterSession::with_config(device, config);
    session.connect().await?;
    Ok(session)
}
