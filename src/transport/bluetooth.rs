//! # Bluetooth RFCOMM Transport
//!
//! This module talks to receipt printers over the Bluetooth Serial Port
//! Profile (SPP) via RFCOMM on Linux.
//!
//! ## Two Ways In
//!
//! | Method | How | Needs |
//! |--------|-----|-------|
//! | [`Device::open_service`] | Looks up the RFCOMM channel the service record advertises (`sdptool browse`), then opens the `/dev/rfcommN` TTY bound to that channel or connects a socket to it | `sdptool`, an advertised service |
//! | [`Device::open_channel`] | Connects a raw RFCOMM socket to a channel number | nothing, printer must listen on that channel |
//!
//! Many printers do not publish a usable service record, so the fixed
//! channel is what usually works. The service path goes first because it
//! reaches the port the printer says it listens on.
//!
//! ## Bluetooth Setup (Linux)
//!
//! ```bash
//! # Pair, then check which channel the printer advertises
//! $ bluetoothctl pair 00:11:62:XX:XX:XX
//! $ sdptool browse 00:11:62:XX:XX:XX
//! # Optional: bind that channel so the TTY is used (creates /dev/rfcomm0)
//! $ sudo rfcomm bind 0 00:11:62:XX:XX:XX 1
//! ```
//!
//! ## TTY Configuration
//!
//! The RFCOMM TTY is opened in raw mode so binary data is transmitted
//! without modification:
//!
//! - **No input processing**: Disable IGNBRK, BRKINT, PARMRK, ISTRIP, etc.
//! - **No output processing**: Disable OPOST (no CR/LF translation)
//! - **8-bit characters**: CS8 (8 data bits, no parity)
//! - **No echo**: Disable ECHO, ECHONL
//! - **Non-canonical mode**: Disable ICANON (no line buffering)
//!
//! ## Chunked Writes
//!
//! Large data blocks are written in chunks with a small delay between them
//! to avoid overwhelming the Bluetooth buffer.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use super::{Channel, Device, SERIAL_PORT_SERVICE};
use crate::printer::PrinterConfig;

/// # Bluetooth Printer
///
/// A paired printer identified by its MAC address.
///
/// ## Example
///
/// ```no_run
/// use tintero::transport::{BluetoothDevice, Device};
///
/// let printer = BluetoothDevice::new("00:11:22:33:44:55")?;
/// let mut channel = printer.open_channel(1)?;
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct BluetoothDevice {
    address: String,
    services: Vec<Uuid>,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl BluetoothDevice {
    /// Create a device advertising the Serial Port Profile.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidInput` if `address` is not `XX:XX:XX:XX:XX:XX`.
    pub fn new(address: &str) -> io::Result<Self> {
        if !is_valid_mac(address) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid Bluetooth address: {}", address),
            ));
        }

        Ok(Self {
            address: address.to_uppercase(),
            services: vec![SERIAL_PORT_SERVICE],
            chunk_size: PrinterConfig::DEFAULT.chunk_size,
            chunk_delay: PrinterConfig::DEFAULT.chunk_delay,
        })
    }

    /// Replace the advertised service list (e.g. with the result of an
    /// SDP browse).
    pub fn with_services(mut self, services: Vec<Uuid>) -> Self {
        self.services = services;
        self
    }

    fn wrap(&self, file: File) -> RfcommChannel {
        RfcommChannel {
            file: Some(file),
            chunk_size: self.chunk_size,
            chunk_delay: self.chunk_delay,
        }
    }
}

impl Device for BluetoothDevice {
    type Channel = RfcommChannel;

    fn address(&self) -> &str {
        &self.address
    }

    fn service_uuids(&self) -> &[Uuid] {
        &self.services
    }

    fn configure(&mut self, config: &PrinterConfig) {
        self.chunk_size = config.chunk_size;
        self.chunk_delay = config.chunk_delay;
    }

    fn open_service(&self, service: Uuid) -> io::Result<RfcommChannel> {
        let channel = sdp_channel_for(&self.address, service)?;
        debug!(%service, channel, "Service record resolved");

        if let Some(path) = find_rfcomm_for_mac(&self.address, channel) {
            info!(device = %path, %service, channel, "Opening bound RFCOMM device");
            let file = OpenOptions::new().write(true).open(&path)?;
            configure_tty_raw(file.as_raw_fd())?;
            return Ok(self.wrap(file));
        }

        self.open_channel(channel)
    }

    fn open_channel(&self, channel: u8) -> io::Result<RfcommChannel> {
        info!(address = %self.address, channel, "Connecting RFCOMM socket");
        let file = connect_rfcomm(parse_mac(&self.address)?, channel)?;
        Ok(self.wrap(file))
    }
}

// ============================================================================
// CHANNEL
// ============================================================================

/// An open RFCOMM stream, backed by either a TTY or a socket.
#[derive(Debug)]
pub struct RfcommChannel {
    file: Option<File>,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl Channel for RfcommChannel {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "RFCOMM channel closed"))?;
        write_chunked(file, data, self.chunk_size, self.chunk_delay)
    }

    fn close(&mut self) -> io::Result<()> {
        match self.file.take() {
            // Dropping the file closes the descriptor
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Write `data` in `chunk_size` pieces, sleeping `delay` between pieces,
/// then flush.
///
/// Small writes (at most one chunk) go out in a single call.
fn write_chunked<W: Write>(
    out: &mut W,
    data: &[u8],
    chunk_size: usize,
    delay: Duration,
) -> io::Result<()> {
    if data.len() <= chunk_size || chunk_size == 0 {
        out.write_all(data)?;
    } else {
        debug!(bytes = data.len(), chunk_size, "Chunked write");
        for chunk in data.chunks(chunk_size) {
            out.write_all(chunk)?;
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }
    }
    out.flush()
}

// ============================================================================
// RFCOMM SOCKET
// ============================================================================

/// `BTPROTO_RFCOMM` from `<bluetooth/bluetooth.h>`
#[cfg(target_os = "linux")]
const BTPROTO_RFCOMM: libc::c_int = 3;

/// `struct sockaddr_rc` from `<bluetooth/rfcomm.h>`
#[cfg(target_os = "linux")]
#[repr(C)]
struct SockaddrRc {
    rc_family: libc::sa_family_t,
    rc_bdaddr: [u8; 6],
    rc_channel: u8,
}

/// Connect a stream socket to `channel` on the device at `bdaddr`.
///
/// `bdaddr` is in BlueZ byte order (least significant byte first).
#[cfg(target_os = "linux")]
fn connect_rfcomm(bdaddr: [u8; 6], channel: u8) -> io::Result<File> {
    use std::os::fd::{FromRawFd, OwnedFd};

    let fd = unsafe {
        libc::socket(
            libc::AF_BLUETOOTH,
            libc::SOCK_STREAM | libc::SOCK_CLOEXEC,
            BTPROTO_RFCOMM,
        )
    };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    // Owned from here on so every early return closes it
    let fd = unsafe { OwnedFd::from_raw_fd(fd) };

    let addr = SockaddrRc {
        rc_family: libc::AF_BLUETOOTH as libc::sa_family_t,
        rc_bdaddr: bdaddr,
        rc_channel: channel,
    };
    let result = unsafe {
        libc::connect(
            fd.as_raw_fd(),
            &addr as *const SockaddrRc as *const libc::sockaddr,
            std::mem::size_of::<SockaddrRc>() as libc::socklen_t,
        )
    };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(File::from(fd))
}

#[cfg(not(target_os = "linux"))]
fn connect_rfcomm(_bdaddr: [u8; 6], _channel: u8) -> io::Result<File> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "RFCOMM sockets are only supported on Linux",
    ))
}

// ============================================================================
// TTY
// ============================================================================

/// Configure a file descriptor for raw TTY mode.
///
/// ## What Gets Disabled
///
/// - **Input flags**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR, ICRNL, IXON, IXOFF, IXANY
/// - **Output flags**: OPOST
/// - **Local flags**: ECHO, ECHONL, ICANON, ISIG, IEXTEN
/// - **Control flags**: CSIZE, PARENB (then CS8 is set)
///
/// IXON/IXOFF/IXANY must be off: 0x11 (XON) and 0x13 (XOFF) appear in
/// raster data.
#[cfg(unix)]
fn configure_tty_raw(fd: i32) -> io::Result<()> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

#[cfg(not(unix))]
fn configure_tty_raw(_fd: i32) -> io::Result<()> {
    Ok(())
}

// ============================================================================
// ADDRESS HELPERS
// ============================================================================

/// Validate a Bluetooth MAC address format (XX:XX:XX:XX:XX:XX).
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return false;
    }
    parts
        .iter()
        .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Parse a MAC address into BlueZ byte order (reversed).
fn parse_mac(mac: &str) -> io::Result<[u8; 6]> {
    let invalid = || {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Invalid Bluetooth address: {}", mac),
        )
    };
    if !is_valid_mac(mac) {
        return Err(invalid());
    }

    let mut bdaddr = [0u8; 6];
    for (i, part) in mac.split(':').enumerate() {
        bdaddr[5 - i] = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
    }
    Ok(bdaddr)
}

/// Find an existing RFCOMM device bound to `channel` on the given MAC
/// address.
///
/// Reads the `rfcomm -a` listing. A missing `rfcomm` tool counts as no
/// binding. Returns the device path (e.g., "/dev/rfcomm0") if found.
#[cfg(unix)]
pub fn find_rfcomm_for_mac(mac: &str, channel: u8) -> Option<String> {
    let output = Command::new("rfcomm").arg("-a").output().ok()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    rfcomm_device_in(&stdout, mac, channel)
        .filter(|path| Path::new(path).exists())
}

#[cfg(not(unix))]
pub fn find_rfcomm_for_mac(_mac: &str, _channel: u8) -> Option<String> {
    None
}

/// Scan an `rfcomm -a` listing ("rfcomm0: XX:XX:... channel N clean") for a
/// binding to `mac` on `channel`.
fn rfcomm_device_in(listing: &str, mac: &str, channel: u8) -> Option<String> {
    let mac_upper = mac.to_uppercase();
    listing.lines().find_map(|line| {
        let (name, rest) = line.split_once(':')?;
        let mut fields = rest.split_whitespace();
        let bound_mac = fields.next()?;
        let bound_channel = fields.skip_while(|f| *f != "channel").nth(1)?;
        (bound_mac.eq_ignore_ascii_case(&mac_upper) && bound_channel.parse::<u8>().ok() == Some(channel))
            .then(|| format!("/dev/{}", name.trim()))
    })
}

// ============================================================================
// SERVICE DISCOVERY
// ============================================================================

/// Low 96 bits of the Bluetooth Base UUID (`0000xxxx-0000-1000-8000-00805F9B34FB`)
const BASE_UUID_LOW: u128 = 0x0000_1000_8000_0080_5f9b_34fb;

/// The 16-bit alias of a UUID built on the Bluetooth Base UUID.
fn short_alias(service: Uuid) -> Option<u16> {
    let value = service.as_u128();
    let low_mask = (1u128 << 96) - 1;
    (value & low_mask == BASE_UUID_LOW && value >> 112 == 0).then(|| (value >> 96) as u16)
}

/// Ask the device's SDP server which RFCOMM channel serves `service`.
fn sdp_channel_for(mac: &str, service: Uuid) -> io::Result<u8> {
    let output = Command::new("sdptool").args(["browse", mac]).output()?;
    if !output.status.success() {
        return Err(io::Error::other(format!(
            "sdptool browse {} failed: {}",
            mac,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let listing = String::from_utf8_lossy(&output.stdout);
    rfcomm_channel_in(&listing, service).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} advertises no RFCOMM channel for service {}", mac, service),
        )
    })
}

/// Find the RFCOMM channel of the record whose service class list names
/// `service`, in `sdptool browse` output.
///
/// Records are separated by blank lines. 16-bit classes appear as
/// `"Serial Port" (0x1101)`, 128-bit ones as `UUID 128: 0000...`.
fn rfcomm_channel_in(listing: &str, service: Uuid) -> Option<u8> {
    let full = service.hyphenated().to_string();
    let alias = short_alias(service).map(|n| format!("(0x{:04x})", n));

    listing.split("\n\n").find_map(|record| {
        let advertises = section(record, "Service Class ID List:").any(|line| {
            let line = line.to_lowercase();
            line.contains(&full) || alias.as_deref().is_some_and(|a| line.contains(a))
        });
        if !advertises {
            return None;
        }
        section(record, "Protocol Descriptor List:")
            .find_map(|line| line.trim().strip_prefix("Channel:")?.trim().parse().ok())
    })
}

/// Indented lines under `heading` in one SDP record.
fn section<'a>(record: &'a str, heading: &'a str) -> impl Iterator<Item = &'a str> {
    record
        .lines()
        .skip_while(move |line| !line.starts_with(heading))
        .skip(1)
        .take_while(|line| line.starts_with(' '))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_mac_addresses() {
        assert!(is_valid_mac("00:11:22:33:44:55"));
        assert!(is_valid_mac("AA:BB:CC:DD:EE:FF"));
        assert!(is_valid_mac("aa:bb:cc:dd:ee:ff"));
    }

    #[test]
    fn test_invalid_mac_addresses() {
        assert!(!is_valid_mac("00:11:22:33:44")); // too short
        assert!(!is_valid_mac("00:11:22:33:44:55:66")); // too long
        assert!(!is_valid_mac("00-11-22-33-44-55")); // wrong separator
        assert!(!is_valid_mac("GG:HH:II:JJ:KK:LL")); // invalid hex
        assert!(!is_valid_mac(""));
    }

    #[test]
    fn test_parse_mac_is_reversed() {
        assert_eq!(
            parse_mac("00:11:22:33:44:AB").unwrap(),
            [0xAB, 0x44, 0x33, 0x22, 0x11, 0x00]
        );
        assert!(parse_mac("nope").is_err());
    }

    #[test]
    fn test_device_defaults_to_serial_port_service() {
        let device = BluetoothDevice::new("aa:bb:cc:dd:ee:ff").unwrap();
        assert_eq!(device.address(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(device.service_uuids(), &[SERIAL_PORT_SERVICE]);
    }

    #[test]
    fn test_device_rejects_bad_address() {
        let err = BluetoothDevice::new("printer").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_rfcomm_listing_without_match() {
        let listing = "rfcomm0: 00:11:22:33:44:55 channel 1 clean\n";
        assert_eq!(rfcomm_device_in(listing, "66:77:88:99:AA:BB", 1), None);
    }

    #[test]
    fn test_rfcomm_listing_requires_same_channel() {
        let listing = "rfcomm0: 00:11:22:33:44:55 channel 1 clean\n\
                       rfcomm1: 00:11:22:33:44:55 channel 6 connected [tty-attached]\n";
        assert_eq!(
            rfcomm_device_in(listing, "00:11:22:33:44:55", 6),
            Some("/dev/rfcomm1".to_string())
        );
        assert_eq!(
            rfcomm_device_in(listing, "00:11:22:33:44:55", 1),
            Some("/dev/rfcomm0".to_string())
        );
        assert_eq!(rfcomm_device_in(listing, "00:11:22:33:44:55", 3), None);
    }

    const SDP_BROWSE: &str = "\
Browsing 00:11:22:33:44:55 ...
Service Name: Serial Port
Service RecHandle: 0x10000
Service Class ID List:
  \"Serial Port\" (0x1101)
Protocol Descriptor List:
  \"L2CAP\" (0x0100)
  \"RFCOMM\" (0x0003)
    Channel: 1
Profile Descriptor List:
  \"Serial Port\" (0x1101)
    Version: 0x0102

Service Name: Printer Config
Service RecHandle: 0x10001
Service Class ID List:
  UUID 128: e7810a71-73ae-499d-8c15-faa9aef0c3f2
Protocol Descriptor List:
  \"L2CAP\" (0x0100)
  \"RFCOMM\" (0x0003)
    Channel: 6
";

    #[test]
    fn test_sdp_channel_for_serial_port() {
        assert_eq!(rfcomm_channel_in(SDP_BROWSE, SERIAL_PORT_SERVICE), Some(1));
    }

    #[test]
    fn test_sdp_channel_for_custom_service() {
        let custom = Uuid::from_u128(0xe7810a71_73ae_499d_8c15_faa9aef0c3f2);
        assert_eq!(rfcomm_channel_in(SDP_BROWSE, custom), Some(6));
    }

    #[test]
    fn test_sdp_unadvertised_service() {
        assert_eq!(rfcomm_channel_in(SDP_BROWSE, Uuid::nil()), None);
        let obex = Uuid::from_u128(0x0000_1105_0000_1000_8000_0080_5f9b_34fb);
        assert_eq!(rfcomm_channel_in(SDP_BROWSE, obex), None);
    }

    #[test]
    fn test_short_alias() {
        assert_eq!(short_alias(SERIAL_PORT_SERVICE), Some(0x1101));
        assert_eq!(short_alias(Uuid::nil()), None);
        assert_eq!(
            short_alias(Uuid::from_u128(0xe7810a71_73ae_499d_8c15_faa9aef0c3f2)),
            None
        );
    }

    #[test]
    fn test_session_config_reaches_channels() {
        use crate::PrinterSession;

        let config = PrinterConfig::DEFAULT
            .with_chunk_size(512)
            .with_chunk_delay(Duration::from_millis(7));
        let device = BluetoothDevice::new("00:11:22:33:44:55").unwrap();
        let session = PrinterSession::with_config(device, config);

        let channel = session.device().wrap(File::open("/dev/null").unwrap());
        assert_eq!(channel.chunk_size, 512);
        assert_eq!(channel.chunk_delay, Duration::from_millis(7));
    }

    #[test]
    fn test_write_chunked_small() {
        let mut out = Vec::new();
        write_chunked(&mut out, &[1, 2, 3], 4096, Duration::ZERO).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn test_write_chunked_large_preserves_bytes() {
        let data: Vec<u8> = (0..10_000).map(|i| (i % 251) as u8).collect();
        let mut out = Vec::new();
        write_chunked(&mut out, &data, 1024, Duration::ZERO).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_closed_channel_rejects_writes() {
        let mut channel = RfcommChannel {
            file: None,
            chunk_size: 4096,
            chunk_delay: Duration::ZERO,
        };
        let err = channel.write_all(&[0x0A]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        // Closing twice is harmless
        assert!(channel.close().is_ok());
        assert!(channel.close().is_ok());
    }

    // Note: opening channels requires actual hardware.
}
