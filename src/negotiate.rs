//! # Channel Negotiation
//!
//! Establishes a channel to a [`Device`], trying two strategies in order:
//!
//! ```text
//! Idle ──► Trying(Primary) ──ok──► Connected
//!               │
//!             error
//!               ▼
//!          Trying(Fallback) ──ok──► Connected
//!               │
//!             error
//!               ▼
//!             Failed
//! ```
//!
//! - **Primary**: open a channel through the first service identifier the
//!   device advertises.
//! - **Fallback**: open a channel directly on a fixed channel number. Many
//!   receipt printers reject the service-record path, so this is always
//!   attempted before giving up.
//!
//! The fallback only starts after the primary attempt has returned. There is
//! no timeout at this layer; each attempt blocks for as long as the
//! transport's own open call does.
//!
//! A negotiator is single-use: [`ChannelNegotiator::run`] consumes it and
//! yields exactly one [`ConnectionOutcome`].

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn};

use crate::error::ConnectError;
use crate::transport::Device;

/// Which way of obtaining a channel is being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Through the device's advertised service record
    Primary,
    /// Through the fixed fallback channel number
    Fallback,
}

/// Negotiation progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    Trying(Strategy),
    Connected,
    Failed,
}

impl NegotiationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, NegotiationState::Connected | NegotiationState::Failed)
    }
}

/// Terminal result of a negotiation.
pub enum ConnectionOutcome<C> {
    Connected(C),
    /// Both strategies failed. Always carries
    /// [`ConnectError::FallbackFailed`].
    Failed(ConnectError),
}

impl<C> ConnectionOutcome<C> {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionOutcome::Connected(_))
    }

    pub fn into_result(self) -> Result<C, ConnectError> {
        match self {
            ConnectionOutcome::Connected(channel) => Ok(channel),
            ConnectionOutcome::Failed(err) => Err(err),
        }
    }
}

impl<C> fmt::Debug for ConnectionOutcome<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionOutcome::Connected(_) => f.write_str("Connected(..)"),
            ConnectionOutcome::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
        }
    }
}

/// Drives the two-strategy negotiation for one device.
pub struct ChannelNegotiator<D: Device> {
    device: Arc<D>,
    fallback_channel: u8,
    state: NegotiationState,
}

impl<D: Device> ChannelNegotiator<D> {
    pub fn new(device: Arc<D>, fallback_channel: u8) -> Self {
        Self {
            device,
            fallback_channel,
            state: NegotiationState::Idle,
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Run the negotiation to completion on the current thread.
    ///
    /// Blocks for as long as the transport's open calls do.
    pub fn run(mut self) -> ConnectionOutcome<D::Channel> {
        let span = info_span!("negotiate", device = %self.device.address());
        let _guard = span.enter();

        loop {
            if let Some(outcome) = self.step() {
                return outcome;
            }
        }
    }

    /// Run the negotiation on tokio's blocking pool.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> JoinHandle<ConnectionOutcome<D::Channel>> {
        tokio::task::spawn_blocking(move || self.run())
    }

    /// Run the negotiation on tokio's blocking pool and hand the outcome to
    /// `on_complete`, exactly once.
    pub fn spawn_with<F>(self, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(ConnectionOutcome<D::Channel>) + Send + 'static,
    {
        tokio::task::spawn_blocking(move || on_complete(self.run()))
    }

    /// Advance one state. Returns the outcome once a terminal state is
    /// reached; stepping a terminal negotiator does nothing.
    fn step(&mut self) -> Option<ConnectionOutcome<D::Channel>> {
        match self.state {
            NegotiationState::Idle => {
                self.transition(NegotiationState::Trying(Strategy::Primary));
                None
            }
            NegotiationState::Trying(Strategy::Primary) => match self.try_primary() {
                Ok(channel) => {
                    self.transition(NegotiationState::Connected);
                    Some(ConnectionOutcome::Connected(channel))
                }
                Err(err) => {
                    warn!(error = %err, "Primary strategy failed, trying fallback channel");
                    self.transition(NegotiationState::Trying(Strategy::Fallback));
                    None
                }
            },
            NegotiationState::Trying(Strategy::Fallback) => match self.try_fallback() {
                Ok(channel) => {
                    self.transition(NegotiationState::Connected);
                    Some(ConnectionOutcome::Connected(channel))
                }
                Err(err) => {
                    warn!(error = %err, "Fallback strategy failed");
                    self.transition(NegotiationState::Failed);
                    Some(ConnectionOutcome::Failed(err))
                }
            },
            NegotiationState::Connected | NegotiationState::Failed => None,
        }
    }

    fn try_primary(&self) -> Result<D::Channel, ConnectError> {
        let service = *self
            .device
            .service_uuids()
            .first()
            .ok_or_else(|| ConnectError::PrimaryFailed("device advertises no services".into()))?;

        debug!(%service, "Opening service channel");
        self.device
            .open_service(service)
            .map_err(|e| ConnectError::PrimaryFailed(e.to_string()))
    }

    fn try_fallback(&self) -> Result<D::Channel, ConnectError> {
        debug!(channel = self.fallback_channel, "Opening fallback channel");
        self.device
            .open_channel(self.fallback_channel)
            .map_err(|e| ConnectError::FallbackFailed(e.to_string()))
    }

    fn transition(&mut self, next: NegotiationState) {
        debug_assert!(!self.state.is_terminal(), "negotiator is single-use");
        match next {
            NegotiationState::Connected => info!("Channel established"),
            NegotiationState::Failed => info!("Negotiation failed"),
            _ => debug!(from = ?self.state, to = ?next, "Negotiation state"),
        }
        self.state = next;
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Channel, SERIAL_PORT_SERVICE};
    use std::io;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Debug, PartialEq)]
    struct FakeChannel(&'static str);

    impl Channel for FakeChannel {
        fn write_all(&mut self, _data: &[u8]) -> io::Result<()> {
            Ok(())
        }

        fn close(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FakeDevice {
        services: Vec<Uuid>,
        primary_ok: bool,
        fallback_ok: bool,
        attempts: Mutex<Vec<String>>,
    }

    impl FakeDevice {
        fn new(primary_ok: bool, fallback_ok: bool) -> Arc<Self> {
            Arc::new(Self {
                services: vec![SERIAL_PORT_SERVICE],
                primary_ok,
                fallback_ok,
                attempts: Mutex::new(Vec::new()),
            })
        }

        fn attempts(&self) -> Vec<String> {
            self.attempts.lock().unwrap().clone()
        }
    }

    impl Device for FakeDevice {
        type Channel = FakeChannel;

        fn address(&self) -> &str {
            "fake"
        }

        fn service_uuids(&self) -> &[Uuid] {
            &self.services
        }

        fn open_service(&self, service: Uuid) -> io::Result<FakeChannel> {
            self.attempts.lock().unwrap().push(format!("service {}", service));
            if self.primary_ok {
                Ok(FakeChannel("service"))
            } else {
                Err(io::Error::new(io::ErrorKind::ConnectionRefused, "read failed"))
            }
        }

        fn open_channel(&self, channel: u8) -> io::Result<FakeChannel> {
            self.attempts.lock().unwrap().push(format!("channel {}", channel));
            if self.fallback_ok {
                Ok(FakeChannel("channel"))
            } else {
                Err(io::Error::new(io::ErrorKind::HostUnreachable, "host is down"))
            }
        }
    }

    #[test]
    fn test_primary_success_skips_fallback() {
        let device = FakeDevice::new(true, true);
        let outcome = ChannelNegotiator::new(device.clone(), 1).run();

        assert_eq!(outcome.into_result().unwrap(), FakeChannel("service"));
        assert_eq!(device.attempts(), vec![format!("service {}", SERIAL_PORT_SERVICE)]);
    }

    #[test]
    fn test_fallback_after_primary_failure() {
        let device = FakeDevice::new(false, true);
        let outcome = ChannelNegotiator::new(device.clone(), 1).run();

        assert_eq!(outcome.into_result().unwrap(), FakeChannel("channel"));
        assert_eq!(
            device.attempts(),
            vec![format!("service {}", SERIAL_PORT_SERVICE), "channel 1".to_string()]
        );
    }

    #[test]
    fn test_both_fail() {
        let device = FakeDevice::new(false, false);
        let outcome = ChannelNegotiator::new(device.clone(), 3).run();

        assert!(!outcome.is_connected());
        assert_eq!(
            outcome.into_result().unwrap_err(),
            ConnectError::FallbackFailed("host is down".into())
        );
        assert_eq!(device.attempts().len(), 2);
        assert_eq!(device.attempts()[1], "channel 3");
    }

    #[test]
    fn test_no_advertised_services_goes_to_fallback() {
        let device = Arc::new(FakeDevice {
            services: Vec::new(),
            primary_ok: true,
            fallback_ok: true,
            attempts: Mutex::new(Vec::new()),
        });
        let outcome = ChannelNegotiator::new(device.clone(), 1).run();

        assert!(outcome.is_connected());
        assert_eq!(device.attempts(), vec!["channel 1".to_string()]);
    }

    #[test]
    fn test_state_sequence() {
        let device = FakeDevice::new(false, false);
        let mut negotiator = ChannelNegotiator::new(device, 1);
        assert_eq!(negotiator.state(), NegotiationState::Idle);

        assert!(negotiator.step().is_none());
        assert_eq!(negotiator.state(), NegotiationState::Trying(Strategy::Primary));

        assert!(negotiator.step().is_none());
        assert_eq!(negotiator.state(), NegotiationState::Trying(Strategy::Fallback));

        assert!(negotiator.step().is_some());
        assert_eq!(negotiator.state(), NegotiationState::Failed);
        assert!(negotiator.state().is_terminal());

        // Terminal: nothing more happens
        assert!(negotiator.step().is_none());
        assert_eq!(negotiator.state(), NegotiationState::Failed);
    }

    #[tokio::test]
    async fn test_spawn_delivers_outcome() {
        let device = FakeDevice::new(false, true);
        let outcome = ChannelNegotiator::new(device, 1).spawn().await.unwrap();
        assert!(outcome.is_connected());
    }

    #[tokio::test]
    async fn test_spawn_with_calls_back_once() {
        let device = FakeDevice::new(false, false);
        let (tx, rx) = tokio::sync::oneshot::channel();

        ChannelNegotiator::new(device, 1)
            .spawn_with(move |outcome| {
                let _ = tx.send(outcome.is_connected());
            })
            .await
            .unwrap();

        assert!(!rx.await.unwrap());
    }

    #[test]
    fn test_outcome_debug_hides_channel() {
        let outcome: ConnectionOutcome<FakeChannel> = ConnectionOutcome::Connected(FakeChannel("x"));
        assert_eq!(format!("{:?}", outcome), "Connected(..)");
    }
}
