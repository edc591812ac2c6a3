use core::fmt::{Display, Formatter};

use crate::kiss::KissCode;
use crate::net::IpAddr;

/// Default NTP server used by [`crate::NtpClient::start_default`]
pub const DEFAULT_NTP_SERVER: &str = "us.pool.ntp.org";
/// Well-known NTP UDP port
pub const NTP_PORT: u16 = 123;
/// Default interval between two successful synchronizations in milliseconds
/// (30 minutes)
pub const DEFAULT_POLL_INTERVAL: u32 = 1_800_000;
/// Default interval between attempts after a failure or Kiss-o'-Death in
/// milliseconds
pub const DEFAULT_RETRY_INTERVAL: u32 = 30_000;
/// Default time to wait for a response before reading it, in milliseconds
pub const DEFAULT_RESPONSE_TIMEOUT: u32 = 250;

/// NTP client library result type
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for transport operations.
///
/// Protocol-level outcomes (bad packets, Kiss-o'-Death) are never errors;
/// they are reported through [`Status`]. Errors only originate from the
/// transport layer.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// Network error occurred
    Network,
    /// A NTP server address can not be resolved
    AddressResolve,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Network => f.write_str("network error"),
            Error::AddressResolve => {
                f.write_str("unable to resolve NTP server address")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result of a single [`crate::NtpClient::poll`] call
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// Nothing happened worth reporting: a request was sent, the client is
    /// waiting for a response or it is not time to poll yet
    Idle,
    /// A valid response has been received and the synchronized time updated
    Connected,
    /// No response, a malformed/unrelated response or an overlapping request
    BadPacket,
    /// Kiss-o'-Death response with a code outside of the RFC 5905 table
    UnknownKod,
    /// Kiss-o'-Death response with a known code
    Kod(KissCode),
}

impl Status {
    /// Stable one-byte status code.
    ///
    /// | Code          | Status                  |
    /// |---------------|-------------------------|
    /// | `0x00`        | [`Status::BadPacket`]   |
    /// | `0x01`        | [`Status::Idle`]        |
    /// | `0x02`        | [`Status::Connected`]   |
    /// | `0x10..=0x1E` | [`Status::Kod`]         |
    /// | `0x20`        | [`Status::UnknownKod`]  |
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn code(self) -> u8 {
        const KOD_BASE: u8 = 0x10;

        match self {
            Status::BadPacket => 0x00,
            Status::Idle => 0x01,
            Status::Connected => 0x02,
            Status::Kod(code) => KOD_BASE + code.index() as u8,
            Status::UnknownKod => 0x20,
        }
    }

    /// Returns `true` for both known and unknown Kiss-o'-Death statuses
    #[must_use]
    pub fn is_kiss_of_death(self) -> bool {
        matches!(self, Status::Kod(_) | Status::UnknownKod)
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> Self {
        status.code()
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Status::Idle => f.write_str("idle"),
            Status::Connected => f.write_str("connected"),
            Status::BadPacket => f.write_str("bad packet"),
            Status::UnknownKod => f.write_str("unknown kiss-o'-death"),
            Status::Kod(code) => write!(f, "kiss-o'-death {code}"),
        }
    }
}

/// NTP server identity the client sends requests to.
///
/// Name resolution is left to the [`NtpUdpSocket`] implementation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NtpServer<'a> {
    /// Server host name, e.g. `"pool.ntp.org"`
    Host(&'a str),
    /// Server IP address
    Ip(IpAddr),
}

impl Default for NtpServer<'_> {
    fn default() -> Self {
        NtpServer::Host(DEFAULT_NTP_SERVER)
    }
}

impl<'a> From<&'a str> for NtpServer<'a> {
    fn from(host: &'a str) -> Self {
        NtpServer::Host(host)
    }
}

impl From<IpAddr> for NtpServer<'_> {
    fn from(addr: IpAddr) -> Self {
        NtpServer::Ip(addr)
    }
}

impl Display for NtpServer<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            NtpServer::Host(host) => f.write_str(host),
            NtpServer::Ip(addr) => write!(f, "{addr}"),
        }
    }
}

/// Client timing and port configuration. All durations are in milliseconds.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NtpConfig {
    pub(crate) poll_interval: u32,
    pub(crate) retry_interval: u32,
    pub(crate) response_timeout: u32,
    pub(crate) local_port: u16,
    pub(crate) server_port: u16,
}

impl Default for NtpConfig {
    fn default() -> Self {
        NtpConfig::new()
    }
}

impl NtpConfig {
    /// Create configuration with the default values: 30 minutes poll interval,
    /// 30 seconds retry interval, 250 ms response timeout, port 123 on both
    /// ends
    #[must_use]
    pub const fn new() -> Self {
        NtpConfig {
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            local_port: NTP_PORT,
            server_port: NTP_PORT,
        }
    }

    /// Set the interval between two successful synchronizations
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: u32) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the interval used after a failed exchange or a Kiss-o'-Death
    #[must_use]
    pub const fn with_retry_interval(mut self, interval: u32) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Set the time the client waits after sending a request before it reads
    /// the response
    #[must_use]
    pub const fn with_response_timeout(mut self, timeout: u32) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set the local UDP port the transport is opened on
    #[must_use]
    pub const fn with_local_port(mut self, port: u16) -> Self {
        self.local_port = port;
        self
    }

    /// Set the destination UDP port of the NTP server
    #[must_use]
    pub const fn with_server_port(mut self, port: u16) -> Self {
        self.server_port = port;
        self
    }

    #[must_use]
    pub const fn poll_interval(&self) -> u32 {
        self.poll_interval
    }

    #[must_use]
    pub const fn retry_interval(&self) -> u32 {
        self.retry_interval
    }

    #[must_use]
    pub const fn response_timeout(&self) -> u32 {
        self.response_timeout
    }

    #[must_use]
    pub const fn local_port(&self) -> u16 {
        self.local_port
    }

    #[must_use]
    pub const fn server_port(&self) -> u16 {
        self.server_port
    }
}

/// A trait encapsulating the monotonic millisecond clock the client runs on.
///
/// The counter starts at an arbitrary point (e.g. device boot) and is expected
/// to wrap around after `u32::MAX` milliseconds; the client only ever compares
/// readings with wrapping arithmetic.
pub trait MonotonicClock {
    /// Returns the current counter value in milliseconds
    fn now_ms(&self) -> u32;
}

/// A trait encapsulating the non-blocking UDP transport required for NTP client
/// operations.
///
/// None of the methods may block: the client is driven from a single polling
/// loop and relies on every call returning immediately.
pub trait NtpUdpSocket {
    /// Open the transport on the given local port
    ///
    /// # Errors
    ///
    /// Will return `Err` if the underlying socket can not be created or bound
    fn open(&mut self, local_port: u16) -> Result<()>;

    /// Send the given buffer as a single datagram to the server. On success,
    /// returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the server address can not be resolved or the
    /// underlying UDP send fails
    fn send_to(
        &mut self,
        buf: &[u8],
        server: &NtpServer<'_>,
        port: u16,
    ) -> Result<usize>;

    /// Receive the next queued datagram into `buf`.
    ///
    /// Returns `Ok(None)` when no datagram is waiting, otherwise the number of
    /// bytes the datagram carried (implementations may truncate the payload to
    /// `buf.len()`).
    ///
    /// # Errors
    ///
    /// Will return `Err` if the underlying UDP receive fails
    fn recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>>;

    /// Release the transport
    fn close(&mut self);
}

#[cfg(feature = "std")]
/// Supplementary module to implement some `ntpoll` boilerplate that
/// environments with `std` enable have to re-implement.
mod sup {
    use std::time::Instant;

    use crate::MonotonicClock;

    /// Standard library clock wrapper that relies on [`std::time::Instant`] to
    /// provide a wrapping millisecond counter since the clock creation
    #[derive(Copy, Clone, Debug)]
    pub struct StdMonotonicClock {
        origin: Instant,
    }

    impl Default for StdMonotonicClock {
        fn default() -> Self {
            StdMonotonicClock {
                origin: Instant::now(),
            }
        }
    }

    impl MonotonicClock for StdMonotonicClock {
        #[allow(clippy::cast_possible_truncation)]
        fn now_ms(&self) -> u32 {
            self.origin.elapsed().as_millis() as u32
        }
    }
}

#[cfg(feature = "std")]
pub use sup::*;

#[cfg(test)]
mod ntp_types_tests {
    use crate::{KissCode, NtpConfig, NtpServer, Status};
    use core::net::{IpAddr, Ipv4Addr};

    struct StatusCodeTestCase {
        status: Status,
        expected: u8,
    }

    impl StatusCodeTestCase {
        fn new(status: Status, expected: u8) -> Self {
            StatusCodeTestCase { status, expected }
        }
    }

    #[test]
    fn test_status_codes() {
        let tests = [
            StatusCodeTestCase::new(Status::BadPacket, 0x00),
            StatusCodeTestCase::new(Status::Idle, 0x01),
            StatusCodeTestCase::new(Status::Connected, 0x02),
            StatusCodeTestCase::new(Status::Kod(KissCode::Rate), 0x10),
            StatusCodeTestCase::new(Status::Kod(KissCode::Deny), 0x11),
            StatusCodeTestCase::new(Status::Kod(KissCode::Rstr), 0x18),
            StatusCodeTestCase::new(Status::Kod(KissCode::Mcst), 0x1A),
            StatusCodeTestCase::new(Status::Kod(KissCode::Step), 0x1E),
            StatusCodeTestCase::new(Status::UnknownKod, 0x20),
        ];

        for t in tests {
            assert_eq!(t.status.code(), t.expected, "{:?}", t.status);
            assert_eq!(u8::from(t.status), t.expected);
        }
    }

    #[test]
    fn test_kiss_of_death_statuses() {
        assert!(Status::Kod(KissCode::Auth).is_kiss_of_death());
        assert!(Status::UnknownKod.is_kiss_of_death());
        assert!(!Status::BadPacket.is_kiss_of_death());
        assert!(!Status::Connected.is_kiss_of_death());
    }

    #[test]
    fn test_status_str_representation() {
        assert_eq!(format!("{}", Status::Connected), "connected");
        assert_eq!(
            format!("{}", Status::Kod(KissCode::Rate)),
            "kiss-o'-death RATE"
        );
    }

    #[test]
    fn test_default_config() {
        let config = NtpConfig::default();

        assert_eq!(config.poll_interval(), 1_800_000);
        assert_eq!(config.retry_interval(), 30_000);
        assert_eq!(config.response_timeout(), 250);
        assert_eq!(config.local_port(), 123);
        assert_eq!(config.server_port(), 123);
    }

    #[test]
    fn test_config_builder() {
        let config = NtpConfig::new()
            .with_poll_interval(60_000)
            .with_retry_interval(5_000)
            .with_response_timeout(100)
            .with_local_port(0)
            .with_server_port(1123);

        assert_eq!(config.poll_interval(), 60_000);
        assert_eq!(config.retry_interval(), 5_000);
        assert_eq!(config.response_timeout(), 100);
        assert_eq!(config.local_port(), 0);
        assert_eq!(config.server_port(), 1123);
    }

    #[test]
    fn test_server_identity() {
        assert_eq!(NtpServer::default(), NtpServer::Host("us.pool.ntp.org"));
        assert_eq!(
            NtpServer::from("time.google.com").to_string(),
            "time.google.com"
        );

        let addr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(NtpServer::from(addr), NtpServer::Ip(addr));
        assert_eq!(NtpServer::Ip(addr).to_string(), "192.168.1.1");
    }
}
