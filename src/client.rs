use crate::kiss::KissCode;
#[allow(unused_imports)]
use crate::log::{log_debug, log_warn};
use crate::packet::{process_response, RawNtpPacket, Response, NTP_PACKET_SIZE};
use crate::sync::{has_elapsed, SyncRecord};
use crate::types::{
    MonotonicClock, NtpConfig, NtpServer, NtpUdpSocket, Result, Status,
};

/// Receive buffer size. Larger than an NTP packet so that oversized datagrams
/// are detected instead of silently truncated to 48 bytes
const RECV_BUFFER_SIZE: usize = 64;

/// Outstanding request marker
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct PendingRequest {
    sent_at: u32,
    token: u32,
    /// Response timeout captured at send time
    timeout: u32,
}

/// Mutable runtime state of the client, kept apart from [`NtpConfig`]
#[derive(Debug, Copy, Clone)]
struct ClientState {
    started: bool,
    pending: Option<PendingRequest>,
    last_sent: u32,
    force: bool,
    /// Poll interval, or the retry interval after a failure until the next
    /// successful sync
    active_interval: u32,
    synchronized: bool,
    status: Status,
    sync: Option<SyncRecord>,
}

impl ClientState {
    fn new(poll_interval: u32) -> Self {
        ClientState {
            started: false,
            pending: None,
            last_sent: 0,
            force: false,
            active_interval: poll_interval,
            synchronized: false,
            status: Status::Idle,
            sync: None,
        }
    }
}

/// Non-blocking NTP client driven by repeated [`NtpClient::poll`] calls.
///
/// The client keeps at most one request in flight. A request is sent when the
/// active poll interval elapsed (or an update is forced), and its response is
/// read once the response timeout passed. Each accepted response refreshes the
/// [`SyncRecord`] the current time estimate is derived from; failures never
/// discard it.
///
/// # Example
///
/// ```no_run
/// use ntpoll::{NtpClient, NtpConfig, Status, StdMonotonicClock, StdUdpSocket};
///
/// let config = NtpConfig::new().with_local_port(0);
/// let mut client = NtpClient::with_config(
///     StdUdpSocket::default(),
///     StdMonotonicClock::default(),
///     config,
/// );
///
/// client.start("pool.ntp.org").expect("Unable to open UDP socket");
///
/// loop {
///     if client.poll() == Status::Connected {
///         println!("UNIX time: {:?}", client.epoch());
///         break;
///     }
///     // ... other work of the application loop
/// }
/// ```
pub struct NtpClient<'a, U, C> {
    socket: U,
    clock: C,
    server: NtpServer<'a>,
    config: NtpConfig,
    state: ClientState,
}

impl<'a, U, C> NtpClient<'a, U, C>
where
    U: NtpUdpSocket,
    C: MonotonicClock,
{
    /// Create a client with the default [`NtpConfig`]
    pub fn new(socket: U, clock: C) -> Self {
        NtpClient::with_config(socket, clock, NtpConfig::default())
    }

    /// Create a client with the given configuration
    pub fn with_config(socket: U, clock: C, config: NtpConfig) -> Self {
        NtpClient {
            socket,
            clock,
            server: NtpServer::default(),
            config,
            state: ClientState::new(config.poll_interval),
        }
    }

    /// Open the transport and schedule an immediate first request to `server`.
    ///
    /// No packet is sent here; the request goes out on the next
    /// [`NtpClient::poll`].
    ///
    /// # Errors
    ///
    /// Will return `Err` if the transport can not be opened on the configured
    /// local port
    pub fn start(&mut self, server: impl Into<NtpServer<'a>>) -> Result<()> {
        self.socket.open(self.config.local_port)?;
        self.server = server.into();

        let now = self.clock.now_ms();

        self.state.started = true;
        self.state.pending = None;
        self.state.force = true;
        self.state.last_sent = now.wrapping_sub(self.active_poll_interval());
        log_debug!("client started, local port {}", self.config.local_port);

        Ok(())
    }

    /// [`NtpClient::start`] with the default server (`us.pool.ntp.org`)
    ///
    /// # Errors
    ///
    /// Will return `Err` if the transport can not be opened
    pub fn start_default(&mut self) -> Result<()> {
        self.start(NtpServer::default())
    }

    /// Release the transport. An outstanding request is abandoned; any response
    /// to it is rejected by the correlation check after the next start.
    pub fn stop(&mut self) {
        self.socket.close();
        self.state.started = false;
        self.state.pending = None;
        log_debug!("client stopped");
    }

    /// Single non-blocking tick of the client.
    ///
    /// - With a request in flight: returns [`Status::Idle`] until the response
    ///   timeout elapsed, then reads and validates the response and returns the
    ///   outcome ([`Status::Connected`], [`Status::BadPacket`] or a
    ///   Kiss-o'-Death status).
    /// - Without a request in flight: sends one if an update is forced or the
    ///   active poll interval elapsed, and returns [`Status::Idle`].
    ///
    /// A stopped client returns [`Status::Idle`] and does nothing.
    pub fn poll(&mut self) -> Status {
        if !self.state.started {
            return Status::Idle;
        }

        let now = self.clock.now_ms();
        let status = match self.state.pending {
            Some(request)
                if has_elapsed(now, request.sent_at, request.timeout) =>
            {
                self.state.pending = None;
                self.receive_response(request.token, now)
            }
            Some(_) => Status::Idle,
            None if self.state.force
                || has_elapsed(
                    now,
                    self.state.last_sent,
                    self.active_poll_interval(),
                ) =>
            {
                self.send_request(now)
            }
            None => Status::Idle,
        };

        self.state.status = status;
        status
    }

    /// Send a request right away regardless of the poll interval.
    ///
    /// Returns [`Status::BadPacket`] without touching the outstanding request
    /// if one is already in flight, and [`Status::Idle`] on a stopped client.
    pub fn force_update(&mut self) -> Status {
        if !self.state.started {
            return Status::Idle;
        }

        if self.state.pending.is_some() {
            log_debug!("forced update rejected: request already in flight");
            return Status::BadPacket;
        }

        self.state.force = true;
        self.poll()
    }

    /// Set the interval between two successful synchronizations.
    ///
    /// The new interval takes effect right away and ends an active retry
    /// backoff.
    pub fn set_poll_interval(&mut self, interval: u32) {
        self.config.poll_interval = interval;
        self.state.active_interval = interval;
    }

    /// Set the interval used after a failed exchange or a Kiss-o'-Death.
    ///
    /// An active backoff keeps its interval; the new one applies from the next
    /// failure.
    pub fn set_retry_interval(&mut self, interval: u32) {
        self.config.retry_interval = interval;
    }

    /// Set the response timeout for the requests sent from now on
    pub fn set_response_timeout(&mut self, timeout: u32) {
        self.config.response_timeout = timeout;
    }

    /// Set the destination port used for the requests sent from now on
    pub fn set_server_port(&mut self, port: u16) {
        self.config.server_port = port;
    }

    /// Set the local port, applied on the next [`NtpClient::start`]
    pub fn set_local_port(&mut self, port: u16) {
        self.config.local_port = port;
    }

    /// Estimated current UNIX time in seconds.
    ///
    /// `None` until the first successful synchronization, or if the estimate is
    /// outside of 2000..2100
    #[must_use]
    pub fn epoch(&self) -> Option<u64> {
        let now = self.clock.now_ms();

        self.state.sync.and_then(|record| record.epoch_at(now))
    }

    /// Estimated current UNIX time in milliseconds, see [`NtpClient::epoch`].
    /// The sub-second part is best effort
    #[must_use]
    pub fn epoch_millis(&self) -> Option<u64> {
        let now = self.clock.now_ms();

        self.state.sync.and_then(|record| record.unix_millis_at(now))
    }

    /// Local clock reading at the last successful synchronization
    #[must_use]
    pub fn last_sync_local_time(&self) -> Option<u32> {
        self.state.sync.map(|record| record.local_clock_at_sync())
    }

    /// Returns `true` if the most recent completed exchange produced a valid
    /// time
    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        self.state.synchronized
    }

    /// Status returned by the last [`NtpClient::poll`]
    #[must_use]
    pub fn status(&self) -> Status {
        self.state.status
    }

    /// Currently effective poll interval: the retry interval while backing off
    /// after a failure or Kiss-o'-Death, the configured poll interval otherwise
    #[must_use]
    pub fn active_poll_interval(&self) -> u32 {
        self.state.active_interval
    }

    /// Returns `true` while a request is in flight
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state.pending.is_some()
    }

    #[must_use]
    pub fn config(&self) -> &NtpConfig {
        &self.config
    }

    /// Last accepted synchronization data
    #[must_use]
    pub fn sync_record(&self) -> Option<&SyncRecord> {
        self.state.sync.as_ref()
    }

    #[must_use]
    pub fn socket(&self) -> &U {
        &self.socket
    }

    pub fn socket_mut(&mut self) -> &mut U {
        &mut self.socket
    }

    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Consume the client and give back the transport and the clock
    pub fn into_parts(self) -> (U, C) {
        (self.socket, self.clock)
    }

    fn send_request(&mut self, now: u32) -> Status {
        let request = RawNtpPacket::request(now);

        self.state.last_sent = now;
        self.state.force = false;
        log_debug!(
            "send request - token: {}, port: {}",
            now, self.config.server_port
        );

        match self
            .socket
            .send_to(&request.0, &self.server, self.config.server_port)
        {
            Ok(size) if size == NTP_PACKET_SIZE => {
                self.state.pending = Some(PendingRequest {
                    sent_at: now,
                    token: now,
                    timeout: self.config.response_timeout,
                });

                Status::Idle
            }
            Ok(size) => {
                log_warn!("request partially sent: {} bytes", size);
                self.reject()
            }
            Err(err) => {
                log_warn!("unable to send request: {:?}", err);
                self.reject()
            }
        }
    }

    fn receive_response(&mut self, token: u32, now: u32) -> Status {
        let Some(packet) = self.drain_socket() else {
            log_warn!("no complete response received");
            return self.reject();
        };

        match process_response(token, &packet) {
            Response::Time(transmit) => {
                let record = SyncRecord::new(
                    transmit.seconds,
                    transmit.fraction_millis(),
                    now,
                );

                log_debug!(
                    "synchronized: {} s, {} ms at local {}",
                    record.seconds_since_1900(),
                    record.sub_second_ms(),
                    now
                );
                self.state.sync = Some(record);
                self.state.synchronized = true;
                self.state.active_interval = self.config.poll_interval;

                Status::Connected
            }
            Response::KissOfDeath(code) => self.kiss_of_death(code),
            Response::Rejected(reason) => {
                log_warn!("response rejected: {:?}", reason);
                self.reject()
            }
        }
    }

    /// Read every queued datagram and keep the last complete one
    fn drain_socket(&mut self) -> Option<RawNtpPacket> {
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let mut latest = None;

        loop {
            match self.socket.recv(&mut buf) {
                Ok(Some(size)) => {
                    let datagram = buf.get(..size);

                    match datagram.and_then(RawNtpPacket::from_datagram) {
                        Some(packet) => latest = Some(packet),
                        None => log_debug!(
                            "incomplete datagram discarded: {} bytes",
                            size
                        ),
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    log_warn!("receive failed: {:?}", err);
                    break;
                }
            }
        }

        latest
    }

    fn kiss_of_death(&mut self, code: Option<KissCode>) -> Status {
        self.state.synchronized = false;
        self.state.active_interval = self.config.retry_interval;

        match code {
            Some(code) => {
                log_warn!("kiss-o'-death received: {:?}", code);
                Status::Kod(code)
            }
            None => {
                log_warn!("unknown kiss-o'-death received");
                Status::UnknownKod
            }
        }
    }

    fn reject(&mut self) -> Status {
        self.state.synchronized = false;
        self.state.active_interval = self.config.retry_interval;

        Status::BadPacket
    }
}
