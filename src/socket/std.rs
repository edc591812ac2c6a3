use crate::socket::resolve;
use crate::{Error, NtpServer, NtpUdpSocket, Result};

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

/// [`NtpUdpSocket`] implementation over [`std::net::UdpSocket`] switched to
/// non-blocking mode.
///
/// The socket is bound on [`NtpUdpSocket::open`] to the IPv4 wildcard address
/// and dropped on [`NtpUdpSocket::close`].
#[derive(Debug, Default)]
pub struct StdUdpSocket {
    socket: Option<UdpSocket>,
}

impl StdUdpSocket {
    /// Local address of the opened socket
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref()?.local_addr().ok()
    }

    fn socket(&self) -> Result<&UdpSocket> {
        self.socket.as_ref().ok_or(Error::Network)
    }
}

impl NtpUdpSocket for StdUdpSocket {
    fn open(&mut self, local_port: u16) -> Result<()> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, local_port))
            .map_err(|_| Error::Network)?;

        socket.set_nonblocking(true).map_err(|_| Error::Network)?;
        self.socket = Some(socket);

        Ok(())
    }

    fn send_to(
        &mut self,
        buf: &[u8],
        server: &NtpServer<'_>,
        port: u16,
    ) -> Result<usize> {
        let addr = resolve(server, port)?;

        self.socket()?
            .send_to(buf, addr)
            .map_err(|_| Error::Network)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        match self.socket()?.recv_from(buf) {
            Ok((size, _)) => Ok(Some(size)),
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(_) => Err(Error::Network),
        }
    }

    fn close(&mut self) {
        self.socket = None;
    }
}

#[cfg(test)]
mod std_socket_tests {
    use super::StdUdpSocket;
    use crate::{
        Error, KissCode, MonotonicClock, NtpClient, NtpConfig, NtpUdpSocket,
        Status, NTP_TIMESTAMP_DELTA,
    };
    use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
    use std::thread;
    use std::time::Duration;

    /// 2025-06-01T00:00:00Z
    const SERVER_EPOCH: u32 = 1_748_736_000;

    struct ManualClock {
        now: u32,
    }

    impl MonotonicClock for ManualClock {
        fn now_ms(&self) -> u32 {
            self.now
        }
    }

    /// Fake NTP server answering a single request on the loopback interface
    struct FakeServer {
        socket: UdpSocket,
    }

    impl FakeServer {
        fn new() -> Self {
            let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
            socket
                .set_read_timeout(Some(Duration::from_secs(2)))
                .expect("Unable to set up socket timeout");

            FakeServer { socket }
        }

        fn port(&self) -> u16 {
            self.socket.local_addr().unwrap().port()
        }

        fn answer(&self, stratum: u8, ref_id: &[u8; 4], seconds: u32) {
            let mut buf = [0u8; 48];
            let (size, client) = self.socket.recv_from(&mut buf).unwrap();
            assert_eq!(size, 48);
            assert_eq!(buf[0], 0x23);

            let mut response = [0u8; 48];
            response[0] = 0x24;
            response[1] = stratum;
            response[12..16].copy_from_slice(ref_id);
            response[24..32].copy_from_slice(&buf[40..48]);
            response[40..44].copy_from_slice(&seconds.to_be_bytes());
            self.socket.send_to(&response, client).unwrap();
            // let the datagram reach the client socket queue
            thread::sleep(Duration::from_millis(50));
        }
    }

    fn client_for(
        server: &FakeServer,
    ) -> NtpClient<'static, StdUdpSocket, ManualClock> {
        let config = NtpConfig::new()
            .with_local_port(0)
            .with_server_port(server.port());
        let mut client = NtpClient::with_config(
            StdUdpSocket::default(),
            ManualClock { now: 0 },
            config,
        );

        client
            .start(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .expect("Unable to open client socket");
        client
    }

    #[test]
    fn test_loopback_exchange() {
        let server = FakeServer::new();
        let mut client = client_for(&server);

        assert!(client.socket().local_addr().is_some());
        assert_eq!(client.poll(), Status::Idle);
        server.answer(1, b"GPS\0", SERVER_EPOCH + NTP_TIMESTAMP_DELTA);

        client.clock_mut().now = 250;
        assert_eq!(client.poll(), Status::Connected);
        assert_eq!(client.epoch(), Some(u64::from(SERVER_EPOCH)));

        client.clock_mut().now = 10_250;
        assert_eq!(client.epoch(), Some(u64::from(SERVER_EPOCH) + 10));
    }

    #[test]
    fn test_loopback_kiss_of_death() {
        let server = FakeServer::new();
        let mut client = client_for(&server);

        assert_eq!(client.poll(), Status::Idle);
        server.answer(0, b"RATE", 0);

        client.clock_mut().now = 250;
        assert_eq!(client.poll(), Status::Kod(KissCode::Rate));
        assert_eq!(
            client.active_poll_interval(),
            client.config().retry_interval()
        );
    }

    #[test]
    fn test_loopback_no_response() {
        let server = FakeServer::new();
        let mut client = client_for(&server);

        assert_eq!(client.poll(), Status::Idle);
        client.clock_mut().now = 250;
        assert_eq!(client.poll(), Status::BadPacket);
        assert_eq!(client.epoch(), None);
    }

    #[test]
    fn test_open_port_in_use() {
        let occupied =
            UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
                .unwrap();
        let port = occupied.local_addr().unwrap().port();
        let mut socket = StdUdpSocket::default();

        assert_eq!(socket.open(port), Err(Error::Network));
    }

    #[test]
    fn test_closed_socket() {
        let mut socket = StdUdpSocket::default();
        let mut buf = [0u8; 48];

        assert_eq!(socket.recv(&mut buf), Err(Error::Network));
        socket.open(0).unwrap();
        assert_eq!(socket.recv(&mut buf), Ok(None));
        socket.close();
        assert!(socket.local_addr().is_none());
    }
}
