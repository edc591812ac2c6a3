use crate::socket::resolve;
use crate::{Error, NtpServer, NtpUdpSocket, Result};

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;
use tokio::runtime::Handle;

/// [`NtpUdpSocket`] implementation over [`tokio::net::UdpSocket`].
///
/// The client API is synchronous, so the [`NtpUdpSocket`] methods only use the
/// `try_*` family of Tokio socket methods. [`NtpUdpSocket::open`] fails with
/// [`Error::Network`] outside of a Tokio runtime context, as the socket
/// registers with the runtime's I/O driver.
///
/// Tokio tracks socket readiness itself, so a freshly opened socket reports
/// "would block" on send until the runtime observed it as writable. Await
/// [`TokioUdpSocket::writable`] once after `start` before the first poll.
#[derive(Debug, Default)]
pub struct TokioUdpSocket {
    socket: Option<UdpSocket>,
}

impl TokioUdpSocket {
    /// Local address of the opened socket
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref()?.local_addr().ok()
    }

    /// Wait until the socket is ready for sending
    ///
    /// # Errors
    ///
    /// Will return `Err` if the socket is not opened or the readiness check
    /// fails
    pub async fn writable(&self) -> Result<()> {
        self.socket()?.writable().await.map_err(|_| Error::Network)
    }

    fn socket(&self) -> Result<&UdpSocket> {
        self.socket.as_ref().ok_or(Error::Network)
    }
}

impl From<UdpSocket> for TokioUdpSocket {
    /// Wrap an already bound socket. A later [`NtpUdpSocket::open`] replaces it
    fn from(socket: UdpSocket) -> Self {
        TokioUdpSocket {
            socket: Some(socket),
        }
    }
}

impl NtpUdpSocket for TokioUdpSocket {
    fn open(&mut self, local_port: u16) -> Result<()> {
        // registering outside of a runtime panics
        Handle::try_current().map_err(|_| Error::Network)?;

        let socket =
            std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, local_port))
                .map_err(|_| Error::Network)?;

        socket.set_nonblocking(true).map_err(|_| Error::Network)?;

        let socket = UdpSocket::from_std(socket).map_err(|_| Error::Network)?;
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
            .try_send_to(buf, addr)
            .map_err(|_| Error::Network)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        match self.socket()?.try_recv_from(buf) {
            Ok((size, _)) => Ok(Some(size)),
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(_) => Err(Error::Network),
        }
    }

    fn close(&mut self) {
        self.socket = None;
    }
}
