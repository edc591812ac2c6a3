macro_rules! cfg_socket_impl {
    ($l:literal, { $($item:item)* }) => {
        $(
            #[cfg(feature = $l)]
            $item
        )*
    };
}

cfg_socket_impl!("std-socket", {
    mod std;
    pub use self::std::StdUdpSocket;
});
cfg_socket_impl!("tokio-socket", {
    mod tokio;
    pub use self::tokio::TokioUdpSocket;
});

/// Resolve the server identity to the first IPv4 socket address.
///
/// Host names go through the system resolver, which may block.
#[cfg(feature = "std")]
#[allow(dead_code)]
pub(crate) fn resolve(
    server: &crate::NtpServer<'_>,
    port: u16,
) -> crate::Result<::std::net::SocketAddr> {
    use crate::{Error, NtpServer};
    use ::std::net::{SocketAddr, ToSocketAddrs};

    match server {
        NtpServer::Ip(addr) => Ok(SocketAddr::new(*addr, port)),
        NtpServer::Host(host) => (*host, port)
            .to_socket_addrs()
            .map_err(|_| Error::AddressResolve)?
            .find(SocketAddr::is_ipv4)
            .ok_or(Error::AddressResolve),
    }
}
