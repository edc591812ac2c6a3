//! Non-blocking NTP client
//!
//! # Overview
//!
//! This crate keeps a device's notion of UNIX time synchronized with an NTP
//! server from a single cooperative polling loop. It is meant for
//! environments where blocking on network I/O is not an option: every call
//! returns immediately, and the client makes progress only when
//! [`NtpClient::poll`] is called.
//!
//! The client sends a minimal SNTP request
//! ([RFC 4330](https://datatracker.ietf.org/doc/html/rfc4330)) at a configured
//! interval, reads the response once a response timeout passed, validates it
//! and derives the current time from the last accepted response plus the time
//! elapsed on a local monotonic millisecond clock. Kiss-o'-Death responses
//! ([RFC 5905](https://datatracker.ietf.org/doc/html/rfc5905)) are decoded
//! and reported to the caller, and switch the client to its retry interval.
//!
//! # Usage
//!
//! Put this in your `Cargo.toml`:
//! ```cargo
//! [dependencies]
//! ntpoll = "0.1"
//! ```
//!
//! ## Features
//!
//! `ntpoll` supports several features:
//! - `std`: includes functionality that depends on the standard library
//! - `utils`: adds [`chrono`](https://docs.rs/chrono) based calendar time
//!   accessors
//! - `log`: enables library debug output during execution
//! - `defmt`: enables library debug output through `defmt` for embedded targets
//! - `std-socket`: add `NtpUdpSocket` trait implementation for
//!   `std::net::UdpSocket`
//! - `tokio-socket`: add `NtpUdpSocket` trait implementation for
//!   `tokio::net::UdpSocket`
//!
//! # Details
//!
//! As `ntpoll` supports `no_std` environment as well, the platform is plugged
//! in through two traits:
//! - [`NtpUdpSocket`] should be implemented for a non-blocking datagram
//!   transport able to reach the NTP server
//! - [`MonotonicClock`] should be implemented for a free-running millisecond
//!   counter, which is allowed to wrap around
//!
//! ## Logging support
//!
//! Library debug logs can be enabled in executables by enabling `log` feature
//! (or `defmt` on embedded targets). Sent requests, rejected responses and
//! Kiss-o'-Death codes will be printed.
//!
//! # Example
//!
//! ```no_run
//! use ntpoll::{NtpClient, NtpConfig, Status, StdMonotonicClock, StdUdpSocket};
//! use std::thread;
//! use std::time::Duration;
//!
//! let config = NtpConfig::new()
//!     .with_local_port(0)
//!     .with_poll_interval(60_000);
//! let mut client = NtpClient::with_config(
//!     StdUdpSocket::default(),
//!     StdMonotonicClock::default(),
//!     config,
//! );
//!
//! client.start("time.google.com").expect("Unable to open UDP socket");
//!
//! loop {
//!     match client.poll() {
//!         Status::Connected => println!("UNIX time: {:?}", client.epoch()),
//!         Status::Kod(code) if code.is_access_denial() => break,
//!         _ => {}
//!     }
//!
//!     thread::sleep(Duration::from_millis(10));
//! }
//! ```
//!
//! For a complete polling loop with command line options, see
//! [`demos/poll_loop.rs`](demos/poll_loop.rs).
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "utils")]
pub mod utils;

mod client;
mod kiss;
mod log;
mod packet;
mod socket;
mod sync;
mod types;

pub use crate::client::NtpClient;
pub use crate::kiss::KissCode;
pub use crate::packet::{fraction_to_milliseconds, NTP_PACKET_SIZE};
#[cfg(feature = "std-socket")]
pub use crate::socket::StdUdpSocket;
#[cfg(feature = "tokio-socket")]
pub use crate::socket::TokioUdpSocket;
pub use crate::sync::{
    elapsed_since, has_elapsed, SyncRecord, MAX_PLAUSIBLE_EPOCH,
    MIN_PLAUSIBLE_EPOCH, NTP_TIMESTAMP_DELTA,
};
pub use crate::types::*;

/// Network types used by the `ntpoll` crate
pub mod net {
    pub use core::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

    #[cfg(feature = "std")]
    pub use std::net::UdpSocket;
}
