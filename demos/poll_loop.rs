//! Demonstrates how to drive [`ntpoll::NtpClient`] from an application loop
//!
//! You can run the `poll_loop` example in the terminal:
//!
//! ```
//! cargo run --example poll_loop --features="log"
//! ```
//!
//! That will run the example with the default NTP server set to
//! `pool.ntp.org`. Options available:
//! - `-s`/`--server` - specify server (default: `pool.ntp.org`)
//! - `-p`/`--port` - specify server port (default: `123`)
//! - `-l`/`--local-port` - specify local port (default: `0`, any free port)
//! - `-i`/`--interval` - poll interval in seconds (default: `60`)
//! - `-c`/`--count` - number of synchronizations before exit (default: `3`)
use ntpoll::{NtpClient, NtpConfig, Status, StdMonotonicClock, StdUdpSocket};

use clap::Parser;
use std::thread;
use std::time::Duration;

const POOL_NTP_ADDR: &str = "pool.ntp.org";
const LOOP_DELAY: Duration = Duration::from_millis(10);

#[derive(Parser, Debug)]
#[command(version, about = "Keep UNIX time synchronized with an NTP server")]
struct Cli {
    /// NTP server hostname or IP address
    #[arg(short, long, default_value = POOL_NTP_ADDR)]
    server: String,

    /// NTP server port
    #[arg(short, long, default_value_t = 123)]
    port: u16,

    /// Local UDP port to bind
    #[arg(short, long, default_value_t = 0)]
    local_port: u16,

    /// Poll interval in seconds
    #[arg(short, long, default_value_t = 60)]
    interval: u32,

    /// Number of successful synchronizations before exit
    #[arg(short, long, default_value_t = 3)]
    count: u32,
}

fn main() {
    let cli = Cli::parse();

    #[cfg(feature = "log")]
    if cfg!(debug_assertions) {
        simple_logger::init_with_level(log::Level::Trace).unwrap();
    } else {
        simple_logger::init_with_level(log::Level::Info).unwrap();
    }

    let config = NtpConfig::new()
        .with_server_port(cli.port)
        .with_local_port(cli.local_port)
        .with_poll_interval(cli.interval.saturating_mul(1_000));
    let mut client = NtpClient::with_config(
        StdUdpSocket::default(),
        StdMonotonicClock::default(),
        config,
    );

    client
        .start(cli.server.as_str())
        .expect("Unable to open UDP socket");

    let mut synced = 0;

    while synced < cli.count {
        match client.poll() {
            Status::Idle => {}
            Status::Connected => {
                synced += 1;
                println!(
                    "[{}] UNIX time: {:?} ms",
                    cli.server,
                    client.epoch_millis()
                );
            }
            Status::Kod(code) if code.is_access_denial() => {
                eprintln!("Server {} denied access: {code}", cli.server);
                break;
            }
            status => eprintln!(
                "Exchange failed: {status} (code {:#04x}), retry in {} ms",
                status.code(),
                client.active_poll_interval()
            ),
        }

        thread::sleep(LOOP_DELAY);
    }

    client.stop();
}
