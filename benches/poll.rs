use criterion::{criterion_group, criterion_main, Criterion};
use ntpoll::{
    MonotonicClock, NtpClient, NtpConfig, NtpServer, NtpUdpSocket, Result,
    NTP_PACKET_SIZE, NTP_TIMESTAMP_DELTA,
};
use std::cell::Cell;
use std::hint::black_box;

/// 2024-01-01T00:00:00Z as NTP seconds
const SERVER_SECONDS: u32 = 1_704_067_200 + NTP_TIMESTAMP_DELTA;

/// In-memory transport answering every request with a valid server response
#[derive(Default)]
struct LoopbackSocket {
    response: Option<[u8; NTP_PACKET_SIZE]>,
}

impl NtpUdpSocket for LoopbackSocket {
    fn open(&mut self, _local_port: u16) -> Result<()> {
        Ok(())
    }

    fn send_to(
        &mut self,
        buf: &[u8],
        _server: &NtpServer<'_>,
        _port: u16,
    ) -> Result<usize> {
        let mut response = [0u8; NTP_PACKET_SIZE];

        response[0] = 0x24;
        response[1] = 1;
        response[24..32].copy_from_slice(&buf[40..48]);
        response[40..44].copy_from_slice(&SERVER_SECONDS.to_be_bytes());
        self.response = Some(response);

        Ok(buf.len())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        Ok(self.response.take().map(|response| {
            buf[..NTP_PACKET_SIZE].copy_from_slice(&response);
            NTP_PACKET_SIZE
        }))
    }

    fn close(&mut self) {}
}

/// Clock advancing by a fixed step on every reading
struct SteppingClock {
    now: Cell<u32>,
    step: u32,
}

impl MonotonicClock for SteppingClock {
    fn now_ms(&self) -> u32 {
        let now = self.now.get();

        self.now.set(now.wrapping_add(self.step));
        now
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    let config = NtpConfig::new()
        .with_poll_interval(1_000)
        .with_retry_interval(1_000)
        .with_response_timeout(100);
    let clock = SteppingClock {
        now: Cell::new(0),
        step: 100,
    };
    let mut client =
        NtpClient::with_config(LoopbackSocket::default(), clock, config);

    client.start("localhost").unwrap();

    c.bench_function("poll_exchange", |b| {
        b.iter(|| {
            black_box(client.force_update());
            black_box(client.poll())
        });
    });

    c.bench_function("epoch", |b| {
        b.iter(|| black_box(client.epoch()));
    });
}

criterion_group!(poll_benches, criterion_benchmark);
criterion_main!(poll_benches);
