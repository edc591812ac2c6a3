//! NTP wire packet: request construction and response validation.
//!
//! Every header field is read through a named accessor over a fixed 48-byte
//! buffer; multi-byte fields are big-endian.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |LI | VN  |Mode |    Stratum    |     Poll      |   Precision   |  0
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                         Root Delay                            |  4
//! |                       Root Dispersion                         |  8
//! |                     Reference ID (kiss code)                  | 12
//! |                 Reference Timestamp (64 bits)                 | 16
//! |                 Originate Timestamp (64 bits)                 | 24
//! |                  Receive Timestamp (64 bits)                  | 32
//! |                  Transmit Timestamp (64 bits)                 | 40
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
use core::mem::size_of;

use crate::kiss::KissCode;
#[allow(unused_imports)]
use crate::log::log_debug;

/// Size of an NTP packet without extension fields
pub const NTP_PACKET_SIZE: usize = 48;

/// NTP mode value bit mask
pub(crate) const MODE_MASK: u8 = 0b0000_0111;
/// NTP mode bit mask shift value
pub(crate) const MODE_SHIFT: u8 = 0;
/// NTP version value bit mask
pub(crate) const VERSION_MASK: u8 = 0b0011_1000;
/// NTP version bit mask shift value
pub(crate) const VERSION_SHIFT: u8 = 3;
/// NTP LI (leap indicator) bit mask value
pub(crate) const LI_MASK: u8 = 0b1100_0000;
/// NTP LI bit mask shift value
pub(crate) const LI_SHIFT: u8 = 6;
/// Milliseconds in second constant
pub(crate) const MSEC_IN_SEC: u32 = 1_000;

const LI_VN_MODE_OFFSET: usize = 0;
const STRATUM_OFFSET: usize = 1;
const REF_ID_OFFSET: usize = 12;
const ORIGINATE_OFFSET: usize = 24;
const TRANSMIT_OFFSET: usize = 40;

const CLIENT_MODE: u8 = 3;
const SERVER_MODE: u8 = 4;
const BROADCAST_MODE: u8 = 5;
const CLIENT_VERSION: u8 = 4;
/// Leap indicator value for "clock unsynchronized"
const LI_ALARM: u8 = 3;
const MAX_STRATUM: u8 = 15;

/// Raw NTP packet of exactly [`NTP_PACKET_SIZE`] bytes
#[derive(Copy, Clone, PartialEq, Eq)]
pub(crate) struct RawNtpPacket(pub(crate) [u8; NTP_PACKET_SIZE]);

impl Default for RawNtpPacket {
    fn default() -> Self {
        RawNtpPacket([0u8; NTP_PACKET_SIZE])
    }
}

impl core::fmt::Debug for RawNtpPacket {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawNtpPacket")
            .field("leap", &self.leap_indicator())
            .field("version", &self.version())
            .field("mode", &self.mode())
            .field("stratum", &self.stratum())
            .field("ref_id", &self.reference_id())
            .field("originate", &self.originate_timestamp())
            .field("transmit", &self.transmit_timestamp())
            .finish()
    }
}

impl RawNtpPacket {
    /// Build a client request (LI 0, VN 4, Mode 3) carrying `token` in the
    /// Transmit Timestamp seconds field; all other fields are zero
    pub(crate) fn request(token: u32) -> Self {
        let mut packet = RawNtpPacket::default();

        packet.0[LI_VN_MODE_OFFSET] =
            (CLIENT_VERSION << VERSION_SHIFT) | CLIENT_MODE;
        packet.set_transmit_timestamp(NtpTimestamp {
            seconds: token,
            fraction: 0,
        });

        packet
    }

    /// Build a packet from a received datagram. Only datagrams of exactly
    /// [`NTP_PACKET_SIZE`] bytes are complete NTP packets
    pub(crate) fn from_datagram(datagram: &[u8]) -> Option<Self> {
        let bytes: [u8; NTP_PACKET_SIZE] = datagram.try_into().ok()?;

        Some(RawNtpPacket(bytes))
    }

    /// Leap indicator, byte 0 bits 7-6
    pub(crate) fn leap_indicator(&self) -> u8 {
        shifter(self.0[LI_VN_MODE_OFFSET], LI_MASK, LI_SHIFT)
    }

    /// Version number, byte 0 bits 5-3
    pub(crate) fn version(&self) -> u8 {
        shifter(self.0[LI_VN_MODE_OFFSET], VERSION_MASK, VERSION_SHIFT)
    }

    /// Association mode, byte 0 bits 2-0
    pub(crate) fn mode(&self) -> u8 {
        shifter(self.0[LI_VN_MODE_OFFSET], MODE_MASK, MODE_SHIFT)
    }

    /// Stratum, byte 1
    pub(crate) fn stratum(&self) -> u8 {
        self.0[STRATUM_OFFSET]
    }

    /// Reference identifier, bytes 12-15. Carries the ASCII kiss code when the
    /// stratum is 0
    pub(crate) fn reference_id(&self) -> [u8; 4] {
        self.word(REF_ID_OFFSET)
    }

    /// Originate timestamp, bytes 24-31
    pub(crate) fn originate_timestamp(&self) -> NtpTimestamp {
        self.timestamp(ORIGINATE_OFFSET)
    }

    /// Transmit timestamp, bytes 40-47
    pub(crate) fn transmit_timestamp(&self) -> NtpTimestamp {
        self.timestamp(TRANSMIT_OFFSET)
    }

    pub(crate) fn set_transmit_timestamp(&mut self, timestamp: NtpTimestamp) {
        self.set_timestamp(TRANSMIT_OFFSET, timestamp);
    }

    #[cfg(test)]
    pub(crate) fn set_originate_timestamp(&mut self, timestamp: NtpTimestamp) {
        self.set_timestamp(ORIGINATE_OFFSET, timestamp);
    }

    fn word(&self, offset: usize) -> [u8; 4] {
        let mut word = [0u8; size_of::<u32>()];

        word.copy_from_slice(&self.0[offset..offset + size_of::<u32>()]);
        word
    }

    fn timestamp(&self, offset: usize) -> NtpTimestamp {
        NtpTimestamp {
            seconds: u32::from_be_bytes(self.word(offset)),
            fraction: u32::from_be_bytes(self.word(offset + size_of::<u32>())),
        }
    }

    fn set_timestamp(&mut self, offset: usize, timestamp: NtpTimestamp) {
        let fraction_offset = offset + size_of::<u32>();

        self.0[offset..fraction_offset]
            .copy_from_slice(&timestamp.seconds.to_be_bytes());
        self.0[fraction_offset..fraction_offset + size_of::<u32>()]
            .copy_from_slice(&timestamp.fraction.to_be_bytes());
    }
}

/// 64-bit NTP timestamp: seconds since 1900-01-01 and a 32-bit binary fraction
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub(crate) struct NtpTimestamp {
    pub(crate) seconds: u32,
    pub(crate) fraction: u32,
}

impl NtpTimestamp {
    /// Sub-second part in whole milliseconds
    pub(crate) fn fraction_millis(self) -> u32 {
        fraction_to_milliseconds(self.fraction)
    }
}

/// Reason a response packet has been rejected
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum Rejection {
    /// Originate timestamp differs from the token sent in the request
    IncorrectOriginTimestamp,
    /// Leap indicator signals an unsynchronized server clock
    IncorrectLeapIndicator,
    /// Version other than NTPv3 or NTPv4
    IncorrectResponseVersion,
    /// Mode other than server or broadcast
    IncorrectMode,
    /// Stratum outside of 1..=15
    IncorrectStratumHeaders,
    /// Server transmit timestamp seconds is 0
    ZeroTransmitTimestamp,
}

/// Outcome of response validation
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Response {
    /// Valid server time
    Time(NtpTimestamp),
    /// Kiss-o'-Death packet, `None` for a code outside of the table
    KissOfDeath(Option<KissCode>),
    Rejected(Rejection),
}

/// Validate a complete response packet against the request `token`.
///
/// Kiss-o'-Death detection comes first so that a server refusing service is
/// reported even when it does not echo the originate timestamp.
pub(crate) fn process_response(token: u32, packet: &RawNtpPacket) -> Response {
    #[cfg(any(feature = "log", feature = "defmt"))]
    debug_ntp_packet(packet);

    let mode = packet.mode();

    let server_mode = mode == SERVER_MODE || mode == BROADCAST_MODE;

    if packet.stratum() == 0 && server_mode {
        return Response::KissOfDeath(KissCode::from_bytes(
            &packet.reference_id(),
        ));
    }

    let expected_origin = NtpTimestamp {
        seconds: token,
        fraction: 0,
    };

    if packet.originate_timestamp() != expected_origin {
        return Response::Rejected(Rejection::IncorrectOriginTimestamp);
    }

    if packet.leap_indicator() == LI_ALARM {
        return Response::Rejected(Rejection::IncorrectLeapIndicator);
    }

    if !(3..=4).contains(&packet.version()) {
        return Response::Rejected(Rejection::IncorrectResponseVersion);
    }

    if !server_mode {
        return Response::Rejected(Rejection::IncorrectMode);
    }

    if !(1..=MAX_STRATUM).contains(&packet.stratum()) {
        return Response::Rejected(Rejection::IncorrectStratumHeaders);
    }

    let transmit = packet.transmit_timestamp();

    if transmit.seconds == 0 {
        return Response::Rejected(Rejection::ZeroTransmitTimestamp);
    }

    Response::Time(transmit)
}

fn shifter(val: u8, mask: u8, shift: u8) -> u8 {
    (val & mask) >> shift
}

/// Convert second fraction value to milliseconds value
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn fraction_to_milliseconds(sec_fraction: u32) -> u32 {
    ((u64::from(sec_fraction) * u64::from(MSEC_IN_SEC)) >> 32) as u32
}

#[cfg(any(feature = "log", feature = "defmt"))]
fn debug_ntp_packet(packet: &RawNtpPacket) {
    let ref_id = packet.reference_id();
    let originate = packet.originate_timestamp();
    let transmit = packet.transmit_timestamp();

    log_debug!("| Mode:\t\t{}", packet.mode());
    log_debug!("| Version:\t{}", packet.version());
    log_debug!("| Leap:\t\t{}", packet.leap_indicator());
    log_debug!("| Stratum:\t{}", packet.stratum());
    log_debug!(
        "| Reference ID:\t\t{}",
        core::str::from_utf8(&ref_id).unwrap_or("")
    );
    log_debug!(
        "| Originate timestamp (client):\t{}.{}",
        originate.seconds, originate.fraction
    );
    log_debug!(
        "| Transmit timestamp  (server):\t{}.{}",
        transmit.seconds, transmit.fraction
    );
}
