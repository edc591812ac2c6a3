use core::fmt::{Display, Formatter};

/// Kiss-o'-Death codes defined by RFC 5905, section 7.4.
///
/// When a server answers with stratum 0 the reference identifier field
/// carries a four-character ASCII "kiss code" instead of a clock source. The
/// client reports each recognised code through [`crate::Status::Kod`] so the
/// caller can react (e.g. stop polling entirely on [`KissCode::Deny`] or
/// [`KissCode::Rstr`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KissCode {
    /// Rate exceeded. The server has temporarily denied access because the
    /// client exceeded the rate threshold
    Rate,
    /// Access denied by remote server
    Deny,
    /// The association belongs to a unicast server
    Acst,
    /// Server authentication failed
    Auth,
    /// Autokey sequence failed
    Auto,
    /// The association belongs to a broadcast server
    Bcst,
    /// Cryptographic authentication or identification failed
    Cryp,
    /// Lost peer in symmetric mode
    Drop,
    /// Access denied due to local policy
    Rstr,
    /// The association has not yet synchronized for the first time
    Init,
    /// The association belongs to a dynamically discovered server
    Mcst,
    /// No key found
    Nkey,
    /// Network Time Security (NTS) negative-acknowledgment
    Ntsn,
    /// Alteration of association from a remote host running ntpdc
    Rmot,
    /// A step change in system time has occurred, but the association has not
    /// yet resynchronized
    Step,
}

/// Kiss code lookup table, in wire status order (see [`crate::Status::code`])
const KISS_CODES: [(&[u8; 4], KissCode); 15] = [
    (b"RATE", KissCode::Rate),
    (b"DENY", KissCode::Deny),
    (b"ACST", KissCode::Acst),
    (b"AUTH", KissCode::Auth),
    (b"AUTO", KissCode::Auto),
    (b"BCST", KissCode::Bcst),
    (b"CRYP", KissCode::Cryp),
    (b"DROP", KissCode::Drop),
    (b"RSTR", KissCode::Rstr),
    (b"INIT", KissCode::Init),
    (b"MCST", KissCode::Mcst),
    (b"NKEY", KissCode::Nkey),
    (b"NTSN", KissCode::Ntsn),
    (b"RMOT", KissCode::Rmot),
    (b"STEP", KissCode::Step),
];

impl KissCode {
    /// Looks up the kiss code carried in a reference identifier field.
    ///
    /// Matching is exact and case-sensitive; `None` is returned for any code
    /// outside the RFC 5905 table.
    #[must_use]
    pub fn from_bytes(code: &[u8; 4]) -> Option<KissCode> {
        KISS_CODES
            .iter()
            .find(|(bytes, _)| *bytes == code)
            .map(|&(_, kiss)| kiss)
    }

    /// Four ASCII bytes of the code as they appear on the wire
    #[must_use]
    pub fn as_bytes(self) -> &'static [u8; 4] {
        KISS_CODES[self.index()].0
    }

    /// Code as a string slice, e.g. `"RATE"`
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            KissCode::Rate => "RATE",
            KissCode::Deny => "DENY",
            KissCode::Acst => "ACST",
            KissCode::Auth => "AUTH",
            KissCode::Auto => "AUTO",
            KissCode::Bcst => "BCST",
            KissCode::Cryp => "CRYP",
            KissCode::Drop => "DROP",
            KissCode::Rstr => "RSTR",
            KissCode::Init => "INIT",
            KissCode::Mcst => "MCST",
            KissCode::Nkey => "NKEY",
            KissCode::Ntsn => "NTSN",
            KissCode::Rmot => "RMOT",
            KissCode::Step => "STEP",
        }
    }

    /// Returns `true` for the codes after which RFC 5905 requires the client to
    /// stop sending packets to the server (`DENY` and `RSTR`)
    #[must_use]
    pub fn is_access_denial(self) -> bool {
        matches!(self, KissCode::Deny | KissCode::Rstr)
    }

    /// Position of the code in the lookup table
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl Display for KissCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
