//! Core domain types: benchmark operations, size groups, device context
//!
//! The benchmark log and the datasheet catalogue both speak in terms of a
//! closed set of transfer sizes and three flash operations. Everything the
//! engine aggregates or matches is keyed by (operation, size group).

use serde::Serialize;

/// Flash programming granularity used to derive page counts for program
/// predictions (`pages = ceil(bytes / 256)`).
pub const PAGE_SIZE_BYTES: u32 = 256;

/// A flash operation as it appears in the results log.
///
/// The log uses `program` and `write` interchangeably; both normalise to
/// [`Operation::Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operation {
    Read,
    Program,
    Erase,
}

impl Operation {
    /// Parse an operation token from a results-log line.
    ///
    /// Returns `None` for anything outside the closed set; callers drop
    /// such rows.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "read" => Some(Operation::Read),
            "program" | "write" => Some(Operation::Program),
            "erase" => Some(Operation::Erase),
            _ => None,
        }
    }
}

/// Transfer-size bucket for benchmark samples.
///
/// The first five carry fixed byte widths; `Whole` resolves to the detected
/// device capacity and only exists when that capacity is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SizeGroup {
    B1,
    B256,
    K4,
    K32,
    K64,
    Whole,
}

/// All size groups in report order.
pub const SIZE_GROUPS: [SizeGroup; SizeGroup::COUNT] = [
    SizeGroup::B1,
    SizeGroup::B256,
    SizeGroup::K4,
    SizeGroup::K32,
    SizeGroup::K64,
    SizeGroup::Whole,
];

impl SizeGroup {
    pub const COUNT: usize = 6;

    /// Position in report order; usable as an array index.
    pub fn index(self) -> usize {
        match self {
            SizeGroup::B1 => 0,
            SizeGroup::B256 => 1,
            SizeGroup::K4 => 2,
            SizeGroup::K32 => 3,
            SizeGroup::K64 => 4,
            SizeGroup::Whole => 5,
        }
    }

    /// Row-title suffix used throughout the report (`n_4096B`, `db_mean_WHOLE`, ...).
    pub fn suffix(self) -> &'static str {
        match self {
            SizeGroup::B1 => "1B",
            SizeGroup::B256 => "256B",
            SizeGroup::K4 => "4096B",
            SizeGroup::K32 => "32768B",
            SizeGroup::K64 => "65536B",
            SizeGroup::Whole => "WHOLE",
        }
    }

    /// Byte width of this group. `Whole` resolves through `whole_bytes` and
    /// is `None` when the capacity is unknown.
    pub fn bytes(self, whole_bytes: Option<u32>) -> Option<u32> {
        match self {
            SizeGroup::B1 => Some(1),
            SizeGroup::B256 => Some(256),
            SizeGroup::K4 => Some(4096),
            SizeGroup::K32 => Some(32_768),
            SizeGroup::K64 => Some(65_536),
            SizeGroup::Whole => whole_bytes.filter(|b| *b > 0),
        }
    }

    /// Classify a raw transfer size into a group. The fixed widths win over
    /// `Whole` so a device whose capacity collides with one of them still
    /// buckets deterministically. Sizes outside the closed set return `None`.
    pub fn classify(bytes: u32, whole_bytes: Option<u32>) -> Option<Self> {
        match bytes {
            1 => Some(SizeGroup::B1),
            256 => Some(SizeGroup::B256),
            4096 => Some(SizeGroup::K4),
            32_768 => Some(SizeGroup::K32),
            65_536 => Some(SizeGroup::K64),
            _ => match whole_bytes {
                Some(whole) if whole > 0 && bytes == whole => Some(SizeGroup::Whole),
                _ => None,
            },
        }
    }
}

/// Normalise a JEDEC identifier to its canonical six-hex-digit uppercase
/// form: a leading `0x`/`0X` is stripped, every non-hex character is
/// discarded, and anything that does not end up exactly six digits long is
/// rejected.
pub fn normalize_jedec(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let hex: String = body
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if hex.len() == 6 {
        Some(hex)
    } else {
        None
    }
}

/// What the surrounding system observed about the device under test.
///
/// Every field is optional: an unknown JEDEC disables identity lookups, an
/// unknown SCK disables read matching, and an unknown capacity disables the
/// WHOLE size group and whole-device page accounting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceContext {
    /// Observed JEDEC id, already normalised to six uppercase hex digits.
    pub jedec: Option<String>,
    /// SPI clock in MHz.
    pub sck_mhz: Option<f32>,
    /// Device capacity in bytes.
    pub capacity_bytes: Option<u32>,
}

impl DeviceContext {
    /// Build a context from raw observations. Zero means "unknown" for both
    /// numeric inputs; the JEDEC string may carry arbitrary punctuation.
    pub fn new(jedec_raw: &str, sck_hz: u64, capacity_bytes: u64) -> Self {
        DeviceContext {
            jedec: normalize_jedec(jedec_raw),
            sck_mhz: (sck_hz > 0).then(|| sck_hz as f32 / 1e6),
            capacity_bytes: (capacity_bytes > 0).then(|| capacity_bytes as u32),
        }
    }
}
