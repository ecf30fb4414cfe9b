use std::fmt;

use serde::{Deserialize, Serialize};

/// Completion in whole percent, always within 0..=100.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Progress(u8);

impl Progress {
    pub const ZERO: Progress = Progress(0);
    pub const COMPLETE: Progress = Progress(100);

    pub fn from_percent(percent: u8) -> Option<Self> {
        (percent <= 100).then_some(Progress(percent))
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// Fraction in `[0, 1]`.
    pub fn fraction(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl TryFrom<u8> for Progress {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Progress::from_percent(value).ok_or_else(|| format!("progress {value}% is out of range"))
    }
}

impl From<Progress> for u8 {
    fn from(value: Progress) -> Self {
        value.0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Parse `processing: <free text> (<integer>%)`.
///
/// `None` means no progress is available, which callers must not treat as 0%.
pub fn extract_progress(status: &str) -> Option<Progress> {
    let rest = status.trim().strip_prefix("processing:")?;
    let inner = rest.strip_suffix("%)")?;
    let open = inner.rfind('(')?;
    let digits = inner[open + 1..].trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let percent: u8 = digits.parse().ok()?;
    Progress::from_percent(percent)
}
