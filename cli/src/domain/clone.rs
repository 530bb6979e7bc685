//! Clone lifecycle rules derived from tag metadata.
//!
//! A VM is a managed clone iff it carries the clone tag; its age comes from the
//! single attached timestamp tag. Nothing else is persisted.

use chrono::{Duration, NaiveDateTime};
use clonekeeper_common::timestamp;

/// Progress of the clone source through the creation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    TemplateNoSnapshot,
    TemplateConverting,
    VmNoSnapshot,
    VmWithSnapshot,
    Cloned,
    TaggedClone,
    RevertedToTemplate,
}

impl SourceState {
    /// State of a freshly resolved source object.
    #[must_use]
    pub fn observe(template: bool, has_snapshot: bool) -> Self {
        match (template, has_snapshot) {
            (true, _) => Self::TemplateNoSnapshot,
            (false, false) => Self::VmNoSnapshot,
            (false, true) => Self::VmWithSnapshot,
        }
    }
}

/// Whether a clone of `age` is past the retention window.
///
/// Strict: a clone exactly `threshold` old is kept.
#[must_use]
pub fn is_expired(age: Duration, threshold: Duration) -> bool {
    age > threshold
}

/// Timestamp for a refreshed stamp.
///
/// Truncated to tag precision and always strictly later than every value in
/// `previous`, so a refresh never moves a clone's age backwards or sideways.
#[must_use]
pub fn next_timestamp(now: NaiveDateTime, previous: &[NaiveDateTime]) -> NaiveDateTime {
    let now = timestamp::truncate(now);
    match previous.iter().max() {
        Some(latest) if *latest >= now => *latest + Duration::seconds(1),
        _ => now,
    }
}

/// Reaper verdict for one tagged VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    /// Old enough to destroy.
    Expired { age: Duration },
    /// Still inside the retention window.
    Young { age: Duration },
    /// No parsable timestamp tag; never destroyed.
    Untimed,
}

impl Eligibility {
    #[must_use]
    pub fn evaluate(created: Option<NaiveDateTime>, now: NaiveDateTime, threshold: Duration) -> Self {
        match created {
            None => Self::Untimed,
            Some(created) => {
                let age = now - created;
                if is_expired(age, threshold) {
                    Self::Expired { age }
                } else {
                    Self::Young { age }
                }
            }
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Expired { .. } => "expired",
            Self::Young { .. } => "active",
            Self::Untimed => "untimed",
        }
    }
}

/// Format an age as `1h5m`/`42s`, negative ages (clock skew) as `0s`.
#[must_use]
pub fn format_age(age: Duration) -> String {
    let total = age.num_seconds().max(0);
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    match (h, m) {
        (0, 0) => format!("{s}s"),
        (0, _) => format!("{m}m{s}s"),
        _ => format!("{h}h{m}m"),
    }
}
