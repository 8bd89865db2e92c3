use serde::Deserialize;
use std::cmp::Ordering;

/// Decides whether one version token supersedes another.
pub trait VersionOrdering: Send + Sync {
    fn compare(&self, a: &str, b: &str) -> Ordering;

    /// True when `candidate` sorts strictly after `current`.
    fn is_newer(&self, candidate: &str, current: &str) -> bool {
        self.compare(candidate, current) == Ordering::Greater
    }
}

/// Plain byte-wise string comparison.
///
/// This is the default, and it is not numeric: `"9.10"` sorts before `"9.9"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lexicographic;

impl VersionOrdering for Lexicographic {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        a.cmp(b)
    }
}

/// Dot-separated comparison where all-digit segments compare numerically.
///
/// Mixed segments fall back to string comparison; a version that is a prefix
/// of another sorts first (`9.6` < `9.6.0`).
#[derive(Debug, Clone, Copy, Default)]
pub struct DottedNumeric;

impl VersionOrdering for DottedNumeric {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        let mut left = a.split('.');
        let mut right = b.split('.');
        loop {
            match (left.next(), right.next()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(l), Some(r)) => {
                    let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
                        (Ok(l), Ok(r)) => l.cmp(&r),
                        _ => l.cmp(r),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
            }
        }
    }
}

/// Config-facing selector for a [`VersionOrdering`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderingKind {
    #[default]
    Lexicographic,
    DottedNumeric,
}

impl OrderingKind {
    pub fn build(self) -> Box<dyn VersionOrdering> {
        match self {
            OrderingKind::Lexicographic => Box::new(Lexicographic),
            OrderingKind::DottedNumeric => Box::new(DottedNumeric),
        }
    }
}
