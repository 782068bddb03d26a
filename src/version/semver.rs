use std::cmp::Ordering;
use std::fmt;

/// A chart version ordered by semantic-versioning precedence.
///
/// Syntax is validated by the `semver` crate; ordering is implemented here
/// because precedence must ignore build metadata, which `semver::Version`
/// uses as a tie breaker.
#[derive(Debug, Clone)]
pub struct ChartVersion(semver::Version);

impl ChartVersion {
    /// Parse a version string, normalizing lenient forms first.
    ///
    /// Accepts a leading `v` and pads partial versions like "1" or "1.2"
    /// with zeros. Any other deviation from `MAJOR.MINOR.PATCH[-pre][+build]`
    /// is rejected.
    ///
    /// Examples:
    /// - "1.2.3" -> 1.2.3
    /// - "v1.2" -> 1.2.0
    /// - "2-rc.1" -> 2.0.0-rc.1
    pub fn parse(raw: &str) -> Result<Self, semver::Error> {
        let trimmed = raw.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        let split_at = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
        let (core, suffix) = trimmed.split_at(split_at);

        let normalized = match core.split('.').count() {
            1 => format!("{}.0.0{}", core, suffix),
            2 => format!("{}.0{}", core, suffix),
            _ => trimmed.to_string(),
        };

        semver::Version::parse(&normalized).map(Self)
    }
}

/// Compare two dot-separated pre-release strings by semver precedence.
///
/// Numeric identifiers compare numerically and sort before alphanumeric
/// ones; a shorter list sorts first when all shared identifiers are equal.
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        // A release sorts after any of its pre-releases
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ordering = compare_identifier(l, r);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn compare_identifier(a: &str, b: &str) -> Ordering {
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit());

    match (numeric(a), numeric(b)) {
        // Numeric identifiers carry no leading zeros, so length orders first
        (true, true) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

impl Ord for ChartVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .major
            .cmp(&other.0.major)
            .then_with(|| self.0.minor.cmp(&other.0.minor))
            .then_with(|| self.0.patch.cmp(&other.0.patch))
            .then_with(|| compare_prerelease(self.0.pre.as_str(), other.0.pre.as_str()))
    }
}

impl PartialOrd for ChartVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ChartVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ChartVersion {}

impl fmt::Display for ChartVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
