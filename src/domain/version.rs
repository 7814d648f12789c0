//! NuGet version parsing and ordering
//!
//! NuGet versions extend semantic versioning with an optional fourth
//! `revision` component and allow the minor/patch parts to be omitted
//! (`1.0` is `1.0.0`). Pre-release labels follow semver precedence but
//! compare case-insensitively, so the label is lowercased before it is
//! handed to [`semver::Prerelease`] for ordering.

use semver::{BuildMetadata, Prerelease};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A parsed NuGet package version
#[derive(Debug, Clone)]
pub struct NuGetVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub revision: u64,
    /// Pre-release label as written (without the leading `-`)
    release: String,
    /// Lowercased label used for precedence
    pre: Prerelease,
}

impl NuGetVersion {
    /// Parse a version string, returning `None` when it is not a valid NuGet version.
    ///
    /// Accepts one to four dot-separated numeric parts, an optional `-label`
    /// and an optional `+metadata`. Ranges (`[1.0,2.0)`), floating versions
    /// (`1.*`) and MSBuild properties (`$(Version)`) are rejected.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        // Metadata is validated but plays no part in ordering or display.
        let rest = match input.split_once('+') {
            Some((rest, meta)) => {
                BuildMetadata::new(meta).ok()?;
                rest
            }
            None => input,
        };

        let (core, release) = match rest.split_once('-') {
            Some((_, "")) => return None,
            Some((core, label)) => (core, label),
            None => (rest, ""),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.is_empty() || parts.len() > 4 {
            return None;
        }

        let mut numbers = [0u64; 4];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            *slot = part.parse().ok()?;
        }

        let pre = if release.is_empty() {
            Prerelease::EMPTY
        } else {
            Prerelease::new(&precedence_label(release)).ok()?
        };

        Some(Self {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            revision: numbers[3],
            release: release.to_string(),
            pre,
        })
    }

    /// Returns true if this version carries a pre-release label
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }
}

/// Lowercase the label and drop leading zeros from numeric identifiers,
/// which NuGet tolerates (`beta.01`) but semver rejects.
fn precedence_label(release: &str) -> String {
    release
        .split('.')
        .map(|part| {
            if part.len() > 1 && part.bytes().all(|b| b.is_ascii_digit()) {
                let trimmed = part.trim_start_matches('0');
                if trimmed.is_empty() {
                    "0".to_string()
                } else {
                    trimmed.to_string()
                }
            } else {
                part.to_ascii_lowercase()
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

impl fmt::Display for NuGetVersion {
    /// Normalized form: three parts, the revision only when non-zero, no metadata.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.revision > 0 {
            write!(f, ".{}", self.revision)?;
        }
        if !self.release.is_empty() {
            write!(f, "-{}", self.release)?;
        }
        Ok(())
    }
}

impl Ord for NuGetVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then(self.revision.cmp(&other.revision))
            .then_with(|| self.pre.cmp(&other.pre))
    }
}

impl PartialOrd for NuGetVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for NuGetVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NuGetVersion {}

impl Hash for NuGetVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.revision.hash(state);
        self.pre.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> NuGetVersion {
        NuGetVersion::parse(s).unwrap()
    }

    #[test]
    fn test_parse_three_part() {
        let version = v("1.2.3");
        assert_eq!((version.major, version.minor, version.patch), (1, 2, 3));
        assert!(!version.is_prerelease());
    }

    #[test]
    fn test_parse_short_and_long_forms() {
        assert_eq!(v("1.0").to_string(), "1.0.0");
        assert_eq!(v("7").to_string(), "7.0.0");
        assert_eq!(v("4.5.6.7").to_string(), "4.5.6.7");
        assert_eq!(v("4.5.6.0").to_string(), "4.5.6");
    }

    #[test]
    fn test_parse_prerelease_and_metadata() {
        let version = v("2.0.0-Beta.1+sha.abc");
        assert!(version.is_prerelease());
        assert_eq!(version.to_string(), "2.0.0-Beta.1");
    }

    #[test]
    fn test_parse_numeric_label_with_leading_zeros() {
        let version = v("1.0.0-beta.01");
        assert!(version.is_prerelease());
        assert_eq!(version.to_string(), "1.0.0-beta.01");
        assert_eq!(version, v("1.0.0-beta.1"));
        assert!(v("1.0.0-beta.02") < v("1.0.0-beta.10"));
        assert_eq!(v("1.0.0-rc.00"), v("1.0.0-rc.0"));
    }

    #[test]
    fn test_parse_rejects_non_versions() {
        assert!(NuGetVersion::parse("").is_none());
        assert!(NuGetVersion::parse("   ").is_none());
        assert!(NuGetVersion::parse("$(SerilogVersion)").is_none());
        assert!(NuGetVersion::parse("[1.0.0,2.0.0)").is_none());
        assert!(NuGetVersion::parse("1.*").is_none());
        assert!(NuGetVersion::parse("1.2.3.4.5").is_none());
        assert!(NuGetVersion::parse("1.2.3-").is_none());
        assert!(NuGetVersion::parse("v1.2.3").is_none());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(v(" 1.2.3 ").to_string(), "1.2.3");
    }

    #[test]
    fn test_ordering_numeric() {
        assert!(v("1.0.0") < v("1.2.0"));
        assert!(v("1.9.0") < v("1.10.0"));
        assert!(v("1.0.0") < v("1.0.0.1"));
        assert_eq!(v("1.0"), v("1.0.0.0"));
    }

    #[test]
    fn test_ordering_prerelease() {
        assert!(v("2.0.0-beta") < v("2.0.0"));
        assert!(v("2.0.0-alpha") < v("2.0.0-beta"));
        assert!(v("2.0.0-beta.2") < v("2.0.0-beta.11"));
        assert!(v("1.2.0") < v("2.0.0-beta"));
    }

    #[test]
    fn test_prerelease_case_insensitive() {
        assert_eq!(v("1.0.0-RC.1"), v("1.0.0-rc.1"));
    }

    #[test]
    fn test_metadata_ignored_for_equality() {
        assert_eq!(v("1.0.0+build.1"), v("1.0.0+build.2"));
    }

    #[test]
    fn test_max_selection() {
        let versions = [v("1.0.0"), v("2.0.0-beta"), v("1.2.0")];
        assert_eq!(versions.iter().max().unwrap().to_string(), "2.0.0-beta");
    }
}
