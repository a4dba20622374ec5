use crate::error::VersionError;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// `major.minor[.patch]` tag of a record's edit line.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub struct VersionTag {
    /// No migration path across different majors
    pub major: u32,
    pub minor: u32,
    /// Defaults to 0 when the tag has two parts
    pub patch: u32,
}

pub const INITIAL_VERSION: VersionTag = VersionTag::new(0, 0);

impl VersionTag {
    pub const fn new(major: u32, minor: u32) -> VersionTag {
        VersionTag {
            major,
            minor,
            patch: 0,
        }
    }

    pub const fn with_patch(major: u32, minor: u32, patch: u32) -> VersionTag {
        VersionTag {
            major,
            minor,
            patch,
        }
    }

    /// Minor and patch as one comparable number.
    pub fn collapsed(&self) -> u64 {
        self.minor as u64 * 10000 + self.patch as u64
    }
}

impl FromStr for VersionTag {
    type Err = VersionError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = tag.split('.').collect();
        if parts.len() < 2 {
            return Err(VersionError::Missing(tag.to_string()));
        }
        if parts.len() > 3 {
            return Err(VersionError::NotNumeric(tag.to_string()));
        }
        let number = |s: &str| {
            s.trim()
                .parse::<u32>()
                .map_err(|_| VersionError::NotNumeric(tag.to_string()))
        };
        let major = number(parts[0])?;
        let minor = number(parts[1])?;
        let patch = match parts.get(2) {
            Some(p) => number(p)?,
            None => 0,
        };
        Ok(VersionTag {
            major,
            minor,
            patch,
        })
    }
}

impl Display for VersionTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.patch == 0 {
            write!(f, "{}.{}", self.major, self.minor)
        } else {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
        }
    }
}

impl PartialOrd for VersionTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionTag {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.major > other.major {
            Ordering::Greater
        } else if self.major < other.major {
            Ordering::Less
        } else {
            self.minor
                .cmp(&other.minor)
                .then(self.patch.cmp(&other.patch))
        }
    }
}

/// Verdict of comparing the version of decoded data against what this consumer supports.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// Different major version, no migration path.
    Inappropriate,
    /// Older than the oldest supported version.
    Unsupported,
    /// Supported but older than current, an upgrade may be needed.
    Behind,
    /// Written by a newer producer than this consumer understands.
    Ahead,
    Same,
}

impl Scenario {
    /// Whether data in this scenario can be handed to application code.
    pub fn is_acceptable(&self) -> bool {
        matches!(self, Scenario::Behind | Scenario::Same)
    }
}

impl Display for Scenario {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Scenario::Inappropriate => "INAPPROPRIATE",
            Scenario::Unsupported => "UNSUPPORTED",
            Scenario::Behind => "BEHIND",
            Scenario::Ahead => "AHEAD",
            Scenario::Same => "SAME",
        };
        f.write_str(s)
    }
}

/// Resolve how data written at `remote` relates to the local `(oldest_supported, current)`
/// pair. Only [`Scenario::Behind`] carries the remote tag back, so the caller can select an
/// upgrade path. Unversioned data on either side always passes as [`Scenario::Same`].
pub fn version_scenario(
    remote: Option<VersionTag>,
    local: Option<(VersionTag, VersionTag)>,
) -> (Option<VersionTag>, Scenario) {
    let (Some(remote), Some((oldest, current))) = (remote, local) else {
        return (None, Scenario::Same);
    };
    if remote.major != current.major {
        return (None, Scenario::Inappropriate);
    }

    let r = remote.collapsed();
    let s = oldest.collapsed();
    let c = current.collapsed();

    if r < c {
        if r < s {
            return (None, Scenario::Unsupported);
        }
        return (Some(remote), Scenario::Behind);
    } else if r > c {
        return (None, Scenario::Ahead);
    }
    (None, Scenario::Same)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(s: &str) -> VersionTag {
        s.parse().unwrap()
    }

    fn scenario(remote: &str, oldest: &str, current: &str) -> (Option<VersionTag>, Scenario) {
        version_scenario(Some(tag(remote)), Some((tag(oldest), tag(current))))
    }

    #[test]
    fn test_version_cmp() {
        assert!(VersionTag::new(1, 0) > VersionTag::new(0, 0));
        assert!(VersionTag::new(0, 10) > VersionTag::new(0, 9));
        assert!(VersionTag::with_patch(0, 9, 1) > VersionTag::new(0, 9));
        assert_eq!(VersionTag::new(0, 0), VersionTag::new(0, 0));
    }

    #[test]
    fn parse_and_display() {
        assert_eq!(tag("1.2"), VersionTag::new(1, 2));
        assert_eq!(tag("1.2.3"), VersionTag::with_patch(1, 2, 3));
        assert_eq!(tag("1.2.0"), tag("1.2"));
        assert_eq!(tag("1.2.3").to_string(), "1.2.3");
        assert_eq!(tag("4.0").to_string(), "4.0");
        assert_eq!("1".parse::<VersionTag>(), Err(VersionError::Missing("1".into())));
        assert!(matches!("1.x".parse::<VersionTag>(), Err(VersionError::NotNumeric(_))));
        assert!(matches!("1.2.3.4".parse::<VersionTag>(), Err(VersionError::NotNumeric(_))));
    }

    #[test]
    fn scenarios() {
        assert_eq!(scenario("1.2", "1.0", "1.2"), (None, Scenario::Same));
        assert_eq!(scenario("1.1", "1.0", "1.2"), (Some(tag("1.1")), Scenario::Behind));
        assert_eq!(scenario("1.0", "1.1", "1.2"), (None, Scenario::Unsupported));
        assert_eq!(scenario("2.0", "1.0", "1.2"), (None, Scenario::Inappropriate));
        assert_eq!(scenario("1.5", "1.0", "1.2"), (None, Scenario::Ahead));
    }

    #[test]
    fn patch_levels_collapse() {
        assert_eq!(
            scenario("1.1.5", "1.1.2", "1.2"),
            (Some(tag("1.1.5")), Scenario::Behind)
        );
        assert_eq!(scenario("1.1.1", "1.1.2", "1.2"), (None, Scenario::Unsupported));
        assert_eq!(scenario("1.2.1", "1.0", "1.2"), (None, Scenario::Ahead));
    }

    #[test]
    fn unversioned_passes_through() {
        assert_eq!(version_scenario(None, None), (None, Scenario::Same));
        assert_eq!(
            version_scenario(None, Some((tag("1.0"), tag("1.2")))),
            (None, Scenario::Same)
        );
        assert_eq!(version_scenario(Some(tag("9.9")), None), (None, Scenario::Same));
    }

    #[test]
    fn oldest_bound_is_inclusive() {
        assert_eq!(scenario("1.0", "1.0", "1.2"), (Some(tag("1.0")), Scenario::Behind));
    }
}
