use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::Serialize;

use crate::span::Span;

use super::node::FileId;

/// How a usage reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    /// Same-file reference with no import in between.
    Direct,
    /// Dotted access through a bound name: `ns.helper`, `Dog.bark`.
    Chained,
    /// Through a non-aliased import or re-export.
    Indirect,
    /// Through an import or re-export that renames the binding.
    Aliased,
}

impl UsageKind {
    pub const ALL: [UsageKind; 4] = [
        UsageKind::Direct,
        UsageKind::Chained,
        UsageKind::Indirect,
        UsageKind::Aliased,
    ];

    fn bit(self) -> u8 {
        match self {
            UsageKind::Direct => 0b0001,
            UsageKind::Chained => 0b0010,
            UsageKind::Indirect => 0b0100,
            UsageKind::Aliased => 0b1000,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UsageKind::Direct => "direct",
            UsageKind::Chained => "chained",
            UsageKind::Indirect => "indirect",
            UsageKind::Aliased => "aliased",
        }
    }
}

impl fmt::Display for UsageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of [`UsageKind`]s, composable with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UsageKinds(u8);

impl UsageKinds {
    pub const NONE: UsageKinds = UsageKinds(0);
    pub const DIRECT: UsageKinds = UsageKinds(0b0001);
    pub const CHAINED: UsageKinds = UsageKinds(0b0010);
    pub const INDIRECT: UsageKinds = UsageKinds(0b0100);
    pub const ALIASED: UsageKinds = UsageKinds(0b1000);
    pub const ALL: UsageKinds = UsageKinds(0b1111);

    pub fn contains(self, kind: UsageKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Parse a comma-separated list such as `"direct,aliased"` or `"all"`.
    pub fn parse(list: &str) -> Option<Self> {
        let mut kinds = UsageKinds::NONE;
        for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            kinds |= match part.to_ascii_lowercase().as_str() {
                "all" => UsageKinds::ALL,
                "direct" => UsageKinds::DIRECT,
                "chained" => UsageKinds::CHAINED,
                "indirect" => UsageKinds::INDIRECT,
                "aliased" => UsageKinds::ALIASED,
                _ => return None,
            };
        }
        Some(kinds)
    }
}

impl From<UsageKind> for UsageKinds {
    fn from(kind: UsageKind) -> Self {
        UsageKinds(kind.bit())
    }
}

impl BitOr for UsageKinds {
    type Output = UsageKinds;

    fn bitor(self, rhs: UsageKinds) -> UsageKinds {
        UsageKinds(self.0 | rhs.0)
    }
}

impl BitOr<UsageKind> for UsageKinds {
    type Output = UsageKinds;

    fn bitor(self, rhs: UsageKind) -> UsageKinds {
        UsageKinds(self.0 | rhs.bit())
    }
}

impl BitOrAssign for UsageKinds {
    fn bitor_assign(&mut self, rhs: UsageKinds) {
        self.0 |= rhs.0;
    }
}

/// Edge weight: one usage of the target symbol by the source symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageEdge {
    pub kind: UsageKind,
    /// The file containing the referencing token.
    pub file: FileId,
    /// The referencing token itself.
    pub site: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_set_composition() {
        let set = UsageKinds::DIRECT | UsageKind::Aliased;
        assert!(set.contains(UsageKind::Direct));
        assert!(set.contains(UsageKind::Aliased));
        assert!(!set.contains(UsageKind::Chained));
        assert!(UsageKind::ALL.iter().all(|k| UsageKinds::ALL.contains(*k)));
        assert!(UsageKinds::NONE.is_empty());
    }

    #[test]
    fn test_parse_kind_list() {
        assert_eq!(UsageKinds::parse("all"), Some(UsageKinds::ALL));
        assert_eq!(
            UsageKinds::parse("direct, indirect"),
            Some(UsageKinds::DIRECT | UsageKinds::INDIRECT)
        );
        assert_eq!(UsageKinds::parse("sideways"), None);
    }
}
