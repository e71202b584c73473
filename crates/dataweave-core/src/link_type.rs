//! How a feature's data array relates to the region of its tag.

use std::fmt;

/// Subsetting rule applied when reading feature data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LinkType {
    /// The feature data is cut to the tag's position and extent.
    #[default]
    Tagged,
    /// The feature data is returned whole.
    Untagged,
    /// One row along the first axis is selected per tag.
    Indexed,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Tagged => "tagged",
            LinkType::Untagged => "untagged",
            LinkType::Indexed => "indexed",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(LinkType::default(), LinkType::Tagged);
        assert_eq!(LinkType::Indexed.to_string(), "indexed");
    }
}
