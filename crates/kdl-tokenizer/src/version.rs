use std::fmt;

/// The two incompatible revisions of the KDL grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "facet", derive(facet::Facet))]
#[repr(u8)]
pub enum Version {
    /// KDL 1.0.0: `r#"..."#` raw strings, bare `true`/`false`/`null`.
    V1,
    /// KDL 2.0.0: `#"..."#` raw strings, `#true` keywords, bare string values.
    V2,
}

impl Version {
    /// The other version.
    pub fn other(self) -> Version {
        match self {
            Version::V1 => Version::V2,
            Version::V2 => Version::V1,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::V1 => f.write_str("KDL v1"),
            Version::V2 => f.write_str("KDL v2"),
        }
    }
}
