//! Parser options.

use crate::Version;

/// Options for the KDL parser.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Report slashdashed nodes, arguments, and properties as commented
    /// events instead of dropping them (default: false)
    pub emit_comments: bool,

    /// Parse as this version only; `None` detects it from the document
    /// (default: None)
    pub version: Option<Version>,
}

impl ParseOptions {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report slashdashed input instead of dropping it.
    pub fn emit_comments(mut self, emit: bool) -> Self {
        self.emit_comments = emit;
        self
    }

    /// Parse as a single version instead of detecting it.
    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }
}
