//! Extension matching for media files

use crate::types::CamrollError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Extensions picked up by default (matched case-insensitively)
pub const SUPPORTED_EXTENSIONS: &[&str] =
    &[".mov", ".mp4", ".avi", ".jpg", ".jpeg", ".png", ".heic"];

/// Case-insensitive `*.<ext>` matcher over bare file names
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    patterns: Vec<String>,
    set: GlobSet,
}

impl ExtensionFilter {
    /// Build a filter from extensions with or without the leading dot
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Result<Self, CamrollError> {
        let mut builder = GlobSetBuilder::new();
        let mut patterns = Vec::with_capacity(extensions.len());

        for ext in extensions {
            let ext = ext.as_ref().trim().trim_start_matches('.');
            if ext.is_empty() {
                return Err(CamrollError::Config("empty extension in filter".to_string()));
            }
            let pattern = format!("*.{}", ext.to_lowercase());
            let glob = GlobBuilder::new(&pattern)
                .case_insensitive(true)
                .literal_separator(true)
                .build()
                .map_err(|e| {
                    CamrollError::Config(format!("Invalid extension '{}': {}", ext, e))
                })?;
            builder.add(glob);
            patterns.push(pattern);
        }

        let set = builder
            .build()
            .map_err(|e| CamrollError::Config(format!("Failed to build extension set: {}", e)))?;

        Ok(Self { patterns, set })
    }

    /// Does this bare file name carry one of the extensions?
    pub fn matches(&self, file_name: &str) -> bool {
        self.set.is_match(file_name)
    }

    /// Glob strings, for transports that filter on their side
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        // Built-in list is known-good.
        Self::new(SUPPORTED_EXTENSIONS).unwrap_or_else(|_| Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        })
    }
}
