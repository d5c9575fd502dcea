use serde::Deserialize;
use std::path::PathBuf;

/// Retries after the first verified text entry.
pub const DEFAULT_TEXT_RETRIES: u32 = 5;

/// Session-wide switches read on every resolution call.
///
/// Directives on [`Session`](crate::Session) mutate these between steps.
/// The struct deserializes from a partial map, so a runner config can set
/// only the fields it cares about.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Accept case-insensitive substring matches for label text.
    pub partial_match: bool,

    /// Return `NotFound` to the caller instead of only reporting it.
    pub abort_on_not_found: bool,

    /// Reuse resolved components across identical criteria.
    pub use_cache: bool,

    /// Log per-candidate details during resolution.
    pub log_details: bool,

    /// Highlight the resolved element while its action runs.
    pub highlight: bool,

    /// Retries after the first verified text entry.
    pub max_text_retries: u32,

    /// Driver wait timeout in seconds (0 = no implicit wait).
    pub wait_timeout_secs: u64,

    /// Base directory for relative capture-file paths.
    pub output_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            partial_match: false,
            abort_on_not_found: true,
            use_cache: false,
            log_details: true,
            highlight: false,
            max_text_retries: DEFAULT_TEXT_RETRIES,
            wait_timeout_secs: 0,
            output_dir: None,
        }
    }
}

impl Settings {
    /// Resolve a file name against `output_dir` when it is relative.
    pub fn resolve_output(&self, file: &str) -> PathBuf {
        let path = PathBuf::from(file);
        match &self.output_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert!(!s.partial_match);
        assert!(s.abort_on_not_found);
        assert!(!s.use_cache);
        assert!(s.log_details);
        assert_eq!(s.max_text_retries, 5);
    }

    #[test]
    fn test_resolve_output() {
        let mut s = Settings::default();
        assert_eq!(s.resolve_output("items.txt"), PathBuf::from("items.txt"));
        s.output_dir = Some(PathBuf::from("/tmp/out"));
        assert_eq!(
            s.resolve_output("items.txt"),
            PathBuf::from("/tmp/out/items.txt")
        );
        assert_eq!(s.resolve_output("/abs.txt"), PathBuf::from("/abs.txt"));
    }
}
