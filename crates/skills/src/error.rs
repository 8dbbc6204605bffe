use thiserror::Error;

/// Errors surfaced by the skill registry (§4.E).
///
/// A configured skill directory that can't be read is logged and skipped —
/// not fatal, so it has no variant here (§5: "per-client failures ... never
/// aborting"). This enum only covers failures that abort a whole operation.
#[derive(Debug, Error)]
pub enum SkillError {
    /// Starting the file-system watcher failed.
    #[error("failed to watch skill directory '{path}': {source}")]
    WatchFailed {
        /// Directory that could not be watched.
        path: String,
        /// Underlying notify error.
        #[source]
        source: notify::Error,
    },
}
