//! Base-directory resolution and persisted-state layout.
//!
//! Resolution order mirrors the teacher's `Cli::get_db_path()`: an explicit
//! flag wins, then an environment variable, then a platform default under
//! the user's home directory.

use std::path::{Path, PathBuf};

/// Environment variable overriding the base directory.
pub const BASE_DIR_ENV: &str = "RLM_BASE_DIR";

/// Default base-directory name under the user's home.
const DEFAULT_BASE_DIR_NAME: &str = ".rlm";

/// Resolved locations of every piece of persisted state.
#[derive(Debug, Clone)]
pub struct Paths {
    base: PathBuf,
}

impl Paths {
    /// Resolves the base directory: `flag` if given, else `RLM_BASE_DIR`,
    /// else `~/.rlm`.
    #[must_use]
    pub fn resolve(flag: Option<&Path>) -> Self {
        let base = flag.map(Path::to_path_buf).unwrap_or_else(|| {
            std::env::var_os(BASE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(default_base_dir)
        });
        Self { base }
    }

    /// The base directory itself.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Path to the memory database.
    #[must_use]
    pub fn memory_db(&self) -> PathBuf {
        self.base.join("memory").join("memory.db")
    }

    /// Path to the learned-patterns document.
    #[must_use]
    pub fn learned_patterns(&self) -> PathBuf {
        self.base.join("strategies").join("learned_patterns.md")
    }

    /// Path to the append-only performance log.
    #[must_use]
    pub fn performance_log(&self) -> PathBuf {
        self.base.join("strategies").join("performance.jsonl")
    }

    /// Root directory under which analysis-session state lives.
    #[must_use]
    pub fn sessions_root(&self) -> PathBuf {
        self.base.join("sessions")
    }

    /// Directory for one analysis session.
    #[must_use]
    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.sessions_root().join(session_id)
    }

    /// Ensures every directory this struct resolves to exists.
    ///
    /// # Errors
    /// Returns an error if any directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.memory_db().parent().unwrap_or(&self.base))?;
        std::fs::create_dir_all(self.learned_patterns().parent().unwrap_or(&self.base))?;
        std::fs::create_dir_all(self.sessions_root())
    }
}

fn default_base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_BASE_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_env_and_default() {
        let paths = Paths::resolve(Some(Path::new("/tmp/explicit")));
        assert_eq!(paths.base(), Path::new("/tmp/explicit"));
    }

    #[test]
    fn derived_paths_are_nested_under_base() {
        let paths = Paths::resolve(Some(Path::new("/tmp/rlm-base")));
        assert_eq!(
            paths.memory_db(),
            Path::new("/tmp/rlm-base/memory/memory.db")
        );
        assert_eq!(
            paths.learned_patterns(),
            Path::new("/tmp/rlm-base/strategies/learned_patterns.md")
        );
        assert_eq!(
            paths.session_dir("abc123"),
            Path::new("/tmp/rlm-base/sessions/abc123")
        );
    }

    #[test]
    fn ensure_dirs_creates_tree() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let paths = Paths::resolve(Some(tmp.path()));
        paths.ensure_dirs().expect("ensure_dirs");
        assert!(paths.memory_db().parent().unwrap().is_dir());
        assert!(paths.sessions_root().is_dir());
    }
}
