use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test harness for running CLI commands against a throwaway database
pub struct CliTestHarness {
    temp_dir: TempDir,
    db_path: PathBuf,
}

impl CliTestHarness {
    /// Create a new test harness with a temporary database
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");

        Self { temp_dir, db_path }
    }

    /// Get a Command instance configured for testing.
    ///
    /// Runs inside the temp directory so a stray `scheduler.toml` in the
    /// repository can never leak into a test.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("sched").expect("Failed to find sched binary");
        cmd.current_dir(self.temp_dir.path())
            .env("SCHED_DATABASE_PATH", &self.db_path)
            .env_remove("SCHED_LIST_LIMIT")
            .env_remove("SCHED_CACHE")
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Helper to run a command and assert success
    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    /// Helper to run a command and assert failure
    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Runs a command that prints JSON and parses its stdout
    pub fn run_json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.command().args(args).arg("--json").output().expect("Failed to run sched");
        assert!(
            output.status.success(),
            "command {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
    }
}

/// Utility functions for test assertions
pub mod assertions {
    use predicates::prelude::*;

    pub fn has_task_table_headers() -> impl Predicate<str> {
        predicate::str::contains("ID")
            .and(predicate::str::contains("Date"))
            .and(predicate::str::contains("Title"))
    }

    pub fn task_created_successfully() -> impl Predicate<str> {
        predicate::str::contains("✓").and(predicate::str::contains("Created"))
    }

    pub fn not_found() -> impl Predicate<str> {
        predicate::str::contains("Error").and(predicate::str::contains("not found"))
    }

    pub fn invalid_argument() -> impl Predicate<str> {
        predicate::str::contains("Error").and(predicate::str::contains("invalid argument"))
    }
}
