//! Script importer
//!
//! Scripts reach the database tool through a file, never through stdin: the
//! tool crashes when fed a stream. Every script body is written to a temporary
//! `.sql` file, the tool is given its path, and the file is removed afterwards
//! whatever the tool's exit status.

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use rigging_types::RunMode;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, instrument, warn};

static CREATE_PROCEDURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^(\s*)CREATE\s+PROC(?:EDURE)?\b").expect("valid procedure pattern")
});

/// How the script tool authenticates against the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SqlAuthMethod {
    /// Token of the already-authenticated CLI session; non-interactive
    CliToken,
    /// Default credential chain of the operator's machine
    DefaultCredentialChain,
}

impl SqlAuthMethod {
    pub fn for_mode(mode: RunMode) -> Self {
        match mode {
            RunMode::Automated => SqlAuthMethod::CliToken,
            RunMode::Interactive => SqlAuthMethod::DefaultCredentialChain,
        }
    }

    /// Value of the tool's authentication-method option
    pub fn as_tool_value(&self) -> &'static str {
        match self {
            SqlAuthMethod::CliToken => "ActiveDirectoryAzCli",
            SqlAuthMethod::DefaultCredentialChain => "ActiveDirectoryDefault",
        }
    }
}

/// Database a script runs against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTarget {
    pub server: String,
    pub database: String,
    pub auth: SqlAuthMethod,
}

/// One call of the script tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInvocation {
    pub server: String,
    pub database: String,
    pub auth: SqlAuthMethod,
    /// File holding the script; the only channel the tool reads from
    pub script_path: PathBuf,
}

/// Executes script files against a database
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Run the file at `invocation.script_path`, returning the tool's exit code
    async fn run(&self, invocation: &ScriptInvocation) -> Result<i32>;

    /// Runner name for logging
    fn name(&self) -> &str;
}

/// Which set a script belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKind {
    Schema,
    Procedures,
    PrincipalBinding,
}

/// A script body ready to import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub name: String,
    pub kind: ScriptKind,
    pub body: String,
}

impl Script {
    pub fn new(name: impl Into<String>, kind: ScriptKind, body: impl Into<String>) -> Self {
        let body = body.into();
        let body = match kind {
            ScriptKind::Procedures => normalize_procedures(&body),
            _ => body,
        };
        Self {
            name: name.into(),
            kind,
            body,
        }
    }
}

/// Rewrite `CREATE PROC[EDURE]` statements to `CREATE OR ALTER PROCEDURE`
pub fn normalize_procedures(body: &str) -> String {
    CREATE_PROCEDURE
        .replace_all(body, "${1}CREATE OR ALTER PROCEDURE")
        .into_owned()
}

/// Load the `*.sql` files of `dir` in file-name order.
///
/// A missing directory is an empty set.
pub fn discover_scripts(dir: &Path, kind: ScriptKind) -> Result<Vec<Script>> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), ?kind, "Script directory not found; nothing to import");
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
        })
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let body = std::fs::read_to_string(&path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(Script::new(name, kind, body))
        })
        .collect()
}

/// Result of importing one script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub name: String,
    pub kind: ScriptKind,
    /// Tool exit code, if the tool ran
    pub exit_code: Option<i32>,
    /// Why the tool did not run or could not be run
    pub error: Option<String>,
}

impl ImportOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.exit_code == Some(0)
    }
}

/// Results of an import batch, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub outcomes: Vec<ImportOutcome>,
}

impl ImportSummary {
    pub fn failed(&self) -> impl Iterator<Item = &ImportOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Imports scripts through the temp-file channel
pub struct ScriptImporter<'a> {
    runner: &'a dyn ScriptRunner,
    target: ScriptTarget,
}

impl<'a> ScriptImporter<'a> {
    pub fn new(runner: &'a dyn ScriptRunner, target: ScriptTarget) -> Self {
        Self { runner, target }
    }

    /// Import schema scripts, then procedure scripts. Failures are logged and
    /// the remaining scripts still run.
    #[instrument(skip_all, fields(schema = schema.len(), procedures = procedures.len()))]
    pub async fn import_sets(&self, schema: &[Script], procedures: &[Script]) -> ImportSummary {
        let mut summary = ImportSummary::default();
        for script in schema.iter().chain(procedures) {
            summary.outcomes.push(self.import(script).await);
        }
        info!(
            imported = summary.outcomes.len(),
            failed = summary.failed().count(),
            "Script import finished"
        );
        summary
    }

    /// Import one script; never fails, the outcome carries the error
    pub async fn import(&self, script: &Script) -> ImportOutcome {
        let (exit_code, error) = match self.run_via_temp_file(script).await {
            Ok(0) => (Some(0), None),
            Ok(code) => {
                warn!(script = %script.name, exit_code = code, "Script tool reported failure");
                (Some(code), None)
            }
            Err(e) => {
                warn!(script = %script.name, error = %e, "Script could not be executed");
                (None, Some(e.to_string()))
            }
        };

        ImportOutcome {
            name: script.name.clone(),
            kind: script.kind,
            exit_code,
            error,
        }
    }

    async fn run_via_temp_file(&self, script: &Script) -> Result<i32> {
        let mut file = tempfile::Builder::new()
            .prefix("rigging-")
            .suffix(".sql")
            .tempfile()?;
        file.write_all(script.body.as_bytes())?;
        file.flush()?;

        let invocation = ScriptInvocation {
            server: self.target.server.clone(),
            database: self.target.database.clone(),
            auth: self.target.auth,
            script_path: file.path().to_path_buf(),
        };
        debug!(script = %script.name, path = %invocation.script_path.display(), runner = self.runner.name(), "Running script");

        let result = self.runner.run(&invocation).await;

        if let Err(e) = file.close() {
            warn!(error = %e, "Temporary script file could not be removed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrchestratorError;
    use crate::memory::RecordingScriptRunner;

    fn target() -> ScriptTarget {
        ScriptTarget {
            server: "sql-x.database.windows.net".into(),
            database: "Northwind".into(),
            auth: SqlAuthMethod::CliToken,
        }
    }

    struct FailingRunner {
        seen: parking_lot::Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl ScriptRunner for FailingRunner {
        async fn run(&self, invocation: &ScriptInvocation) -> Result<i32> {
            self.seen.lock().push(invocation.script_path.clone());
            Err(OrchestratorError::Configuration("tool not installed".into()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_auth_method_follows_mode() {
        assert_eq!(
            SqlAuthMethod::for_mode(RunMode::Automated).as_tool_value(),
            "ActiveDirectoryAzCli"
        );
        assert_eq!(
            SqlAuthMethod::for_mode(RunMode::Interactive).as_tool_value(),
            "ActiveDirectoryDefault"
        );
    }

    #[test]
    fn test_procedures_become_create_or_alter() {
        let body = "CREATE PROCEDURE dbo.GetExpenses AS SELECT 1;\nGO\n  create proc dbo.Other AS SELECT 2;\nCREATE OR ALTER PROCEDURE dbo.Kept AS SELECT 3;";
        let normalized = normalize_procedures(body);

        assert!(normalized.starts_with("CREATE OR ALTER PROCEDURE dbo.GetExpenses"));
        assert!(normalized.contains("  CREATE OR ALTER PROCEDURE dbo.Other"));
        assert!(normalized.contains("CREATE OR ALTER PROCEDURE dbo.Kept"));
        assert!(!normalized.contains("CREATE OR ALTER OR ALTER"));
    }

    #[test]
    fn test_schema_scripts_are_not_rewritten() {
        let script = Script::new("s.sql", ScriptKind::Schema, "CREATE PROCEDURE x AS SELECT 1;");
        assert_eq!(script.body, "CREATE PROCEDURE x AS SELECT 1;");
    }

    #[tokio::test]
    async fn test_script_is_passed_by_path_and_removed() {
        let runner = RecordingScriptRunner::new();
        let importer = ScriptImporter::new(&runner, target());
        let script = Script::new("schema.sql", ScriptKind::Schema, "CREATE TABLE t (id INT);");

        let outcome = importer.import(&script).await;
        assert!(outcome.succeeded());

        let runs = runner.runs();
        assert_eq!(runs.len(), 1);
        assert!(runs[0].existed);
        assert_eq!(runs[0].content, "CREATE TABLE t (id INT);");
        assert_eq!(
            runs[0].invocation.script_path.extension().unwrap(),
            "sql"
        );
        assert!(!runs[0].invocation.script_path.exists());
    }

    #[tokio::test]
    async fn test_temp_file_removed_when_tool_errors() {
        let runner = FailingRunner {
            seen: parking_lot::Mutex::new(Vec::new()),
        };
        let importer = ScriptImporter::new(&runner, target());

        let outcome = importer
            .import(&Script::new("a.sql", ScriptKind::Schema, "SELECT 1;"))
            .await;

        assert!(!outcome.succeeded());
        assert!(outcome.error.is_some());
        let seen = runner.seen.lock().clone();
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].exists());
    }

    #[tokio::test]
    async fn test_nonzero_exit_continues_with_next_script() {
        let runner = RecordingScriptRunner::with_exit_code(1);
        let importer = ScriptImporter::new(&runner, target());
        let schema = vec![Script::new("1.sql", ScriptKind::Schema, "SELECT 1;")];
        let procedures = vec![Script::new(
            "2.sql",
            ScriptKind::Procedures,
            "CREATE PROCEDURE p AS SELECT 1;",
        )];

        let summary = importer.import_sets(&schema, &procedures).await;
        assert_eq!(summary.outcomes.len(), 2);
        assert_eq!(summary.failed().count(), 2);
        assert!(!runner.runs()[1].invocation.script_path.exists());
        assert!(runner.runs().iter().all(|r| !r.invocation.script_path.exists()));
    }

    #[tokio::test]
    async fn test_schema_runs_before_procedures() {
        let runner = RecordingScriptRunner::new();
        let importer = ScriptImporter::new(&runner, target());
        let schema = vec![
            Script::new("01_tables.sql", ScriptKind::Schema, "-- tables"),
            Script::new("02_seed.sql", ScriptKind::Schema, "-- seed"),
        ];
        let procedures = vec![Script::new("procs.sql", ScriptKind::Procedures, "-- procs")];

        let summary = importer.import_sets(&schema, &procedures).await;
        let names: Vec<_> = summary.outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["01_tables.sql", "02_seed.sql", "procs.sql"]);
        assert!(summary.all_succeeded());
    }

    #[test]
    fn test_discover_sorts_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("02_b.sql"), "B").unwrap();
        std::fs::write(dir.path().join("01_a.SQL"), "A").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let scripts = discover_scripts(dir.path(), ScriptKind::Schema).unwrap();
        let names: Vec<_> = scripts.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["01_a.SQL", "02_b.sql"]);
    }

    #[test]
    fn test_discover_missing_dir_is_empty() {
        let scripts =
            discover_scripts(Path::new("/nonexistent/rigging/scripts"), ScriptKind::Procedures)
                .unwrap();
        assert!(scripts.is_empty());
    }
}
