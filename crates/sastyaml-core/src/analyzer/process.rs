use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use super::finding::{parse_output, AnalysisResult};
use super::Analyzer;
use crate::config::Settings;
use crate::error::{AnalyzerError, ConfigError};
use crate::staging::StagedFile;

/// Module the analyzer interpreter is asked to run.
pub const ANALYZER_MODULE: &str = "src.main";

/// Runs the external analyzer as `<interpreter> -m src.main <file> --format json --no-ast`.
#[derive(Debug, Clone)]
pub struct ProcessAnalyzer {
    interpreter: PathBuf,
    root: PathBuf,
    timeout: Duration,
    staging_dir: PathBuf,
}

impl ProcessAnalyzer {
    pub fn new(interpreter: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            root: root.into(),
            timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
            staging_dir: std::env::temp_dir(),
        }
    }

    /// Build an analyzer from settings, resolving the analyzer root.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let root = settings.resolve_analyzer_root()?;
        Ok(Self::new(&settings.python_path, root).with_timeout(settings.timeout()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Directory staged files are written to. Defaults to the system temp dir.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Argument vector passed to the interpreter for `staged`.
    pub fn arguments(staged: &Path) -> Vec<std::ffi::OsString> {
        vec![
            "-m".into(),
            ANALYZER_MODULE.into(),
            staged.as_os_str().to_os_string(),
            "--format".into(),
            "json".into(),
            "--no-ast".into(),
        ]
    }

    /// Run the analyzer against an already staged file.
    pub async fn invoke(&self, staged: &Path) -> Result<AnalysisResult, AnalyzerError> {
        let mut command = Command::new(&self.interpreter);
        command
            .args(Self::arguments(staged))
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            interpreter = %self.interpreter.display(),
            root = %self.root.display(),
            file = %staged.display(),
            "spawning analyzer"
        );

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result.map_err(|error| AnalyzerError::Invocation {
                detail: format!(
                    "failed to spawn '{}': {}",
                    self.interpreter.display(),
                    error
                ),
            })?,
            Err(_) => return Err(AnalyzerError::Timeout(self.timeout)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let detail = if stderr.is_empty() {
                format!("analyzer exited with {}", output.status)
            } else {
                stderr.to_string()
            };
            return Err(AnalyzerError::Invocation { detail });
        }

        parse_output(&output.stdout)
    }
}

impl Analyzer for ProcessAnalyzer {
    async fn analyze(&self, source: &str) -> Result<AnalysisResult, AnalyzerError> {
        let staged = StagedFile::create_in(&self.staging_dir, source).map_err(AnalyzerError::Staging)?;
        let outcome = self.invoke(staged.path()).await;
        staged.remove();
        outcome
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_argument_contract() {
        let args = ProcessAnalyzer::arguments(Path::new("/tmp/temp_1.yml"));
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            args,
            vec!["-m", "src.main", "/tmp/temp_1.yml", "--format", "json", "--no-ast"]
        );
    }

    #[tokio::test]
    async fn test_invoke_parses_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "analyzer.sh",
            r#"echo '{"violations":[{"rule_id":"ANS003","message":"m","severity":"LOW"}]}'"#,
        );

        let analyzer = ProcessAnalyzer::new(&script, dir.path());
        let result = analyzer.analyze("- hosts: all\n  tasks: []\n").await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.findings[0].rule_id, "ANS003");
    }

    #[tokio::test]
    async fn test_invoke_runs_in_analyzer_root_with_fixed_args() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        std::fs::create_dir(&root).unwrap();
        let log = dir.path().join("invocation.log");
        let script = write_script(
            dir.path(),
            "analyzer.sh",
            &format!(
                "pwd > '{log}'\necho \"$@\" >> '{log}'\ncat \"$3\" >> '{log}'\necho '{{}}'",
                log = log.display()
            ),
        );

        let analyzer = ProcessAnalyzer::new(&script, &root);
        let result = analyzer.analyze("hosts: x").await.unwrap();
        assert!(result.is_empty());

        let logged = std::fs::read_to_string(&log).unwrap();
        let mut lines = logged.lines();
        assert_eq!(
            std::fs::canonicalize(lines.next().unwrap()).unwrap(),
            std::fs::canonicalize(&root).unwrap()
        );
        let args = lines.next().unwrap();
        assert!(args.starts_with("-m src.main "));
        assert!(args.ends_with(".yml --format json --no-ast"));
        assert_eq!(lines.next(), Some("hosts: x"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "analyzer.sh", "echo 'yaml parse failed' >&2\nexit 1");

        let analyzer = ProcessAnalyzer::new(&script, dir.path());
        let err = analyzer.analyze("x").await.unwrap_err();
        match err {
            AnalyzerError::Invocation { detail } => assert_eq!(detail, "yaml parse failed"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_nonzero_exit_without_stderr_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "analyzer.sh", "exit 3");

        let analyzer = ProcessAnalyzer::new(&script, dir.path());
        let err = analyzer.analyze("x").await.unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_invocation_error() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = ProcessAnalyzer::new("/this/does/not/exist", dir.path());
        let err = analyzer.analyze("x").await.unwrap_err();
        assert!(matches!(err, AnalyzerError::Invocation { .. }));
        assert!(err.to_string().contains("/this/does/not/exist"));
    }

    #[tokio::test]
    async fn test_malformed_stdout_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "analyzer.sh", "echo 'Structure AST:'");

        let analyzer = ProcessAnalyzer::new(&script, dir.path());
        let err = analyzer.analyze("x").await.unwrap_err();
        assert!(matches!(err, AnalyzerError::ResultParse(_)));
    }

    #[tokio::test]
    async fn test_hung_analyzer_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "analyzer.sh", "sleep 10");

        let analyzer =
            ProcessAnalyzer::new(&script, dir.path()).with_timeout(Duration::from_millis(200));
        let err = analyzer.analyze("x").await.unwrap_err();
        assert!(matches!(err, AnalyzerError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_staged_file_removed_on_every_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("staging");
        std::fs::create_dir(&staging).unwrap();

        let bodies = [
            r#"echo '{"violations":[]}'"#,
            "echo boom >&2\nexit 1",
            "echo garbage",
            "sleep 10",
        ];
        for (i, body) in bodies.iter().enumerate() {
            let script = write_script(dir.path(), &format!("analyzer{i}.sh"), body);
            let analyzer = ProcessAnalyzer::new(&script, dir.path())
                .with_staging_dir(&staging)
                .with_timeout(Duration::from_millis(500));
            let _ = analyzer.analyze("- hosts: all\n  tasks: []\n").await;

            let leftovers: Vec<_> = std::fs::read_dir(&staging).unwrap().collect();
            assert!(leftovers.is_empty(), "staged file leaked for script {i}");
        }
    }
}
