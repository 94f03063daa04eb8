mod display;
mod host;
mod watch;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use sastyaml_core::config::{self, CONFIG_FILE_NAME};
use sastyaml_core::eligibility::is_playbook;
use sastyaml_core::{ProcessAnalyzer, ReportSummary, Session, Settings, TextDocument};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use host::TerminalHost;

#[derive(Parser)]
#[command(
    name = "sastyaml",
    version,
    about = "SAST YAML — security analysis for Ansible playbooks",
    long_about = "Run the SAST YAML analyzer over Ansible playbooks and show its findings as diagnostics and HTML reports."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to ./sastyaml.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Python interpreter used to run the analyzer
    #[arg(long, global = true)]
    python: Option<String>,

    /// Directory the analyzer module is run from
    #[arg(long, global = true)]
    analyzer_root: Option<PathBuf>,

    /// Analyzer timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze playbooks and print their diagnostics
    Analyze {
        /// Playbook files or directories to search for *.yml / *.yaml
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write the HTML report whenever findings are reported
        #[arg(long)]
        open_report: bool,
    },

    /// Analyze one playbook and produce a full report
    Report {
        /// Playbook file
        file: PathBuf,

        /// Report format
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Html)]
        format: ReportFormat,

        /// Output file (html: defaults to the report directory; json: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyze playbooks on startup and again whenever they are saved
    Watch {
        /// Files or directories to watch
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,
    },

    /// Write a default sastyaml.toml
    InitConfig {
        /// Where to write the file
        #[arg(default_value = CONFIG_FILE_NAME)]
        path: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Html,
    Text,
    Json,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    match &cli.command {
        Commands::Analyze { files, open_report } => cmd_analyze(&cli, files, *open_report).await,
        Commands::Report { file, format, output } => {
            cmd_report(&cli, file, *format, output.clone()).await
        }
        Commands::Watch { paths } => cmd_watch(&cli, paths).await,
        Commands::InitConfig { path } => cmd_init_config(path),
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "sastyaml", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn init_tracing(quiet: bool, verbose: u8) -> Result<()> {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("SASTYAML_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

/// Settings from file and environment, then command-line overrides.
fn load_settings(cli: &Cli) -> Result<Settings> {
    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    let mut settings = Settings::discover(cli.config.as_deref(), &cwd)
        .context("Failed to load settings")?;

    if let Some(python) = &cli.python {
        settings.python_path = python.clone();
    }
    if let Some(root) = &cli.analyzer_root {
        settings.analyzer_root = Some(root.clone());
    }
    if let Some(timeout) = cli.timeout {
        settings.timeout_secs = timeout;
    }
    Ok(settings)
}

fn build_session(settings: Settings, host: TerminalHost) -> Result<Session<ProcessAnalyzer, TerminalHost>> {
    let analyzer = ProcessAnalyzer::from_settings(&settings)
        .context("Failed to locate the analyzer")?;
    tracing::debug!(
        interpreter = %analyzer.interpreter().display(),
        root = %analyzer.root().display(),
        "analyzer configured"
    );
    Ok(Session::new(analyzer, host))
}

fn discover_playbook_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }

        if path.is_dir() {
            for ext in ["yml", "yaml"] {
                let pattern = format!("{}/**/*.{ext}", path.display());
                files.extend(
                    glob::glob(&pattern)
                        .context("Failed to read glob pattern")?
                        .filter_map(|r| r.ok()),
                );
            }
            continue;
        }

        anyhow::bail!("Path '{}' does not exist", path.display());
    }

    let mut files: Vec<PathBuf> = files
        .into_iter()
        .map(|f| std::fs::canonicalize(&f).unwrap_or(f))
        .collect();
    files.sort();
    files.dedup();
    Ok(files)
}

fn open_document(path: &Path) -> Result<TextDocument> {
    TextDocument::open(path).with_context(|| format!("Failed to read '{}'", path.display()))
}

async fn cmd_analyze(cli: &Cli, paths: &[PathBuf], open_report: bool) -> Result<()> {
    let files = discover_playbook_files(paths)?;
    if files.is_empty() {
        anyhow::bail!("No YAML files found in the given paths");
    }

    let settings = load_settings(cli)?;
    let host = TerminalHost::new(settings.clone()).with_open_report(open_report);
    let session = build_session(settings, host)?;

    let analyzed = analyze_files(&session, &files, &named_files(paths)).await?;

    let host = session.host();
    display::print_status(&format!(
        "{} playbook(s) analyzed, {} report(s) written",
        analyzed,
        host.written_reports().len()
    ));
    let failed = host.error_count();
    if failed > 0 {
        anyhow::bail!("{failed} error(s) reported during analysis");
    }
    Ok(())
}

/// Files the user named directly, as opposed to ones found in a directory.
fn named_files(paths: &[PathBuf]) -> HashSet<PathBuf> {
    paths
        .iter()
        .filter(|p| p.is_file())
        .map(|p| std::fs::canonicalize(p).unwrap_or_else(|_| p.clone()))
        .collect()
}

/// Run the explicit analysis command on each file in turn. Files found by
/// directory expansion are skipped quietly when they are not playbooks;
/// named files always go through the command so the user hears about them.
/// Returns how many playbooks were analyzed.
async fn analyze_files(
    session: &Session<ProcessAnalyzer, TerminalHost>,
    files: &[PathBuf],
    named: &HashSet<PathBuf>,
) -> Result<usize> {
    let mut analyzed = 0;

    for file in files {
        let document = open_document(file)?;
        let eligible = is_playbook(&document.text);
        if !eligible && !named.contains(file) {
            tracing::info!(path = %file.display(), "not a playbook, skipped");
            continue;
        }

        let id = document.id.clone();
        session.host().open(document);
        session.host().set_active(&id);
        session.run_analysis_command().await;
        if eligible {
            analyzed += 1;
        }
    }

    Ok(analyzed)
}

async fn cmd_report(
    cli: &Cli,
    file: &Path,
    format: ReportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let settings = load_settings(cli)?;
    let document = open_document(file)?;

    match format {
        ReportFormat::Html => {
            let host = TerminalHost::new(settings.clone()).with_report_path(output);
            let session = build_session(settings, host)?;
            let id = document.id.clone();
            session.host().open(document);
            session.host().set_active(&id);
            if !session.show_report_command().await {
                anyhow::bail!("No report was generated for '{}'", file.display());
            }
        }
        ReportFormat::Text => {
            if output.is_some() {
                anyhow::bail!("--output is only supported for html and json reports");
            }
            let summary = summarize(settings, &document).await?;
            display::print_text_report(&summary);
        }
        ReportFormat::Json => {
            let summary = summarize(settings, &document).await?;
            let json = serde_json::to_string_pretty(&summary.to_json(Local::now()))
                .context("Failed to serialize report")?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write '{}'", path.display()))?;
                    display::print_information(&format!("Report written to {}", path.display()));
                }
                None => println!("{json}"),
            }
        }
    }

    Ok(())
}

/// Analyze `document` without any terminal chatter and aggregate the result.
async fn summarize(settings: Settings, document: &TextDocument) -> Result<ReportSummary> {
    let session = build_session(settings.clone(), TerminalHost::new(settings).quiet())?;
    let result = session
        .inspect(document)
        .await
        .with_context(|| format!("Failed to analyze '{}'", document.file_name.display()))?;
    Ok(ReportSummary::from_findings(
        document.file_name.display().to_string(),
        &result.findings,
    ))
}

async fn cmd_watch(cli: &Cli, paths: &[PathBuf]) -> Result<()> {
    let files = discover_playbook_files(paths)?;
    let settings = load_settings(cli)?;
    let session = build_session(settings.clone(), TerminalHost::new(settings))?;

    for file in &files {
        match TextDocument::open(file) {
            Ok(document) => {
                session.host().open(document);
            }
            Err(e) => tracing::warn!(path = %file.display(), error = %e, "skipping unreadable file"),
        }
    }

    let roots = paths
        .iter()
        .map(|p| std::fs::canonicalize(p).unwrap_or_else(|_| p.clone()))
        .collect::<Vec<_>>();
    watch::run(&session, &roots).await
}

fn cmd_init_config(path: &Path) -> Result<()> {
    if config::scaffold(path).with_context(|| format!("Failed to write '{}'", path.display()))? {
        display::print_information(&format!("Wrote {}", path.display()));
    } else {
        display::print_warning(&format!("{} already exists, left unchanged", path.display()));
    }
    Ok(())
}
