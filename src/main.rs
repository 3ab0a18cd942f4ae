// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use fictrans::app_config::{self, Config};
use fictrans::app_controller::{Controller, RefreshReport};
use fictrans::project::ExportFormat;
use fictrans::providers::Backend;
use fictrans::translation::{RefineOutcome, RunOutcome};

/// CLI Wrapper for Backend to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliBackend {
    Original,
    Mock,
}

impl From<CliBackend> for Backend {
    fn from(cli_backend: CliBackend) -> Self {
        match cli_backend {
            CliBackend::Original => Backend::Original,
            CliBackend::Mock => Backend::Mock,
        }
    }
}

/// CLI Wrapper for ExportFormat to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliExportFormat {
    Markdown,
    Html,
    Txt,
}

impl From<CliExportFormat> for ExportFormat {
    fn from(cli_format: CliExportFormat) -> Self {
        match cli_format {
            CliExportFormat::Markdown => ExportFormat::Markdown,
            CliExportFormat::Html => ExportFormat::Html,
            CliExportFormat::Txt => ExportFormat::Txt,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a project from a plain text or Markdown file
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Translate every pending block of a project (Ctrl-C stops after the current window)
    Translate {
        #[arg(value_name = "PROJECT_ID")]
        project_id: String,
    },

    /// Refine one block's translation following an instruction
    Refine {
        #[arg(value_name = "PROJECT_ID")]
        project_id: String,
        #[arg(value_name = "BLOCK_ID")]
        block_id: String,
        #[arg(value_name = "INSTRUCTION")]
        instruction: String,
    },

    /// Merge a new version of the source document into a project
    Refresh {
        #[arg(value_name = "PROJECT_ID")]
        project_id: String,
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Apply even when the new document is very different
        #[arg(short, long)]
        yes: bool,
    },

    /// Draft a glossary for the project's fandom and append it to the project glossary
    Glossary {
        #[arg(value_name = "PROJECT_ID")]
        project_id: String,
    },

    /// Write the translated work as a Markdown, HTML or plain text document
    Export {
        #[arg(value_name = "PROJECT_ID")]
        project_id: String,
        /// Document format
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: CliExportFormat,
        /// Output file (defaults to <title>_<language>.<ext> in the current directory)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List stored projects
    List,

    /// Show a project's progress
    Status {
        #[arg(value_name = "PROJECT_ID")]
        project_id: String,
    },

    /// Turn a block into a chapter header or back into text
    ToggleHeader {
        #[arg(value_name = "PROJECT_ID")]
        project_id: String,
        #[arg(value_name = "BLOCK_ID")]
        block_id: String,
    },

    /// Remember a reading position
    Bookmark {
        #[arg(value_name = "PROJECT_ID")]
        project_id: String,
        #[arg(value_name = "BLOCK_ID")]
        block_id: String,
    },

    /// Delete a project
    Delete {
        #[arg(value_name = "PROJECT_ID")]
        project_id: String,
    },

    /// Export or import a backup of every project
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },

    /// Generate shell completions for fictrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum BackupAction {
    /// Write every project to FILE
    Export {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Add the projects in FILE that are not stored yet
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

/// fictrans - batch translation of long-form fiction
#[derive(Parser, Debug)]
#[command(name = "fictrans")]
#[command(version)]
#[command(about = "AI-assisted translation of long-form fiction")]
#[command(long_about = "fictrans splits a work into blocks and translates it window by window,
keeping a rolling context of the preceding text.

EXAMPLES:
    fictrans import my-fic.md                    # Create a project
    fictrans list                                # Show stored projects
    fictrans -b mock translate <PROJECT_ID>      # Dry run with the mock backend
    fictrans refine <PROJECT_ID> <BLOCK_ID> \"more formal\"
    fictrans refresh <PROJECT_ID> my-fic-v2.md   # Merge an updated source
    fictrans export <PROJECT_ID> --format html   # Write the translated work
    fictrans backup export backup.json
    fictrans completions bash > fictrans.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

BACKENDS:
    original - copies the source text (no network)
    mock     - deterministic dry-run translations")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json", env = "FICTRANS_CONFIG")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Translation backend to use
    #[arg(short, long, global = true, value_enum)]
    backend: Option<CliBackend>,

    /// Model id passed to the backend
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Target language for new projects (e.g. 'fr', 'zh-CN', 'original')
    #[arg(short, long, global = true)]
    target_language: Option<String>,

    /// SQLite database file
    #[arg(long, global = true, env = "FICTRANS_DATABASE")]
    database: Option<PathBuf>,
}

// @struct: Custom logger implementation
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger; the level is adjusted later with set_max_level
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for a level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "fictrans", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(cmd_log_level) = &cli.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config = load_config(&cli)?;
    config.validate().context("Configuration validation failed")?;

    if cli.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let controller = Controller::with_config(config)?;
    run_command(&controller, cli.command).await
}

/// Load the config file (writing a default one if missing) and apply CLI overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let config_path = Path::new(&cli.config_path);
    let mut config = if config_path.exists() {
        Config::from_file(config_path)?
    } else {
        warn!("Config file not found at '{}', creating default config.", cli.config_path);
        let config = Config::default();
        config
            .save(config_path)
            .with_context(|| format!("Failed to write default config to file: {}", cli.config_path))?;
        config
    };

    if let Some(backend) = &cli.backend {
        config.translation.backend = backend.clone().into();
    }
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(target_language) = &cli.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(database) = &cli.database {
        config.database_path = Some(database.clone());
    }
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    Ok(config)
}

async fn run_command(controller: &Controller, command: Commands) -> Result<()> {
    match command {
        Commands::Import { file } => {
            let project = controller.import(&file).await?;
            println!("{}", project.id);
        }
        Commands::Translate { project_id } => match controller.translate(&project_id).await? {
            RunOutcome::Completed(progress) => info!("Completed: {}", progress),
            RunOutcome::Stopped(progress) => warn!("Stopped at {}; run translate again to resume", progress),
            RunOutcome::Failed { error, progress } => {
                return Err(anyhow!("Translation failed at {}: {}", progress, error));
            }
        },
        Commands::Refine { project_id, block_id, instruction } => {
            match controller.refine(&project_id, &block_id, &instruction).await? {
                RefineOutcome::Refined { text } => println!("{}", text),
                RefineOutcome::FellBack { error } => {
                    return Err(anyhow!("Refinement failed, translation unchanged: {}", error));
                }
            }
        }
        Commands::Refresh { project_id, file, yes } => match controller.refresh(&project_id, &file, yes).await? {
            RefreshReport::Unchanged => info!("Source unchanged, nothing to do"),
            RefreshReport::NeedsConfirmation { similarity, threshold } => {
                return Err(anyhow!(
                    "New source is only {}% similar (threshold {}%); rerun with --yes to apply",
                    similarity,
                    threshold
                ));
            }
            RefreshReport::Applied { similarity, preserved, blocks } => info!(
                "Refreshed: {} blocks, {}% similar, {} blocks kept their translation state",
                blocks, similarity, preserved
            ),
        },
        Commands::Glossary { project_id } => {
            let glossary = controller.glossary(&project_id).await?;
            println!("{}", glossary);
        }
        Commands::Export { project_id, format, output } => {
            let path = controller.export(&project_id, format.into(), output.as_deref()).await?;
            println!("{}", path.display());
        }
        Commands::List => {
            for summary in controller.list().await? {
                let modified = chrono::DateTime::from_timestamp_millis(summary.last_modified)
                    .map(|d| d.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{}  {:>5}/{:<5}  {}  {}",
                    summary.id, summary.translated, summary.total, modified, summary.title
                );
            }
        }
        Commands::Status { project_id } => {
            let status = controller.status(&project_id).await?;
            println!("{} ({})", status.title, status.id);
            println!("  author:   {}", status.author);
            println!("  fandom:   {}", status.fandom);
            println!("  target:   {} via {}", status.target_language, status.model);
            println!("  progress: {}", status.progress);
            println!("  chapters: {}", status.chapters);
            if let Some((position, chapter)) = status.bookmark {
                println!("  bookmark: block {} (chapter {})", position + 1, chapter + 1);
            }
        }
        Commands::ToggleHeader { project_id, block_id } => {
            let block_type = controller.toggle_header(&project_id, &block_id).await?;
            info!("Block {} is now {}", block_id, block_type);
        }
        Commands::Bookmark { project_id, block_id } => {
            controller.bookmark(&project_id, &block_id).await?;
            info!("Bookmark set");
        }
        Commands::Delete { project_id } => {
            if !controller.delete(&project_id).await? {
                return Err(anyhow!("Project {} does not exist", project_id));
            }
            info!("Deleted {}", project_id);
        }
        Commands::Backup { action } => match action {
            BackupAction::Export { file } => {
                let count = controller.export_backup(&file).await?;
                info!("Exported {} projects to {:?}", count, file);
            }
            BackupAction::Import { file } => {
                let report = controller.import_backup(&file).await?;
                info!("Imported {} projects ({} skipped)", report.imported, report.skipped);
            }
        },
        Commands::Completions { .. } => {}
    }

    Ok(())
}
