use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use crate::app_config::Config;
use crate::database::{DatabaseConnection, ProjectRepository, ProjectStore, ProjectSummary};
use crate::language_utils;
use crate::project::{export, BlockType, ExportFormat, Progress, Project};
use crate::providers::create_client;
use crate::reconcile::{Reconciler, RefreshPlan};
use crate::session::{self, AutosaveTask, ImportReport, ProjectLocks};
use crate::source::{PlainTextSource, SourceProvider, UNKNOWN};
use crate::translation::prompts::GENERIC_FANDOM;
use crate::translation::{
    generate_glossary, identify_fandom, refine_block, BatchScheduler, RefineOutcome, RunOutcome, SchedulerEvent, StopHandle,
    TranslationClient,
};

// @module: Application controller for project workflows

/// Result of a refresh request
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshReport {
    /// The document is byte-identical to the last import
    Unchanged,
    /// Similarity is below the threshold and the caller did not confirm
    NeedsConfirmation { similarity: u8, threshold: u8 },
    Applied { similarity: u8, preserved: usize, blocks: usize },
}

/// Snapshot printed by `status`
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectStatus {
    pub id: String,
    pub title: String,
    pub author: String,
    pub fandom: String,
    pub target_language: String,
    pub model: String,
    pub progress: Progress,
    pub chapters: usize,
    /// Position and chapter of the bookmarked block
    pub bookmark: Option<(usize, usize)>,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    store: Arc<dyn ProjectStore>,
    client: Arc<dyn TranslationClient>,
    locks: ProjectLocks,
    source: PlainTextSource,
}

impl Controller {
    // @method: Open the configured database and backend
    pub fn with_config(config: Config) -> Result<Self> {
        let db = match &config.database_path {
            Some(path) => DatabaseConnection::new(path)?,
            None => DatabaseConnection::new_default()?,
        };
        let store: Arc<dyn ProjectStore> = Arc::new(ProjectRepository::new(db));
        let client = create_client(config.translation.backend);
        Ok(Self::with_parts(config, store, client))
    }

    /// Assemble a controller from explicit parts
    pub fn with_parts(config: Config, store: Arc<dyn ProjectStore>, client: Arc<dyn TranslationClient>) -> Self {
        Self {
            config,
            store,
            client,
            locks: ProjectLocks::new(),
            source: PlainTextSource::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ProjectStore> {
        &self.store
    }

    /// Create a project from a plain text or Markdown file
    pub async fn import(&self, path: &Path) -> Result<Project> {
        let document = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read source document: {:?}", path))?;
        let name_hint = path.file_stem().and_then(|s| s.to_str());
        let parsed = self.source.parse(&document, name_hint)?;

        let mut project = Project::from_source(parsed, self.config.project_defaults());

        let fandom_unknown = project.metadata.fandom.is_empty() || project.metadata.fandom == UNKNOWN;
        if fandom_unknown && !language_utils::is_original(&project.metadata.target_language) {
            let fandom = identify_fandom(self.client.as_ref(), &project, &project.metadata.model).await;
            project.metadata.fandom = fandom;
            debug!("Identified fandom: {}", project.metadata.fandom);
        }

        self.store.save(&project).await?;
        info!(
            "Imported '{}' as {} ({} blocks, {} chapters)",
            project.metadata.title,
            project.id,
            project.blocks.len(),
            project.chapter_count()
        );
        Ok(project)
    }

    /// Translate a project with a progress bar; Ctrl-C stops after the current window
    pub async fn translate(&self, project_id: &str) -> Result<RunOutcome> {
        let start_time = Instant::now();
        let stop = StopHandle::new();

        let interrupt = {
            let stop = stop.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Stop requested, finishing the current window");
                    stop.request_stop();
                }
            })
        };

        let autosave = if self.config.autosave.enabled {
            Some(AutosaveTask::start(
                Arc::clone(&self.store),
                self.backup_dir()?,
                self.config.autosave.interval(),
            ))
        } else {
            None
        };

        let (tx, mut rx) = unbounded_channel();
        let progress_bar = ProgressBar::new(0);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} blocks ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message("Translating");

        let bar = progress_bar.clone();
        let consumer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    SchedulerEvent::Loading { window, .. } => {
                        bar.set_message(format!("Window {}/{}", window.index + 1, window.count));
                    }
                    SchedulerEvent::WindowCompleted { progress, .. } => {
                        bar.set_length(progress.total as u64);
                        bar.set_position(progress.translated as u64);
                    }
                    SchedulerEvent::Completed { progress } => {
                        bar.set_length(progress.total as u64);
                        bar.set_position(progress.translated as u64);
                        bar.finish_with_message("Done");
                    }
                    SchedulerEvent::Stopped { .. } => bar.abandon_with_message("Stopped"),
                    SchedulerEvent::Failed { .. } => bar.abandon_with_message("Failed"),
                }
            }
        });

        let result = self.run_translation(project_id, &stop, Some(&tx)).await;
        drop(tx);
        let _ = consumer.await;
        interrupt.abort();
        if let Some(handle) = autosave {
            handle.stop().await;
        }
        if !progress_bar.is_finished() {
            progress_bar.finish_and_clear();
        }

        let outcome = result?;
        info!(
            "Translation finished in {}: {}",
            Self::format_duration(start_time.elapsed()),
            outcome.progress()
        );
        Ok(outcome)
    }

    /// Translate a project without any terminal interaction
    pub async fn run_translation(
        &self,
        project_id: &str,
        stop: &StopHandle,
        events: Option<&UnboundedSender<SchedulerEvent>>,
    ) -> Result<RunOutcome> {
        let mut project = self.store.require(project_id).await?;

        if language_utils::is_original(&project.metadata.target_language) {
            info!("Target language is 'original', copying source text");
            project.fill_with_original();
            self.store.save(&project).await?;
            let progress = project.progress();
            if let Some(events) = events {
                let _ = events.send(SchedulerEvent::Completed { progress });
            }
            return Ok(RunOutcome::Completed(progress));
        }

        let scheduler = BatchScheduler::new(
            Arc::clone(&self.client),
            Arc::clone(&self.store),
            self.config.scheduler_config(&project.metadata),
        )
        .with_locks(self.locks.clone());

        Ok(scheduler.run(&mut project, stop, events).await?)
    }

    /// Refine one block following an instruction
    pub async fn refine(&self, project_id: &str, block_id: &str, instruction: &str) -> Result<RefineOutcome> {
        let mut project = self.store.require(project_id).await?;
        let outcome = refine_block(self.client.as_ref(), &mut project, block_id, instruction).await?;
        self.store.save(&project).await?;

        if let RefineOutcome::FellBack { error } = &outcome {
            warn!("Refinement failed, kept the previous translation: {}", error);
        }
        Ok(outcome)
    }

    /// Draft a glossary for the project's fandom and append it to the project glossary
    pub async fn glossary(&self, project_id: &str) -> Result<String> {
        let mut project = self.store.require(project_id).await?;
        let fandom = project.metadata.fandom.trim();
        if fandom.is_empty() || fandom == UNKNOWN || fandom == GENERIC_FANDOM {
            return Err(anyhow!(
                "Project {} has no known fandom; set one before generating a glossary",
                project_id
            ));
        }

        let generated = generate_glossary(self.client.as_ref(), &project).await;
        if generated.is_empty() {
            return Err(anyhow!("Glossary generation failed, project glossary unchanged"));
        }

        project.metadata.glossary = if project.metadata.glossary.trim().is_empty() {
            generated.clone()
        } else {
            format!("{}\n\n{}", project.metadata.glossary, generated)
        };
        project.touch();
        self.store.save(&project).await?;
        info!("Added a {} line glossary to '{}'", generated.lines().count(), project.metadata.title);
        Ok(generated)
    }

    /// Write the project as a reader-facing document; returns the written path
    pub async fn export(&self, project_id: &str, format: ExportFormat, output: Option<&Path>) -> Result<PathBuf> {
        let project = self.store.require(project_id).await?;
        let path = match output {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(export::file_name(&project, format)),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let document = export::render(&project, format);
        tokio::fs::write(&path, document)
            .await
            .with_context(|| format!("Failed to write export: {:?}", path))?;
        info!("Exported '{}' as {} to {:?}", project.metadata.title, format, path);
        Ok(path)
    }

    /// Reparse the source document and merge it into the project
    pub async fn refresh(&self, project_id: &str, path: &Path, confirmed: bool) -> Result<RefreshReport> {
        let mut project = self.store.require(project_id).await?;
        let document = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read source document: {:?}", path))?;
        let parsed = self.source.parse(&document, path.file_stem().and_then(|s| s.to_str()))?;

        let reconciler = Reconciler::new(self.config.reconcile.similarity_warning_threshold);
        let plan = match reconciler.plan(&project, &parsed) {
            RefreshPlan::Unchanged => return Ok(RefreshReport::Unchanged),
            RefreshPlan::Merge(plan) => plan,
        };

        if plan.needs_confirmation && !confirmed {
            warn!(
                "New source is only {}% similar to the stored project (threshold {}%)",
                plan.similarity,
                reconciler.threshold()
            );
            return Ok(RefreshReport::NeedsConfirmation {
                similarity: plan.similarity,
                threshold: reconciler.threshold(),
            });
        }

        let similarity = plan.similarity;
        let preserved = plan.preserved;
        reconciler.apply(&mut project, &parsed, plan);
        self.store.save(&project).await?;

        Ok(RefreshReport::Applied {
            similarity,
            preserved,
            blocks: project.blocks.len(),
        })
    }

    pub async fn list(&self) -> Result<Vec<ProjectSummary>> {
        Ok(self.store.list().await?)
    }

    pub async fn status(&self, project_id: &str) -> Result<ProjectStatus> {
        let project = self.store.require(project_id).await?;
        let bookmark = project.bookmark_block_id.as_deref().and_then(|id| {
            project
                .blocks
                .iter()
                .position(|b| b.id == id)
                .map(|position| (position, project.blocks[position].chapter_index))
        });

        Ok(ProjectStatus {
            id: project.id.clone(),
            title: project.metadata.title.clone(),
            author: project.metadata.author.clone(),
            fandom: project.metadata.fandom.clone(),
            target_language: project.metadata.target_language.clone(),
            model: project.metadata.model.clone(),
            progress: project.progress(),
            chapters: project.chapter_count(),
            bookmark,
        })
    }

    /// Swap a block between header and text; returns the new type
    pub async fn toggle_header(&self, project_id: &str, block_id: &str) -> Result<BlockType> {
        let mut project = self.store.require(project_id).await?;
        if !project.toggle_block_type(block_id) {
            return Err(anyhow!("Block {} does not exist or cannot become a header", block_id));
        }
        self.store.save(&project).await?;

        project
            .block(block_id)
            .map(|b| b.block_type)
            .ok_or_else(|| anyhow!("Block {} disappeared", block_id))
    }

    pub async fn bookmark(&self, project_id: &str, block_id: &str) -> Result<()> {
        let mut project = self.store.require(project_id).await?;
        if !project.set_bookmark(block_id) {
            return Err(anyhow!("Block {} does not exist", block_id));
        }
        self.store.save(&project).await?;
        Ok(())
    }

    pub async fn delete(&self, project_id: &str) -> Result<bool> {
        Ok(self.store.delete(project_id).await?)
    }

    pub async fn export_backup(&self, path: &Path) -> Result<usize> {
        Ok(session::export_backup(self.store.as_ref(), path).await?)
    }

    pub async fn import_backup(&self, path: &Path) -> Result<ImportReport> {
        Ok(session::import_backup(self.store.as_ref(), path).await?)
    }

    /// Directory receiving autosave files
    fn backup_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.config.autosave.backup_dir {
            return Ok(dir.clone());
        }
        let db_path = match &self.config.database_path {
            Some(path) => path.clone(),
            None => DatabaseConnection::default_database_path()?,
        };
        Ok(db_path
            .parent()
            .map(|p| p.join("backups"))
            .unwrap_or_else(|| PathBuf::from("backups")))
    }

    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
