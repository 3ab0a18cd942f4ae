/*!
 * Batch scheduler.
 *
 * Walks a project's blocks in fixed-size windows, strictly one window at a
 * time:
 *
 * - windows with nothing pending only advance the context buffer
 * - pending blocks are marked loading, sent through the retry policy and
 *   written back in order
 * - the project is persisted after every completed window
 * - a permanent failure rolls back the loading flags of the current window
 *   only, persists, and ends the run
 *
 * The stop flag is polled between windows; an in-flight call is never
 * aborted. Every state change is reported as an owned `SchedulerEvent`.
 */

use log::{debug, error, info};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use super::client::{TranslateOptions, TranslationClient};
use super::context_buffer::ContextBuffer;
use super::retry::RetryPolicy;
use crate::database::ProjectStore;
use crate::errors::TranslationError;
use crate::project::{Block, Progress, Project, ProjectMetadata};
use crate::session::ProjectLocks;

/// Default number of blocks per window
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Default upper bound for the window size
pub const DEFAULT_MAX_BATCH_SIZE: usize = 50;

/// Window and retry settings for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Requested window size, clamped to `[1, max_batch_size]` at run time
    pub batch_size: usize,
    /// Upper bound for `batch_size`
    pub max_batch_size: usize,
    /// Context buffer bound, clamped to `[0, 10]`
    pub context_window: usize,
    /// How each window's backend call is retried
    pub retry: RetryPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            context_window: 2,
            retry: RetryPolicy::default(),
        }
    }
}

impl SchedulerConfig {
    /// Take window settings from a project's metadata
    pub fn for_project(metadata: &ProjectMetadata, max_batch_size: usize, retry: RetryPolicy) -> Self {
        Self {
            batch_size: metadata.batch_size,
            max_batch_size,
            context_window: metadata.context_window,
            retry,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_context_window(mut self, context_window: usize) -> Self {
        self.context_window = context_window;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Window size actually used
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, self.max_batch_size.max(1))
    }
}

/// Split `len` blocks into consecutive windows of `batch_size`
pub fn plan_windows(len: usize, batch_size: usize) -> Vec<Range<usize>> {
    let size = batch_size.max(1);
    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}

/// Position of a window within a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    /// 0-based window number
    pub index: usize,
    /// Number of windows in the run
    pub count: usize,
    /// Block positions covered by the window
    pub range: Range<usize>,
    /// Number of blocks sent to the backend
    pub pending: usize,
}

/// State changes reported during a run
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    /// A window's pending blocks were marked loading
    Loading {
        window: WindowInfo,
        snapshot: Vec<Block>,
    },
    /// A window was translated, written back and persisted
    WindowCompleted {
        window: WindowInfo,
        snapshot: Vec<Block>,
        progress: Progress,
        /// Context buffer contents after the window, oldest first
        context: Vec<String>,
    },
    Completed {
        progress: Progress,
    },
    Stopped {
        progress: Progress,
    },
    Failed {
        error: TranslationError,
        progress: Progress,
    },
}

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(Progress),
    Stopped(Progress),
    Failed { error: TranslationError, progress: Progress },
}

impl RunOutcome {
    pub fn progress(&self) -> Progress {
        match self {
            RunOutcome::Completed(progress) | RunOutcome::Stopped(progress) => *progress,
            RunOutcome::Failed { progress, .. } => *progress,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }
}

/// Cooperative stop flag shared between a run and its host
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop before its next window
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Drives translation runs over projects
pub struct BatchScheduler {
    client: Arc<dyn TranslationClient>,
    store: Arc<dyn ProjectStore>,
    locks: ProjectLocks,
    config: SchedulerConfig,
}

impl BatchScheduler {
    pub fn new(
        client: Arc<dyn TranslationClient>,
        store: Arc<dyn ProjectStore>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            client,
            store,
            locks: ProjectLocks::new(),
            config,
        }
    }

    /// Share a lock registry with other schedulers
    pub fn with_locks(mut self, locks: ProjectLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn locks(&self) -> &ProjectLocks {
        &self.locks
    }

    /// Translate every pending block of `project`
    ///
    /// Backend failures end the run with `RunOutcome::Failed`. Configuration
    /// and lock failures are returned as errors before any event is sent; a
    /// storage failure is returned as an error after a final `Failed` event.
    pub async fn run(
        &self,
        project: &mut Project,
        stop: &StopHandle,
        events: Option<&UnboundedSender<SchedulerEvent>>,
    ) -> Result<RunOutcome, TranslationError> {
        check_configuration(&project.metadata)?;
        let _guard = self.locks.try_acquire(&project.id)?;

        let result = self.run_windows(project, stop, events).await;
        stop.reset();

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(error) => {
                // Storage failed mid-run: the stream still has to end
                for block in project.blocks.iter_mut() {
                    block.is_loading = false;
                }
                error!("Translation of '{}' aborted: {}", project.metadata.title, error);
                emit(events, SchedulerEvent::Failed {
                    error: error.clone(),
                    progress: project.progress(),
                });
                return Err(error);
            }
        };
        let event = match &outcome {
            RunOutcome::Completed(progress) => {
                info!("Translation of '{}' completed: {}", project.metadata.title, progress);
                SchedulerEvent::Completed { progress: *progress }
            }
            RunOutcome::Stopped(progress) => {
                info!("Translation of '{}' stopped: {}", project.metadata.title, progress);
                SchedulerEvent::Stopped { progress: *progress }
            }
            RunOutcome::Failed { error, progress } => {
                error!("Translation of '{}' failed: {}", project.metadata.title, error);
                SchedulerEvent::Failed { error: error.clone(), progress: *progress }
            }
        };
        emit(events, event);

        Ok(outcome)
    }

    async fn run_windows(
        &self,
        project: &mut Project,
        stop: &StopHandle,
        events: Option<&UnboundedSender<SchedulerEvent>>,
    ) -> Result<RunOutcome, TranslationError> {
        let batch_size = self.config.effective_batch_size();
        let windows = plan_windows(project.blocks.len(), batch_size);
        let mut context = ContextBuffer::bootstrap(self.config.context_window, &project.blocks);

        info!(
            "Translating '{}' with {}: {} blocks in {} windows of {}",
            project.metadata.title,
            self.client.name(),
            project.blocks.len(),
            windows.len(),
            batch_size
        );

        for (index, range) in windows.iter().enumerate() {
            if stop.is_requested() {
                return Ok(RunOutcome::Stopped(project.progress()));
            }

            let pending: Vec<usize> = range
                .clone()
                .filter(|&i| project.blocks[i].needs_translation())
                .collect();

            if pending.is_empty() {
                debug!("Window {}/{} has nothing pending, skipping", index + 1, windows.len());
                context.extend(
                    project.blocks[range.clone()]
                        .iter()
                        .filter(|b| b.is_translated())
                        .map(|b| b.original.as_str()),
                );
                continue;
            }

            let window = WindowInfo {
                index,
                count: windows.len(),
                range: range.clone(),
                pending: pending.len(),
            };
            debug!(
                "Window {}/{}: blocks {}..{}, {} pending",
                index + 1,
                windows.len(),
                range.start,
                range.end,
                pending.len()
            );

            for &i in &pending {
                project.blocks[i].is_loading = true;
            }
            emit(events, SchedulerEvent::Loading {
                window: window.clone(),
                snapshot: project.blocks.clone(),
            });

            let texts: Vec<String> = pending.iter().map(|&i| project.blocks[i].original.clone()).collect();
            let options = build_options(&project.metadata, &context);

            match self.translate_window(&texts, &project.metadata, &options).await {
                Ok(translations) => {
                    for (&i, translated) in pending.iter().zip(translations) {
                        let block = &mut project.blocks[i];
                        block.translated = translated;
                        block.is_loading = false;
                    }
                    context.extend(project.blocks[range.clone()].iter().map(|b| b.original.as_str()));
                    project.touch();
                    self.store.save(project).await?;

                    emit(events, SchedulerEvent::WindowCompleted {
                        window,
                        snapshot: project.blocks.clone(),
                        progress: project.progress(),
                        context: context.entries().map(str::to_string).collect(),
                    });
                }
                Err(error) => {
                    for &i in &pending {
                        project.blocks[i].is_loading = false;
                    }
                    project.touch();
                    if let Err(save_error) = self.store.save(project).await {
                        error!("Could not persist rollback of window {}: {}", index + 1, save_error);
                    }

                    return Ok(RunOutcome::Failed {
                        error,
                        progress: project.progress(),
                    });
                }
            }
        }

        Ok(RunOutcome::Completed(project.progress()))
    }

    async fn translate_window(
        &self,
        texts: &[String],
        metadata: &ProjectMetadata,
        options: &TranslateOptions,
    ) -> Result<Vec<String>, TranslationError> {
        let client = &self.client;
        let translations = self
            .config
            .retry
            .call("Batch translation", move || {
                client.translate_batch(texts, &metadata.target_language, &metadata.fandom, options)
            })
            .await?;

        if translations.len() != texts.len() {
            return Err(TranslationError::LengthMismatch {
                expected: texts.len(),
                actual: translations.len(),
            });
        }

        Ok(translations)
    }
}

/// Reject runs that cannot possibly succeed
pub fn check_configuration(metadata: &ProjectMetadata) -> Result<(), TranslationError> {
    if metadata.model.trim().is_empty() {
        return Err(TranslationError::Configuration("no model id configured".into()));
    }
    if metadata.target_language.trim().is_empty() {
        return Err(TranslationError::Configuration("no target language configured".into()));
    }
    Ok(())
}

/// Bundle the per-call options from project settings and context
pub fn build_options(metadata: &ProjectMetadata, context: &ContextBuffer) -> TranslateOptions {
    let tags = if metadata.include_tags {
        metadata.tags.clone()
    } else {
        Vec::new()
    };

    TranslateOptions {
        model: metadata.model.clone(),
        custom_prompt: metadata.custom_prompt.clone(),
        previous_context: context.joined(),
        tags,
        tag_instruction: metadata.tag_instruction.clone(),
        glossary: metadata.glossary.clone(),
    }
}

fn emit(events: Option<&UnboundedSender<SchedulerEvent>>, event: SchedulerEvent) {
    if let Some(sender) = events {
        // A dropped receiver only means nobody is watching
        let _ = sender.send(event);
    }
}
