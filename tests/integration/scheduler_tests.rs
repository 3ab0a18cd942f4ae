/*!
 * Scheduler runs against scripted and mock clients.
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::unbounded_channel;

use fictrans::database::{MemoryProjectStore, ProjectStore, ProjectSummary};
use fictrans::errors::{StoreError, TranslationError};
use fictrans::project::{Block, Project};
use fictrans::providers::mock::MockClient;
use fictrans::session::ProjectLocks;
use fictrans::translation::{BatchScheduler, RetryPolicy, RunOutcome, SchedulerConfig, SchedulerEvent, StopHandle};

use crate::common;
use crate::common::mock_clients::{bad_request, overloaded, Scripted, ScriptedClient};

fn config(batch_size: usize, context_window: usize) -> SchedulerConfig {
    SchedulerConfig::default()
        .with_batch_size(batch_size)
        .with_context_window(context_window)
        .with_retry(RetryPolicy::new(3, 1, 0))
}

fn scheduler<C>(client: C, store: Arc<MemoryProjectStore>, config: SchedulerConfig) -> BatchScheduler
where
    C: fictrans::translation::TranslationClient + 'static,
{
    BatchScheduler::new(Arc::new(client), store, config)
}

fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<SchedulerEvent>) -> Vec<SchedulerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Memory store whose `fail_on`-th save (1-based) reports a full disk
struct DiskFullStore {
    inner: MemoryProjectStore,
    saves: AtomicUsize,
    fail_on: usize,
}

impl DiskFullStore {
    fn failing_on(fail_on: usize) -> Self {
        Self {
            inner: MemoryProjectStore::new(),
            saves: AtomicUsize::new(0),
            fail_on,
        }
    }
}

#[async_trait]
impl ProjectStore for DiskFullStore {
    async fn save(&self, project: &Project) -> Result<(), StoreError> {
        if self.saves.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
            return Err(StoreError::Database("disk full".into()));
        }
        self.inner.save(project).await
    }

    async fn load(&self, project_id: &str) -> Result<Option<Project>, StoreError> {
        self.inner.load(project_id).await
    }

    async fn list(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        self.inner.list().await
    }

    async fn delete(&self, project_id: &str) -> Result<bool, StoreError> {
        self.inner.delete(project_id).await
    }
}

#[tokio::test]
async fn test_run_tenBlocksBatchThreeContextTwo_shouldSlideContext() {
    let client = ScriptedClient::new();
    let store = Arc::new(MemoryProjectStore::new());
    let mut project = common::text_project(10);
    let (tx, mut rx) = unbounded_channel();

    let outcome = scheduler(client.clone(), store, config(3, 2))
        .run(&mut project, &StopHandle::new(), Some(&tx))
        .await
        .unwrap();

    assert!(outcome.is_completed());

    let calls = client.calls();
    let sizes: Vec<usize> = calls.iter().map(|c| c.texts.len()).collect();
    assert_eq!(sizes, vec![3, 3, 3, 1]);
    assert_eq!(calls[0].options.previous_context, "");
    assert_eq!(calls[1].options.previous_context, "b1\nb2");
    assert_eq!(calls[2].options.previous_context, "b4\nb5");
    assert_eq!(calls[3].options.previous_context, "b7\nb8");

    let events = drain(&mut rx);
    let first_completed = events
        .iter()
        .find_map(|e| match e {
            SchedulerEvent::WindowCompleted { context, .. } => Some(context.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(first_completed, vec!["b1".to_string(), "b2".to_string()]);

    for event in &events {
        if let SchedulerEvent::WindowCompleted { context, .. } = event {
            assert!(context.len() <= 2);
        }
    }
    assert!(matches!(events.last(), Some(SchedulerEvent::Completed { progress }) if progress.translated == 10));
}

#[tokio::test]
async fn test_run_eventsPerWindow_shouldBeLoadingThenCompleted() {
    let store = Arc::new(MemoryProjectStore::new());
    let mut project = common::text_project(4);
    let (tx, mut rx) = unbounded_channel();

    scheduler(ScriptedClient::new(), store, config(2, 2))
        .run(&mut project, &StopHandle::new(), Some(&tx))
        .await
        .unwrap();

    let events = drain(&mut rx);
    assert_eq!(events.len(), 5);

    match &events[0] {
        SchedulerEvent::Loading { window, snapshot } => {
            assert_eq!(window.index, 0);
            assert_eq!(window.count, 2);
            assert!(snapshot[0].is_loading && snapshot[1].is_loading);
            assert!(!snapshot[2].is_loading);
        }
        other => panic!("unexpected first event: {:?}", other),
    }
    match &events[1] {
        SchedulerEvent::WindowCompleted { snapshot, progress, .. } => {
            assert_eq!(snapshot[0].translated, "[fr] b0");
            assert!(!snapshot[0].is_loading);
            assert_eq!(progress.translated, 2);
        }
        other => panic!("unexpected second event: {:?}", other),
    }
    assert!(matches!(events[4], SchedulerEvent::Completed { .. }));
}

#[tokio::test]
async fn test_run_everythingTranslated_shouldMakeNoCalls() {
    let client = ScriptedClient::new();
    let store = Arc::new(MemoryProjectStore::new());
    let blocks = (0..7).map(|i| Block::text(format!("b{}", i)).with_translation("done")).collect();
    let mut project = common::project_from_blocks(blocks);
    let (tx, mut rx) = unbounded_channel();

    let outcome = scheduler(client.clone(), store, config(3, 2))
        .run(&mut project, &StopHandle::new(), Some(&tx))
        .await
        .unwrap();

    assert!(outcome.is_completed());
    assert_eq!(client.call_count(), 0);
    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn test_run_separatorsAndHeaders_shouldOnlySendPendingText() {
    let client = ScriptedClient::new();
    let store = Arc::new(MemoryProjectStore::new());
    let mut project = common::project_from_blocks(vec![
        Block::header("Chapter 1"),
        Block::text("a"),
        Block::separator(),
        Block::text("b").with_translation("B"),
    ]);

    scheduler(client.clone(), store, config(10, 2))
        .run(&mut project, &StopHandle::new(), None)
        .await
        .unwrap();

    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].texts, vec!["Chapter 1".to_string(), "a".to_string()]);
    assert_eq!(project.blocks[2].translated, "---");
    assert_eq!(project.blocks[3].translated, "B");
}

#[tokio::test]
async fn test_run_transient503_shouldRetryAndComplete() {
    let client = ScriptedClient::with_script(vec![Scripted::Fail(overloaded()), Scripted::Fail(overloaded())]);
    let store = Arc::new(MemoryProjectStore::new());
    let mut project = common::text_project(2);

    let outcome = scheduler(client.clone(), store, config(5, 2))
        .run(&mut project, &StopHandle::new(), None)
        .await
        .unwrap();

    assert!(outcome.is_completed());
    assert_eq!(client.call_count(), 3);
    assert_eq!(project.blocks[1].translated, "[fr] b1");
}

#[tokio::test]
async fn test_run_persistent503_shouldFailWithExhaustedRetries() {
    let store = Arc::new(MemoryProjectStore::new());
    let mut project = common::text_project(4);
    let client = MockClient::failing();
    let (tx, mut rx) = unbounded_channel();

    let outcome = scheduler(client.clone(), Arc::clone(&store), config(2, 2))
        .run(&mut project, &StopHandle::new(), Some(&tx))
        .await
        .unwrap();

    match outcome {
        RunOutcome::Failed { error: TranslationError::RetriesExhausted { attempts, .. }, progress } => {
            assert_eq!(attempts, 3);
            assert_eq!(progress.translated, 0);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(client.call_count(), 3);
    assert!(project.blocks.iter().all(|b| !b.is_loading));
    assert!(matches!(drain(&mut rx).last(), Some(SchedulerEvent::Failed { .. })));
}

#[tokio::test]
async fn test_run_failureMidway_shouldKeepEarlierWindowsAndResume() {
    let store = Arc::new(MemoryProjectStore::new());
    let mut project = common::text_project(10);
    let client = ScriptedClient::with_script(vec![Scripted::Echo, Scripted::Fail(bad_request())]);

    let outcome = scheduler(client.clone(), Arc::clone(&store), config(3, 2))
        .run(&mut project, &StopHandle::new(), None)
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Failed { error: TranslationError::Permanent(_), .. }));
    assert_eq!(client.call_count(), 2);

    let stored = store.require(&project.id).await.unwrap();
    assert_eq!(stored.progress().translated, 3);
    assert!(stored.blocks[3..6].iter().all(|b| b.translated.is_empty() && !b.is_loading));

    let resumed_client = ScriptedClient::new();
    let mut reloaded = stored;
    let outcome = scheduler(resumed_client.clone(), Arc::clone(&store), config(3, 2))
        .run(&mut reloaded, &StopHandle::new(), None)
        .await
        .unwrap();

    assert!(outcome.is_completed());
    let calls = resumed_client.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].texts, vec!["b3", "b4", "b5"]);
    assert_eq!(calls[0].options.previous_context, "b1\nb2");
    assert_eq!(reloaded.progress().translated, 10);
}

#[tokio::test]
async fn test_run_lengthMismatch_shouldFailWithoutWriting() {
    let store = Arc::new(MemoryProjectStore::new());
    let mut project = common::text_project(3);
    let client = ScriptedClient::with_script(vec![Scripted::Texts(vec!["only one".into()])]);

    let outcome = scheduler(client, store, config(3, 2))
        .run(&mut project, &StopHandle::new(), None)
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        RunOutcome::Failed { error: TranslationError::LengthMismatch { expected: 3, actual: 1 }, .. }
    ));
    assert!(project.blocks.iter().all(|b| b.translated.is_empty()));
}

#[tokio::test]
async fn test_run_stopRequestedBeforeStart_shouldStopBeforeFirstWindowAndReset() {
    let client = ScriptedClient::new();
    let store = Arc::new(MemoryProjectStore::new());
    let mut project = common::text_project(6);
    let stop = StopHandle::new();
    stop.request_stop();
    let (tx, mut rx) = unbounded_channel();

    let scheduler = scheduler(client.clone(), store, config(2, 2));
    let outcome = scheduler.run(&mut project, &stop, Some(&tx)).await.unwrap();

    assert!(matches!(outcome, RunOutcome::Stopped(progress) if progress.translated == 0));
    assert_eq!(client.call_count(), 0);
    assert!(!stop.is_requested());
    assert!(matches!(drain(&mut rx).as_slice(), [SchedulerEvent::Stopped { .. }]));

    let outcome = scheduler.run(&mut project, &stop, None).await.unwrap();
    assert!(outcome.is_completed());
}

#[tokio::test]
async fn test_run_stopDuringWindow_shouldFinishCurrentWindowOnly() {
    let client = ScriptedClient::new().with_delay(Duration::from_millis(50));
    let store = Arc::new(MemoryProjectStore::new());
    let project = common::text_project(6);
    let stop = StopHandle::new();

    let scheduler = Arc::new(scheduler(client.clone(), store, config(2, 2)));
    let task = {
        let scheduler = Arc::clone(&scheduler);
        let stop = stop.clone();
        tokio::spawn(async move {
            let mut project = project;
            let outcome = scheduler.run(&mut project, &stop, None).await;
            (outcome, project)
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    stop.request_stop();
    let (outcome, project) = task.await.unwrap();

    assert!(matches!(outcome.unwrap(), RunOutcome::Stopped(progress) if progress.translated == 2));
    assert_eq!(client.call_count(), 1);
    assert!(project.blocks[2..].iter().all(|b| b.translated.is_empty()));
}

#[tokio::test]
async fn test_run_concurrentRunsOnSameProject_shouldFailFastWithBusy() {
    let client = ScriptedClient::new().with_delay(Duration::from_millis(100));
    let store = Arc::new(MemoryProjectStore::new());
    let locks = ProjectLocks::new();
    let project = common::text_project(2);
    let mut copy: Project = project.clone();

    let first = BatchScheduler::new(Arc::new(client.clone()), store.clone(), config(5, 2)).with_locks(locks.clone());
    let second = BatchScheduler::new(Arc::new(client.clone()), store.clone(), config(5, 2)).with_locks(locks.clone());

    let running = tokio::spawn(async move {
        let mut project = project;
        first.run(&mut project, &StopHandle::new(), None).await
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let result = second.run(&mut copy, &StopHandle::new(), None).await;
    assert!(matches!(result, Err(TranslationError::ProjectBusy(id)) if id == copy.id));

    assert!(running.await.unwrap().unwrap().is_completed());
    assert!(!locks.is_locked(&copy.id));

    let mut other = common::text_project(1);
    let third = BatchScheduler::new(Arc::new(client), store, config(5, 2)).with_locks(locks.clone());
    assert!(third.run(&mut other, &StopHandle::new(), None).await.unwrap().is_completed());
    assert_eq!(locks.held_count(), 0);
}

#[tokio::test]
async fn test_run_missingModel_shouldReturnConfigurationError() {
    let client = ScriptedClient::new();
    let store = Arc::new(MemoryProjectStore::new());
    let mut project = common::text_project(2);
    project.metadata.model.clear();

    let result = scheduler(client.clone(), store, config(5, 2))
        .run(&mut project, &StopHandle::new(), None)
        .await;

    assert!(matches!(result, Err(TranslationError::Configuration(_))));
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_run_tagsAndGlossary_shouldReachClient() {
    let client = ScriptedClient::new();
    let store = Arc::new(MemoryProjectStore::new());
    let mut project = common::text_project(1);
    project.metadata.tags = vec!["fluff".into()];
    project.metadata.glossary = "Mira = Mira".into();

    scheduler(client.clone(), store.clone(), config(5, 2))
        .run(&mut project, &StopHandle::new(), None)
        .await
        .unwrap();
    assert_eq!(client.calls()[0].options.tags, vec!["fluff".to_string()]);
    assert_eq!(client.calls()[0].options.glossary, "Mira = Mira");
    assert_eq!(client.calls()[0].options.model, "test-model");

    let client = ScriptedClient::new();
    let mut project = common::text_project(1);
    project.metadata.tags = vec!["fluff".into()];
    project.metadata.include_tags = false;
    scheduler(client.clone(), store, config(5, 2))
        .run(&mut project, &StopHandle::new(), None)
        .await
        .unwrap();
    assert!(client.calls()[0].options.tags.is_empty());
}

#[tokio::test]
async fn test_run_saveFailsAfterWindow_shouldEndStreamWithFailed() {
    let client = ScriptedClient::new();
    let store = Arc::new(DiskFullStore::failing_on(2));
    let mut project = common::text_project(9);
    let (tx, mut rx) = unbounded_channel();

    let result = BatchScheduler::new(Arc::new(client.clone()), store, config(3, 2))
        .run(&mut project, &StopHandle::new(), Some(&tx))
        .await;

    assert!(matches!(result, Err(TranslationError::Storage(StoreError::Database(_)))));
    assert_eq!(client.call_count(), 2);
    assert!(project.blocks.iter().all(|b| !b.is_loading));

    let events = drain(&mut rx);
    match events.last() {
        Some(SchedulerEvent::Failed { error, progress }) => {
            assert!(matches!(error, TranslationError::Storage(_)));
            assert_eq!(progress.translated, 6);
        }
        other => panic!("expected a final Failed event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_run_rollbackSaveFails_shouldKeepBackendError() {
    let client = ScriptedClient::with_script(vec![Scripted::Echo, Scripted::Fail(bad_request())]);
    let store = Arc::new(DiskFullStore::failing_on(2));
    let mut project = common::text_project(6);
    let (tx, mut rx) = unbounded_channel();

    let outcome = BatchScheduler::new(Arc::new(client), store.clone(), config(3, 0))
        .run(&mut project, &StopHandle::new(), Some(&tx))
        .await
        .unwrap();

    match outcome {
        RunOutcome::Failed { error: TranslationError::Permanent(source), progress } => {
            assert_eq!(source, bad_request());
            assert_eq!(progress.translated, 3);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(project.blocks[3..].iter().all(|b| !b.is_loading && b.translated.is_empty()));
    assert!(matches!(drain(&mut rx).last(), Some(SchedulerEvent::Failed { .. })));

    // The first window's save went through before the disk filled up
    let stored = store.require(&project.id).await.unwrap();
    assert_eq!(stored.progress().translated, 3);
}
