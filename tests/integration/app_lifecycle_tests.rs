/*!
 * Full app lifecycle tests
 *
 * Drive the controller through import, translate, refine, refresh and
 * backups against an on-disk SQLite database.
 */

use std::sync::Arc;

use fictrans::app_config::Config;
use fictrans::app_controller::{Controller, RefreshReport};
use fictrans::database::{DatabaseConnection, ProjectRepository, ProjectStore};
use fictrans::errors::ProviderError;
use fictrans::project::BlockType;
use fictrans::providers::Backend;
use fictrans::translation::{RefineOutcome, StopHandle};

use crate::common;
use crate::common::mock_clients::ScriptedClient;

fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config {
        target_language: "fr".to_string(),
        model: "test-model".to_string(),
        database_path: Some(dir.join("fictrans.db")),
        ..Config::default()
    };
    config.retry.base_delay_ms = 1;
    config.retry.max_jitter_ms = 0;
    config
}

fn controller(dir: &std::path::Path, client: ScriptedClient) -> Controller {
    let config = test_config(dir);
    let db = DatabaseConnection::new(dir.join("fictrans.db")).unwrap();
    Controller::with_parts(config, Arc::new(ProjectRepository::new(db)), Arc::new(client))
}

#[tokio::test]
async fn test_lifecycle_importTranslateRefineRefresh_shouldKeepUserWork() {
    let dir = common::create_temp_dir().unwrap();
    let source = common::create_test_file(dir.path(), "flood.md", common::sample_document()).unwrap();
    let client = ScriptedClient::new();
    let controller = controller(dir.path(), client.clone());

    let project = controller.import(&source).await.unwrap();
    assert_eq!(project.metadata.fandom, "Scripted Fandom");
    assert_eq!(project.chapter_count(), 2);

    let outcome = controller.run_translation(&project.id, &StopHandle::new(), None).await.unwrap();
    assert!(outcome.is_completed());
    assert_eq!(outcome.progress().percent, 100);
    assert_eq!(client.calls().iter().map(|c| c.texts.len()).sum::<usize>(), 7);

    let paragraph = project.blocks[2].id.clone();
    let refined = controller.refine(&project.id, &paragraph, "keep it short").await.unwrap();
    assert_eq!(
        refined,
        RefineOutcome::Refined { text: "[fr] Mira counted the drops on the window. (refined)".to_string() }
    );

    // Insert a paragraph in the second version of the work
    let updated = common::sample_document().replace(
        "Mira packed the letters first.",
        "Mira packed the letters first.\n\nThen she waited.",
    );
    let source_v2 = common::create_test_file(dir.path(), "flood-v2.md", &updated).unwrap();
    let report = controller.refresh(&project.id, &source_v2, false).await.unwrap();
    assert!(matches!(report, RefreshReport::Applied { blocks: 9, .. }));

    let stored = controller.store().require(&project.id).await.unwrap();
    assert_eq!(stored.blocks.len(), 9);
    assert!(stored.blocks[2].is_edited);
    assert!(stored.blocks[2].translated.ends_with("(refined)"));
    assert!(stored.blocks[8].translated.is_empty());

    // Only the new paragraph is sent on the next run
    let before = client.call_count();
    controller.run_translation(&project.id, &StopHandle::new(), None).await.unwrap();
    let calls = client.calls();
    assert_eq!(calls.len(), before + 1);
    assert_eq!(calls.last().unwrap().texts, vec!["Then she waited.".to_string()]);
}

#[tokio::test]
async fn test_lifecycle_refineFailure_shouldKeepTranslationAndReportFallback() {
    let dir = common::create_temp_dir().unwrap();
    let source = common::create_test_file(dir.path(), "fic.txt", "One.\n\nTwo.").unwrap();
    let client = ScriptedClient::new();
    let controller = controller(dir.path(), client.clone());

    let project = controller.import(&source).await.unwrap();
    controller.run_translation(&project.id, &StopHandle::new(), None).await.unwrap();

    client.set_refine_result(Err(ProviderError::ConnectionError("reset".into())));
    let block_id = project.blocks[0].id.clone();
    let outcome = controller.refine(&project.id, &block_id, "warmer").await.unwrap();

    assert!(matches!(outcome, RefineOutcome::FellBack { .. }));
    let stored = controller.store().require(&project.id).await.unwrap();
    assert_eq!(stored.blocks[0].translated, "[fr] One.");
    assert!(!stored.blocks[0].is_loading);
    assert!(!stored.blocks[0].is_edited);
}

#[tokio::test]
async fn test_lifecycle_headerBookmarkDelete_shouldPersist() {
    let dir = common::create_temp_dir().unwrap();
    let source = common::create_test_file(dir.path(), "fic.txt", "A.\n\nB.\n\nC.").unwrap();
    let controller = controller(dir.path(), ScriptedClient::new());

    let project = controller.import(&source).await.unwrap();
    let middle = project.blocks[1].id.clone();

    assert_eq!(controller.toggle_header(&project.id, &middle).await.unwrap(), BlockType::Header);
    controller.bookmark(&project.id, &middle).await.unwrap();

    let status = controller.status(&project.id).await.unwrap();
    assert_eq!(status.chapters, 2);
    assert_eq!(status.bookmark, Some((1, 1)));

    assert_eq!(controller.list().await.unwrap().len(), 1);
    assert!(controller.delete(&project.id).await.unwrap());
    assert!(controller.list().await.unwrap().is_empty());
    assert!(controller.status(&project.id).await.is_err());
}

#[tokio::test]
async fn test_lifecycle_backupRoundTrip_shouldRestoreIntoFreshDatabase() {
    let dir = common::create_temp_dir().unwrap();
    let source = common::create_test_file(dir.path(), "fic.txt", "A.\n\nB.").unwrap();
    let backup = dir.path().join("backup.json");

    let first = controller(dir.path(), ScriptedClient::new());
    let project = first.import(&source).await.unwrap();
    assert_eq!(first.export_backup(&backup).await.unwrap(), 1);

    let other_dir = common::create_temp_dir().unwrap();
    let second = controller(other_dir.path(), ScriptedClient::new());
    let report = second.import_backup(&backup).await.unwrap();
    assert_eq!(report.imported, 1);
    assert_eq!(second.status(&project.id).await.unwrap().title, "fic");

    let again = second.import_backup(&backup).await.unwrap();
    assert_eq!((again.imported, again.skipped), (0, 1));
}

#[tokio::test]
async fn test_controller_withConfig_shouldOpenConfiguredDatabase() {
    let dir = common::create_temp_dir().unwrap();
    let mut config = test_config(dir.path());
    config.translation.backend = Backend::Mock;

    let controller = Controller::with_config(config).unwrap();
    let source = common::create_test_file(dir.path(), "fic.txt", "Hello.").unwrap();
    let project = controller.import(&source).await.unwrap();
    assert_eq!(project.metadata.fandom, "Mock Fandom");

    let outcome = controller.run_translation(&project.id, &StopHandle::new(), None).await.unwrap();
    assert!(outcome.is_completed());
    assert!(dir.path().join("fictrans.db").exists());

    let stored = controller.store().require(&project.id).await.unwrap();
    assert_eq!(stored.blocks[0].translated, "[fr] Hello.");
}
