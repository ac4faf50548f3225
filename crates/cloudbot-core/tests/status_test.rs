mod common;

use cloudbot_cloud::fake::Operation;
use cloudbot_cloud::{ImageRecord, ImageType, ServerStatus};
use cloudbot_core::WorkflowError;
use common::{nub_fleet, orchestrator, settings};
use std::sync::Arc;

#[tokio::test]
async fn test_status_rows_match_provider() {
    let provider = Arc::new(
        nub_fleet()
            .with_server(2, "box", ServerStatus::Off)
            .with_snapshot(300, "box-01-01", None)
            .with_image(ImageRecord {
                id: 400,
                description: "ubuntu-24.04".to_string(),
                size_bytes: None,
                created_at: None,
                image_type: ImageType::System,
            }),
    );
    let orchestrator = orchestrator(Arc::clone(&provider), settings());

    let report = orchestrator.status().await.unwrap();
    assert_eq!(report.servers.len(), 2);
    // system images are not part of the report
    assert_eq!(report.images.len(), 2);
    assert_eq!(report.servers[1].status, "off");
    assert_eq!(report.images[0].size, "20.00 GB");
    assert_eq!(report.images[1].created, "");
    assert!(provider.mutations().is_empty());
}

#[tokio::test]
async fn test_status_read_failure_is_one_error() {
    let provider = Arc::new(nub_fleet());
    provider.fail(Operation::ListImages, "unavailable", "service unavailable");
    let orchestrator = orchestrator(Arc::clone(&provider), settings());

    let err = orchestrator.status().await.unwrap_err();
    assert!(matches!(err, WorkflowError::Provider(_)));
    assert_eq!(err.to_string(), "provider error: service unavailable");
}

#[tokio::test]
async fn test_status_ignores_leases() {
    let provider = Arc::new(nub_fleet());
    let orchestrator = orchestrator(Arc::clone(&provider), settings());

    let _lease = orchestrator.leases().try_acquire("nub").unwrap();
    let report = orchestrator.status().await.unwrap();
    assert_eq!(report.servers[0].name, "nub");
}
