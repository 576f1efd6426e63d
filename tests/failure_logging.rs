//! A failing worker leaves the single error report to the caller.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{write_file, Behavior, RecordingService};
use heat_engine::config::ConfigLoader;
use heat_engine::lifecycle::{Bootstrap, Service, ServiceError, Shutdown, StartupError};
use heat_engine::observability::logging;
use tempfile::TempDir;

#[tokio::test]
async fn test_service_failure_is_not_logged_as_error_by_library() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("failure.log");
    let config_path = write_file(
        dir.path(),
        "worker.toml",
        &format!(
            "host = \"node-b\"\n\n[logging]\nsink = \"file\"\nfile = \"{}\"\n",
            log_path.display()
        ),
    );

    let bootstrap =
        Bootstrap::new("heat-engine", "heat").with_loader(ConfigLoader::with_search_dirs(Vec::new()));
    let argv = vec![
        "heat-engine".to_string(),
        "--config-file".to_string(),
        config_path.display().to_string(),
    ];

    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        bootstrap.run(argv, Shutdown::new(), |_, _, _| {
            let service: Arc<dyn Service> = RecordingService::new("broken", Behavior::FailStart);
            service
        }),
    )
    .await
    .expect("bootstrap should return");

    assert!(matches!(
        outcome,
        Err(StartupError::Service(ServiceError::Start { .. }))
    ));

    logging::flush();
    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("Service exited"), "log was:\n{log}");
    for line in log.lines() {
        assert!(!line.contains("ERROR"), "unexpected error record: {line}");
        assert!(!line.contains("WARN"), "unexpected warning record: {line}");
    }
}
