//! heat-engine: orchestration engine worker.
//!
//! Installs the runtime, then hands control to [`Bootstrap`] until a
//! termination signal arrives or the worker exits.

use std::process::ExitCode;
use std::sync::Arc;

use heat_engine::config::ConfigError;
use heat_engine::lifecycle::{runtime, signals, PROCESS_NAME, PROJECT_NAME};
use heat_engine::observability::logging;
use heat_engine::{Bootstrap, EngineService, Service, Shutdown, StartupError};

fn main() -> ExitCode {
    let runtime = match runtime::install() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{PROCESS_NAME}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(async {
        let shutdown = Shutdown::new();
        let signals = signals::spawn_signal_listener(shutdown.clone());

        let outcome = Bootstrap::new(PROCESS_NAME, PROJECT_NAME)
            .run(std::env::args_os(), shutdown, |config, identity, database| {
                let service: Arc<dyn Service> = Arc::new(EngineService::new(
                    identity,
                    database,
                    config.engine.clone(),
                ));
                service
            })
            .await;

        signals.abort();
        outcome
    });

    let code = match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(StartupError::Configuration(ConfigError::Usage(e))) => {
            // --help and --version land here too.
            let _ = e.print();
            if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            if logging::is_initialized() {
                tracing::error!(error = %e, "Engine worker failed");
            } else {
                eprintln!("{PROCESS_NAME}: {e}");
            }
            ExitCode::FAILURE
        }
    };

    logging::flush();
    code
}
