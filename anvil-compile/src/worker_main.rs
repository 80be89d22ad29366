//! Entry point for worker programs

use anvil_config::{ConfigLoader, CONFIG_FILE_ENV};
use anvil_execution::{reject_stdio, serve_stdio, WorkRegistry};
use anvil_logging::{init_logging_from_config, init_simple_tracing};
use anyhow::{Context, Result};
use tracing::{error, info};

/// Serve compile units over stdin/stdout until the coordinator shuts down
///
/// A worker program registers its compilers and hands the registry over:
///
/// ```no_run
/// # use anvil_compile::run_worker;
/// # use anvil_execution::WorkRegistry;
/// # fn register_javac(_: &mut WorkRegistry) {}
/// fn main() -> anyhow::Result<()> {
///     let mut registry = WorkRegistry::new();
///     register_javac(&mut registry);
///     run_worker(registry)
/// }
/// ```
///
/// Configuration comes from the YAML file named by `ANVIL_CONFIG_FILE`, if
/// set, and `ANVIL_*` environment variables, all inherited from the
/// coordinator. Logs go to stderr. A worker that cannot load its
/// configuration answers the coordinator with an initialization failure
/// before exiting.
pub fn run_worker(registry: WorkRegistry) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start worker runtime")?;

    let config = match ConfigLoader::new().load(std::env::var_os(CONFIG_FILE_ENV)) {
        Ok(config) => config,
        Err(e) => {
            init_simple_tracing("info")?;
            error!("Worker {} cannot start: {}", std::process::id(), e);
            if let Err(report) = runtime.block_on(reject_stdio(e.to_string())) {
                error!("Failed to report startup failure: {}", report);
            }
            return Err(e).context("Failed to load worker configuration");
        }
    };
    init_logging_from_config(&config.logging)?;

    info!(
        "Worker {} serving actions: {:?}",
        std::process::id(),
        registry.names()
    );

    runtime
        .block_on(serve_stdio(registry))
        .context("Worker connection failed")?;

    info!("Worker {} shut down", std::process::id());
    Ok(())
}
