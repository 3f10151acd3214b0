pub mod backend;
pub mod commands;
pub mod config;
pub mod expression;
pub mod layout;
pub mod logging;
pub mod models;
pub mod session;
pub mod viz;

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Console entry point. The first argument, if any, is the config file path.
pub fn run() -> Result<(), RunError> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = config::load_config(config_path.as_deref())?;
    logging::init(&config.ui.log_filter);
    tracing::info!(
        base_url = %config.backend.base_url,
        report_type = %config.dataset.report_type,
        report_id = %config.dataset.report_id,
        "configuration loaded"
    );

    // Session state lives in RefCells; everything runs on this one thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(commands::run_console(&config));
    Ok(())
}
