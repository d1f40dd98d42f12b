//! dashsync serve command implementation

use std::sync::Arc;

use crate::cli::SessionOptions;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::server::{self, ApiStore};

/// Options for the serve command
pub struct ServeOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub session: SessionOptions,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct ServeReport {
    address: String,
    sheets: usize,
    tasks: usize,
}

pub async fn run(options: ServeOptions) -> Result<()> {
    let config = options.session.resolve_config()?;
    let host = options.host.unwrap_or(config.server.host);
    let port = options.port.unwrap_or(config.server.port);

    let listener = server::bind(&host, port).await?;
    let address = listener.local_addr()?;
    let store = Arc::new(ApiStore::seeded());
    let counts = store.counts();

    let report = ServeReport {
        address: address.to_string(),
        sheets: counts.sheets,
        tasks: counts.tasks,
    };

    let mut human = HumanOutput::new(format!("dashsync serve: listening on http://{address}"));
    human.push_summary("sheets", counts.sheets.to_string());
    human.push_summary("tasks", counts.tasks.to_string());
    human.push_detail(format!("health: http://{address}/api/health"));
    human.push_next_step("press Ctrl-C to stop");

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "serve",
        &report,
        Some(&human),
    )?;

    server::serve(listener, store, shutdown_signal()).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(err) => {
            tracing::warn!("cannot listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    }
}
