//! dashsync status command implementation
//!
//! Runs the startup protocol and summarizes where each collection came from.

use std::path::PathBuf;

use crate::cli::SessionOptions;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::sync::CollectionReport;
use crate::view::DashboardStats;

/// Options for the status command
pub struct StatusOptions {
    pub session: SessionOptions,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct StatusReport {
    connected: bool,
    api_url: String,
    data_dir: PathBuf,
    sheets: CollectionReport,
    tasks: CollectionReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    reconciled: Option<bool>,
    stats: DashboardStats,
}

pub async fn run(options: StatusOptions) -> Result<()> {
    let session = options.session.open().await?;
    let load = &session.report;

    let report = StatusReport {
        connected: load.connected,
        api_url: session.config.remote.base_url.clone(),
        data_dir: session.config.data_dir(),
        sheets: load.sheets,
        tasks: load.tasks,
        reconciled: load.reconciled,
        stats: session.sync.stats(),
    };

    let mut human = HumanOutput::new("dashsync status");
    human.push_summary(
        "remote",
        if report.connected {
            format!("connected ({})", report.api_url)
        } else {
            format!("disconnected ({})", report.api_url)
        },
    );
    human.push_summary("data dir", report.data_dir.display().to_string());
    human.push_summary(
        "sheets",
        format!("{} from {}", report.sheets.count, report.sheets.source.as_str()),
    );
    human.push_summary(
        "tasks",
        format!("{} from {}", report.tasks.count, report.tasks.source.as_str()),
    );
    human.push_detail(format!(
        "tasks: {} completed, {} pending, {} pinned",
        report.stats.completed_tasks, report.stats.pending_tasks, report.stats.pinned_tasks
    ));
    human.push_detail(format!("pinned sheets: {}", report.stats.pinned_sheets));

    if report.reconciled == Some(false) {
        human.push_warning("could not push loaded data back to the remote");
    }
    if !report.connected {
        human.push_next_step("dashsync serve");
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "status",
        &report,
        Some(&human),
    )?;

    Ok(())
}
