//! dashsync sheet command implementations

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::{describe_push, not_found, read_import, SessionOptions};
use crate::error::Result;
use crate::model::{CollectionKind, NewSheet, RecordId, SheetLink, SheetPatch, SheetStatus};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::source::SourceKind;
use crate::sync::PushOutcome;
use crate::view::SheetFilter;

/// Options for `dashsync sheet list`
pub struct ListOptions {
    pub search: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub session: SessionOptions,
    pub json: bool,
    pub quiet: bool,
}

/// Options for `dashsync sheet add`
pub struct AddOptions {
    pub title: String,
    pub url: String,
    pub status: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub pinned: bool,
    pub session: SessionOptions,
    pub json: bool,
    pub quiet: bool,
}

/// Options for `dashsync sheet update`
pub struct UpdateOptions {
    pub id: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub pinned: Option<bool>,
    pub session: SessionOptions,
    pub json: bool,
    pub quiet: bool,
}

/// Options for commands addressing one sheet (`rm`, `pin`)
pub struct IdOptions {
    pub id: String,
    pub session: SessionOptions,
    pub json: bool,
    pub quiet: bool,
}

/// Options for `dashsync sheet categories`
pub struct CategoriesOptions {
    pub session: SessionOptions,
    pub json: bool,
    pub quiet: bool,
}

/// Options for `dashsync sheet import`
pub struct ImportOptions {
    pub file: PathBuf,
    pub session: SessionOptions,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
struct ListReport {
    source: SourceKind,
    connected: bool,
    total: usize,
    count: usize,
    sheets: Vec<SheetLink>,
}

#[derive(Serialize)]
struct SheetReport {
    sheet: SheetLink,
    remote: PushOutcome,
}

#[derive(Serialize)]
struct CategoriesReport {
    categories: Vec<String>,
}

#[derive(Serialize)]
struct ImportReport {
    imported: usize,
    dropped: usize,
    remote: PushOutcome,
}

fn output(json: bool, quiet: bool) -> OutputOptions {
    OutputOptions { json, quiet }
}

fn parse_status(value: Option<String>) -> Result<Option<SheetStatus>> {
    value.map(|status| status.parse()).transpose()
}

fn sheet_line(sheet: &SheetLink) -> String {
    let pin = if sheet.pinned { "* " } else { "" };
    format!(
        "[{}] {pin}{} ({}, {}) {}",
        sheet.id, sheet.title, sheet.status, sheet.category, sheet.url
    )
}

fn sheet_human(header: String, sheet: &SheetLink, remote: PushOutcome) -> HumanOutput {
    let mut human = HumanOutput::new(header);
    human.push_summary("id", sheet.id.to_string());
    human.push_summary("title", sheet.title.clone());
    human.push_summary("url", sheet.url.clone());
    human.push_summary("status", sheet.status.as_str());
    human.push_summary("category", sheet.category.clone());
    human.push_summary("pinned", if sheet.pinned { "yes" } else { "no" });
    describe_push(&mut human, remote);
    human
}

pub async fn run_list(options: ListOptions) -> Result<()> {
    let filter = SheetFilter {
        search: options.search,
        status: parse_status(options.status)?,
        category: options.category,
    };
    let session = options.session.open().await?;
    let sheets = session.sync.filtered_sheets(&filter);

    let report = ListReport {
        source: session.report.sheets.source,
        connected: session.report.connected,
        total: session.report.sheets.count,
        count: sheets.len(),
        sheets,
    };

    let mut human = HumanOutput::new(format!(
        "dashsync sheet list: {} of {} sheets",
        report.count, report.total
    ));
    human.push_summary("source", report.source.as_str());
    for sheet in &report.sheets {
        human.push_detail(sheet_line(sheet));
    }
    if !report.connected {
        human.push_warning("remote unreachable; showing local data");
    }

    emit_success(
        output(options.json, options.quiet),
        "sheet list",
        &report,
        Some(&human),
    )
}

pub async fn run_add(options: AddOptions) -> Result<()> {
    let input = NewSheet {
        title: options.title,
        url: options.url,
        status: parse_status(options.status)?,
        category: options.category,
        description: options.description,
        pinned: Some(options.pinned),
    };
    let session = options.session.open().await?;
    let mutation = session.sync.add_sheet(input).await?;

    let human = sheet_human(
        format!("dashsync sheet add: {}", mutation.value.title),
        &mutation.value,
        mutation.remote,
    );
    let report = SheetReport {
        sheet: mutation.value,
        remote: mutation.remote,
    };

    emit_success(
        output(options.json, options.quiet),
        "sheet add",
        &report,
        Some(&human),
    )
}

pub async fn run_update(options: UpdateOptions) -> Result<()> {
    let patch = SheetPatch {
        title: options.title,
        url: options.url,
        status: parse_status(options.status)?,
        category: options.category,
        description: options.description,
        pinned: options.pinned,
    };
    let id = RecordId::parse(&options.id);
    let session = options.session.open().await?;
    if session.sync.sheet(&id).is_none() {
        return Err(not_found(CollectionKind::Sheets, &id));
    }

    let mutation = session.sync.update_sheet(&id, &patch).await;
    let sheet = mutation
        .value
        .ok_or_else(|| not_found(CollectionKind::Sheets, &id))?;

    let human = sheet_human(
        format!("dashsync sheet update: {}", sheet.title),
        &sheet,
        mutation.remote,
    );
    let report = SheetReport {
        sheet,
        remote: mutation.remote,
    };

    emit_success(
        output(options.json, options.quiet),
        "sheet update",
        &report,
        Some(&human),
    )
}

pub async fn run_rm(options: IdOptions) -> Result<()> {
    let id = RecordId::parse(&options.id);
    let session = options.session.open().await?;
    if session.sync.sheet(&id).is_none() {
        return Err(not_found(CollectionKind::Sheets, &id));
    }

    let mutation = session.sync.remove_sheet(&id).await;
    let sheet = mutation
        .value
        .ok_or_else(|| not_found(CollectionKind::Sheets, &id))?;

    let mut human = HumanOutput::new(format!("dashsync sheet rm: {}", sheet.title));
    human.push_summary("id", sheet.id.to_string());
    describe_push(&mut human, mutation.remote);
    let report = SheetReport {
        sheet,
        remote: mutation.remote,
    };

    emit_success(
        output(options.json, options.quiet),
        "sheet rm",
        &report,
        Some(&human),
    )
}

pub async fn run_pin(options: IdOptions) -> Result<()> {
    let id = RecordId::parse(&options.id);
    let session = options.session.open().await?;
    if session.sync.sheet(&id).is_none() {
        return Err(not_found(CollectionKind::Sheets, &id));
    }

    let mutation = session.sync.toggle_sheet_pin(&id).await;
    let sheet = mutation
        .value
        .ok_or_else(|| not_found(CollectionKind::Sheets, &id))?;

    let verb = if sheet.pinned { "pinned" } else { "unpinned" };
    let human = sheet_human(
        format!("dashsync sheet pin: {} {verb}", sheet.title),
        &sheet,
        mutation.remote,
    );
    let report = SheetReport {
        sheet,
        remote: mutation.remote,
    };

    emit_success(
        output(options.json, options.quiet),
        "sheet pin",
        &report,
        Some(&human),
    )
}

pub async fn run_categories(options: CategoriesOptions) -> Result<()> {
    let session = options.session.open().await?;
    let report = CategoriesReport {
        categories: session.sync.categories(),
    };

    let mut human = HumanOutput::new(format!(
        "dashsync sheet categories: {}",
        report.categories.len()
    ));
    for category in &report.categories {
        human.push_detail(category.clone());
    }

    emit_success(
        output(options.json, options.quiet),
        "sheet categories",
        &report,
        Some(&human),
    )
}

pub async fn run_import(options: ImportOptions) -> Result<()> {
    let values = read_import(&options.file, CollectionKind::Sheets)?;
    let total = values.len();
    let session = options.session.open().await?;

    let mutation = session.sync.replace_sheets(values).await;
    let report = ImportReport {
        imported: mutation.value,
        dropped: total - mutation.value,
        remote: mutation.remote,
    };

    let mut human = HumanOutput::new(format!(
        "dashsync sheet import: {} sheets",
        report.imported
    ));
    human.push_summary("file", options.file.display().to_string());
    if report.dropped > 0 {
        human.push_warning(format!("{} invalid records dropped", report.dropped));
    }
    describe_push(&mut human, mutation.remote);

    emit_success(
        output(options.json, options.quiet),
        "sheet import",
        &report,
        Some(&human),
    )
}
