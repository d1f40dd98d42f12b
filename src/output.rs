//! Shared output for dashsync CLI commands.
//!
//! With `--json` every invocation prints exactly one envelope on stdout:
//!
//! ```text
//! {
//!   "schema_version": "dashsync.v1",
//!   "command": "task add",
//!   "status": "success",
//!   "data": { "task": {...}, "remote": "failed" },
//!   "warnings": ["change saved locally only; ..."]
//! }
//! ```
//!
//! Errors use the same envelope with `"status": "error"` and an `error`
//! object instead of `data`. Without `--json` the command's [`HumanOutput`]
//! report is printed. `--quiet` drops the report but still writes its
//! warnings to stderr, since they describe changes the remote never got.

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};

pub const SCHEMA_VERSION: &str = "dashsync.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Plain-text report of one command
#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    /// `key: value` line; an empty value prints the key alone.
    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    /// Also carried in the JSON envelope.
    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Success,
    Error,
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "no_items")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "no_items")]
    next_steps: &'a [String],
}

fn no_items(items: &&[String]) -> bool {
    items.is_empty()
}

impl<T: Serialize> Envelope<'_, T> {
    fn print(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        return Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: Status::Success,
            data: Some(data),
            error: None,
            warnings: human.map(HumanOutput::warnings).unwrap_or_default(),
            next_steps: human.map(|h| h.next_steps.as_slice()).unwrap_or_default(),
        }
        .print();
    }

    match human {
        Some(human) if options.quiet => {
            for warning in human.warnings() {
                eprintln!("warning: {warning}");
            }
        }
        Some(human) => println!("{}", format_human(human)),
        None => {}
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if json {
        return Envelope::<()> {
            schema_version: SCHEMA_VERSION,
            command,
            status: Status::Error,
            data: None,
            error: Some(ErrorBody {
                message: err.to_string(),
                code: err.exit_code(),
                kind: error_kind(err),
                details: err.details(),
            }),
            warnings: &[],
            next_steps: &next_steps,
        }
        .print();
    }

    eprintln!("error: {err}");
    if let Some(hint) = next_steps.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut lines = Vec::new();
    lines.push(output.header.clone());

    push_summary(&mut lines, &output.summary);
    push_section(&mut lines, "Details", &output.details);
    push_section(&mut lines, "Warnings", &output.warnings);
    push_section(&mut lines, "Next steps", &output.next_steps);

    lines.join("\n")
}

/// Best-effort command name for error envelopes, taken before clap parses.
pub fn infer_command_name_from_args() -> String {
    command_name_from(std::env::args().skip(1))
}

/// Flags that consume the following argument
const VALUE_FLAGS: &[&str] = &["--api-url", "--data-dir", "--config"];

pub fn command_name_from<I>(args: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();

    let command = match next_positional(&mut args) {
        Some(cmd) => cmd,
        None => return "dashsync".to_string(),
    };

    let subcommand = if matches!(command.as_str(), "sheet" | "task") {
        next_positional(&mut args)
    } else {
        None
    };

    if let Some(sub) = subcommand {
        format!("{command} {sub}")
    } else {
        command
    }
}

fn next_positional(args: &mut impl Iterator<Item = String>) -> Option<String> {
    while let Some(arg) = args.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        return Some(arg);
    }
    None
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        exit_codes::USER_ERROR => "user_error",
        _ => "operation_failed",
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    match err {
        Error::RecordNotFound { kind, .. } => vec![format!("dashsync {kind} list")],
        Error::InvalidConfig(_) => vec!["fix dashsync.toml then retry".to_string()],
        Error::Network(_) => vec!["dashsync status".to_string()],
        Error::LockFailed(path) => vec![format!(
            "check for another dashsync process holding {}",
            path.display()
        )],
        _ => Vec::new(),
    }
}

fn push_summary(lines: &mut Vec<String>, summary: &[(String, String)]) {
    if summary.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push("Summary:".to_string());
    for (key, value) in summary {
        if value.is_empty() {
            lines.push(format!("- {key}"));
        } else {
            lines.push(format!("- {key}: {value}"));
        }
    }
}

fn push_section(lines: &mut Vec<String>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push(format!("{title}:"));
    for item in items {
        lines.push(format!("- {item}"));
    }
}
