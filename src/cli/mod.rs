//! Command-line interface for dashsync
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand group is defined in its own submodule.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::config::{self, Config};
use crate::error::{Error, Result};
use crate::local::{FileStore, LocalStore};
use crate::model::{CollectionKind, RecordId};
use crate::output::HumanOutput;
use crate::remote::{HttpRemote, OfflineRemote, RemoteStore};
use crate::sync::{LoadReport, PushOutcome, Synchronizer};

mod serve;
mod sheet;
mod status;
mod task;

/// dashsync - dashboard data sync
///
/// Keeps sheet links and tasks in a local store and mirrors them to a
/// lightweight HTTP API when it is reachable.
#[derive(Parser, Debug)]
#[command(name = "dashsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Base URL of the dashboard API
    #[arg(long, global = true, env = config::ENV_API_URL)]
    pub api_url: Option<String>,

    /// Directory for locally persisted collections
    #[arg(long, global = true, env = config::ENV_DATA_DIR)]
    pub data_dir: Option<PathBuf>,

    /// Path to a dashsync.toml (defaults to ./dashsync.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Never contact the API; work from local data only
    #[arg(long, global = true)]
    pub offline: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the dashboard API service
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = config::ENV_PORT)]
        port: Option<u16>,
    },

    /// Load both collections and report where they came from
    Status,

    /// Sheet link commands
    #[command(subcommand)]
    Sheet(SheetCommands),

    /// Task commands
    #[command(subcommand)]
    Task(TaskCommands),
}

/// Sheet subcommands
#[derive(Subcommand, Debug)]
pub enum SheetCommands {
    /// List sheets, pinned first
    List {
        /// Case-insensitive match on title or description
        #[arg(long)]
        search: Option<String>,

        /// Only sheets with this status (active, pending, inactive)
        #[arg(long)]
        status: Option<String>,

        /// Only sheets in this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Add a sheet link
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        url: String,

        /// active, pending or inactive
        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Pin to the top of the list
        #[arg(long)]
        pinned: bool,
    },

    /// Update fields of a sheet
    Update {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        pinned: Option<bool>,
    },

    /// Remove a sheet
    Rm { id: String },

    /// Toggle the pinned flag
    Pin { id: String },

    /// List distinct categories
    Categories,

    /// Replace all sheets with the records in a JSON file
    Import { file: PathBuf },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// List tasks, pinned first
    List {
        /// Only completed tasks
        #[arg(long, conflicts_with = "pending")]
        completed: bool,

        /// Only open tasks
        #[arg(long)]
        pending: bool,
    },

    /// Add a task
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        priority: Option<String>,

        #[arg(long)]
        due_date: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// "completed" creates the task already done
        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        pinned: bool,
    },

    /// Update fields of a task
    Update {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// "completed" marks the task done, anything else reopens it
        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        priority: Option<String>,

        #[arg(long)]
        due_date: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        pinned: Option<bool>,
    },

    /// Remove a task
    Rm { id: String },

    /// Flip the completed flag
    Toggle { id: String },

    /// Toggle the pinned flag
    Pin { id: String },

    /// Replace all tasks with the records in a JSON file
    Import { file: PathBuf },
}

/// Flags shared by every command that opens a session
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub api_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub offline: bool,
}

/// A loaded synchronizer plus how it was loaded
pub struct Session {
    pub sync: Synchronizer,
    pub report: LoadReport,
    pub config: Config,
}

impl SessionOptions {
    /// Config file, then environment, then flags.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                Config::load_from_dir(&cwd)
            }
        };
        config.apply_env()?;

        let api_url = self.api_url.clone();
        let data_dir = self
            .data_dir
            .as_ref()
            .map(|dir| dir.to_string_lossy().into_owned());
        config.apply_overrides(|key| match key {
            config::ENV_API_URL => api_url.clone(),
            config::ENV_DATA_DIR => data_dir.clone(),
            _ => None,
        })?;
        Ok(config)
    }

    /// Build the synchronizer and run the startup protocol.
    pub async fn open(&self) -> Result<Session> {
        let config = self.resolve_config()?;
        let data_dir = config.data_dir();

        let local: Arc<dyn LocalStore> = Arc::new(FileStore::new(&data_dir));
        let remote: Arc<dyn RemoteStore> = if self.offline {
            Arc::new(OfflineRemote)
        } else {
            Arc::new(HttpRemote::new(&config.remote)?)
        };

        tracing::debug!(
            api_url = %config.remote.base_url,
            data_dir = %data_dir.display(),
            offline = self.offline,
            "opening session"
        );

        let sync = Synchronizer::new(remote, local);
        let report = sync.start().await;
        Ok(Session {
            sync,
            report,
            config,
        })
    }
}

pub(crate) fn not_found(kind: CollectionKind, id: &RecordId) -> Error {
    Error::RecordNotFound {
        kind: kind.record_name().to_string(),
        id: id.to_string(),
    }
}

/// Note the fate of the remote push in human output.
pub(crate) fn describe_push(human: &mut HumanOutput, outcome: PushOutcome) {
    match outcome {
        PushOutcome::Pushed => human.push_summary("remote", "updated"),
        PushOutcome::Offline => human.push_summary("remote", "offline, saved locally"),
        PushOutcome::Failed => {
            human.push_summary("remote", "push failed");
            human.push_warning(
                "change saved locally only; the next connected run pushes it over the remote copy",
            );
        }
    }
}

/// Read a JSON file holding either an array or `{"<kind>": [...]}`.
pub(crate) fn read_import(path: &Path, kind: CollectionKind) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)?;
    let payload: Value = serde_json::from_str(&content)?;
    match payload {
        Value::Array(values) => Ok(values),
        Value::Object(mut map) => match map.remove(kind.as_str()) {
            Some(Value::Array(values)) => Ok(values),
            _ => Err(Error::InvalidArgument(format!(
                "{}: expected a JSON array or an object with a '{kind}' array",
                path.display()
            ))),
        },
        _ => Err(Error::InvalidArgument(format!(
            "{}: expected a JSON array",
            path.display()
        ))),
    }
}

impl Cli {
    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            api_url: self.api_url.clone(),
            data_dir: self.data_dir.clone(),
            config: self.config.clone(),
            offline: self.offline,
        }
    }

    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        let session = self.session_options();
        let json = self.json;
        let quiet = self.quiet;

        match self.command {
            Commands::Serve { host, port } => {
                serve::run(serve::ServeOptions {
                    host,
                    port,
                    session,
                    json,
                    quiet,
                })
                .await
            }
            Commands::Status => {
                status::run(status::StatusOptions {
                    session,
                    json,
                    quiet,
                })
                .await
            }
            Commands::Sheet(cmd) => match cmd {
                SheetCommands::List { search, status, category } => {
                    sheet::run_list(sheet::ListOptions {
                        search,
                        status,
                        category,
                        session,
                        json,
                        quiet,
                    })
                    .await
                }
                SheetCommands::Add { title, url, status, category, description, pinned } => {
                    sheet::run_add(sheet::AddOptions {
                        title,
                        url,
                        status,
                        category,
                        description,
                        pinned,
                        session,
                        json,
                        quiet,
                    })
                    .await
                }
                SheetCommands::Update { id, title, url, status, category, description, pinned } => {
                    sheet::run_update(sheet::UpdateOptions {
                        id,
                        title,
                        url,
                        status,
                        category,
                        description,
                        pinned,
                        session,
                        json,
                        quiet,
                    })
                    .await
                }
                SheetCommands::Rm { id } => {
                    sheet::run_rm(sheet::IdOptions {
                        id,
                        session,
                        json,
                        quiet,
                    })
                    .await
                }
                SheetCommands::Pin { id } => {
                    sheet::run_pin(sheet::IdOptions {
                        id,
                        session,
                        json,
                        quiet,
                    })
                    .await
                }
                SheetCommands::Categories => {
                    sheet::run_categories(sheet::CategoriesOptions {
                        session,
                        json,
                        quiet,
                    })
                    .await
                }
                SheetCommands::Import { file } => {
                    sheet::run_import(sheet::ImportOptions {
                        file,
                        session,
                        json,
                        quiet,
                    })
                    .await
                }
            },
            Commands::Task(cmd) => match cmd {
                TaskCommands::List { completed, pending } => {
                    task::run_list(task::ListOptions {
                        completed,
                        pending,
                        session,
                        json,
                        quiet,
                    })
                    .await
                }
                TaskCommands::Add {
                    title,
                    description,
                    priority,
                    due_date,
                    category,
                    status,
                    pinned,
                } => {
                    task::run_add(task::AddOptions {
                        title,
                        description,
                        priority,
                        due_date,
                        category,
                        status,
                        pinned,
                        session,
                        json,
                        quiet,
                    })
                    .await
                }
                TaskCommands::Update {
                    id,
                    title,
                    description,
                    status,
                    priority,
                    due_date,
                    category,
                    pinned,
                } => {
                    task::run_update(task::UpdateOptions {
                        id,
                        title,
                        description,
                        status,
                        priority,
                        due_date,
                        category,
                        pinned,
                        session,
                        json,
                        quiet,
                    })
                    .await
                }
                TaskCommands::Rm { id } => {
                    task::run_rm(task::IdOptions {
                        id,
                        session,
                        json,
                        quiet,
                    })
                    .await
                }
                TaskCommands::Toggle { id } => {
                    task::run_toggle(task::IdOptions {
                        id,
                        session,
                        json,
                        quiet,
                    })
                    .await
                }
                TaskCommands::Pin { id } => {
                    task::run_pin(task::IdOptions {
                        id,
                        session,
                        json,
                        quiet,
                    })
                    .await
                }
                TaskCommands::Import { file } => {
                    task::run_import(task::ImportOptions {
                        file,
                        session,
                        json,
                        quiet,
                    })
                    .await
                }
            },
        }
    }
}
