//! Record types for the two dashboard collections.
//!
//! Every ingestion path (remote payload, local storage, seed data) goes
//! through [`normalize_values`]: raw JSON is decoded into a lenient `Raw*`
//! shape and then into the strict record type, assigning an id and a
//! `pinned` flag when absent and dropping records without a usable title
//! (or url, for sheets). Downstream code never branches on missing fields.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

use crate::error::{Error, Result};

/// Stamp written to `lastUpdated` on every sheet mutation
pub const JUST_NOW: &str = "Just now";

/// Category used when a sheet has none
pub const DEFAULT_CATEGORY: &str = "General";

/// Status string that marks a task completed in patches
pub const COMPLETED_STATUS: &str = "completed";

/// The two top-level collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Sheets,
    Tasks,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Sheets => "sheets",
            CollectionKind::Tasks => "tasks",
        }
    }

    /// Key of the persisted collection in the local store
    pub fn storage_key(&self) -> &'static str {
        match self {
            CollectionKind::Sheets => "allSheets",
            CollectionKind::Tasks => "allTasks",
        }
    }

    /// Singular noun used in messages
    pub fn record_name(&self) -> &'static str {
        match self {
            CollectionKind::Sheets => "sheet",
            CollectionKind::Tasks => "task",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record identifier.
///
/// Seeded and legacy records carry numeric ids; generated ids are ULIDs
/// (millisecond timestamp plus 80 random bits), so two records created in
/// the same millisecond still get distinct ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(u64),
    Text(String),
}

impl RecordId {
    pub fn generate() -> Self {
        RecordId::Text(Ulid::new().to_string())
    }

    /// Parse user input: all-digit input is numeric, anything else is text.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.parse::<u64>() {
            Ok(n) => RecordId::Number(n),
            Err(_) => RecordId::Text(trimmed.to_string()),
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(RecordId::Number),
            Value::String(s) if !s.trim().is_empty() => Some(RecordId::Text(s.trim().to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{n}"),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetStatus {
    #[default]
    Active,
    Pending,
    Inactive,
}

impl SheetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SheetStatus::Active => "active",
            SheetStatus::Pending => "pending",
            SheetStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for SheetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SheetStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(SheetStatus::Active),
            "pending" => Ok(SheetStatus::Pending),
            "inactive" => Ok(SheetStatus::Inactive),
            other => Err(Error::InvalidArgument(format!(
                "invalid sheet status '{other}' (expected active|pending|inactive)"
            ))),
        }
    }
}

/// A link to a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetLink {
    pub id: RecordId,
    pub title: String,
    pub url: String,
    pub status: SheetStatus,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub last_updated: String,
    pub pinned: bool,
}

/// A to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: RecordId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub pinned: bool,
}

/// Lenient ingestion shape for sheets
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSheet {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub pinned: Option<Value>,
}

/// Lenient ingestion shape for tasks
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTask {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub pinned: Option<Value>,
}

/// Behaviour shared by both record kinds.
pub trait Record: Clone + fmt::Debug + Serialize + Send + Sync + 'static {
    const KIND: CollectionKind;

    type Raw: DeserializeOwned;

    fn id(&self) -> &RecordId;

    fn is_pinned(&self) -> bool;

    /// Copy of this record with `pinned` set.
    fn with_pinned(&self, pinned: bool) -> Self;

    /// Strict record from a raw shape; `None` when the record is invalid.
    fn normalize(raw: Self::Raw) -> Option<Self>;

    /// Server-side shape check on an untyped element.
    fn is_valid_value(value: &Value) -> bool;
}

impl Record for SheetLink {
    const KIND: CollectionKind = CollectionKind::Sheets;

    type Raw = RawSheet;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn is_pinned(&self) -> bool {
        self.pinned
    }

    fn with_pinned(&self, pinned: bool) -> Self {
        SheetLink {
            pinned,
            ..self.clone()
        }
    }

    fn normalize(raw: RawSheet) -> Option<Self> {
        let title = non_empty(raw.title)?;
        let url = non_empty(raw.url)?;
        Some(SheetLink {
            id: assign_id(raw.id.as_ref()),
            title,
            url,
            status: raw
                .status
                .and_then(|status| status.parse().ok())
                .unwrap_or_default(),
            category: non_empty(raw.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            description: raw.description,
            last_updated: non_empty(raw.last_updated).unwrap_or_else(|| JUST_NOW.to_string()),
            pinned: raw.pinned.as_ref().is_some_and(is_truthy),
        })
    }

    fn is_valid_value(value: &Value) -> bool {
        has_text_field(value, "title") && has_text_field(value, "url")
    }
}

impl Record for Task {
    const KIND: CollectionKind = CollectionKind::Tasks;

    type Raw = RawTask;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn is_pinned(&self) -> bool {
        self.pinned
    }

    fn with_pinned(&self, pinned: bool) -> Self {
        Task {
            pinned,
            ..self.clone()
        }
    }

    fn normalize(raw: RawTask) -> Option<Self> {
        let title = non_empty(raw.title)?;
        let completed = match raw.completed {
            Some(value) => is_truthy(&value),
            None => raw.status.as_deref() == Some(COMPLETED_STATUS),
        };
        Some(Task {
            id: assign_id(raw.id.as_ref()),
            title,
            description: raw.description,
            completed,
            priority: raw.priority,
            due_date: raw.due_date,
            category: raw.category,
            pinned: raw.pinned.as_ref().is_some_and(is_truthy),
        })
    }

    fn is_valid_value(value: &Value) -> bool {
        has_text_field(value, "title")
    }
}

/// Input for adding a sheet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSheet {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub status: Option<SheetStatus>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub pinned: Option<bool>,
}

impl NewSheet {
    pub fn into_record(self, id: RecordId) -> Result<SheetLink> {
        let title = self.title.trim().to_string();
        let url = self.url.trim().to_string();
        if title.is_empty() {
            return Err(Error::Validation("sheet title cannot be empty".to_string()));
        }
        if url.is_empty() {
            return Err(Error::Validation("sheet url cannot be empty".to_string()));
        }
        Ok(SheetLink {
            id,
            title,
            url,
            status: self.status.unwrap_or_default(),
            category: non_empty(self.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            description: self.description,
            last_updated: JUST_NOW.to_string(),
            pinned: self.pinned.unwrap_or(false),
        })
    }
}

/// Partial update for a sheet; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetPatch {
    pub title: Option<String>,
    pub url: Option<String>,
    pub status: Option<SheetStatus>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub pinned: Option<bool>,
}

impl SheetLink {
    /// Merge a patch and stamp `lastUpdated`. Blank title/url are ignored.
    pub fn patched(&self, patch: &SheetPatch) -> SheetLink {
        let mut next = self.clone();
        if let Some(title) = non_empty(patch.title.clone()) {
            next.title = title;
        }
        if let Some(url) = non_empty(patch.url.clone()) {
            next.url = url;
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        if let Some(category) = &patch.category {
            next.category =
                non_empty(Some(category.clone())).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        }
        if let Some(description) = &patch.description {
            next.description = Some(description.clone());
        }
        if let Some(pinned) = patch.pinned {
            next.pinned = pinned;
        }
        next.last_updated = JUST_NOW.to_string();
        next
    }
}

/// Input for adding a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    /// `"completed"` marks the task done when `completed` is absent
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub pinned: Option<bool>,
}

impl NewTask {
    pub fn into_record(self, id: RecordId) -> Result<Task> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::Validation("task title cannot be empty".to_string()));
        }
        let completed = self
            .completed
            .unwrap_or_else(|| self.status.as_deref() == Some(COMPLETED_STATUS));
        Ok(Task {
            id,
            title,
            description: self.description,
            completed,
            priority: self.priority,
            due_date: self.due_date,
            category: self.category,
            pinned: self.pinned.unwrap_or(false),
        })
    }
}

/// Partial update for a task; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    /// When present, `completed` becomes `status == "completed"`
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub category: Option<String>,
    pub pinned: Option<bool>,
}

impl Task {
    pub fn patched(&self, patch: &TaskPatch) -> Task {
        let mut next = self.clone();
        if let Some(title) = non_empty(patch.title.clone()) {
            next.title = title;
        }
        if let Some(description) = &patch.description {
            next.description = Some(description.clone());
        }
        if let Some(status) = &patch.status {
            next.completed = status.trim() == COMPLETED_STATUS;
        }
        if let Some(priority) = &patch.priority {
            next.priority = Some(priority.clone());
        }
        if let Some(due_date) = &patch.due_date {
            next.due_date = Some(due_date.clone());
        }
        if let Some(category) = &patch.category {
            next.category = Some(category.clone());
        }
        if let Some(pinned) = patch.pinned {
            next.pinned = pinned;
        }
        next
    }

    pub fn toggled(&self) -> Task {
        Task {
            completed: !self.completed,
            ..self.clone()
        }
    }
}

/// Decode and normalize untyped elements, dropping the invalid ones.
pub fn normalize_values<T: Record>(values: Vec<Value>) -> Vec<T> {
    let total = values.len();
    let records: Vec<T> = values
        .into_iter()
        .filter_map(|value| serde_json::from_value::<T::Raw>(value).ok())
        .filter_map(T::normalize)
        .collect();
    if records.len() != total {
        tracing::warn!(
            kind = %T::KIND,
            dropped = total - records.len(),
            "dropped invalid records"
        );
    }
    records
}

/// Parse a persisted JSON array; `None` if it is not an array.
pub fn parse_collection<T: Record>(json: &str) -> Option<Vec<T>> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Array(values)) => Some(normalize_values(values)),
        _ => None,
    }
}

/// Untyped form of a collection, as sent over the wire.
pub fn to_values<T: Record>(records: &[T]) -> Vec<Value> {
    records
        .iter()
        .filter_map(|record| serde_json::to_value(record).ok())
        .collect()
}

/// Display order: pinned records first, source order otherwise (stable).
pub fn pinned_first<T: Record>(records: &[T]) -> Vec<T> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|record| !record.is_pinned());
    sorted
}

fn assign_id(raw: Option<&Value>) -> RecordId {
    raw.and_then(RecordId::from_value)
        .unwrap_or_else(RecordId::generate)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn has_text_field(value: &Value, field: &str) -> bool {
    value
        .get(field)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_assigns_id_and_pinned() {
        let sheets: Vec<SheetLink> =
            normalize_values(vec![json!({"title": "Budget", "url": "https://x"})]);
        assert_eq!(sheets.len(), 1);
        assert!(!sheets[0].pinned);
        assert!(matches!(sheets[0].id, RecordId::Text(_)));
        assert_eq!(sheets[0].category, DEFAULT_CATEGORY);
        assert_eq!(sheets[0].status, SheetStatus::Active);
    }

    #[test]
    fn normalize_keeps_numeric_ids() {
        let tasks: Vec<Task> = normalize_values(vec![json!({"id": 7, "title": "Ship"})]);
        assert_eq!(tasks[0].id, RecordId::Number(7));
    }

    #[test]
    fn normalize_drops_invalid_records_only() {
        let sheets: Vec<SheetLink> = normalize_values(vec![
            json!({"title": "", "url": "x"}),
            json!({"title": "No url"}),
            json!("not an object"),
            json!({"title": "Ok", "url": "https://ok"}),
        ]);
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].title, "Ok");
    }

    #[test]
    fn falsy_pinned_values_become_false() {
        let tasks: Vec<Task> = normalize_values(vec![
            json!({"title": "a", "pinned": null}),
            json!({"title": "b", "pinned": 0}),
            json!({"title": "c", "pinned": ""}),
            json!({"title": "d", "pinned": 1}),
        ]);
        let pinned: Vec<bool> = tasks.iter().map(|t| t.pinned).collect();
        assert_eq!(pinned, vec![false, false, false, true]);
    }

    #[test]
    fn task_status_field_derives_completed() {
        let tasks: Vec<Task> = normalize_values(vec![json!({"title": "a", "status": "completed"})]);
        assert!(tasks[0].completed);
    }

    #[test]
    fn record_id_parse() {
        assert_eq!(RecordId::parse("42"), RecordId::Number(42));
        assert_eq!(
            RecordId::parse(" 01HZX "),
            RecordId::Text("01HZX".to_string())
        );
        assert_ne!(RecordId::generate(), RecordId::generate());
    }

    #[test]
    fn parse_collection_rejects_non_arrays() {
        assert!(parse_collection::<Task>("{\"title\":\"a\"}").is_none());
        assert!(parse_collection::<Task>("garbage").is_none());
        assert_eq!(parse_collection::<Task>("[]").map(|t| t.len()), Some(0));
    }

    #[test]
    fn sheet_wire_format_is_camel_case() {
        let sheet = NewSheet {
            title: "Roster".to_string(),
            url: "https://r".to_string(),
            ..Default::default()
        }
        .into_record(RecordId::Number(1))
        .unwrap();
        let value = serde_json::to_value(&sheet).unwrap();
        assert_eq!(value["lastUpdated"], json!(JUST_NOW));
        assert_eq!(value["status"], json!("active"));
        assert!(value.get("description").is_none());
    }
}
