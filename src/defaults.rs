//! Seed data used when neither the remote nor the local store has records.

use crate::model::{RecordId, SheetLink, SheetStatus, Task};

const SAMPLE_SHEET_URL: &str =
    "https://docs.google.com/spreadsheets/d/1BxiMVs0XRA5nFMdKvBdBZjgmUUqptlbs74OgvE2upms";

pub fn default_sheets() -> Vec<SheetLink> {
    vec![
        SheetLink {
            id: RecordId::Number(1),
            title: "Employee Database".to_string(),
            url: SAMPLE_SHEET_URL.to_string(),
            status: SheetStatus::Active,
            category: "HR".to_string(),
            description: Some("Complete employee information and records".to_string()),
            last_updated: "2 hours ago".to_string(),
            pinned: true,
        },
        SheetLink {
            id: RecordId::Number(2),
            title: "Project Timeline".to_string(),
            url: SAMPLE_SHEET_URL.to_string(),
            status: SheetStatus::Active,
            category: "Project Management".to_string(),
            description: Some("Project milestones and deadlines tracking".to_string()),
            last_updated: "1 day ago".to_string(),
            pinned: false,
        },
        SheetLink {
            id: RecordId::Number(3),
            title: "Budget Analysis".to_string(),
            url: SAMPLE_SHEET_URL.to_string(),
            status: SheetStatus::Pending,
            category: "Finance".to_string(),
            description: Some("Monthly budget analysis and forecasting".to_string()),
            last_updated: "3 days ago".to_string(),
            pinned: false,
        },
    ]
}

pub fn default_tasks() -> Vec<Task> {
    vec![
        Task {
            id: RecordId::Number(1),
            title: "Review employee database".to_string(),
            description: Some("Check for missing information and update records".to_string()),
            completed: false,
            priority: Some("high".to_string()),
            due_date: Some("2024-01-15".to_string()),
            category: Some("HR".to_string()),
            pinned: true,
        },
        Task {
            id: RecordId::Number(2),
            title: "Update project timeline".to_string(),
            description: Some("Add Q2 milestones and deadlines".to_string()),
            completed: true,
            priority: Some("medium".to_string()),
            due_date: Some("2024-01-10".to_string()),
            category: Some("Project Management".to_string()),
            pinned: false,
        },
        Task {
            id: RecordId::Number(3),
            title: "Prepare monthly report".to_string(),
            description: Some("Compile data for monthly performance report".to_string()),
            completed: false,
            priority: Some("medium".to_string()),
            due_date: Some("2024-01-20".to_string()),
            category: Some("General".to_string()),
            pinned: false,
        },
    ]
}
