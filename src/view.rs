//! Read-side helpers over the collections: filtering and summary counts.

use serde::Serialize;

use crate::model::{SheetLink, SheetStatus, Task};

/// Sheet list filter. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct SheetFilter {
    /// Case-insensitive substring of the title or description
    pub search: Option<String>,
    pub status: Option<SheetStatus>,
    pub category: Option<String>,
}

impl SheetFilter {
    pub fn matches(&self, sheet: &SheetLink) -> bool {
        let matches_search = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                sheet.title.to_lowercase().contains(&term)
                    || sheet
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&term))
            }
        };
        let matches_status = self.status.map_or(true, |status| sheet.status == status);
        let matches_category = self
            .category
            .as_deref()
            .map_or(true, |category| sheet.category == category);

        matches_search && matches_status && matches_category
    }

    /// Keep matching sheets, preserving order.
    pub fn apply(&self, sheets: &[SheetLink]) -> Vec<SheetLink> {
        sheets
            .iter()
            .filter(|sheet| self.matches(sheet))
            .cloned()
            .collect()
    }
}

/// Distinct non-empty categories in first-seen order
pub fn categories(sheets: &[SheetLink]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for sheet in sheets {
        if !sheet.category.is_empty() && !seen.contains(&sheet.category) {
            seen.push(sheet.category.clone());
        }
    }
    seen
}

/// Dashboard overview counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub pinned_tasks: usize,
    pub sheets: usize,
    pub pinned_sheets: usize,
}

impl DashboardStats {
    pub fn compute(sheets: &[SheetLink], tasks: &[Task]) -> Self {
        let completed_tasks = tasks.iter().filter(|task| task.completed).count();
        Self {
            total_tasks: tasks.len(),
            completed_tasks,
            pending_tasks: tasks.len() - completed_tasks,
            pinned_tasks: tasks.iter().filter(|task| task.pinned).count(),
            sheets: sheets.len(),
            pinned_sheets: sheets.iter().filter(|sheet| sheet.pinned).count(),
        }
    }
}
