#![allow(dead_code)]

//! Per-model report collection.
//!
//! Holds at most one generated report per model. Re-generating for a model
//! that already has a report goes through the orchestrator's confirmation
//! gate; the store itself only knows how to replace and clear entries.

pub mod handlers;
pub mod orchestrator;

use serde::Serialize;

/// The generated text output of one generation run, keyed by the model
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub model: String,
    pub text: String,
}

/// Ordered collection of reports, unique by model, sorted lexicographically
/// by model identifier for stable display.
#[derive(Debug, Clone, Default)]
pub struct ReportStore {
    reports: Vec<Report>,
}

impl ReportStore {
    /// Replaces any existing entry with the same model, otherwise appends.
    /// The collection is re-sorted by model identifier after every change.
    pub fn upsert(&mut self, report: Report) -> &[Report] {
        self.reports.retain(|r| r.model != report.model);
        self.reports.push(report);
        self.reports.sort_by(|a, b| a.model.cmp(&b.model));
        &self.reports
    }

    /// Removes the entry for `model`, if any. Invoked before a confirmed
    /// re-generation starts so a failed re-run leaves the slot empty rather
    /// than showing the stale previous report as current.
    pub fn clear_for_model(&mut self, model: &str) {
        self.reports.retain(|r| r.model != model);
    }

    pub fn contains_model(&self, model: &str) -> bool {
        self.reports.iter().any(|r| r.model == model)
    }

    pub fn get(&self, model: &str) -> Option<&Report> {
        self.reports.iter().find(|r| r.model == model)
    }

    pub fn all(&self) -> &[Report] {
        &self.reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(model: &str, text: &str) -> Report {
        Report {
            model: model.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_upsert_appends_new_model() {
        let mut store = ReportStore::default();
        store.upsert(report("gemini-1.5-pro", "first"));
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn test_upsert_same_model_keeps_exactly_one_entry() {
        let mut store = ReportStore::default();
        store.upsert(report("gemini-1.5-pro", "first"));
        store.upsert(report("gemini-1.5-pro", "second"));

        assert_eq!(store.all().len(), 1);
        assert_eq!(store.get("gemini-1.5-pro").unwrap().text, "second");
    }

    #[test]
    fn test_collection_sorted_by_model_for_any_insertion_order() {
        let mut store = ReportStore::default();
        store.upsert(report("gemini-1.5-pro", "a"));
        store.upsert(report("gemini-1.0-ultra", "b"));
        store.upsert(report("gemini-1.5-flash", "c"));

        let models: Vec<&str> = store.all().iter().map(|r| r.model.as_str()).collect();
        assert_eq!(
            models,
            vec!["gemini-1.0-ultra", "gemini-1.5-flash", "gemini-1.5-pro"]
        );
    }

    #[test]
    fn test_clear_for_model_removes_only_that_entry() {
        let mut store = ReportStore::default();
        store.upsert(report("model-a", "a"));
        store.upsert(report("model-b", "b"));

        store.clear_for_model("model-a");

        assert!(!store.contains_model("model-a"));
        assert!(store.contains_model("model-b"));
    }

    #[test]
    fn test_clear_for_unknown_model_is_a_no_op() {
        let mut store = ReportStore::default();
        store.upsert(report("model-a", "a"));
        store.clear_for_model("model-x");
        assert_eq!(store.all().len(), 1);
    }
}
