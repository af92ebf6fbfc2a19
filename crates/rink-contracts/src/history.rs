use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use similar::TextDiff;

use crate::params::DesignParams;
use crate::styles::style_number;

/// One finished design. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedResult {
    pub id: String,
    pub image_url: String,
    pub params: DesignParams,
    pub created_at: i64,
    pub prompt: String,
}

impl GeneratedResult {
    pub fn style_number(&self) -> u16 {
        style_number(&self.params.style.label())
    }

    pub fn download_file_name(&self) -> String {
        format!("sport-print-style-{}-{}.png", self.style_number(), self.id)
    }

    pub fn created_at_iso(&self) -> String {
        DateTime::<Utc>::from_timestamp_millis(self.created_at)
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_default()
    }
}

/// Hands out millisecond-timestamp ids that never repeat within a process, even when
/// two results land in the same millisecond.
#[derive(Debug, Default)]
pub struct ResultIdClock {
    last: AtomicI64,
}

impl ResultIdClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> (String, i64) {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self.last.compare_exchange_weak(
                prev,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return (candidate.to_string(), candidate),
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Session history, newest first, plus the currently displayed result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStore {
    entries: Vec<GeneratedResult>,
    displayed: Option<String>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[GeneratedResult] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&GeneratedResult> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Stores `result` at the front and displays it.
    pub fn prepend(&mut self, result: GeneratedResult) -> &GeneratedResult {
        self.displayed = Some(result.id.clone());
        self.entries.insert(0, result);
        &self.entries[0]
    }

    pub fn select(&mut self, id: &str) -> Option<&GeneratedResult> {
        let idx = self.entries.iter().position(|entry| entry.id == id)?;
        self.displayed = Some(id.to_string());
        self.entries.get(idx)
    }

    pub fn delete(&mut self, id: &str) -> Option<GeneratedResult> {
        let idx = self.entries.iter().position(|entry| entry.id == id)?;
        let removed = self.entries.remove(idx);
        if self.displayed_id() == Some(id) {
            self.displayed = None;
        }
        Some(removed)
    }

    pub fn displayed(&self) -> Option<&GeneratedResult> {
        self.get(self.displayed.as_deref()?)
    }

    pub fn displayed_id(&self) -> Option<&str> {
        self.displayed.as_deref()
    }

    /// Unified diff of the prompts of two stored results.
    pub fn prompt_diff(&self, from_id: &str, to_id: &str) -> Option<Vec<String>> {
        let from = self.get(from_id)?;
        let to = self.get(to_id)?;
        let diff = TextDiff::from_lines(from.prompt.as_str(), to.prompt.as_str());
        let rendered = diff
            .unified_diff()
            .header(&from.id, &to.id)
            .to_string();
        Some(rendered.lines().map(str::to_string).collect())
    }
}
