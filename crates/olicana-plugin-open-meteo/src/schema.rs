//! Form schema and search presets for the setup dialog.

use std::collections::HashMap;

use olicana_cache::HistoryEntry;
use olicana_cache::dates::format_date;
use serde_json::{Value, json};
use time::Date;

use crate::aggregate::DataMode;

/// Preset label that starts from the defaults instead of a past search.
pub const NEW_SEARCH: &str = "New Search";

/// Title of the setup dialog window.
pub const FORM_TITLE: &str = "Open Meteo Configuration";

/// Search presets offered by the form, built from the search history.
#[derive(Debug, Clone)]
pub struct Presets {
    labels: Vec<String>,
    searches: HashMap<String, HistoryEntry>,
}

impl Presets {
    /// Builds presets from history entries, most recent first.
    ///
    /// Entries whose label repeats an earlier one are skipped.
    #[must_use]
    pub fn from_history(entries: Vec<HistoryEntry>) -> Self {
        let mut presets = Self {
            labels: vec![String::from(NEW_SEARCH)],
            searches: HashMap::new(),
        };
        for entry in entries {
            let label = preset_label(&entry);
            if presets.searches.contains_key(&label) {
                continue;
            }
            presets.labels.push(label.clone());
            presets.searches.insert(label, entry);
        }
        presets
    }

    /// Labels in display order, starting with [`NEW_SEARCH`].
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Returns the past search behind `label`.
    #[must_use]
    pub fn search(&self, label: &str) -> Option<&HistoryEntry> {
        self.searches.get(label)
    }

    /// Returns whether only [`NEW_SEARCH`] is available.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.searches.is_empty()
    }
}

impl Default for Presets {
    fn default() -> Self {
        Self::from_history(Vec::new())
    }
}

/// Label shown for a past search.
#[must_use]
pub fn preset_label(entry: &HistoryEntry) -> String {
    format!(
        "{} ({} to {})",
        entry.cities.join(", "),
        format_date(entry.start_date),
        format_date(entry.end_date)
    )
}

/// Builds the JSON schema and UI schema of the setup form.
///
/// The preset selector is hidden when there is no history to choose from.
#[must_use]
pub fn build_schema(presets: &Presets, today: Date) -> (Value, Value) {
    let today_text = format_date(today);
    let modes: Vec<String> = DataMode::ALL.iter().map(ToString::to_string).collect();
    let mut search_type = json!({
        "type": "string",
        "title": "Search History",
        "enum": presets.labels(),
        "default": NEW_SEARCH,
    });
    let mut search_type_ui = json!({ "ui:classNames": "col-span-2" });
    if presets.is_empty() {
        hide(&mut search_type);
        hide(&mut search_type_ui);
    }

    let schema = json!({
        "type": "object",
        "title": "Open Meteo Setup",
        "required": ["search_type", "cities", "start_date", "end_date"],
        "properties": {
            "search_type": search_type,
            "cities": {
                "type": "array",
                "title": "Locations (Add to list)",
                "items": { "type": "string", "title": "City Name" },
                "minItems": 1,
            },
            "map_markers": {
                "type": "array",
                "title": "Map Preview",
                "items": { "type": "object" },
            },
            "start_date": {
                "type": "string",
                "title": "Start Date",
                "format": "date",
                "maximum": today_text,
            },
            "end_date": {
                "type": "string",
                "title": "End Date",
                "format": "date",
                "maximum": today_text,
            },
            "mode": {
                "type": "string",
                "title": "Data Mode",
                "enum": modes,
                "default": DataMode::Daily.to_string(),
            },
        },
    });
    let ui_schema = json!({
        "ui:order": ["search_type", "start_date", "end_date", "cities", "map_markers", "mode"],
        "ui:classNames": "grid grid-cols-2 gap-4",
        "search_type": search_type_ui,
        "cities": { "ui:classNames": "col-span-2" },
        "map_markers": { "ui:widget": "map-picker", "ui:classNames": "col-span-2" },
        "mode": { "ui:classNames": "col-span-2" },
        "start_date": { "ui:widget": "date", "ui:classNames": "col-span-1" },
        "end_date": { "ui:widget": "date", "ui:classNames": "col-span-1" },
    });
    (schema, ui_schema)
}

fn hide(node: &mut Value) {
    if let Some(object) = node.as_object_mut() {
        object.insert(String::from("ui:hidden"), Value::Bool(true));
    }
}
