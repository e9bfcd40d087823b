//! Pure derivations from an event collection to the dashboard views.
//!
//! Nothing here keeps state between calls: every view is recomputed from the
//! slice it is handed, so a view can never lag behind the collection.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::EventRecord;

/// Bucket for events whose category is absent or empty.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Length of the recent-activity feed in the reference deployment.
pub const DEFAULT_FEED_LENGTH: usize = 6;

/// Which categorical field a histogram is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryField {
    VehicleType,
    MaterialType,
}

impl CategoryField {
    /// The label an event contributes to this field's histogram.
    pub fn label_of(self, event: &EventRecord) -> &str {
        let raw = match self {
            CategoryField::VehicleType => event.vehicle_type.as_deref(),
            CategoryField::MaterialType => event.material_type.as_deref(),
        };
        match raw {
            Some(label) if !label.is_empty() => label,
            _ => UNKNOWN_LABEL,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

/// How the recent feed picks its events. Configured as `"source"` or
/// `"newest_first"`.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeedOrder {
    /// Prefix of the collection as delivered; the source is trusted to send newest first.
    #[default]
    Source,
    /// Sort by capture time, newest first, before taking the prefix.
    NewestFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryOptions {
    pub feed_length: usize,
    pub feed_order: FeedOrder,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            feed_length: DEFAULT_FEED_LENGTH,
            feed_order: FeedOrder::Source,
        }
    }
}

/// Every derived view for one collection.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_events: usize,
    pub vehicle_mix: Vec<CategoryCount>,
    pub material_mix: Vec<CategoryCount>,
    /// Raw mean; rounding and clamping are left to the display.
    pub average_load: f64,
    pub recent: Vec<EventRecord>,
    /// Timestamp of the first feed entry, verbatim.
    pub last_capture: Option<Value>,
}

/// Counts events per label. Buckets appear in the order their label is
/// first seen while scanning front to back.
pub fn categorical_histogram(events: &[EventRecord], field: CategoryField) -> Vec<CategoryCount> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut histogram: Vec<CategoryCount> = Vec::new();

    for event in events {
        let label = field.label_of(event);
        match slots.get(label) {
            Some(&slot) => histogram[slot].count += 1,
            None => {
                slots.insert(label, histogram.len());
                histogram.push(CategoryCount {
                    label: label.to_string(),
                    count: 1,
                });
            }
        }
    }

    histogram
}

/// Mean of all numeric load readings. Events without a reading are left out
/// of both sum and count; with no readings at all the result is `0.0`.
pub fn average_load(events: &[EventRecord]) -> f64 {
    let (sum, count) = events
        .iter()
        .filter_map(EventRecord::load_reading)
        .fold((0.0_f64, 0_usize), |(sum, count), reading| (sum + reading, count + 1));

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// First `k` events in collection order. No sorting, no filtering.
pub fn recent_feed(events: &[EventRecord], k: usize) -> &[EventRecord] {
    &events[..k.min(events.len())]
}

/// First `k` events after a stable sort by capture time, newest first.
/// Events without a parseable timestamp go last, in collection order.
pub fn newest_first_feed(events: &[EventRecord], k: usize) -> Vec<&EventRecord> {
    let mut ordered: Vec<&EventRecord> = events.iter().collect();
    ordered.sort_by_cached_key(|event| std::cmp::Reverse(event.captured_at()));
    ordered.truncate(k);
    ordered
}

pub fn summarize(events: &[EventRecord], options: SummaryOptions) -> DashboardSummary {
    let recent: Vec<EventRecord> = match options.feed_order {
        FeedOrder::Source => recent_feed(events, options.feed_length).to_vec(),
        FeedOrder::NewestFirst => newest_first_feed(events, options.feed_length)
            .into_iter()
            .cloned()
            .collect(),
    };
    let last_capture = recent.first().and_then(|event| event.timestamp.clone());

    DashboardSummary {
        total_events: events.len(),
        vehicle_mix: categorical_histogram(events, CategoryField::VehicleType),
        material_mix: categorical_histogram(events, CategoryField::MaterialType),
        average_load: average_load(events),
        recent,
        last_capture,
    }
}
