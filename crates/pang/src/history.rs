//! Rolling seven-day display list of recent celebrations.

use chrono::{DateTime, Days, Local, NaiveDate, TimeZone};
use serde::Serialize;

use crate::{CelebrationEvent, HISTORY_DAYS, HISTORY_LIMIT};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayGroup {
    pub date: NaiveDate,
    pub label: String,
    pub events: Vec<CelebrationEvent>,
}

#[derive(Debug, Clone, Default)]
pub struct History {
    // Newest first. Photo payloads are never retained here.
    entries: Vec<CelebrationEvent>,
}

/// Start of the window: local midnight, six days before `now`.
pub fn window_start<Tz: TimeZone>(now: &DateTime<Tz>) -> u64 {
    let first_day = now
        .date_naive()
        .checked_sub_days(Days::new((HISTORY_DAYS - 1) as u64))
        .unwrap_or(NaiveDate::MIN);
    first_day
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| now.timezone().from_local_datetime(&midnight).earliest())
        .map(|start| start.timestamp_millis().max(0) as u64)
        .unwrap_or(0)
}

pub fn local_date(timestamp: u64) -> Option<NaiveDate> {
    Local
        .timestamp_millis_opt(timestamp as i64)
        .single()
        .map(|at| at.date_naive())
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a backfill query result.
    pub fn backfill(&mut self, events: impl IntoIterator<Item = CelebrationEvent>, since: u64) {
        for event in events {
            self.insert(event, since);
        }
    }

    /// Add one event. Returns false for duplicates and events older than `since`.
    pub fn insert(&mut self, mut event: CelebrationEvent, since: u64) -> bool {
        if event.timestamp < since || self.entries.iter().any(|e| e.id == event.id) {
            return false;
        }
        event.photo_payload = None;
        let at = self
            .entries
            .partition_point(|existing| existing.timestamp > event.timestamp);
        self.entries.insert(at, event);
        self.entries.truncate(HISTORY_LIMIT);
        true
    }

    /// Drop entries that have fallen out of the window.
    pub fn expire(&mut self, since: u64) {
        self.entries.retain(|event| event.timestamp >= since);
    }

    pub fn entries(&self) -> &[CelebrationEvent] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Group entries by local calendar day, newest day first.
    pub fn by_day(&self, today: NaiveDate) -> Vec<DayGroup> {
        let mut groups: Vec<DayGroup> = Vec::new();
        for event in &self.entries {
            let Some(date) = local_date(event.timestamp) else {
                continue;
            };
            match groups.last_mut() {
                Some(group) if group.date == date => group.events.push(event.clone()),
                _ => groups.push(DayGroup {
                    date,
                    label: day_label(date, today),
                    events: vec![event.clone()],
                }),
            }
        }
        groups
    }
}

pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else {
        date.format("%b %-d").to_string()
    }
}
