use anyhow::Result;
use serde::Serialize;

use pang::{window_start, DayGroup, EventStore, History, HISTORY_LIMIT};

use crate::output::Output;

#[derive(Serialize)]
struct HistoryResult {
    total: usize,
    days: Vec<DayGroup>,
}

/// Celebrations from the last seven days, grouped by local day
pub async fn history(store: &dyn EventStore, output: &Output) -> Result<()> {
    let now = chrono::Local::now();
    let since = window_start(&now);

    let mut history = History::new();
    history.backfill(store.recent(since, HISTORY_LIMIT).await?, since);

    let result = HistoryResult {
        total: history.len(),
        days: history.by_day(now.date_naive()),
    };
    output.success("history", result);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pang::{InMemoryEventStore, NewEvent};

    #[tokio::test]
    async fn test_history_with_events() {
        let store = InMemoryEventStore::new();
        store
            .append(NewEvent {
                text: "hi".to_string(),
                sender: "s".to_string(),
                is_anonymous: false,
                emoji_sequence: vec![],
                combo_count: 0,
                photo_payload: None,
            })
            .await
            .unwrap();
        history(&store, &Output::new(true)).await.unwrap();
    }

    #[tokio::test]
    async fn test_history_empty_store() {
        let store = InMemoryEventStore::new();
        history(&store, &Output::new(false)).await.unwrap();
    }
}
