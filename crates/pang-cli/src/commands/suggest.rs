use anyhow::Result;
use chrono::{Datelike, Local};
use serde::Serialize;

use pang::recommendation::payday;
use pang::{recommend, Recommendation};

use crate::output::Output;

#[derive(Serialize)]
struct SuggestResult {
    suggestion: Option<Recommendation>,
    next_payday: Option<chrono::NaiveDate>,
}

/// Emoji suggestion for today, if today is a notable day
pub async fn suggest(output: &Output) -> Result<()> {
    let now = Local::now().naive_local();
    let today = now.date();

    let this_month = payday(today.year(), today.month());
    let next_payday = match this_month {
        Some(day) if day >= today => Some(day),
        _ => {
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            payday(year, month)
        }
    };

    let result = SuggestResult {
        suggestion: recommend(now),
        next_payday,
    };

    if output.is_json() {
        output.success("suggest", result);
    } else {
        match &result.suggestion {
            Some(rec) => output.success_message(
                "suggest",
                &format!("{}: {} ({})", rec.label, rec.emojis.join(" "), rec.reason),
            ),
            None => output.success_message("suggest", "Nothing special today."),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_suggest_runs_in_both_modes() {
        suggest(&Output::new(true)).await.unwrap();
        suggest(&Output::new(false)).await.unwrap();
    }
}
