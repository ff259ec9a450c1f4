//! Emoji suggestions for notable days, shown by the composer.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::Serialize;

pub const PAYDAY: u32 = 23;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub label: &'static str,
    pub emojis: &'static [&'static str],
    pub reason: &'static str,
}

const PAYDAY_RECOMMENDATION: Recommendation = Recommendation {
    label: "Payday 💰",
    emojis: &["💰", "💸", "💳", "🥳", "🍖"],
    reason: "Treat your teammates to something tasty!",
};

const FRIDAY_RECOMMENDATION: Recommendation = Recommendation {
    label: "Friday night!",
    emojis: &["💃", "🕺", "🍻", "🚗", "⛺"],
    reason: "Time to get ready for the weekend!",
};

// (month, day) -> recommendation
const FIXED_DAYS: &[((u32, u32), Recommendation)] = &[
    (
        (1, 1),
        Recommendation {
            label: "New Year's Day",
            emojis: &["☀️", "🌅", "🎍", "🧧"],
            reason: "Happy new year!",
        },
    ),
    (
        (2, 14),
        Recommendation {
            label: "Valentine's Day",
            emojis: &["🍫", "💝", "🎁", "🍭"],
            reason: "Have a sweet day!",
        },
    ),
    (
        (3, 1),
        Recommendation {
            label: "Independence Movement Day",
            emojis: &["🇰🇷", "🙌", "🕯️", "🕊️"],
            reason: "Remembering March First.",
        },
    ),
    (
        (3, 14),
        Recommendation {
            label: "White Day",
            emojis: &["🍬", "🍭", "🤍", "🎁"],
            reason: "Share the love!",
        },
    ),
    (
        (4, 14),
        Recommendation {
            label: "Black Day",
            emojis: &["🍜", "🖤", "🥢"],
            reason: "Had your jajangmyeon yet?",
        },
    ),
    (
        (5, 1),
        Recommendation {
            label: "Labour Day",
            emojis: &["😴", "🏖️", "✈️", "🍺"],
            reason: "You work hard, get some rest!",
        },
    ),
    (
        (5, 5),
        Recommendation {
            label: "Children's Day",
            emojis: &["🎈", "🎡", "🎠", "🧸"],
            reason: "Be a kid again!",
        },
    ),
    (
        (5, 8),
        Recommendation {
            label: "Parents' Day",
            emojis: &["💐", "🌹", "👵", "👴"],
            reason: "Say thank you.",
        },
    ),
    (
        (5, 15),
        Recommendation {
            label: "Teachers' Day",
            emojis: &["🍎", "📝", "🏫", "💐"],
            reason: "With respect!",
        },
    ),
    (
        (6, 6),
        Recommendation {
            label: "Memorial Day",
            emojis: &["🇰🇷", "🙏", "🕯️"],
            reason: "We remember.",
        },
    ),
    (
        (7, 17),
        Recommendation {
            label: "Constitution Day",
            emojis: &["📜", "⚖️", "🇰🇷"],
            reason: "A day for the law.",
        },
    ),
    (
        (8, 15),
        Recommendation {
            label: "Liberation Day",
            emojis: &["🇰🇷", "✨", "🎆", "🕊️"],
            reason: "Celebrating liberation!",
        },
    ),
    (
        (10, 3),
        Recommendation {
            label: "National Foundation Day",
            emojis: &["🇰🇷", "☁️", "🐻", "🧄"],
            reason: "The day the sky opened!",
        },
    ),
    (
        (10, 9),
        Recommendation {
            label: "Hangul Day",
            emojis: &["📖", "✍️", "🇰🇷", "📜"],
            reason: "Hangul is love.",
        },
    ),
    (
        (11, 11),
        Recommendation {
            label: "Pepero Day",
            emojis: &["🍫", "🥖", "🎁", "❤️"],
            reason: "Stick snacks for everyone?",
        },
    ),
    (
        (12, 25),
        Recommendation {
            label: "Christmas",
            emojis: &["🎄", "🎅", "❄️", "🔔"],
            reason: "Merry Christmas!",
        },
    ),
    (
        (12, 31),
        Recommendation {
            label: "Year's End",
            emojis: &["🔚", "🎆", "🥂", "👏"],
            reason: "Thanks for a great year!",
        },
    ),
];

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The 23rd of the month, moved back to the previous weekday if it lands on a weekend.
pub fn payday(year: i32, month: u32) -> Option<NaiveDate> {
    let mut day = NaiveDate::from_ymd_opt(year, month, PAYDAY)?;
    while is_weekend(day) {
        day = day.checked_sub_days(Days::new(1))?;
    }
    Some(day)
}

/// Payday beats fixed calendar days, which beat Friday afternoon.
pub fn recommend(now: NaiveDateTime) -> Option<Recommendation> {
    let today = now.date();
    if payday(today.year(), today.month()) == Some(today) {
        return Some(PAYDAY_RECOMMENDATION);
    }

    if let Some((_, fixed)) = FIXED_DAYS
        .iter()
        .find(|((month, day), _)| *month == today.month() && *day == today.day())
    {
        return Some(fixed.clone());
    }

    if today.weekday() == Weekday::Fri && now.hour() >= 13 {
        return Some(FRIDAY_RECOMMENDATION);
    }

    None
}
