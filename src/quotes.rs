use chrono::{Datelike, NaiveDate};

const QUOTES: [&str; 7] = [
    "Wellbeing is not a destination, it is a path.",
    "Every day is a new chance to look after yourself.",
    "Small habits today, big changes tomorrow.",
    "Your mental health is a priority, not a luxury.",
    "Be kind to yourself today.",
    "Consistency is the key to a routine that lasts.",
    "Breathe, focus, and keep going.",
];

/// Motivational line for the day; changes daily, repeats weekly-ish.
pub fn daily_quote(date: NaiveDate) -> &'static str {
    QUOTES[date.ordinal() as usize % QUOTES.len()]
}
