//! Storage form of habit lists.
//!
//! Lists are stored as JSON arrays so any habit name (commas, quotes, brackets,
//! separators) comes back exactly, in order, duplicates included.

use crate::error::AppResult;

/// Seed list for a user who has never tracked a habit.
pub const DEFAULT_HABITS: [&str; 3] = ["Meditate 10 min", "Drink 2L of water", "Exercise"];

pub fn default_habits() -> Vec<String> {
    DEFAULT_HABITS.iter().map(|h| h.to_string()).collect()
}

pub fn encode(habits: &[String]) -> AppResult<String> {
    Ok(serde_json::to_string(habits)?)
}

/// An empty column decodes to an empty list.
pub fn decode(raw: &str) -> AppResult<Vec<String>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(raw)?)
}
