//! Rule-based category assignment.
//!
//! Every category scores the number of its patterns that match the lowercased
//! `"{command} {description}"` text. The strictly highest score wins; on a tie
//! the category declared first in the table keeps the lead. No match at all
//! yields [`OTHER_CATEGORY`].

use crate::{PatternTable, OTHER_CATEGORY};

/// Text the classifier matches against.
pub fn classification_text(command: &str, description: &str) -> String {
    format!("{command} {description}").to_lowercase()
}

/// Per-category scores in table order (zero scores included).
pub fn category_scores<'t>(
    command: &str,
    description: &str,
    table: &'t PatternTable,
) -> Vec<(&'t str, usize)> {
    let text = classification_text(command, description);
    table
        .iter()
        .map(|(category, patterns)| {
            let score = patterns.iter().filter(|p| p.is_match(&text)).count();
            (category, score)
        })
        .collect()
}

/// Assign exactly one category label.
pub fn classify(command: &str, description: &str, table: &PatternTable) -> String {
    let mut best: Option<(&str, usize)> = None;
    for (category, score) in category_scores(command, description, table) {
        if score == 0 {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((category, score)),
        }
    }

    best.map(|(category, _)| category.to_string())
        .unwrap_or_else(|| OTHER_CATEGORY.to_string())
}
