//! Fuzzy milestone lookup by title fragments.

use regex::RegexBuilder;

use crate::error::{Error, Result};
use crate::github::RawMilestone;

/// Kebab-case a title: words split on non-alphanumerics, lower-to-upper case
/// changes and the end of an acronym (`HTTPServer` -> `http-server`),
/// lowercased, joined with `-`. Digits stay attached (`V2` -> `v2`).
pub fn kebab_case(title: &str) -> String {
    let chars: Vec<char> = title.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    let mut prev_upper = false;

    for (i, &ch) in chars.iter().enumerate() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            prev_upper = false;
            continue;
        }
        if ch.is_uppercase() && !current.is_empty() {
            let next_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            if prev_lower || (prev_upper && next_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        prev_lower = ch.is_lowercase() || ch.is_numeric();
        prev_upper = ch.is_uppercase();
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }

    words.join("-")
}

/// True when every fragment occurs in the kebab-cased title, ignoring case.
pub fn matches_fragments(title: &str, fragments: &[String]) -> bool {
    let kebab = kebab_case(title);
    fragments.iter().all(|fragment| {
        RegexBuilder::new(&regex::escape(fragment))
            .case_insensitive(true)
            .build()
            .map(|re| re.is_match(&kebab))
            .unwrap_or(false)
    })
}

/// First milestone, in listing order, whose title matches every fragment.
pub fn find_milestone<'a>(
    milestones: &'a [RawMilestone],
    fragments: &[String],
) -> Result<&'a RawMilestone> {
    milestones
        .iter()
        .find(|m| matches_fragments(&m.title, fragments))
        .ok_or_else(|| Error::MilestoneNotFound(fragments.to_vec()))
}
