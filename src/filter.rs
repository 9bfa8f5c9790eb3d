use regex::Regex;

use crate::record::{KeyFilterSpec, StructuredRecord};

/// Split each line by a regex, keeping only splits with exactly `parts`
/// fields; lines with any other arity are dropped silently. Without a
/// pattern, every line passes through as a single-field row.
pub fn split<'a, I>(
    pattern: Option<&'a Regex>,
    lines: I,
    parts: usize,
) -> impl Iterator<Item = Vec<String>> + 'a
where
    I: Iterator<Item = String> + 'a,
{
    lines.filter_map(move |line| match pattern {
        Some(re) => {
            let fields: Vec<String> = re.split(&line).map(str::to_string).collect();
            (fields.len() == parts).then_some(fields)
        }
        None => Some(vec![line]),
    })
}

/// Keep the lines where any pattern finds a match (substring search, not full
/// match). An empty pattern list is the identity.
pub fn grep<'a, I>(lines: I, patterns: &'a [Regex]) -> impl Iterator<Item = String> + 'a
where
    I: Iterator<Item = String> + 'a,
{
    lines.filter(move |line| patterns.is_empty() || patterns.iter().any(|re| re.is_match(line)))
}

/// Keep the structured records matching the key filter spec.
pub fn filter_by_keys<'a, I>(
    records: I,
    spec: &'a KeyFilterSpec,
) -> impl Iterator<Item = StructuredRecord> + 'a
where
    I: Iterator<Item = StructuredRecord> + 'a,
{
    records.filter(move |record| spec.matches(record))
}
