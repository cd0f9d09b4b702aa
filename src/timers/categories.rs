use std::collections::HashSet;

use super::models::CategoryOption;

/// Combine label lists: trim each label, drop blanks, and keep the first
/// occurrence of each label compared case-insensitively.
pub fn merge_category_labels<I, L, S>(sources: I) -> Vec<String>
where
    I: IntoIterator<Item = L>,
    L: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for label in sources.into_iter().flatten() {
        let trimmed = label.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            merged.push(trimmed.to_string());
        }
    }

    merged
}

pub fn category_options<S: AsRef<str>>(labels: &[S]) -> Vec<CategoryOption> {
    labels
        .iter()
        .map(|label| CategoryOption::from_label(label.as_ref()))
        .collect()
}

/// Case-insensitive lookup of `candidate` among `labels`.
pub fn find_label<'a, S: AsRef<str>>(labels: &'a [S], candidate: &str) -> Option<&'a str> {
    let wanted = candidate.trim().to_lowercase();
    labels
        .iter()
        .map(|label| label.as_ref())
        .find(|label| label.trim().to_lowercase() == wanted)
}
