//! Store tags.

/// Tags offered as checkboxes on the store form.
///
/// Stores may carry other tags (tags are free text), but the form only
/// offers these.
pub const TAG_CHOICES: &[&str] = &[
    "Wifi",
    "Open Late",
    "Family Friendly",
    "Vegetarian",
    "Licensed",
];

/// Trim tags, drop blanks and remove duplicates while keeping first-seen order.
#[must_use]
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !normalized.iter().any(|t| t == tag) {
            normalized.push(tag.to_owned());
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tags_trims_and_dedupes() {
        let tags = normalize_tags(["Wifi", " Open Late ", "", "Wifi", "  "]);
        assert_eq!(tags, vec!["Wifi".to_owned(), "Open Late".to_owned()]);
    }

    #[test]
    fn test_normalize_tags_keeps_custom_tags() {
        let tags = normalize_tags(vec!["Patio".to_owned()]);
        assert_eq!(tags, vec!["Patio".to_owned()]);
    }
}
