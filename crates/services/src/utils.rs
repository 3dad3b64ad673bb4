//! Small helpers shared by services.

use std::collections::HashSet;

/// Trims mention names, drops blanks and duplicates. First occurrence wins.
pub fn filter_mentions<I, S>(mentions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    mentions
        .into_iter()
        .filter_map(|mention| {
            let mention = mention.as_ref().trim();
            (!mention.is_empty() && seen.insert(mention.to_string())).then(|| mention.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mentions_are_unique_and_trimmed() {
        let mentions = filter_mentions(["alice", " bob ", "", "alice", "bob", "  "]);
        assert_eq!(mentions, vec!["alice".to_string(), "bob".to_string()]);
    }
}
