//! Search-query derivation from draft titles.
//!
//! Titles in both registries start with legal boilerplate ("Projekt ustawy o
//! zmianie ustawy ...") that matches nearly every process. Stripping it and
//! keeping the first few content words gives the title search a useful query.

/// Boilerplate prefixes stripped before building a query.
pub const DEFAULT_TITLE_PREFIXES: &[&str] = &[
    "Projekt ustawy o zmianie ustawy",
    "Ustawa o zmianie ustawy",
    "Projekt ustawy o",
    "Projekt ustawy",
    "Ustawa o",
];

pub const MIN_QUERY_WORDS: usize = 3;
pub const MAX_QUERY_WORDS: usize = 5;

/// Build a title-search query: strip the longest matching boilerplate prefix
/// (case-insensitive) and keep the first `words` remaining words.
///
/// `words` is clamped to `3..=5`. Returns `None` when nothing is left.
pub fn search_query<S: AsRef<str>>(title: &str, prefixes: &[S], words: usize) -> Option<String> {
    let title = title.trim();
    let rest = prefixes
        .iter()
        .filter_map(|p| strip_prefix_ci(title, p.as_ref()).map(|rest| (p.as_ref().len(), rest)))
        .max_by_key(|(len, _)| *len)
        .map(|(_, rest)| rest)
        .unwrap_or(title);

    let words = words.clamp(MIN_QUERY_WORDS, MAX_QUERY_WORDS);
    let query: Vec<&str> = rest.split_whitespace().take(words).collect();
    if query.is_empty() {
        None
    } else {
        Some(query.join(" "))
    }
}

/// Case-insensitive `strip_prefix` on whole words, safe for non-ASCII titles.
fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let mut rest = s.char_indices();
    for pc in prefix.chars() {
        let (_, sc) = rest.next()?;
        if !sc.to_lowercase().eq(pc.to_lowercase()) {
            return None;
        }
    }
    match rest.next() {
        None => Some(""),
        Some((i, c)) if c.is_whitespace() => Some(&s[i..]),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(title: &str) -> Option<String> {
        search_query(title, DEFAULT_TITLE_PREFIXES, 3)
    }

    #[test]
    fn strips_longest_prefix() {
        assert_eq!(
            query("Projekt ustawy o zmianie ustawy o podatku dochodowym od osób fizycznych")
                .as_deref(),
            Some("o podatku dochodowym")
        );
    }

    #[test]
    fn prefix_match_is_case_insensitive() {
        assert_eq!(
            query("PROJEKT USTAWY o ochronie zwierząt domowych").as_deref(),
            Some("ochronie zwierząt domowych")
        );
    }

    #[test]
    fn title_without_prefix_kept_whole() {
        assert_eq!(
            query("Rządowy projekt ustawy o szkolnictwie").as_deref(),
            Some("Rządowy projekt ustawy")
        );
    }

    #[test]
    fn word_count_clamped() {
        let title = "Ustawa o a b c d e f g";
        assert_eq!(search_query(title, DEFAULT_TITLE_PREFIXES, 1).as_deref(), Some("a b c"));
        assert_eq!(search_query(title, DEFAULT_TITLE_PREFIXES, 4).as_deref(), Some("a b c d"));
        assert_eq!(
            search_query(title, DEFAULT_TITLE_PREFIXES, 9).as_deref(),
            Some("a b c d e")
        );
    }

    #[test]
    fn nothing_left_after_prefix() {
        assert_eq!(query("Projekt ustawy"), None);
        assert_eq!(query(""), None);
    }

    #[test]
    fn prefix_must_end_on_word_boundary() {
        assert_eq!(
            query("Projekt ustawy obywatelskiej o referendum").as_deref(),
            Some("obywatelskiej o referendum")
        );
    }

    #[test]
    fn non_ascii_prefix_comparison() {
        assert_eq!(strip_prefix_ci("ŻÓŁW morski", "żółw"), Some(" morski"));
        assert_eq!(strip_prefix_ci("żo", "żółw"), None);
    }
}
