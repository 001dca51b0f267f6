//! Ranking of existing shortlinks by similarity to a path that did not
//! resolve.

use crate::model::Shortlink;
use std::collections::HashMap;

/// Number of suggestions shown on a miss.
pub const DEFAULT_SUGGESTIONS: usize = 20;

/// Orders `links` by Damerau–Levenshtein distance between `path` and each
/// `from`, keeping input order among equal distances, and returns at most
/// `limit` of them.
///
/// This is a linear scan over every link, fine for a few thousand entries.
pub fn rank(links: Vec<Shortlink>, path: &str, limit: usize) -> Vec<Shortlink> {
    let mut scored: Vec<(usize, Shortlink)> = links
        .into_iter()
        .map(|link| (damerau_levenshtein(path, &link.from), link))
        .collect();

    // sort_by_key is stable
    scored.sort_by_key(|(score, _)| *score);
    scored.truncate(limit);
    scored.into_iter().map(|(_, link)| link).collect()
}

/// Edit distance with insertions, deletions, substitutions and transpositions
/// of adjacent characters (unrestricted variant).
pub fn damerau_levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());

    if n == 0 {
        return m;
    }
    if m == 0 {
        return n;
    }

    let max = n + m;
    let width = m + 2;
    // (n + 2) x (m + 2) matrix, row 0 and column 0 hold the sentinel `max`
    let mut d = vec![0usize; (n + 2) * width];
    let idx = |i: usize, j: usize| i * width + j;

    d[idx(0, 0)] = max;
    for i in 0..=n {
        d[idx(i + 1, 0)] = max;
        d[idx(i + 1, 1)] = i;
    }
    for j in 0..=m {
        d[idx(0, j + 1)] = max;
        d[idx(1, j + 1)] = j;
    }

    let mut last_row: HashMap<char, usize> = HashMap::new();

    for i in 1..=n {
        let mut last_match_col = 0;
        for j in 1..=m {
            let k = last_row.get(&b[j - 1]).copied().unwrap_or(0);
            let l = last_match_col;
            let cost = if a[i - 1] == b[j - 1] {
                last_match_col = j;
                0
            } else {
                1
            };

            let substitution = d[idx(i, j)] + cost;
            let insertion = d[idx(i + 1, j)] + 1;
            let deletion = d[idx(i, j + 1)] + 1;
            let transposition = d[idx(k, l)] + (i - k - 1) + 1 + (j - l - 1);

            d[idx(i + 1, j + 1)] = substitution
                .min(insertion)
                .min(deletion)
                .min(transposition);
        }
        last_row.insert(a[i - 1], i);
    }

    d[idx(n + 1, m + 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(names: &[&str]) -> Vec<Shortlink> {
        names
            .iter()
            .map(|name| Shortlink::new(*name, format!("https://example.com/{name}")))
            .collect()
    }

    fn names(links: &[Shortlink]) -> Vec<&str> {
        links.iter().map(|l| l.from.as_str()).collect()
    }

    #[test]
    fn distances() {
        assert_eq!(damerau_levenshtein("", ""), 0);
        assert_eq!(damerau_levenshtein("", "abc"), 3);
        assert_eq!(damerau_levenshtein("abc", ""), 3);
        assert_eq!(damerau_levenshtein("fre", "free"), 1);
        assert_eq!(damerau_levenshtein("fre", "frew"), 1);
        assert_eq!(damerau_levenshtein("fre", "frame"), 2);
        assert_eq!(damerau_levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn transpositions_cost_one() {
        assert_eq!(damerau_levenshtein("ab", "ba"), 1);
        assert_eq!(damerau_levenshtein("wiki", "wkii"), 1);
        // the unrestricted variant allows editing between transposed characters
        assert_eq!(damerau_levenshtein("ca", "abc"), 2);
    }

    #[test]
    fn ranks_by_distance_with_stable_ties() {
        let ranked = rank(links(&["frame", "free", "frew"]), "fre", DEFAULT_SUGGESTIONS);
        assert_eq!(names(&ranked), vec!["free", "frew", "frame"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let ranked = rank(links(&["frew", "free"]), "fre", DEFAULT_SUGGESTIONS);
        assert_eq!(names(&ranked), vec!["frew", "free"]);
    }

    #[test]
    fn truncates_to_limit() {
        let many: Vec<String> = (0..30).map(|i| format!("link{i:02}")).collect();
        let refs: Vec<&str> = many.iter().map(String::as_str).collect();

        let ranked = rank(links(&refs), "link", DEFAULT_SUGGESTIONS);
        assert_eq!(ranked.len(), DEFAULT_SUGGESTIONS);

        assert!(rank(Vec::new(), "link", DEFAULT_SUGGESTIONS).is_empty());
    }

    #[test]
    fn unicode_counts_characters() {
        assert_eq!(damerau_levenshtein("café", "cafe"), 1);
    }
}
