//! Column discovery shared by every executor.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref GROUP_BY_REGEX: Regex = Regex::new(r"\b(?:by|per|for each)\s+([a-z0-9_]+)").unwrap();
}

/// First header (in column order) containing any keyword as a
/// case-insensitive substring.
pub fn find_column(headers: &[String], keywords: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        let header = header.to_lowercase();
        keywords.iter().any(|kw| header.contains(&kw.to_lowercase()))
    })
}

/// `find_column` restricted to the given column indices.
pub fn find_column_in(headers: &[String], among: &[usize], keywords: &[&str]) -> Option<usize> {
    among
        .iter()
        .copied()
        .find(|&i| find_column(&headers[i..=i], keywords).is_some())
}

/// First candidate header that appears literally in the query.
pub fn find_mentioned_column<'a, I>(query: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let query = query.to_lowercase();
    candidates
        .into_iter()
        .find(|candidate| !candidate.is_empty() && query.contains(&candidate.to_lowercase()))
}

/// `find_mentioned_column` restricted to the given column indices, returning
/// the index of the match.
pub fn find_mentioned_index(query: &str, headers: &[String], among: &[usize]) -> Option<usize> {
    let name = find_mentioned_column(query, among.iter().map(|&i| headers[i].as_str()))?;
    among.iter().copied().find(|&i| headers[i] == name)
}

/// Resolve a single query word to a column: exact header, then a header
/// containing the word, then a header the word contains ("regions").
pub fn resolve_word(word: &str, headers: &[String]) -> Option<usize> {
    if word.is_empty() {
        return None;
    }
    let exact = headers.iter().position(|h| h == word);
    if exact.is_some() || word.len() < 3 {
        return exact;
    }
    find_column(headers, &[word])
        .or_else(|| headers.iter().position(|h| h.len() >= 3 && word.contains(h.as_str())))
}

/// Resolve the tail of a phrase to a column, preferring the longest
/// trailing run of up to three words that names a header exactly.
pub fn resolve_column_phrase(phrase: &str, headers: &[String]) -> Option<usize> {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    let last = *words.last()?;
    for n in (1..=words.len().min(3)).rev() {
        let candidate = words[words.len() - n..].join(" ");
        if let Some(i) = headers.iter().position(|h| *h == candidate) {
            return Some(i);
        }
    }
    resolve_word(last, headers)
}

/// Column named by a `by <column>` / `per <column>` suffix, if any.
pub fn group_by_column(query: &str, headers: &[String]) -> Option<usize> {
    let caps = GROUP_BY_REGEX.captures(query)?;
    let word = caps.get(1)?;
    let rest = &query[word.start()..];
    let by_prefix = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| rest.starts_with(h.as_str()))
        .max_by_key(|(_, h)| h.len())
        .map(|(i, _)| i);
    let resolved = by_prefix.or_else(|| resolve_word(word.as_str(), headers));
    if resolved.is_none() {
        log::debug!("group column `{}` matches no header", word.as_str());
    }
    resolved
}
