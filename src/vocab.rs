//! Fixed keyword tables behind intent classification and column roles.
//!
//! Everything here is immutable data. Classifier patterns in `intent` are
//! built from these slices so the vocabulary stays in one place.

pub const REGION_KEYWORDS: &[&str] = &[
    "region",
    "area",
    "zone",
    "territory",
    "location",
    "state",
    "country",
    "city",
];

/// Longest first so "northwest" is found before "west".
pub const REGION_VALUES: &[&str] = &[
    "northeast",
    "northwest",
    "southeast",
    "southwest",
    "central",
    "north",
    "south",
    "east",
    "west",
];

pub const PRODUCT_KEYWORDS: &[&str] = &["product", "item", "category", "brand", "model", "type"];

pub const DATE_KEYWORDS: &[&str] = &[
    "date", "month", "year", "quarter", "week", "day", "time", "period",
];

pub const SALES_KEYWORDS: &[&str] = &[
    "sales", "revenue", "income", "profit", "earnings", "amount", "value", "price",
];

pub const RANK_TOP_WORDS: &[&str] = &["top", "highest", "best", "maximum", "most", "largest"];

pub const RANK_BOTTOM_WORDS: &[&str] = &["bottom", "lowest", "worst", "minimum", "least", "smallest"];

pub const MONTHS: &[(&str, &str)] = &[
    ("january", "jan"),
    ("february", "feb"),
    ("march", "mar"),
    ("april", "apr"),
    ("may", "may"),
    ("june", "jun"),
    ("july", "jul"),
    ("august", "aug"),
    ("september", "sep"),
    ("october", "oct"),
    ("november", "nov"),
    ("december", "dec"),
];

pub const CHART_KINDS: &[&str] = &["bar", "line", "pie", "scatter", "area"];

/// Words dropped before token filtering and keyword search.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "of", "in", "on", "at", "to", "for", "from", "with", "by",
    "is", "are", "was", "were", "be", "me", "my", "i", "all", "any", "show", "find", "get",
    "give", "list", "display", "see", "view", "extract", "select", "filter", "search", "where",
    "which", "what", "that", "this", "these", "those", "whose", "who", "data", "records",
    "record", "rows", "row", "entries", "entry", "results", "please", "can", "you", "there",
    "have", "has", "want", "need", "only", "just", "some", "lookup", "look", "up", "everything",
];

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Regex alternation over keywords with their inflections: plurals, and
/// "-ies" for words ending in "y".
pub fn keyword_pattern(words: &[&str]) -> String {
    let mut alts = Vec::new();
    for w in words {
        alts.push(format!("{}s?", w));
        if let Some(stem) = w.strip_suffix('y') {
            alts.push(format!("{}ies", stem));
        }
    }
    format!(r"\b(?:{})\b", alts.join("|"))
}

pub fn word_pattern(words: &[&str]) -> String {
    format!(r"\b(?:{})\b", words.join("|"))
}

/// Split a lower-cased query into words, keeping `_`, `-` and inner dots.
pub fn query_words(query: &str) -> Vec<&str> {
    query
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-' || c == '.'))
        .map(|w| w.trim_matches(|c| c == '.' || c == '-'))
        .filter(|w| !w.is_empty())
        .collect()
}

/// First vocabulary entry (in table order) present as a whole word.
pub fn find_vocab_word<'a>(query: &str, vocabulary: &[&'a str]) -> Option<&'a str> {
    let words = query_words(query);
    vocabulary.iter().copied().find(|v| words.contains(v))
}
