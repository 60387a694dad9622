//! Query intent classification.
//!
//! `ROUTES` is the precedence order: the first route whose predicate accepts
//! the normalized query decides both the intent and the executor. Queries no
//! route accepts fall through to a keyword search.

use crate::clause;
use crate::engine::Dataset;
use crate::error::Result;
use crate::executor;
use crate::result::QueryResult;
use crate::vocab::{
    DATE_KEYWORDS, MONTHS, PRODUCT_KEYWORDS, RANK_BOTTOM_WORDS, RANK_TOP_WORDS, REGION_KEYWORDS,
    REGION_VALUES, SALES_KEYWORDS, keyword_pattern, word_pattern,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Chart,
    Region,
    Product,
    Date,
    Sales,
    Ranking,
    Comparison,
    Aggregation,
    Filter,
    Sheet,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Chart => "chart",
            Intent::Region => "region",
            Intent::Product => "product",
            Intent::Date => "date",
            Intent::Sales => "sales",
            Intent::Ranking => "ranking",
            Intent::Comparison => "comparison",
            Intent::Aggregation => "aggregation",
            Intent::Filter => "filter",
            Intent::Sheet => "sheet",
            Intent::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Predicate = fn(&str) -> bool;
pub type Executor = fn(&Dataset, &str) -> Result<QueryResult>;

pub struct Route {
    pub intent: Intent,
    pub matches: Predicate,
    pub execute: Executor,
}

pub const ROUTES: &[Route] = &[
    Route { intent: Intent::Chart, matches: is_chart, execute: executor::chart::execute },
    Route { intent: Intent::Region, matches: is_region, execute: executor::lookup::region },
    Route { intent: Intent::Product, matches: is_product, execute: executor::lookup::product },
    Route { intent: Intent::Date, matches: is_date, execute: executor::lookup::date },
    Route { intent: Intent::Sales, matches: is_sales, execute: executor::sales::execute },
    Route { intent: Intent::Ranking, matches: is_ranking, execute: executor::ranking::execute },
    Route { intent: Intent::Comparison, matches: is_comparison, execute: executor::comparison::execute },
    Route { intent: Intent::Aggregation, matches: is_aggregation, execute: executor::aggregate::execute },
    Route { intent: Intent::Filter, matches: is_filter, execute: executor::filter::execute },
    Route { intent: Intent::Sheet, matches: is_sheet, execute: executor::unrouted_sheet },
];

pub static FALLBACK: Route = Route {
    intent: Intent::General,
    matches: |_| true,
    execute: executor::search::execute,
};

lazy_static! {
    static ref GROUPING_REGEX: Regex = Regex::new(r"\b(?:by|per|for each)\s+[a-z0-9_]+").unwrap();
    static ref CHART_REGEX: Regex =
        Regex::new(r"\b(?:charts?|graphs?|plots?|plotting|visuali[sz]e|visuali[sz]ation)\b").unwrap();
    static ref REGION_KEYWORD_REGEX: Regex = Regex::new(&keyword_pattern(REGION_KEYWORDS)).unwrap();
    static ref REGION_VALUE_REGEX: Regex = Regex::new(&word_pattern(REGION_VALUES)).unwrap();
    static ref PRODUCT_KEYWORD_REGEX: Regex = Regex::new(&keyword_pattern(PRODUCT_KEYWORDS)).unwrap();
    static ref DATE_KEYWORD_REGEX: Regex = Regex::new(&format!(
        r"{}|\b(?:daily|weekly|monthly|quarterly|yearly|annual)\b",
        keyword_pattern(DATE_KEYWORDS)
    ))
    .unwrap();
    static ref MONTH_REGEX: Regex = {
        let names: Vec<&str> = MONTHS.iter().flat_map(|(full, abbr)| [*full, *abbr]).collect();
        Regex::new(&word_pattern(&names)).unwrap()
    };
    static ref YEAR_REGEX: Regex = Regex::new(r"\b202[0-5]\b").unwrap();
    static ref QUARTER_REGEX: Regex = Regex::new(r"\bq[1-4]\b").unwrap();
    static ref SALES_KEYWORD_REGEX: Regex = Regex::new(&keyword_pattern(SALES_KEYWORDS)).unwrap();
    static ref RANK_REGEX: Regex = {
        let words: Vec<&str> = RANK_TOP_WORDS.iter().chain(RANK_BOTTOM_WORDS).copied().collect();
        Regex::new(&word_pattern(&words)).unwrap()
    };
    static ref COMPARISON_REGEX: Regex = Regex::new(
        r"\b(?:compare|compared|comparing|comparison|vs|versus|against|between|difference)\b"
    )
    .unwrap();
    static ref AGGREGATION_REGEX: Regex =
        Regex::new(r"\b(?:sum|total|average|avg|mean|count|max|min|aggregate)\b").unwrap();
    static ref FILTER_REGEX: Regex =
        Regex::new(r"\b(?:filter|where|show|find|get|extract|select)\b").unwrap();
    static ref SHEET_REGEX: Regex = Regex::new(r"\b(?:sheets?|worksheets?|tabs?)\b").unwrap();
}

pub fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Remove `by <column>` phrases so a grouping column is not mistaken for
/// the subject of a region/product/date lookup.
fn strip_grouping(query: &str) -> String {
    GROUPING_REGEX.replace_all(query, " ").into_owned()
}

pub fn is_chart(q: &str) -> bool {
    CHART_REGEX.is_match(q)
}

pub fn is_region(q: &str) -> bool {
    REGION_VALUE_REGEX.is_match(q) || REGION_KEYWORD_REGEX.is_match(&strip_grouping(q))
}

pub fn is_product(q: &str) -> bool {
    PRODUCT_KEYWORD_REGEX.is_match(&strip_grouping(q))
}

pub fn is_date(q: &str) -> bool {
    let q = strip_grouping(q);
    DATE_KEYWORD_REGEX.is_match(&q)
        || MONTH_REGEX.is_match(&q)
        || YEAR_REGEX.is_match(&q)
        || QUARTER_REGEX.is_match(&q)
}

/// A sales keyword claims the query only when no more specific operation
/// (ranking, comparison, a structured filter clause) is present.
pub fn is_sales(q: &str) -> bool {
    SALES_KEYWORD_REGEX.is_match(&strip_grouping(q))
        && !is_ranking(q)
        && !is_comparison(q)
        && !clause::has_operator(q)
}

pub fn is_ranking(q: &str) -> bool {
    RANK_REGEX.is_match(q)
}

pub fn is_comparison(q: &str) -> bool {
    COMPARISON_REGEX.is_match(q)
}

pub fn is_aggregation(q: &str) -> bool {
    AGGREGATION_REGEX.is_match(q)
}

pub fn is_filter(q: &str) -> bool {
    FILTER_REGEX.is_match(q) || clause::has_operator(q)
}

pub fn is_sheet(q: &str) -> bool {
    SHEET_REGEX.is_match(q)
}

pub fn route(query: &str) -> &'static Route {
    let q = normalize(query);
    ROUTES.iter().find(|r| (r.matches)(&q)).unwrap_or(&FALLBACK)
}

pub fn classify(query: &str) -> Intent {
    route(query).intent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_follow_documented_order() {
        let order: Vec<Intent> = ROUTES.iter().map(|r| r.intent).collect();
        assert_eq!(
            order,
            vec![
                Intent::Chart,
                Intent::Region,
                Intent::Product,
                Intent::Date,
                Intent::Sales,
                Intent::Ranking,
                Intent::Comparison,
                Intent::Aggregation,
                Intent::Filter,
                Intent::Sheet,
            ]
        );
    }

    #[test]
    fn first_match_wins() {
        assert_eq!(classify("bar chart of sales by region"), Intent::Chart);
        assert_eq!(classify("show west region data"), Intent::Region);
        assert_eq!(classify("compare west vs east sales"), Intent::Region);
        assert_eq!(classify("  Show Product WidgetA "), Intent::Product);
        assert_eq!(classify("sales in march 2024"), Intent::Date);
        assert_eq!(classify("sales in q3"), Intent::Date);
    }

    #[test]
    fn grouping_column_does_not_claim_lookup_intents() {
        assert_eq!(classify("average sales by region"), Intent::Sales);
        assert_eq!(classify("total units by product"), Intent::Aggregation);
        assert_eq!(classify("sum of units per month"), Intent::Aggregation);
    }

    #[test]
    fn sales_yields_to_specific_operations() {
        assert_eq!(classify("total sales"), Intent::Sales);
        assert_eq!(classify("top 1 sales"), Intent::Ranking);
        assert_eq!(classify("find records where sales > 100"), Intent::Filter);
        assert_eq!(classify("widgeta versus widgetb revenue"), Intent::Comparison);
    }

    #[test]
    fn remaining_intents() {
        assert_eq!(classify("bottom 3 units"), Intent::Ranking);
        assert_eq!(classify("compare widgeta and widgetb"), Intent::Comparison);
        assert_eq!(classify("average units"), Intent::Aggregation);
        assert_eq!(classify("units >= 5"), Intent::Filter);
        assert_eq!(classify("open the budget worksheet"), Intent::Sheet);
        assert_eq!(classify("widgeta"), Intent::General);
        assert_eq!(classify(""), Intent::General);
    }
}
