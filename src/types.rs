use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Canonical filter parameters: filter key to decoded value, in insertion
/// order. Key order is significant — the query builder iterates it as-is, so
/// equal maps produce identical query trees.
pub type FilterParams = IndexMap<String, FilterValue>;

/// A single decoded filter constraint value.
///
/// `Int` holds range endpoints (`price_from`, `price_to`); `Text` a scalar
/// selection; `Many` a multi-selection (`color=red,blue`). A decoded
/// single-element list collapses to `Text` before it reaches the builders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Int(i64),
    Text(String),
    Many(Vec<String>),
}

impl FilterValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FilterValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FilterValue::Many(v) => Some(v),
            _ => None,
        }
    }

    /// Loose truthiness: zero, empty text, `"0"` and empty lists are falsy.
    pub fn truthy(&self) -> bool {
        match self {
            FilterValue::Int(n) => *n != 0,
            FilterValue::Text(s) => !s.is_empty() && s != "0",
            FilterValue::Many(v) => !v.is_empty(),
        }
    }

    /// Loose integer coercion: text keeps its leading numeric prefix, a
    /// non-empty list coerces to 1.
    pub fn coerced_int(&self) -> i64 {
        match self {
            FilterValue::Int(n) => *n,
            FilterValue::Text(s) => loose_int(s),
            FilterValue::Many(v) => i64::from(!v.is_empty()),
        }
    }

    pub fn coerced_float(&self) -> f64 {
        match self {
            FilterValue::Int(n) => *n as f64,
            FilterValue::Text(s) => loose_float(s),
            FilterValue::Many(v) => f64::from(u8::from(!v.is_empty())),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FilterValue::Int(n) => json!(n),
            FilterValue::Text(s) => json!(s),
            FilterValue::Many(v) => json!(v),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Int(n)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(v: Vec<String>) -> Self {
        FilterValue::Many(v)
    }
}

/// Integer value of the leading numeric prefix, 0 when there is none.
pub(crate) fn loose_int(s: &str) -> i64 {
    let s = s.trim_start();
    let mut end = 0;
    for (i, c) in s.char_indices() {
        if i == 0 && (c == '-' || c == '+') {
            end = c.len_utf8();
            continue;
        }
        if c.is_ascii_digit() {
            end = i + 1;
        } else {
            break;
        }
    }
    s[..end].parse().unwrap_or(0)
}

/// Float value of the leading numeric prefix, 0.0 when there is none.
pub(crate) fn loose_float(s: &str) -> f64 {
    let s = s.trim_start();
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        if i == 0 && (c == '-' || c == '+') {
            end = c.len_utf8();
            continue;
        }
        if c.is_ascii_digit() {
            end = i + 1;
        } else if c == '.' && !seen_dot {
            seen_dot = true;
            end = i + 1;
        } else {
            break;
        }
    }
    s[..end].parse().unwrap_or(0.0)
}

/// Which end of a range a `_from`/`_to` filter key addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    Gte,
    Lte,
}

impl RangeBound {
    pub fn key(self) -> &'static str {
        match self {
            RangeBound::Gte => "gte",
            RangeBound::Lte => "lte",
        }
    }
}

/// A boolean query clause tree. Clauses are plain data; [`QueryNode::to_json`]
/// renders the search engine's wire shapes. Every clause is independently
/// reusable — the aggregation builder rebuilds subtrees of the same tree with
/// individual keys excluded.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    Term {
        field: String,
        value: serde_json::Value,
    },
    Terms {
        field: String,
        values: Vec<String>,
    },
    Range {
        field: String,
        bound: RangeBound,
        value: serde_json::Value,
    },
    Nested {
        path: String,
        query: Box<QueryNode>,
    },
    Bool {
        must: Vec<QueryNode>,
    },
}

impl QueryNode {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            QueryNode::Term { field, value } => keyed("term", keyed(field, value.clone())),
            QueryNode::Terms { field, values } => keyed("terms", keyed(field, json!(values))),
            QueryNode::Range {
                field,
                bound,
                value,
            } => keyed("range", keyed(field, keyed(bound.key(), value.clone()))),
            QueryNode::Nested { path, query } => {
                json!({ "nested": { "path": path, "query": query.to_json() } })
            }
            QueryNode::Bool { must } => {
                let clauses: Vec<serde_json::Value> = must.iter().map(QueryNode::to_json).collect();
                json!({ "bool": { "must": clauses } })
            }
        }
    }
}

/// Single-entry JSON object, for wire shapes keyed by a field name.
pub(crate) fn keyed(key: &str, value: serde_json::Value) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), value);
    serde_json::Value::Object(map)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Paging, sorting and source selection around one search call.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub params: FilterParams,
    /// 1-based page number.
    pub page: usize,
    pub size: usize,
    pub sort: Vec<(String, SortDirection)>,
    /// `_source` field selection.
    pub select: Vec<String>,
}

pub const DEFAULT_PAGE_SIZE: usize = 10_000;

impl SearchRequest {
    pub fn new(params: FilterParams) -> Self {
        SearchRequest {
            params,
            page: 1,
            size: DEFAULT_PAGE_SIZE,
            sort: Vec::new(),
            select: vec!["catalogId".to_string()],
        }
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn add_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push((field.into(), direction));
        self
    }

    pub fn with_select(mut self, select: Vec<String>) -> Self {
        self.select = select;
        self
    }

    /// Result offset of the requested page.
    pub fn from(&self) -> usize {
        (self.page.max(1) - 1) * self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── FilterValue coercions ───────────────────────────────────────────

    #[test]
    fn truthy_text() {
        assert!(FilterValue::Text("red".into()).truthy());
        assert!(!FilterValue::Text("".into()).truthy());
        assert!(!FilterValue::Text("0".into()).truthy());
    }

    #[test]
    fn truthy_int_and_list() {
        assert!(FilterValue::Int(5).truthy());
        assert!(!FilterValue::Int(0).truthy());
        assert!(FilterValue::Many(vec!["a".into()]).truthy());
        assert!(!FilterValue::Many(vec![]).truthy());
    }

    #[test]
    fn coerced_int_from_text_prefix() {
        assert_eq!(FilterValue::Text("40".into()).coerced_int(), 40);
        assert_eq!(FilterValue::Text("40cm".into()).coerced_int(), 40);
        assert_eq!(FilterValue::Text("abc".into()).coerced_int(), 0);
        assert_eq!(FilterValue::Text("-7x".into()).coerced_int(), -7);
    }

    #[test]
    fn coerced_int_from_list_presence() {
        assert_eq!(FilterValue::Many(vec!["a".into(), "b".into()]).coerced_int(), 1);
        assert_eq!(FilterValue::Many(vec![]).coerced_int(), 0);
    }

    #[test]
    fn coerced_float_from_text() {
        assert_eq!(FilterValue::Text("10.5".into()).coerced_float(), 10.5);
        assert_eq!(FilterValue::Text("10.5kg".into()).coerced_float(), 10.5);
        assert_eq!(FilterValue::Text("x".into()).coerced_float(), 0.0);
    }

    #[test]
    fn loose_int_edge_cases() {
        assert_eq!(loose_int(""), 0);
        assert_eq!(loose_int("  12"), 12);
        assert_eq!(loose_int("+3"), 3);
        assert_eq!(loose_int("-"), 0);
    }

    // ── QueryNode wire shapes ───────────────────────────────────────────

    #[test]
    fn term_wire_shape() {
        let node = QueryNode::Term {
            field: "color".into(),
            value: json!("red"),
        };
        assert_eq!(node.to_json(), json!({"term": {"color": "red"}}));
    }

    #[test]
    fn terms_wire_shape() {
        let node = QueryNode::Terms {
            field: "color".into(),
            values: vec!["red".into(), "blue".into()],
        };
        assert_eq!(node.to_json(), json!({"terms": {"color": ["red", "blue"]}}));
    }

    #[test]
    fn range_wire_shape() {
        let node = QueryNode::Range {
            field: "price".into(),
            bound: RangeBound::Gte,
            value: json!(100),
        };
        assert_eq!(node.to_json(), json!({"range": {"price": {"gte": 100}}}));
    }

    #[test]
    fn nested_wire_shape() {
        let node = QueryNode::Nested {
            path: "brand".into(),
            query: Box::new(QueryNode::Term {
                field: "brand.value".into(),
                value: json!("nike"),
            }),
        };
        assert_eq!(
            node.to_json(),
            json!({"nested": {"path": "brand", "query": {"term": {"brand.value": "nike"}}}})
        );
    }

    #[test]
    fn bool_wire_shape() {
        let node = QueryNode::Bool {
            must: vec![QueryNode::Term {
                field: "foto".into(),
                value: json!("Y"),
            }],
        };
        assert_eq!(
            node.to_json(),
            json!({"bool": {"must": [{"term": {"foto": "Y"}}]}})
        );
    }

    #[test]
    fn empty_bool_keeps_must_array() {
        let node = QueryNode::Bool { must: vec![] };
        assert_eq!(node.to_json(), json!({"bool": {"must": []}}));
    }

    // ── SearchRequest ───────────────────────────────────────────────────

    #[test]
    fn request_defaults() {
        let req = SearchRequest::new(FilterParams::new());
        assert_eq!(req.page, 1);
        assert_eq!(req.size, DEFAULT_PAGE_SIZE);
        assert_eq!(req.select, vec!["catalogId".to_string()]);
        assert_eq!(req.from(), 0);
    }

    #[test]
    fn request_offset_is_page_times_size() {
        let req = SearchRequest::new(FilterParams::new())
            .with_page(3)
            .with_size(20);
        assert_eq!(req.from(), 40);
    }

    #[test]
    fn sort_directions_serialize_lowercase() {
        assert_eq!(SortDirection::Asc.as_str(), "asc");
        assert_eq!(SortDirection::Desc.as_str(), "desc");
    }
}
