//! Decoding raw aggregation buckets into the UI-ready facet model.

use crate::config::schema::{offer_path, subfield, CatalogConfig, FieldMapping, COMPUTED_SEPARATOR};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

/// One selectable facet value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetValue {
    pub raw_value: String,
    /// Display label, first character capitalized. `None` when the bucket
    /// carried no usable title or value.
    pub label: Option<String>,
    pub element_count: u64,
    /// Client-side ordering stabilizer, assigned in bucket order with a
    /// fixed step.
    pub sort_key: i64,
}

/// Decoded data of one facet: a resolved numeric range or an ordered value
/// list. Empty value lists are kept — a facet with no matching documents is
/// still a facet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FacetData {
    Range { min: Option<f64>, max: Option<f64> },
    Values(Vec<FacetValue>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetResult {
    pub field: String,
    pub title: String,
    pub data: FacetData,
}

/// Facet presentation model for one search response. Constructed fresh per
/// response, immutable once returned.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FacetPage {
    pub total: u64,
    pub facets: Vec<FacetResult>,
}

/// Turns a raw search response into a [`FacetPage`], driven by the same
/// facet-eligible field set the aggregation builder requests.
pub struct FacetDecoder {
    facet_fields: IndexMap<String, FieldMapping>,
}

impl FacetDecoder {
    pub fn new(config: &CatalogConfig) -> Self {
        FacetDecoder {
            facet_fields: config.facet_fields(),
        }
    }

    pub fn decode(&self, response: &Value) -> FacetPage {
        let Some(aggregated) = response
            .pointer("/aggregations/all_products")
            .filter(|v| v.as_object().is_some_and(|m| !m.is_empty()))
        else {
            return FacetPage::default();
        };

        let total = response
            .pointer("/hits/total/value")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let facets = self
            .facet_fields
            .values()
            .map(|item| decode_field(item, aggregated))
            .collect();

        FacetPage { total, facets }
    }
}

fn decode_field(item: &FieldMapping, aggregated: &Value) -> FacetResult {
    let data = if item.field_type.is_numeric() && !item.offer_scoped {
        decode_range(&item.name, aggregated)
    } else if item.offer_scoped {
        let code = offer_path(&item.name);
        let computed = format!("{code}.{}", subfield::COMPUTED);
        FacetData::Values(decode_buckets(buckets_at(
            aggregated,
            &[code.as_str(), code.as_str(), code.as_str(), computed.as_str()],
        )))
    } else if item.field_type == crate::config::schema::FieldType::Nested {
        let computed = format!("{}.{}", item.name, subfield::COMPUTED);
        FacetData::Values(decode_buckets(buckets_at(
            aggregated,
            &[item.name.as_str(), item.name.as_str(), computed.as_str()],
        )))
    } else {
        FacetData::Values(decode_buckets(buckets_at(
            aggregated,
            &[item.name.as_str(), item.name.as_str()],
        )))
    };

    FacetResult {
        field: item.name.clone(),
        title: item.title.clone(),
        data,
    }
}

fn decode_range(name: &str, aggregated: &Value) -> FacetData {
    let end = |suffix: &str| -> Option<f64> {
        let key = format!("{name}_{suffix}");
        aggregated
            .get(&key)
            .and_then(|filtered| filtered.get(&key))
            .and_then(|agg| agg.get("value"))
            .and_then(Value::as_f64)
    };
    FacetData::Range {
        min: end("from"),
        max: end("to"),
    }
}

/// Bucket array under the given key chain, empty when any level is missing.
fn buckets_at<'a>(aggregated: &'a Value, path: &[&str]) -> &'a [Value] {
    let mut node = aggregated;
    for key in path {
        match node.get(*key) {
            Some(next) => node = next,
            None => return &[],
        }
    }
    node.get("buckets")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Composite `value||title` buckets to facet values: dedup by raw value
/// (last bucket wins), sort keys stepped in bucket order, final order
/// case-insensitive natural by label.
fn decode_buckets(buckets: &[Value]) -> Vec<FacetValue> {
    let mut values: IndexMap<String, FacetValue> = IndexMap::new();
    let mut sort_key = 2;

    for bucket in buckets {
        let key = match bucket.get("key") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => continue,
        };
        let element_count = bucket
            .get("doc_count")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        sort_key += 2;

        let (raw_value, title) = match key.split_once(COMPUTED_SEPARATOR) {
            Some((value, title)) => (value, Some(title)),
            None => (key.as_str(), None),
        };
        let label_source = title.unwrap_or(raw_value);
        let label = if label_source.is_empty() {
            None
        } else {
            Some(capitalize_first(label_source))
        };

        values.insert(
            raw_value.to_string(),
            FacetValue {
                raw_value: raw_value.to_string(),
                label,
                element_count,
                sort_key,
            },
        );
    }

    let mut list: Vec<FacetValue> = values.into_values().collect();
    list.sort_by(|a, b| {
        natural_cmp(
            a.label.as_deref().unwrap_or(""),
            b.label.as_deref().unwrap_or(""),
        )
    });
    list
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Case-insensitive natural ordering: digit runs compare numerically, the
/// rest character by character.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let start_a = i;
            while i < a.len() && a[i].is_ascii_digit() {
                i += 1;
            }
            let start_b = j;
            while j < b.len() && b[j].is_ascii_digit() {
                j += 1;
            }
            let run_a: String = a[start_a..i].iter().collect();
            let run_b: String = b[start_b..j].iter().collect();
            let digits_a = run_a.trim_start_matches('0');
            let digits_b = run_b.trim_start_matches('0');
            let ordering = digits_a
                .len()
                .cmp(&digits_b.len())
                .then_with(|| digits_a.cmp(digits_b));
            if ordering != Ordering::Equal {
                return ordering;
            }
        } else {
            let ordering = a[i].cmp(&b[j]);
            if ordering != Ordering::Equal {
                return ordering;
            }
            i += 1;
            j += 1;
        }
    }

    (a.len() - i).cmp(&(b.len() - j))
}
