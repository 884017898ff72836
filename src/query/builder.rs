use crate::config::schema::{
    offer_path, strip_offer_filter_key, subfield, CatalogConfig, FieldMapping, FieldType,
    OFFER_ENTITY,
};
use crate::types::{FilterParams, FilterValue, QueryNode, RangeBound, SearchRequest};
use indexmap::IndexMap;
use serde_json::json;

/// Builds the boolean search query from canonical filter parameters.
///
/// Construction indexes the schema once (top-level fields by name, offer
/// sub-fields by base name); the instance is read-only afterwards and safe to
/// share across concurrent searches. Rebuilding per call is equally correct.
pub struct SearchBuilder {
    fields: IndexMap<String, FieldMapping>,
    offer_fields: IndexMap<String, FieldMapping>,
}

impl SearchBuilder {
    pub fn new(config: &CatalogConfig) -> Self {
        let mut fields = IndexMap::new();
        let mut offer_fields = IndexMap::new();
        for item in &config.mapping {
            if item.name == OFFER_ENTITY {
                for sub in &item.properties {
                    offer_fields.insert(sub.name.clone(), sub.clone());
                }
            }
            fields.insert(item.name.clone(), item.clone());
        }
        SearchBuilder {
            fields,
            offer_fields,
        }
    }

    /// Full wire query document: `{"query": {"bool": {"must": [...]}}}`.
    pub fn build(&self, params: &FilterParams) -> serde_json::Value {
        json!({ "query": self.bool_query(params).to_json() })
    }

    /// Full search body with paging, sort and `_source` selection.
    pub fn search_body(&self, request: &SearchRequest) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        body.insert("from".to_string(), json!(request.from()));
        body.insert("size".to_string(), json!(request.size));
        if !request.sort.is_empty() {
            let sort: Vec<serde_json::Value> = request
                .sort
                .iter()
                .map(|(field, direction)| crate::types::keyed(field, json!(direction.as_str())))
                .collect();
            body.insert("sort".to_string(), json!(sort));
        }
        body.insert("_source".to_string(), json!(request.select));
        body.insert("query".to_string(), self.bool_query(&request.params).to_json());
        serde_json::Value::Object(body)
    }

    /// Boolean "must" tree over the filter map, in key insertion order.
    ///
    /// `offers_`-prefixed keys resolve against the offer sub-fields and wrap
    /// their clause in a nested query scoped to the entity; every other key
    /// has its `_from`/`_to` suffix stripped and resolves against the
    /// top-level fields. Unknown keys are skipped — stored filter state may
    /// lag behind the schema.
    pub fn bool_query(&self, params: &FilterParams) -> QueryNode {
        let mut must = Vec::new();

        for (key, value) in params {
            let bound = range_bound(key);

            if let Some(base) = strip_offer_filter_key(key) {
                if let Some(item) = self.offer_fields.get(base) {
                    // Offer clauses never carry range bounds.
                    if let Some(clause) = field_clause(item, &offer_path(base), value, None) {
                        must.push(QueryNode::Nested {
                            path: OFFER_ENTITY.to_string(),
                            query: Box::new(clause),
                        });
                    }
                } else {
                    tracing::debug!(%key, "offer filter key does not resolve, skipped");
                }
            }

            let base = clean_key(key);
            let Some(item) = self.fields.get(base) else {
                continue;
            };
            if let Some(clause) = field_clause(item, base, value, bound) {
                must.push(clause);
            }
        }

        QueryNode::Bool { must }
    }
}

/// Range end addressed by the key suffix, when there is one.
fn range_bound(key: &str) -> Option<RangeBound> {
    if key.ends_with("_from") {
        Some(RangeBound::Gte)
    } else if key.ends_with("_to") {
        Some(RangeBound::Lte)
    } else {
        None
    }
}

/// Key with any `_from`/`_to` suffix stripped.
fn clean_key(key: &str) -> &str {
    key.strip_suffix("_from")
        .or_else(|| key.strip_suffix("_to"))
        .unwrap_or(key)
}

/// Type-directed clause for one resolved field. Returns `None` for types
/// that cannot be filtered on (plain objects).
fn field_clause(
    item: &FieldMapping,
    key: &str,
    value: &FilterValue,
    bound: Option<RangeBound>,
) -> Option<QueryNode> {
    match item.field_type {
        FieldType::Boolean => Some(QueryNode::Term {
            field: key.to_string(),
            value: json!(value.truthy()),
        }),
        FieldType::Integer | FieldType::Date => Some(match bound {
            Some(bound) => QueryNode::Range {
                field: key.to_string(),
                bound,
                value: json!(value.coerced_int()),
            },
            None => QueryNode::Term {
                field: key.to_string(),
                value: json!(value.coerced_int()),
            },
        }),
        FieldType::Float => Some(match bound {
            Some(bound) => QueryNode::Range {
                field: key.to_string(),
                bound,
                value: json!(value.coerced_float()),
            },
            None => QueryNode::Term {
                field: key.to_string(),
                value: json!(value.coerced_float()),
            },
        }),
        FieldType::Keyword | FieldType::Text => Some(match value {
            FilterValue::Many(values) => QueryNode::Terms {
                field: key.to_string(),
                values: values.clone(),
            },
            other => QueryNode::Term {
                field: key.to_string(),
                value: other.to_json(),
            },
        }),
        FieldType::Nested => {
            let value_field = format!("{key}.{}", subfield::VALUE);
            let inner = match value {
                FilterValue::Many(values) => QueryNode::Terms {
                    field: value_field,
                    values: values.clone(),
                },
                other => QueryNode::Term {
                    field: value_field,
                    value: other.to_json(),
                },
            };
            Some(QueryNode::Nested {
                path: key.to_string(),
                query: Box::new(inner),
            })
        }
        FieldType::Object => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::fixtures;
    use crate::types::SortDirection;

    fn builder() -> SearchBuilder {
        SearchBuilder::new(&fixtures::catalog())
    }

    fn params(entries: &[(&str, FilterValue)]) -> FilterParams {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    // ── per-type dispatch ───────────────────────────────────────────────

    #[test]
    fn keyword_scalar_becomes_term() {
        let query = builder().bool_query(&params(&[("color", "red".into())]));
        assert_eq!(
            query.to_json(),
            serde_json::json!({"bool": {"must": [{"term": {"color": "red"}}]}})
        );
    }

    #[test]
    fn keyword_list_becomes_terms() {
        let value = FilterValue::Many(vec!["red".into(), "blue".into()]);
        let query = builder().bool_query(&params(&[("color", value)]));
        assert_eq!(
            query.to_json(),
            serde_json::json!({"bool": {"must": [{"terms": {"color": ["red", "blue"]}}]}})
        );
    }

    #[test]
    fn numeric_range_suffixes_become_bounds() {
        let query = builder().bool_query(&params(&[
            ("price_from", FilterValue::Int(10)),
            ("price_to", FilterValue::Int(90)),
        ]));
        assert_eq!(
            query.to_json(),
            serde_json::json!({"bool": {"must": [
                {"range": {"price": {"gte": 10.0}}},
                {"range": {"price": {"lte": 90.0}}},
            ]}})
        );
    }

    #[test]
    fn numeric_without_suffix_is_exact_match() {
        let query = builder().bool_query(&params(&[("catalogId", FilterValue::Int(7))]));
        assert_eq!(
            query.to_json(),
            serde_json::json!({"bool": {"must": [{"term": {"catalogId": 7}}]}})
        );
    }

    #[test]
    fn boolean_matches_on_truthiness() {
        let query = builder().bool_query(&params(&[("new_arrival", "1".into())]));
        assert_eq!(
            query.to_json(),
            serde_json::json!({"bool": {"must": [{"term": {"new_arrival": true}}]}})
        );
        let query = builder().bool_query(&params(&[("new_arrival", "0".into())]));
        assert_eq!(
            query.to_json(),
            serde_json::json!({"bool": {"must": [{"term": {"new_arrival": false}}]}})
        );
    }

    #[test]
    fn facet_object_wraps_nested_on_value_sub_field() {
        let query = builder().bool_query(&params(&[("brand", "nike".into())]));
        assert_eq!(
            query.to_json(),
            serde_json::json!({"bool": {"must": [
                {"nested": {"path": "brand", "query": {"term": {"brand.value": "nike"}}}}
            ]}})
        );
    }

    #[test]
    fn facet_object_list_uses_terms() {
        let value = FilterValue::Many(vec!["nike".into(), "puma".into()]);
        let query = builder().bool_query(&params(&[("brand", value)]));
        assert_eq!(
            query.to_json(),
            serde_json::json!({"bool": {"must": [
                {"nested": {"path": "brand", "query": {"terms": {"brand.value": ["nike", "puma"]}}}}
            ]}})
        );
    }

    // ── offer routing ───────────────────────────────────────────────────

    #[test]
    fn offer_key_double_nests_with_rewritten_path() {
        let query = builder().bool_query(&params(&[("offers_fit", "slim".into())]));
        assert_eq!(
            query.to_json(),
            serde_json::json!({"bool": {"must": [
                {"nested": {"path": "offers", "query":
                    {"nested": {"path": "offers.fit", "query":
                        {"term": {"offers.fit.value": "slim"}}}}}}
            ]}})
        );
    }

    #[test]
    fn offer_keyword_key_single_nests() {
        let query = builder().bool_query(&params(&[("offers_size", "40".into())]));
        assert_eq!(
            query.to_json(),
            serde_json::json!({"bool": {"must": [
                {"nested": {"path": "offers", "query": {"term": {"offers.size": "40"}}}}
            ]}})
        );
    }

    #[test]
    fn unresolvable_offer_key_is_skipped() {
        let query = builder().bool_query(&params(&[("offers_ghost", "x".into())]));
        assert_eq!(query, QueryNode::Bool { must: vec![] });
    }

    // ── tolerance and determinism ───────────────────────────────────────

    #[test]
    fn unknown_key_is_skipped() {
        let query = builder().bool_query(&params(&[
            ("mystery", "x".into()),
            ("color", "red".into()),
        ]));
        let QueryNode::Bool { must } = &query else {
            panic!("expected bool");
        };
        assert_eq!(must.len(), 1);
    }

    #[test]
    fn clause_order_follows_key_insertion_order() {
        let input = params(&[
            ("color", "red".into()),
            ("price_from", FilterValue::Int(10)),
        ]);
        let first = builder().bool_query(&input);
        let second = builder().bool_query(&input);
        assert_eq!(first, second);
        let QueryNode::Bool { must } = first else {
            panic!("expected bool");
        };
        assert!(matches!(&must[0], QueryNode::Term { field, .. } if field == "color"));
        assert!(matches!(&must[1], QueryNode::Range { field, .. } if field == "price"));
    }

    #[test]
    fn empty_params_build_empty_must() {
        let query = builder().bool_query(&FilterParams::new());
        assert_eq!(query, QueryNode::Bool { must: vec![] });
    }

    // ── wire envelopes ──────────────────────────────────────────────────

    #[test]
    fn build_wraps_query_document() {
        let doc = builder().build(&params(&[("color", "red".into())]));
        assert_eq!(
            doc,
            serde_json::json!({"query": {"bool": {"must": [{"term": {"color": "red"}}]}}})
        );
    }

    #[test]
    fn search_body_carries_paging_sort_and_source() {
        let request = SearchRequest::new(params(&[("color", "red".into())]))
            .with_page(2)
            .with_size(24)
            .add_sort("price", SortDirection::Asc);
        let body = builder().search_body(&request);
        assert_eq!(body["from"], 24);
        assert_eq!(body["size"], 24);
        assert_eq!(body["sort"], serde_json::json!([{"price": "asc"}]));
        assert_eq!(body["_source"], serde_json::json!(["catalogId"]));
        assert!(body["query"]["bool"]["must"].is_array());
    }

    #[test]
    fn search_body_omits_sort_when_unset() {
        let request = SearchRequest::new(FilterParams::new());
        let body = builder().search_body(&request);
        assert!(body.get("sort").is_none());
    }
}
