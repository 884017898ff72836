use crate::config::schema::{
    offer_filter_key, offer_path, subfield, CatalogConfig, FieldMapping, FieldType, OFFER_ENTITY,
};
use crate::query::builder::SearchBuilder;
use crate::types::{keyed, FilterParams, QueryNode};
use indexmap::IndexMap;
use serde_json::json;

/// Term buckets returned per facet. No facet-value pagination in this
/// version.
pub const FACET_BUCKET_SIZE: usize = 1000;

const RANGE_BOTTOM_SUFFIX: &str = "from";
const RANGE_TOP_SUFFIX: &str = "to";

/// Type-specific aggregation body nested inside a facet's filter
/// aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationBody {
    Min { field: String },
    Max { field: String },
    Terms { field: String, size: usize },
    Nested {
        path: String,
        aggs: Vec<(String, AggregationBody)>,
    },
}

impl AggregationBody {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AggregationBody::Min { field } => json!({ "min": { "field": field } }),
            AggregationBody::Max { field } => json!({ "max": { "field": field } }),
            AggregationBody::Terms { field, size } => {
                json!({ "terms": { "field": field, "size": size } })
            }
            AggregationBody::Nested { path, aggs } => {
                let mut children = serde_json::Map::new();
                for (name, body) in aggs {
                    children.insert(name.clone(), body.to_json());
                }
                json!({ "nested": { "path": path }, "aggs": children })
            }
        }
    }
}

/// One named facet aggregation: a filter aggregation re-applying every other
/// active filter, wrapping the field's own aggregation body.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationRequest {
    pub name: String,
    pub filter: QueryNode,
    pub body: AggregationBody,
}

impl AggregationRequest {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "filter": self.filter.to_json(),
            "aggs": keyed(&self.name, self.body.to_json()),
        })
    }
}

/// Builds the faceted-aggregation request for every facet-eligible field.
///
/// Each facet is wrapped in a filter aggregation whose query is the full
/// boolean tree with that field's own constraint removed, so its counts
/// answer "what would match if I cleared only this facet". All facets sit
/// under one `global` bucket and are therefore scoped only by their own
/// filter aggregation, not by the enclosing query.
pub struct AggregationBuilder {
    search: SearchBuilder,
    facet_fields: IndexMap<String, FieldMapping>,
}

impl AggregationBuilder {
    pub fn new(config: &CatalogConfig) -> Self {
        AggregationBuilder {
            search: SearchBuilder::new(config),
            facet_fields: config.facet_fields(),
        }
    }

    /// Full wire aggregation document.
    pub fn build(&self, params: &FilterParams) -> serde_json::Value {
        let mut aggs = serde_json::Map::new();
        for request in self.aggregations(params) {
            aggs.insert(request.name.clone(), request.to_json());
        }

        let mut all_products = serde_json::Map::new();
        all_products.insert("global".to_string(), json!({}));
        all_products.insert("aggs".to_string(), serde_json::Value::Object(aggs));

        json!({ "aggs": { "all_products": all_products } })
    }

    /// Named facet aggregations in schema order. Numeric fields produce two
    /// sibling entries (`<field>_from` min, `<field>_to` max), every other
    /// facet one.
    pub fn aggregations(&self, params: &FilterParams) -> Vec<AggregationRequest> {
        let mut requests = Vec::new();
        for item in self.facet_fields.values() {
            let entries = if item.offer_scoped {
                offer_entries(item)
            } else {
                type_entries(item, None)
            };
            for (name, body) in entries {
                let scoped = excluding_own_filter(params, item);
                requests.push(AggregationRequest {
                    name,
                    filter: self.search.bool_query(&scoped),
                    body,
                });
            }
        }
        requests
    }
}

/// The facet's own key(s) removed from the filter map. A plain key wins over
/// the `_from`/`_to` pair: when the scalar key is present the range keys are
/// left in place. That removal order is long-standing behavior the facet
/// counts depend on; see the pinning test below before changing it.
pub(crate) fn excluding_own_filter(params: &FilterParams, item: &FieldMapping) -> FilterParams {
    let mut scoped = params.clone();
    if scoped.shift_remove(&item.name).is_none() {
        scoped.shift_remove(&format!("{}_{RANGE_TOP_SUFFIX}", item.name));
        scoped.shift_remove(&format!("{}_{RANGE_BOTTOM_SUFFIX}", item.name));
    }
    if item.offer_scoped {
        scoped.shift_remove(&offer_filter_key(&item.name));
    }
    scoped
}

/// Aggregation entries for one field, dispatched by declared type. `key`
/// overrides the target path for sub-field recursion.
fn type_entries(item: &FieldMapping, key: Option<&str>) -> Vec<(String, AggregationBody)> {
    let key = key.unwrap_or(&item.name);
    match item.field_type {
        FieldType::Integer | FieldType::Float => vec![
            (
                format!("{key}_{RANGE_BOTTOM_SUFFIX}"),
                AggregationBody::Min { field: key.to_string() },
            ),
            (
                format!("{key}_{RANGE_TOP_SUFFIX}"),
                AggregationBody::Max { field: key.to_string() },
            ),
        ],
        FieldType::Nested => {
            let mut children = Vec::new();
            for sub in &item.properties {
                // title and value are carried by the composite computed key.
                if sub.name == subfield::TITLE || sub.name == subfield::VALUE {
                    continue;
                }
                children.extend(type_entries(sub, Some(&format!("{key}.{}", sub.name))));
            }
            vec![(
                key.to_string(),
                AggregationBody::Nested {
                    path: key.to_string(),
                    aggs: children,
                },
            )]
        }
        _ => vec![(
            key.to_string(),
            AggregationBody::Terms {
                field: key.to_string(),
                size: FACET_BUCKET_SIZE,
            },
        )],
    }
}

/// Entries for an offer-scoped facet: the body is double-wrapped in nested
/// aggregations (the repeated entity, then the sub-field), and only the
/// composite `computed` sub-field buckets.
fn offer_entries(item: &FieldMapping) -> Vec<(String, AggregationBody)> {
    let offer_key = offer_path(&item.name);

    let mut children = Vec::new();
    for sub in &item.properties {
        if sub.name != subfield::COMPUTED {
            continue;
        }
        children.extend(type_entries(sub, Some(&format!("{offer_key}.{}", sub.name))));
    }

    let inner = AggregationBody::Nested {
        path: offer_key.clone(),
        aggs: children,
    };
    let outer = AggregationBody::Nested {
        path: OFFER_ENTITY.to_string(),
        aggs: vec![(offer_key.clone(), inner)],
    };
    vec![(offer_key, outer)]
}
