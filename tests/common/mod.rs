use facetgate::CatalogConfig;
use serde_json::json;

#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn facet_object(name: &str, title: &str) -> serde_json::Value {
    json!({
        "name": name,
        "title": title,
        "type": "nested",
        "filterable": true,
        "properties": [
            {"name": "title", "type": "keyword"},
            {"name": "value", "type": "keyword", "normalizer": "lowercase"},
            {"name": "keyId", "type": "keyword", "normalizer": "lowercase"},
            {"name": "computed", "type": "keyword", "normalizer": "lowercase"},
        ],
    })
}

/// Catalog covering every dispatch path: plain keyword and numeric facets,
/// a facet object, and an offer entity with a facet object inside.
pub fn catalog_config() -> CatalogConfig {
    CatalogConfig::from_json(json!({
        "name": "products",
        "settings": {"number_of_shards": 1},
        "mapping": [
            {"name": "catalogId", "type": "integer"},
            {"name": "section", "type": "keyword"},
            {"name": "category", "title": "Category", "type": "keyword", "filterable": true},
            {"name": "color", "title": "Color", "type": "keyword", "filterable": true},
            {"name": "price", "title": "Price", "type": "float", "filterable": true},
            {"name": "foto", "type": "keyword"},
            facet_object("brand", "Brand"),
            {
                "name": "offers",
                "type": "nested",
                "properties": [
                    {"name": "size", "title": "Size", "type": "keyword"},
                    facet_object("fit", "Fit"),
                ],
            },
        ],
    }))
    .expect("test catalog config must be valid")
}
