use crate::error::{FacetGateError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::path::Path;

/// Name of the repeated sub-catalog entity nested inside every catalog
/// document. Filter keys for its fields carry the `offers_` prefix, wire
/// paths the `offers.` prefix; the two rewrites are bijective.
pub const OFFER_ENTITY: &str = "offers";

const OFFER_FILTER_PREFIX: &str = "offers_";

/// Canonical sub-field names every facet-object field carries. Extra domain
/// sub-fields may follow these four.
pub mod subfield {
    pub const TITLE: &str = "title";
    pub const VALUE: &str = "value";
    pub const KEY_ID: &str = "keyId";
    pub const COMPUTED: &str = "computed";

    pub const CANONICAL: [&str; 4] = [TITLE, VALUE, KEY_ID, COMPUTED];
}

/// Separator inside the composite `computed` bucket key (`value||title`).
pub const COMPUTED_SEPARATOR: &str = "||";

/// Filter-map key for an offer-scoped field (`brand` → `offers_brand`).
pub fn offer_filter_key(name: &str) -> String {
    format!("{OFFER_FILTER_PREFIX}{name}")
}

/// Wire path for an offer-scoped field (`brand` → `offers.brand`).
pub fn offer_path(name: &str) -> String {
    format!("{OFFER_ENTITY}.{name}")
}

/// Base field name of an `offers_`-prefixed filter key, if it is one.
pub fn strip_offer_filter_key(key: &str) -> Option<&str> {
    key.strip_prefix(OFFER_FILTER_PREFIX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Boolean,
    Integer,
    Float,
    Keyword,
    Text,
    Date,
    Object,
    Nested,
}

impl FieldType {
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Float)
    }
}

/// One indexable/filterable catalog attribute.
///
/// Built once per catalog configuration at schema-load time and read-only
/// afterwards; safe to share across concurrent requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Participates in faceted aggregation.
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub searchable: bool,
    /// Lives inside the repeated sub-catalog entity. Forced true for
    /// sub-fields of the `offers` element during normalization.
    #[serde(default)]
    pub offer_scoped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalizer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    #[serde(default)]
    pub sort: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<FieldMapping>,
}

fn default_true() -> bool {
    true
}

impl FieldMapping {
    /// Facet-object sub-field lookup by canonical name.
    pub fn sub_field(&self, name: &str) -> Option<&FieldMapping> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Engine mapping body for this field: type plus pass-through options,
    /// with nested properties rendered recursively.
    fn mapping_body(&self) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        body.insert("type".to_string(), serde_json::to_value(self.field_type).unwrap_or_default());
        if !self.enabled {
            body.insert("enabled".to_string(), json!(false));
        }
        if let Some(normalizer) = &self.normalizer {
            body.insert("normalizer".to_string(), json!(normalizer));
        }
        if let Some(analyzer) = &self.analyzer {
            body.insert("analyzer".to_string(), json!(analyzer));
        }
        if !self.properties.is_empty() {
            let mut props = serde_json::Map::new();
            for sub in &self.properties {
                props.insert(sub.name.clone(), sub.mapping_body());
            }
            body.insert("properties".to_string(), serde_json::Value::Object(props));
        }
        serde_json::Value::Object(body)
    }
}

/// Declarative catalog schema: the index alias, pass-through engine settings
/// and the ordered field mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub settings: serde_json::Value,
    #[serde(default)]
    pub mapping: Vec<FieldMapping>,
}

impl CatalogConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FacetGateError::ConfigNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| FacetGateError::ConfigParse(e.to_string()))?;
        Self::from_json(value)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let config: CatalogConfig = serde_json::from_value(value)
            .map_err(|e| FacetGateError::ConfigParse(e.to_string()))?;
        config.finish()
    }

    fn finish(mut self) -> Result<Self> {
        self.normalize();
        self.validate()?;
        Ok(self)
    }

    fn normalize(&mut self) {
        for item in &mut self.mapping {
            if item.name == OFFER_ENTITY {
                for sub in &mut item.properties {
                    sub.offer_scoped = true;
                }
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(FacetGateError::InvalidSchema(
                "index name is required".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for item in &self.mapping {
            if !seen.insert(item.name.as_str()) {
                return Err(FacetGateError::InvalidSchema(format!(
                    "duplicate field name: {}",
                    item.name
                )));
            }
            validate_field(item, item.name == OFFER_ENTITY)?;
        }
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&FieldMapping> {
        self.mapping.iter().find(|item| item.name == name)
    }

    /// The sub-catalog entity element, when the schema declares one.
    pub fn offer_element(&self) -> Option<&FieldMapping> {
        self.field(OFFER_ENTITY)
    }

    /// Facet-eligible fields in declaration order: top-level filterable
    /// fields first, then filterable offer sub-fields. A same-named offer
    /// sub-field replaces the top-level entry.
    pub fn facet_fields(&self) -> IndexMap<String, FieldMapping> {
        let mut fields = IndexMap::new();
        for item in &self.mapping {
            if item.filterable {
                fields.insert(item.name.clone(), item.clone());
            }
        }
        if let Some(offers) = self.offer_element() {
            for sub in &offers.properties {
                if sub.filterable {
                    fields.insert(sub.name.clone(), sub.clone());
                }
            }
        }
        fields
    }

    /// `mappings.properties` body for index creation.
    pub fn mapping_properties(&self) -> serde_json::Value {
        let mut props = serde_json::Map::new();
        for item in &self.mapping {
            props.insert(item.name.clone(), item.mapping_body());
        }
        serde_json::Value::Object(props)
    }
}

fn validate_field(item: &FieldMapping, is_offer_container: bool) -> Result<()> {
    let mut seen = HashSet::new();
    for sub in &item.properties {
        if !seen.insert(sub.name.as_str()) {
            return Err(FacetGateError::InvalidSchema(format!(
                "duplicate sub-field name {} in {}",
                sub.name, item.name
            )));
        }
    }
    if item.field_type == FieldType::Nested && !is_offer_container {
        for required in subfield::CANONICAL {
            if item.sub_field(required).is_none() {
                return Err(FacetGateError::InvalidSchema(format!(
                    "nested field {} is missing sub-field {required}",
                    item.name
                )));
            }
        }
    }
    if is_offer_container {
        for sub in &item.properties {
            validate_field(sub, false)?;
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Facet-object field with the four canonical sub-fields.
    pub fn nested_field(name: &str, title: &str, filterable: bool) -> serde_json::Value {
        json!({
            "name": name,
            "title": title,
            "type": "nested",
            "filterable": filterable,
            "properties": [
                {"name": "title", "type": "keyword"},
                {"name": "value", "type": "keyword", "normalizer": "lowercase"},
                {"name": "keyId", "type": "keyword", "normalizer": "lowercase"},
                {"name": "computed", "type": "keyword", "normalizer": "lowercase"},
            ],
        })
    }

    /// Schema exercising every dispatch path: scalar keyword, numeric range,
    /// boolean, facet object, and an offer entity with a facet object inside.
    pub fn catalog() -> CatalogConfig {
        CatalogConfig::from_json(json!({
            "name": "products",
            "settings": {"number_of_shards": 1},
            "mapping": [
                {"name": "catalogId", "type": "integer"},
                {"name": "category", "title": "Category", "type": "keyword", "filterable": true},
                {"name": "color", "title": "Color", "type": "keyword", "filterable": true},
                {"name": "price", "title": "Price", "type": "float", "filterable": true},
                {"name": "foto", "type": "keyword"},
                {"name": "new_arrival", "title": "New", "type": "boolean"},
                nested_field("brand", "Brand", true),
                {
                    "name": "offers",
                    "type": "nested",
                    "properties": [
                        {"name": "size", "title": "Size", "type": "keyword", "filterable": false},
                        nested_field("fit", "Fit", true),
                    ],
                },
            ],
        }))
        .expect("fixture schema must be valid")
    }
}
