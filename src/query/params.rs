//! Filter parameter decoding.
//!
//! Two inputs feed the canonical filter map: a slash-delimited filter path
//! (`/color-is-red-or-blue/price-from-100-to-500`) and a flat request
//! parameter map. Malformed tokens and unknown keys never fail — they simply
//! contribute no filter.

use crate::types::{loose_int, FilterParams, FilterValue};
use once_cell::sync::Lazy;
use regex::Regex;

/// Request parameter carrying the filter path when it is not passed directly.
pub const FILTER_PATH_PARAM: &str = "filter_path";
/// Request parameter carrying the section path when it is not passed directly.
pub const SECTION_PATH_PARAM: &str = "section_path";
/// Marker parameter of an AJAX filter refresh.
pub const AJAX_PARAM: &str = "ajax";

/// Listings without a photo are never searchable.
const PHOTO_FLAG_KEY: &str = "foto";
const PHOTO_FLAG_VALUE: &str = "Y";

static TOKEN_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-(from|to|is|or)-").expect("token separator regex"));

/// Split on the token separators, keeping each captured separator word as its
/// own piece: `price-from-100-to-500` → `[price, from, 100, to, 500]`.
fn split_keeping_separators<'a>(re: &Regex, token: &'a str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for caps in re.captures_iter(token) {
        let whole = caps.get(0).expect("match");
        pieces.push(&token[last..whole.start()]);
        pieces.push(caps.get(1).expect("separator word").as_str());
        last = whole.end();
    }
    pieces.push(&token[last..]);
    pieces
}

/// Decode a slash-delimited filter path into canonical filter parameters.
///
/// Token shapes: `slug-from-N[-to-M]` sets integer range endpoints,
/// `slug-to-M` the upper endpoint alone, `slug-is-v1-or-v2-or-…` a value
/// list. A single-element list collapses to a scalar. Tokens without a
/// recognized separator are skipped.
pub fn decode_filter_path(path: &str) -> FilterParams {
    let mut result = FilterParams::new();

    for token in path.split('/') {
        let pieces = split_keeping_separators(&TOKEN_SEPARATOR, token);
        let slug = pieces[0];

        if pieces.contains(&"from") && pieces.len() > 2 {
            result.insert(
                format!("{slug}_from"),
                FilterValue::Int(loose_int(pieces[2])),
            );
            if pieces.len() > 4 {
                result.insert(format!("{slug}_to"), FilterValue::Int(loose_int(pieces[4])));
            }
        } else if pieces.contains(&"to") {
            let raw = pieces.get(4).or_else(|| pieces.get(2)).copied().unwrap_or("");
            result.insert(format!("{slug}_to"), FilterValue::Int(loose_int(raw)));
        } else if pieces.contains(&"is") {
            let values: Vec<String> = pieces[2..]
                .iter()
                .filter(|piece| **piece != "or")
                .map(|piece| piece.to_string())
                .collect();
            result.insert(slug.to_string(), FilterValue::Many(values));
        }
    }

    collapse_singletons(&mut result);
    result
}

fn collapse_singletons(params: &mut FilterParams) {
    for value in params.values_mut() {
        if let FilterValue::Many(list) = value {
            if list.len() == 1 {
                *value = FilterValue::Text(list.remove(0));
            }
        }
    }
}

/// Decode a full request into canonical filter parameters.
///
/// An AJAX refresh carries its filters as request parameters directly (the
/// filter path is consulted only for the adult age-group coercion below);
/// otherwise the filter path wins. The section path contributes `category`
/// (last segment, when at least two are present and the request is not an
/// AJAX one) and `section` (first segment). Redundant range pairs — both
/// ends resolving to the same value — are pruned as "full range selected".
pub fn decode_request(
    filter_path: Option<&str>,
    section_path: Option<&str>,
    request: &FilterParams,
) -> FilterParams {
    let mut sections: Vec<String> = section_path
        .filter(|s| !s.is_empty())
        .or_else(|| {
            request
                .get(SECTION_PATH_PARAM)
                .and_then(FilterValue::as_text)
                .filter(|s| !s.is_empty())
        })
        .map(|s| s.split('/').map(str::to_string).collect())
        .unwrap_or_default();

    let mut result = if request.contains_key(AJAX_PARAM) {
        let mut kept: FilterParams = request
            .iter()
            .filter(|(_, value)| value.as_text() != Some("on"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        kept.shift_remove(AJAX_PARAM);

        let path = request
            .get(FILTER_PATH_PARAM)
            .and_then(FilterValue::as_text)
            .unwrap_or("");
        let decoded = decode_filter_path(path);
        // Adult age group pins the path-decoded gender and becomes a list.
        // Call-site business rule, kept exactly as-is.
        if decoded.get("age_group").and_then(FilterValue::as_text) == Some("adult") {
            if let Some(gender) = decoded.get("gender") {
                kept.insert("gender".to_string(), gender.clone());
                kept.insert(
                    "age_group".to_string(),
                    FilterValue::Many(vec!["adult".to_string()]),
                );
            }
        }
        kept
    } else if let Some(path) = filter_path.filter(|s| !s.is_empty()) {
        decode_filter_path(path)
    } else {
        let path = request
            .get(FILTER_PATH_PARAM)
            .and_then(FilterValue::as_text)
            .unwrap_or("");
        decode_filter_path(path)
    };

    result.shift_remove(SECTION_PATH_PARAM);
    result.shift_remove(FILTER_PATH_PARAM);

    let ajax_refresh = request.get(AJAX_PARAM).and_then(FilterValue::as_text) == Some("y");
    let category_set = result.get("category").is_some_and(FilterValue::truthy);
    if !category_set && sections.len() >= 2 && !ajax_refresh {
        if let Some(last) = sections.pop() {
            result.insert("category".to_string(), FilterValue::Text(last));
        }
    }
    if !sections.is_empty() {
        result.insert("section".to_string(), FilterValue::Text(sections.remove(0)));
    }

    prune_redundant_ranges(&mut result);

    if let Some(value) = result.get_mut("collection") {
        // Apostrophes were replaced at index time; mirror it on the way in.
        match value {
            FilterValue::Text(s) => *s = s.replace('\'', "_"),
            FilterValue::Many(list) => {
                for s in list.iter_mut() {
                    *s = s.replace('\'', "_");
                }
            }
            FilterValue::Int(_) => {}
        }
    }

    result.insert(
        PHOTO_FLAG_KEY.to_string(),
        FilterValue::Text(PHOTO_FLAG_VALUE.to_string()),
    );

    result
}

/// "Full range selected" equals "no filter": when `key` and `key_max` (or
/// `key` and `key_min`, with the matching `_to` pair also collapsed) resolve
/// to the same value, both keys are dropped.
fn prune_redundant_ranges(params: &mut FilterParams) {
    let keys: Vec<String> = params.keys().cloned().collect();
    let mut remove = Vec::new();

    let coerced = |params: &FilterParams, key: &str| -> i64 {
        params.get(key).map_or(0, FilterValue::coerced_int)
    };

    for key in &keys {
        let max_key = format!("{key}_max");
        if params.contains_key(&max_key) && coerced(params, &max_key) == coerced(params, key) {
            remove.push(key.clone());
            remove.push(max_key);
        }

        let min_key = format!("{key}_min");
        if params.contains_key(&min_key) && coerced(params, &min_key) == coerced(params, key) {
            let to_key = key.replace("_from", "_to");
            if coerced(params, &format!("{to_key}_max")) == coerced(params, &to_key) {
                remove.push(key.clone());
                remove.push(min_key);
            }
        }
    }

    for key in remove {
        params.shift_remove(&key);
    }
}
