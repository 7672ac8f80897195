//! Item search behind the relationship picker

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::storage::SqliteStore;
use crate::Result;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static OCTET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"%[a-fA-F0-9]{2}").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Search parameters. `post_type` takes a string or a list; `paged` and
/// `current_post_id` take numbers or numeric strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    #[serde(deserialize_with = "one_or_many")]
    pub post_type: Vec<String>,
    #[serde(deserialize_with = "text_param")]
    pub search: String,
    #[serde(deserialize_with = "int_param")]
    pub paged: i64,
    #[serde(deserialize_with = "text_param")]
    pub relationship_name: String,
    #[serde(deserialize_with = "int_param")]
    pub current_post_id: i64,
    pub nonce: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub prev_pages: bool,
    pub more_pages: bool,
    pub data: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "ID")]
    pub id: i64,
    pub name: String,
}

/// Run a search over published items of the registered `content_types`.
///
/// Unknown types are dropped; when none remain the response is empty.
pub fn search_items(
    store: &SqliteStore,
    content_types: &[String],
    per_page: u32,
    request: &SearchRequest,
) -> Result<SearchResponse> {
    let post_types: Vec<String> = request
        .post_type
        .iter()
        .filter(|t| content_types.contains(t))
        .cloned()
        .collect();
    if post_types.is_empty() {
        return Ok(SearchResponse::default());
    }

    let text = sanitize_text_field(&request.search);
    let relationship = sanitize_text_field(&request.relationship_name);
    let page = request.paged.clamp(1, u32::MAX as i64) as u32;
    let per_page = per_page.max(1);
    let exclude = (request.current_post_id > 0).then_some(request.current_post_id);
    tracing::debug!(?post_types, %text, %relationship, page, "searching items");

    let results = store.search_items(&post_types, &text, page, per_page, exclude)?;
    Ok(SearchResponse {
        prev_pages: page > 1,
        more_pages: page < results.max_pages(per_page),
        data: results
            .items
            .into_iter()
            .map(|item| SearchHit {
                id: item.id,
                name: item.title,
            })
            .collect(),
    })
}

/// Strip tags and percent-encoded octets, collapse whitespace, trim
pub fn sanitize_text_field(input: &str) -> String {
    let stripped = TAG.replace_all(input, "");
    let mut filtered = stripped.into_owned();
    while OCTET.is_match(&filtered) {
        filtered = OCTET.replace_all(&filtered, "").into_owned();
    }
    WHITESPACE.replace_all(&filtered, " ").trim().to_string()
}

/// Leading integer of a loosely typed value; anything else is 0
fn intval(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim_start();
            let end = s
                .char_indices()
                .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
                .map(|(i, _)| i)
                .unwrap_or(s.len());
            s[..end].parse().unwrap_or(0)
        }
        Value::Bool(b) => i64::from(*b),
        _ => 0,
    }
}

fn int_param<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    Ok(intval(&Value::deserialize(deserializer)?))
}

fn text_param<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => vec![s],
        Value::Array(values) => values
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}
