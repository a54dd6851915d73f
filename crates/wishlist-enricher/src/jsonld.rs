//! Structured-data extraction from embedded JSON-LD blocks.
//!
//! Real storefronts nest the `Product` node arbitrarily deep: inside an
//! `@graph`, under a `WebPage`'s `mainEntity`, in an `ItemList`, or as a
//! variant of a `ProductGroup`. Blocks are therefore walked as generic
//! [`serde_json::Value`] trees and flattened into a node list before any
//! field is read.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde_json::{Map, Value};

use crate::normalize::{extract_currency_loose, non_empty, normalize_json_amount};
use crate::types::ExtractionCandidate;

static JSON_LD_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid json-ld selector")
});

/// Properties that may hold further nodes worth flattening.
const CONTAINER_KEYS: [&str; 7] = [
    "@graph",
    "mainEntity",
    "itemListElement",
    "item",
    "offers",
    "hasVariant",
    "isVariantOf",
];

/// Nesting limit for the flatten walk; real markup stays well below this.
const MAX_DEPTH: usize = 32;

type Node = Map<String, Value>;

/// Extracts the best product candidate from all JSON-LD blocks on the page.
///
/// Blocks that are not valid JSON are skipped. Fields are filled
/// first-match-wins in document order, and scanning stops as soon as title,
/// image, and a price or currency are all known.
#[must_use]
pub fn extract_from_json_ld(document: &Html) -> ExtractionCandidate {
    let blocks: Vec<Value> = document
        .select(&JSON_LD_SELECTOR)
        .filter_map(|script| parse_block(&script.text().collect::<String>()))
        .collect();

    let mut nodes: Vec<&Node> = Vec::new();
    for block in &blocks {
        flatten_nodes(block, &mut nodes, 0);
    }

    let products: Vec<&Node> = nodes
        .iter()
        .copied()
        .filter(|node| has_type(node, "Product"))
        .collect();

    // Some sites omit or mistype `@type`; consider every node in that case.
    let candidates = if products.is_empty() { nodes } else { products };
    accumulate(&candidates)
}

fn parse_block(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "skipping malformed JSON-LD block");
            None
        }
    }
}

fn flatten_nodes<'a>(value: &'a Value, out: &mut Vec<&'a Node>, depth: usize) {
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_nodes(item, out, depth + 1);
            }
        }
        Value::Object(map) => {
            out.push(map);
            for key in CONTAINER_KEYS {
                if let Some(child) = map.get(key) {
                    flatten_nodes(child, out, depth + 1);
                }
            }
        }
        _ => {}
    }
}

/// `@type` may be a plain string or an array of strings, and is sometimes
/// written as a full IRI (`https://schema.org/Product`). Only the final
/// segment is compared, case-insensitively.
fn has_type(node: &Node, wanted: &str) -> bool {
    let matches = |s: &str| {
        let name = s.rsplit(['/', ':', '#']).next().unwrap_or(s);
        name.eq_ignore_ascii_case(wanted)
    };
    match node.get("@type") {
        Some(Value::String(s)) => matches(s),
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

fn accumulate(nodes: &[&Node]) -> ExtractionCandidate {
    let mut candidate = ExtractionCandidate::default();

    for node in nodes {
        if candidate.title.is_none() {
            candidate.title = node.get("name").and_then(text_value);
        }
        if candidate.image_url.is_none() {
            candidate.image_url = node.get("image").and_then(image_value);
        }
        if candidate.price.is_none() || candidate.currency.is_none() {
            if let Some(offer) = node.get("offers").and_then(first_object) {
                let (price, currency) = offer_price(offer);
                if candidate.price.is_none() {
                    candidate.price = price;
                }
                if candidate.currency.is_none() {
                    candidate.currency = currency;
                }
            }
        }
        if candidate.is_sufficient() {
            break;
        }
    }

    candidate
}

fn text_value(value: &Value) -> Option<String> {
    value.as_str().and_then(non_empty)
}

/// `image` may be a URL string, an `ImageObject`, or a list of either.
fn image_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Array(items) => items.iter().find_map(image_value),
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("contentUrl"))
            .and_then(text_value),
        _ => None,
    }
}

fn first_object(value: &Value) -> Option<&Node> {
    match value {
        Value::Object(map) => Some(map),
        Value::Array(items) => items.first().and_then(Value::as_object),
        _ => None,
    }
}

/// Reads the amount and currency of a single offer node.
///
/// `AggregateOffer` ranges are reported by their low end.
fn offer_price(offer: &Node) -> (Option<f64>, Option<String>) {
    let keys: [&str; 3] = if has_type(offer, "AggregateOffer") {
        ["lowPrice", "highPrice", "price"]
    } else {
        ["price", "lowPrice", "highPrice"]
    };

    let spec = offer.get("priceSpecification").and_then(first_object);

    let raw = keys
        .iter()
        .find_map(|key| offer.get(*key).filter(|v| is_present(v)))
        .or_else(|| spec.and_then(|s| s.get("price")).filter(|v| is_present(v)));

    let price = raw.and_then(normalize_json_amount);

    let currency = offer
        .get("priceCurrency")
        .or_else(|| spec.and_then(|s| s.get("priceCurrency")))
        .and_then(text_value)
        .map(|c| c.to_uppercase())
        .or_else(|| {
            raw.and_then(Value::as_str)
                .and_then(extract_currency_loose)
                .map(str::to_string)
        });

    (price, currency)
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}
