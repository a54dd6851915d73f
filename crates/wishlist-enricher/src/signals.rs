//! Fallback product signals from meta tags and loose CSS-selector heuristics.

use std::sync::LazyLock;

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::normalize::{extract_currency_loose, non_empty, normalize_amount};
use crate::types::ExtractionCandidate;
use crate::urls::resolve_url;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid signal selector")
}

static OG_TITLE: LazyLock<Selector> = LazyLock::new(|| selector(r#"meta[property="og:title"]"#));
static TWITTER_TITLE: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#"meta[name="twitter:title"], meta[property="twitter:title"]"#)
});
static H1: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));

static OG_IMAGE: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#"meta[property="og:image"], meta[property="og:image:url"]"#)
});
static TWITTER_IMAGE: LazyLock<Selector> = LazyLock::new(|| {
    selector(
        r#"meta[name="twitter:image"], meta[property="twitter:image"], meta[name="twitter:image:src"]"#,
    )
});
static PRODUCT_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"img[itemprop="image"], img[data-testid*="image"]"#));
static ANY_IMAGE: LazyLock<Selector> = LazyLock::new(|| selector("img"));

static PRICE_AMOUNT_META: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[property="product:price:amount"]"#));
static OG_PRICE_AMOUNT_META: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[property="og:price:amount"]"#));
static TWITTER_DATA1: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#"meta[name="twitter:data1"], meta[property="twitter:data1"]"#)
});
static ITEMPROP_PRICE: LazyLock<Selector> = LazyLock::new(|| selector(r#"[itemprop="price"]"#));
static PRICE_HINT: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[class*="price"], [data-testid*="price"]"#));

static CURRENCY_META: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#"meta[property="product:price:currency"], meta[property="og:price:currency"]"#)
});
static ITEMPROP_CURRENCY: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[itemprop="priceCurrency"]"#));

/// Attributes that may carry an `<img>` source, including common lazy-load
/// conventions. Inline `data:` placeholders are skipped.
const IMAGE_SRC_ATTRS: [&str; 3] = ["src", "data-src", "content"];

/// Extracts product signals from meta tags and markup heuristics.
///
/// Each field takes the first non-empty source in a fixed order. The image is
/// resolved against `page_url`; a reference that cannot be resolved leaves the
/// field empty.
#[must_use]
pub fn extract_from_html_signals(document: &Html, page_url: &Url) -> ExtractionCandidate {
    let title = meta_content(document, &OG_TITLE)
        .or_else(|| meta_content(document, &TWITTER_TITLE))
        .or_else(|| first_text(document, &H1))
        .or_else(|| first_text(document, &TITLE));

    let image_url = meta_content(document, &OG_IMAGE)
        .or_else(|| meta_content(document, &TWITTER_IMAGE))
        .or_else(|| first_image_src(document, &PRODUCT_IMAGE))
        .or_else(|| first_image_src(document, &ANY_IMAGE))
        .and_then(|raw| resolve_url(page_url, &raw));

    let raw_price = meta_content(document, &PRICE_AMOUNT_META)
        .or_else(|| meta_content(document, &OG_PRICE_AMOUNT_META))
        .or_else(|| meta_content(document, &TWITTER_DATA1))
        .or_else(|| itemprop_value(document, &ITEMPROP_PRICE))
        .or_else(|| price_hint_text(document));

    let price = raw_price.as_deref().and_then(normalize_amount);

    let currency = meta_content(document, &CURRENCY_META)
        .or_else(|| itemprop_value(document, &ITEMPROP_CURRENCY))
        .map(|c| c.to_uppercase())
        .or_else(|| {
            raw_price
                .as_deref()
                .and_then(extract_currency_loose)
                .map(str::to_string)
        });

    ExtractionCandidate {
        title,
        image_url,
        price,
        currency,
    }
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .find_map(|el| el.value().attr("content").and_then(non_empty))
}

fn element_text(el: &ElementRef<'_>) -> Option<String> {
    non_empty(&el.text().collect::<String>())
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document.select(selector).find_map(|el| element_text(&el))
}

fn first_image_src(document: &Html, selector: &Selector) -> Option<String> {
    document.select(selector).find_map(|el| {
        IMAGE_SRC_ATTRS
            .iter()
            .filter_map(|attr| el.value().attr(attr).and_then(non_empty))
            .find(|src| !is_inline_data(src))
    })
}

fn is_inline_data(src: &str) -> bool {
    src.get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// Microdata value: the `content` attribute when present, else the text.
fn itemprop_value(document: &Html, selector: &Selector) -> Option<String> {
    document.select(selector).find_map(|el| {
        el.value()
            .attr("content")
            .and_then(non_empty)
            .or_else(|| element_text(&el))
    })
}

/// Text of the first price-hinted element that contains a digit.
///
/// Wrappers such as `<div class="price-block">` often lead with a label, so
/// elements without any digit are passed over.
fn price_hint_text(document: &Html) -> Option<String> {
    document
        .select(&PRICE_HINT)
        .filter_map(|el| element_text(&el))
        .find(|text| text.chars().any(|c| c.is_ascii_digit()))
}
