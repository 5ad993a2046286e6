use crate::app::{ReupError, Result};
use crate::domain::{AvailabilityRecord, UNKNOWN_PRODUCT};
use crate::fetcher::RawDocument;

use super::html::HtmlDoc;
use super::ParserConfig;

const PRICE_AUTOMATION_ID: &str = "product-price";
const PRICE_META: &str = "product:price:amount";

/// Heuristic parse of a rendered product page.
///
/// In stock requires an in-stock phrase, no out-of-stock phrase and an
/// enabled purchase control.
pub(crate) fn parse_markup(doc: &RawDocument, config: &ParserConfig) -> Result<AvailabilityRecord> {
    let html = HtmlDoc::new(&doc.body);
    if !html.has_markup() {
        return Err(ReupError::ParseFailure(format!(
            "document from {} contains no markup",
            doc.url
        )));
    }

    let name = extract_name(&html, config);
    let price = extract_price(&html);

    let control = html.find_by_attr(
        Some("button"),
        "data-button-state",
        &config.purchase_control_state,
    );
    let control_enabled = control.as_ref().is_some_and(|button| {
        !button.has_attr("disabled")
            && !button
                .attr("aria-disabled")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    });

    let text = html.visible_text();
    let qualifying = contains_any(&text, &config.in_stock_phrases);
    let disqualifying = contains_any(&text, &config.out_of_stock_phrases);

    if qualifying == disqualifying {
        tracing::warn!(
            "Ambiguous availability for {}: in-stock phrase={} out-of-stock phrase={} control enabled={}",
            doc.url,
            qualifying,
            disqualifying,
            control_enabled
        );
    }

    let in_stock = qualifying && !disqualifying && control_enabled;
    tracing::debug!(
        "Parsed {}: name={:?} price={:?} in_stock={} control={}",
        doc.url,
        name,
        price,
        in_stock,
        control_enabled
    );

    let mut record = AvailabilityRecord::new(name);
    record.in_stock = in_stock;
    record.units_available = u32::from(in_stock);
    record.purchasable = control_enabled;
    record.price = price;
    record.observed_at = doc.fetched_at;
    Ok(record)
}

fn contains_any(text: &str, phrases: &[String]) -> bool {
    phrases
        .iter()
        .map(|p| p.trim().to_lowercase())
        .any(|p| !p.is_empty() && text.contains(&p))
}

fn extract_name(html: &HtmlDoc<'_>, config: &ParserConfig) -> String {
    let title = html
        .first("title")
        .map(|tag| strip_suffix(html.text_of(&tag), &config.title_suffixes));
    let heading = || html.first("h1").map(|tag| html.text_of(&tag));
    let og_title = || {
        html.meta_content("og:title")
            .map(|t| strip_suffix(t, &config.title_suffixes))
    };

    [title, heading(), og_title()]
        .into_iter()
        .flatten()
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string())
}

fn strip_suffix(name: String, suffixes: &[String]) -> String {
    for suffix in suffixes {
        let suffix = suffix.trim();
        if suffix.is_empty() {
            continue;
        }
        let trimmed = name.trim_end();
        if trimmed.len() >= suffix.len()
            && trimmed.is_char_boundary(trimmed.len() - suffix.len())
            && trimmed[trimmed.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
        {
            return trimmed[..trimmed.len() - suffix.len()].trim_end().to_string();
        }
    }
    name.trim().to_string()
}

fn extract_price(html: &HtmlDoc<'_>) -> Option<f64> {
    let primary = html
        .find_by_attr(None, "data-automation", PRICE_AUTOMATION_ID)
        .and_then(|tag| parse_price(&html.text_of(&tag)));

    primary.or_else(|| html.meta_content(PRICE_META).and_then(|c| parse_price(&c)))
}

/// `"$1,299.99"` → `1299.99`. Anything unparsable is treated as no price.
fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    match cleaned.parse::<f64>() {
        Ok(price) if price.is_finite() && price > 0.0 => Some(price),
        _ => {
            tracing::debug!("Ignoring unparsable price {:?}", raw);
            None
        }
    }
}
