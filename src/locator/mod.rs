//! Extracts the canonical item identifier from a user-supplied product URL.
//!
//! Resolution is pure: no I/O, no retained state, and the same input always
//! produces the same identifier or the same error.

use url::Url;

use crate::app::{ReupError, Result};
use crate::domain::TargetRef;

pub const DEFAULT_DOMAIN: &str = "bestbuy.ca";

/// Accepted identifier length range, in digits.
pub const MIN_ID_LEN: usize = 7;
pub const MAX_ID_LEN: usize = 10;

/// A bare trailing identifier needs at least this many digits to be
/// distinguishable from unrelated numeric path parts.
const DIRECT_ID_MIN_LEN: usize = 8;

const PRODUCT_SEGMENTS: [&str; 2] = ["product", "produit"];

/// Query keys whose value may be taken as a bare identifier.
const ID_QUERY_KEYS: [&str; 3] = ["sku", "skuid", "id"];

/// Identifier extraction patterns, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdPattern {
    /// `/product/<slug>/<id>`
    SluggedProduct,
    /// `/product/<id>`
    ShortProduct,
    /// `/<id>` or `?sku=<id>` with a long numeric id at the end
    DirectId,
}

const PATTERNS: [IdPattern; 3] = [
    IdPattern::SluggedProduct,
    IdPattern::ShortProduct,
    IdPattern::DirectId,
];

impl IdPattern {
    fn extract(self, segments: &[&str], query: &[(String, String)]) -> Option<String> {
        let last = segments.len().checked_sub(1);

        match self {
            IdPattern::SluggedProduct => {
                let last = last?;
                if !is_digits(segments[last]) {
                    return None;
                }
                segments[..last]
                    .iter()
                    .enumerate()
                    .any(|(i, seg)| is_product_segment(seg) && i + 1 < last)
                    .then(|| segments[last].to_string())
            }
            IdPattern::ShortProduct => {
                let last = last?;
                if last == 0 || !is_digits(segments[last]) {
                    return None;
                }
                is_product_segment(segments[last - 1]).then(|| segments[last].to_string())
            }
            IdPattern::DirectId => {
                let from_query = query
                    .iter()
                    .rev()
                    .find(|(key, _)| ID_QUERY_KEYS.iter().any(|k| key.eq_ignore_ascii_case(k)))
                    .map(|(_, value)| value);
                if let Some(value) = from_query {
                    if is_digits(value) && value.len() >= DIRECT_ID_MIN_LEN {
                        return Some(value.clone());
                    }
                }
                let last = segments[last?];
                (is_digits(last) && last.len() >= DIRECT_ID_MIN_LEN).then(|| last.to_string())
            }
        }
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_product_segment(segment: &str) -> bool {
    PRODUCT_SEGMENTS
        .iter()
        .any(|p| segment.eq_ignore_ascii_case(p))
}

/// Resolves product URLs for one supported site domain.
#[derive(Debug, Clone)]
pub struct Locator {
    domain: String,
}

impl Default for Locator {
    fn default() -> Self {
        Self::new(DEFAULT_DOMAIN)
    }
}

impl Locator {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into().trim().trim_start_matches('.').to_ascii_lowercase(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Extract the canonical identifier from `raw`.
    pub fn resolve(&self, raw: &str) -> Result<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ReupError::invalid_url(raw, "URL is empty"));
        }

        let url = Url::parse(trimmed).map_err(|e| ReupError::invalid_url(raw, e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ReupError::invalid_url(
                raw,
                format!("unsupported scheme {:?}", url.scheme()),
            ));
        }

        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        if !self.is_supported_host(&host) {
            return Err(ReupError::invalid_url(
                raw,
                format!("host {:?} is outside {}", host, self.domain),
            ));
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        let id = PATTERNS
            .iter()
            .find_map(|pattern| pattern.extract(&segments, &query))
            .ok_or_else(|| ReupError::invalid_url(raw, "no product identifier found"))?;

        if !(MIN_ID_LEN..=MAX_ID_LEN).contains(&id.len()) {
            return Err(ReupError::invalid_url(
                raw,
                format!(
                    "identifier {} must be {}-{} digits",
                    id, MIN_ID_LEN, MAX_ID_LEN
                ),
            ));
        }

        tracing::debug!("Resolved {} to product {}", trimmed, id);
        Ok(id)
    }

    pub fn target(&self, raw: &str) -> Result<TargetRef> {
        let id = self.resolve(raw)?;
        Ok(TargetRef::new(raw.trim(), id))
    }

    fn is_supported_host(&self, host: &str) -> bool {
        host == self.domain
            || host
                .strip_suffix(self.domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }
}

/// Resolve against the default site.
pub fn resolve(raw: &str) -> Result<String> {
    Locator::default().resolve(raw)
}
