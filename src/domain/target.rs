use serde::{Deserialize, Serialize};

/// One monitored item.
///
/// `canonical_id` is derived once by the [`Locator`](crate::locator::Locator)
/// and never changes; `raw_url` is kept for display only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetRef {
    raw_url: String,
    canonical_id: String,
}

impl TargetRef {
    pub(crate) fn new(raw_url: impl Into<String>, canonical_id: impl Into<String>) -> Self {
        Self {
            raw_url: raw_url.into(),
            canonical_id: canonical_id.into(),
        }
    }

    pub fn raw_url(&self) -> &str {
        &self.raw_url
    }

    pub fn canonical_id(&self) -> &str {
        &self.canonical_id
    }
}

impl std::fmt::Display for TargetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical_id)
    }
}
