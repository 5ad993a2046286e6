use serde::{Deserialize, Serialize};

use crate::app::{ReupError, Result};

pub const MAX_PROFILE_NAME_LENGTH: usize = 50;
pub const MAX_PRODUCTS_PER_PROFILE: usize = 100;

/// A named list of products handed to the engine in one go.
///
/// Where and how profiles are stored is up to the caller; the engine only
/// consumes and produces this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    /// Check interval in seconds applied to products without their own.
    #[serde(default)]
    pub interval: Option<u64>,
    #[serde(default)]
    pub products: Vec<ProfileEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interval: None,
            products: Vec::new(),
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let profile: Profile = serde_json::from_str(content)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        validate_profile_name(&self.name)?;

        if self.products.len() > MAX_PRODUCTS_PER_PROFILE {
            return Err(ReupError::Validation(format!(
                "Profile cannot contain more than {} products",
                MAX_PRODUCTS_PER_PROFILE
            )));
        }

        if self.products.iter().any(|p| p.url.trim().is_empty()) {
            return Err(ReupError::Validation(
                "Each product must have a URL".to_string(),
            ));
        }

        Ok(())
    }

    /// Interval for one entry as the raw string the engine's interval
    /// resolution expects.
    pub fn entry_interval(&self, entry: &ProfileEntry) -> Option<String> {
        entry.interval.or(self.interval).map(|secs| secs.to_string())
    }
}

fn validate_profile_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ReupError::Validation(
            "Profile name must be a non-empty string".to_string(),
        ));
    }

    if name.len() > MAX_PROFILE_NAME_LENGTH {
        return Err(ReupError::Validation(format!(
            "Profile name must be {} characters or less",
            MAX_PROFILE_NAME_LENGTH
        )));
    }

    let mut chars = name.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !first_ok || !rest_ok {
        return Err(ReupError::Validation(
            "Profile name must contain only letters, numbers, underscores, and hyphens"
                .to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str) -> ProfileEntry {
        ProfileEntry {
            url: url.to_string(),
            interval: None,
        }
    }

    #[test]
    fn test_parse_profile_json() {
        let json = r#"{
            "metadata": {"name": "gpus", "version": "1.0"},
            "name": "gpus",
            "interval": 30,
            "products": [
                {"url": "https://www.bestbuy.ca/en-ca/product/18931348"},
                {"url": "https://www.bestbuy.ca/en-ca/product/17952295", "interval": 60}
            ]
        }"#;

        let profile = Profile::from_json(json).unwrap();
        assert_eq!(profile.name, "gpus");
        assert_eq!(profile.products.len(), 2);
        assert_eq!(profile.entry_interval(&profile.products[0]), Some("30".into()));
        assert_eq!(profile.entry_interval(&profile.products[1]), Some("60".into()));
    }

    #[test]
    fn test_entry_interval_absent() {
        let mut profile = Profile::new("p");
        profile.products.push(entry("https://www.bestbuy.ca/en-ca/product/18931348"));
        assert_eq!(profile.entry_interval(&profile.products[0]), None);
    }

    #[test]
    fn test_invalid_names_rejected() {
        for name in ["", "-leading", "has space", "semi;colon"] {
            let profile = Profile::new(name);
            assert!(profile.validate().is_err(), "{name:?} should be rejected");
        }
        assert!(Profile::new("x".repeat(51)).validate().is_err());
    }

    #[test]
    fn test_valid_names_accepted() {
        for name in ["gpus", "My_Profile-2", "a"] {
            assert!(Profile::new(name).validate().is_ok());
        }
    }

    #[test]
    fn test_too_many_products_rejected() {
        let mut profile = Profile::new("big");
        for i in 0..=MAX_PRODUCTS_PER_PROFILE {
            profile
                .products
                .push(entry(&format!("https://www.bestbuy.ca/en-ca/product/{}", 10000000 + i)));
        }
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_blank_url_rejected() {
        let mut profile = Profile::new("p");
        profile.products.push(entry("  "));
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_json_round_trip_keeps_entries() {
        let mut profile = Profile::new("p");
        profile.interval = Some(20);
        profile.products.push(entry("https://www.bestbuy.ca/en-ca/product/18931348"));
        let json = profile.to_json().unwrap();
        assert_eq!(Profile::from_json(&json).unwrap(), profile);
    }
}
