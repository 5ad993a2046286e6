use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// Result of one successful availability check.
///
/// `in_stock` and `purchasable` are tracked separately: a page can claim
/// stock while the checkout control is disabled. `units_available` may be
/// zero for an in-stock item when the site omits counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub name: String,
    pub in_stock: bool,
    pub units_available: u32,
    pub purchasable: bool,
    pub price: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

impl AvailabilityRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            in_stock: false,
            units_available: 0,
            purchasable: false,
            price: None,
            observed_at: Utc::now(),
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.in_stock {
            "In Stock"
        } else {
            "Out of Stock"
        }
    }

    pub fn display_price(&self) -> String {
        match self.price {
            Some(price) => format!("${:.2}", price),
            None => "N/A".to_string(),
        }
    }
}

impl std::fmt::Display for AvailabilityRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} | {} ({} units) | purchasable: {} | {}",
            self.name,
            self.status_label(),
            self.units_available,
            if self.purchasable { "yes" } else { "no" },
            self.display_price()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_defaults_out_of_stock() {
        let record = AvailabilityRecord::new("GPU");
        assert!(!record.in_stock);
        assert!(!record.purchasable);
        assert_eq!(record.units_available, 0);
        assert_eq!(record.price, None);
        assert_eq!(record.status_label(), "Out of Stock");
    }

    #[test]
    fn test_display_price() {
        let mut record = AvailabilityRecord::new("GPU");
        assert_eq!(record.display_price(), "N/A");
        record.price = Some(1999.5);
        assert_eq!(record.display_price(), "$1999.50");
    }
}
