//! Coordinator configuration.
//!
//! All values can be overridden through environment variables:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | POS_DATA_DIR | ./work_dir | Directory for the local redb database |
//! | POS_SERVICE_CHARGE_RATE | 0.10 | Fractional service charge rate |
//! | POS_TAX_RATE | 0.18 | Fractional tax rate (applied after service charge) |

use std::path::PathBuf;

/// Fractional rates supplied by the rate-configuration collaborator.
///
/// Applied in order: service charge on the subtotal, then tax on
/// subtotal + service charge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateConfig {
    pub service_charge_rate: f64,
    pub tax_rate: f64,
}

impl Default for RateConfig {
    fn default() -> Self {
        // 10% service charge, 18% GST
        Self {
            service_charge_rate: 0.10,
            tax_rate: 0.18,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PosConfig {
    /// Directory holding the local database (sequence counter, offline
    /// queue). Created on first use.
    pub data_dir: PathBuf,
    pub rates: RateConfig,
    /// Notification feed retention cap; the oldest entries are dropped
    /// beyond this count.
    pub notification_cap: usize,
    /// First order number ever issued.
    pub order_number_start: u64,
}

impl Default for PosConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./work_dir"),
            rates: RateConfig::default(),
            notification_cap: 50,
            order_number_start: 1001,
        }
    }
}

impl PosConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let data_dir = std::env::var("POS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let service_charge_rate = std::env::var("POS_SERVICE_CHARGE_RATE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rates.service_charge_rate);
        let tax_rate = std::env::var("POS_TAX_RATE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rates.tax_rate);

        Self {
            data_dir,
            rates: RateConfig {
                service_charge_rate,
                tax_rate,
            },
            ..defaults
        }
    }
}
