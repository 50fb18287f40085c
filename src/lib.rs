#![doc(test(attr(deny(warnings))))]

//! Print Quote Core prices 3D print jobs and keeps the small-shop records around
//! them: saved quotes, materials, printers, clients, projects, tasks, and budgets,
//! each persisted as a JSON document in the data directory.
//!
//! ```
//! use std::collections::BTreeMap;
//! use print_quote_core::core::{calculate, CostInputs, CostRates};
//!
//! let rates = CostRates {
//!     machine_cost_per_hour: 0.5,
//!     electricity_kwh_price: 0.15,
//!     printer_power_watts: 150.0,
//! };
//! let prices = BTreeMap::from([("PLA".to_string(), 25.0)]);
//! let cost = calculate(&CostInputs::new(100.0, 2.0, "PLA", 20.0), &rates, &prices).unwrap();
//! assert!((cost.final_price - 4.254).abs() < 1e-9);
//! ```

pub mod analytics;
pub mod auth;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod export;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Print Quote tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
    }
}
