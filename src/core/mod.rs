pub mod calculator;
pub mod errors;
pub mod managers;
pub mod optimizer;
pub mod repository;
pub mod utils;
pub mod validation;

pub use calculator::{calculate, CostBreakdown, CostInputs, CostRates};
pub use errors::{QuoteError, Result};
pub use managers::Managers;
pub use repository::{Entity, Repository};
pub use validation::DataValidator;
