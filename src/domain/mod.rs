//! Typed entities persisted by the repositories, with their closed status enums
//! and the patch structs used for partial updates.

/// Implements `as_str`, `Display`, `FromStr`, and an `ALL` list for a unit-only enum
/// whose serialized form matches the given text.
macro_rules! impl_status_text {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::core::errors::QuoteError;

            fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
                let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
                match normalized.as_str() {
                    $($text => Ok($ty::$variant),)+
                    _ => Err($crate::core::errors::QuoteError::InvalidInput(format!(
                        "unknown {} `{}`",
                        stringify!($ty),
                        raw.trim()
                    ))),
                }
            }
        }
    };
}

pub(crate) use impl_status_text;

pub mod budget;
pub mod client;
pub mod common;
pub mod material;
pub mod printer;
pub mod project;
pub mod quote;
pub mod task;

pub use budget::{
    Budget, BudgetCategory, BudgetPatch, BudgetPeriod, BudgetStatus, Transaction, TransactionKind,
    TransactionPatch, TransactionStatus,
};
pub use client::{Client, ClientPatch, ClientStatus};
pub use material::{Material, MaterialPatch, MaterialStatus, StockOperation};
pub use printer::{Printer, PrinterPatch, PrinterStatus, PrinterTechnology};
pub use project::{Project, ProjectPatch, ProjectStatus};
pub use quote::{Quote, QuotePatch, QuoteStatus};
pub use task::{Task, TaskPatch, TaskPriority, TaskStatus};
