//! Steps that write reconciled values back into a sheet.

pub mod fill;
pub mod ledger;
pub mod status;

pub use fill::{FillReport, FuzzyFill, Target, fuzzy_fill};
