//! Error types produced while composing and decomposing documents.

mod aggregate;
mod constructors;
mod conversions;
mod types;

pub use aggregate::AggregatedErrors;
pub use types::{Arity, ParentChain, WeaveError};
