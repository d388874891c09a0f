//! Selector language module.
//!
//! This module provides:
//! - Selector types: Selector, Clause, Operator, SortKey
//! - parse: text to Selector
//! - In-memory evaluation against resources (ResourceTree)

mod matcher;
mod parser;
pub mod types;

pub use matcher::{ResourceTree, value_matches};
pub(crate) use matcher::parse_number;
pub use parser::parse;
pub use types::{Clause, Operator, Selector, SelectorError, SortKey, is_valid_field_name};
