//! YAML rule-set schema types with serde deserialization.
//!
//! Defines the complete type hierarchy for rule-set documents:
//! - `RuleSet`: root document (apiVersion, kind, metadata, targeting, rules)
//! - `BasicRule` / `Override`: the two policy tiers
//! - `Condition` / `Action`: closed tagged unions rejected at parse time
//!   when a document uses an unknown operator, metric, or action type
//!
//! All structs use `deny_unknown_fields` so a typo in a hand-edited YAML
//! file fails the load instead of silently dropping a field.

mod action;
mod condition;
mod metadata;
mod rule_set;

pub use action::*;
pub use condition::*;
pub use metadata::*;
pub use rule_set::*;
