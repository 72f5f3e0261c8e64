//! Restricted condition expressions for permission rules
//!
//! A rule condition is a boolean expression over the user's attributes,
//! referenced by `{name}` placeholders:
//!
//! ```text
//! {score} >= 100 and {department} in ["sales", "support"]
//! !{suspended} && ({level} > 2 || {vip} == true)
//! ```
//!
//! Supported syntax:
//! - Comparisons: `==`, `!=`, `<>`, `===`, `!==`, `>`, `<`, `>=`, `<=`
//! - Boolean operators: `&&` / `and`, `||` / `or`, `!` / `not`
//! - Membership: `x in [a, b, c]` (or an array attribute on the right)
//! - Literals: integers, floats, `'strings'`, `"strings"`, `true`, `false`, `null`
//! - Parentheses for grouping, unary minus
//!
//! There are no function calls, assignments or free identifiers: the only
//! input an expression can read is the attribute map it is evaluated against.
//! A missing attribute evaluates as `null`.

pub mod engine;
pub mod error;
pub mod parser;
pub mod value;

pub use engine::{CacheStats, ConditionEngine};
pub use error::{ConditionError, Result};
pub use parser::{parse_condition, BinOp, Expr};
pub use value::Value;
