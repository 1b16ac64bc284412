//! HTTP handlers
//!
//! Protected handlers run behind the permission guard and never call the
//! evaluator themselves.

pub mod data;
pub mod health;
pub mod types;
pub mod users;

pub use data::*;
pub use health::*;
pub use types::*;
pub use users::*;
