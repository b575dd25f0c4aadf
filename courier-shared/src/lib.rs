pub mod identity;
pub mod pii;

pub use identity::{Caller, Role, UnknownRole};
pub use pii::Masked;
