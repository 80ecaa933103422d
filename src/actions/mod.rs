pub mod actuator;
pub mod base;

pub use actuator::RetryingActuator;
pub use base::{ActionKind, RetryPolicy};
