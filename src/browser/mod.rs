pub mod chrome;
pub mod wait;

pub use chrome::{ChromeLauncher, ChromeSession};
pub use wait::{Condition, WaitCondition, WaitEngine};
