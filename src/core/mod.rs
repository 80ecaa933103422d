pub mod browser;
pub mod config;
pub mod locator;

pub use browser::{ElementHandle, SessionDriver, SessionFactory};
pub use config::{
    AppConfig, BrowserConfig, Config, MenuEntry, NavigationStep, RetryConfig, Selectors, Viewport,
    WaitConfig,
};
pub use locator::{Locator, Strategy};
