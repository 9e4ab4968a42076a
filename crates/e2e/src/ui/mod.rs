//! Browser automation through Playwright

pub mod browser;
pub mod page;
pub mod pages;
pub mod spec;

pub use browser::{AuthState, Browser, BrowserConfig, BrowserSession, PageOutput};
pub use page::PageActions;
pub use pages::{CreateQuestPage, PageManager, UpdateQuestPage};
pub use spec::{UiScenario, UiStep};
