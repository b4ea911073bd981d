pub mod cdp;
pub mod controller;
pub mod session_manager;

pub use cdp::ChromeController;
pub use controller::{
    BrowserHandle, LaunchOptions, NavigateOptions, PageController, PageHandle, WaitUntil,
};
pub use session_manager::{BrowserSessionManager, DeviceSwitchPolicy, SessionConfig};
