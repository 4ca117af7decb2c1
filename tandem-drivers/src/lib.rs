//! Driver layer for the controlled browser.
//!
//! - [`tandem_browser::driver::TandemDriver`]: WebDriver client wrapper implementing
//!   [`tandem_mirror::ControlledSession`]
//! - [`tandem_browser::launch`]: Chrome arguments and the per-session debugging port
//! - [`tandem_browser::scripts::PageScripts`]: in-page capture and selection scripts
//! - [`tandem_browser::cdp`]: minimal DevTools protocol client
//! - [`tandem_browser::interception`]: response interception through `Fetch`
pub mod tandem_browser;
