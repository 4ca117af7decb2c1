pub mod cdp;
pub mod driver;
pub mod interception;
pub mod launch;
pub mod navigation;
pub mod scripts;
