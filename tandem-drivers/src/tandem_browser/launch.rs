use anyhow::{Context, Result};
use serde_json::json;
use std::net::TcpListener;
use tandem_config::BrowserConfig;
use webdriver::capabilities::Capabilities;

/// Ask the OS for an unused local port for the DevTools endpoint.
pub fn free_port() -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind free port")?;
    let port = listener.local_addr().context("free port address")?.port();
    drop(listener);
    Ok(port)
}

/// Chrome command-line arguments for one controlled session.
pub fn chrome_arguments(config: &BrowserConfig, debug_port: u16) -> Vec<String> {
    let mut args = vec![
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-dev-shm-usage".to_string(),
        format!("--remote-debugging-port={debug_port}"),
        format!("--window-size={},{}", config.window.0, config.window.1),
    ];
    if config.headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }
    args.extend(config.extra_args.iter().cloned());
    args
}

pub fn capabilities(config: &BrowserConfig, debug_port: u16) -> Capabilities {
    let mut caps = Capabilities::new();
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({ "args": chrome_arguments(config, debug_port) }),
    );
    caps
}
