use clap::Parser;
use std::path::PathBuf;
use tandem_config::TandemConfig;

/// Mirror a server-side browser session to web clients.
#[derive(Debug, Parser)]
#[command(name = "tandem", version)]
pub struct Cli {
    /// YAML config file; missing is fine, defaults apply.
    #[arg(short, long, env = "TANDEM_CONFIG", default_value = "tandem.yaml")]
    pub config: PathBuf,

    /// Listener address, overrides `server.bind`.
    #[arg(long)]
    pub bind: Option<String>,

    /// Page each new session opens, overrides `browser.target_url`.
    #[arg(long)]
    pub target: Option<String>,

    /// Show the controlled browser window.
    #[arg(long)]
    pub headed: bool,

    /// Tokio worker threads; one per core when unset.
    #[arg(long)]
    pub workers: Option<usize>,
}

impl Cli {
    /// Flags win over file and environment values.
    pub fn apply(&self, config: &mut TandemConfig) {
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(target) = &self.target {
            config.browser.target_url = target.clone();
        }
        if self.headed {
            config.browser.headless = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_loaded_values() {
        let cli = Cli::try_parse_from([
            "tandem",
            "--config",
            "custom.yaml",
            "--bind",
            "0.0.0.0:8080",
            "--target",
            "https://example.org/login",
            "--headed",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("custom.yaml"));

        let mut config = TandemConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.browser.target_url, "https://example.org/login");
        assert!(!config.browser.headless);
    }

    #[test]
    fn no_flags_leave_config_alone() {
        let cli = Cli::try_parse_from(["tandem", "--config", "x.yaml"]).unwrap();
        let mut config = TandemConfig::default();
        let before = (config.server.bind.clone(), config.browser.headless);
        cli.apply(&mut config);
        assert_eq!((config.server.bind.clone(), config.browser.headless), before);
    }
}
