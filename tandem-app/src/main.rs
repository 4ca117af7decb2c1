use anyhow::Result;
use clap::Parser;
use cli::Cli;
use std::time::Duration;
use tandem_config::TandemConfigLoader;
use tandem_mirror::intercept::transform_for;
use tandem_runtime::TandemRuntime;

mod cli;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    let cli = Cli::parse();

    // File first, then TANDEM__* environment, then flags.
    let mut cfg = TandemConfigLoader::new()
        .with_optional_file(&cli.config)
        .load()?;
    cli.apply(&mut cfg);

    let log_dir = tandem_common::observability::init_logging(cfg.logging.to_log_config("tandem"))?;
    tracing::info!(
        config = %cli.config.display(),
        logs = %log_dir.display(),
        target = %cfg.browser.target_url,
        "starting tandem"
    );

    let runtime = TandemRuntime::build("tandem-worker", cli.workers)?;
    let handle = runtime.handle();
    handle.cancel_on_ctrl_c();

    let transform = transform_for(cfg.intercept.transform);
    let state = tandem_server::build_state(&cfg, transform, handle.shutdown_token())?;
    let result = runtime.block_on(tandem_server::serve(&cfg, state));

    runtime.shutdown(SHUTDOWN_GRACE);
    result
}
