use tokio::io::BufReader;
use tracing::info;

use prefilter::config::Config;
use prefilter::filter::FilterChain;
use prefilter::target::StaticTarget;
use prefilter::{logging, replay};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("prefilter: configuration error: {}", e);
            std::process::exit(2);
        }
    };

    logging::init(&config.logging)?;

    info!("Starting prefilter {}", prefilter::VERSION);
    config.log_summary();

    // Lines are processed one at a time; a single thread is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let chain = FilterChain::from_config(&config.chain);
    let target = StaticTarget::from_config(&config.target);

    info!(
        filters = chain.len(),
        error_policy = %chain.error_policy(),
        "Filter chain ready"
    );

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    let stats = replay::run(&chain, &target, stdin, stdout).await?;

    info!(
        lines = stats.lines,
        ok = stats.ok,
        failed = stats.failed,
        "Replay complete"
    );

    Ok(())
}
