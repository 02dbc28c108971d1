use std::sync::Arc;

use anyhow::Result;

use conviction::analysis::{AnalysisEngine, WalletLedger};
use conviction::conviction_scoring::ScorerConfig;
use conviction::market_data::MarketDataGateway;
use conviction::metrics;
use conviction::position_analysis::AnalyzerConfig;
use conviction::trust::TrustResolver;

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let config = common::config::Config::load()?;

    let dispatch = common::observability::build_dispatch(&config.general.log_level);
    tracing::dispatcher::set_global_default(dispatch).map_err(anyhow::Error::msg)?;

    let cmd = cli::parse_args(std::env::args()).map_err(anyhow::Error::msg)?;
    if cmd == cli::Command::Help {
        println!("{}", cli::USAGE);
        return Ok(());
    }

    // One-shot commands record metrics locally; the Prometheus listener only
    // makes sense for a resident process, so it is not started here.
    metrics::describe();

    let cache = Arc::new(common::cache::Cache::new());

    match cmd {
        cli::Command::Analyze { path } => {
            let raw = std::fs::read_to_string(&path)?;
            let ledger: WalletLedger = serde_json::from_str(&raw)?;

            let gateway =
                MarketDataGateway::new(cache.clone(), &config.market_data, &config.cache)?;
            let engine = AnalysisEngine::new(
                gateway,
                AnalyzerConfig::from_config(&config.scoring, &config.market_data),
                ScorerConfig::from_config(&config.scoring, &config.archetypes)?,
            );

            let analysis = engine.analyze_wallet(&ledger).await?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        cli::Command::Trust { address, handle } => {
            let resolver = TrustResolver::new(cache, &config)?;
            let score = resolver.resolve(&address, handle.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&score)?);
        }
        cli::Command::Help => unreachable!("handled above"),
    }

    Ok(())
}
