//! P2PScout entry point
//!
//! Loads configuration, populates the snapshot cache once, then serves the
//! API while background refresh cycles keep the cache warm.

use anyhow::{bail, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use p2pscout::cache::SnapshotCache;
use p2pscout::config::AppConfig;
use p2pscout::http;
use p2pscout::marketplace::{BinanceP2p, BybitP2p, OfferSource, OkxP2p};
use p2pscout::refresh::RefreshScheduler;
use p2pscout::service::OfferService;
use p2pscout::types::Marketplace;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(config = %config.digest(), "🚀 Starting P2PScout");

    let sources = build_sources(&config)?;
    let marketplaces: Vec<Marketplace> = sources.iter().map(|s| s.marketplace()).collect();

    let cache = Arc::new(SnapshotCache::new(
        &marketplaces,
        config.refresh_interval(),
        config.max_age(),
    ));
    let scheduler = Arc::new(RefreshScheduler::new(
        Arc::clone(&cache),
        sources,
        config.refresh_interval(),
    ));

    // Populate every slot once before accepting requests, so an empty cache
    // never silently serves empty results while a first fetch is possible.
    scheduler.run_cycle().await;
    tokio::spawn(Arc::clone(&scheduler).run());
    tracing::info!(
        "📊 Snapshots refresh every {} minutes",
        config.cache.refresh_interval_secs / 60
    );

    let service = Arc::new(OfferService::new(cache, scheduler, &config));
    let app = http::create_router(service);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("🚀 API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_sources(config: &AppConfig) -> Result<Vec<Arc<dyn OfferSource>>> {
    let market = &config.market;
    let timeout = config.fetch_timeout();
    let mut sources: Vec<Arc<dyn OfferSource>> = Vec::new();

    if config.sources.binance_enabled {
        sources.push(Arc::new(BinanceP2p::new(
            &market.asset,
            &market.fiat,
            market.rows,
            timeout,
        )?));
    }
    if config.sources.bybit_enabled {
        sources.push(Arc::new(BybitP2p::new(
            &market.asset,
            &market.fiat,
            market.rows,
            timeout,
        )?));
    }
    if config.sources.okx_enabled {
        sources.push(Arc::new(OkxP2p::new(&market.asset, &market.fiat, timeout)?));
    }

    if sources.is_empty() {
        bail!("No marketplace sources enabled; enable at least one under [sources]");
    }
    Ok(sources)
}
