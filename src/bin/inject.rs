use std::path::PathBuf;

use tracing::info;

use queue_proxy::{config, inject};

/// One-shot build step: rewrite the static HTML so the page calls the proxy
/// route, then write everything to `dist/`. The site root defaults to the
/// current directory and can be overridden as the sole argument.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let site_root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let config = config::Config::from_env();
    let report = inject::run(&site_root, config.upstream_url.is_some())?;

    info!(
        primary = %report.primary_out.display(),
        secondary = report.secondary_out.is_some(),
        injected = report.injected,
        "Build output ready"
    );
    Ok(())
}
