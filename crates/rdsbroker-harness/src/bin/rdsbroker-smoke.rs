//! End-to-end smoke run against a real broker and real RDS.
//!
//! Pings RDS first; without credentials the run is skipped with a warning
//! and exits successfully. Otherwise starts the broker (or uses
//! `RDSBROKER_URL`), checks its catalog and runs the configured number of
//! lifecycles side by side.
//!
//! Usage:
//!   AWS_REGION=eu-west-1 \
//!   cargo run -p rdsbroker-harness --bin rdsbroker-smoke -- harness.json
//!
//! Set `RDSBROKER_LOG_JSON=1` for JSON log lines.

use std::path::PathBuf;
use std::sync::Arc;

use rdsbroker_backend::{RdsBackend, ResourceBackend, build_sdk_config};
use rdsbroker_client::{BrokerClient, CancellationToken, OperationPoller};
use rdsbroker_harness::{
    BrokerFileConfig, BrokerProcess, CREDENTIALS_CHECK_MARKER, HarnessConfig, HarnessContext,
    run_lifecycles, verify_catalog,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("RDSBROKER_LOG_JSON").is_ok_and(|v| v == "1") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("RDSBROKER_HARNESS_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("harness.json"));
    let config = HarnessConfig::load(&path)?;
    tracing::info!(config = %path.display(), region = %config.aws.region, "loaded harness config");

    let sdk_config = build_sdk_config(&config.aws.region, config.aws.endpoint_url.as_deref()).await;
    let backend = Arc::new(RdsBackend::from_config(&sdk_config));
    match backend.ping().await {
        Ok(()) => {}
        Err(e) if e.is_credentials_unavailable() => {
            tracing::warn!(error = %e, "skipping broker smoke run, no AWS credentials were provided");
            return Ok(());
        }
        Err(e) => return Err(eyre::eyre!("cannot run broker smoke run: {e}")),
    }

    // The broker config is optional when the broker is already running.
    let broker_file = match BrokerFileConfig::load(&config.broker.config) {
        Ok(file) => Some(file),
        Err(e) if config.broker.url.is_some() => {
            tracing::warn!(error = %e, "broker config unavailable, skipping catalog check");
            None
        }
        Err(e) => return Err(e.into()),
    };

    let mut process = None;
    let url = match &config.broker.url {
        Some(url) => url.clone(),
        None => {
            let broker =
                BrokerProcess::spawn(&config.broker.binary, &config.broker.config, None).await?;
            broker.wait_until_started(config.startup_timeout()).await?;
            let url = broker.url();
            process = Some(broker);
            url
        }
    };

    let credentials = config.credentials(broker_file.as_ref())?;
    let client = BrokerClient::new(config.client_config(&url, credentials))?;

    if let Some(expected) = broker_file.as_ref().and_then(|f| f.catalog()) {
        let catalog = client.fetch_catalog().await?;
        verify_catalog(&catalog, expected)?;
    }

    if let Some(broker) = &process {
        broker
            .wait_for_output(CREDENTIALS_CHECK_MARKER, config.startup_timeout())
            .await?;
    }

    let poller = OperationPoller::new(client.clone(), config.poll_settings());
    let ctx = Arc::new(HarnessContext::new(client, poller, backend));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling lifecycles");
            on_signal.cancel();
        }
    });

    let spec = config.lifecycle_spec();
    let total = config.scenario.instances.max(1);
    let results = run_lifecycles(Arc::clone(&ctx), &spec, total, &cancel).await;

    println!();
    let mut failed = 0;
    for (instance_id, result) in &results {
        match result {
            Ok(report) => println!(
                "  ok    {instance_id}  {:>6.1}s  snapshot {}{}",
                report.elapsed.as_secs_f64(),
                if report.final_snapshot.exists_final { "found" } else { "absent" },
                if report.snapshot_deleted { ", deleted" } else { "" },
            ),
            Err(e) => {
                failed += 1;
                println!("  FAIL  {instance_id}  {e}");
            }
        }
    }
    println!();
    println!("{} of {total} lifecycles passed", total - failed);

    if let Some(mut broker) = process {
        broker.kill().await?;
    }

    if failed > 0 {
        return Err(eyre::eyre!("{failed} of {total} lifecycles failed"));
    }
    Ok(())
}
