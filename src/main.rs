use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;

use rental_ops::backup::{BackupManager, DataSource, InMemoryDataSource};
use rental_ops::comms::{BulkDispatcher, Channel, ChannelDispatcher, Recipient, TemplateRegistry};
use rental_ops::config::{BackupConfig, CommsConfig};

/// Initialize tracing to stderr, or to `RENTAL_OPS_LOG_FILE` when set.
fn init_tracing() -> anyhow::Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match std::env::var("RENTAL_OPS_LOG_FILE") {
        Ok(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("opening log file {}", path))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        Err(_) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = init_tracing()?;

    let backup_config = BackupConfig::from_env();
    let comms_config = CommsConfig::from_env()?;

    eprintln!("Rental Ops v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Exports: {}", backup_config.export_dir.display());
    eprintln!("   Pacing: {} ms", comms_config.pacing.as_millis());

    let source = Arc::new(InMemoryDataSource::with_demo_data());

    // ── Backup & CSV ────────────────────────────────────────────────────
    let backups = BackupManager::new(source.clone(), backup_config);
    let backup_path = backups.save_backup().await?;
    eprintln!("   Backup: {}", backup_path.display());

    for path in backups.export_all_csv().await? {
        eprintln!("   CSV: {}", path.display());
    }

    let text = tokio::fs::read_to_string(&backup_path).await?;
    let report = backups.restore_from_text(&text);
    eprintln!(
        "   Restore check: {} ({})",
        if report.success { "ok" } else { "failed" },
        report.message
    );

    // ── Communication ───────────────────────────────────────────────────
    let dispatcher = Arc::new(ChannelDispatcher::with_default_providers(
        TemplateRegistry::with_defaults(),
        &comms_config,
    )?);

    let customers = source.get_customers().await?;
    let recipients: Vec<Recipient> = customers
        .iter()
        .filter_map(|c| Recipient::from_record(c, "phone"))
        .collect();

    if let Some(first) = recipients.first() {
        let variables = HashMap::from([
            ("customerName".to_string(), first.name.clone().unwrap_or_default()),
            ("carModel".to_string(), "Golf".to_string()),
            ("pickupDate".to_string(), "2026-10-20".to_string()),
            ("location".to_string(), "Airport desk".to_string()),
        ]);
        let sent = dispatcher
            .send_templated("booking_confirmation", first, &variables)
            .await?;
        eprintln!("   Booking confirmation: {}", if sent { "sent" } else { "failed" });
    }

    let bulk = BulkDispatcher::new(Arc::clone(&dispatcher), &comms_config);
    let result = bulk
        .send_bulk(
            &recipients,
            "Our airport desk opens at 6:00 from Monday.",
            Channel::Sms,
        )
        .await;
    eprintln!("   Bulk SMS: {} sent, {} failed", result.sent, result.failed);

    let stats = dispatcher.log().stats().await;
    eprintln!(
        "   Dispatch log: {} messages, total cost {}",
        stats.total, stats.total_cost
    );

    Ok(())
}
