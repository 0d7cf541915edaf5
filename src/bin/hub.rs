use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use tracing::{error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use vigil::sinks::{Notifier, RowSink, TracingEventLog};
use vigil::{EventSinks, NotificationMessage, Scheduler, StrategyRegistry, read_config_file};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("vigil", LevelFilter::TRACE),
        ("hub", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

/// Row sink printing one semicolon-separated line per cycle.
struct StdoutRowSink;

impl RowSink for StdoutRowSink {
    fn append_row(&self, columns: &[String], _monitor_name: &str) -> anyhow::Result<()> {
        println!("{}", columns.join(";"));
        Ok(())
    }
}

/// Notifier that logs instead of mailing; the mail transport lives
/// outside this binary.
struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn dispatch(&self, notification: &NotificationMessage) -> anyhow::Result<()> {
        info!(
            subject = %notification.subject,
            recipients = ?notification.recipients,
            "{}",
            notification.body
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;
    let monitors = config.monitors.unwrap_or_default();

    // drop entries with unknown kinds instead of refusing the whole file
    let registry = StrategyRegistry::default();
    let monitors: Vec<_> = monitors
        .into_iter()
        .filter(|monitor| match registry.resolve(&monitor.kind) {
            Ok(_) => true,
            Err(e) => {
                warn!(monitor = %monitor.name, "{e}, dropping monitor");
                false
            }
        })
        .collect();

    if monitors.is_empty() {
        warn!("no usable monitors configured");
    }

    let scheduler = Arc::new(Scheduler::new(EventSinks {
        log: Arc::new(TracingEventLog),
        rows: Arc::new(StdoutRowSink),
        notifier: Arc::new(LogNotifier),
        observer: None,
    }));

    if let Err(e) = scheduler.start(monitors) {
        error!("failed to start scheduler: {e}");
        return Err(e.into());
    }

    info!("monitoring started, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    info!("shutting down");
    scheduler.stop().await;

    Ok(())
}
