//! Core application runner for `beacon-proximity`.
//!
//! This module is decoupled from CLI parsing and process exit codes so the
//! whole pipeline (source, registry, scheduler, formatter) can be tested with
//! an injected reading source and an in-memory output stream.

use crate::clock::{Clock, MonotonicClock};
use crate::config::{ConfigError, RegistryConfig};
use crate::location::{Location, LocationMap};
use crate::output::influxdb::InfluxDbFormatter;
use crate::output::text::TextFormatter;
use crate::output::{Format, SnapshotFormatter};
use crate::reading::{RawReading, ReadingBatch};
use crate::registry::ProximityRegistry;
use crate::scanner::ScanError;
use crate::scheduler::ExpiryScheduler;
use crate::snapshot::Snapshot;
use clap::Parser;
use std::future::Future;
use std::io;
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Configuration for the core run loop.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// Forget a beacon once it has not been seen for this long.
    /// Accepts duration with suffix: 10s, 1m, 500ms, 2h.
    /// Without suffix, value is interpreted as seconds.
    #[arg(long, default_value = "10s", value_parser = crate::config::parse_duration)]
    pub ttl: Duration,

    /// Interval between periodic sweeps for beacons that went quiet.
    #[arg(long, default_value = "30s", value_parser = crate::config::parse_duration)]
    pub sweep_period: Duration,

    /// How often scanned readings are delivered to the registry as a batch.
    #[arg(long, default_value = "1100ms", value_parser = crate::config::parse_duration)]
    pub scan_period: Duration,

    /// Only track beacons with this minor. Can be repeated; all beacons are
    /// tracked when omitted.
    #[arg(long = "sub-id", value_name = "MINOR")]
    pub sub_ids: Vec<u16>,

    /// Human-readable location for a beacon minor.
    /// Format: --location "46=Salon (46)"
    #[arg(long = "location", value_parser = crate::location::parse_location, value_name = "LOCATION")]
    pub locations: Vec<Location>,

    /// Output format
    #[arg(long, default_value_t, value_enum)]
    pub format: Format,

    /// The name of the measurement in InfluxDB line protocol.
    #[arg(long, default_value = "beacon_proximity")]
    pub influxdb_measurement: String,

    /// Verbose output, log dropped readings and evictions
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Options {
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            ttl: self.ttl,
            sweep_period: self.sweep_period,
        }
    }

    fn formatter(&self) -> Box<dyn SnapshotFormatter> {
        match self.format {
            Format::Text => Box::new(TextFormatter::new()),
            Format::Influxdb => Box::new(InfluxDbFormatter::new(self.influxdb_measurement.clone())),
        }
    }

    fn admits(&self, reading: &RawReading) -> bool {
        self.sub_ids.is_empty()
            || u16::try_from(reading.sub_id).is_ok_and(|minor| self.sub_ids.contains(&minor))
    }
}

/// Errors returned by the core run loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Reading source abstraction to enable deterministic tests without Bluetooth hardware.
pub trait ReadingSource: Send + Sync {
    fn start(
        &self,
        scan_period: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<ReadingBatch>, ScanError>> + Send + '_>>;
}

/// Real source that ranges iBeacons with the compiled-in Bluetooth backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct BluetoothSource;

impl ReadingSource for BluetoothSource {
    fn start(
        &self,
        scan_period: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<ReadingBatch>, ScanError>> + Send + '_>>
    {
        Box::pin(async move { crate::scanner::start_scan(scan_period).await })
    }
}

/// Writes formatted snapshots, skipping any whose ranked view matches the
/// previously written one.
struct SnapshotWriter {
    formatter: Box<dyn SnapshotFormatter>,
    locations: LocationMap,
    last: Option<Arc<Snapshot>>,
}

impl SnapshotWriter {
    fn write(&mut self, snapshot: Arc<Snapshot>, out: &mut dyn Write) -> io::Result<()> {
        if let Some(last) = &self.last
            && last.ranked() == snapshot.ranked()
        {
            return Ok(());
        }

        let text = self.formatter.format(&snapshot, &self.locations);
        if !text.is_empty() {
            writeln!(out, "{text}")?;
            out.flush()?;
        }
        self.last = Some(snapshot);
        Ok(())
    }
}

/// Run the core processing loop, writing formatted snapshots to `out`.
///
/// - Each batch from the source is filtered by `options.sub_ids` and merged
///   into the registry; the expiry scheduler runs for the duration of the call.
/// - Every published snapshot whose ranking differs from the last written one
///   is formatted and written as one block.
/// - Returns when the source closes its channel.
pub async fn run_with_io(
    options: Options,
    source: &dyn ReadingSource,
    out: &mut dyn Write,
) -> Result<(), RunError> {
    if options.scan_period.is_zero() {
        return Err(ConfigError::ZeroScanPeriod.into());
    }
    let registry = ProximityRegistry::new(options.registry_config())?;
    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
    let scheduler = ExpiryScheduler::new(registry.clone(), Arc::clone(&clock));

    let mut writer = SnapshotWriter {
        formatter: options.formatter(),
        locations: crate::location::to_map(&options.locations),
        last: None,
    };

    let mut batches = source.start(options.scan_period).await?;
    let mut snapshots = registry.subscribe();
    scheduler.start();

    info!(
        ttl_ms = u64::try_from(options.ttl.as_millis()).unwrap_or(u64::MAX),
        sweep_period_ms = u64::try_from(options.sweep_period.as_millis()).unwrap_or(u64::MAX),
        format = %options.format,
        "tracking beacons"
    );

    loop {
        tokio::select! {
            biased;

            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = Arc::clone(&snapshots.borrow_and_update());
                writer.write(snapshot, out)?;
            }

            batch = batches.recv() => match batch {
                Some(batch) => {
                    let admitted: ReadingBatch =
                        batch.into_iter().filter(|r| options.admits(r)).collect();
                    let summary = registry.update(&admitted, clock.now());
                    debug!(
                        applied = summary.applied,
                        dropped = summary.dropped,
                        evicted = summary.evicted,
                        "batch merged"
                    );
                }
                None => break,
            },
        }
    }

    // Flush the snapshot produced by the final batch
    if snapshots.has_changed().unwrap_or(false) {
        let snapshot = Arc::clone(&snapshots.borrow_and_update());
        writer.write(snapshot, out)?;
    }

    scheduler.stop();
    info!("reading source closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::reading;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct FakeSource {
        batches: Mutex<Vec<ReadingBatch>>,
    }

    impl FakeSource {
        fn new(batches: Vec<ReadingBatch>) -> Self {
            Self {
                batches: Mutex::new(batches),
            }
        }
    }

    impl ReadingSource for FakeSource {
        fn start(
            &self,
            _scan_period: Duration,
        ) -> Pin<
            Box<dyn Future<Output = Result<mpsc::Receiver<ReadingBatch>, ScanError>> + Send + '_>,
        > {
            let batches = self.batches.lock().unwrap().clone();
            Box::pin(async move {
                let (tx, rx) = mpsc::channel::<ReadingBatch>(batches.len().max(1));
                tokio::spawn(async move {
                    for batch in batches {
                        let _ = tx.send(batch).await;
                    }
                    // drop tx to close channel
                });
                Ok(rx)
            })
        }
    }

    struct FailingSource;

    impl ReadingSource for FailingSource {
        fn start(
            &self,
            _scan_period: Duration,
        ) -> Pin<
            Box<dyn Future<Output = Result<mpsc::Receiver<ReadingBatch>, ScanError>> + Send + '_>,
        > {
            Box::pin(async { Err(ScanError::Bluetooth("no adapter".to_string())) })
        }
    }

    fn options() -> Options {
        Options {
            ttl: Duration::from_secs(10),
            sweep_period: Duration::from_secs(30),
            scan_period: Duration::from_millis(1100),
            sub_ids: vec![],
            locations: vec![
                Location {
                    sub_id: 46,
                    label: "Salon (46)".to_string(),
                },
                Location {
                    sub_id: 73,
                    label: "Couloir (73)".to_string(),
                },
            ],
            format: Format::Text,
            influxdb_measurement: "beacon_proximity".to_string(),
            verbose: false,
        }
    }

    async fn run(options: Options, batches: Vec<ReadingBatch>) -> String {
        let source = FakeSource::new(batches);
        let mut out = Vec::<u8>::new();
        run_with_io(options, &source, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn run_writes_closest_and_ranking() {
        let out = run(options(), vec![vec![reading(46, 2.0), reading(73, 1.0)]]).await;
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "closest: Couloir (73) at 1.00 m");
        assert!(lines[1].starts_with("  1. Couloir (73)"));
        assert!(lines[2].starts_with("  2. Salon (46)"));
        assert!(out.ends_with('\n'));
    }

    #[tokio::test]
    async fn run_writes_one_block_per_changed_snapshot() {
        let out = run(
            options(),
            vec![vec![reading(46, 2.0)], vec![reading(46, 0.5), reading(73, 1.0)]],
        )
        .await;

        let headers: Vec<&str> = out.lines().filter(|l| l.starts_with("closest:")).collect();
        assert_eq!(
            headers,
            vec!["closest: Salon (46) at 2.00 m", "closest: Salon (46) at 0.50 m"]
        );
    }

    #[tokio::test]
    async fn run_skips_unchanged_snapshots() {
        let out = run(options(), vec![vec![], vec![], vec![]]).await;
        assert_eq!(out, "closest: no beacons\n");
    }

    #[tokio::test]
    async fn run_filters_sub_ids() {
        let mut opts = options();
        opts.sub_ids = vec![46];
        let out = run(opts, vec![vec![reading(46, 2.0), reading(99, 0.1)]]).await;

        assert!(out.starts_with("closest: Salon (46) at 2.00 m"));
        assert!(!out.contains(":1:99"));
    }

    #[tokio::test]
    async fn run_drops_malformed_readings() {
        let out = run(options(), vec![vec![reading(46, -1.0), reading(73, 1.0)]]).await;
        assert!(out.starts_with("closest: Couloir (73) at 1.00 m"));
        assert_eq!(out.lines().count(), 2);
    }

    #[tokio::test]
    async fn run_writes_influxdb_lines() {
        let mut opts = options();
        opts.format = Format::Influxdb;
        let out = run(opts, vec![vec![reading(46, 2.0), reading(73, 1.0)]]).await;
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("beacon_proximity,location=Couloir\\ (73),major=1,minor=73,rank=1,"));
        assert!(lines[1].contains("minor=46,rank=2,"));
    }

    #[tokio::test]
    async fn run_rejects_invalid_config() {
        let mut opts = options();
        opts.ttl = Duration::ZERO;
        let mut out = Vec::<u8>::new();
        let result = run_with_io(opts, &FakeSource::new(vec![]), &mut out).await;
        assert!(matches!(result, Err(RunError::Config(ConfigError::ZeroTtl))));

        let mut opts = options();
        opts.scan_period = Duration::ZERO;
        let result = run_with_io(opts, &FakeSource::new(vec![]), &mut out).await;
        assert!(matches!(
            result,
            Err(RunError::Config(ConfigError::ZeroScanPeriod))
        ));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn run_surfaces_source_errors() {
        let mut out = Vec::<u8>::new();
        let result = run_with_io(options(), &FailingSource, &mut out).await;
        assert!(matches!(result, Err(RunError::Scan(ScanError::Bluetooth(_)))));
    }

    #[test]
    fn options_parse_from_command_line() {
        let options = Options::try_parse_from([
            "beacon-proximity",
            "--ttl",
            "5s",
            "--sweep-period",
            "1m",
            "--sub-id",
            "46",
            "--sub-id",
            "73",
            "--location",
            "46=Salon (46)",
            "--format",
            "influxdb",
        ])
        .unwrap();

        assert_eq!(options.ttl, Duration::from_secs(5));
        assert_eq!(options.sweep_period, Duration::from_secs(60));
        assert_eq!(options.scan_period, Duration::from_millis(1100));
        assert_eq!(options.sub_ids, vec![46, 73]);
        assert_eq!(options.locations[0].label, "Salon (46)");
        assert_eq!(options.format, Format::Influxdb);
        assert_eq!(options.influxdb_measurement, "beacon_proximity");
    }

    #[test]
    fn options_defaults_match_registry_defaults() {
        let options = Options::try_parse_from(["beacon-proximity"]).unwrap();
        assert_eq!(options.registry_config(), RegistryConfig::default());
        assert_eq!(options.format, Format::Text);
        assert!(options.sub_ids.is_empty());
    }

    #[test]
    fn options_reject_negative_durations() {
        assert!(Options::try_parse_from(["beacon-proximity", "--ttl", "-5s"]).is_err());
    }
}
