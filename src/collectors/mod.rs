pub mod command;
pub mod disk;
pub mod network;
pub mod platform;
pub mod system;

use crate::config::SourcesConfig;
use crate::state::{Reading, Severity, Snapshot};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

pub use network::collect_interfaces;
pub use platform::collect_platform;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("не удалось прочитать {source_name}: {reason}")]
    SourceUnreadable { source_name: String, reason: String },
    #[error("команда '{command}' превысила время выполнения ({timeout:?})")]
    CommandTimeout { command: String, timeout: Duration },
    #[error("ошибка команды '{command}': {reason}")]
    CommandFailed { command: String, reason: String },
    #[error("неожиданный формат данных: {0}")]
    ParseShapeMismatch(String),
}

impl CollectError {
    pub(crate) fn unreadable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnreadable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

pub async fn collect_status(sources: &SourcesConfig) -> Snapshot {
    let started = Instant::now();

    let temperature = into_reading("temperature", system::read_temperature(&sources.thermal_path));
    let load = into_reading(
        "load",
        system::read_load(&sources.loadavg_path, &sources.cpuinfo_path),
    );
    let memory = into_reading("memory", system::read_memory(&sources.meminfo_path));
    let uptime = into_reading("uptime", system::read_uptime(&sources.uptime_path));
    let disk = into_reading("disk", disk::read_disk(&sources.disk).await);

    let snapshot = Snapshot {
        temperature,
        load,
        memory,
        disk,
        uptime,
    };

    debug!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        unavailable = unavailable_count(&snapshot),
        "сбор статуса завершён"
    );
    snapshot
}

pub(crate) fn into_reading<T>(
    metric: &str,
    result: Result<(T, Severity), CollectError>,
) -> Reading<T> {
    match result {
        Ok((value, severity)) => Reading::available(value, severity),
        Err(err) => {
            warn!(metric, error = %err, "показатель недоступен");
            Reading::unavailable(err.to_string())
        }
    }
}

fn unavailable_count(snapshot: &Snapshot) -> usize {
    [
        snapshot.temperature.is_available(),
        snapshot.load.is_available(),
        snapshot.memory.is_available(),
        snapshot.disk.is_available(),
        snapshot.uptime.is_available(),
    ]
    .iter()
    .filter(|available| !**available)
    .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommandConfig;
    use std::fs;
    use std::path::Path;

    fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).expect("запись фикстуры");
        path
    }

    fn fixture_sources(dir: &Path) -> SourcesConfig {
        SourcesConfig {
            thermal_path: write(dir, "temp", "45000\n"),
            loadavg_path: write(dir, "loadavg", "1.00 0.50 0.20 1/123 4567\n"),
            cpuinfo_path: write(dir, "cpuinfo", "processor: 0\nprocessor: 1\n"),
            meminfo_path: write(
                dir,
                "meminfo",
                "MemTotal:       1000000 kB\nMemFree:          50000 kB\nMemAvailable:     100000 kB\n",
            ),
            uptime_path: write(dir, "uptime", "90061.42 12345.00\n"),
            disk: CommandConfig {
                program: "printf".to_string(),
                args: vec![
                    "Filesystem Size Used Avail Use%% Mounted\\n/dev/root 10G 9.5G 500M 95%% /\\n"
                        .to_string(),
                ],
                timeout: Duration::from_secs(5),
            },
            ..SourcesConfig::default()
        }
    }

    #[tokio::test]
    async fn collects_every_field_from_fixtures() {
        let dir = tempfile::tempdir().expect("tempdir");
        let snapshot = collect_status(&fixture_sources(dir.path())).await;

        assert_eq!(snapshot.temperature.value(), Some(&45.0));
        assert_eq!(snapshot.temperature.severity(), Some(Severity::Normal));

        let load = snapshot.load.value().expect("load");
        assert_eq!(load.cores, 2);
        assert_eq!(load.one, 1.0);
        assert_eq!(snapshot.load.severity(), Some(Severity::Normal));

        let memory = snapshot.memory.value().expect("memory");
        assert_eq!(memory.used_kib, 900_000);
        assert_eq!(memory.free_kib, Some(50_000));
        assert_eq!(snapshot.memory.severity(), Some(Severity::Elevated));

        let uptime = snapshot.uptime.value().expect("uptime");
        assert_eq!((uptime.days, uptime.hours, uptime.minutes), (1, 1, 1));

        let disk = snapshot.disk.value().expect("disk");
        assert_eq!(disk.usage_pct, 95);
        assert_eq!(disk.available, "500M");
        assert_eq!(snapshot.disk.severity(), Some(Severity::Elevated));
    }

    #[tokio::test]
    async fn temperature_reading_is_rounded_to_one_decimal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sources = fixture_sources(dir.path());
        sources.thermal_path = write(dir.path(), "temp-fraction", "45123\n");

        let snapshot = collect_status(&sources).await;
        assert_eq!(snapshot.temperature.value(), Some(&45.1));
        assert_eq!(snapshot.temperature.severity(), Some(Severity::Normal));
    }

    #[tokio::test]
    async fn missing_thermal_source_does_not_block_other_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sources = fixture_sources(dir.path());
        sources.thermal_path = dir.path().join("no-such-thermal-zone");

        let snapshot = collect_status(&sources).await;

        match &snapshot.temperature {
            Reading::Unavailable { reason } => assert!(reason.contains("no-such-thermal-zone")),
            other => panic!("ожидалась недоступная температура, получено {other:?}"),
        }
        assert!(snapshot.load.is_available());
        assert!(snapshot.memory.is_available());
        assert!(snapshot.uptime.is_available());
        assert!(snapshot.disk.is_available());
    }

    #[tokio::test]
    async fn every_source_missing_still_yields_a_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing");
        let sources = SourcesConfig {
            thermal_path: missing.clone(),
            loadavg_path: missing.clone(),
            cpuinfo_path: missing.clone(),
            meminfo_path: missing.clone(),
            uptime_path: missing,
            disk: CommandConfig {
                program: "definitely-not-a-real-binary-pimonitor".to_string(),
                args: vec![],
                timeout: Duration::from_secs(1),
            },
            ..SourcesConfig::default()
        };

        let snapshot = collect_status(&sources).await;
        assert_eq!(unavailable_count(&snapshot), 5);
    }
}
