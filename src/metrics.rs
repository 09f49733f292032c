use crate::state::{Reading, Severity, Snapshot};
use prometheus::core::Collector;
use prometheus::{opts, Counter, Encoder, Gauge, GaugeVec, Registry, TextEncoder};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub temperature_celsius: Gauge,
    pub load_average: GaugeVec,
    pub cpu_cores: Gauge,
    pub memory_bytes: GaugeVec,
    pub memory_usage_percent: Gauge,
    pub disk_usage_percent: Gauge,
    pub uptime_seconds: Gauge,
    pub metric_available: GaugeVec,
    pub metric_severity: GaugeVec,
    pub collect_duration_seconds: Gauge,
    pub scrape_count_total: Counter,
}

impl Metrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let temperature_celsius = Gauge::with_opts(opts!(
            "pimonitor_temperature_celsius",
            "CPU temperature from the thermal zone in Celsius"
        ))?;
        let load_average = GaugeVec::new(
            opts!("pimonitor_load_average", "Load average by window"),
            &["window"],
        )?;
        let cpu_cores = Gauge::with_opts(opts!(
            "pimonitor_cpu_cores",
            "Logical processors counted in cpuinfo"
        ))?;
        let memory_bytes = GaugeVec::new(
            opts!("pimonitor_memory_bytes", "Memory in bytes by kind"),
            &["kind"],
        )?;
        let memory_usage_percent = Gauge::with_opts(opts!(
            "pimonitor_memory_usage_percent",
            "Used memory (total - available) in percent"
        ))?;
        let disk_usage_percent = Gauge::with_opts(opts!(
            "pimonitor_disk_usage_percent",
            "Root filesystem usage in percent"
        ))?;
        let uptime_seconds =
            Gauge::with_opts(opts!("pimonitor_uptime_seconds", "Seconds since boot"))?;
        let metric_available = GaugeVec::new(
            opts!(
                "pimonitor_metric_available",
                "1 if the metric was collected, 0 if its source failed"
            ),
            &["metric"],
        )?;
        let metric_severity = GaugeVec::new(
            opts!(
                "pimonitor_metric_severity",
                "Severity per metric: 0 normal, 1 elevated, 2 critical"
            ),
            &["metric"],
        )?;
        let collect_duration_seconds = Gauge::with_opts(opts!(
            "pimonitor_collect_duration_seconds",
            "Duration of the last snapshot collection"
        ))?;
        let scrape_count_total = Counter::with_opts(opts!(
            "pimonitor_scrape_count_total",
            "Number of /metrics requests served"
        ))?;

        register(&registry, &temperature_celsius)?;
        register(&registry, &load_average)?;
        register(&registry, &cpu_cores)?;
        register(&registry, &memory_bytes)?;
        register(&registry, &memory_usage_percent)?;
        register(&registry, &disk_usage_percent)?;
        register(&registry, &uptime_seconds)?;
        register(&registry, &metric_available)?;
        register(&registry, &metric_severity)?;
        register(&registry, &collect_duration_seconds)?;
        register(&registry, &scrape_count_total)?;

        Ok(Arc::new(Self {
            registry,
            temperature_celsius,
            load_average,
            cpu_cores,
            memory_bytes,
            memory_usage_percent,
            disk_usage_percent,
            uptime_seconds,
            metric_available,
            metric_severity,
            collect_duration_seconds,
            scrape_count_total,
        }))
    }

    pub fn update_from_snapshot(&self, snapshot: &Snapshot) {
        self.load_average.reset();
        self.memory_bytes.reset();

        self.temperature_celsius
            .set(snapshot.temperature.value().copied().unwrap_or(f64::NAN));

        match snapshot.load.value() {
            Some(load) => {
                self.load_average.with_label_values(&["1m"]).set(load.one);
                self.load_average.with_label_values(&["5m"]).set(load.five);
                self.load_average
                    .with_label_values(&["15m"])
                    .set(load.fifteen);
                self.cpu_cores.set(f64::from(load.cores));
            }
            None => self.cpu_cores.set(f64::NAN),
        }

        match snapshot.memory.value() {
            Some(mem) => {
                self.memory_bytes
                    .with_label_values(&["total"])
                    .set(mem.total_kib as f64 * 1024.0);
                self.memory_bytes
                    .with_label_values(&["available"])
                    .set(mem.available_kib as f64 * 1024.0);
                self.memory_bytes
                    .with_label_values(&["used"])
                    .set(mem.used_kib as f64 * 1024.0);
                self.memory_usage_percent.set(mem.usage_pct);
            }
            None => self.memory_usage_percent.set(f64::NAN),
        }

        self.disk_usage_percent.set(
            snapshot
                .disk
                .value()
                .map(|d| f64::from(d.usage_pct))
                .unwrap_or(f64::NAN),
        );
        self.uptime_seconds.set(
            snapshot
                .uptime
                .value()
                .map(|u| u.seconds as f64)
                .unwrap_or(f64::NAN),
        );

        self.metric_severity.reset();
        self.set_status("temperature", &snapshot.temperature);
        self.set_status("load", &snapshot.load);
        self.set_status("memory", &snapshot.memory);
        self.set_status("disk", &snapshot.disk);
        self.set_status("uptime", &snapshot.uptime);
    }

    fn set_status<T>(&self, metric: &str, reading: &Reading<T>) {
        let available = if reading.is_available() { 1.0 } else { 0.0 };
        self.metric_available
            .with_label_values(&[metric])
            .set(available);
        if let Some(severity) = reading.severity() {
            let level = match severity {
                Severity::Normal => 0.0,
                Severity::Elevated => 1.0,
                Severity::Critical => 2.0,
            };
            self.metric_severity.with_label_values(&[metric]).set(level);
        }
    }

    pub fn inc_scrape_count(&self) {
        self.scrape_count_total.inc();
    }

    pub fn encode_metrics(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        encoder.encode(&mf, &mut buf)?;
        Ok(buf)
    }
}

fn register<T: Collector + Clone + 'static>(
    registry: &Registry,
    collector: &T,
) -> Result<(), prometheus::Error> {
    registry.register(Box::new(collector.clone()))
}
