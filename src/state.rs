use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Normal,
    Elevated,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Reading<T> {
    Available { value: T, severity: Severity },
    Unavailable { reason: String },
}

impl<T> Reading<T> {
    pub fn available(value: T, severity: Severity) -> Self {
        Self::Available { value, severity }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Available { value, .. } => Some(value),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn severity(&self) -> Option<Severity> {
        match self {
            Self::Available { severity, .. } => Some(*severity),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub temperature: Reading<f64>,
    pub load: Reading<LoadAverage>,
    pub memory: Reading<MemoryUsage>,
    pub disk: Reading<DiskUsage>,
    pub uptime: Reading<Uptime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
    pub cores: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryUsage {
    pub total_kib: u64,
    pub available_kib: u64,
    pub free_kib: Option<u64>,
    pub used_kib: u64,
    pub usage_pct: f64,
}

impl MemoryUsage {
    pub fn from_kib(total_kib: u64, available_kib: u64, free_kib: Option<u64>) -> Self {
        let available_kib = available_kib.min(total_kib);
        let used_kib = total_kib - available_kib;
        let usage_pct = if total_kib == 0 {
            0.0
        } else {
            (used_kib as f64 / total_kib as f64) * 100.0
        };
        Self {
            total_kib,
            available_kib,
            free_kib,
            used_kib,
            usage_pct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskUsage {
    pub filesystem: String,
    pub size: String,
    pub used: String,
    pub available: String,
    pub usage_pct: u8,
    pub mount: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Uptime {
    pub seconds: u64,
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
}

impl Uptime {
    pub fn from_seconds(seconds: u64) -> Self {
        Self {
            seconds,
            days: seconds / 86_400,
            hours: (seconds % 86_400) / 3600,
            minutes: (seconds % 3600) / 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceKind {
    Loopback,
    Ethernet,
    Wireless,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetInterface {
    pub name: String,
    pub kind: InterfaceKind,
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlatformInfo {
    pub host_name: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub kernel_version: Option<String>,
    pub architecture: String,
    pub cpu_model: Option<String>,
    pub board_model: Option<String>,
    pub is_raspberry_pi: bool,
}

pub fn classify_temperature(celsius: f64) -> Severity {
    if celsius < 50.0 {
        Severity::Normal
    } else if celsius < 70.0 {
        Severity::Elevated
    } else {
        Severity::Critical
    }
}

pub fn classify_load(load_one: f64, cores: u32) -> Severity {
    let cores = f64::from(cores);
    if load_one < cores * 0.7 {
        Severity::Normal
    } else if load_one < cores * 1.5 {
        Severity::Elevated
    } else {
        Severity::Critical
    }
}

pub fn classify_memory(usage_pct: f64) -> Severity {
    if usage_pct < 80.0 {
        Severity::Normal
    } else {
        Severity::Elevated
    }
}

pub fn classify_disk(usage_pct: u8) -> Severity {
    if usage_pct < 90 {
        Severity::Normal
    } else {
        Severity::Elevated
    }
}

pub fn classify_uptime(uptime: &Uptime) -> Severity {
    if uptime.days > 30 {
        Severity::Elevated
    } else {
        Severity::Normal
    }
}
