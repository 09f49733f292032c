use crate::config::SourcesConfig;
use crate::state::PlatformInfo;
use std::fs;
use sysinfo::{CpuExt, System, SystemExt};
use tracing::debug;

pub fn collect_platform(sources: &SourcesConfig) -> PlatformInfo {
    let mut system = System::new();
    system.refresh_cpu();

    let cpuinfo = match fs::read_to_string(&sources.cpuinfo_path) {
        Ok(text) => Some(text),
        Err(err) => {
            debug!(path = %sources.cpuinfo_path.display(), error = %err, "cpuinfo недоступен");
            None
        }
    };

    let cpu_model = system
        .cpus()
        .first()
        .map(|c| c.brand().trim().to_string())
        .filter(|brand| !brand.is_empty() && brand != "cpu0")
        .or_else(|| cpuinfo.as_deref().and_then(cpu_model_from_cpuinfo));
    let board_model = cpuinfo.as_deref().and_then(board_model_from_cpuinfo);
    let is_raspberry_pi = cpuinfo
        .as_deref()
        .is_some_and(|text| text.contains("Raspberry Pi"));

    PlatformInfo {
        host_name: system.host_name(),
        os_name: system.long_os_version().or_else(|| system.name()),
        os_version: system.os_version(),
        kernel_version: system.kernel_version(),
        architecture: std::env::consts::ARCH.to_string(),
        cpu_model,
        board_model,
        is_raspberry_pi,
    }
}

fn cpuinfo_value<'a>(cpuinfo: &'a str, key: &str) -> Option<&'a str> {
    cpuinfo.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        let v = v.trim();
        (k.trim() == key && !v.is_empty()).then_some(v)
    })
}

pub fn cpu_model_from_cpuinfo(cpuinfo: &str) -> Option<String> {
    cpuinfo_value(cpuinfo, "model name")
        .or_else(|| cpuinfo_value(cpuinfo, "Hardware"))
        .map(str::to_string)
}

pub fn board_model_from_cpuinfo(cpuinfo: &str) -> Option<String> {
    cpuinfo_value(cpuinfo, "Model").map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PI_CPUINFO: &str = "processor\t: 0\nmodel name\t: ARMv7 Processor rev 4 (v7l)\nBogoMIPS\t: 38.40\n\nHardware\t: BCM2835\nRevision\t: a02082\nModel\t\t: Raspberry Pi 3 Model B Rev 1.2\n";

    #[test]
    fn reads_pi_board_and_cpu() {
        assert_eq!(
            board_model_from_cpuinfo(PI_CPUINFO).as_deref(),
            Some("Raspberry Pi 3 Model B Rev 1.2")
        );
        assert_eq!(
            cpu_model_from_cpuinfo(PI_CPUINFO).as_deref(),
            Some("ARMv7 Processor rev 4 (v7l)")
        );
    }

    #[test]
    fn model_key_is_exact() {
        let x86 = "processor\t: 0\nmodel\t\t: 142\nmodel name\t: Intel(R) Core(TM) i5\n";
        assert_eq!(board_model_from_cpuinfo(x86), None);
        assert_eq!(
            cpu_model_from_cpuinfo(x86).as_deref(),
            Some("Intel(R) Core(TM) i5")
        );
    }

    #[test]
    fn detects_pi_from_cpuinfo_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cpuinfo");
        fs::write(&path, PI_CPUINFO).unwrap();
        let sources = SourcesConfig {
            cpuinfo_path: path,
            ..SourcesConfig::default()
        };

        let info = collect_platform(&sources);
        assert!(info.is_raspberry_pi);
        assert_eq!(info.architecture, std::env::consts::ARCH);
    }
}
