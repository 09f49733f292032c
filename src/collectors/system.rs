use crate::collectors::CollectError;
use crate::state::{
    classify_load, classify_memory, classify_temperature, classify_uptime, LoadAverage,
    MemoryUsage, Severity, Uptime,
};
use std::fs;
use std::path::Path;
use tracing::debug;

pub fn read_temperature(path: &Path) -> Result<(f64, Severity), CollectError> {
    let millidegrees = parse_millidegrees(&read_source(path)?)?;
    let severity = classify_temperature(millidegrees as f64 / 1000.0);
    Ok(((millidegrees as f64 / 100.0).round() / 10.0, severity))
}

pub fn read_load(
    loadavg_path: &Path,
    cpuinfo_path: &Path,
) -> Result<(LoadAverage, Severity), CollectError> {
    let (one, five, fifteen) = parse_loadavg(&read_source(loadavg_path)?)?;

    let mut cores = count_processors(&read_source(cpuinfo_path)?);
    if cores == 0 {
        cores = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1);
        debug!(cores, "в cpuinfo нет записей processor, берём число потоков");
    }

    let load = LoadAverage {
        one,
        five,
        fifteen,
        cores,
    };
    let severity = classify_load(load.one, load.cores);
    Ok((load, severity))
}

pub fn read_memory(path: &Path) -> Result<(MemoryUsage, Severity), CollectError> {
    let memory = parse_meminfo(&read_source(path)?)?;
    let severity = classify_memory(memory.usage_pct);
    Ok((memory, severity))
}

pub fn read_uptime(path: &Path) -> Result<(Uptime, Severity), CollectError> {
    let uptime = parse_uptime(&read_source(path)?)?;
    let severity = classify_uptime(&uptime);
    Ok((uptime, severity))
}

fn read_source(path: &Path) -> Result<String, CollectError> {
    fs::read_to_string(path).map_err(|err| CollectError::unreadable(path.display().to_string(), err))
}

pub fn parse_millidegrees(text: &str) -> Result<i64, CollectError> {
    text.trim()
        .parse::<i64>()
        .map_err(|err| CollectError::unreadable("thermal zone", err))
}

pub fn parse_loadavg(text: &str) -> Result<(f64, f64, f64), CollectError> {
    let tokens: Vec<&str> = text.split_whitespace().take(3).collect();
    if tokens.len() < 3 {
        return Err(CollectError::ParseShapeMismatch(format!(
            "в loadavg ожидалось 3 значения, получено {}",
            tokens.len()
        )));
    }

    let mut values = [0.0_f64; 3];
    for (slot, token) in values.iter_mut().zip(&tokens) {
        *slot = token
            .parse::<f64>()
            .map_err(|err| CollectError::unreadable("loadavg", format!("'{token}': {err}")))?;
    }
    Ok((values[0], values[1], values[2]))
}

pub fn count_processors(cpuinfo: &str) -> u32 {
    cpuinfo
        .lines()
        .filter(|line| {
            line.split_once(':')
                .is_some_and(|(key, _)| key.trim() == "processor")
        })
        .count() as u32
}

pub fn parse_meminfo(text: &str) -> Result<MemoryUsage, CollectError> {
    let mut total = None;
    let mut available = None;
    let mut free = None;

    for line in text.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let slot = match key.trim() {
            "MemTotal" => &mut total,
            "MemAvailable" => &mut available,
            "MemFree" => &mut free,
            _ => continue,
        };
        if slot.is_some() {
            continue;
        }
        let value = rest
            .split_whitespace()
            .next()
            .ok_or_else(|| {
                CollectError::ParseShapeMismatch(format!("пустое значение {} в meminfo", key.trim()))
            })?
            .parse::<u64>()
            .map_err(|err| CollectError::unreadable("meminfo", format!("{}: {err}", key.trim())))?;
        *slot = Some(value);
    }

    let total = total
        .ok_or_else(|| CollectError::ParseShapeMismatch("в meminfo нет MemTotal".to_string()))?;
    let available = available.ok_or_else(|| {
        CollectError::ParseShapeMismatch("в meminfo нет MemAvailable".to_string())
    })?;
    if total == 0 {
        return Err(CollectError::ParseShapeMismatch(
            "MemTotal равен нулю".to_string(),
        ));
    }

    Ok(MemoryUsage::from_kib(total, available, free))
}

pub fn parse_uptime(text: &str) -> Result<Uptime, CollectError> {
    let token = text.split_whitespace().next().ok_or_else(|| {
        CollectError::ParseShapeMismatch("файл uptime пуст".to_string())
    })?;
    let seconds = token
        .parse::<f64>()
        .map_err(|err| CollectError::unreadable("uptime", format!("'{token}': {err}")))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(CollectError::unreadable(
            "uptime",
            format!("недопустимое значение {seconds}"),
        ));
    }
    Ok(Uptime::from_seconds(seconds.floor() as u64))
}
