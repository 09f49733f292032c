use crate::collectors::command::{display_command, run_bounded};
use crate::collectors::CollectError;
use crate::config::CommandConfig;
use crate::state::{classify_disk, DiskUsage, Severity};

pub async fn read_disk(cfg: &CommandConfig) -> Result<(DiskUsage, Severity), CollectError> {
    let stdout = run_bounded(cfg).await?;
    let disk = parse_df(&stdout, &display_command(cfg))?;
    let severity = classify_disk(disk.usage_pct);
    Ok((disk, severity))
}

pub fn parse_df(stdout: &str, command: &str) -> Result<DiskUsage, CollectError> {
    let mut lines = stdout.lines();
    if lines.next().is_none() {
        return Err(CollectError::ParseShapeMismatch(format!(
            "'{command}' ничего не вывела"
        )));
    }

    // При длинном имени файловой системы df переносит строку данных.
    let mut row = lines.next().unwrap_or_default().to_string();
    if row.split_whitespace().count() < 5 {
        if let Some(rest) = lines.next() {
            row.push(' ');
            row.push_str(rest);
        }
    }
    let fields: Vec<&str> = row.split_whitespace().collect();
    if fields.is_empty() {
        return Err(CollectError::ParseShapeMismatch(format!(
            "'{command}' не вернула строку данных"
        )));
    }
    if fields.len() < 5 {
        return Err(CollectError::ParseShapeMismatch(format!(
            "ожидалось не менее 5 полей, получено {}",
            fields.len()
        )));
    }

    let pct_raw = fields[4].trim_end_matches('%');
    let usage_pct = pct_raw
        .parse::<u8>()
        .ok()
        .filter(|pct| *pct <= 100)
        .ok_or_else(|| CollectError::CommandFailed {
            command: command.to_string(),
            reason: format!("не удалось разобрать процент '{}'", fields[4]),
        })?;

    let mount = (fields.len() > 5).then(|| fields[5..].join(" "));

    Ok(DiskUsage {
        filesystem: fields[0].to_string(),
        size: fields[1].to_string(),
        used: fields[2].to_string(),
        available: fields[3].to_string(),
        usage_pct,
        mount,
    })
}
