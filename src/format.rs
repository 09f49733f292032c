use crate::state::{DiskUsage, LoadAverage, MemoryUsage, Reading, Severity, Snapshot, Uptime};
use chrono::NaiveDateTime;
use std::fmt::Write as _;
use teloxide::utils::html;

const UNAVAILABLE: &str = "Недоступно";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    Plain,
    Html,
}

impl Markup {
    fn bold(self, text: &str) -> String {
        match self {
            Self::Plain => text.to_string(),
            Self::Html => format!("<b>{text}</b>"),
        }
    }

    fn italic(self, text: &str) -> String {
        match self {
            Self::Plain => text.to_string(),
            Self::Html => format!("<i>{text}</i>"),
        }
    }

    fn escape(self, text: &str) -> String {
        match self {
            Self::Plain => text.to_string(),
            Self::Html => html::escape(text),
        }
    }
}

struct Verdicts {
    normal: &'static str,
    elevated: &'static str,
    critical: &'static str,
}

const TEMPERATURE: Verdicts = Verdicts {
    normal: "Нормальная",
    elevated: "Повышенная",
    critical: "Критическая!",
};

const LOAD: Verdicts = Verdicts {
    normal: "Нормальная",
    elevated: "Повышенная",
    critical: "Высокая",
};

const MEMORY: Verdicts = Verdicts {
    normal: "Нормальное",
    elevated: "Высокое",
    critical: "Высокое",
};

const DISK: Verdicts = Verdicts {
    normal: "Достаточно",
    elevated: "Мало места",
    critical: "Мало места",
};

pub fn severity_marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Normal => "✅",
        Severity::Elevated => "⚠",
        Severity::Critical => "❌",
    }
}

fn verdict_line(severity: Severity, verdicts: &Verdicts) -> String {
    let text = match severity {
        Severity::Normal => verdicts.normal,
        Severity::Elevated => verdicts.elevated,
        Severity::Critical => verdicts.critical,
    };
    format!("   {} {text}\n", severity_marker(severity))
}

fn error_line(markup: Markup, reason: &str) -> String {
    format!("   ❌ Ошибка: {}\n", markup.escape(reason))
}

pub fn format_status(
    snapshot: &Snapshot,
    markup: Markup,
    rendered_at: NaiveDateTime,
    host_label: &str,
) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "🖥️ {}\n",
        markup.bold(&format!("Статус {}", markup.escape(host_label)))
    );

    write_temperature(&mut out, markup, &snapshot.temperature);
    out.push('\n');
    write_load(&mut out, markup, &snapshot.load);
    out.push('\n');
    write_memory(&mut out, markup, &snapshot.memory);
    out.push('\n');
    write_disk(&mut out, markup, &snapshot.disk);
    out.push('\n');
    write_uptime(&mut out, markup, &snapshot.uptime);
    out.push('\n');

    let _ = write!(
        out,
        "🕐 {}",
        markup.italic(&format!("Обновлено: {}", format_timestamp(rendered_at)))
    );
    out
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format("%d.%m.%Y %H:%M:%S").to_string()
}

fn write_temperature(out: &mut String, markup: Markup, reading: &Reading<f64>) {
    let label = markup.bold("Температура CPU:");
    match reading {
        Reading::Available { value, severity } => {
            let _ = writeln!(out, "🌡️ {label} {value:.1}°C");
            out.push_str(&verdict_line(*severity, &TEMPERATURE));
        }
        Reading::Unavailable { reason } => {
            let _ = writeln!(out, "🌡️ {label} {UNAVAILABLE}");
            out.push_str(&error_line(markup, reason));
        }
    }
}

fn write_load(out: &mut String, markup: Markup, reading: &Reading<LoadAverage>) {
    let label = markup.bold("Загрузка CPU:");
    match reading {
        Reading::Available { value, severity } => {
            let _ = writeln!(out, "⚡ {label}");
            let _ = writeln!(out, "   1 мин: {:.2}", value.one);
            let _ = writeln!(out, "   5 мин: {:.2}", value.five);
            let _ = writeln!(out, "   15 мин: {:.2}", value.fifteen);
            out.push_str(&verdict_line(*severity, &LOAD));
        }
        Reading::Unavailable { reason } => {
            let _ = writeln!(out, "⚡ {label} {UNAVAILABLE}");
            out.push_str(&error_line(markup, reason));
        }
    }
}

fn write_memory(out: &mut String, markup: Markup, reading: &Reading<MemoryUsage>) {
    let label = markup.bold("Память:");
    match reading {
        Reading::Available { value, severity } => {
            let _ = writeln!(out, "🧠 {label}");
            let _ = writeln!(out, "   Всего: {}", kib_to_gb(value.total_kib));
            let _ = writeln!(
                out,
                "   Используется: {} ({:.1}%)",
                kib_to_gb(value.used_kib),
                value.usage_pct
            );
            let _ = writeln!(out, "   Доступно: {}", kib_to_gb(value.available_kib));
            out.push_str(&verdict_line(*severity, &MEMORY));
        }
        Reading::Unavailable { reason } => {
            let _ = writeln!(out, "🧠 {label} {UNAVAILABLE}");
            out.push_str(&error_line(markup, reason));
        }
    }
}

fn write_disk(out: &mut String, markup: Markup, reading: &Reading<DiskUsage>) {
    let label = markup.bold("Диск:");
    match reading {
        Reading::Available { value, severity } => {
            let _ = writeln!(out, "💾 {label}");
            let _ = writeln!(out, "   Использование: {}%", value.usage_pct);
            let _ = writeln!(out, "   Свободно: {}", markup.escape(&value.available));
            out.push_str(&verdict_line(*severity, &DISK));
        }
        Reading::Unavailable { reason } => {
            let _ = writeln!(out, "💾 {label} {UNAVAILABLE}");
            out.push_str(&error_line(markup, reason));
        }
    }
}

fn write_uptime(out: &mut String, markup: Markup, reading: &Reading<Uptime>) {
    let label = markup.bold("Время работы:");
    match reading {
        Reading::Available { value, .. } => {
            let _ = writeln!(out, "⏰ {label} {}", human_uptime(value));
        }
        Reading::Unavailable { reason } => {
            let _ = writeln!(out, "⏰ {label} {UNAVAILABLE}");
            out.push_str(&error_line(markup, reason));
        }
    }
}

pub fn human_uptime(uptime: &Uptime) -> String {
    format!("{}д {}ч {}м", uptime.days, uptime.hours, uptime.minutes)
}

pub fn kib_to_gb(kib: u64) -> String {
    format!("{:.1} GB", kib as f64 / 1024.0 / 1024.0)
}
