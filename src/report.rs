use crate::format::{kib_to_gb, severity_marker};
use crate::state::{
    InterfaceKind, NetInterface, PlatformInfo, Reading, Severity, Snapshot,
};
use chrono::NaiveDateTime;
use std::fmt::Write as _;

const RULE: &str = "==================================================";

pub fn render_report(
    snapshot: &Snapshot,
    platform: &PlatformInfo,
    interfaces: &Reading<Vec<NetInterface>>,
    rendered_at: NaiveDateTime,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🚀 ДИАГНОСТИКА СИСТЕМЫ");
    let _ = writeln!(out, "Время запуска: {}", rendered_at.format("%Y-%m-%d %H:%M:%S"));

    section(&mut out, "ИНФОРМАЦИЯ О СИСТЕМЕ");
    write_platform(&mut out, platform);

    section(&mut out, "ТЕМПЕРАТУРА CPU");
    match &snapshot.temperature {
        Reading::Available { value, severity } => {
            let _ = writeln!(out, "Температура CPU: {value:.1}°C");
            let advice = match severity {
                Severity::Normal => "Температура в норме",
                Severity::Elevated => "Температура повышена",
                Severity::Critical => "Температура критическая!",
            };
            let _ = writeln!(out, "{} {advice}", severity_marker(*severity));
        }
        Reading::Unavailable { reason } => failure(&mut out, "температуры", reason),
    }

    section(&mut out, "ЗАГРУЗКА CPU");
    match &snapshot.load {
        Reading::Available { value, severity } => {
            let _ = writeln!(out, "Ядер: {}", value.cores);
            let _ = writeln!(
                out,
                "Средняя загрузка: {:.2} / {:.2} / {:.2} (1 / 5 / 15 мин)",
                value.one, value.five, value.fifteen
            );
            let advice = match severity {
                Severity::Normal => "Загрузка в норме",
                Severity::Elevated => "Загрузка повышена",
                Severity::Critical => "Загрузка высокая!",
            };
            let _ = writeln!(out, "{} {advice}", severity_marker(*severity));
        }
        Reading::Unavailable { reason } => failure(&mut out, "загрузки CPU", reason),
    }

    section(&mut out, "ИНФОРМАЦИЯ О ПАМЯТИ");
    match &snapshot.memory {
        Reading::Available { value, severity } => {
            let _ = writeln!(out, "Общая память: {}", kib_to_gb(value.total_kib));
            if let Some(free) = value.free_kib {
                let _ = writeln!(out, "Свободная память: {}", kib_to_gb(free));
            }
            let _ = writeln!(out, "Доступная память: {}", kib_to_gb(value.available_kib));
            let _ = writeln!(
                out,
                "Используется: {} ({:.1}%)",
                kib_to_gb(value.used_kib),
                value.usage_pct
            );
            let advice = match severity {
                Severity::Normal => "Использование памяти в норме",
                Severity::Elevated | Severity::Critical => "Высокое использование памяти",
            };
            let _ = writeln!(out, "{} {advice}", severity_marker(*severity));
        }
        Reading::Unavailable { reason } => failure(&mut out, "информации о памяти", reason),
    }

    section(&mut out, "ИНФОРМАЦИЯ О ДИСКЕ");
    match &snapshot.disk {
        Reading::Available { value, severity } => {
            let _ = writeln!(out, "Файловая система: {}", value.filesystem);
            if let Some(mount) = &value.mount {
                let _ = writeln!(out, "Точка монтирования: {mount}");
            }
            let _ = writeln!(out, "Общий размер: {}", value.size);
            let _ = writeln!(out, "Использовано: {}", value.used);
            let _ = writeln!(out, "Доступно: {}", value.available);
            let _ = writeln!(out, "Использование: {}%", value.usage_pct);
            let advice = match severity {
                Severity::Normal => "Свободного места достаточно",
                Severity::Elevated | Severity::Critical => "Мало свободного места!",
            };
            let _ = writeln!(out, "{} {advice}", severity_marker(*severity));
        }
        Reading::Unavailable { reason } => failure(&mut out, "информации о диске", reason),
    }

    section(&mut out, "СЕТЕВЫЕ ИНТЕРФЕЙСЫ");
    match interfaces {
        Reading::Available { value, .. } if value.is_empty() => {
            let _ = writeln!(out, "⚠ Сетевые интерфейсы не найдены");
        }
        Reading::Available { value, .. } => {
            for iface in value {
                let addresses = if iface.addresses.is_empty() {
                    "нет адреса".to_string()
                } else {
                    iface.addresses.join(", ")
                };
                let _ = writeln!(out, "{}: {addresses}", interface_title(iface));
            }
        }
        Reading::Unavailable { reason } => failure(&mut out, "сетевой информации", reason),
    }

    section(&mut out, "ВРЕМЯ РАБОТЫ СИСТЕМЫ");
    match &snapshot.uptime {
        Reading::Available { value, severity } => {
            let _ = writeln!(
                out,
                "Система работает: {} дней, {} часов, {} минут",
                value.days, value.hours, value.minutes
            );
            match severity {
                Severity::Normal => {
                    let _ = writeln!(out, "✅ Время работы системы в норме");
                }
                Severity::Elevated | Severity::Critical => {
                    let _ = writeln!(
                        out,
                        "⚠ Система работает более месяца - рекомендуется перезагрузка"
                    );
                }
            }
        }
        Reading::Unavailable { reason } => failure(&mut out, "времени работы", reason),
    }

    section(&mut out, "ДИАГНОСТИКА ЗАВЕРШЕНА");
    out
}

fn section(out: &mut String, title: &str) {
    let _ = write!(out, "\n{RULE}\n{title}\n{RULE}\n");
}

fn failure(out: &mut String, what: &str, reason: &str) {
    let _ = writeln!(out, "❌ Ошибка при получении {what}: {reason}");
}

fn write_platform(out: &mut String, platform: &PlatformInfo) {
    let unknown = "н/д";
    let _ = writeln!(
        out,
        "Хост: {}",
        platform.host_name.as_deref().unwrap_or(unknown)
    );
    let _ = writeln!(
        out,
        "ОС: {}",
        platform.os_name.as_deref().unwrap_or(unknown)
    );
    let _ = writeln!(
        out,
        "Ядро: {}",
        platform.kernel_version.as_deref().unwrap_or(unknown)
    );
    let _ = writeln!(out, "Архитектура: {}", platform.architecture);
    let _ = writeln!(
        out,
        "Процессор: {}",
        platform.cpu_model.as_deref().unwrap_or(unknown)
    );
    if platform.is_raspberry_pi {
        match &platform.board_model {
            Some(model) => {
                let _ = writeln!(out, "✅ Обнаружена Raspberry Pi ({model})");
            }
            None => {
                let _ = writeln!(out, "✅ Обнаружена Raspberry Pi");
            }
        }
    } else {
        let _ = writeln!(out, "⚠ Система не похожа на Raspberry Pi");
    }
}

fn interface_title(iface: &NetInterface) -> String {
    let kind = match iface.kind {
        InterfaceKind::Loopback => Some("localhost"),
        InterfaceKind::Ethernet => Some("Ethernet"),
        InterfaceKind::Wireless => Some("Wi-Fi"),
        InterfaceKind::Other => None,
    };
    match kind {
        Some(kind) => format!("{} ({kind})", iface.name),
        None => iface.name.clone(),
    }
}
