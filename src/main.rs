mod collectors;
mod config;
mod format;
mod http;
mod metrics;
mod report;
mod state;
mod telegram;

use axum::serve;
use chrono::Local;
use clap::Parser;
use collectors::{collect_interfaces, collect_platform, collect_status};
use config::Config;
use format::{format_status, Markup};
use metrics::Metrics;
use std::net::SocketAddr;
use std::sync::Arc;
use teloxide::Bot;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pimonitor")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "./config.yaml")]
    config: String,
    #[arg(long)]
    print_default_config: bool,
    /// Print the status once and exit.
    #[arg(long, conflicts_with = "report")]
    once: bool,
    /// Print extended diagnostics and exit.
    #[arg(long)]
    report: bool,
    /// Render `--once` with Telegram HTML markup.
    #[arg(long, requires = "once")]
    html: bool,
    #[arg(long, conflicts_with = "telegram_off")]
    telegram_on: bool,
    #[arg(long, conflicts_with = "telegram_on")]
    telegram_off: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let mut cfg = match Config::load_or_default(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "не удалось загрузить конфигурацию");
            std::process::exit(1);
        }
    };
    if cli.telegram_on {
        cfg.telegram.enabled = true;
    } else if cli.telegram_off {
        cfg.telegram.enabled = false;
    }

    if cli.once {
        let snapshot = collect_status(&cfg.sources).await;
        let markup = if cli.html { Markup::Html } else { Markup::Plain };
        println!(
            "{}",
            format_status(&snapshot, markup, Local::now().naive_local(), &cfg.host_label)
        );
        return;
    }

    if cli.report {
        let (snapshot, interfaces) = tokio::join!(
            collect_status(&cfg.sources),
            collect_interfaces(&cfg.sources.interfaces)
        );
        let platform = collect_platform(&cfg.sources);
        println!(
            "{}",
            report::render_report(&snapshot, &platform, &interfaces, Local::now().naive_local())
        );
        return;
    }

    if !cfg.http.enabled && !cfg.telegram.enabled {
        error!("не включён ни один транспорт: задайте http.enabled или telegram.enabled, либо используйте --once / --report");
        std::process::exit(1);
    }

    let telegram_token = if cfg.telegram.enabled {
        match telegram::resolve_token(&cfg.telegram) {
            Ok(token) => Some(token),
            Err(err) => {
                error!(error = %err, "не удалось подготовить настройки Telegram");
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    info!(
        host_label = %cfg.host_label,
        http = cfg.http.enabled,
        telegram = cfg.telegram.enabled,
        "запуск pimonitor"
    );

    let cfg = Arc::new(cfg);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_task = if cfg.http.enabled {
        let metrics = match Metrics::new() {
            Ok(m) => m,
            Err(err) => {
                error!(error = %err, "не удалось инициализировать метрики");
                std::process::exit(1);
            }
        };
        Some(spawn_http(cfg.clone(), metrics, shutdown_rx.clone()))
    } else {
        None
    };

    let telegram_task = telegram_token.map(|token| {
        let bot = Bot::new(token);
        let cfg = cfg.clone();
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(err) = telegram::run_bot(bot, cfg, shutdown).await {
                error!(error = %err, "ошибка задачи Telegram");
            }
        })
    });

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "не удалось дождаться Ctrl+C");
    }
    info!("получен Ctrl+C, выполняется остановка");

    let _ = shutdown_tx.send(true);

    if let Some(task) = telegram_task {
        let _ = task.await;
    }
    if let Some(task) = http_task {
        let _ = task.await;
    }
}

fn spawn_http(
    cfg: Arc<Config>,
    metrics: Arc<Metrics>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let addr: SocketAddr = match cfg.http.listen.parse() {
            Ok(addr) => addr,
            Err(err) => {
                error!(error = %err, listen = %cfg.http.listen, "некорректный адрес listen");
                return;
            }
        };

        let listener = match TcpListener::bind(addr).await {
            Ok(l) => l,
            Err(err) => {
                error!(error = %err, "не удалось запустить HTTP-сервер");
                return;
            }
        };
        info!(listen = %addr, "HTTP-сервер запущен");

        let app = http::build_router(metrics, cfg);
        let server = serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        });

        if let Err(err) = server.await {
            error!(error = %err, "ошибка HTTP-сервера");
        }
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
