/*
 * Responsibility
 * - tracing / panic hook の初期化
 * - Config 読み込み (env → CLI で上書き) → ApiClient 生成
 * - ui::shell::run() で起動
 */
use std::{panic, process};

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Args;
use crate::config::Config;
use crate::error::AppError;
use crate::repos::client::ApiClient;
use crate::ui;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise keep the terminal quiet.
    // Ex:
    // RUST_LOG=post_tracker=debug cargo run 2> tracker.log
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,post_tracker=info"));

    // stdout は画面描画に使うのでログは stderr へ
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // In development, fail fast so background-task panics are not swallowed.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<(), AppError> {
    init_tracing();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    args.apply(&mut config)?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting client in {:?} mode against {}",
        config.app_env,
        config.api_base_url
    );
    if config.accept_invalid_certs {
        tracing::warn!("TLS certificate validation is disabled");
    }

    let client = ApiClient::new(&config)?;
    ui::shell::run(&config, client).await
}
