#![warn(clippy::all, rust_2018_idioms)]

use std::path::PathBuf;

use clap::Parser;
use snip_ask::config::AppConfig;
use snip_ask::file_handler::load_document;
use snip_ask::stream::QuestionMode;
use snip_ask::SnipAskApp;

#[derive(Parser, Debug)]
#[command(name = "snip-ask", version, about = "Select part of a page and ask a question about it")]
struct Cli {
    /// Image of the page to open
    document: Option<PathBuf>,
    /// Config file (default: ./snip_ask.json if present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the configured question mode (video or pdf)
    #[arg(long)]
    mode: Option<QuestionMode>,
    /// Override the answering service base URL
    #[arg(long)]
    api_url: Option<String>,
}

fn main() -> eframe::Result {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).

    let cli = Cli::parse();

    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{}; using defaults", err);
            AppConfig::default()
        }
    };
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    log::info!("answers from {}", config.chat_endpoint());

    let document = cli.document.as_deref().and_then(|path| match load_document(path) {
        Ok(document) => Some(document),
        Err(err) => {
            log::error!("{}", err);
            None
        }
    });

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("failed to start async runtime: {}", err);
            std::process::exit(1);
        }
    };
    let handle = runtime.handle().clone();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([640.0, 400.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };
    eframe::run_native(
        "Snip & Ask",
        native_options,
        Box::new(move |cc| Ok(Box::new(SnipAskApp::new(cc, config, handle, document)))),
    )
}
