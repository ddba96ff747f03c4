#![cfg_attr(test, allow(unused_crate_dependencies))]

use clap::crate_version;
use tokio::runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

mod args;
mod commands;

use args::{Args, Command, LogStyle};

const THREAD_NAME: &str = "graphql-cost";

fn main() -> anyhow::Result<()> {
    let args = self::args::parse();

    init_logging(&args);
    tracing::debug!("graphql-cost {}", crate_version!());

    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name(THREAD_NAME)
        .build()?;

    let output = runtime.block_on(async move {
        match args.command {
            Command::Extract { schema } => commands::extract(&schema),
            Command::Federated { supergraph, config } => commands::federated(&supergraph, config.as_deref()).await,
            Command::Analyze(analyze) => commands::analyze(&analyze),
        }
    })?;

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

/// Logs go to stderr so that the printed JSON can be piped.
fn init_logging(args: &Args) {
    let filter = args.log_level.unwrap_or_default().as_filter_string();
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let layer = match args.log_style {
        // for interactive terminals we provide colored output
        LogStyle::Text if atty::is(atty::Stream::Stderr) => layer.with_ansi(true).boxed(),
        LogStyle::Text => layer.with_ansi(false).boxed(),
        LogStyle::Json => layer.json().boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(EnvFilter::new(filter))
        .init();
}
