use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use http1_httpd::{
    access_log::AccessLog,
    config::{MimeTypes, ServerConfig},
    Dispatcher, Server,
};

/// Blocking HTTP/1.1 server for static files and CGI scripts.
#[derive(Debug, Parser)]
#[command(name = "http1-httpd", version, about)]
struct Args {
    /// Server configuration file
    #[arg(long, default_value = "conf/httpd.conf")]
    config: PathBuf,

    /// Extension to content type table
    #[arg(long, default_value = "conf/mime.types")]
    mime_types: PathBuf,

    /// Port to listen on, overriding `Listen`
    #[arg(long)]
    listen: Option<u16>,

    /// Worker thread count, overriding `Workers`
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "http1_httpd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = ServerConfig::load(&args.config)?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(workers) = args.workers.filter(|&workers| workers > 0) {
        config.workers = workers;
    }
    let mime_types = MimeTypes::load(&args.mime_types)?;
    tracing::info!(
        config = %args.config.display(),
        document_root = %config.document_root.display(),
        mime_types = mime_types.len(),
        script_aliases = config.script_aliases.len(),
        "configuration loaded"
    );

    let access_log = AccessLog::open(&config.log_file)?;
    let port = config.listen;
    let dispatcher = Dispatcher::new(config, mime_types).with_access_log(access_log);

    Server::bind(("0.0.0.0", port), dispatcher)?.run()?;

    Ok(())
}
