mod config;

use std::sync::Arc;

use clap::Parser;
use pingora::server::Server;
use skugen::{CounterStore, Issuer, MemoryCounterStore, SqliteCounterStore};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use config::{Args, StoreKind};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_span_events(FmtSpan::CLOSE)
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        tracing::error!(error = %e, "skugen failed");
        std::process::exit(1);
    }
}

fn open_store(args: &Args) -> std::io::Result<Arc<dyn CounterStore>> {
    let config = args.store_config();
    match args.store {
        StoreKind::Sqlite => {
            let path = args.database_path();
            tracing::info!(path = %path.display(), "using sqlite counter store");
            Ok(Arc::new(SqliteCounterStore::new(path, config)))
        }
        StoreKind::Memory => {
            tracing::warn!("using in-memory counter store; codes will repeat after a restart");
            let store = MemoryCounterStore::new(&config)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
            Ok(Arc::new(store))
        }
    }
}

fn run(args: &Args) -> std::io::Result<()> {
    let issuer = Issuer::new(open_store(args)?);
    // An unreachable store is not fatal here; the first issue retries.
    issuer.prepare();

    let app = skugen::routes::build_app(issuer, args.limits_config())
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let mut server = Server::new(None).map_err(|e| std::io::Error::other(e.to_string()))?;
    server.bootstrap();

    let addr = args.listen_addr();
    let mut service = app.to_service("skugen HTTP");
    service.add_tcp(&addr);
    server.add_service(service);

    tracing::info!(addr = %addr, "skugen listening");
    server.run_forever()
}
