use anyhow::Result;
use axum::middleware::from_fn;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use scheduler::store::JobStore;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod components;
mod config;
mod controllers;
mod crypto;
mod db_ops;
mod errors;
mod extractors;
mod filter;
mod htmx;
mod middleware;
mod models;
mod routes;
mod scheduler;
mod session;
mod visibility;

#[derive(Parser, Debug)]
#[command(about = "Notes board: web server and job scheduler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the web application.
    Serve {
        /// Overrides `LISTEN_ADDR`.
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
    /// Run the periodic jobs until interrupted.
    Scheduler,
    /// Print the registered jobs and their most recent runs.
    Jobs {
        /// Executions to show per job.
        #[arg(long, default_value_t = 5)]
        runs: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("board=info,tower_http=info")),
        )
        .try_init()?;

    let config = config::Config::from_env()?;
    let db = create_pg_pool(&config.db_url).await?;

    match cli.command {
        Command::Serve { addr } => {
            serve(db, &config, addr.unwrap_or(config.listen_addr)).await
        }
        Command::Scheduler => run_scheduler(db, &config).await,
        Command::Jobs { runs } => {
            let store = scheduler::pg_store::PgJobStore::new(db);
            print!("{}", scheduler::status_report(&store, runs).await?);
            store.close().await;
            Ok(())
        }
    }
}

async fn create_pg_pool(db_url: &str) -> Result<PgPool> {
    let db = PgPoolOptions::new()
        // Postgres default max connections is 100, and we'll take 'em
        // https://www.postgresql.org/docs/current/runtime-config-connection.html
        .max_connections(config::MAX_CONNECTIONS)
        .connect(db_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    Ok(db)
}

async fn serve(db: PgPool, config: &config::Config, addr: SocketAddr) -> Result<()> {
    let state = models::AppState {
        db,
        session_secret: Arc::from(config.session_secret.as_slice()),
    };
    let app = routes::get_routes(&state)
        .layer(from_fn(middleware::html_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutting down");
        })
        .await?;

    Ok(())
}

async fn run_scheduler(db: PgPool, config: &config::Config) -> Result<()> {
    let store: Arc<dyn JobStore> =
        Arc::new(scheduler::pg_store::PgJobStore::new(db));
    let mut runner = scheduler::Scheduler::new(store.clone(), config.time_zone);
    runner
        .add_job(Arc::new(scheduler::jobs::SenderJob), true)
        .await?;
    runner
        .add_job(
            Arc::new(scheduler::jobs::CleanupJob::new(
                store,
                config.cleanup_max_age_secs,
            )),
            true,
        )
        .await?;

    let shutdown = runner.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
        }
        shutdown.cancel();
    });

    runner.run().await
}
