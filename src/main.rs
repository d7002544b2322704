use basics_server::{
    AppState, basics_app,
    config::{self, Config},
    errors::Result,
    handlers::greeting::{create_persons_table, insert_person},
    hello_app, migrations, open_database,
    seed::{self, SeedPlan},
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "basics_server", version, about = "Hello endpoints, table seeding and venue migrations")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, env = "BASICS_CONFIG_PATH", default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve one of the hello apps.
    Serve {
        #[arg(long, value_enum, default_value_t = App::Basics)]
        app: App,
    },
    /// Seed a todo table and print its rows.
    Seed {
        #[arg(long, value_enum, default_value_t = Variant::Todos)]
        variant: Variant,
    },
    /// Store a person for the hello app to greet.
    AddPerson { name: String },
    /// Apply or revert venue schema revisions.
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum App {
    /// Static JSON hello with blanket CORS headers.
    Basics,
    /// Greets the first stored person.
    Hello,
}

#[derive(Clone, Copy, ValueEnum)]
enum Variant {
    /// Drops and recreates `todos` with five rows.
    Todos,
    /// Creates `table2` if missing and inserts one row.
    Table2,
}

impl Variant {
    fn plan(self) -> SeedPlan {
        match self {
            Variant::Todos => seed::TODOS_PLAN,
            Variant::Table2 => seed::TABLE2_PLAN,
        }
    }
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Upgrade to head, or to the given revision.
    Up {
        #[arg(long)]
        to: Option<String>,
    },
    /// Revert the newest revisions.
    Down {
        #[arg(long, default_value_t = 1)]
        steps: usize,
    },
    /// Print the applied revision.
    Current,
}

/// `RUST_LOG` wins over `logging.level`; an unusable level falls back to
/// "info" with a note on stderr, since no subscriber exists yet.
fn log_filter(rust_log: Option<String>, level: &str) -> EnvFilter {
    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        match EnvFilter::try_new(&directives) {
            Ok(filter) => return filter,
            Err(e) => eprintln!("ignoring invalid RUST_LOG {directives:?}: {e}"),
        }
    }
    EnvFilter::try_new(level).unwrap_or_else(|e| {
        eprintln!("invalid log level {level:?} ({e}), falling back to \"info\"");
        EnvFilter::new("info")
    })
}

fn init_tracing(config: &Config) {
    let filter = log_filter(std::env::var("RUST_LOG").ok(), &config.logging.level);
    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = config::load_config(Some(cli.config.as_str()))?;
    init_tracing(&config);

    match cli.command {
        Command::Serve { app } => serve(&config, app).await,
        Command::Seed { variant } => {
            let (_db, conn) = open_database(&config.database).await?;
            for todo in seed::run_seed(&conn, &variant.plan()).await? {
                println!("{todo}");
            }
            Ok(())
        }
        Command::AddPerson { name } => {
            let (_db, conn) = open_database(&config.database).await?;
            create_persons_table(&conn).await?;
            let person = insert_person(&conn, &name).await?;
            println!("{person}");
            Ok(())
        }
        Command::Migrate { action } => {
            let (_db, conn) = open_database(&config.database).await?;
            match action {
                MigrateAction::Up { to } => {
                    for id in migrations::upgrade(&conn, to.as_deref()).await? {
                        println!("upgraded to {id}");
                    }
                }
                MigrateAction::Down { steps } => {
                    for id in migrations::downgrade(&conn, steps).await? {
                        println!("reverted {id}");
                    }
                }
                MigrateAction::Current => {
                    let current = migrations::current(&conn).await?;
                    println!("{}", current.as_deref().unwrap_or("base"));
                }
            }
            Ok(())
        }
    }
}

async fn serve(config: &Config, app: App) -> Result<()> {
    // The database handle must outlive the server.
    let (router, _db) = match app {
        App::Basics => (basics_app(), None),
        App::Hello => {
            let (db, conn) = open_database(&config.database).await?;
            create_persons_table(&conn).await?;
            (hello_app(AppState { conn }), Some(db))
        }
    };

    let address = (config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_overrides_configured_level() {
        let filter = log_filter(Some("debug".to_string()), "warn");
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn configured_level_used_without_rust_log() {
        assert_eq!(log_filter(None, "warn").to_string(), "warn");
        assert_eq!(log_filter(Some("  ".to_string()), "warn").to_string(), "warn");
    }

    #[test]
    fn invalid_level_falls_back_to_info() {
        let filter = log_filter(None, "basics_server=loud");
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn invalid_rust_log_falls_back_to_configured_level() {
        let filter = log_filter(Some("basics_server=loud".to_string()), "error");
        assert_eq!(filter.to_string(), "error");
    }
}
