use anyhow::{Context, Result};
use std::io;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use transit_analytics::{
    cli::{Cli, Commands},
    config::StoreConfig,
    filter::resolve_queries,
    output::write_outputs,
    queries::QueryId,
    schema::DependencyResolver,
    store::{schema_gen::generate_schema, Store},
};

fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse_args();

    match cli.command {
        Commands::Schema => {
            let tables = DependencyResolver::new()
                .load_order()
                .map_err(anyhow::Error::msg)?;
            for sql in generate_schema(&tables) {
                println!("{};", sql);
            }
        }

        Commands::ListQueries => {
            for id in QueryId::ALL {
                println!("  {:<24} {}", id.code(), id.description());
            }
        }

        command => {
            let config = StoreConfig::resolve(cli.db, cli.budget_ms)?;
            let store = Store::open(&config)
                .with_context(|| format!("Failed to open store at {:?}", config.db_path()))?;
            run(&store, command)?;
        }
    }

    Ok(())
}

fn run(store: &Store, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {
            println!(
                "Schema ready at {:?} (query budget {}ms)",
                store.path(),
                store.query_budget().as_millis()
            );
        }

        Commands::Query {
            ids,
            exclude,
            args,
            compact,
        } => {
            let include = if ids.is_empty() { None } else { Some(ids) };
            let queries = resolve_queries(include, exclude)?;
            let params = args.into_params();

            let start = Instant::now();
            let outputs = queries
                .iter()
                .map(|id| store.query(*id, &params))
                .collect::<Result<Vec<_>, _>>()?;
            info!(
                queries = outputs.len(),
                elapsed_ms = start.elapsed().as_millis(),
                "Queries finished"
            );

            write_outputs(&mut io::stdout().lock(), &outputs, !compact)?;
        }

        Commands::Check => {
            let anomalies = store.check_topology()?;
            if anomalies.is_empty() {
                println!("No topology anomalies");
            }
            for anomaly in &anomalies {
                println!("  - {}", anomaly);
            }
        }

        Commands::DeleteLine { name } => match store.delete_line(&name)? {
            Some(summary) => {
                println!("Deleted line {}:", name);
                for (table, rows) in &summary.deleted {
                    println!("  {:<12} {} row(s)", table, rows);
                }
            }
            None => println!("No line named {}", name),
        },

        Commands::Schema | Commands::ListQueries => {}
    }

    Ok(())
}
