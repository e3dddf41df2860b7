use std::error::Error;
use std::io;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use users_cli::cache::MemoryCache;
use users_cli::cli::{Cli, Commands};
use users_cli::client::UsersClient;
use users_cli::config::Config;
use users_cli::error::{Result, UsersError};
use users_cli::sync::UserSync;
use users_cli::{commands, output};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let verbose = cli.verbose;
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");

        if let UsersError::Validation(errors) = &e {
            output::print_field_errors(errors);
        }

        // Show error chain if verbose flag was passed
        if verbose {
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("Caused by: {cause}");
                source = cause.source();
            }
        }

        std::process::exit(1);
    }
}

/// Logs go to stderr so they never mix with table or JSON output.
/// `RUST_LOG` overrides the level picked by `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "users=debug,users_cli=debug" } else { "users=warn,users_cli=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    output::set_format(cli.output_format());
    output::set_quiet(cli.quiet);

    match cli.command {
        // Commands that don't require config/client
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "users", &mut io::stdout());
        }
        Commands::Init => {
            commands::init::run().await?;
        }
        // Commands that talk to the server
        command => {
            let config = Config::load()?;
            let client = UsersClient::new(
                config.base_url(cli.base_url.as_deref())?,
                config.timeout(cli.timeout)?,
            )?;
            tracing::debug!("Using API at {}", client.base_url());

            let cache_path = Config::cache_path()?;
            let cache = MemoryCache::load(&cache_path, config.cache_ttl());
            let mut sync = UserSync::new(client, cache);

            let result = match command {
                Commands::List { refresh } => commands::users::list(&sync, refresh).await,
                Commands::Create(args) => commands::users::create(&mut sync, args).await,
                Commands::Edit(args) => commands::users::edit(&mut sync, args).await,
                Commands::Delete { id } => commands::users::delete(&mut sync, &id).await,
                Commands::Completions { .. } | Commands::Init => {
                    // Already handled above
                    Ok(())
                }
            };

            // Invalidations from successful mutations must survive even when
            // the command itself failed afterwards
            sync.cache().save(&cache_path);
            result?;
        }
    }

    Ok(())
}
