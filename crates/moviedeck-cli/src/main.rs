//! moviedeck - TMDB movie browser CLI.

/// Application configuration (TOML).
mod config;
/// Terminal rendering of catalog results.
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::instrument;
use tracing_subscriber::filter::EnvFilter;
#[cfg(not(feature = "otel"))]
use tracing_subscriber::fmt;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{AppConfig, TOKEN_ENV_VAR, resolve_config_path};
use moviedeck_api::tmdb::{
    ApiClient, EnvToken, LocalMovieApi, MokaResponseCache, Operation, PassthroughCache,
    StaticToken, TmdbCatalog, UpstreamFetchError,
};
use moviedeck_api::validation::{is_valid_id, is_valid_search_query};

/// CLI argument parser.
#[derive(Parser)]
#[command(about, version)]
struct Cli {
    /// Override config directory.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Print raw JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List movie genres.
    Genres,
    /// Show the top-rated movie and its videos.
    TopRated,
    /// Discover popular movies, optionally filtered by genre.
    Discover(DiscoverArgs),
    /// Show movie details.
    Details(DetailsArgs),
    /// Search movies by title.
    Search(SearchArgs),
    /// Show the top-rated movie and the genre list together.
    Home,
    /// Manage the config file.
    Config(ConfigCommand),
}

/// Arguments for the `discover` subcommand.
#[derive(clap::Args)]
struct DiscoverArgs {
    /// Genre ID filter (e.g. 28 for Action).
    #[arg(long)]
    genre_id: Option<u64>,
    /// Result page.
    #[arg(long, default_value_t = 1)]
    page: u32,
}

/// Arguments for the `details` subcommand.
#[derive(clap::Args)]
struct DetailsArgs {
    /// TMDB movie ID (e.g. 27205).
    #[arg(long, required = true, allow_negative_numbers = true)]
    id: i64,
}

/// Arguments for the `search` subcommand.
#[derive(clap::Args)]
struct SearchArgs {
    /// Search query (e.g. "Inception").
    #[arg(long, required = true)]
    query: String,
}

/// Arguments for the `config` subcommand.
#[derive(clap::Args)]
struct ConfigCommand {
    /// Config subcommand to run.
    #[command(subcommand)]
    command: ConfigSubcommands,
}

/// Available config subcommands.
#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Write a config file with default values.
    Init(ConfigInitArgs),
    /// Print the effective config (token redacted).
    Show,
}

/// Arguments for the `config init` subcommand.
#[derive(clap::Args)]
struct ConfigInitArgs {
    /// Overwrite an existing config file.
    #[arg(long)]
    force: bool,
}

/// Message shown to the user when `operation` fails.
const fn failure_message(operation: Operation) -> &'static str {
    match operation {
        Operation::Genres => "An error occurred while fetching genres.",
        Operation::TopRatedMovie => "An error occurred while fetching the top-rated movie.",
        Operation::MoviesByGenre => "An error occurred while fetching movies.",
        Operation::MovieDetails => "An error occurred while fetching movie details.",
        Operation::SearchMovies => "An error occurred while searching for movies.",
    }
}

/// Logs a catalog failure with its cause and returns the user-facing message.
fn report_failure(err: &UpstreamFetchError) -> &'static str {
    tracing::error!(
        operation = ?err.operation(),
        error = %err,
        cause = ?err.cause(),
        "API error occurred."
    );
    failure_message(err.operation())
}

/// Builds the API client from config and the `TMDB_API_TOKEN` environment variable.
///
/// # Errors
///
/// Returns an error if the client fails to build.
#[instrument(skip_all)]
fn build_api_client(config: &AppConfig) -> Result<ApiClient> {
    let builder = ApiClient::builder()
        .user_agent(concat!("moviedeck/", env!("CARGO_PKG_VERSION")))
        .retry_policy(config.retry_policy());

    let builder = match config.tmdb.api_token.as_deref() {
        Some(token) if std::env::var_os(TOKEN_ENV_VAR).is_none() => {
            builder.token_source(StaticToken::new(token))
        }
        _ => builder.token_source(EnvToken::new(TOKEN_ENV_VAR)),
    };

    builder.build().context("failed to build TMDB client")
}

/// Rejects invalid input before any network call.
///
/// # Errors
///
/// Returns the user-facing validation message.
fn validate_input(command: &Commands) -> Result<()> {
    match command {
        Commands::Details(args) if !is_valid_id(args.id, "movie") => {
            bail!("Invalid movie ID provided.")
        }
        Commands::Search(args) if !is_valid_search_query(&args.query) => {
            bail!("Search query cannot be empty.")
        }
        _ => Ok(()),
    }
}

/// Runs a catalog subcommand.
///
/// # Errors
///
/// Returns an error if input is invalid, config cannot be loaded, or the
/// catalog operation fails.
#[instrument(skip_all)]
async fn run_catalog_command(command: &Commands, dir: Option<&PathBuf>, json: bool) -> Result<()> {
    validate_input(command)?;

    let config_path = resolve_config_path(dir)?;
    let config = AppConfig::load(&config_path)?;
    let client = build_api_client(&config)?;
    let settings = config.catalog_settings()?;

    if config.cache.enabled {
        let catalog = TmdbCatalog::new(client, settings, MokaResponseCache::default());
        dispatch(&catalog, command, json).await
    } else {
        let catalog = TmdbCatalog::new(client, settings, PassthroughCache);
        dispatch(&catalog, command, json).await
    }
}

/// Executes a catalog subcommand against `api` and renders the result.
///
/// # Errors
///
/// Returns the user-facing failure message if the operation fails.
#[allow(clippy::future_not_send)]
async fn dispatch<A: LocalMovieApi>(api: &A, command: &Commands, json: bool) -> Result<()> {
    let result = match command {
        Commands::Genres => api
            .genres()
            .await
            .map(|genres| render::genres(&genres, json)),
        Commands::TopRated => api
            .top_rated_movie_with_videos()
            .await
            .map(|top| render::top_rated(&top, json)),
        Commands::Discover(args) => api
            .movies_by_genre(args.genre_id, args.page)
            .await
            .map(|movies| render::movies(&movies, json)),
        Commands::Details(args) => {
            let movie_id = u64::try_from(args.id).context("Invalid movie ID provided.")?;
            api.movie_details(movie_id)
                .await
                .map(|details| render::details(&details, json))
        }
        Commands::Search(args) => api
            .search_movies(args.query.trim())
            .await
            .map(|results| render::movies(&results, json)),
        Commands::Home => return run_home(api, json).await,
        Commands::Config(_) => bail!("config is not a catalog command"),
    };

    match result {
        Ok(rendered) => rendered,
        Err(err) => bail!(report_failure(&err)),
    }
}

/// Renders the home view. A failed section shows its error message and the
/// remaining section is still rendered.
///
/// # Errors
///
/// Returns an error only if rendering itself fails.
#[allow(clippy::future_not_send)]
async fn run_home<A: LocalMovieApi>(api: &A, json: bool) -> Result<()> {
    match api.top_rated_movie_with_videos().await {
        Ok(top) => render::top_rated(&top, json)?,
        Err(err) => tracing::error!("{}", report_failure(&err)),
    }

    match api.genres().await {
        Ok(genres) => render::genres(&genres, json)?,
        Err(err) => tracing::error!("{}", report_failure(&err)),
    }

    Ok(())
}

/// Runs the `config init` subcommand.
///
/// # Errors
///
/// Returns an error if the file exists (without `--force`) or cannot be written.
fn run_config_init(args: &ConfigInitArgs, dir: Option<&PathBuf>) -> Result<()> {
    let path = resolve_config_path(dir)?;
    if path.exists() && !args.force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    AppConfig::default().save(&path)?;
    tracing::info!("Wrote default config to {}", path.display());
    Ok(())
}

/// Runs the `config show` subcommand.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or serialized.
fn run_config_show(dir: Option<&PathBuf>) -> Result<()> {
    let path = resolve_config_path(dir)?;
    let config = AppConfig::load(&path)?;

    tracing::info!("# {}", path.display());
    tracing::info!("\n{}", config.redacted().to_toml()?);
    if std::env::var_os(TOKEN_ENV_VAR).is_some() {
        tracing::info!("{TOKEN_ENV_VAR} is set and takes precedence over tmdb.api_token");
    }
    Ok(())
}

/// Entry point.
///
/// # Errors
///
/// Returns an error if subcommand execution fails.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    #[cfg(not(feature = "otel"))]
    {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false)
            .init();
    }

    #[cfg(feature = "otel")]
    {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

        let otel_layer = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .and_then(|_| {
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .build()
                    .ok()?;

                let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                    .with_simple_exporter(exporter)
                    .build();

                let tracer = opentelemetry::trace::TracerProvider::tracer(
                    &tracer_provider,
                    env!("CARGO_PKG_NAME"),
                );
                opentelemetry::global::set_tracer_provider(tracer_provider);

                Some(tracing_opentelemetry::layer().with_tracer(tracer))
            });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .init();
    }

    let cli = Cli::parse();
    match &cli.command {
        Commands::Config(cmd) => match &cmd.command {
            ConfigSubcommands::Init(args) => run_config_init(args, cli.dir.as_ref()),
            ConfigSubcommands::Show => run_config_show(cli.dir.as_ref()),
        },
        command => run_catalog_command(command, cli.dir.as_ref(), cli.json).await,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use moviedeck_api::tmdb::CatalogSettings;

    use super::*;

    #[test]
    fn test_failure_messages_per_operation() {
        // Arrange & Act & Assert
        assert_eq!(
            failure_message(Operation::Genres),
            "An error occurred while fetching genres."
        );
        assert_eq!(
            failure_message(Operation::MoviesByGenre),
            "An error occurred while fetching movies."
        );
        assert_eq!(
            failure_message(Operation::MovieDetails),
            "An error occurred while fetching movie details."
        );
        assert_eq!(
            failure_message(Operation::SearchMovies),
            "An error occurred while searching for movies."
        );
        assert_eq!(
            failure_message(Operation::TopRatedMovie),
            "An error occurred while fetching the top-rated movie."
        );
    }

    #[test]
    fn test_validate_input_rejects_non_positive_id() {
        // Arrange
        let command = Commands::Details(DetailsArgs { id: -5 });

        // Act
        let err = validate_input(&command).unwrap_err();

        // Assert
        assert_eq!(err.to_string(), "Invalid movie ID provided.");
    }

    #[test]
    fn test_validate_input_rejects_blank_query() {
        // Arrange
        let command = Commands::Search(SearchArgs {
            query: String::from(" \t "),
        });

        // Act
        let err = validate_input(&command).unwrap_err();

        // Assert
        assert_eq!(err.to_string(), "Search query cannot be empty.");
    }

    #[test]
    fn test_validate_input_accepts_other_commands() {
        // Arrange
        let commands = [
            Commands::Genres,
            Commands::Details(DetailsArgs { id: 27205 }),
            Commands::Search(SearchArgs {
                query: String::from("Inception"),
            }),
        ];

        // Act & Assert
        for command in &commands {
            assert!(validate_input(command).is_ok());
        }
    }

    #[tokio::test]
    async fn test_dispatch_rejects_config_command() {
        // Arrange
        let client = ApiClient::builder()
            .token_source(StaticToken::new("secret"))
            .user_agent("test/0.0.0")
            .build()
            .unwrap();
        let settings = CatalogSettings::new("http://127.0.0.1:9/3").unwrap();
        let catalog = TmdbCatalog::new(client, settings, PassthroughCache);
        let command = Commands::Config(ConfigCommand {
            command: ConfigSubcommands::Show,
        });

        // Act
        let err = dispatch(&catalog, &command, false).await.unwrap_err();

        // Assert
        assert_eq!(err.to_string(), "config is not a catalog command");
    }

    #[test]
    fn test_cli_parses_discover_defaults() {
        // Arrange & Act
        let cli = Cli::try_parse_from(["moviedeck", "discover"]).unwrap();

        // Assert
        assert!(matches!(
            cli.command,
            Commands::Discover(DiscoverArgs {
                genre_id: None,
                page: 1
            })
        ));
    }

    #[test]
    fn test_cli_parses_negative_id() {
        // Arrange & Act
        let cli = Cli::try_parse_from(["moviedeck", "details", "--id", "-5"]).unwrap();

        // Assert
        assert!(matches!(cli.command, Commands::Details(DetailsArgs { id: -5 })));
    }
}
