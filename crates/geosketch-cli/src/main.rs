//! geosketch: GeoSketch share-link CLI
//!
//! Commands:
//!   share [--encrypt]          - turn a WKT table (file or stdin) into a share link
//!   open <link>                - recover the payload of a `#data=` or `#encrypted=` link
//!   export --format <fmt>      - convert a WKT table to TSV, CSV or GeoJSON
//!   config show                - display current configuration
//!
//! Links and payloads go to stdout; logs, prompts and progress go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};
use url::Url;

use geosketch_core::config::GeosketchConfig;
use geosketch_core::table::{export_file_name, ExportFormat};
use geosketch_core::{FeatureTable, GeometryFilter, PasswordPrompt, PromptPurpose};
use geosketch_crypto::{KdfParams, ShareCodec};

/// Environment variable read by `--password-env`
const PASSWORD_ENV: &str = "GEOSKETCH_PASSWORD";

// ── CLI structure ──────────────────────────────────────────────────────────────

const DEFAULT_CONFIG_PATH: &str = "~/.config/geosketch/config.toml";

#[derive(Parser, Debug)]
#[command(
    name = "geosketch",
    version,
    about = "GeoSketch share links and feature tables",
    long_about = "geosketch: create and open GeoSketch share links (plain or password protected) and export WKT feature tables"
)]
struct Cli {
    /// Path to config.toml
    #[arg(
        long,
        short = 'c',
        env = "GEOSKETCH_CONFIG",
        default_value = DEFAULT_CONFIG_PATH
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides [log] level
    #[arg(long, env = "GEOSKETCH_LOG", global = true)]
    log: Option<String>,

    /// Log format (json, text); overrides [log] format
    #[arg(long, env = "GEOSKETCH_LOG_FORMAT", global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a share link from a WKT table
    Share {
        /// Read the payload from a file instead of stdin
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,
        /// Protect the link with a password
        #[arg(long, short = 'e')]
        encrypt: bool,
        /// Read the password from GEOSKETCH_PASSWORD instead of prompting
        #[arg(long)]
        password_env: bool,
        /// Page the link points at (overrides [share] base_url)
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Recover the payload of a share link
    Open {
        /// The link; "-" reads it from stdin
        link: String,
        /// Write the payload to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Read the password from GEOSKETCH_PASSWORD instead of prompting
        #[arg(long)]
        password_env: bool,
    },

    /// Convert a WKT table to TSV, CSV or GeoJSON
    Export {
        /// Read the table from a file instead of stdin
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,
        /// Output format (tsv, csv, geojson)
        #[arg(long, short = 'f', default_value = "geojson")]
        format: ExportFormat,
        /// Geometry filter (all, points, lines, polygons); overrides [export] filter
        #[arg(long)]
        filter: Option<GeometryFilter>,
        /// Output file, or a directory to receive sketch-<target>.<ext>
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = load_config(&config_path)?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.clone().unwrap_or_else(|| {
        <LogFormat as ValueEnum>::from_str(&config.log.format, true).unwrap_or(LogFormat::Text)
    });
    init_logging(&level, &format);

    if !config_path.exists() {
        if cli.config == Path::new(DEFAULT_CONFIG_PATH) {
            debug!("no config file at {}, using defaults", config_path.display());
        } else {
            warn!("config file not found: {}  (using defaults)", config_path.display());
        }
    }

    debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "geosketch starting"
    );

    match cli.command {
        Commands::Share {
            input,
            encrypt,
            password_env,
            base_url,
        } => cmd_share(&config, input.as_deref(), encrypt, password_env, base_url.as_deref()).await,
        Commands::Open {
            link,
            output,
            password_env,
        } => cmd_open(&config, &link, output.as_deref(), password_env).await,
        Commands::Export {
            input,
            format,
            filter,
            output,
        } => cmd_export(&config, input.as_deref(), format, filter, output.as_deref()).await,
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &config_path),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
}

fn load_config(path: &Path) -> Result<GeosketchConfig> {
    GeosketchConfig::load(path).with_context(|| format!("loading config: {}", path.display()))
}

fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(rest)
        }
        None => path.to_path_buf(),
    }
}

fn build_codec(
    config: &GeosketchConfig,
    base_url: Option<&str>,
    password_env: bool,
) -> Result<ShareCodec> {
    let raw = base_url.unwrap_or(&config.share.base_url);
    let base = Url::parse(raw).with_context(|| format!("invalid base URL: {raw}"))?;
    // an environment password cannot change between attempts
    let attempts = if password_env {
        1
    } else {
        config.share.max_password_attempts
    };
    Ok(ShareCodec::new(
        base,
        KdfParams {
            iterations: config.crypto.pbkdf2_iterations,
        },
        attempts,
    ))
}

// ── Input / output ────────────────────────────────────────────────────────────

async fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}

async fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            tokio::fs::write(path, content)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), bytes = content.len(), "wrote output");
        }
        None => {
            print!("{content}");
            if !content.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}

// ── Password prompt ───────────────────────────────────────────────────────────

/// Reads passwords from the terminal, or from GEOSKETCH_PASSWORD.
///
/// Once a password is accepted a spinner runs until the next prompt or
/// [`TerminalPrompt::finish`], covering key derivation.
struct TerminalPrompt {
    from_env: bool,
    spinner: Option<ProgressBar>,
}

impl TerminalPrompt {
    fn new(from_env: bool) -> Self {
        Self {
            from_env,
            spinner: None,
        }
    }

    fn finish(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

impl PasswordPrompt for TerminalPrompt {
    fn password(&mut self, purpose: PromptPurpose) -> io::Result<SecretString> {
        self.finish();

        let password = if self.from_env {
            std::env::var(PASSWORD_ENV).map_err(|_| {
                io::Error::new(io::ErrorKind::NotFound, format!("{PASSWORD_ENV} is not set"))
            })?
        } else {
            rpassword::prompt_password(format!("{}: ", purpose.title()))?
        };
        if password.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "please enter a password",
            ));
        }

        let prefix = match purpose {
            PromptPurpose::Encrypt => "encrypt",
            PromptPurpose::Decrypt => "decrypt",
        };
        self.spinner = Some(make_spinner(prefix, "deriving key"));
        Ok(SecretString::from(password))
    }
}

fn make_spinner(prefix: &str, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(prefix.to_string());
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ── `geosketch share` ─────────────────────────────────────────────────────────

async fn cmd_share(
    config: &GeosketchConfig,
    input: Option<&Path>,
    encrypt: bool,
    password_env: bool,
    base_url: Option<&str>,
) -> Result<()> {
    let text = read_input(input).await?;
    let codec = build_codec(config, base_url, password_env)?;

    let link = if encrypt {
        let mut prompt = TerminalPrompt::new(password_env);
        tokio::task::spawn_blocking(move || {
            let result = codec.share_encrypted(text.as_str(), &mut prompt);
            prompt.finish();
            result
        })
        .await
        .context("encryption task failed")?
        .context("creating encrypted link")?
    } else {
        codec.share_plain(text.as_str())
    };

    let kind = if encrypt { "encrypted" } else { "plain" };
    info!(
        kind,
        bytes = link.len(),
        "share link created"
    );
    println!("{link}");
    Ok(())
}

// ── `geosketch open` ──────────────────────────────────────────────────────────

async fn cmd_open(
    config: &GeosketchConfig,
    link: &str,
    output: Option<&Path>,
    password_env: bool,
) -> Result<()> {
    let link = if link == "-" {
        read_input(None).await?.trim().to_string()
    } else {
        link.to_string()
    };
    let codec = build_codec(config, None, password_env)?;
    let mut prompt = TerminalPrompt::new(password_env);

    let (kind, payload) = tokio::task::spawn_blocking(move || {
        let mut sink: Option<String> = None;
        let result = codec.open(&link, &mut prompt, &mut sink);
        prompt.finish();
        result.map(|kind| (kind, sink.unwrap_or_default()))
    })
    .await
    .context("decryption task failed")?
    .context("opening share link")?;

    match FeatureTable::parse_tsv(&payload) {
        Ok(table) => info!(
            ?kind,
            features = table.len(),
            skipped = table.skipped(),
            "opened share link"
        ),
        Err(e) => {
            info!(?kind, bytes = payload.len(), "opened share link");
            debug!("payload is not a feature table: {e}");
        }
    }

    write_output(output, &payload).await
}

// ── `geosketch export` ────────────────────────────────────────────────────────

async fn cmd_export(
    config: &GeosketchConfig,
    input: Option<&Path>,
    format: ExportFormat,
    filter: Option<GeometryFilter>,
    output: Option<&Path>,
) -> Result<()> {
    let text = read_input(input).await?;
    let table = FeatureTable::parse_tsv(&text).context("parsing feature table")?;
    let filter = filter.unwrap_or(config.export.filter);

    let count = table.count(filter);
    if count == 0 {
        anyhow::bail!("no features to export (filter: {filter})");
    }

    let rendered = table.export(format, filter).context("rendering export")?;
    info!(
        format = format.extension(),
        %filter,
        features = count,
        skipped = table.skipped(),
        "exporting"
    );

    let output = output.map(|path| resolve_output(path, config, format));
    write_output(output.as_deref(), &rendered).await
}

/// A directory receives the default export file name for the configured target.
fn resolve_output(path: &Path, config: &GeosketchConfig, format: ExportFormat) -> PathBuf {
    if path.is_dir() {
        path.join(export_file_name(config.export.target, format))
    } else {
        path.to_path_buf()
    }
}

// ── `geosketch config show` ───────────────────────────────────────────────────

fn cmd_config_show(config: &GeosketchConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geosketch_core::config::Target;

    #[test]
    fn test_parse_share_command() {
        let cli = Cli::try_parse_from([
            "geosketch",
            "share",
            "--encrypt",
            "--password-env",
            "-i",
            "sketch.tsv",
        ])
        .unwrap();
        match cli.command {
            Commands::Share {
                input,
                encrypt,
                password_env,
                base_url,
            } => {
                assert_eq!(input.as_deref(), Some(Path::new("sketch.tsv")));
                assert!(encrypt);
                assert!(password_env);
                assert!(base_url.is_none());
            }
            other => panic!("expected Share, got: {other:?}"),
        }
    }

    #[test]
    fn test_parse_export_command() {
        let cli = Cli::try_parse_from([
            "geosketch", "export", "--format", "tsv", "--filter", "polygons",
        ])
        .unwrap();
        match cli.command {
            Commands::Export { format, filter, .. } => {
                assert_eq!(format, ExportFormat::Tsv);
                assert_eq!(filter, Some(GeometryFilter::Polygons));
            }
            other => panic!("expected Export, got: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["geosketch", "export", "--format", "kml"]).is_err());
    }

    #[test]
    fn test_expand_tilde() {
        let home = std::env::var("HOME").unwrap_or_default();
        assert_eq!(
            expand_tilde(Path::new("~/.config/geosketch/config.toml")),
            PathBuf::from(home).join(".config/geosketch/config.toml")
        );
        assert_eq!(expand_tilde(Path::new("/etc/x.toml")), PathBuf::from("/etc/x.toml"));
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().unwrap();

        let missing = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(missing.share.max_password_attempts, 3);

        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[share]\nmax_password_attempts = 5\n").unwrap();
        assert_eq!(load_config(&path).unwrap().share.max_password_attempts, 5);

        std::fs::write(&path, "[crypto]\npbkdf2_iterations = 0\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("loading config"));
    }

    #[test]
    fn test_build_codec() {
        let config = GeosketchConfig::default();
        let codec = build_codec(&config, Some("https://example.org/mars.html"), true).unwrap();
        assert_eq!(codec.base_url().as_str(), "https://example.org/mars.html");
        assert_eq!(codec.kdf().iterations, config.crypto.pbkdf2_iterations);
        assert!(build_codec(&config, Some("not a url"), false).is_err());
    }

    #[test]
    fn test_resolve_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = GeosketchConfig::default();
        config.export.target = Target::Mars;

        let resolved = resolve_output(dir.path(), &config, ExportFormat::GeoJson);
        assert_eq!(resolved, dir.path().join("sketch-mars.geojson"));

        let file = dir.path().join("custom.tsv");
        assert_eq!(resolve_output(&file, &config, ExportFormat::Tsv), file);
    }
}
