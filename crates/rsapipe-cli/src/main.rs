//! rsapipe: encrypt and decrypt files with an RSA private key
//!
//! Commands:
//!   encrypt -i <in> -o <out>   - seal a file with the key's public half
//!   decrypt -i <in> -o <out>   - open a file sealed by `encrypt`
//!   keygen -o <path>           - write a new 4096-bit PEM private key
//!   config show                - display the effective configuration

mod files;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::{ExposeSecret, SecretSlice};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use rsapipe_core::config::{expand_tilde, RsapipeConfig};
use rsapipe_crypto::{CipherPipe, DekCipher, Direction, KeyPair, KEY_BITS};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "rsapipe",
    version,
    about = "Simple and easy file encryption with an RSA key",
    long_about = "rsapipe: encrypt and decrypt files of any size with an RSA private key \
                  (chunked RSA-OAEP with SHA-512)"
)]
struct Cli {
    /// Path to config.toml
    #[arg(
        long,
        short = 'c',
        env = "RSAPIPE_CONFIG",
        default_value = "~/.config/rsapipe/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "RSAPIPE_LOG")]
    log: Option<String>,

    /// Log format; overrides the config file
    #[arg(long, env = "RSAPIPE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file with the public half of the private key
    Encrypt(PipeArgs),

    /// Decrypt a file produced by `encrypt`
    Decrypt(PipeArgs),

    /// Generate a new 4096-bit RSA private key in PEM format
    Keygen {
        /// Where to write the key ("-" for stdout)
        #[arg(long, short = 'o')]
        output: PathBuf,

        #[command(flatten)]
        passphrase: PassphraseArgs,

        /// Cipher protecting the key when a passphrase is given
        #[arg(long, default_value = "AES-256-CBC")]
        cipher: DekCipher,

        /// Overwrite an existing key file
        #[arg(long)]
        force: bool,
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

#[derive(Args, Debug)]
struct PipeArgs {
    /// Path to input file ("-" for stdin)
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Path to output file ("-" for stdout)
    #[arg(long, short = 'o')]
    output: PathBuf,

    /// PEM private key (default: key.private_key from config, ~/.ssh/id_rsa)
    #[arg(long, short = 'k')]
    key: Option<PathBuf>,

    #[command(flatten)]
    passphrase: PassphraseArgs,

    /// Transform chunks in parallel
    #[arg(long)]
    parallel: bool,
}

#[derive(Args, Debug)]
struct PassphraseArgs {
    /// Passphrase for the RSA key
    #[arg(
        long = "passwd",
        short = 'p',
        env = "RSAPIPE_PASSPHRASE",
        hide_env_values = true,
        conflicts_with = "ask_passphrase"
    )]
    passphrase: Option<String>,

    /// Prompt for the passphrase on the terminal
    #[arg(long)]
    ask_passphrase: bool,
}

impl PassphraseArgs {
    /// The passphrase to unlock an existing key; empty when none was given.
    fn for_existing_key(&self) -> Result<SecretSlice<u8>> {
        if self.ask_passphrase {
            let entered =
                rpassword::prompt_password("Key passphrase: ").context("reading passphrase")?;
            return Ok(SecretSlice::from(entered.into_bytes()));
        }
        Ok(SecretSlice::from(
            self.passphrase.clone().unwrap_or_default().into_bytes(),
        ))
    }

    /// The passphrase to protect a new key, confirmed when prompted.
    fn for_new_key(&self) -> Result<SecretSlice<u8>> {
        if !self.ask_passphrase {
            return self.for_existing_key();
        }
        let first = rpassword::prompt_password("New key passphrase: ")
            .context("reading passphrase")?;
        let second = rpassword::prompt_password("Repeat passphrase: ")
            .context("reading passphrase")?;
        if first != second {
            anyhow::bail!("passphrases do not match");
        }
        Ok(SecretSlice::from(first.into_bytes()))
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = RsapipeConfig::load(&config_path)?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = match cli.log_format.clone() {
        Some(format) => format,
        None => <LogFormat as ValueEnum>::from_str(&config.log.format, true)
            .map_err(|e| anyhow::anyhow!("invalid log.format in config: {e}"))?,
    };
    init_logging(&level, &format);

    match cli.command {
        Commands::Encrypt(args) => cmd_pipe(&config, &args, Direction::Encrypt),
        Commands::Decrypt(args) => cmd_pipe(&config, &args, Direction::Decrypt),
        Commands::Keygen {
            output,
            passphrase,
            cipher,
            force,
        } => cmd_keygen(&output, &passphrase, cipher, force),
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &config_path),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout may carry ciphertext, so logs go to stderr
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Progress helpers ──────────────────────────────────────────────────────────

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ── `rsapipe encrypt` / `rsapipe decrypt` ─────────────────────────────────────

fn cmd_pipe(config: &RsapipeConfig, args: &PipeArgs, direction: Direction) -> Result<()> {
    let (prefix, verb) = match direction {
        Direction::Encrypt => ("encrypt", "Encryption"),
        Direction::Decrypt => ("decrypt", "Decryption"),
    };

    let key_path = args
        .key
        .as_deref()
        .map(expand_tilde)
        .unwrap_or_else(|| config.private_key_path());
    let passphrase = args.passphrase.for_existing_key()?;

    let spinner = make_spinner(prefix);
    spinner.set_message(format!("loading key {}", key_path.display()));

    let key_pem = files::read_key(&key_path)?;
    let key = match KeyPair::parse(&key_pem, passphrase.expose_secret()) {
        Ok(key) => key,
        Err(e) => {
            spinner.abandon_with_message(format!("{verb} failed!"));
            return Err(e).with_context(|| format!("cannot set cipher from {}", key_path.display()));
        }
    };
    info!(key = %key_path.display(), bits = key.bits(), "key loaded");

    let pipe = CipherPipe::new(&key, direction).with_parallel(args.parallel || config.cipher.parallel);

    spinner.set_message(format!("{} → {}", args.input.display(), args.output.display()));
    let source = files::open_source(&args.input)?;
    let mut sink = files::create_sink(&args.output)?;

    match pipe.pipe(source, &mut sink) {
        Ok(summary) => {
            spinner.finish_with_message(format!(
                "{verb} done: {} in, {} out, {} chunks",
                fmt_bytes(summary.bytes_in as u64),
                fmt_bytes(summary.bytes_out as u64),
                summary.chunks
            ));
            info!(
                input = %args.input.display(),
                output = %args.output.display(),
                chunks = summary.chunks,
                "{prefix} complete"
            );
            Ok(())
        }
        Err(e) => {
            spinner.abandon_with_message(format!("{verb} failed!"));
            sink.discard();
            Err(e).with_context(|| format!("cannot {prefix} {}", args.input.display()))
        }
    }
}

// ── `rsapipe keygen` ──────────────────────────────────────────────────────────

fn cmd_keygen(output: &Path, passphrase: &PassphraseArgs, cipher: DekCipher, force: bool) -> Result<()> {
    let passphrase = passphrase.for_new_key()?;

    let spinner = make_spinner("keygen");
    spinner.set_message(format!("generating {KEY_BITS}-bit RSA key"));

    let key = match KeyPair::generate() {
        Ok(key) => key,
        Err(e) => {
            spinner.abandon_with_message("Key generation failed!");
            return Err(e.into());
        }
    };

    let pem = if passphrase.expose_secret().is_empty() {
        key.to_pem()?
    } else {
        key.to_encrypted_pem(passphrase.expose_secret(), cipher)?
    };
    files::write_private_key(output, pem.as_bytes(), force)?;

    spinner.finish_with_message(format!("Key written to {}", output.display()));
    info!(
        output = %output.display(),
        encrypted = !passphrase.expose_secret().is_empty(),
        "key generated"
    );
    Ok(())
}

// ── `rsapipe config show` ─────────────────────────────────────────────────────

fn cmd_config_show(config: &RsapipeConfig, config_path: &Path) -> Result<()> {
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

// ── Utilities ─────────────────────────────────────────────────────────────────

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
