use clap::{Parser, Subcommand};
use image_session::config::{self, ConfigError, SessionConfig};
use image_session::imaging::{
    ImageFormat, Quality, ResizeError, ResizeMode, SaveError, UnknownFormat,
};
use image_session::output::{self, DeriveReport, DerivedVariant};
use image_session::{ImageSession, SessionError, Upload};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "image-session")]
#[command(version)]
#[command(about = "Validate an image upload and derive resized variants")]
#[command(long_about = "\
Validate an image upload and derive resized variants

Each run is one session: the file is checked against the upload rules,
decoded once, and every variant is resized from that original. Temporary
files are removed when the command exits.

Variants are written as ID=MODE:WxH[:FORMAT[:QUALITY]]:

  thumb=shrink:200x200:jpeg:90   fit inside 200x200, keep aspect, JPEG q90
  square=crop:300x300            center crop to 1:1, then 300x300, PNG
  banner=stretch:1200x300:gif    exactly 1200x300, aspect ignored

Modes: stretch, shrink, crop. Formats: jpeg, gif, png (default png).
Each variant is saved as OUT/ID.<ext>.

Run 'image-session gen-config' to generate a documented image-session.toml.")]
struct Cli {
    /// Config file (default: ./image-session.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log more (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// The uploaded file and how it was declared.
#[derive(clap::Args, Clone)]
struct UploadArgs {
    /// Image file
    file: PathBuf,

    /// Declared MIME type (default: guessed from the extension)
    #[arg(long)]
    mime: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Validate and decode a file, then print its size
    Check(UploadArgs),
    /// Resize a file into one or more variants and save them
    Derive {
        #[command(flatten)]
        upload: UploadArgs,

        /// Existing output directory
        #[arg(long)]
        out: PathBuf,

        /// Variant to produce, as ID=MODE:WxH[:FORMAT[:QUALITY]]
        #[arg(long = "variant", required = true)]
        variants: Vec<VariantSpec>,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print a stock image-session.toml with all options documented
    GenConfig,
}

/// One `--variant` argument.
#[derive(Debug, Clone, PartialEq)]
struct VariantSpec {
    id: String,
    mode: ResizeMode,
    width: u32,
    height: u32,
    format: String,
    quality: Option<Quality>,
}

impl FromStr for VariantSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, rest) = s
            .split_once('=')
            .ok_or_else(|| format!("'{s}' is not ID=MODE:WxH[:FORMAT[:QUALITY]]"))?;
        let mut parts = rest.split(':');
        let mode: ResizeMode = parts
            .next()
            .unwrap_or_default()
            .parse()
            .map_err(|e: ResizeError| e.to_string())?;
        let size = parts
            .next()
            .ok_or_else(|| format!("'{s}' is missing WxH"))?;
        let (width, height) = size
            .split_once(['x', 'X'])
            .and_then(|(w, h)| Some((w.parse().ok()?, h.parse().ok()?)))
            .ok_or_else(|| format!("'{size}' is not WxH"))?;
        let format = parts.next().unwrap_or("png").to_string();
        let quality = parts
            .next()
            .map(|q| q.parse().map(Quality::new))
            .transpose()
            .map_err(|_| format!("quality in '{s}' is not a number"))?;
        if parts.next().is_some() {
            return Err(format!("'{s}' has too many ':' fields"));
        }
        Ok(Self {
            id: id.to_string(),
            mode,
            width,
            height,
            format,
            quality,
        })
    }
}

/// A failed command: what to log and what to show.
struct Failure {
    detail: String,
    user_message: String,
}

impl From<SessionError> for Failure {
    fn from(err: SessionError) -> Self {
        Self {
            detail: err.detail(),
            user_message: err.user_message().to_string(),
        }
    }
}

impl From<ConfigError> for Failure {
    fn from(err: ConfigError) -> Self {
        Self {
            detail: err.to_string(),
            user_message: "The configuration could not be loaded.".to_string(),
        }
    }
}

impl From<std::io::Error> for Failure {
    fn from(err: std::io::Error) -> Self {
        Self {
            detail: err.to_string(),
            user_message: "The file could not be read.".to_string(),
        }
    }
}

impl From<serde_json::Error> for Failure {
    fn from(err: serde_json::Error) -> Self {
        Self {
            detail: err.to_string(),
            user_message: "The report could not be written.".to_string(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            error!(detail = %failure.detail, "command failed");
            eprintln!("{}", output::format_error(&failure.user_message));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "warn,image_session=info",
        _ => "warn,image_session=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Failure> {
    match cli.command {
        Command::Check(args) => {
            let config = load_config(cli.config.as_deref())?;
            let upload = Upload::from_file(&args.file, args.mime.as_deref())?;
            let session = open_session(&upload, &config)?;
            output::print_check_output(&upload, session.original_size()?);
            session.close()?;
        }
        Command::Derive {
            upload: args,
            out,
            variants,
            json,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let upload = Upload::from_file(&args.file, args.mime.as_deref())?;
            let mut session = open_session(&upload, &config)?;

            let mut report = DeriveReport {
                source: upload.name.clone(),
                original: session.original_size()?,
                variants: Vec::new(),
            };
            for wanted in variants {
                let format: ImageFormat = wanted
                    .format
                    .parse()
                    .map_err(|e: UnknownFormat| SessionError::from(SaveError::from(e)))?;
                let dimensions =
                    session.resize(&wanted.id, wanted.mode, wanted.width, wanted.height)?;
                let path =
                    session.save(&wanted.id, &out, &wanted.id, &wanted.format, wanted.quality)?;
                report.variants.push(DerivedVariant {
                    format,
                    id: wanted.id,
                    mode: wanted.mode,
                    requested: (wanted.width, wanted.height).into(),
                    dimensions,
                    path,
                });
            }
            session.close()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_derive_output(&upload, &report);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }
    Ok(())
}

/// `--config` must exist; the default file is optional.
fn load_config(path: Option<&Path>) -> Result<SessionConfig, ConfigError> {
    match path {
        Some(path) => config::load_config_file(path),
        None => config::load_config(Path::new(config::CONFIG_FILENAME)),
    }
}

fn open_session(upload: &Upload, config: &SessionConfig) -> Result<ImageSession, Failure> {
    let session = ImageSession::initialize(
        upload,
        &config.allowed_formats()?,
        &config.session_options(),
    );
    if let Some(err) = session.init_error() {
        return Err(Failure {
            detail: err.detail(),
            user_message: err.user_message().to_string(),
        });
    }
    Ok(session)
}
