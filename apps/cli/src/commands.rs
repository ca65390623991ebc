//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use coursepack_core::{ConvertCourseConfig, ConvertResult, ProgressReporter, convert_course};
use coursepack_shared::{AppConfig, ConversionSettings, init_config, load_config, load_config_from};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// coursepack: convert OCW course dumps into edX OLX.
#[derive(Parser)]
#[command(
    name = "coursepack",
    version,
    about = "Convert OpenCourseWare course dumps into edX OLX packages.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Convert one or more course dumps (directories or .zip archives).
    Convert {
        /// Course dumps to convert.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output path: `*.xml` for an xbundle, `*.tar.gz`/`*.tgz` for an
        /// archive, anything else for a directory. Defaults to
        /// `<course_id>_xbundle.xml`.
        #[arg(short = 'o', long = "output-file")]
        output: Option<PathBuf>,

        /// Skip media-gallery sections.
        #[arg(long)]
        suppress_media: bool,

        /// Start offset in seconds for videos without an extracted trim.
        #[arg(long)]
        video_start_offset: Option<u32>,

        /// Read configuration from this file instead of ~/.coursepack/coursepack.toml.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Convert .srt subtitle files into .srt.sjson next to each input.
    Srt2sjson {
        /// Subtitle files to convert.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Manage configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "coursepack=info",
        1 => "coursepack=debug",
        _ => "coursepack=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Convert {
            inputs,
            output,
            suppress_media,
            video_start_offset,
            config,
        } => {
            let settings = resolve_settings(config.as_deref(), suppress_media, video_start_offset)?;
            cmd_convert(&inputs, output.as_deref(), &settings).await
        }
        Command::Srt2sjson { files } => cmd_srt2sjson(&files),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Merge the config file with command-line overrides.
fn resolve_settings(
    config_path: Option<&Path>,
    suppress_media: bool,
    video_start_offset: Option<u32>,
) -> Result<ConversionSettings> {
    let config = match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(apply_overrides(
        ConversionSettings::from(&config),
        suppress_media,
        video_start_offset,
    ))
}

fn apply_overrides(
    mut settings: ConversionSettings,
    suppress_media: bool,
    video_start_offset: Option<u32>,
) -> ConversionSettings {
    if suppress_media {
        settings.include_media = false;
    }
    if let Some(offset) = video_start_offset {
        settings.video_start_offset = offset;
    }
    settings
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_convert(
    inputs: &[PathBuf],
    output: Option<&Path>,
    settings: &ConversionSettings,
) -> Result<()> {
    if output.is_some() && inputs.len() > 1 {
        return Err(eyre!(
            "--output-file names a single output but {} inputs were given",
            inputs.len()
        ));
    }

    let mut failed = 0usize;
    for input in inputs {
        info!(
            input = %input.display(),
            semester = %settings.semester,
            include_media = settings.include_media,
            "converting course"
        );

        let config = ConvertCourseConfig {
            input: input.clone(),
            output: output.map(Path::to_path_buf),
            settings: settings.clone(),
        };
        let reporter = CliProgress::new();

        match convert_course(&config, &reporter).await {
            Ok(result) => print_summary(&result),
            Err(e) => {
                reporter.abandon();
                error!(input = %input.display(), error = %e, "conversion failed");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(eyre!("{failed} of {} course(s) failed to convert", inputs.len()));
    }
    Ok(())
}

fn print_summary(result: &ConvertResult) {
    println!();
    println!("  Course converted successfully!");
    println!("  Course:   {} ({})", result.title, result.course_id);
    println!(
        "  Outline:  {} chapters, {} sequentials, {} verticals",
        result.stats.chapters, result.stats.sequentials, result.stats.verticals
    );
    println!(
        "  Modules:  {} html, {} video, {} pdf",
        result.stats.html, result.stats.video, result.stats.problems
    );
    println!("  Static:   {} files", result.static_files);
    println!("  Output:   {}", result.output.display());
    println!("  Time:     {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

fn cmd_srt2sjson(files: &[PathBuf]) -> Result<()> {
    let mut failed = 0usize;
    for file in files {
        match coursepack_captions::convert_file(file) {
            Ok(Some(out)) => println!("{}", out.display()),
            Ok(None) => {}
            Err(e) => {
                error!(file = %file.display(), error = %e, "subtitle conversion failed");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(eyre!("{failed} of {} subtitle file(s) failed to convert", files.len()));
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        match ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            Ok(style) => spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            ),
            Err(e) => warn!(error = %e, "invalid progress template"),
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn abandon(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn chapter(&self, name: &str, index: usize) {
        self.spinner.set_message(format!("Chapter {index}: {name}"));
    }

    fn section(&self, name: &str) {
        self.spinner.set_message(format!("  Section {name}"));
    }

    fn done(&self, _result: &ConvertResult) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_flags_parse() {
        let cli = Cli::try_parse_from([
            "coursepack",
            "-vv",
            "convert",
            "8.01sc.zip",
            "18.06.zip",
            "--suppress-media",
            "--video-start-offset",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Convert {
                inputs,
                output,
                suppress_media,
                video_start_offset,
                config,
            } => {
                assert_eq!(inputs.len(), 2);
                assert!(output.is_none());
                assert!(suppress_media);
                assert_eq!(video_start_offset, Some(5));
                assert!(config.is_none());
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn convert_requires_an_input() {
        assert!(Cli::try_parse_from(["coursepack", "convert"]).is_err());
    }

    #[test]
    fn output_file_short_flag() {
        let cli =
            Cli::try_parse_from(["coursepack", "convert", "course", "-o", "out.tar.gz"]).unwrap();
        match cli.command {
            Command::Convert { output, .. } => {
                assert_eq!(output, Some(PathBuf::from("out.tar.gz")));
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn overrides_apply_on_top_of_config() {
        let base = ConversionSettings::default();
        assert!(base.include_media);

        let kept = apply_overrides(base.clone(), false, None);
        assert!(kept.include_media);
        assert_eq!(kept.video_start_offset, base.video_start_offset);

        let changed = apply_overrides(base, true, Some(12));
        assert!(!changed.include_media);
        assert_eq!(changed.video_start_offset, 12);
    }

    #[tokio::test]
    async fn multiple_inputs_reject_single_output() {
        let inputs = vec![PathBuf::from("a"), PathBuf::from("b")];
        let err = cmd_convert(
            &inputs,
            Some(Path::new("out.xml")),
            &ConversionSettings::default(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("2 inputs"));
    }

    #[tokio::test]
    async fn missing_input_fails_without_stopping_batch() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = vec![dir.path().join("missing-a"), dir.path().join("missing-b")];
        let err = cmd_convert(&inputs, None, &ConversionSettings::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("2 of 2"));
    }
}
