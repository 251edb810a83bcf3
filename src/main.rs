use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;

use kdenlive_guides::remux::{DEFAULT_FFMPEG, Ffmpeg};
use kdenlive_guides::{Error, Options};

/// Add Kdenlive project guides as chapters to a media file
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Source media file
    #[arg(long)]
    input: PathBuf,

    /// Remuxed file with chapters
    #[arg(long)]
    output: PathBuf,

    /// Kdenlive project file holding the guides
    #[arg(long)]
    guides: PathBuf,

    /// Verbose logging
    #[arg(long)]
    debug: bool,

    /// ffmpeg binary
    #[arg(long, env = "FFMPEG", default_value = DEFAULT_FFMPEG)]
    ffmpeg: PathBuf,

    /// Keep the intermediate FFMETADATA file at this path
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Print the chapters without running ffmpeg
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(log_level(args.debug))
        .parse_default_env()
        .init();

    let result = convert(&args);
    if let Err(e) = &result {
        log::error!("{}: {e:?}", failure_phase(e));
    }
    ExitCode::from(exit_code(&result))
}

fn log_level(debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn exit_code(result: &anyhow::Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn failure_phase(e: &anyhow::Error) -> &'static str {
    match e.downcast_ref::<Error>() {
        Some(Error::Parse(_)) => "Parsing guides failed",
        Some(Error::Tool(_)) => "External tool failed",
        Some(Error::Io { .. }) | None => "Conversion failed",
    }
}

fn convert(args: &Args) -> anyhow::Result<()> {
    let options = Options {
        input: args.input.clone(),
        output: args.output.clone(),
        guides: args.guides.clone(),
        metadata: args.metadata.clone(),
        dry_run: args.dry_run,
    };
    let ffmpeg = Ffmpeg::new(&args.ffmpeg);
    log::debug!("Using ffmpeg at {}", ffmpeg.program().display());

    let summary = kdenlive_guides::run(&options, &ffmpeg, &ffmpeg).with_context(|| {
        format!(
            "Failed to add guides from {} to {}",
            args.guides.display(),
            args.input.display()
        )
    })?;

    if summary.output.is_none() {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(summary.chapters.to_os_string().as_encoded_bytes())?;
    }

    Ok(())
}
