//! chessclip CLI: moves and PGN from a chess video.

use std::path::PathBuf;
use std::process::ExitCode;

use chessclip::{
    open_source, ChessclipConfig, JobResult, JsonResultWriter, PipelineDriver, PrerectifiedInput,
    ProgressSink, ProgressUpdate, ResultSink,
};
use clap::{ArgAction, Parser};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "chessclip")]
#[command(about = "Extract the moves of a chess game from a video of the board")]
#[command(version)]
struct Cli {
    /// Video file, or a directory of still frames.
    input: PathBuf,

    /// JSON config; missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the result (status, moves, pgn) as JSON.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Frame rate, overriding the one reported by the input.
    #[arg(long)]
    fps: Option<f64>,

    /// Frames already show the board top-down, cropped to its edges.
    #[arg(long)]
    prerectified: bool,

    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Log as JSON lines (requires the `tracing` feature).
    #[arg(long)]
    json_log: bool,
}

/// Logs status changes and every tenth percent.
struct LogProgress {
    last: Option<ProgressUpdate>,
}

impl ProgressSink for LogProgress {
    fn report(&mut self, update: ProgressUpdate) {
        let changed = self.last.as_ref().is_none_or(|last| {
            last.status != update.status || update.progress / 10 != last.progress / 10
        });
        if changed {
            log::info!("{:?} {}%", update.status, update.progress);
        }
        self.last = Some(update);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    #[cfg(feature = "tracing")]
    {
        let _ = tracing_log::LogTracer::init();
        chessclip::core::init_tracing(cli.json_log);
    }
    #[cfg(not(feature = "tracing"))]
    {
        if cli.json_log {
            eprintln!("warning: --json-log needs the `tracing` feature; using plain logs");
        }
        let _ = chessclip::core::init_with_level(chessclip::core::level_from_verbosity(cli.verbose));
    }
}

fn run(cli: &Cli) -> CliResult<()> {
    let config = match &cli.config {
        Some(path) => ChessclipConfig::load_json(path)?,
        None => ChessclipConfig::default(),
    };
    let mut source = open_source(&cli.input, cli.fps)?;
    let mut progress = LogProgress { last: None };
    let mut results: Box<dyn ResultSink> = match &cli.out {
        Some(path) => Box::new(JsonResultWriter::new(path)),
        None => Box::new(Vec::<JobResult>::new()),
    };

    let record = if cli.prerectified {
        let locator = PrerectifiedInput {
            canvas_size: config.locator.canvas_size,
        };
        PipelineDriver::new(locator, config).run(source.as_mut(), &mut progress, results.as_mut())?
    } else {
        PipelineDriver::from_config(config).run(source.as_mut(), &mut progress, results.as_mut())?
    };

    println!("moves: {}", record.moves.join(" "));
    println!();
    print!("{}", record.pgn);
    Ok(())
}
