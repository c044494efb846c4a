use clap::Parser;
use lambdamusic::song::TrackSummary;
use lambdamusic::{Compiler, Error};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn, Level};
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "lambdamusic")]
#[command(version = "0.1.0")]
#[command(about = "MML to S98 compiler", long_about = None)]
struct Args {
    /// Input MML file
    #[arg(required_unless_present = "list_devices")]
    input: Option<PathBuf>,

    /// Output S98 file (defaults to the input with an .s98 extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log every parsed item and command
    #[arg(short, long)]
    verbose: bool,

    /// Open the result with the default player
    #[arg(short, long)]
    play: bool,

    /// List supported devices
    #[arg(short = 'L', long)]
    list_devices: bool,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .compact()
        .finish()
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.list_devices {
        for name in lambdamusic::chips::list_chips() {
            println!("{}", name);
        }
        return ExitCode::SUCCESS;
    }

    setup_logging(args.verbose);

    let input = match args.input {
        Some(input) => input,
        None => return ExitCode::FAILURE,
    };
    let output = args
        .output
        .unwrap_or_else(|| input.with_extension("s98"));

    let compiler = Compiler::new();
    match compiler.compile_file(&input, &output) {
        Ok(summary) => {
            print_summary(&summary);
            if args.play {
                info!("playing {}", output.display());
                if let Err(e) = open::that(&output) {
                    warn!("failed to open {}: {}", output.display(), e);
                }
            }
            ExitCode::SUCCESS
        }
        Err(Error::Compile(errors)) => {
            eprintln!("{}", errors);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Print the per-track result as a bordered table
fn print_summary(summary: &[TrackSummary]) {
    const WIDTHS: [usize; 5] = [15, 8, 9, 10, 10];
    let border: String = WIDTHS
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let border = format!("+{}+", border);

    let row = |cells: [String; 5]| {
        let cells: Vec<String> = cells
            .iter()
            .zip(WIDTHS)
            .map(|(cell, width)| format!(" {:<width$} ", cell, width = width))
            .collect();
        format!("|{}|", cells.join("|"))
    };

    println!("{}", border);
    println!(
        "{}",
        row(["Track", "DeviceNo", "ChannelNo", "Tick", "Loop"].map(String::from))
    );
    println!("{}", border);
    for track in summary {
        println!(
            "{}",
            row([
                track.name.clone(),
                track.device.to_string(),
                track.channel.to_string(),
                track.total_tick.to_string(),
                track.loop_tick.to_string(),
            ])
        );
    }
    println!("{}", border);
}
