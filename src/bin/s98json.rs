//! S98 to JSON converter

use clap::Parser;
use lambdamusic::s98::{S98Json, S98Reader};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "s98json")]
#[command(version = "0.1.0")]
#[command(about = "Convert S98 files to JSON", long_about = None)]
struct Args {
    /// Input S98 file
    input: PathBuf,

    /// Output JSON file (writes to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output compact JSON (default is pretty-printed)
    #[arg(short, long)]
    compact: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let data = fs::read(&args.input)?;
    let mut reader = S98Reader::new(&data);

    let header = reader.parse_header()?;
    let tag = reader.parse_tag(&header)?;
    let commands = reader.parse_commands(&header)?;

    let s98_json = S98Json::new(&header, tag, commands);

    let json_string = if args.compact {
        serde_json::to_string(&s98_json)?
    } else {
        serde_json::to_string_pretty(&s98_json)?
    };

    match args.output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(json_string.as_bytes())?;
            file.write_all(b"\n")?;
        }
        None => {
            println!("{}", json_string);
        }
    }

    Ok(())
}
