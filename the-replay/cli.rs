use std::path::PathBuf;

use clap::{
  ArgAction,
  Parser,
};

#[derive(Parser, Debug)]
#[command(name = "the-replay", about, long_about = None)]
pub struct Cli {
  /// Document to start from, as a JSON array of nodes
  #[arg(value_name = "DOCUMENT")]
  pub document: PathBuf,

  /// Steps to replay, as TOML
  #[arg(value_name = "SCRIPT")]
  pub script: PathBuf,

  /// Load reconciler settings from a TOML file
  #[arg(short = 'c', long = "config", value_name = "FILE")]
  pub config_file: Option<PathBuf>,

  /// Print the final document as JSON instead of plain text
  #[arg(long)]
  pub json: bool,

  /// Wait out `advance` steps in real time instead of jumping the clock
  #[arg(long)]
  pub realtime: bool,

  /// Increase logging verbosity (repeat for more detail)
  #[arg(short = 'v', action = ArgAction::Count)]
  pub verbosity: u8,

  /// Save logs to a specific file instead of stderr
  #[arg(long = "log", value_name = "FILE")]
  pub log_file: Option<PathBuf>,
}
