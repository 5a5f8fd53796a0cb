mod cli;
mod replay;
mod script;

use std::{
  fs,
  path::Path,
};

use anyhow::{
  Context,
  Result,
};
use clap::Parser;
use the_input::ReconcilerConfig;
use the_model::Node;

use crate::{
  cli::Cli,
  replay::Replay,
  script::Script,
};

fn setup_logging(verbosity: u8, log_file: Option<&Path>) -> Result<()> {
  let level = match verbosity {
    0 => log::LevelFilter::Warn,
    1 => log::LevelFilter::Info,
    2 => log::LevelFilter::Debug,
    _ => log::LevelFilter::Trace,
  };

  let dispatch = fern::Dispatch::new()
    .format(|out, message, record| {
      out.finish(format_args!(
        "{} {} [{}] {}",
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
        record.target(),
        record.level(),
        message
      ))
    })
    .level(level);

  let dispatch = match log_file {
    Some(path) => dispatch.chain(fern::log_file(path)?),
    None => dispatch.chain(std::io::stderr()),
  };
  dispatch.apply()?;
  Ok(())
}

fn load_document(path: &Path) -> Result<Vec<Node>> {
  let source = fs::read_to_string(path)
    .with_context(|| format!("failed to read document {}", path.display()))?;
  serde_json::from_str(&source).with_context(|| format!("bad document {}", path.display()))
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  setup_logging(cli.verbosity, cli.log_file.as_deref())?;

  let config = match &cli.config_file {
    Some(path) => ReconcilerConfig::load(path)?,
    None => ReconcilerConfig::default(),
  };
  let children = load_document(&cli.document)?;
  let script = Script::load(&cli.script)?;
  log::info!(
    "replaying {} steps against {} blocks",
    script.steps.len(),
    children.len()
  );

  let mut replay = Replay::new(children, config);
  if cli.realtime {
    tokio::runtime::Builder::new_current_thread()
      .enable_time()
      .build()
      .context("failed to start the runtime")?
      .block_on(replay.run_realtime(&script))?;
  } else {
    replay.run(&script)?;
  }

  if cli.json {
    println!("{}", serde_json::to_string_pretty(replay.doc.children())?);
  } else {
    print!("{}", replay.summary());
  }
  Ok(())
}
