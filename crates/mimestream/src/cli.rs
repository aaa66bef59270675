use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{ArgAction, Parser};

#[derive(Clone, Debug, Parser)]
#[command(name = "mimestream", version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
pub struct App {
    /// Form field as NAME=VALUE; repeat for more fields
    #[arg(short, long = "field", value_name = "NAME=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,

    /// File upload as NAME=PATH; repeat for more files
    #[arg(short = 'F', long = "file", value_name = "NAME=PATH", value_parser = parse_file)]
    pub files: Vec<(String, PathBuf)>,

    /// Fixed boundary instead of a random one
    #[arg(short, long)]
    pub boundary: Option<String>,

    /// Write the body here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Keep each file open until the whole body is written
    #[arg(long)]
    pub keep_open: bool,

    /// Read buffer size in bytes
    #[arg(long, default_value_t = 32 * 1024, value_parser = clap::value_parser!(u32).range(1..))]
    pub chunk_size: u32,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

fn split_pair(raw: &str) -> anyhow::Result<(&str, &str)> {
    let (name, value) = raw
        .split_once('=')
        .with_context(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    if name.is_empty() {
        bail!("empty name in '{raw}'");
    }
    Ok((name, value))
}

fn parse_field(raw: &str) -> anyhow::Result<(String, String)> {
    let (name, value) = split_pair(raw)?;
    Ok((name.to_owned(), value.to_owned()))
}

fn parse_file(raw: &str) -> anyhow::Result<(String, PathBuf)> {
    let (name, path) = split_pair(raw)?;
    if path.is_empty() {
        bail!("empty path in '{raw}'");
    }
    Ok((name.to_owned(), PathBuf::from(path)))
}
