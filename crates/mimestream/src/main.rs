use std::fs::File;
use std::io::{self, BufWriter, Read, Write};

use anyhow::Context;
use clap::Parser;
use mimestream_multipart::{EncoderOptions, MultipartEncoder};
use tracing::Level;

use crate::cli::App;

mod cli;

fn main() -> anyhow::Result<()> {
    let app = App::parse();
    init_tracing(app.verbose);
    run(&app)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn build_encoder(app: &App) -> anyhow::Result<MultipartEncoder> {
    let mut options = EncoderOptions::default()
        .close_after_read(!app.keep_open)
        .on_progress(|p| {
            let part = p.part.map(|part| part.name()).unwrap_or("<terminator>");
            match p.error {
                Some(err) => tracing::warn!(part, error = %err, "read failed"),
                None => tracing::debug!(
                    part,
                    bytes_read = p.bytes_read,
                    total = p.total_bytes,
                    percent = p.percentage(),
                    "progress"
                ),
            }
        });
    if let Some(boundary) = &app.boundary {
        options = options.boundary(boundary.clone());
    }

    let mut encoder = MultipartEncoder::with_options(options).context("invalid boundary")?;
    for (name, value) in &app.fields {
        encoder.add_field(name, value);
    }
    for (name, path) in &app.files {
        encoder
            .add_file(name, path)
            .with_context(|| format!("cannot add file '{}'", path.display()))?;
    }
    Ok(encoder)
}

fn write_body(
    encoder: &mut MultipartEncoder,
    out: &mut dyn Write,
    chunk_size: usize,
) -> anyhow::Result<u64> {
    let mut buf = vec![0u8; chunk_size];
    let mut written = 0u64;
    loop {
        let n = match encoder.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("failed to produce body"),
        };
        out.write_all(&buf[..n]).context("failed to write body")?;
        written += n as u64;
    }
    out.flush().context("failed to flush body")?;
    Ok(written)
}

fn run(app: &App) -> anyhow::Result<()> {
    let mut encoder = build_encoder(app)?;
    let total = encoder.total_length();
    eprintln!("Content-Type: {}", encoder.content_type());
    eprintln!("Content-Length: {total}");

    let chunk_size = app.chunk_size as usize;
    let result = match &app.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create '{}'", path.display()))?;
            write_body(&mut encoder, &mut BufWriter::new(file), chunk_size)
        }
        None => write_body(&mut encoder, &mut io::stdout().lock(), chunk_size),
    };

    let parts = encoder.len();
    let closed = encoder.close().context("failed to release files");
    let written = result?;
    closed?;

    tracing::info!(parts, bytes = written, expected = total, "body written");
    Ok(())
}
