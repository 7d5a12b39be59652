use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use norscope::cli::{Cli, OutputFormat};
use norscope::engine;
use norscope::json_output;
use norscope::model::DeviceContext;

fn main() -> Result<()> {
    let args = Cli::parse();

    if args.debug {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(io::stderr)
            .init();
    }

    let ctx = DeviceContext::new(
        args.jedec.as_deref().unwrap_or(""),
        args.sck_hz,
        args.capacity_bytes,
    );

    let results = open_input(&args.results);
    let catalog = open_input(&args.catalog);

    match args.format {
        OutputFormat::Csv => {
            if args.output.as_os_str() == "-" {
                let stdout = io::stdout();
                engine::generate_report(results, catalog, &ctx, stdout.lock())
                    .context("report generation failed")?;
            } else {
                let file = File::create(&args.output)
                    .with_context(|| format!("failed to create {}", args.output.display()))?;
                let guess = engine::generate_report(results, catalog, &ctx, BufWriter::new(file))
                    .context("report generation failed")?;
                println!(
                    "report written to {} (final guess: {} {} / {})",
                    args.output.display(),
                    guess.jedec,
                    guess.model,
                    guess.company
                );
            }
        }
        OutputFormat::Json => {
            let data = engine::build_report(results, catalog, &ctx);
            let rendered =
                json_output::render_json(&data).context("failed to serialise report as JSON")?;
            if args.output.as_os_str() == "-" {
                println!("{rendered}");
            } else {
                std::fs::write(&args.output, rendered.as_bytes())
                    .with_context(|| format!("failed to write {}", args.output.display()))?;
                println!("report written to {}", args.output.display());
            }
        }
    }

    Ok(())
}

/// Open one of the input streams. A missing or unreadable input is not
/// fatal: the engine degrades to NA cells, so it just becomes empty here.
fn open_input(path: &Path) -> Box<dyn BufRead> {
    match File::open(path) {
        Ok(file) => Box::new(BufReader::new(file)),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "input not readable; treating as empty");
            Box::new(io::empty())
        }
    }
}
