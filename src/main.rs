mod cli;
mod error;
mod logging;
mod offsets;
mod output;
mod parameters;
mod processor;
mod readers;
mod reorder;
mod router;
mod run;
mod types;
mod validators;

use std::io::IsTerminal;
use std::path::Path;

use clap::Parser;
use cli::{CleanArgs, Cli, Commands};
use logging::{init_logging, LogConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use types::{Result, RunOptions, RUN_STAMP_FORMAT};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_verbosity(cli.verbose)
        .with_format(cli.log_format.into())
        .with_ansi(std::io::stderr().is_terminal());
    init_logging(&log_config);

    match cli.command {
        Some(Commands::Clean(args)) => clean(args)?,
        None => clean(cli.clean)?,
        Some(Commands::Offsets {
            input,
            out,
            format,
            max_fuzz,
            seed,
        }) => {
            let options = offsets::OffsetOptions {
                format,
                max_fuzz_seconds: max_fuzz,
            };
            match seed {
                Some(seed) => {
                    let mut rng = StdRng::seed_from_u64(seed);
                    offsets::run_offsets(&input, &out, &options, &mut rng)?;
                }
                None => {
                    let mut rng = rand::rng();
                    offsets::run_offsets(&input, &out, &options, &mut rng)?;
                }
            }
        }
        Some(Commands::Reorder {
            data,
            header,
            out,
            delimiter,
        }) => {
            let delimiter = readers::csv::delimiter_byte(delimiter)?;
            reorder::reorder_columns(&data, &header, &out, delimiter)?;
        }
    }

    Ok(())
}

fn clean(args: CleanArgs) -> Result<()> {
    let run_stamp = chrono::Local::now().format(RUN_STAMP_FORMAT).to_string();
    let mut options = RunOptions::new(args.source, args.parameters, run_stamp);
    if let Some(dir) = args.out_dir {
        options.output_dir = dir;
    }
    options.lenient_types = args.lenient_types;
    options.hash_source = !args.no_hash;

    let summary = run::run_clean(&options)?;

    match args.summary.as_deref() {
        Some(path) if path == Path::new("-") => output::write_json_stdout(&summary)?,
        Some(path) => output::write_json_file(&summary, path)?,
        None => {}
    }
    Ok(())
}
