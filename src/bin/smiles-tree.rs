use anyhow::{anyhow, bail, Context, Result};
use csv::{ReaderBuilder, Writer};
use smiles_tree::roundtrip::round_trip;
use smiles_tree::{decompile, init_logging, normalize, parse};
use std::fs::File;
use std::process::ExitCode;
use tracing::*;

const USAGE: &str = "\
usage: smiles-tree [--log <level>] <command>

commands:
  parse <SMILES>                            print the structural tree
  normalize <SMILES>                        print the serialized form
  roundtrip <SMILES>                        classify the round trip
  decompile [--no-metadata] <SMILES>        print builder code for the tree
  batch <in.csv> <out.csv> [--column <N>]   normalize a CSV column";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            let code = err
                .downcast_ref::<smiles_tree::Error>()
                .map_or(1, smiles_tree::Error::exit_code);
            ExitCode::from(code)
        }
    }
}

/// Remove `--name <value>` from `args`, returning the value.
fn take_option(args: &mut Vec<String>, name: &str) -> Result<Option<String>> {
    let Some(index) = args.iter().position(|arg| arg == name) else {
        return Ok(None);
    };
    if index + 1 >= args.len() {
        bail!("{name} needs a value\n\n{USAGE}");
    }
    let value = args.remove(index + 1);
    args.remove(index);
    Ok(Some(value))
}

fn take_flag(args: &mut Vec<String>, name: &str) -> bool {
    match args.iter().position(|arg| arg == name) {
        Some(index) => {
            args.remove(index);
            true
        }
        None => false,
    }
}

fn one_smiles(args: &[String]) -> Result<&str> {
    match args {
        [smiles] => Ok(smiles.as_str()),
        _ => bail!("expected exactly one SMILES string\n\n{USAGE}"),
    }
}

fn run(mut args: Vec<String>) -> Result<()> {
    if let Some(level) = take_option(&mut args, "--log")? {
        init_logging(&level);
    }
    if args.is_empty() {
        bail!("{USAGE}");
    }
    let command = args.remove(0);
    match command.as_str() {
        "parse" => {
            let tree = parse(one_smiles(&args)?)?;
            println!("{tree:#?}");
        }
        "normalize" => println!("{}", normalize(one_smiles(&args)?)?),
        "roundtrip" => println!("{}", round_trip(one_smiles(&args)?)?),
        "decompile" => {
            let include_metadata = !take_flag(&mut args, "--no-metadata");
            let tree = parse(one_smiles(&args)?)?;
            print!("{}", decompile(&tree, include_metadata)?);
        }
        "batch" => {
            let column = match take_option(&mut args, "--column")? {
                Some(column) => column
                    .parse::<usize>()
                    .with_context(|| format!("invalid column index {column}"))?,
                None => 0,
            };
            let [input, output] = args.as_slice() else {
                bail!("batch needs an input and an output file\n\n{USAGE}");
            };
            batch(input, output, column)?;
        }
        "help" | "--help" | "-h" => println!("{USAGE}"),
        other => return Err(anyhow!("unknown command {other}\n\n{USAGE}")),
    }
    Ok(())
}

/// Normalize the SMILES in `column` of every record of `input`, writing
/// `input,normalized,status` rows to `output`. Rows that fail are kept
/// with the error as their status.
fn batch(input: &str, output: &str, column: usize) -> Result<()> {
    let file = File::open(input).with_context(|| format!("failed to open {input}"))?;
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
    let file = File::create(output).with_context(|| format!("failed to create {output}"))?;
    let mut writer = Writer::from_writer(file);
    writer.write_record(["input", "normalized", "status"])?;

    let (mut rows, mut failed) = (0, 0);
    for record in reader.records() {
        let record = record.with_context(|| format!("failed to read a record of {input}"))?;
        let Some(smiles) = record.get(column).map(str::trim).filter(|s| !s.is_empty()) else {
            warn!("Skipping record without a SMILES in column {column}: {record:?}");
            continue;
        };
        rows += 1;
        match round_trip(smiles) {
            Ok(report) => {
                writer.write_record([smiles, report.first.as_str(), report.status.name()])?;
            }
            Err(err) => {
                failed += 1;
                writer.write_record([smiles, "", format!("error: {err}").as_str()])?;
            }
        }
    }
    writer.flush()?;
    info!("Wrote {rows} rows to {output} ({failed} failed)");
    Ok(())
}
