//! Load a co-simulation component, run it for a fixed interval and print
//! named variables after every step.
//!
//! Run with:
//!   cargo run -p fmiprims --example run-component --features logging -- \
//!     <shared-object> <model-identifier> --revision 2 --variables vars.json \
//!     --stop-time 10 --step-size 0.01 [name...]
//!
//! `vars.json` has the shape
//! `{"variables": [{"name": "h", "valueReference": 0, "kind": "real"}]}`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use fmiprims::abi::{self, AbiRevision, InstantiateParams};
use fmiprims::access::{NameCache, ScalarKind, VariableAccessor, VariableTable};
use fmiprims::instance::ComponentInstance;
use fmiprims::logging::{init_logging, LogFormat, LogLevel};

#[derive(Parser, Debug)]
#[command(name = "run-component", about = "Step a simulation component and print variables")]
struct Cli {
    /// Shared object exporting the component entry points.
    library: PathBuf,

    /// Model identifier (prefixes every revision-1 symbol).
    model_identifier: String,

    /// Native interface revision.
    #[arg(long, value_name = "REV", default_value = "2")]
    revision: Revision,

    /// JSON table mapping variable names to value references.
    #[arg(long, value_name = "PATH")]
    variables: PathBuf,

    #[arg(long, value_name = "SECONDS", default_value_t = 1.0)]
    stop_time: f64,

    #[arg(long, value_name = "SECONDS", default_value_t = 0.01)]
    step_size: f64,

    /// Log format.
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Log level.
    #[arg(long, value_name = "LEVEL", default_value = "info", env = "FMIPRIMS_LOG")]
    log_level: LogLevel,

    /// Variables to print; every table entry when empty.
    names: Vec<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Revision {
    #[value(name = "1")]
    V1,
    #[value(name = "2")]
    V2,
}

impl From<Revision> for AbiRevision {
    fn from(revision: Revision) -> Self {
        match revision {
            Revision::V1 => AbiRevision::V1,
            Revision::V2 => AbiRevision::V2,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let table = VariableTable::from_file(&cli.variables)?;
    let watched: Vec<String> = if cli.names.is_empty() {
        table.names().into_iter().map(str::to_string).collect()
    } else {
        cli.names.clone()
    };

    let binding = abi::load(cli.revision.into(), &cli.library, &cli.model_identifier)?;
    eprintln!(
        "Loaded {} (version {}, platform {})",
        cli.library.display(),
        binding.version(),
        binding.types_platform()
    );

    let instance = ComponentInstance::create(
        binding,
        &InstantiateParams::new(cli.model_identifier.as_str(), ""),
    )?;
    let status = instance.setup(0.0, cli.stop_time)?;
    if !status.is_success() {
        return Err(format!("setup returned {status}").into());
    }

    let names = NameCache::new(Arc::new(table));
    let access = VariableAccessor::new(&instance, &names);

    let mut time = 0.0;
    while time < cli.stop_time {
        let status = instance.step(time, cli.step_size)?;
        if status.is_failure() {
            eprintln!("Step at t={time} returned {status}; stopping");
            break;
        }
        time += cli.step_size;

        let mut line = format!("t={time:.6}");
        for name in &watched {
            let variable = access.variable(name)?;
            let rendered = match variable.kind().map(ScalarKind::exchange_kind) {
                Some(ScalarKind::Integer) => variable.read_integer()?.to_string(),
                Some(ScalarKind::String) => variable.read_string()?.to_string(),
                Some(ScalarKind::Boolean) => variable.read_boolean()?.to_string(),
                _ => variable.read_real()?.to_string(),
            };
            line.push_str(&format!(" {name}: {rendered}"));
        }
        println!("{line}");
    }

    let status = instance.terminate(true)?;
    eprintln!("Terminated with {status}");
    Ok(())
}
