use std::{
    error::Error,
    ffi::OsString,
    fs::{self, File},
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{parser::ValueSource, ArgMatches, CommandFactory, FromArgMatches};
use indexmap::IndexSet;
use ippasm::{xml, Counter, ErrorKind, Parser};
use serde_derive::Deserialize;
use tracing::Level;

const EXIT_ARGS: u8 = 10;
const EXIT_INPUT: u8 = 11;
const EXIT_OUTPUT: u8 = 12;
const EXIT_SYNTAX: u8 = 21;

/// Checks an IPPcode18 program and prints its XML representation
#[derive(clap::Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// IPPcode18 source file (default: stdin)
    source: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Statistics file
    #[arg(long, value_name = "FILE")]
    stats: Option<PathBuf>,

    /// Write the number of instructions to the statistics file
    #[arg(long)]
    loc: bool,

    /// Write the number of commented lines to the statistics file
    #[arg(long)]
    comments: bool,

    /// One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    #[arg(short, long, default_value_t = Level::INFO)]
    log_level: Level,
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    #[serde(default)]
    stats: ConfigStats,

    #[serde(default)]
    output: ConfigOutput,
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigStats {
    #[serde(default)]
    file: Option<PathBuf>,

    #[serde(default)]
    counters: IndexSet<Counter>,
}

fn default_indent() -> usize {
    xml::DEFAULT_INDENT
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigOutput {
    #[serde(default = "default_indent")]
    indent: usize,
}

impl Default for ConfigOutput {
    fn default() -> Self {
        Self { indent: default_indent() }
    }
}

#[derive(Debug)]
struct Failure {
    code: u8,
    err: Box<dyn Error>,
}

impl Failure {
    fn new(code: u8, err: impl Into<Box<dyn Error>>) -> Self {
        Self {
            code,
            err: err.into(),
        }
    }
}

impl From<ippasm::Error> for Failure {
    fn from(err: ippasm::Error) -> Self {
        let code = match err.kind() {
            ErrorKind::Io | ErrorKind::NoInput => EXIT_INPUT,
            ErrorKind::MissingOrInvalidHeader
            | ErrorKind::UnknownOpcode
            | ErrorKind::ArityMismatch
            | ErrorKind::InvalidOperand => EXIT_SYNTAX,
        };
        Self::new(code, err)
    }
}

fn main() -> ExitCode {
    let (args, counters) = match parse_args(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(e) => {
            let _ = e.print();
            return if e.exit_code() == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_ARGS)
            };
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(io::stderr)
        .init();

    if let Err(Failure { code, err }) = main_real(args, counters) {
        tracing::error!("{err}");
        ExitCode::from(code)
    } else {
        ExitCode::SUCCESS
    }
}

/// `--help` is only honored on its own.
fn parse_args<I, T>(argv: I) -> Result<(Args, IndexSet<Counter>), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
    let matches = match Args::command().try_get_matches_from(&argv) {
        Err(e) if e.kind() == clap::error::ErrorKind::DisplayHelp && argv.len() > 2 => {
            return Err(Args::command().error(
                clap::error::ErrorKind::ArgumentConflict,
                "`--help` can't be combined with other arguments",
            ));
        }
        matches => matches?,
    };
    let counters = requested_counters(&matches);
    let args = Args::from_arg_matches(&matches)?;
    Ok((args, counters))
}

/// `--loc` and `--comments` in the order they appeared on the command line.
fn requested_counters(matches: &ArgMatches) -> IndexSet<Counter> {
    let mut flags: Vec<(usize, Counter)> = [("loc", Counter::Loc), ("comments", Counter::Comments)]
        .into_iter()
        .filter(|(id, _)| matches.value_source(id) == Some(ValueSource::CommandLine))
        .filter_map(|(id, counter)| Some((matches.index_of(id)?, counter)))
        .collect();
    flags.sort_by_key(|(index, _)| *index);
    flags.into_iter().map(|(_, counter)| counter).collect()
}

fn load_config(path: &Path) -> Result<Config, Box<dyn Error>> {
    let text = fs::read_to_string(path).map_err(|e| format!("cant open file: {e}"))?;
    let config = toml::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))?;
    Ok(config)
}

fn create(path: &Path) -> Result<BufWriter<File>, Failure> {
    File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map(BufWriter::new)
        .map_err(|e| Failure::new(EXIT_OUTPUT, format!("cant open file: {e}")))
}

fn main_real(args: Args, counters: IndexSet<Counter>) -> Result<(), Failure> {
    let config = match &args.config {
        Some(path) => load_config(path).map_err(|e| Failure::new(EXIT_ARGS, e))?,
        None => Config::default(),
    };
    let stats_file = args.stats.or(config.stats.file);
    let counters = if counters.is_empty() {
        config.stats.counters
    } else {
        counters
    };
    if !counters.is_empty() && stats_file.is_none() {
        return Err(Failure::new(
            EXIT_ARGS,
            "`--loc` and `--comments` need a statistics file (`--stats`)",
        ));
    }

    let (name, input): (String, Box<dyn BufRead>) = match &args.source {
        Some(path) => {
            let file = File::open(path)
                .map_err(|e| Failure::new(EXIT_INPUT, format!("cant open file: {e}")))?;
            (path.display().to_string(), Box::new(BufReader::new(file)))
        }
        None => ("<stdin>".to_owned(), Box::new(io::stdin().lock())),
    };

    tracing::trace!("parsing {name}");
    let (program, stats) = Parser::new(&name).parse(input)?;

    if let Some(path) = &stats_file {
        if !counters.is_empty() {
            tracing::trace!("writing statistics to {}", path.display());
            let mut file = create(path)?;
            stats
                .write_report(&mut file, &counters)
                .and_then(|_| file.flush())
                .map_err(|e| Failure::new(EXIT_OUTPUT, e))?;
        }
    }

    let mut output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(create(path)?),
        None => Box::new(io::stdout()),
    };
    tracing::trace!("writing {} instructions", program.instructions.len());
    xml::write_program(&mut output, &program, config.output.indent)
        .and_then(|_| output.flush())
        .map_err(|e| Failure::new(EXIT_OUTPUT, e))?;

    tracing::debug!(
        "{name}: {} instructions, {} comments",
        stats.instructions,
        stats.comments
    );
    Ok(())
}
