use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use lox_treewalk as lox;

use lox::ast_printer::AstPrinter;
use lox::error::{Diagnostics, LoxError};
use lox::lox::{Lox, Outcome};
use lox::scanner::Scanner;

/// Exit status for scan/parse/resolve errors.
const EXIT_STATIC_ERROR: i32 = 65;

/// Exit status for runtime errors.
const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print tokens as JSON instead of one per line
        #[arg(long)]
        json: bool,
    },

    /// Parses a file as a program and prints the AST of each statement
    Parse { filename: PathBuf },

    /// Evaluates a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs a file as a Lox program
    Run { filename: PathBuf },

    /// Starts an interactive prompt; each line is run as its own unit
    Repl,
}

/// Reads a whole file through a read-only memory map.
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;

    let len: u64 = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", filename))?
        .len();

    // Mapping an empty file fails on some platforms.
    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the map is read-only and dropped before this function returns;
    // its bytes are copied into an owned String first.
    let map = unsafe { Mmap::map(&file) }.with_context(|| format!("Failed to map file {:?}", filename))?;

    let source = String::from_utf8(map.to_vec()).map_err(LoxError::from)?;

    info!("Read {} bytes from {:?}", source.len(), filename);

    Ok(source)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip the crate prefix from module paths
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("lox_treewalk::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn report_all<'e>(errors: impl IntoIterator<Item = &'e LoxError>) {
    for e in errors {
        eprintln!("{}", e);
    }
}

fn tokenize(filename: &Path, json: bool) -> Result<i32> {
    let source = read_file(filename)?;
    let mut diagnostics = Diagnostics::new();

    let tokens = Scanner::new(&source).scan_tokens(&mut diagnostics);

    if json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
    } else {
        for token in &tokens {
            println!("{}", token);
        }
    }

    report_all(diagnostics.iter());

    Ok(if diagnostics.has_errors() {
        EXIT_STATIC_ERROR
    } else {
        0
    })
}

fn parse(filename: &Path) -> Result<i32> {
    let source = read_file(filename)?;
    let mut diagnostics = Diagnostics::new();

    let statements = Lox::compile(&source, &mut diagnostics);

    if diagnostics.has_errors() {
        report_all(diagnostics.iter());
        return Ok(EXIT_STATIC_ERROR);
    }

    let printer = AstPrinter;
    for stmt in &statements {
        let text = printer.print_stmt(stmt);
        debug!("AST: {}", text);
        println!("{}", text);
    }

    Ok(0)
}

fn evaluate(filename: &Path) -> Result<i32> {
    let source = read_file(filename)?;
    let mut session = Lox::new();

    match session.evaluate(&source) {
        Ok(value) => {
            println!("{}", value);
            Ok(0)
        }
        Err(outcome) => Ok(report_outcome(outcome)),
    }
}

fn run(filename: &Path) -> Result<i32> {
    let source = read_file(filename)?;
    let mut session = Lox::new();

    Ok(report_outcome(session.run(&source)))
}

/// Prints the errors of `outcome` and maps it to an exit status.
fn report_outcome(outcome: Outcome) -> i32 {
    match outcome {
        Outcome::Completed => 0,

        Outcome::StaticErrors(errors) => {
            report_all(&errors);
            EXIT_STATIC_ERROR
        }

        Outcome::RuntimeError(e) => {
            eprintln!("{}", e);
            EXIT_RUNTIME_ERROR
        }
    }
}

fn repl() -> Result<i32> {
    let mut session = Lox::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };

        // Errors end the line, never the session.
        report_outcome(session.run(&line?));
    }

    Ok(0)
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let code: i32 = match &args.commands {
        Commands::Tokenize { filename, json } => tokenize(filename, *json)?,
        Commands::Parse { filename } => parse(filename)?,
        Commands::Evaluate { filename } => evaluate(filename)?,
        Commands::Run { filename } => run(filename)?,
        Commands::Repl => repl()?,
    };

    info!("Exiting with status {}", code);

    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}
