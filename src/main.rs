use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::error::{LoxError, Reporter, Tally};
use rox::parser::Parser;
use rox::scanner;
use rox::{Lox, Status};

const EXIT_STATIC_ERROR: i32 = 65;
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

        /// Emit the token list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parses a file as a Lox program and prints its AST
    Parse { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Starts an interactive prompt
    Repl,
}

/// Prints diagnostics to stderr as they arrive.
struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn error(&mut self, error: LoxError) {
        debug!("Reporting error on line {}", error.line());
        eprintln!("{}", error);
    }

    fn warning(&mut self, message: String) {
        eprintln!("Warning: {}", message);
    }
}

/// Reads the contents of a file into a String
fn read_file(filename: &PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = String::new();

    let bytes = reader
        .read_to_string(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'rox::' from module path
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);
            writeln!(
                buf,
                "{} [{}:{}] - {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
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

fn tokenize(filename: &PathBuf, json: bool) -> Result<()> {
    info!("Running Tokenize subcommand");
    let source = read_file(filename)?;

    let mut reporter = ConsoleReporter;
    let mut tally = Tally::new(&mut reporter);
    let tokens = scanner::scan(&source, &mut tally);

    if json {
        let rendered = serde_json::to_string_pretty(&tokens).context("Failed to encode tokens")?;
        println!("{}", rendered);
    } else {
        for token in &tokens {
            println!("{}", token);
        }
    }

    if tally.errors() > 0 {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC_ERROR);
        process::exit(EXIT_STATIC_ERROR);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(filename: &PathBuf) -> Result<()> {
    info!("Running Parse subcommand");
    let source = read_file(filename)?;

    let mut reporter = ConsoleReporter;
    let mut tally = Tally::new(&mut reporter);
    let tokens = scanner::scan(&source, &mut tally);
    let statements = Parser::new(tokens, &mut tally).parse();

    if tally.errors() > 0 {
        process::exit(EXIT_STATIC_ERROR);
    }

    let statements: Vec<_> = statements.into_iter().flatten().collect();
    let ast = AstPrinter.print_program(&statements);
    debug!("AST: {}", ast);
    println!("{}", ast);

    info!("Parse subcommand completed");
    Ok(())
}

fn run(filename: &PathBuf) -> Result<()> {
    info!("Running Run subcommand");
    let source = read_file(filename)?;

    let mut lox = Lox::new();
    match lox.run(&source, &mut ConsoleReporter) {
        Status::Ok => {
            info!("Program executed successfully");
            Ok(())
        }
        Status::StaticError => process::exit(EXIT_STATIC_ERROR),
        Status::RuntimeError => process::exit(EXIT_RUNTIME_ERROR),
    }
}

fn repl() -> Result<()> {
    info!("Starting REPL");
    let mut lox = Lox::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read from stdin")?;

        // Errors are already on stderr; the session carries on.
        let status = lox.run_line(&line, &mut ConsoleReporter);
        debug!("REPL line finished with {:?}", status);
    }

    println!();
    Ok(())
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

    match &args.commands {
        Commands::Tokenize { filename, json } => tokenize(filename, *json),
        Commands::Parse { filename } => parse(filename),
        Commands::Run { filename } => run(filename),
        Commands::Repl => repl(),
    }
}
