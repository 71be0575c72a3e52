use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use env_logger::Builder;
use log::{debug, info};

use treelox as lox;

use lox::error::LoxError;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;
use lox::token::Token;
use lox::value::Value;

#[derive(ClapParser, Debug)]
#[command(version, about = "Tree-walking interpreter for the Lox dialect", long_about = None)]
pub struct Cli {
    /// Script to run; starts an interactive prompt when omitted
    script: Option<PathBuf>,

    /// Enable logging to app.log
    #[arg(long)]
    log: bool,
}

/// Why a submission failed: one or more static errors (exit 65), or the
/// single runtime error that aborted it (exit 70).
enum RunFailure {
    Static(Vec<LoxError>),
    Runtime(LoxError),
}

/// One interpreter session.  The interpreter (globals, resolved bindings)
/// persists across REPL submissions; the expression-id counter threads
/// forward so no two submissions alias ids in the binding table.
struct Lox {
    interpreter: Interpreter,
    next_expr_id: usize,
}

impl Lox {
    fn new() -> Self {
        Lox {
            interpreter: Interpreter::new(),
            next_expr_id: 0,
        }
    }

    /// Run one submission through the scan → parse → resolve → interpret
    /// pipeline.  A submission with any static error is never handed to the
    /// resolver or interpreter.
    fn run(&mut self, source: &[u8], out: &mut dyn Write) -> std::result::Result<Value, RunFailure> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut static_errors: Vec<LoxError> = Vec::new();

        for item in Scanner::new(source) {
            match item {
                Ok(token) => tokens.push(token),
                Err(e) => static_errors.push(e),
            }
        }

        let mut parser = Parser::with_base_id(&tokens, self.next_expr_id);
        let parse_result = parser.parse();
        self.next_expr_id = parser.next_id();

        let statements = match parse_result {
            Ok(statements) => statements,

            Err(errors) => {
                static_errors.extend(errors);
                Vec::new()
            }
        };

        if !static_errors.is_empty() {
            return Err(RunFailure::Static(static_errors));
        }

        let mut resolver = Resolver::new(&mut self.interpreter);

        if let Err(errors) = resolver.resolve(&statements) {
            return Err(RunFailure::Static(errors));
        }

        self.interpreter
            .interpret(&statements, out)
            .map_err(RunFailure::Runtime)
    }
}

/// Reads the contents of a file into a Vec<u8>
fn read_file(filename: &PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with module path and source line
    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("treelox::")
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
        .init();

    info!("Logger initialized, writing to app.log");

    Ok(())
}

fn report(error: &LoxError) {
    eprintln!("\x1b[31m{}\x1b[0m", error);
}

fn run_file(path: &PathBuf) -> Result<()> {
    let buf = read_file(path)?;

    let mut session = Lox::new();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match session.run(&buf, &mut out) {
        Ok(_) => Ok(()),

        Err(RunFailure::Static(errors)) => {
            drop(out);

            for e in &errors {
                debug!("Static error: {}", e);
                report(e);
            }

            std::process::exit(65);
        }

        Err(RunFailure::Runtime(e)) => {
            drop(out);

            debug!("Runtime error: {}", e);
            report(&e);

            std::process::exit(70);
        }
    }
}

fn run_prompt() -> Result<()> {
    info!("Starting interactive prompt");

    let stdin = io::stdin();
    let mut session = Lox::new();

    loop {
        print!("\u{1F96F} > ");
        io::stdout().flush()?;

        let mut line = String::new();

        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }

        let stdout = io::stdout();
        let mut out = stdout.lock();

        // Each submission is isolated: error state does not leak into the
        // next line, but definitions in the interpreter do persist.
        match session.run(line.as_bytes(), &mut out) {
            Ok(value) => {
                writeln!(out, "  => {}", value)?;
            }

            Err(RunFailure::Static(errors)) => {
                drop(out);

                for e in &errors {
                    report(e);
                }
            }

            Err(RunFailure::Runtime(e)) => {
                drop(out);

                report(&e);
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,

        Err(e) => {
            // --help / --version print and leave normally; anything else is
            // an invalid invocation.
            if e.use_stderr() {
                eprint!("{}", e);
                std::process::exit(64);
            }

            print!("{}", e);
            std::process::exit(0);
        }
    };

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match &args.script {
        Some(path) => run_file(path),
        None => run_prompt(),
    }
}
