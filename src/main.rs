use clap::Parser as ClapParser;
use express_lang::{
    cli::{self, CheckOptions, CheckResult, CliError},
    parse, to_json, to_json_pretty,
};
use std::io;
use tracing::{Level, debug};

#[derive(ClapParser)]
#[command(name = "express")]
#[command(about = "Express - evaluate filter expressions against JSON documents")]
#[command(version)]
struct Cli {
    /// The expression to evaluate
    expression: String,

    /// JSON document (reads JSON lines from stdin if not provided)
    data: Option<String>,

    /// Pretty-print the output
    #[arg(short, long)]
    pretty: bool,

    /// Only validate syntax, don't evaluate
    #[arg(long)]
    syntax_only: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if cli.data.is_none() && !cli.syntax_only && !atty::is(atty::Stream::Stdin) {
        let expression = parse(cli.expression.as_bytes())?;
        let stdin = io::stdin();
        let mut stdout = io::stdout().lock();
        let count = cli::execute_lines(&expression, stdin.lock(), &mut stdout, cli.pretty)?;
        debug!(count, "evaluated input lines");
        return Ok(());
    }

    let options = CheckOptions {
        expression: cli.expression,
        data: cli.data,
        syntax_only: cli.syntax_only,
    };

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid => println!("Syntax is valid"),
        CheckResult::Success(value) => {
            let json = if cli.pretty {
                to_json_pretty(&value)
            } else {
                to_json(&value)
            };
            println!("{}", json);
        }
    }
    Ok(())
}
