use clap::{Parser, Subcommand};
use std::path::PathBuf;
use testdigest_lib::{commands, VERSION};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "testdigest")]
#[command(about = "Compact test-runner output into a token-bounded failure summary")]
#[command(version = VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .testdigest/ with a local config in the current directory
    Init {
        /// Default model to record
        #[arg(long, short)]
        model: Option<String>,
        /// Default token ceiling to record
        #[arg(long)]
        max_tokens: Option<usize>,
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Parse a JSON report or console log and summarize failures
    Parse {
        /// Report or log file
        file: PathBuf,
        /// Report format (jest, pytest, generic, console); sniffed when omitted
        #[arg(long, short)]
        framework: Option<String>,
        /// Model whose context limit bounds the summary
        #[arg(long, short)]
        model: Option<String>,
        /// Explicit token ceiling, applied on top of the model limit
        #[arg(long, env = "TESTDIGEST_MAX_TOKENS")]
        max_tokens: Option<usize>,
        /// Print the full digest as JSON
        #[arg(long)]
        json: bool,
    },

    /// Detect the test framework of a project directory
    Detect {
        /// Project directory (defaults to the current directory)
        dir: Option<PathBuf>,
        /// Print the detection as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count tokens in a file against a model limit
    Tokens {
        /// File to measure
        file: PathBuf,
        /// Model id
        #[arg(long, short)]
        model: Option<String>,
    },

    /// List known models and their token limits
    Models,

    /// Head/tail-compress a stack trace file
    Compress {
        /// Stack trace file
        file: PathBuf,
        /// Leading lines to keep
        #[arg(long)]
        first: Option<usize>,
        /// Trailing lines to keep
        #[arg(long)]
        last: Option<usize>,
    },

    /// Display version information
    Version,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init {
            model,
            max_tokens,
            force,
        } => commands::init::run(model, max_tokens, force),
        Commands::Parse {
            file,
            framework,
            model,
            max_tokens,
            json,
        } => commands::parse::run(file, framework, model, max_tokens, json),
        Commands::Detect { dir, json } => commands::detect::run(dir, json),
        Commands::Tokens { file, model } => commands::budget::tokens(file, model),
        Commands::Models => commands::budget::models(),
        Commands::Compress { file, first, last } => commands::compress::run(file, first, last),
        Commands::Version => {
            println!("testdigest v{}", VERSION);
            println!("Test output compaction for LLM context windows");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
