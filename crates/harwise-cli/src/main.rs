use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use harwise_cli::{GlobalOptions, OutputFormat, commands};
use harwise_core::compare::Thresholds;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "harwise")]
#[command(author, version)]
#[command(
    about = "Turn HAR captures into regression reports, API collections and runnable tests",
    long_about = "harwise normalizes the API traffic recorded in HAR files. It compares two \
                  captures for latency, size and status regressions, exports Insomnia \
                  collections and curl suites, and generates API tests that it can run \
                  against a live service."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Only keep requests whose URL matches this regex
    #[arg(long, global = true, value_name = "REGEX")]
    include: Option<String>,

    /// Drop requests whose URL matches this regex
    #[arg(long, global = true, value_name = "REGEX")]
    exclude: Option<String>,

    /// Key requests on their exact URL instead of replacing ids with placeholders
    #[arg(long, global = true)]
    no_template: bool,

    /// Comma-separated request headers to mask (default: authorization,cookie)
    #[arg(long, global = true, value_delimiter = ',', value_name = "HEADERS")]
    mask_headers: Option<Vec<String>>,

    /// Base URL that generated requests are sent to
    #[arg(long, global = true, env = "HARWISE_BASE_URL", value_name = "URL")]
    base_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the API requests of a HAR file
    Stats {
        /// Path to the HAR file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Compare two HAR files for regressions
    #[command(long_about = "Compare two HAR files for regressions.\n\n\
        EXIT CODES:\n  \
        0  no regression\n  \
        2  at least one endpoint regressed\n  \
        3  the comparison could not be performed")]
    Compare {
        /// Baseline HAR file
        #[arg(value_name = "BASELINE")]
        baseline: PathBuf,

        /// New HAR file
        #[arg(value_name = "NEW")]
        new: PathBuf,

        /// Latency increase (percent) that counts as a regression
        #[arg(long, default_value_t = 10.0, value_name = "PCT")]
        time_regress: f64,

        /// Response size increase (percent) that counts as a regression
        #[arg(long, default_value_t = 15.0, value_name = "PCT")]
        size_regress: f64,

        /// Write the report to a file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Generate artifacts from a HAR file
    Gen {
        #[command(subcommand)]
        target: GenCommands,
    },

    /// Run a generated test suite
    Test {
        /// Directory containing the generated tests
        #[arg(long, default_value = "tests", value_name = "DIR")]
        tests: PathBuf,

        /// Environment file loaded before running
        #[arg(long, value_name = "FILE")]
        env: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    #[command(long_about = "Generate shell completion scripts for harwise.\n\n\
        SUPPORTED SHELLS:\n  \
        bash, zsh, fish, powershell, elvish\n\n\
        INSTALLATION:\n  \
        bash:  harwise completion --shell bash >> ~/.bashrc\n  \
        zsh:   harwise completion --shell zsh > ~/.zfunc/_harwise\n  \
        fish:  harwise completion --shell fish > ~/.config/fish/completions/harwise.fish")]
    Completion {
        /// Target shell
        #[arg(long, value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum GenCommands {
    /// Generate test descriptors and a manifest
    Tests {
        /// Path to the HAR file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output directory
        #[arg(long, default_value = "tests", value_name = "DIR")]
        out: PathBuf,

        /// JSON test configuration file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Also write a standalone JavaScript program per test
        #[arg(long)]
        scripts: bool,
    },

    /// Generate an Insomnia collection
    Insomnia {
        /// Path to the HAR file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Generate a bash script of curl commands
    Curl {
        /// Path to the HAR file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output file
        #[arg(long, default_value = "suite.sh", value_name = "FILE")]
        out: PathBuf,

        /// Add `set -euo pipefail` to the script
        #[arg(long)]
        strict: bool,
    },
}

impl Cli {
    fn global_options(&self) -> GlobalOptions {
        GlobalOptions {
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            no_template: self.no_template,
            mask_headers: self.mask_headers.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    let options = cli.global_options();
    let format = cli.format;

    match cli.command {
        Commands::Stats { file } => finish(commands::stats::execute(&file, &options, format)),
        Commands::Compare {
            baseline,
            new,
            time_regress,
            size_regress,
            out,
        } => {
            let thresholds = Thresholds {
                time_pct: time_regress,
                size_pct: size_regress,
            };
            match commands::compare::execute(&baseline, &new, thresholds, out, &options, format) {
                Ok(false) => ExitCode::SUCCESS,
                Ok(true) => ExitCode::from(2),
                Err(e) => {
                    report_error(&e);
                    ExitCode::from(3)
                }
            }
        }
        Commands::Gen { target } => finish(match target {
            GenCommands::Tests {
                file,
                out,
                config,
                scripts,
            } => commands::generate::execute_tests(
                &file,
                &out,
                config.as_deref(),
                scripts,
                &options,
            ),
            GenCommands::Insomnia { file, out } => {
                commands::generate::execute_insomnia(&file, out.as_deref(), &options)
            }
            GenCommands::Curl { file, out, strict } => {
                commands::generate::execute_curl(&file, &out, strict, &options)
            }
        }),
        Commands::Test { tests, env } => {
            match commands::test::execute(&tests, env.as_deref(), format) {
                Ok(true) => ExitCode::SUCCESS,
                Ok(false) => ExitCode::FAILURE,
                Err(e) => {
                    report_error(&e);
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Completion { shell } => {
            finish(commands::completion::execute(shell, &mut Cli::command()))
        }
    }
}

fn finish(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn report_error(error: &anyhow::Error) {
    eprintln!("{} {:#}", console::style("error:").red().bold(), error);
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("harwise=debug,harwise_cli=debug,harwise_core=debug,harwise_runner=debug")
    } else {
        EnvFilter::new("harwise=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
