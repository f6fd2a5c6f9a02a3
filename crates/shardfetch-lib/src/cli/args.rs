use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;

#[derive(Debug, Clone)]
pub enum Command {
    Download {
        config_path: String,
        paths: Vec<String>,
        output_dir: String,
        offset: u64,
        length: Option<u64>,
        print_status: bool,
    },
    Validate {
        config_path: String,
    },
}

pub struct Args {
    pub command: Command,
    pub log_level: Level,
}

#[derive(Debug, Parser)]
#[command(
    name = "shardfetch",
    version,
    author = "Nick Guletskii",
    about = "Download files and byte ranges whose chunks are spread across contracted storage hosts"
)]
struct Cli {
    #[arg(
        short = 'v',
        long = "verbose",
        help = "Sets the level of verbosity",
        action = ArgAction::Count,
        global = true
    )]
    verbose: u8,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Queue downloads for one or more catalog paths and wait for them to finish
    Download {
        #[arg(
            short = 'c',
            long = "config",
            value_name = "FILE",
            help = "Sets a custom config file",
            default_value = "shardfetch.yaml"
        )]
        config: String,

        #[arg(
            short = 'p',
            long = "path",
            value_name = "PATH",
            help = "Catalog path to download (repeat or use comma-separated values)",
            action = ArgAction::Append,
            value_delimiter = ',',
            required = true
        )]
        paths: Vec<String>,

        #[arg(
            short = 'o',
            long = "output-dir",
            value_name = "DIR",
            help = "Directory downloaded files are written to",
            default_value = "."
        )]
        output_dir: String,

        #[arg(
            long = "offset",
            value_name = "BYTES",
            help = "First byte of the section to download",
            default_value_t = 0
        )]
        offset: u64,

        #[arg(
            long = "length",
            value_name = "BYTES",
            help = "Number of bytes to download (default: rest of the file)"
        )]
        length: Option<u64>,

        #[arg(
            long = "status",
            help = "Print the download queue as JSON once all downloads have finished"
        )]
        status: bool,
    },

    /// Load the config file and check hosts, contracts and chunk layouts
    Validate {
        #[arg(
            short = 'c',
            long = "config",
            value_name = "FILE",
            help = "Sets a custom config file",
            default_value = "shardfetch.yaml"
        )]
        config: String,
    },
}

pub fn parse_args() -> Args {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let mut env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();
    if let Ok(directive) = "opendal=warn".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_env_filter(env_filter)
        .init();

    let command = match cli.command {
        CliCommand::Download {
            config,
            paths,
            output_dir,
            offset,
            length,
            status,
        } => Command::Download {
            config_path: config,
            paths,
            output_dir,
            offset,
            length,
            print_status: status,
        },
        CliCommand::Validate { config } => Command::Validate {
            config_path: config,
        },
    };

    Args { command, log_level }
}
