//! deck2pdf: turn PowerPoint presentations into PDF summaries.

mod convert;
mod server;

use clap::{Args, Parser, Subcommand};
use convert::{convert_file, ConversionOptions};
use deck2pdf_core::PresentationFormat;
use server::ServerConfig;
use std::path::PathBuf;
use std::process::ExitCode;

/// Convert PowerPoint presentations into PDF summaries.
#[derive(Parser, Debug)]
#[command(name = "deck2pdf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a presentation into a PDF summary
    Convert {
        /// Input PowerPoint file (.pptx)
        input: PathBuf,

        /// Output PDF file
        output: PathBuf,

        /// Title for the summary (default: "Summary of <file name>")
        #[arg(short, long)]
        title: Option<String>,

        /// Leave slide pictures out of the summary
        #[arg(long)]
        no_images: bool,
    },

    /// Run the web upload form (default when no command is given)
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Do not open a browser tab on startup
    #[arg(long)]
    no_browser: bool,
}

impl Default for ServeArgs {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            port: defaults.port,
            host: defaults.host,
            no_browser: !defaults.open_browser,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match cli.command.unwrap_or_else(|| Command::Serve(ServeArgs::default())) {
        Command::Convert {
            input,
            output,
            title,
            no_images,
        } => run_convert(input, output, title, no_images),
        Command::Serve(args) => run_serve(args),
    }
}

fn run_convert(input: PathBuf, output: PathBuf, title: Option<String>, no_images: bool) -> ExitCode {
    if !input.exists() {
        eprintln!("Error: Input file '{}' not found.", input.display());
        return ExitCode::FAILURE;
    }

    if PresentationFormat::from_path(&input).is_none() {
        log::warn!("Input file should be a PowerPoint presentation (.pptx or .ppt)");
    }

    let options = ConversionOptions {
        title,
        include_images: !no_images,
    };

    log::info!("Converting {} to {}", input.display(), output.display());
    match convert_file(&input, &output, &options) {
        Ok(report) => {
            log::info!(
                "{} slides, {} images, {} bytes",
                report.slide_count,
                report.image_count,
                report.bytes
            );
            println!("PDF created: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Conversion failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_serve(args: ServeArgs) -> ExitCode {
    let config = ServerConfig {
        host: args.host,
        port: args.port,
        open_browser: !args.no_browser,
        ..ServerConfig::default()
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server::serve(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
