use anyhow::{Context, Result, bail};
use clap::{Parser as ClapParser, Subcommand};
use log::{LevelFilter, debug, info};
use markdown_loom_config::Config;
use markdown_loom_engine::parsing::snapshot;
use markdown_loom_engine::{Document, HtmlRenderer, LoomOptions, MarkdownFormatter, Parser};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(ClapParser)]
#[command(name = "markdown-loom")]
#[command(author, version, about = "Render, format and inspect CommonMark documents", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.config/markdown-loom/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging; repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a document to HTML
    Html {
        /// Input file (use - for stdin)
        input: PathBuf,

        /// Output file (defaults to stdout, or output_dir from the config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Escape raw HTML instead of passing it through
        #[arg(long)]
        escape_html: bool,
    },

    /// Rewrite a document as normalized Markdown
    Format {
        /// Input file (use - for stdin)
        input: PathBuf,

        /// Replace the input file instead of printing
        #[arg(short, long)]
        write: bool,
    },

    /// Print the parsed node tree
    Ast {
        /// Input file (use - for stdin)
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let mut options = config.options();

    match cli.command {
        Commands::Html {
            input,
            output,
            escape_html,
        } => {
            options.html.escape_html |= escape_html;
            let doc = read_document(&input, &options)?;
            let html = HtmlRenderer::builder()
                .options(options.html.clone())
                .build()?
                .render(&doc);
            let target = output.or_else(|| html_target(&input, config.output_dir.as_deref()));
            write_output(target.as_deref(), &html)
        }
        Commands::Format { input, write } => {
            if write && is_stdin(&input) {
                bail!("--write needs a file, not stdin");
            }
            let doc = read_document(&input, &options)?;
            let formatted = MarkdownFormatter::new(options.format.clone())
                .format(&doc)
                .to_string();
            let target = write.then_some(input.as_path());
            write_output(target, &formatted)
        }
        Commands::Ast { input } => {
            let doc = read_document(&input, &options)?;
            write_output(None, &snapshot::normalize(&doc).outline())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let loaded = match path {
        Some(path) => {
            let config = Config::load_from_path(path)?;
            if config.is_none() {
                bail!("config file {} does not exist", path.display());
            }
            config
        }
        None => Config::load()?,
    };
    if loaded.is_none() {
        debug!("no config file; using defaults");
    }
    Ok(loaded.unwrap_or_default())
}

fn is_stdin(input: &Path) -> bool {
    input.as_os_str() == "-"
}

fn read_document(input: &Path, options: &LoomOptions) -> Result<Document> {
    let parser = Parser::builder().options(options.parse.clone()).build()?;
    let doc = if is_stdin(input) {
        parser.parse_reader(io::stdin().lock())?
    } else {
        let file =
            fs::File::open(input).with_context(|| format!("cannot open {}", input.display()))?;
        parser
            .parse_reader(file)
            .with_context(|| format!("cannot parse {}", input.display()))?
    };
    info!("parsed {}", input.display());
    Ok(doc)
}

/// `<output_dir>/<stem>.html` for file inputs when an output directory is
/// configured.
fn html_target(input: &Path, output_dir: Option<&Path>) -> Option<PathBuf> {
    let dir = output_dir?;
    if is_stdin(input) {
        return None;
    }
    let stem = input.file_stem()?;
    Some(dir.join(format!("{}.html", stem.to_string_lossy())))
}

fn write_output(target: Option<&Path>, content: &str) -> Result<()> {
    match target {
        Some(path) if !is_stdin(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, content).with_context(|| format!("cannot write {}", path.display()))?;
            info!("wrote {}", path.display());
        }
        _ => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
