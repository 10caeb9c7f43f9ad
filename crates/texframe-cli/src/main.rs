use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use smol_str::SmolStr;
use texframe_renderer::escape::escape_html;
use texframe_renderer::restore::restore_math;
use texframe_renderer::scan::extract_math;
use texframe_renderer::{MathKind, RenderOptions, render_document};
use texframe_sandbox::{HeadlessSurface, SandboxHost};

mod config;

use config::CliConfig;

/// Extra time `measure` allows for typesetting on top of the sandbox's own delays.
const SETTLE_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(version, about = "texframe - typeset mixed prose and LaTeX into a sized document", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a config.kdl file (defaults to the user config directory)
    #[arg(long, global = true, env = "TEXFRAME_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the assembled document
    Render {
        /// Input file, or `-` for stdin
        input: PathBuf,

        #[command(flatten)]
        display: DisplayArgs,

        /// Fill the generation slot with this id
        #[arg(long)]
        generation: Option<u64>,

        /// Write the document here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List the math spans found in the input, in extraction order
    Scan {
        /// Input file, or `-` for stdin
        input: PathBuf,
    },
    /// Render, load into the headless sandbox and print the settled container height
    Measure {
        /// Input file, or `-` for stdin
        input: PathBuf,

        #[command(flatten)]
        display: DisplayArgs,

        /// Lower bound for the container height
        #[arg(long)]
        min_height: Option<u32>,

        /// Width of the headless viewport in CSS pixels
        #[arg(long)]
        viewport_width: Option<f32>,
    },
}

#[derive(Args, Debug, Default)]
struct DisplayArgs {
    /// Base font size in pixels
    #[arg(long)]
    font_size: Option<f32>,

    /// Body text color
    #[arg(long)]
    text_color: Option<String>,

    /// Accent color
    #[arg(long)]
    accent_color: Option<String>,

    /// Use the dark palette
    #[arg(long)]
    dark: bool,
}

impl DisplayArgs {
    fn apply(self, mut options: RenderOptions) -> RenderOptions {
        if let Some(size) = self.font_size {
            options.font_size = size;
        }
        if let Some(color) = self.text_color {
            options.text_color = Some(SmolStr::new(color));
        }
        if let Some(color) = self.accent_color {
            options.accent_color = Some(SmolStr::new(color));
        }
        options.dark_mode |= self.dark;
        options
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette();
    init_tracing();

    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Render {
            input,
            display,
            generation,
            output,
        } => {
            let content = read_input(&input)?;
            let options = display.apply(config.render);
            let document = render_document(&content, &options);
            let html = match generation {
                Some(generation) => document.for_generation(generation),
                None => document.html().to_owned(),
            };
            match output {
                Some(path) => std::fs::write(&path, html).into_diagnostic()?,
                None => print!("{html}"),
            }
        }
        Commands::Scan { input } => {
            let content = read_input(&input)?;
            scan(&content)?;
        }
        Commands::Measure {
            input,
            display,
            min_height,
            viewport_width,
        } => {
            let content = read_input(&input)?;
            let options = display.apply(config.render);
            let mut bridge = config.bridge;
            if let Some(min_height) = min_height {
                bridge.min_height = min_height;
            }
            if let Some(width) = viewport_width {
                bridge.viewport_width = width;
            }

            let limit = bridge.load_delay() + bridge.settle_delays()[1] + SETTLE_GRACE;
            let handle = SandboxHost::spawn(HeadlessSurface::new(&bridge), bridge);
            let generation = handle.render(render_document(&content, &options))?;
            let height = tokio::time::timeout(limit, handle.settled(generation, 2))
                .await
                .map_err(|_| miette::miette!("sandbox did not settle within {limit:?}"))??;
            println!("{height}");
            handle.shutdown().await;
        }
    }

    Ok(())
}

fn scan(content: &str) -> Result<()> {
    let (partial, table) = extract_math(content);
    for span in table.iter() {
        let kind = match span.kind {
            MathKind::Display => "display",
            MathKind::Inline => "inline",
        };
        println!("#{:<3} {:<7} {}", span.index, kind, span.body.escape_debug());
    }

    // Round-trip through restoration so a scanner bug shows up here too.
    let count = table.len();
    let restored = restore_math(&escape_html(&partial), table)?;
    tracing::info!(spans = count, restored = restored.math.len(), "scan complete");
    Ok(())
}

fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .into_diagnostic()?;
        Ok(content)
    } else {
        std::fs::read_to_string(input)
            .map_err(|e| miette::miette!("could not read {}: {e}", input.display()))
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
