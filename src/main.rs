use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use tracing::info;

use pagelens::snapshot::{Mode, SnapshotFormat, SnapshotOptions};
use pagelens::{GrepOptions, RefMap, Viewport};

#[derive(Parser)]
#[command(name = "pagelens")]
#[command(about = "Compact accessibility snapshots of HTML pages for AI agents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a snapshot of an HTML file or stdin
    Snapshot {
        /// HTML file path, or '-' for stdin
        input: String,

        /// Snapshot mode: interactive, outline, content, head, structure, all
        #[arg(short, long, default_value = "interactive")]
        mode: String,

        /// Output format: text, json, markdown, html
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Filter the snapshot with a grep-style pattern
        #[arg(short, long)]
        grep: Option<String>,

        /// Keep non-matching lines instead of matching ones
        #[arg(long)]
        invert: bool,

        /// Treat the pattern as a literal string, not a regex
        #[arg(long)]
        fixed_strings: bool,

        /// Match case-sensitively (default is case-insensitive)
        #[arg(long)]
        case_sensitive: bool,

        /// Maximum DOM depth to walk
        #[arg(long, default_value_t = 32)]
        max_depth: usize,

        /// Include elements hidden by style or aria attributes
        #[arg(long)]
        include_hidden: bool,

        /// Relaxed interactivity: also capture onclick/tabindex/contenteditable elements
        #[arg(long)]
        relaxed: bool,

        /// Viewport size as WxH, e.g. 1280x720
        #[arg(long)]
        viewport: Option<String>,

        /// CSS selector to scope the walk to
        #[arg(long)]
        root: Option<String>,

        /// Page URL recorded in the snapshot header
        #[arg(long)]
        url: Option<String>,

        /// Include images in markdown output
        #[arg(long)]
        images: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Snapshot {
            input,
            mode,
            format,
            grep,
            invert,
            fixed_strings,
            case_sensitive,
            max_depth,
            include_hidden,
            relaxed,
            viewport,
            root,
            url,
            images,
        } => {
            info!(input = %input, mode = %mode, format = %format, "snapshot command");
            let html = read_input(&input)?;

            let grep = grep.map(|pattern| {
                let mut opts = GrepOptions::new(pattern);
                opts.invert = invert;
                opts.fixed_strings = fixed_strings;
                opts.ignore_case = !case_sensitive;
                opts
            });

            let opts = SnapshotOptions {
                mode: parse_mode(&mode)?,
                format: parse_format(&format)?,
                grep,
                max_depth,
                include_hidden,
                engine: if relaxed {
                    pagelens::dom::Interactivity::Relaxed
                } else {
                    pagelens::dom::Interactivity::Strict
                },
                root_selector: root,
                viewport: viewport.as_deref().map(parse_viewport).transpose()?.unwrap_or_default(),
                include_images: images,
                url: url.unwrap_or_else(|| page_url(&input)),
            };

            let doc = scraper::Html::parse_document(&html);
            let mut refs = RefMap::new();
            let result = pagelens::snapshot(&doc, &mut refs, &opts);

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.tree);
            }
            Ok(())
        }
    }
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading {input}"))
    }
}

fn page_url(input: &str) -> String {
    if input == "-" {
        "about:blank".to_string()
    } else {
        format!("file://{input}")
    }
}

fn parse_mode(mode: &str) -> Result<Mode> {
    Ok(match mode {
        "interactive" => Mode::Interactive,
        "outline" => Mode::Outline,
        "content" => Mode::Content,
        "head" => Mode::Head,
        "structure" => Mode::Structure,
        "all" => Mode::All,
        other => bail!("unknown mode: {other}"),
    })
}

fn parse_format(format: &str) -> Result<SnapshotFormat> {
    Ok(match format {
        // json serializes the whole result; the tree inside stays text.
        "text" | "json" => SnapshotFormat::Text,
        "markdown" => SnapshotFormat::Markdown,
        "html" => SnapshotFormat::Html,
        other => bail!("unknown format: {other}"),
    })
}

fn parse_viewport(spec: &str) -> Result<Viewport> {
    let (w, h) = spec
        .split_once('x')
        .with_context(|| format!("viewport must be WxH, got {spec}"))?;
    Ok(Viewport {
        width: w.parse().with_context(|| format!("bad viewport width: {w}"))?,
        height: h.parse().with_context(|| format!("bad viewport height: {h}"))?,
    })
}
