//! tmark - convert strict Markdown to HTML
//!
//! Usage:
//!   tmark render [FILE] [-o OUT]   Convert a file, or stdin when FILE is absent or `-`
//!   tmark worker                   Serve length-prefixed requests on stdin/stdout
//!   tmark ast [FILE] [--json]      Show the parsed tree
//!   tmark validate [FILE]          Parse only and report the first error
//!   tmark stats [FILE]             Count nodes per kind
//!
//! Logs go to stderr. Filter with `TINYMARK_LOG` or `RUST_LOG`, falling back
//! to `--log-level`.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tinymark_core::ast::{CodeBlock, Image, Link, List};
use tinymark_core::{markdown_to_html, parse, Arena, Node, Worker, WorkerConfig};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tmark")]
#[command(about = "Strict Markdown to HTML converter")]
#[command(version)]
struct Cli {
    /// Log level used when neither TINYMARK_LOG nor RUST_LOG is set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert Markdown to HTML
    Render {
        /// Input file; stdin when absent or `-`
        file: Option<PathBuf>,
        /// Output file; stdout when absent
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Serve `<len>\n<markdown>` requests on stdin, answering on stdout
    Worker {
        /// Largest accepted request payload in bytes
        #[arg(long)]
        max_input_bytes: Option<usize>,
        /// Longest accepted length line in bytes
        #[arg(long)]
        max_header_bytes: Option<usize>,
        /// Arena budget per request in bytes
        #[arg(long)]
        max_arena_bytes: Option<usize>,
    },
    /// Display the parsed document tree
    Ast {
        file: Option<PathBuf>,
        /// Output in JSON format
        #[arg(short, long)]
        json: bool,
    },
    /// Check a document for errors without producing output
    Validate { file: Option<PathBuf> },
    /// Show document statistics
    Stats { file: Option<PathBuf> },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Render { file, output } => cmd_render(file.as_deref(), output.as_deref()),
        Commands::Worker {
            max_input_bytes,
            max_header_bytes,
            max_arena_bytes,
        } => {
            let mut config = WorkerConfig::default();
            if let Some(n) = max_input_bytes {
                config = config.with_max_input_len(n);
            }
            if let Some(n) = max_header_bytes {
                config = config.with_max_header_len(n);
            }
            if let Some(n) = max_arena_bytes {
                config = config.with_max_arena_bytes(n);
            }
            cmd_worker(config)
        }
        Commands::Ast { file, json } => cmd_ast(file.as_deref(), json),
        Commands::Validate { file } => cmd_validate(file.as_deref()),
        Commands::Stats { file } => cmd_stats(file.as_deref()),
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env("TINYMARK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries HTML or frames only.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn read_input(file: Option<&Path>) -> Result<Vec<u8>> {
    match file {
        Some(path) if path != Path::new("-") => {
            fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))
        }
        _ => {
            let mut input = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut input)
                .context("failed to read stdin")?;
            Ok(input)
        }
    }
}

// =============================================================================
// Render Command
// =============================================================================

fn cmd_render(file: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let input = read_input(file)?;
    // Nothing is written unless the whole document converts.
    let html = markdown_to_html(&input).context("conversion failed")?;
    debug!(input_len = input.len(), output_len = html.len(), "converted");

    match output {
        Some(path) => fs::write(path, &html)
            .with_context(|| format!("failed to write '{}'", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&html).context("failed to write stdout")?;
            stdout.flush().context("failed to write stdout")?;
        }
    }
    Ok(())
}

// =============================================================================
// Worker Command
// =============================================================================

fn cmd_worker(config: WorkerConfig) -> Result<()> {
    info!(
        max_input_len = config.max_input_len,
        max_header_len = config.max_header_len,
        max_arena_bytes = config.max_arena_bytes,
        "worker starting"
    );

    let stdin = io::stdin().lock();
    let stdout = BufWriter::new(io::stdout().lock());
    let mut worker = Worker::new(stdin, stdout, config);
    worker.serve().context("worker stopped")?;
    Ok(())
}

// =============================================================================
// Ast Command
// =============================================================================

fn cmd_ast(file: Option<&Path>, json: bool) -> Result<()> {
    let input = read_input(file)?;
    let arena = Arena::new();
    let doc = parse(&arena, &input).context("parse failed")?;

    if json {
        let tree = JsonNode::from_node(&doc);
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        let mut out = io::stdout().lock();
        print_tree(&mut out, &doc, 0)?;
    }
    Ok(())
}

fn print_tree(out: &mut impl Write, node: &Node, depth: usize) -> io::Result<()> {
    let indent = "  ".repeat(depth);
    match node {
        Node::Heading(h) => writeln!(out, "{}heading level={}", indent, h.level)?,
        Node::Text(t) => writeln!(out, "{}text {:?}", indent, t.value)?,
        Node::Code(c) => writeln!(out, "{}code {:?}", indent, c.value)?,
        Node::List(List {
            ordered, marker, ..
        }) => writeln!(
            out,
            "{}list ordered={} marker={:?}",
            indent, ordered, *marker as char
        )?,
        Node::CodeBlock(CodeBlock { language, value }) => match language {
            Some(lang) => writeln!(out, "{}code_block lang={:?} {:?}", indent, lang, value)?,
            None => writeln!(out, "{}code_block {:?}", indent, value)?,
        },
        Node::Image(Image { alt, src, title }) => {
            writeln!(out, "{}image src={:?} alt={:?}", indent, src, alt)?;
            if let Some(title) = title {
                writeln!(out, "{}  title={:?}", indent, title)?;
            }
        }
        Node::Link(Link { href, title, .. }) => {
            writeln!(out, "{}link href={:?}", indent, href)?;
            if let Some(title) = title {
                writeln!(out, "{}  title={:?}", indent, title)?;
            }
        }
        Node::Document(_) => writeln!(out, "{}document", indent)?,
        Node::Paragraph(_) => writeln!(out, "{}paragraph", indent)?,
        Node::Blockquote(_) => writeln!(out, "{}blockquote", indent)?,
        Node::ListItem(_) => writeln!(out, "{}list_item", indent)?,
        Node::InlineBold(_) => writeln!(out, "{}bold", indent)?,
        Node::InlineItalics(_) => writeln!(out, "{}italics", indent)?,
        Node::HorizontalRule => writeln!(out, "{}horizontal_rule", indent)?,
        Node::LineBreak => writeln!(out, "{}line_break", indent)?,
    }

    for child in node.children() {
        print_tree(out, child, depth + 1)?;
    }
    Ok(())
}

// =============================================================================
// Validate Command
// =============================================================================

fn cmd_validate(file: Option<&Path>) -> Result<()> {
    let input = read_input(file)?;
    let arena = Arena::new();

    match parse(&arena, &input) {
        Ok(_) => {
            println!("Valid: no errors found");
            Ok(())
        }
        Err(err) => {
            if let Some(span) = err.span {
                let line = span.line_in(&input);
                eprintln!("Invalid ({:?}) near line {}: {}", err.kind, line, err);
            } else {
                eprintln!("Invalid ({:?}): {}", err.kind, err);
            }
            bail!("document is not valid")
        }
    }
}

// =============================================================================
// Stats Command
// =============================================================================

fn cmd_stats(file: Option<&Path>) -> Result<()> {
    let input = read_input(file)?;
    let arena = Arena::new();
    let doc = parse(&arena, &input).context("parse failed")?;

    let mut counts = BTreeMap::new();
    count_nodes(&doc, &mut counts);
    let html = markdown_to_html(&input)?;

    println!("Document Statistics");
    println!("-------------------");
    for (kind, count) in &counts {
        println!("  {:<16}{}", format!("{}:", kind), count);
    }
    println!();
    println!("Size:");
    println!("  Input bytes:    {}", input.len());
    println!("  Lines:          {}", input.split(|&b| b == b'\n').count());
    println!("  HTML bytes:     {}", html.len());
    println!("  Arena bytes:    {}", arena.used_bytes());

    Ok(())
}

fn count_nodes(node: &Node, counts: &mut BTreeMap<&'static str, usize>) {
    *counts.entry(node.kind_name()).or_default() += 1;
    for child in node.children() {
        count_nodes(child, counts);
    }
}

// =============================================================================
// JSON Output
// =============================================================================

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum JsonNode<'a> {
    Document {
        children: Vec<JsonNode<'a>>,
    },
    Heading {
        level: u8,
        children: Vec<JsonNode<'a>>,
    },
    Paragraph {
        children: Vec<JsonNode<'a>>,
    },
    Text {
        value: Cow<'a, str>,
    },
    Blockquote {
        children: Vec<JsonNode<'a>>,
    },
    List {
        ordered: bool,
        marker: char,
        children: Vec<JsonNode<'a>>,
    },
    ListItem {
        children: Vec<JsonNode<'a>>,
    },
    Code {
        value: Cow<'a, str>,
    },
    CodeBlock {
        language: Option<Cow<'a, str>>,
        value: Cow<'a, str>,
    },
    Bold {
        children: Vec<JsonNode<'a>>,
    },
    Italics {
        children: Vec<JsonNode<'a>>,
    },
    Image {
        alt: Cow<'a, str>,
        src: Cow<'a, str>,
        title: Option<Cow<'a, str>>,
    },
    Link {
        href: Cow<'a, str>,
        title: Option<Cow<'a, str>>,
        children: Vec<JsonNode<'a>>,
    },
    HorizontalRule,
    LineBreak,
}

impl<'a> JsonNode<'a> {
    fn from_node(node: &Node<'a>) -> Self {
        let children = || node.children().iter().map(JsonNode::from_node).collect();
        let lossy = |bytes: &'a [u8]| String::from_utf8_lossy(bytes);

        match node {
            Node::Document(_) => JsonNode::Document {
                children: children(),
            },
            Node::Heading(h) => JsonNode::Heading {
                level: h.level,
                children: children(),
            },
            Node::Paragraph(_) => JsonNode::Paragraph {
                children: children(),
            },
            Node::Text(t) => JsonNode::Text {
                value: lossy(t.value),
            },
            Node::Blockquote(_) => JsonNode::Blockquote {
                children: children(),
            },
            Node::List(l) => JsonNode::List {
                ordered: l.ordered,
                marker: l.marker as char,
                children: children(),
            },
            Node::ListItem(_) => JsonNode::ListItem {
                children: children(),
            },
            Node::Code(c) => JsonNode::Code {
                value: lossy(c.value),
            },
            Node::CodeBlock(c) => JsonNode::CodeBlock {
                language: c.language.map(|l| lossy(l)),
                value: lossy(c.value),
            },
            Node::InlineBold(_) => JsonNode::Bold {
                children: children(),
            },
            Node::InlineItalics(_) => JsonNode::Italics {
                children: children(),
            },
            Node::Image(i) => JsonNode::Image {
                alt: lossy(i.alt),
                src: lossy(i.src),
                title: i.title.map(|t| lossy(t)),
            },
            Node::Link(l) => JsonNode::Link {
                href: lossy(l.href),
                title: l.title.map(|t| lossy(t)),
                children: children(),
            },
            Node::HorizontalRule => JsonNode::HorizontalRule,
            Node::LineBreak => JsonNode::LineBreak,
        }
    }
}
