//! pdfgfx CLI - catalog and export images and figures from PDF documents

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfgfx::{AssetPipeline, DocumentCatalog, DocumentSource, ExtractOptions, PdfParser};

#[derive(Parser)]
#[command(name = "pdfgfx")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Catalog and export images and figures from PDF documents", long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan PDFs and print their asset catalogs
    Scan {
        /// Input PDF files
        #[arg(value_name = "FILES", required = true)]
        inputs: Vec<PathBuf>,

        /// Print catalogs as JSON instead of the images passage
        #[arg(long)]
        json: bool,

        /// Extraction options (JSON)
        #[arg(short, long, value_name = "FILE", env = "PDFGFX_CONFIG")]
        config: Option<PathBuf>,

        /// Write `<id>.txt` (document text) and `<id>.meta.json` per document
        #[arg(long, value_name = "DIR")]
        save: Option<PathBuf>,

        /// Skip unreadable pages instead of failing the document
        #[arg(long)]
        lenient: bool,
    },

    /// List the asset names found in a text file
    Refs {
        /// Generated text
        #[arg(value_name = "TEXT_FILE")]
        text: PathBuf,
    },

    /// Export the assets a text refers to
    Export {
        /// Generated text
        #[arg(value_name = "TEXT_FILE")]
        text: PathBuf,

        /// Source PDF files
        #[arg(value_name = "FILES", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Extraction options (JSON)
        #[arg(short, long, value_name = "FILE", env = "PDFGFX_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Scan {
            inputs,
            json,
            config,
            save,
            lenient,
        } => cmd_scan(&inputs, json, config.as_deref(), save.as_deref(), lenient),
        Commands::Refs { text } => cmd_refs(&text),
        Commands::Export {
            text,
            inputs,
            output,
            config,
        } => cmd_export(&text, &inputs, &output, config.as_deref()),
        Commands::Info { input } => cmd_info(&input),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => log::LevelFilter::Error,
        (false, 0) => log::LevelFilter::Warn,
        (false, 1) => log::LevelFilter::Debug,
        (false, _) => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn load_options(config: Option<&Path>) -> Result<ExtractOptions, Box<dyn std::error::Error>> {
    match config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            Ok(serde_json::from_str(&raw)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?)
        }
        None => Ok(ExtractOptions::default()),
    }
}

fn cmd_scan(
    inputs: &[PathBuf],
    json: bool,
    config: Option<&Path>,
    save: Option<&Path>,
    lenient: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = load_options(config)?;
    if lenient {
        options = options.lenient();
    }
    let pipeline = AssetPipeline::with_options(options);

    if let Some(dir) = save {
        fs::create_dir_all(dir)?;
    }

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut catalogs = Vec::new();
    let mut failed = 0;
    for input in inputs {
        pb.set_message(input.display().to_string());
        match pipeline.scan(&DocumentSource::from_path(input)) {
            Ok(catalog) => {
                if let Some(dir) = save {
                    save_catalog(&catalog, dir)?;
                }
                catalogs.push(catalog);
            }
            Err(e) => {
                pb.println(format!("{} {}: {}", "Skipped".yellow(), input.display(), e));
                failed += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&catalog_json(&catalogs))?);
    } else {
        for catalog in &catalogs {
            println!(
                "{} {} ({} assets)",
                "Document".cyan().bold(),
                catalog.document_id,
                catalog.num_images()
            );
            if !catalog.is_empty() {
                println!("{}", catalog.images_passage());
            }
        }
    }

    if failed > 0 {
        eprintln!(
            "\n{} {} of {} documents could not be scanned",
            "Warning:".yellow().bold(),
            failed,
            inputs.len()
        );
    }
    Ok(())
}

fn catalog_json(catalogs: &[DocumentCatalog]) -> serde_json::Value {
    serde_json::Value::Array(
        catalogs
            .iter()
            .map(|c| {
                serde_json::json!({
                    "document_id": c.document_id,
                    "page_count": c.page_count,
                    "metadata": c.metadata(),
                    "assets": c.descriptors(),
                })
            })
            .collect(),
    )
}

fn save_catalog(catalog: &DocumentCatalog, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let id = catalog.document_id.as_str();
    fs::write(dir.join(format!("{}.txt", id)), &catalog.text)?;
    fs::write(
        dir.join(format!("{}.meta.json", id)),
        serde_json::to_string_pretty(&catalog.metadata())?,
    )?;
    Ok(())
}

fn cmd_refs(text: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let text = fs::read_to_string(text)?;
    let references = pdfgfx::resolve_references(&text);

    for reference in &references {
        println!(
            "{}  {} page {} {} {}",
            reference,
            reference.document_id.as_str().dimmed(),
            reference.page_index,
            reference.kind,
            reference.local_index
        );
    }
    println!("\n{} {} references", "Found".green().bold(), references.len());
    Ok(())
}

fn cmd_export(
    text: &Path,
    inputs: &[PathBuf],
    output: &Path,
    config: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = fs::read_to_string(text)?;
    let pipeline = AssetPipeline::with_options(load_options(config)?);
    let sources: Vec<DocumentSource> = inputs.iter().map(DocumentSource::from_path).collect();

    let report = pipeline.export(&text, &sources, output)?;

    for path in &report.written {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        println!("{} {}", "Exported".green(), name);
    }
    for reference in &report.missing {
        println!("{} {}", "Missing".yellow(), reference);
    }
    for failure in &report.failures {
        println!("{} {}: {}", "Failed".red(), failure.source, failure.error);
    }

    println!(
        "\n{} {} written to {}",
        "Done!".green().bold(),
        report.written.len(),
        output.display()
    );
    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let parser = PdfParser::open(input)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), parser.version());
    println!("{}: {}", "Pages".bold(), parser.page_count());
    println!(
        "{}: {}",
        "Document id".bold(),
        pdfgfx::DocumentId::from_path(input)
    );

    let pipeline = AssetPipeline::with_options(ExtractOptions::new().lenient());
    let catalog = pipeline.scan(&DocumentSource::from_path(input))?;
    let images = catalog
        .assets()
        .iter()
        .filter(|a| a.kind == pdfgfx::AssetKind::Image)
        .count();

    println!();
    println!("{}", "Assets".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Images".bold(), images);
    println!("{}: {}", "Figures".bold(), catalog.num_images() - images);
    println!(
        "{}: {}",
        "Captioned".bold(),
        catalog.assets().iter().filter(|a| a.caption.is_some()).count()
    );
    println!(
        "{}: {}",
        "Words".bold(),
        catalog.text.split_whitespace().count()
    );

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdfgfx".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF image and figure extraction tool");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/pdfgfx".dimmed());
    println!("License: MIT");
}
