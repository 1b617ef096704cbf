mod config;
mod csvout;
mod error;
mod extract;
mod format;
mod mapping;
mod normalize;
mod pipeline;
mod validate;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use config::ConverterConfig;
use error::ConvertError;
use mapping::MappingRegistry;

#[derive(Parser)]
#[command(name = "blogcsv", about = "Blog export XML to CSV converter")]
struct Cli {
    /// Directory of custom platform mapping templates (*.json)
    #[arg(long, global = true)]
    templates: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an export document to CSV
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Platform id (auto-detected when omitted)
        #[arg(short, long)]
        platform: Option<String>,
        /// JSON file with converter options
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Strip content to plain text instead of sanitized HTML
        #[arg(long)]
        plain_text: bool,
    },
    /// Preview the first posts of a conversion without writing a file
    Preview {
        input: PathBuf,
        #[arg(short, long)]
        platform: Option<String>,
        /// Max posts to preview
        #[arg(short = 'n', long, default_value = "5")]
        limit: usize,
    },
    /// Auto-detect the export's platform
    Detect { input: PathBuf },
    /// List available platform mappings
    Platforms,
    /// Document statistics without a full conversion
    Stats {
        input: PathBuf,
        #[arg(short, long)]
        platform: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut registry = MappingRegistry::builtin();
    if let Some(dir) = &cli.templates {
        let loaded = registry.load_templates(dir)?;
        println!("Loaded {} custom template(s) from {}", loaded, dir.display());
    }

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            platform,
            config,
            plain_text,
        } => {
            let mut options = match config {
                Some(path) => ConverterConfig::from_file(&path)?,
                None => ConverterConfig::default(),
            };
            if plain_text {
                options.preserve_html = false;
            }
            convert(&registry, &input, &output, platform.as_deref(), &options)
        }
        Commands::Preview {
            input,
            platform,
            limit,
        } => preview(&registry, &input, platform.as_deref(), limit),
        Commands::Detect { input } => {
            let head = read_head(&input)?;
            match extract::detect_platform(&head) {
                Some(platform) => println!("Detected platform: {platform}"),
                None => println!("Platform unknown; pass --platform explicitly."),
            }
            Ok(())
        }
        Commands::Platforms => {
            for id in registry.ids() {
                println!("{id}");
            }
            Ok(())
        }
        Commands::Stats { input, platform } => stats(&registry, &input, platform.as_deref()),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn convert(
    registry: &MappingRegistry,
    input: &Path,
    output: &Path,
    platform: Option<&str>,
    options: &ConverterConfig,
) -> anyhow::Result<()> {
    let mapping = select_mapping(registry, input, platform)?;
    println!("Converting {} ({})", input.display(), mapping.name);

    let reader = BufReader::new(File::open(input).context("opening input document")?);
    let out = pipeline::run_with_options(reader, mapping, options, None, true)?;

    for warning in &out.report.warnings {
        println!("  warning: {warning}");
    }
    if !out.report.valid {
        println!("Validation errors:");
        for error in &out.report.errors {
            println!("  - {error}");
        }
        return Err(ConvertError::Validation(out.report.errors.len()).into());
    }

    csvout::write_file(&out.rows, output, &options.output_encoding)?;

    let stats = &out.report.stats;
    println!("Wrote {}", output.display());
    println!("Total posts:     {}", stats.total_posts);
    println!("Published:       {}", stats.published_posts);
    println!("Drafts:          {}", stats.draft_posts);
    println!("With images:     {}", stats.posts_with_images);
    println!("With categories: {}", stats.posts_with_categories);
    println!("With tags:       {}", stats.posts_with_tags);
    if out.dropped > 0 {
        println!("Skipped {} non-post record(s)", out.dropped);
    }
    Ok(())
}

fn preview(
    registry: &MappingRegistry,
    input: &Path,
    platform: Option<&str>,
    limit: usize,
) -> anyhow::Result<()> {
    let mapping = select_mapping(registry, input, platform)?;
    let reader = BufReader::new(File::open(input).context("opening input document")?);
    let out = pipeline::run_with_options(
        reader,
        mapping,
        &ConverterConfig::default(),
        Some(limit),
        false,
    )?;
    if out.rows.is_empty() {
        println!("No posts found.");
        return Ok(());
    }
    println!("Preview of first {} post(s):\n", out.rows.len());
    print!("{}", csvout::to_string(&out.rows)?);
    Ok(())
}

fn stats(
    registry: &MappingRegistry,
    input: &Path,
    platform: Option<&str>,
) -> anyhow::Result<()> {
    let size = std::fs::metadata(input)?.len();
    let head = read_head(input)?;
    let detected = extract::detect_platform(&head);
    println!("File size: {:.2} MB", size as f64 / (1024.0 * 1024.0));
    println!(
        "Platform:  {}",
        detected.unwrap_or("unknown (pass --platform)")
    );
    if let Some(id) = platform.or(detected) {
        let mapping = registry.get(id)?;
        let reader = BufReader::new(File::open(input)?);
        let total = extract::count_records(reader, mapping)?;
        println!("Records:   {total}");
    }
    Ok(())
}

fn select_mapping<'r>(
    registry: &'r MappingRegistry,
    input: &Path,
    platform: Option<&str>,
) -> anyhow::Result<&'r mapping::FieldMapping> {
    let id = match platform {
        Some(id) => id.to_string(),
        None => {
            let head = read_head(input)?;
            let detected = extract::detect_platform(&head)
                .ok_or_else(|| ConvertError::UnknownPlatform("auto-detect".into()))?;
            println!("Auto-detected platform: {detected}");
            detected.to_string()
        }
    };
    Ok(registry.get(&id)?)
}

/// First bytes of the document, enough for root-element and substring
/// detection.
fn read_head(path: &Path) -> anyhow::Result<Vec<u8>> {
    let mut file = File::open(path).context("opening input document")?;
    let mut head = vec![0u8; 4096];
    let n = file.read(&mut head)?;
    head.truncate(n);
    Ok(head)
}
