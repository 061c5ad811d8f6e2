//! Requirements Builder CLI
//!
//! CSV → MessagePack+LZ4 requirement table, integrity check, and offline
//! constraint analysis against a built table.

#[cfg(feature = "cli")]
use anyhow::{Context, Result};
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};

#[cfg(feature = "cli")]
use evidence_core::registry::{Gender, SkillCategory};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "requirements_builder")]
#[command(about = "Build and query category requirement tables", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Build a requirement table from a CSV export
    Build {
        /// Input CSV (category,gender,test_number,minimum_value,is_hard_constraint,domain)
        #[arg(long)]
        csv: PathBuf,

        /// Output MsgPack+LZ4 file path
        #[arg(long)]
        out: PathBuf,

        /// Schema version (e.g., "v1")
        #[arg(long, default_value = "v1")]
        schema_version: String,

        /// Verify table after building
        #[arg(long, default_value = "false")]
        verify: bool,

        /// Output metadata JSON file
        #[arg(long)]
        metadata: Option<PathBuf>,
    },

    /// Check a table file against its SHA256 checksum
    Verify {
        #[arg(long)]
        table: PathBuf,

        #[arg(long)]
        checksum: String,
    },

    /// Report binding constraints for a player against a built table
    Analyze {
        #[arg(long)]
        table: PathBuf,

        /// Current skill category (A-K)
        #[arg(long)]
        category: SkillCategory,

        /// Gender code (M or K)
        #[arg(long)]
        gender: Gender,

        /// Latest test value as TEST=VALUE, repeatable
        #[arg(long = "value", value_parser = parse_test_value)]
        values: Vec<(u8, f64)>,

        /// Override the maximum number of binding constraints reported
        #[arg(long)]
        max: Option<u32>,

        #[arg(long)]
        player: Option<uuid::Uuid>,

        /// Engine configuration YAML (defaults to EVIDENCE_CONFIG / EVIDENCE_PROFILE)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[cfg(feature = "cli")]
fn parse_test_value(raw: &str) -> std::result::Result<(u8, f64), String> {
    let (test, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected TEST=VALUE, got '{}'", raw))?;
    let test: u8 = test.trim().parse().map_err(|_| format!("invalid test number '{}'", test.trim()))?;
    let value: f64 = value.trim().parse().map_err(|_| format!("invalid value '{}'", value.trim()))?;
    if !value.is_finite() {
        return Err(format!("value for test {} is not finite", test));
    }
    Ok((test, value))
}

#[cfg(feature = "cli")]
fn init_logging(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Build { csv, out, schema_version, verify, metadata } => {
            println!("Building requirement table...");
            println!("   CSV Input: {}", csv.display());
            println!("   Output:    {}", out.display());
            println!("   Schema:    {}", schema_version);

            let (meta, stats) = requirements_builder::build_requirement_table(&csv, &out, &schema_version)?;

            print_stats(&stats);
            print_metadata(&meta);

            if verify {
                verify_table_integrity(&out, &meta.checksum)?;
            }

            if let Some(metadata_path) = metadata {
                save_metadata(&metadata_path, &meta)?;
            }
        }

        Commands::Verify { table, checksum } => {
            verify_table_integrity(&table, &checksum)?;
        }

        Commands::Analyze { table, category, gender, values, max, player, config } => {
            analyze(&table, category, gender, values, max, player, config.as_deref())?;
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn analyze(
    table: &Path,
    category: SkillCategory,
    gender: Gender,
    values: Vec<(u8, f64)>,
    max: Option<u32>,
    player: Option<uuid::Uuid>,
    config_path: Option<&Path>,
) -> Result<()> {
    use std::collections::HashMap;
    use std::sync::Arc;

    use evidence_core::{CategoryConstraintAnalyzer, DomainRegistry, EvidenceConfig};
    use requirements_builder::TableRequirementStore;

    let mut config = match config_path {
        Some(path) => EvidenceConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => EvidenceConfig::from_env_or_default(),
    };
    if let Some(max) = max {
        config.constraints.max_binding_constraints = max;
        config.check()?;
    }

    let store = TableRequirementStore::open(table)?;
    tracing::info!(rows = store.len(), schema = store.schema_version(), "requirement table loaded");

    let registry = Arc::new(DomainRegistry::builtin()?);
    let analyzer = CategoryConstraintAnalyzer::new(Arc::new(store), registry, config.constraints);

    let latest: HashMap<u8, f64> = values.into_iter().collect();
    let report = analyzer.compute_category_constraints(
        player.unwrap_or_else(uuid::Uuid::nil),
        category,
        gender,
        &latest,
    )?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(feature = "cli")]
fn print_stats(stats: &requirements_builder::ParseStats) {
    println!("\nParsed {} of {} rows", stats.parsed, stats.total_rows);
    if stats.failed > 0 {
        println!("   Skipped:           {}", stats.failed);
    }
    if stats.duplicates > 0 {
        println!("   Duplicates:        {}", stats.duplicates);
    }
    if stats.domain_mismatches > 0 {
        println!("   Domain mismatches: {}", stats.domain_mismatches);
    }
}

#[cfg(feature = "cli")]
fn print_metadata(meta: &requirements_builder::TableMetadata) {
    println!("\nTable built successfully!");
    println!("   Rows:            {}", meta.row_count);
    println!(
        "   Original size:   {} bytes ({:.2} KB)",
        meta.original_size,
        meta.original_size as f64 / 1024.0
    );
    println!(
        "   Compressed size: {} bytes ({:.2} KB)",
        meta.compressed_size,
        meta.compressed_size as f64 / 1024.0
    );
    println!("   Compression:     {:.1}%", meta.compression_ratio * 100.0);
    println!("   Checksum:        {}", meta.checksum);
    println!("   Created:         {}", meta.created_at);
}

#[cfg(feature = "cli")]
fn verify_table_integrity(table_path: &Path, checksum: &str) -> Result<()> {
    println!("\nVerifying table integrity...");
    if requirements_builder::verify_table(table_path, checksum)? {
        println!("Table verification passed");
        Ok(())
    } else {
        anyhow::bail!("Table verification failed - checksum mismatch!")
    }
}

#[cfg(feature = "cli")]
fn save_metadata(path: &Path, meta: &requirements_builder::TableMetadata) -> Result<()> {
    let metadata_json = serde_json::to_string_pretty(meta)?;
    std::fs::write(path, metadata_json)
        .with_context(|| format!("Failed to write metadata: {}", path.display()))?;
    println!("\nMetadata saved to: {}", path.display());
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("requirements_builder CLI is not available. Enable the 'cli' feature to use it.");
    std::process::exit(1);
}
