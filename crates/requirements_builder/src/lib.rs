//! Requirements Builder Library
//!
//! CSV (category requirement export) → MessagePack → LZ4 → SHA256 checksum.
//! The resulting table backs [`TableRequirementStore`], a read-only
//! [`RequirementStore`](evidence_core::store::RequirementStore) for offline analysis.

pub mod csv_import;
pub mod table_store;

use anyhow::{Context, Result};
use evidence_core::constraints::CategoryRequirement;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub use csv_import::{parse_requirements_csv, ParseStats};
pub use table_store::TableRequirementStore;

/// Serialized requirement table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementTableFile {
    pub schema_version: String,
    /// Generation time (RFC3339)
    pub generated_at: String,
    pub rows: Vec<CategoryRequirement>,
}

/// Table metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Schema version (e.g. "v1")
    pub schema_version: String,
    /// SHA256 of the compressed file (hex)
    pub checksum: String,
    /// Creation time (RFC3339)
    pub created_at: String,
    pub row_count: usize,
    /// MessagePack size before compression (bytes)
    pub original_size: u64,
    pub compressed_size: u64,
    /// compressed / original
    pub compression_ratio: f64,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Write `rows` as a MessagePack+LZ4 table.
pub fn write_requirement_table(
    rows: Vec<CategoryRequirement>,
    output: &Path,
    schema_version: &str,
) -> Result<TableMetadata> {
    let row_count = rows.len();
    let created_at = chrono::Utc::now().to_rfc3339();
    let table = RequirementTableFile {
        schema_version: schema_version.to_string(),
        generated_at: created_at.clone(),
        rows,
    };

    let msgpack_bytes =
        rmp_serde::to_vec_named(&table).context("Failed to serialize to MessagePack")?;
    let original_size = msgpack_bytes.len() as u64;

    let compressed = lz4_flex::compress_prepend_size(&msgpack_bytes);
    let compressed_size = compressed.len() as u64;
    let checksum = sha256_hex(&compressed);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    fs::write(output, &compressed)
        .with_context(|| format!("Failed to write output file: {}", output.display()))?;

    let compression_ratio =
        if original_size == 0 { 1.0 } else { compressed_size as f64 / original_size as f64 };

    debug!(rows = row_count, compressed_size, %checksum, "requirement table written");

    Ok(TableMetadata {
        schema_version: schema_version.to_string(),
        checksum,
        created_at,
        row_count,
        original_size,
        compressed_size,
        compression_ratio,
    })
}

/// Build a requirement table from a CSV export.
///
/// Returns the table metadata together with the CSV parse statistics.
pub fn build_requirement_table(
    csv_path: &Path,
    output: &Path,
    schema_version: &str,
) -> Result<(TableMetadata, ParseStats)> {
    let (rows, stats) = parse_requirements_csv(csv_path)?;
    if rows.is_empty() {
        anyhow::bail!("No valid requirement rows in {}", csv_path.display());
    }

    info!(
        parsed = stats.parsed,
        failed = stats.failed,
        duplicates = stats.duplicates,
        domain_mismatches = stats.domain_mismatches,
        "parsed requirement CSV"
    );

    let meta = write_requirement_table(rows, output, schema_version)?;
    Ok((meta, stats))
}

/// Check a table file against an expected SHA256 checksum
pub fn verify_table(table_file: &Path, expected_checksum: &str) -> Result<bool> {
    let bytes = fs::read(table_file)
        .with_context(|| format!("Failed to read table file: {}", table_file.display()))?;
    Ok(sha256_hex(&bytes).eq_ignore_ascii_case(expected_checksum.trim()))
}

/// Decompress and decode a table file
pub fn load_table(table_file: &Path) -> Result<RequirementTableFile> {
    let compressed = fs::read(table_file)
        .with_context(|| format!("Failed to read table file: {}", table_file.display()))?;

    let msgpack_bytes =
        lz4_flex::decompress_size_prepended(&compressed).context("Failed to decompress LZ4")?;

    let table: RequirementTableFile =
        rmp_serde::from_slice(&msgpack_bytes).context("Failed to deserialize MessagePack")?;

    Ok(table)
}
