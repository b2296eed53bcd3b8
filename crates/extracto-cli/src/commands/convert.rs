//! Statement conversion command

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use extracto_core::{
    export::write_qif,
    import::load_statement,
    models::{AccountMetadata, OutputEncoding, PayeePolicy},
    process::{run_batch, RowProcessor},
    Config,
};
use tempfile::NamedTempFile;
use tracing::info;

/// Options collected from the command line
#[derive(Debug, Clone)]
pub struct ConvertOptions<'a> {
    pub input: &'a Path,
    pub output: Option<&'a Path>,
    pub encoding: OutputEncoding,
    pub payee_policy: Option<PayeePolicy>,
    pub config_path: Option<&'a Path>,
}

/// What a conversion produced
#[derive(Debug, Clone)]
pub struct ConvertSummary {
    pub output: PathBuf,
    pub processed: usize,
    pub skipped: usize,
    pub metadata: AccountMetadata,
}

/// Input path with its extension replaced by `.qif`
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("qif")
}

pub fn cmd_convert(options: &ConvertOptions<'_>, today: NaiveDate) -> Result<ConvertSummary> {
    let mut config = Config::load(options.config_path).context("Failed to load configuration")?;
    if let Some(policy) = options.payee_policy {
        config.payee_policy = policy;
    }

    let output = options
        .output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(options.input));

    println!("📥 Converting {}...", options.input.display());

    let statement = load_statement(options.input, &config)
        .with_context(|| format!("Failed to load statement: {}", options.input.display()))?;

    let processor = RowProcessor::new(&config, config.date_window(today))?;
    let batch = run_batch(&processor, &statement.rows)
        .with_context(|| format!("No QIF written for {}", options.input.display()))?;

    write_atomically(&output, |file| {
        write_qif(&batch.records, file, options.encoding).map_err(Into::into)
    })?;

    info!(
        "Wrote {} records to {} ({}, payee policy: {})",
        batch.records.len(),
        output.display(),
        options.encoding,
        processor.policy()
    );

    let summary = ConvertSummary {
        output,
        processed: batch.records.len(),
        skipped: batch.skipped_count(),
        metadata: statement.metadata,
    };
    print_summary(&summary);
    Ok(summary)
}

/// Write to a temporary file next to `path`, then move it into place
fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut NamedTempFile) -> Result<()>,
{
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    write(&mut file)?;
    set_output_permissions(file.as_file(), path)?;
    file.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Temp files are created 0600; give the output the permissions of the file it
/// replaces, or 0644 for a new file
#[cfg(unix)]
fn set_output_permissions(file: &fs::File, path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let permissions = match fs::metadata(path) {
        Ok(existing) => existing.permissions(),
        Err(_) => fs::Permissions::from_mode(0o644),
    };
    file.set_permissions(permissions)
        .with_context(|| format!("Failed to set permissions for {}", path.display()))
}

#[cfg(not(unix))]
fn set_output_permissions(_file: &fs::File, _path: &Path) -> Result<()> {
    Ok(())
}

fn print_summary(summary: &ConvertSummary) {
    println!("✅ Conversion complete!");
    println!("   Processed: {}", summary.processed);
    println!("   Skipped:   {}", summary.skipped);
    println!("   Output:    {}", summary.output.display());

    let metadata = &summary.metadata;
    if !metadata.is_empty() {
        println!();
        println!("🏦 Account");
        if let Some(number) = &metadata.account_number {
            println!("   Number:   {}", number);
        }
        if let Some(holder) = &metadata.holder_name {
            println!("   Holder:   {}", holder);
        }
        if let Some(date) = &metadata.export_date {
            println!("   Exported: {}", date);
        }
    }
}
