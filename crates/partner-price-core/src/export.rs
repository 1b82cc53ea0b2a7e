//! Export of loaded price tables
//!
//! CSV output uses the canonical long layout, so an exported Moments table can
//! be published or mirrored as an Answers-style sheet.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::models::{PriceTable, Product};

/// Export a table to CSV in canonical layout
///
/// Threshold tables are written as `plan, threshold, price_<cur>, overage_<cur>`,
/// bracket tables as `plan, agent_min, agent_max, price_<cur>`. Missing values
/// become empty cells.
///
/// # Errors
/// Returns error if file creation or write operations fail
///
/// # Examples
///
/// ```no_run
/// use partner_price_core::export::export_price_table_to_csv;
/// use partner_price_core::models::Product;
/// use partner_price_core::{PriceStore, SourceConfig};
/// use std::path::Path;
///
/// # async fn run() -> anyhow::Result<()> {
/// let store = PriceStore::new(SourceConfig::default());
/// let table = store.load(Product::Moments).await?;
/// export_price_table_to_csv(Product::Moments, &table, Path::new("moments_long.csv"))?;
/// # Ok(())
/// # }
/// ```
pub fn export_price_table_to_csv(product: Product, table: &PriceTable, path: &Path) -> Result<()> {
    let mut writer = create_writer(path, "CSV")?;

    let raw = table.to_raw(product.key());
    writer
        .write_all(raw.to_csv_string().as_bytes())
        .with_context(|| format!("Failed to write {} table", product))?;

    writer.flush().context("Failed to flush CSV writer")?;

    Ok(())
}

/// Export a table to pretty-printed JSON
///
/// The document carries the product, its shape and the typed rows.
pub fn export_price_table_to_json(product: Product, table: &PriceTable, path: &Path) -> Result<()> {
    let mut writer = create_writer(path, "JSON")?;

    let document = serde_json::json!({
        "product": product,
        "table": table,
    });

    serde_json::to_writer_pretty(&mut writer, &document)
        .with_context(|| format!("Failed to serialize {} table", product))?;
    writeln!(writer).context("Failed to write JSON trailer")?;

    writer.flush().context("Failed to flush JSON writer")?;

    Ok(())
}

fn create_writer(path: &Path, kind: &str) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create {} file: {}", kind, path.display()))?;

    Ok(BufWriter::new(file))
}
