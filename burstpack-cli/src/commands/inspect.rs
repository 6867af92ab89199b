//! Inspect command - print a burst store's header and leading items.

use anyhow::{Context, Result};
use burstpack_core::{BurstStore, CorrelationEdge, Item};
use std::path::Path;

/// Run the inspect command.
pub fn run(path: &Path, limit: u64) -> Result<()> {
    tracing::info!(path = %path.display(), limit, "Inspecting store");

    if !path.exists() {
        anyhow::bail!("Store file not found: {}", path.display());
    }
    let store = BurstStore::open(path)
        .with_context(|| format!("Failed to open store: {}", path.display()))?;
    let header = store.header();

    println!("Store Information");
    println!("=================");
    println!("Run ID:         {}", header.run_id);
    println!("Path:           {}", path.display());
    println!("Version:        {}", header.version);
    println!("Item size:      {} bytes", header.item_size);
    println!("Burst size:     {} bytes", header.burst_bytes);
    println!("Lane width:     {}", header.lane_width);
    println!("Base offset:    {}", header.base_offset);
    println!("Capacity:       {} bursts", header.capacity_bursts);
    println!("High water:     {}", header.high_water);
    println!("Created at:     {}", header.created_at);

    if !header.is_finalized() {
        println!("Finalized:      no");
        println!();
        println!("The run did not finish; item count unknown.");
        return Ok(());
    }
    println!("Finalized:      yes");
    println!("Items written:  {}", header.total_written);
    println!();

    if header.item_size as usize != CorrelationEdge::SIZE_BYTES {
        println!("Items are not correlation edges; skipping item dump.");
        return Ok(());
    }

    let count = limit.min(header.total_written);
    let items = store.read_items::<CorrelationEdge>(0, count)?;
    println!("{:>8}  {:>10}  {:>10}  {:>12}", "#", "pixel_a", "pixel_b", "correlation");
    for (i, edge) in items.iter().enumerate() {
        println!(
            "{:>8}  {:>10}  {:>10}  {:>12.6}",
            i, edge.pixel_a, edge.pixel_b, edge.correlation
        );
    }
    if header.total_written > count {
        println!("... {} more", header.total_written - count);
    }

    Ok(())
}
