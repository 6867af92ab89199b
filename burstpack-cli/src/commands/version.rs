//! Version command - show version information.

use anyhow::Result;
use burstpack_core::store::STORE_VERSION;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the version command.
pub fn run() -> Result<()> {
    println!("burstpack - burst-aligned lane compaction");
    println!();
    println!("Version:       {}", VERSION);
    println!("Store format:  v{}", STORE_VERSION);
    println!(
        "Platform:      {} / {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    println!();
    println!("Components:");
    println!("  burstpack-core      Stage, alignment, burst stores");
    println!("  burstpack-executor  Streaming pipeline, logging setup");
    println!("  burstpack-cli       Command-line interface");

    Ok(())
}
