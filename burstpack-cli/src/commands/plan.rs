//! Plan command - show the alignment a stage configuration implies.

use super::StageArgs;
use anyhow::Result;
use burstpack_core::stage::GROUPS_PER_COMMAND;
use burstpack_core::{CorrelationEdge, Item};

/// Run the plan command.
pub fn run(args: &StageArgs) -> Result<()> {
    let config = args.resolve()?;
    let a = config.alignment::<CorrelationEdge>()?;
    let groups = GROUPS_PER_COMMAND as usize;

    println!("Stage Plan");
    println!("==========");
    println!("Lane width (N):     {}", a.lane_width);
    println!("Item size:          {} bytes", CorrelationEdge::SIZE_BYTES);
    println!("Burst:              {} bytes, {} items", config.burst_capacity_bytes, a.burst_size);
    println!("Ring slots:         {}", a.ring_len());
    println!("gcd(N, burst):      {}", a.gcd);
    println!("Alignment group:    {} items = {} bursts = {} halves", a.lcm, a.lcm_bursts, a.lcm_pipes);
    println!(
        "Full command:       {} bursts, {} items",
        groups * a.lcm_bursts,
        groups * a.lcm
    );
    println!("Drain steps:        {}", a.lcm_pipes);
    println!("Base offset:        {}", config.base_offset);
    println!();
    println!("Configuration:");
    print!("{}", config.to_yaml_string()?);

    Ok(())
}
