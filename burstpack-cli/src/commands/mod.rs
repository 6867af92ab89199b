//! CLI command implementations.

pub mod inspect;
pub mod plan;
pub mod run;
pub mod version;

use anyhow::{Context, Result};
use burstpack_core::{BurstProfile, StageConfig};
use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// Board profile selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProfileArg {
    /// 96-byte bursts
    Max2,
    /// 384-byte bursts
    Max3,
}

impl From<ProfileArg> for BurstProfile {
    fn from(profile: ProfileArg) -> Self {
        match profile {
            ProfileArg::Max2 => BurstProfile::Max2,
            ProfileArg::Max3 => BurstProfile::Max3,
        }
    }
}

/// Stage geometry options shared by several commands.
#[derive(Debug, Clone, Args)]
pub struct StageArgs {
    /// YAML stage configuration; overrides the geometry flags
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of producer lanes
    #[arg(short = 'n', long, default_value = "4")]
    pub lanes: usize,

    /// Board profile giving the burst size
    #[arg(long, value_enum, default_value = "max3")]
    pub profile: ProfileArg,

    /// Burst size in bytes, instead of the profile's
    #[arg(long)]
    pub burst_bytes: Option<usize>,

    /// First burst address of the run's output
    #[arg(long, default_value = "0")]
    pub base_offset: u64,
}

impl StageArgs {
    /// Build the stage configuration these options describe.
    pub fn resolve(&self) -> Result<StageConfig> {
        if let Some(path) = &self.config {
            let yaml = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            return StageConfig::from_yaml_str(&yaml)
                .with_context(|| format!("Invalid config: {}", path.display()));
        }

        let mut builder = StageConfig::builder()
            .lane_width(self.lanes)
            .profile(self.profile.into())
            .base_offset(self.base_offset);
        if let Some(bytes) = self.burst_bytes {
            builder = builder.burst_capacity_bytes(bytes);
        }
        Ok(builder.build())
    }
}
