//! CLI command implementations

pub mod application;
pub mod provision;

use clap::Args;
use rigging_orchestrator::DEFAULT_BASE_NAME;

/// Flags shared by both stages
#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    /// Resource group that holds every resource of the environment
    #[arg(short = 'g', long, env = "RIGGING_RESOURCE_GROUP")]
    pub resource_group: String,

    /// Region to deploy into
    #[arg(short, long, visible_alias = "region", env = "RIGGING_LOCATION")]
    pub location: String,

    /// Prefix for resource names
    #[arg(short, long, default_value = DEFAULT_BASE_NAME)]
    pub base_name: String,

    /// Deploy the generative-AI tier
    #[arg(long)]
    pub deploy_genai: bool,
}
