//! Resource group ensurer - idempotent create-if-absent

use crate::control_plane::ControlPlane;
use crate::error::Result;
use rigging_types::ResourceGroup;
use tracing::{info, instrument, warn};

/// What ensuring the group amounted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The group did not exist and was created
    Created,
    /// The group already existed in the requested region
    Existing,
    /// The group exists in another region; left untouched
    RegionMismatch { actual_region: String },
}

/// Ensure `group` exists.
///
/// An existing group in a different region is not reconciled: resources are
/// still deployed into it and a warning is logged.
#[instrument(skip(control_plane, group), fields(resource_group = %group.name, region = %group.region))]
pub async fn ensure_resource_group(
    control_plane: &dyn ControlPlane,
    group: &ResourceGroup,
) -> Result<EnsureOutcome> {
    match control_plane.get_resource_group(&group.name).await? {
        Some(existing) if group.same_region(&existing.region) => {
            info!("Resource group already exists");
            Ok(EnsureOutcome::Existing)
        }
        Some(existing) => {
            warn!(
                actual_region = %existing.region,
                "Resource group exists in a different region; it will not be moved"
            );
            Ok(EnsureOutcome::RegionMismatch {
                actual_region: existing.region,
            })
        }
        None => {
            control_plane.create_resource_group(group).await?;
            info!("Resource group created");
            Ok(EnsureOutcome::Created)
        }
    }
}
