//! Rigging Types - Core types for infrastructure provisioning
//!
//! Rigging provisions the cloud resources an application needs (compute,
//! database, workload identity, telemetry and optionally a generative-AI tier),
//! wires them together without embedded secrets, and hands a structured
//! deployment context to the separately-invoked application deployment stage.
//!
//! ## Key Concepts
//!
//! - **RunContext**: Who is acting, and whether a human is at the keyboard
//! - **ModuleSpec / ExecutionPlan**: Template module graph before and after compilation
//! - **DeploymentOutputs**: Named values produced by a successful deployment
//! - **DeploymentRecord**: One entry of the control plane's deployment history
//! - **Settings keys**: The exact configuration keys the application reads
//! - **DeploymentContext**: The handoff artifact between the two stages

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod context;
pub mod deployment;
pub mod error;
pub mod module;
pub mod outputs;
pub mod resource;
pub mod run;
pub mod settings;

// Re-export main types
pub use context::{DeploymentContext, CONTEXT_FILE_NAME};
pub use deployment::{
    DeploymentParameters, DeploymentRecord, ExecutionPhase, ProvisioningState,
};
pub use error::{Result, TypesError};
pub use module::{Dependency, ExecutionPlan, ModuleNode, ModulePhase, ModuleSpec};
pub use outputs::{DeploymentOutputs, OutputName};
pub use resource::{ResourceGroup, WorkloadIdentity};
pub use run::{PrincipalKind, RunContext, RunMode};
pub use settings::{AppSettingKey, ConnectionStringKey, SettingsBatch};
