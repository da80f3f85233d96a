//! Rigging Orchestrator
//!
//! Sequences infrastructure provisioning end to end: identity resolution,
//! resource creation through the control plane, recovery from inconclusive
//! deployment answers, database principal binding, script import, runtime
//! configuration and the handoff to the application deployment stage.
//!
//! ## Architectural Boundaries
//!
//! - `rigging-types` owns: the data model and the handoff file format
//! - `rigging-orchestrator` owns: step ordering, graph compilation, reconciliation, SID derivation
//! - `rigging-cli` owns: process-backed adapters (`az`, `sqlcmd`, address lookup) and presentation
//!
//! ## Key Principle
//!
//! Every external effect goes through a trait ([`ControlPlane`], [`ScriptRunner`],
//! [`AddressLookup`], [`EnvSource`]). Steps past the deployment executor only
//! ever see the outputs of the current run's terminal success.
//!
//! ## Usage
//!
//! ```no_run
//! use rigging_orchestrator::{
//!     InMemoryControlPlane, OrchestratorConfig, ProcessEnv, ProvisionRequest,
//!     ProvisioningOrchestrator, RecordingScriptRunner, StaticAddressLookup,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = ProvisioningOrchestrator::new(
//!     OrchestratorConfig::without_delays(),
//!     Arc::new(InMemoryControlPlane::new()),
//!     Arc::new(RecordingScriptRunner::new()),
//!     Arc::new(StaticAddressLookup::new("203.0.113.7".parse()?)),
//!     Arc::new(ProcessEnv),
//! );
//!
//! let report = orchestrator
//!     .provision(&ProvisionRequest::new("rg-expenses", "eastus"))
//!     .await?;
//! println!("context written to {}", report.context_path.display());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod application;
pub mod compiler;
pub mod config;
pub mod configuration;
pub mod control_plane;
pub mod credentials;
pub mod environment;
pub mod error;
pub mod executor;
pub mod handoff;
pub mod identity;
pub mod memory;
pub mod network;
pub mod pipeline;
pub mod readiness;
pub mod recovery;
pub mod report;
pub mod resource_group;
pub mod scripts;

// Re-exports
pub use application::{ApplicationDeployer, ApplicationRequest};
pub use compiler::{standard_graph, DependencyGraphCompiler};
pub use config::{OrchestratorConfig, DEFAULT_NOISE_PREFIXES};
pub use configuration::{database_connection_string, ConfigurationBatches, ConfigurationWriter};
pub use control_plane::{
    ControlPlane, DeploymentRequest, FirewallRule, SignedInUser, SubmissionOutcome,
};
pub use credentials::CredentialResolver;
pub use environment::{EnvSource, EnvironmentDetector, MapEnv, ProcessEnv};
pub use error::{ErrorClass, OrchestratorError, Result};
pub use executor::{DeploymentExecutor, ExecutionReport};
pub use handoff::{load_context, ContextEmitter};
pub use identity::{binding_script, sid_from_client_id, PrincipalBinder};
pub use memory::{
    ControlPlaneCall, InMemoryControlPlane, RecordingScriptRunner, StaticAddressLookup,
};
pub use network::{AddressLookup, NetworkAccess, NetworkAccessConfigurer};
pub use pipeline::{deployment_name, ProvisionRequest, ProvisioningOrchestrator, DEFAULT_BASE_NAME};
pub use readiness::ReadinessWaiter;
pub use recovery::{PolicyTimingRecovery, RecoveredDeployment};
pub use report::{
    ApplicationReport, ProvisionReport, RunFailure, Step, StepLog, StepOutcome, StepRecord,
};
pub use resource_group::{ensure_resource_group, EnsureOutcome};
pub use scripts::{
    discover_scripts, normalize_procedures, ImportOutcome, ImportSummary, Script,
    ScriptImporter, ScriptInvocation, ScriptKind, ScriptRunner, ScriptTarget, SqlAuthMethod,
};
