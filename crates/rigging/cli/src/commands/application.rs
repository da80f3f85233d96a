//! `deploy-application`

use crate::azure::AzCli;
use crate::commands::TargetArgs;
use crate::config::RiggingConfig;
use crate::error::CliResult;
use crate::output::{self, print_success, OutputFormat, StepRow};
use rigging_orchestrator::{ApplicationDeployer, ApplicationRequest};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub async fn execute(
    args: TargetArgs,
    package: Option<PathBuf>,
    config: &RiggingConfig,
    workdir: &Path,
    format: OutputFormat,
) -> CliResult<()> {
    let package = package.unwrap_or_else(|| config.package_path());
    let request = ApplicationRequest {
        resource_group: args.resource_group,
        region: args.location,
        extended_features: args.deploy_genai,
        package: workdir.join(package),
        search_dir: workdir.to_path_buf(),
    };

    let report = ApplicationDeployer::new(Arc::new(AzCli::new()))
        .deploy(&request)
        .await?;

    if format != OutputFormat::Table {
        return output::print_single(&report, format);
    }
    output::print_output(StepRow::rows(&report.steps), format)?;
    print_success(&format!(
        "{} deployed: https://{}",
        report.web_app_name, report.web_app_hostname
    ));
    Ok(())
}
