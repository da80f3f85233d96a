//! `provision-infrastructure`

use crate::azure::AzCli;
use crate::commands::TargetArgs;
use crate::config::RiggingConfig;
use crate::error::CliResult;
use crate::lookup::HttpAddressLookup;
use crate::output::{self, print_info, print_success, print_warning, OutputFormat, StepRow};
use crate::sqlcmd::SqlcmdRunner;
use rigging_orchestrator::{ProcessEnv, ProvisionReport, ProvisionRequest, ProvisioningOrchestrator};
use std::path::Path;
use std::sync::Arc;

pub async fn execute(
    args: TargetArgs,
    config: &RiggingConfig,
    workdir: &Path,
    format: OutputFormat,
) -> CliResult<()> {
    let lookup = HttpAddressLookup::new(config.address_lookup_url())?;
    let orchestrator = ProvisioningOrchestrator::new(
        config.orchestrator_config(workdir),
        Arc::new(AzCli::new()),
        Arc::new(SqlcmdRunner::new()),
        Arc::new(lookup),
        Arc::new(ProcessEnv),
    )
    .with_detector(config.detector());

    let request = ProvisionRequest::new(args.resource_group, args.location)
        .with_base_name(args.base_name)
        .with_extended_features(args.deploy_genai);

    if let Some(line) = banner(&request, format) {
        print_info(&line);
    }
    let report = orchestrator.provision(&request).await?;
    render(&report, format)
}

/// Progress line for table output; structured formats keep stdout parseable
fn banner(request: &ProvisionRequest, format: OutputFormat) -> Option<String> {
    (format == OutputFormat::Table).then(|| {
        format!(
            "Provisioning {} in {} (base name {})",
            request.resource_group, request.region, request.base_name
        )
    })
}

fn render(report: &ProvisionReport, format: OutputFormat) -> CliResult<()> {
    if format != OutputFormat::Table {
        return output::print_single(report, format);
    }

    output::print_output(StepRow::rows(&report.steps), format)?;
    if report.recovered {
        print_warning(&format!(
            "Deployment result was inconclusive; continued with {}",
            report.deployment_name
        ));
    }
    if report.steps.is_degraded() {
        print_warning("Some best-effort steps failed; rerun to retry them");
    }
    print_success(&format!(
        "Infrastructure ready: https://{}",
        report.context.web_app_hostname
    ));
    print_info(&format!(
        "Deployment context written to {}",
        report.context_path.display()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_only_for_table_output() {
        let request = ProvisionRequest::new("rg-expenses", "eastus").with_base_name("demo");

        let line = banner(&request, OutputFormat::Table).unwrap();
        assert_eq!(line, "Provisioning rg-expenses in eastus (base name demo)");
        assert!(banner(&request, OutputFormat::Json).is_none());
        assert!(banner(&request, OutputFormat::Yaml).is_none());
    }
}
