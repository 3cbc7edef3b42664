//! Installing a rendered deployment into the cluster
//!
//! The cluster is driven through `kubectl` and `helm`. Commands go through a
//! [`CommandRunner`] so the install sequence can be exercised without a cluster.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::options::{DeploymentOptions, InstallMethod};
use crate::render::RenderedDeployment;

/// Captured output of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Executes external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`; a non-zero exit is an error.
    async fn run(&self, program: &str, args: &[String]) -> E2eResult<CommandOutput>;
}

/// Runs commands as child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> E2eResult<CommandOutput> {
        let command_line = format_command(program, args);
        debug!("Running: {}", command_line);

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|source| E2eError::CommandSpawn {
                command: command_line.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(E2eError::CommandFailed {
                command: command_line,
                status: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

/// `program arg1 arg2 ...` for logs and errors
pub fn format_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Installs a rendered deployment and removes an installed release
#[async_trait]
pub trait Deployer: Send + Sync {
    fn method(&self) -> InstallMethod;

    async fn deploy(&self, rendered: &RenderedDeployment, runner: &dyn CommandRunner)
        -> E2eResult<()>;

    /// Removal needs only the release name and namespace
    async fn teardown(
        &self,
        options: &DeploymentOptions,
        runner: &dyn CommandRunner,
    ) -> E2eResult<()>;
}

/// Pick the deployer for an install method
pub fn deployer_for(method: InstallMethod) -> Box<dyn Deployer> {
    match method {
        InstallMethod::Helm => Box::new(HelmDeployer),
        InstallMethod::Operator => Box::new(OperatorDeployer),
    }
}

/// Deploys through `helm upgrade --install`
#[derive(Debug, Clone, Default)]
pub struct HelmDeployer;

/// Deploys by applying a `Backstage` resource for the operator
#[derive(Debug, Clone, Default)]
pub struct OperatorDeployer;

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

async fn apply_manifests(
    rendered: &RenderedDeployment,
    runner: &dyn CommandRunner,
) -> E2eResult<()> {
    for manifest in &rendered.files.manifests {
        info!("Applying {}", manifest.display());
        runner
            .run(
                "kubectl",
                &["apply".to_string(), "-f".to_string(), path_arg(manifest)],
            )
            .await?;
    }
    Ok(())
}

#[async_trait]
impl Deployer for HelmDeployer {
    fn method(&self) -> InstallMethod {
        InstallMethod::Helm
    }

    async fn deploy(
        &self,
        rendered: &RenderedDeployment,
        runner: &dyn CommandRunner,
    ) -> E2eResult<()> {
        let options = &rendered.options;
        let Some(values) = &rendered.files.helm_values else {
            return Err(E2eError::InvalidOptions(
                "rendered deployment has no helm values file".to_string(),
            ));
        };

        apply_manifests(rendered, runner).await?;

        let mut args = vec![
            "upgrade".to_string(),
            "--install".to_string(),
            options.release_name.clone(),
            options.chart.clone(),
            "--namespace".to_string(),
            options.namespace.clone(),
            "--values".to_string(),
            path_arg(values),
            "--wait".to_string(),
            "--timeout".to_string(),
            format!("{}s", options.timeout_secs),
        ];
        if let Some(version) = &options.version {
            args.push("--version".to_string());
            args.push(version.clone());
        }

        info!(
            "Installing {} into {} with helm ({})",
            options.release_name, options.namespace, options.chart
        );
        runner.run("helm", &args).await?;
        Ok(())
    }

    async fn teardown(
        &self,
        options: &DeploymentOptions,
        runner: &dyn CommandRunner,
    ) -> E2eResult<()> {
        info!("Uninstalling helm release {}", options.release_name);
        runner
            .run(
                "helm",
                &[
                    "uninstall".to_string(),
                    options.release_name.clone(),
                    "--namespace".to_string(),
                    options.namespace.clone(),
                    "--ignore-not-found".to_string(),
                ],
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Deployer for OperatorDeployer {
    fn method(&self) -> InstallMethod {
        InstallMethod::Operator
    }

    async fn deploy(
        &self,
        rendered: &RenderedDeployment,
        runner: &dyn CommandRunner,
    ) -> E2eResult<()> {
        let options = &rendered.options;
        apply_manifests(rendered, runner).await?;

        info!(
            "Waiting for Backstage {} in {} to be deployed",
            options.release_name, options.namespace
        );
        runner
            .run(
                "kubectl",
                &[
                    "wait".to_string(),
                    format!("backstage/{}", options.release_name),
                    "--for=condition=Deployed".to_string(),
                    "--namespace".to_string(),
                    options.namespace.clone(),
                    format!("--timeout={}s", options.timeout_secs),
                ],
            )
            .await?;
        Ok(())
    }

    async fn teardown(
        &self,
        options: &DeploymentOptions,
        runner: &dyn CommandRunner,
    ) -> E2eResult<()> {
        info!("Deleting Backstage {}", options.release_name);
        runner
            .run(
                "kubectl",
                &[
                    "delete".to_string(),
                    format!("backstage/{}", options.release_name),
                    "--namespace".to_string(),
                    options.namespace.clone(),
                    "--ignore-not-found".to_string(),
                ],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_command() {
        let args = vec!["apply".to_string(), "-f".to_string(), "ns.yaml".to_string()];
        assert_eq!(format_command("kubectl", &args), "kubectl apply -f ns.yaml");
    }

    #[test]
    fn test_deployer_for() {
        assert_eq!(deployer_for(InstallMethod::Helm).method(), InstallMethod::Helm);
        assert_eq!(deployer_for(InstallMethod::Operator).method(), InstallMethod::Operator);
    }

    #[tokio::test]
    async fn test_process_runner_reports_failure() {
        let err = ProcessRunner
            .run("sh", &["-c".to_string(), "echo boom >&2; exit 3".to_string()])
            .await
            .unwrap_err();
        match err {
            E2eError::CommandFailed { status, stderr, .. } => {
                assert_eq!(status, 3);
                assert!(stderr.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_process_runner_captures_stdout() {
        let output = ProcessRunner
            .run("sh", &["-c".to_string(), "echo hello".to_string()])
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "hello");
    }
}
