//! Deployment lifecycle: render, deploy, tear down

use devhub_e2e_common::GatingDecision;
use tracing::info;

use crate::deployer::{deployer_for, CommandRunner, Deployer};
use crate::error::E2eResult;
use crate::options::DeploymentOptions;
use crate::render::{render_deployment, RenderedDeployment};

/// One application instance under test
pub struct Deployment {
    options: DeploymentOptions,
    gating: GatingDecision,
    deployer: Box<dyn Deployer>,
    rendered: Option<RenderedDeployment>,
}

impl Deployment {
    /// Create a deployment; `gating` controls plugin metadata handling when rendering
    pub fn new(options: DeploymentOptions, gating: GatingDecision) -> E2eResult<Self> {
        options.validate()?;
        let deployer = deployer_for(options.method);
        Ok(Self {
            options,
            gating,
            deployer,
            rendered: None,
        })
    }

    pub fn options(&self) -> &DeploymentOptions {
        &self.options
    }

    pub fn gating(&self) -> &GatingDecision {
        &self.gating
    }

    pub fn rendered(&self) -> Option<&RenderedDeployment> {
        self.rendered.as_ref()
    }

    /// Merge configuration and write it to the work directory
    pub fn render(&mut self) -> E2eResult<&RenderedDeployment> {
        let rendered = render_deployment(&self.options, &self.gating)?;
        Ok(self.rendered.insert(rendered))
    }

    /// Render if needed, then install
    pub async fn deploy(&mut self, runner: &dyn CommandRunner) -> E2eResult<()> {
        let rendered = match self.rendered.take() {
            Some(rendered) => rendered,
            None => render_deployment(&self.options, &self.gating)?,
        };
        let rendered = self.rendered.insert(rendered);

        self.deployer.deploy(rendered, runner).await?;
        info!(
            "Deployed {} into namespace {}",
            self.options.release_name, self.options.namespace
        );
        Ok(())
    }

    /// Remove the release named by the options; nothing needs to be rendered
    pub async fn teardown(&self, runner: &dyn CommandRunner) -> E2eResult<()> {
        self.deployer.teardown(&self.options, runner).await
    }
}
