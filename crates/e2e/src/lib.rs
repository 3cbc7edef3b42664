//! DevHub E2E Deployment Harness
//!
//! Prepares and installs an application instance for end-to-end tests:
//! - Merges configuration layers (package defaults, auth provider, user project)
//! - Generates or augments the dynamic plugins list from plugin metadata
//! - Renders ConfigMaps, Secrets and Helm values / operator resources
//! - Installs through Helm or the operator via `kubectl`/`helm`
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Deployment                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  render() -> RenderedDeployment                             │
//! │    ├── app-config      defaults -> auth -> user             │
//! │    ├── dynamic-plugins defaults -> auth -> user | metadata  │
//! │    ├── secrets         defaults -> auth -> user (${VAR})    │
//! │    └── manifests/      namespace, ConfigMaps, Secret, CR    │
//! │  deploy(runner)   -> HelmDeployer | OperatorDeployer        │
//! │  teardown(runner)                                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod deployer;
pub mod deployment;
pub mod error;
pub mod layers;
pub mod manifests;
pub mod options;
pub mod render;

pub use deployer::{deployer_for, CommandOutput, CommandRunner, Deployer, ProcessRunner};
pub use deployment::Deployment;
pub use error::{E2eError, E2eResult};
pub use options::{AuthProvider, DeploymentOptions, InstallMethod};
pub use render::{render_deployment, render_deployment_with_env, RenderedDeployment};
