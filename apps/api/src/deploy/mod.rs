// Publishing: zip a materialized site, push it to the hosting API, poll until it settles.

pub mod archive;
pub mod client;
pub mod handlers;
pub mod orchestrator;

pub use client::{HostingApi, NetlifyClient};
pub use orchestrator::{DeployError, DeployReport, DeploySettings, DeployState, Deployer};
