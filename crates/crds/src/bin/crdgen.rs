//! Prints the MCPServer CustomResourceDefinition as YAML.

use crds::MCPServer;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&MCPServer::crd())?);
    Ok(())
}
