//! # CRD Registry
//!
//! Spec types of the CRDs this provider renders manifests for, one module per API group
//! and version.

pub mod canaries_flanksource_com_v1;

use crate::datasource::{ManifestDataSource, ManifestSource};
use crate::error::Error;

/// Builds one data source per registered CRD.
pub fn manifest_data_sources() -> Result<Vec<Box<dyn ManifestSource>>, Error> {
    Ok(vec![
        Box::new(ManifestDataSource::<canaries_flanksource_com_v1::CanarySpec>::new()?),
        Box::new(ManifestDataSource::<canaries_flanksource_com_v1::TopologySpec>::new()?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_crd_builds() {
        let sources = manifest_data_sources().unwrap();
        let kinds: Vec<&str> = sources.iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, vec!["Canary", "Topology"]);
        assert!(sources.iter().all(|s| s.api_version() == "canaries.flanksource.com/v1"));
    }
}
