//! Built-in component catalog

pub mod db;
pub mod network;
pub mod network_client;
pub mod swift_keystone;

use crate::component::Component;
use crate::error::{self, Result};

type Constructor = fn() -> Component;

const CATALOG: &[(&str, Constructor)] = &[
    (network::NAME, network::component),
    (network_client::NAME, network_client::component),
    (swift_keystone::NAME, swift_keystone::component),
];

/// Names of every built-in component
pub fn names() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|(name, _)| *name)
}

/// Build the component registered under `name`
pub fn lookup(name: &str) -> Result<Component> {
    CATALOG
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, build)| build())
        .ok_or_else(|| error::unknown_component(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        for name in names() {
            assert_eq!(lookup(name).unwrap().name, name);
        }
        assert!(lookup("compute").is_err());
    }

    #[test]
    fn test_network_options() {
        let network = lookup("network").unwrap();
        assert!(network.known_options.contains("no-ovs-db-init"));
        assert!(network.known_options.contains("no-ovs-bridge-init"));
        assert!(lookup("network-client").unwrap().known_options.is_empty());
    }
}
