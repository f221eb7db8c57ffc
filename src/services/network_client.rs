//! Network client library, installed from source in develop mode

use crate::component::{Component, DownloadLocation};

pub const NAME: &str = "network-client";

pub fn component() -> Component {
    Component {
        downloads: vec![DownloadLocation::git("quantum_client_repo", "quantum_client_branch")],
        python_develop: true,
        ..Component::named(NAME, "Python client for the network service")
    }
}
