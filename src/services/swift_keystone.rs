//! Identity middleware for the object store

use crate::component::{Component, DeclaredPackages, DownloadLocation};

pub const NAME: &str = "swift-keystone";

/// Package lists under the stack's packages dir
const PACKAGE_FILES: &[&str] = &["general.yaml", "swift.yaml"];

pub fn component() -> Component {
    Component {
        downloads: vec![DownloadLocation::git("swift_keystone_repo", "swift_keystone_branch")],
        packages: Box::new(DeclaredPackages {
            files: PACKAGE_FILES.to_vec(),
            ..DeclaredPackages::default()
        }),
        python_develop: true,
        ..Component::named(NAME, "Keystone authentication middleware for swift")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::component::{Installer, Lifecycle, Phase};
    use crate::distro::Distro;
    use crate::test_fixtures::{RecordingShell, stack_config};
    use tempfile::TempDir;

    #[test]
    fn test_packages_from_lists() {
        let temp = TempDir::new().unwrap();
        let packages = temp.path().join("packages");
        std::fs::create_dir_all(&packages).unwrap();
        std::fs::write(packages.join("general.yaml"), "- name: python-setuptools\n").unwrap();
        std::fs::write(
            packages.join("swift.yaml"),
            "- name: xfsprogs\n- name: memcached\n  version: '1.4.5'\n",
        )
        .unwrap();

        let shell = Arc::new(RecordingShell::new());
        let component = component();
        let ctx = component
            .context(
                Arc::new(stack_config(temp.path(), "")),
                Arc::new(Distro::by_name("rhel-6").unwrap()),
                shell.clone(),
            )
            .unwrap();
        Installer::new(&component, &ctx)
            .run_phase(Phase::InstallPackages)
            .unwrap();
        assert_eq!(
            shell.commands(),
            vec![
                "yum install -y -t python-setuptools",
                "yum install -y -t xfsprogs",
                "yum install -y -t memcached-1.4.5",
            ]
        );
    }
}
