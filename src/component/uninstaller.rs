//! Uninstall role: stop, remove packages, clean up
//!
//! Everything is driven by the install trace, so only what install
//! actually did is undone. Config files edited since install are kept,
//! along with the directories holding them.

use std::path::{Path, PathBuf};

use super::runtime::stop_apps;
use super::{ComponentContext, Lifecycle, Phase};
use crate::error::{self, Result};
use crate::hash;
use crate::packaging::{self, RemoveOutcome};
use crate::shell::ExecRequest;
use crate::trace::{INSTALL_TRACE, PackageSource, TraceEntry, read_trace, remove_trace};

pub struct Uninstaller<'a> {
    ctx: &'a ComponentContext,
    keep_packages: bool,
    notes: Vec<String>,
}

impl<'a> Uninstaller<'a> {
    pub fn new(ctx: &'a ComponentContext) -> Self {
        Self {
            ctx,
            keep_packages: ctx.config.settings.keep_packages,
            notes: Vec::new(),
        }
    }

    /// Leave every package in place regardless of the configuration
    pub fn keep_packages(mut self, keep: bool) -> Self {
        self.keep_packages |= keep;
        self
    }

    fn trace_path(&self) -> PathBuf {
        self.ctx.trace_dir.join(INSTALL_TRACE)
    }

    fn stop(&mut self) -> Result<()> {
        self.notes.extend(stop_apps(self.ctx)?);
        Ok(())
    }

    fn remove_packages(&mut self) -> Result<()> {
        let entries = read_trace(&self.trace_path())?;

        for entry in &entries {
            if let TraceEntry::PythonDeveloped { path } = entry {
                let python = self.ctx.distro.get_command("python")?;
                let request = ExecRequest::new([python, "setup.py", "develop", "--uninstall"])
                    .as_root()
                    .cwd(path)
                    .tolerate_failure();
                self.ctx.shell.execute(&request)?;
            }
        }

        if self.keep_packages {
            tracing::info!("keeping packages");
            self.notes.push("packages kept".to_string());
            return Ok(());
        }

        let os = packaging::os_packager(&self.ctx.distro, self.ctx.shell.clone())?;
        let pip = packaging::pip_packager(&self.ctx.distro, self.ctx.shell.clone())?;
        let mut removed = 0usize;
        // Reverse install order; pips were installed after OS packages.
        for entry in entries.iter().rev() {
            let TraceEntry::PackageInstalled { source, package } = entry else {
                continue;
            };
            let packager = match source {
                PackageSource::Os => &os,
                PackageSource::Pip => &pip,
            };
            match packager.remove(package)? {
                RemoveOutcome::Removed => removed += 1,
                RemoveOutcome::AlreadyAbsent => {
                    tracing::info!(package = %package.name, "already removed");
                }
                RemoveOutcome::Kept => {
                    tracing::debug!(package = %package.name, "kept");
                }
            }
        }
        tracing::info!(removed, "packages removed");
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        let entries = read_trace(&self.trace_path())?;
        let mut kept: Vec<PathBuf> = Vec::new();

        for entry in &entries {
            let TraceEntry::ConfigWritten { path, hash: recorded, .. } = entry else {
                continue;
            };
            if !hash::is_unchanged(path, recorded)? {
                tracing::warn!(path = %path.display(), "config file modified since install, keeping it");
                self.notes.push(format!("kept modified {}", path.display()));
                kept.push(path.clone());
                continue;
            }
            self.remove_file(path)?;
        }

        let mut dirs: Vec<&Path> = entries
            .iter()
            .filter_map(|entry| match entry {
                TraceEntry::DirCreated { path } => Some(path.as_path()),
                _ => None,
            })
            .collect();
        dirs.sort_by_key(|dir| std::cmp::Reverse(dir.components().count()));

        if !self.ctx.dry_run() {
            remove_trace(&self.trace_path())?;
        }
        for dir in dirs {
            if kept.iter().any(|file| file.starts_with(dir)) {
                tracing::debug!(dir = %dir.display(), "holds kept files, not removing");
                continue;
            }
            self.remove_dir(dir)?;
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        if self.ctx.dry_run() {
            println!("[DRY RUN] Would remove file: {}", path.display());
            return Ok(());
        }
        std::fs::remove_file(path)
            .map_err(|e| error::file_write_failed(path.display().to_string(), e.to_string()))
    }

    fn remove_dir(&self, dir: &Path) -> Result<()> {
        if !dir.exists() {
            return Ok(());
        }
        if self.ctx.dry_run() {
            println!("[DRY RUN] Would remove directory: {}", dir.display());
            return Ok(());
        }
        tracing::debug!(dir = %dir.display(), "removing");
        std::fs::remove_dir_all(dir)
            .map_err(|e| error::file_write_failed(dir.display().to_string(), e.to_string()))
    }
}

impl Lifecycle for Uninstaller<'_> {
    fn phases(&self) -> Vec<Phase> {
        vec![Phase::Stop, Phase::RemovePackages, Phase::Cleanup]
    }

    fn run_phase(&mut self, phase: Phase) -> Result<()> {
        match phase {
            Phase::Stop => self.stop(),
            Phase::RemovePackages => self.remove_packages(),
            Phase::Cleanup => self.cleanup(),
            other => Err(error::phase_not_supported("uninstaller", other.to_string())),
        }
    }

    fn notes(&self) -> Vec<String> {
        self.notes.clone()
    }
}
