//! Install role: download, configure, install packages, post-install

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use super::{Component, ComponentContext, Lifecycle, Phase};
use crate::error::{self, Result};
use crate::git;
use crate::hash;
use crate::ini;
use crate::packaging::{self, PackageInfo, Packager};
use crate::shell::{ExecRequest, execute_template};
use crate::trace::{INSTALL_TRACE, PackageSource, TraceEntry, TraceWriter};

pub struct Installer<'a> {
    component: &'a Component,
    ctx: &'a ComponentContext,
    trace: TraceWriter,
    notes: Vec<String>,
}

impl<'a> Installer<'a> {
    pub fn new(component: &'a Component, ctx: &'a ComponentContext) -> Self {
        Self {
            component,
            ctx,
            trace: TraceWriter::new(&ctx.trace_dir, INSTALL_TRACE, ctx.dry_run()),
            notes: Vec::new(),
        }
    }

    /// Create `dir` and any missing parents, recording each one created
    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        let missing: Vec<&Path> = dir.ancestors().take_while(|p| !p.exists()).collect();
        if missing.is_empty() {
            return Ok(());
        }
        if self.ctx.dry_run() {
            println!("[DRY RUN] Would create directory: {}", dir.display());
            return Ok(());
        }
        std::fs::create_dir_all(dir)
            .map_err(|e| error::file_write_failed(dir.display().to_string(), e.to_string()))?;
        for created in missing.into_iter().rev() {
            self.trace.record(&TraceEntry::DirCreated {
                path: created.to_path_buf(),
            })?;
        }
        Ok(())
    }

    fn download(&mut self) -> Result<()> {
        self.ensure_dir(&self.ctx.trace_dir)?;
        self.ensure_dir(&self.ctx.app_dir)?;
        let mut targets = BTreeSet::new();
        for location in &self.component.downloads {
            // Resolved now, not at construction, so late config edits apply.
            let (section, option) = location.uri;
            let uri = self.ctx.config.require(section, option)?.to_string();
            let branch = location
                .branch
                .and_then(|(section, option)| self.ctx.config.get(section, option))
                .map(String::from);
            let target = location.target_path(self.ctx)?;
            if !targets.insert(target.clone()) {
                return Err(error::duplicate_download_target(
                    target.display().to_string(),
                    &self.ctx.name,
                ));
            }

            if self.ctx.dry_run() {
                println!(
                    "[DRY RUN] Would clone {uri} ({}) into {}",
                    branch.as_deref().unwrap_or("default branch"),
                    target.display()
                );
                continue;
            }
            if git::download(&uri, branch.as_deref(), &target)? == git::Fetched::Cloned {
                self.trace.record(&TraceEntry::Downloaded { uri, branch, target })?;
            }
        }
        Ok(())
    }

    fn configure(&mut self) -> Result<()> {
        for file in &self.component.config_files {
            let source = file.source_path(self.ctx)?;
            let target = file.target_path(self.ctx)?;
            if !source.is_file() {
                if self.ctx.dry_run() {
                    tracing::debug!(source = %source.display(), "source not available in dry run");
                    println!("[DRY RUN] Would configure {} -> {}", file.name, target.display());
                    continue;
                }
                return Err(crate::error::StackError::FileNotFound {
                    path: source.display().to_string(),
                });
            }

            let contents = std::fs::read_to_string(&source)
                .map_err(|e| error::file_read_failed(source.display().to_string(), e.to_string()))?;
            let adjusted = self.component.adjuster.adjust(self.ctx, file, &contents)?;
            let output = ini::add_header(&file.name, &adjusted);

            if self.ctx.dry_run() {
                println!("[DRY RUN] Would write {}", target.display());
                continue;
            }
            if let Some(parent) = target.parent() {
                self.ensure_dir(parent)?;
            }
            write_atomic(&target, &output)?;
            tracing::info!(file = %file.name, target = %target.display(), "configured");
            self.trace.record_once(&TraceEntry::ConfigWritten {
                name: file.name.clone(),
                path: target,
                hash: hash::hash_bytes(output.as_bytes()),
            })?;
        }
        Ok(())
    }

    fn install_all(
        &self,
        packager: &Packager,
        packages: &[PackageInfo],
        source: PackageSource,
    ) -> Result<()> {
        for pkg in packages {
            packager.install(pkg)?;
            self.trace.record_once(&TraceEntry::PackageInstalled {
                source,
                package: pkg.clone(),
            })?;
        }
        Ok(())
    }

    fn install_packages(&mut self) -> Result<()> {
        let provider = &self.component.packages;
        let packages = provider.packages(self.ctx)?;
        if !packages.is_empty() {
            let packager = packaging::os_packager(&self.ctx.distro, self.ctx.shell.clone())?;
            self.install_all(&packager, &packages, PackageSource::Os)?;
        }
        let pips = provider.pips(self.ctx)?;
        if !pips.is_empty() {
            let packager = packaging::pip_packager(&self.ctx.distro, self.ctx.shell.clone())?;
            self.install_all(&packager, &pips, PackageSource::Pip)?;
        }
        tracing::info!(packages = packages.len(), pips = pips.len(), "packages installed");
        Ok(())
    }

    fn post_install(&mut self) -> Result<()> {
        if self.component.python_develop {
            let python = self.ctx.distro.get_command("python")?;
            let request = ExecRequest::new([python, "setup.py", "develop"])
                .as_root()
                .cwd(&self.ctx.app_dir);
            self.ctx.shell.execute(&request)?;
            self.trace.record_once(&TraceEntry::PythonDeveloped {
                path: self.ctx.app_dir.clone(),
            })?;
        }

        for step in &self.component.post_install {
            if let Some(flag) = step.skip_option.filter(|flag| self.ctx.has_option(flag)) {
                tracing::info!(step = step.name, option = flag, "skipping post-install step");
                self.notes.push(format!("skipped {} ({flag})", step.name));
                continue;
            }
            let plan = (step.build)(self.ctx)?;
            if plan.commands.is_empty() {
                continue;
            }
            tracing::info!(step = step.name, "running post-install step");
            let params = self.ctx.params_with(&plan.params);
            execute_template(self.ctx.shell.as_ref(), &plan.commands, &params, false)?;
        }
        Ok(())
    }
}

impl Lifecycle for Installer<'_> {
    fn phases(&self) -> Vec<Phase> {
        vec![
            Phase::Download,
            Phase::Configure,
            Phase::InstallPackages,
            Phase::PostInstall,
        ]
    }

    fn run_phase(&mut self, phase: Phase) -> Result<()> {
        match phase {
            Phase::Download => self.download(),
            Phase::Configure => self.configure(),
            Phase::InstallPackages => self.install_packages(),
            Phase::PostInstall => self.post_install(),
            other => Err(error::phase_not_supported("installer", other.to_string())),
        }
    }

    fn notes(&self) -> Vec<String> {
        self.notes.clone()
    }
}

/// Write via a temp file in the target directory, then rename into place
fn write_atomic(target: &Path, contents: &str) -> Result<()> {
    let fail = |e: &dyn std::fmt::Display| {
        error::file_write_failed(target.display().to_string(), e.to_string())
    };
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| fail(&e))?;
    tmp.write_all(contents.as_bytes()).map_err(|e| fail(&e))?;
    tmp.persist(target).map_err(|e| fail(&e.error))?;
    Ok(())
}
