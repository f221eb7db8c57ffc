//! Component lifecycle framework
//!
//! A [`Component`] is data plus small strategy objects: where its source
//! comes from, which config files it lays down and how they are adjusted,
//! which packages it needs, what runs after install and which apps it
//! starts. The three lifecycle roles ([`Installer`], [`Uninstaller`],
//! [`Runtime`]) drive those strategies through fixed phase sequences.
//!
//! Every role runs inside the component's [`tracing::Span`], carried by
//! its [`ComponentContext`].

mod installer;
mod runtime;
mod uninstaller;

pub use installer::Installer;
pub use runtime::{LaunchSpec, Runtime, RuntimeAction};
pub use uninstaller::Uninstaller;

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component as PathPart, Path, PathBuf};
use std::sync::Arc;

use crate::config::StackConfig;
use crate::distro::Distro;
use crate::error::{self, Result};
use crate::packaging::{PackageInfo, load_package_files};
use crate::shell::{CommandTemplate, Executor};
use crate::template::{self, ParamMap};

/// Subdirectory holding the downloaded sources
pub const APP_DIR: &str = "app";
/// Subdirectory holding config files rendered from templates
pub const CONFIG_DIR: &str = "config";
/// Subdirectory holding trace files and app logs
pub const TRACE_DIR: &str = "traces";

/// Everything a lifecycle role needs about one component's run
pub struct ComponentContext {
    pub name: String,
    pub config: Arc<StackConfig>,
    pub distro: Arc<Distro>,
    pub shell: Arc<dyn Executor>,
    pub options: BTreeSet<String>,
    pub component_dir: PathBuf,
    pub app_dir: PathBuf,
    pub cfg_dir: PathBuf,
    pub trace_dir: PathBuf,
    /// Parameters shared by every templating pass of this component
    pub params: ParamMap,
    pub span: tracing::Span,
}

impl ComponentContext {
    pub fn new(
        name: &str,
        config: Arc<StackConfig>,
        distro: Arc<Distro>,
        shell: Arc<dyn Executor>,
        options: BTreeSet<String>,
    ) -> Self {
        let component_dir = config.component_dir(name);
        let app_dir = component_dir.join(APP_DIR);
        let cfg_dir = component_dir.join(CONFIG_DIR);
        let trace_dir = component_dir.join(TRACE_DIR);

        let params = [
            ("COMPONENT", name.to_string()),
            ("ROOT", config.settings.root.display().to_string()),
            ("COMPONENT_DIR", component_dir.display().to_string()),
            ("APP_DIR", app_dir.display().to_string()),
            ("CONFIG_DIR", cfg_dir.display().to_string()),
            ("TRACE_DIR", trace_dir.display().to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            span: tracing::info_span!("component", name = %name),
            name: name.to_string(),
            config,
            distro,
            shell,
            options,
            component_dir,
            app_dir,
            cfg_dir,
            trace_dir,
            params,
        }
    }

    pub fn dry_run(&self) -> bool {
        self.shell.dry_run()
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.contains(option)
    }

    /// Shared parameters overlaid with `extra`
    pub fn params_with(&self, extra: &ParamMap) -> ParamMap {
        let mut params = self.params.clone();
        params.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        params
    }
}

/// Lifecycle phases across all roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Download,
    Configure,
    InstallPackages,
    PostInstall,
    Stop,
    RemovePackages,
    Cleanup,
    Assemble,
    Start,
    Status,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Download => "download",
            Phase::Configure => "configure",
            Phase::InstallPackages => "install-packages",
            Phase::PostInstall => "post-install",
            Phase::Stop => "stop",
            Phase::RemovePackages => "remove-packages",
            Phase::Cleanup => "cleanup",
            Phase::Assemble => "assemble",
            Phase::Start => "start",
            Phase::Status => "status",
        };
        f.write_str(name)
    }
}

/// One lifecycle role bound to a component
pub trait Lifecycle {
    /// Phases this role runs, in order
    fn phases(&self) -> Vec<Phase>;

    fn run_phase(&mut self, phase: Phase) -> Result<()>;

    /// Lines worth showing in the run summary
    fn notes(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Run every phase of `role` in order, stopping at the first failure
///
/// The error names the component and the phase that failed.
pub fn run_lifecycle(ctx: &ComponentContext, role: &mut dyn Lifecycle) -> Result<()> {
    let _entered = ctx.span.enter();
    for phase in role.phases() {
        let span = tracing::info_span!("phase", %phase);
        let _phase = span.enter();
        tracing::debug!("entering phase");
        role.run_phase(phase)
            .map_err(|e| error::phase_failed(&ctx.name, phase.to_string(), e))?;
    }
    Ok(())
}

/// A source checkout into the app dir; `uri` and `branch` are `(section, option)` config keys
#[derive(Debug, Clone)]
pub struct DownloadLocation {
    pub uri: (&'static str, &'static str),
    pub branch: Option<(&'static str, &'static str)>,
    /// Checkout directory relative to the app dir; the app dir itself when absent
    pub subdir: Option<&'static str>,
}

impl DownloadLocation {
    pub fn git(uri_option: &'static str, branch_option: &'static str) -> Self {
        Self {
            uri: ("git", uri_option),
            branch: Some(("git", branch_option)),
            subdir: None,
        }
    }

    pub fn into_subdir(mut self, subdir: &'static str) -> Self {
        self.subdir = Some(subdir);
        self
    }

    /// Checkout directory; never leaves the app dir
    pub fn target_path(&self, ctx: &ComponentContext) -> Result<PathBuf> {
        match self.subdir {
            Some(subdir) => within(&ctx.app_dir, Path::new(subdir), &ctx.name),
            None => Ok(ctx.app_dir.clone()),
        }
    }
}

/// Where a config file's shipped contents come from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// `<templates_dir>/<component>/<name>`
    Template,
    /// A path inside the downloaded sources
    AppDir(PathBuf),
}

/// Where a config file is installed
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigTarget {
    /// `<component>/config/<name>`
    ConfigDir,
    /// A path inside the downloaded sources
    AppDir(PathBuf),
    /// Explicit absolute override outside the component tree
    Absolute(PathBuf),
}

/// A config file a component manages
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub name: String,
    pub source: ConfigSource,
    pub target: ConfigTarget,
}

impl ConfigFile {
    /// Rendered from the component's template into its config dir
    pub fn template(name: &str) -> Self {
        Self {
            name: name.to_string(),
            source: ConfigSource::Template,
            target: ConfigTarget::ConfigDir,
        }
    }

    /// Adjusted in place inside the downloaded sources
    pub fn in_app_dir(name: &str, rel_dir: &str) -> Self {
        let rel = Path::new(rel_dir).join(name);
        Self {
            name: name.to_string(),
            source: ConfigSource::AppDir(rel.clone()),
            target: ConfigTarget::AppDir(rel),
        }
    }

    pub fn source_path(&self, ctx: &ComponentContext) -> Result<PathBuf> {
        match &self.source {
            ConfigSource::Template => Ok(ctx.config.templates_dir().join(&ctx.name).join(&self.name)),
            ConfigSource::AppDir(rel) => within(&ctx.app_dir, rel, &ctx.name),
        }
    }

    /// Install path; relative targets never leave the component tree
    pub fn target_path(&self, ctx: &ComponentContext) -> Result<PathBuf> {
        match &self.target {
            ConfigTarget::ConfigDir => within(&ctx.cfg_dir, Path::new(&self.name), &ctx.name),
            ConfigTarget::AppDir(rel) => within(&ctx.app_dir, rel, &ctx.name),
            ConfigTarget::Absolute(path) if path.is_absolute() => Ok(path.clone()),
            ConfigTarget::Absolute(path) => Err(error::path_outside_component(
                path.display().to_string(),
                &ctx.name,
            )),
        }
    }
}

fn within(base: &Path, rel: &Path, component: &str) -> Result<PathBuf> {
    let escapes = rel
        .components()
        .any(|part| !matches!(part, PathPart::Normal(_) | PathPart::CurDir));
    if escapes {
        return Err(error::path_outside_component(rel.display().to_string(), component));
    }
    Ok(base.join(rel))
}

/// Per-file adjustment applied between loading and writing a config file
pub trait ConfigAdjuster: Send + Sync {
    fn adjust(&self, ctx: &ComponentContext, file: &ConfigFile, contents: &str) -> Result<String>;
}

/// Substitutes the component's parameters into the file
#[derive(Debug, Default, Clone, Copy)]
pub struct ParamAdjuster;

impl ConfigAdjuster for ParamAdjuster {
    fn adjust(&self, ctx: &ComponentContext, file: &ConfigFile, contents: &str) -> Result<String> {
        tracing::debug!(file = %file.name, params = ?template::find_params(contents), "substituting");
        template::replace(contents, &ctx.params, false)
    }
}

/// Supplies the packages a component installs
pub trait PackageProvider: Send + Sync {
    /// OS packages, in install order
    fn packages(&self, ctx: &ComponentContext) -> Result<Vec<PackageInfo>>;

    /// Python packages, in install order
    fn pips(&self, _ctx: &ComponentContext) -> Result<Vec<PackageInfo>> {
        Ok(Vec::new())
    }
}

/// Packages declared inline plus YAML package list files
#[derive(Debug, Default, Clone)]
pub struct DeclaredPackages {
    pub packages: Vec<PackageInfo>,
    /// List files under the stack's packages dir, loaded after `packages`
    pub files: Vec<&'static str>,
    pub pips: Vec<PackageInfo>,
}

impl PackageProvider for DeclaredPackages {
    fn packages(&self, ctx: &ComponentContext) -> Result<Vec<PackageInfo>> {
        let mut packages = self.packages.clone();
        packages.extend(load_package_files(&ctx.config.packages_dir(), &self.files)?);
        Ok(packages)
    }

    fn pips(&self, _ctx: &ComponentContext) -> Result<Vec<PackageInfo>> {
        Ok(self.pips.clone())
    }
}

/// One runnable program of a component
#[derive(Debug, Clone, PartialEq)]
pub struct AppDescriptor {
    pub name: String,
    pub path: PathBuf,
    /// Argument templates
    pub args: Vec<String>,
    /// Overrides on top of the component parameters
    pub params: ParamMap,
}

/// Supplies the apps a component starts
pub trait AppProvider: Send + Sync {
    fn apps(&self, ctx: &ComponentContext) -> Result<Vec<AppDescriptor>>;
}

/// Components that start nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoApps;

impl AppProvider for NoApps {
    fn apps(&self, _ctx: &ComponentContext) -> Result<Vec<AppDescriptor>> {
        Ok(Vec::new())
    }
}

/// Commands and parameters for one post-install step
#[derive(Debug, Default, Clone)]
pub struct StepPlan {
    pub commands: Vec<CommandTemplate>,
    pub params: ParamMap,
}

/// Builds a post-install step's plan from the live context
pub type StepBuilder = fn(&ComponentContext) -> Result<StepPlan>;

/// A named post-install step, skipped when its option flag is set
#[derive(Debug, Clone)]
pub struct PostInstallStep {
    pub name: &'static str,
    pub skip_option: Option<&'static str>,
    pub build: StepBuilder,
}

/// Extra component-wide parameters derived from the configuration
pub type ParamBuilder = fn(&StackConfig) -> Result<ParamMap>;

/// An installable and runnable service unit
pub struct Component {
    pub name: &'static str,
    pub description: &'static str,
    pub known_options: BTreeSet<&'static str>,
    pub downloads: Vec<DownloadLocation>,
    pub config_files: Vec<ConfigFile>,
    pub adjuster: Box<dyn ConfigAdjuster>,
    pub packages: Box<dyn PackageProvider>,
    pub post_install: Vec<PostInstallStep>,
    pub apps: Box<dyn AppProvider>,
    /// Run `setup.py develop` from the app dir after packages
    pub python_develop: bool,
    pub params: Option<ParamBuilder>,
}

impl Component {
    /// An empty component to be filled in with struct update syntax
    pub fn named(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            known_options: BTreeSet::new(),
            downloads: Vec::new(),
            config_files: Vec::new(),
            adjuster: Box::new(ParamAdjuster),
            packages: Box::new(DeclaredPackages::default()),
            post_install: Vec::new(),
            apps: Box::new(NoApps),
            python_develop: false,
            params: None,
        }
    }

    /// Reject option flags the component does not know
    pub fn validate_options(&self, options: &BTreeSet<String>) -> Result<()> {
        match options.iter().find(|o| !self.known_options.contains(o.as_str())) {
            Some(unknown) => Err(error::unknown_option(self.name, unknown)),
            None => Ok(()),
        }
    }

    /// Build the context for one run of this component
    pub fn context(
        &self,
        config: Arc<StackConfig>,
        distro: Arc<Distro>,
        shell: Arc<dyn Executor>,
    ) -> Result<ComponentContext> {
        let options = config.options_for(self.name);
        self.validate_options(&options)?;
        let extra = match self.params {
            Some(build) => build(&config)?,
            None => ParamMap::new(),
        };
        let mut ctx = ComponentContext::new(self.name, config, distro, shell, options);
        ctx.params.extend(extra);
        Ok(ctx)
    }
}
