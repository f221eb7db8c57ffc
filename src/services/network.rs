//! Network service (quantum with the openvswitch plugin)

use super::db;
use crate::component::{
    AppDescriptor, AppProvider, Component, ComponentContext, ConfigAdjuster, ConfigFile,
    DeclaredPackages, DownloadLocation, ParamAdjuster, PostInstallStep, StepPlan,
};
use crate::config::StackConfig;
use crate::error::Result;
use crate::ini::{IniDocument, Presence};
use crate::packaging::PackageInfo;
use crate::shell::CommandTemplate;
use crate::template::ParamMap;

pub const NAME: &str = "network";

const SECTION: &str = "quantum";
const VSWITCH_PLUGIN: &str = "openvswitch";
const VSWITCH_PROVIDER: &str = "quantum.plugins.openvswitch.ovs_quantum_plugin.OVSQuantumPlugin";

const PLUGIN_CONF: &str = "plugins.ini";
const PLUGIN_LOC: &str = "etc";
const AGENT_CONF: &str = "ovs_quantum_plugin.ini";
const AGENT_LOC: &str = "etc/quantum/plugins/openvswitch";
const AGENT_BIN_LOC: &str = "quantum/plugins/openvswitch/agent";
const QUANTUM_CONF: &str = "quantum.conf";

const APP_SERVER: &str = "quantum-server";
const APP_AGENT: &str = "ovs_quantum_agent.py";

/// Dropped and recreated by the db-init step
const DB_NAME: &str = "ovs_quantum";

const NO_DB_INIT: &str = "no-ovs-db-init";
const NO_BRIDGE_INIT: &str = "no-ovs-bridge-init";

fn vswitch_enabled(config: &StackConfig) -> bool {
    config.get_defaulted(SECTION, "q_plugin", VSWITCH_PLUGIN) == VSWITCH_PLUGIN
}

pub fn component() -> Component {
    Component {
        known_options: [NO_DB_INIT, NO_BRIDGE_INIT].into_iter().collect(),
        downloads: vec![DownloadLocation::git("quantum_repo", "quantum_branch")],
        config_files: vec![
            ConfigFile::in_app_dir(PLUGIN_CONF, PLUGIN_LOC),
            ConfigFile::in_app_dir(AGENT_CONF, AGENT_LOC),
        ],
        adjuster: Box::new(NetworkAdjuster),
        packages: Box::new(DeclaredPackages {
            packages: vec![PackageInfo::new("openvswitch").keep()],
            files: vec!["quantum.yaml"],
            pips: Vec::new(),
        }),
        post_install: vec![
            PostInstallStep {
                name: "db-init",
                skip_option: Some(NO_DB_INIT),
                build: db_init,
            },
            PostInstallStep {
                name: "bridge-init",
                skip_option: Some(NO_BRIDGE_INIT),
                build: bridge_init,
            },
        ],
        apps: Box::new(NetworkApps),
        ..Component::named(NAME, "Network service with the openvswitch plugin")
    }
}

/// Points the plugin provider and the agent's database at this stack
struct NetworkAdjuster;

impl ConfigAdjuster for NetworkAdjuster {
    fn adjust(&self, ctx: &ComponentContext, file: &ConfigFile, contents: &str) -> Result<String> {
        if !vswitch_enabled(&ctx.config) {
            return ParamAdjuster.adjust(ctx, file, contents);
        }
        let (section, key, value, presence) = match file.name.as_str() {
            PLUGIN_CONF => ("PLUGIN", "provider", VSWITCH_PROVIDER.to_string(), Presence::Always),
            AGENT_CONF => (
                "DATABASE",
                "sql_connection",
                db::fetch_dbdsn(&ctx.config, DB_NAME),
                Presence::OnlyIfPresent,
            ),
            _ => return ParamAdjuster.adjust(ctx, file, contents),
        };

        let mut doc = IniDocument::parse(contents, &file.name)?;
        if doc.set_if_divergent(section, key, &value, presence) {
            tracing::info!(file = %file.name, section, key, "adjusted");
            Ok(doc.to_text())
        } else {
            Ok(contents.to_string())
        }
    }
}

fn db_init(ctx: &ComponentContext) -> Result<StepPlan> {
    if !vswitch_enabled(&ctx.config) {
        return Ok(StepPlan::default());
    }
    tracing::info!(db = DB_NAME, "resetting database");
    let drop = db::drop_db(&ctx.config, &ctx.distro, DB_NAME)?;
    let create = db::create_db(&ctx.config, &ctx.distro, DB_NAME)?;
    let mut plan = drop;
    plan.commands.extend(create.commands);
    Ok(plan)
}

fn bridge_init(ctx: &ComponentContext) -> Result<StepPlan> {
    if !vswitch_enabled(&ctx.config) {
        return Ok(StepPlan::default());
    }
    let bridge = ctx.config.get_defaulted(SECTION, "ovs_bridge", "br-int");
    let external_id = ctx
        .config
        .get_defaulted(SECTION, "ovs_bridge_external_name", &bridge);
    tracing::info!(%bridge, "setting up ovs bridge");

    let commands = vec![
        CommandTemplate::new(["ovs-vsctl", "--no-wait", "--", "--if-exists", "del-br", "%OVS_BRIDGE%"]),
        CommandTemplate::new(["ovs-vsctl", "--no-wait", "add-br", "%OVS_BRIDGE%"]),
        CommandTemplate::new([
            "ovs-vsctl",
            "--no-wait",
            "br-set-external-id",
            "%OVS_BRIDGE%",
            "bridge-id",
            "%OVS_EXTERNAL_ID%",
        ]),
    ]
    .into_iter()
    .map(CommandTemplate::as_root)
    .collect();

    let params: ParamMap = [
        ("OVS_BRIDGE".to_string(), bridge),
        ("OVS_EXTERNAL_ID".to_string(), external_id),
    ]
    .into_iter()
    .collect();
    Ok(StepPlan { commands, params })
}

struct NetworkApps;

impl AppProvider for NetworkApps {
    fn apps(&self, ctx: &ComponentContext) -> Result<Vec<AppDescriptor>> {
        if !vswitch_enabled(&ctx.config) {
            return Ok(Vec::new());
        }
        let param = |key: &str, value: std::path::PathBuf| -> ParamMap {
            [(key.to_string(), value.display().to_string())].into_iter().collect()
        };
        Ok(vec![
            AppDescriptor {
                name: APP_SERVER.to_string(),
                path: ctx.app_dir.join("bin").join(APP_SERVER),
                args: vec!["%QUANTUM_CONFIG_FILE%".to_string()],
                params: param("QUANTUM_CONFIG_FILE", ctx.app_dir.join("etc").join(QUANTUM_CONF)),
            },
            AppDescriptor {
                name: APP_AGENT.to_string(),
                path: ctx.app_dir.join(AGENT_BIN_LOC).join(APP_AGENT),
                args: vec!["%OVS_CONFIG_FILE%".to_string(), "-v".to_string()],
                params: param("OVS_CONFIG_FILE", ctx.app_dir.join(AGENT_LOC).join(AGENT_CONF)),
            },
        ])
    }
}
