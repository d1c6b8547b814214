//! Plugin catalog and lifecycle.
//!
//! # Responsibility
//! - Keep the catalog of plugin factories and the installed instances.
//! - Drive install/enable/disable/uninstall/update and their events.
//!
//! # Invariants
//! - Plugin ids are unique among installed plugins.
//! - Status moves inactive <-> active, or to error when activation fails.
//! - A plugin is enabled only while all of its dependencies are active.
//! - Contributions are registered only after a successful `activate`.
//! - Rejected transitions emit no plugin event and change nothing.

use crate::command::{CommandRegistry, KeybindingRegistry};
use crate::error::{KernelError, KernelResult};
use crate::event::{EventBus, KernelEvent};
use crate::extension::manifest::PluginManifest;
use crate::extension::plugin::{ActivationContext, Plugin, PluginFactory};
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginStatus {
    Inactive,
    Active,
    Error,
}

impl PluginStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Error => "error",
        }
    }
}

/// Read-only snapshot of an installed plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub manifest: PluginManifest,
    pub status: PluginStatus,
    pub commands: Vec<String>,
    pub keybindings: Vec<String>,
    pub last_error: Option<String>,
}

struct InstalledPlugin {
    instance: Box<dyn Plugin>,
    status: PluginStatus,
    commands: Vec<String>,
    keybindings: Vec<String>,
    last_error: Option<String>,
}

impl InstalledPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo {
            manifest: self.instance.manifest().clone(),
            status: self.status,
            commands: self.commands.clone(),
            keybindings: self.keybindings.clone(),
            last_error: self.last_error.clone(),
        }
    }

    fn version(&self) -> String {
        self.instance.manifest().version.clone()
    }
}

/// Registries a lifecycle transition writes contributions into.
pub struct Contributions<'a> {
    pub commands: &'a mut CommandRegistry,
    pub keybindings: &'a mut KeybindingRegistry,
}

pub struct PluginManager {
    catalog: BTreeMap<String, PluginFactory>,
    installed: BTreeMap<String, InstalledPlugin>,
    bus: EventBus,
}

impl PluginManager {
    pub fn new(bus: EventBus) -> Self {
        Self {
            catalog: BTreeMap::new(),
            installed: BTreeMap::new(),
            bus,
        }
    }

    /// Adds or replaces a catalog entry; replacing makes a newer version available to `update`.
    pub fn register_factory<F>(&mut self, id: &str, factory: F)
    where
        F: Fn() -> Box<dyn Plugin> + 'static,
    {
        self.catalog.insert(id.to_string(), Rc::new(factory));
    }

    pub fn catalog_ids(&self) -> Vec<&str> {
        self.catalog.keys().map(String::as_str).collect()
    }

    pub fn install(&mut self, id: &str) -> KernelResult<PluginInfo> {
        if self.installed.contains_key(id) {
            return Err(KernelError::conflict(format!("plugin already installed: {id}")));
        }
        let instance = self.instantiate(id)?;

        self.bus.emit(KernelEvent::PluginInstalling {
            plugin_id: id.to_string(),
        });
        let plugin = InstalledPlugin {
            instance,
            status: PluginStatus::Inactive,
            commands: Vec::new(),
            keybindings: Vec::new(),
            last_error: None,
        };
        let info = plugin.info();
        self.installed.insert(id.to_string(), plugin);

        info!("event=plugin_install module=plugin status=ok plugin_id={id}");
        self.bus.emit(KernelEvent::PluginInstalled {
            plugin_id: id.to_string(),
            version: info.manifest.version.clone(),
        });
        Ok(info)
    }

    /// inactive -> active, or -> error when `activate` fails.
    pub fn enable(&mut self, id: &str, registries: Contributions<'_>) -> KernelResult<()> {
        let plugin = self.installed_plugin(id)?;
        if plugin.status != PluginStatus::Inactive {
            return Err(KernelError::state("enablePlugin", plugin.status.as_str()));
        }
        self.check_dependencies(id)?;
        self.activate(id, registries)?;
        self.bus.emit(KernelEvent::PluginEnabled {
            plugin_id: id.to_string(),
        });
        Ok(())
    }

    /// active -> inactive.
    pub fn disable(&mut self, id: &str, registries: Contributions<'_>) -> KernelResult<()> {
        let plugin = self.installed_plugin(id)?;
        if plugin.status != PluginStatus::Active {
            return Err(KernelError::state("disablePlugin", plugin.status.as_str()));
        }
        self.check_no_active_dependents(id)?;
        self.deactivate(id, registries);
        Ok(())
    }

    /// Removes an installed plugin, deactivating it first when active.
    pub fn uninstall(&mut self, id: &str, registries: Contributions<'_>) -> KernelResult<()> {
        let plugin = self.installed_plugin(id)?;
        let active = plugin.status == PluginStatus::Active;
        if active {
            self.check_no_active_dependents(id)?;
        }

        self.bus.emit(KernelEvent::PluginUninstalling {
            plugin_id: id.to_string(),
        });
        if active {
            self.deactivate(id, registries);
        }
        self.installed.remove(id);

        info!("event=plugin_uninstall module=plugin status=ok plugin_id={id}");
        self.bus.emit(KernelEvent::PluginUninstalled {
            plugin_id: id.to_string(),
        });
        Ok(())
    }

    /// Swaps in the catalog's current build. Returns `false` when the version is unchanged.
    pub fn update(&mut self, id: &str, registries: Contributions<'_>) -> KernelResult<bool> {
        let current = self.installed_plugin(id)?.version();
        let instance = self.instantiate(id)?;
        let version = instance.manifest().version.clone();
        if version == current {
            return Ok(false);
        }

        self.bus.emit(KernelEvent::PluginUpdating {
            plugin_id: id.to_string(),
        });
        let Contributions {
            commands,
            keybindings,
        } = registries;
        let was_active = self
            .installed
            .get(id)
            .is_some_and(|plugin| plugin.status == PluginStatus::Active);
        if was_active {
            self.deactivate_quietly(id, commands, keybindings);
        }
        if let Some(plugin) = self.installed.get_mut(id) {
            plugin.instance = instance;
            plugin.status = PluginStatus::Inactive;
            plugin.last_error = None;
        }
        let reactivated = if was_active {
            self.activate(
                id,
                Contributions {
                    commands,
                    keybindings,
                },
            )
        } else {
            Ok(())
        };

        self.bus.emit(KernelEvent::PluginUpdated {
            plugin_id: id.to_string(),
            version,
        });
        reactivated.map(|()| true)
    }

    /// Deactivates every active plugin, dependents before their dependencies,
    /// then forgets all installed plugins.
    pub(crate) fn shutdown(&mut self, registries: Contributions<'_>) {
        let Contributions {
            commands,
            keybindings,
        } = registries;
        while let Some(id) = self.next_leaf_active() {
            self.deactivate(
                &id,
                Contributions {
                    commands: &mut *commands,
                    keybindings: &mut *keybindings,
                },
            );
        }
        self.installed.clear();
    }

    pub fn get(&self, id: &str) -> Option<PluginInfo> {
        self.installed.get(id).map(InstalledPlugin::info)
    }

    /// Installed plugins sorted by id.
    pub fn list(&self) -> Vec<PluginInfo> {
        self.installed.values().map(InstalledPlugin::info).collect()
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.installed
            .get(id)
            .is_some_and(|plugin| plugin.status == PluginStatus::Active)
    }

    fn instantiate(&self, id: &str) -> KernelResult<Box<dyn Plugin>> {
        let factory = self
            .catalog
            .get(id)
            .ok_or_else(|| KernelError::validation(format!("plugin not in catalog: {id}")))?;
        let instance = factory();
        let manifest = instance.manifest();
        manifest.validate()?;
        if manifest.id != id {
            return Err(KernelError::validation(format!(
                "catalog entry {id} produced manifest {}",
                manifest.id
            )));
        }
        Ok(instance)
    }

    fn installed_plugin(&self, id: &str) -> KernelResult<&InstalledPlugin> {
        self.installed
            .get(id)
            .ok_or_else(|| KernelError::validation(format!("plugin not installed: {id}")))
    }

    fn check_dependencies(&self, id: &str) -> KernelResult<()> {
        let plugin = self.installed_plugin(id)?;
        for dependency in &plugin.instance.manifest().dependencies {
            if !self.is_active(dependency) {
                return Err(KernelError::Dependency {
                    plugin_id: id.to_string(),
                    dependency: dependency.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_no_active_dependents(&self, id: &str) -> KernelResult<()> {
        match self.active_dependents(id).into_iter().next() {
            Some(dependent) => Err(KernelError::Dependency {
                plugin_id: id.to_string(),
                dependency: dependent,
            }),
            None => Ok(()),
        }
    }

    fn active_dependents(&self, id: &str) -> Vec<String> {
        self.installed
            .iter()
            .filter(|(_, plugin)| plugin.status == PluginStatus::Active)
            .filter(|(_, plugin)| {
                plugin
                    .instance
                    .manifest()
                    .dependencies
                    .iter()
                    .any(|dependency| dependency == id)
            })
            .map(|(dependent, _)| dependent.clone())
            .collect()
    }

    fn next_leaf_active(&self) -> Option<String> {
        self.installed
            .iter()
            .filter(|(_, plugin)| plugin.status == PluginStatus::Active)
            .map(|(id, _)| id)
            .find(|id| self.active_dependents(id).is_empty())
            .cloned()
    }

    fn activate(&mut self, id: &str, registries: Contributions<'_>) -> KernelResult<()> {
        let Some(plugin) = self.installed.get_mut(id) else {
            return Err(KernelError::validation(format!("plugin not installed: {id}")));
        };

        let mut ctx = ActivationContext::new(id);
        if let Err(message) = plugin.instance.activate(&mut ctx) {
            warn!("event=plugin_activate module=plugin status=error plugin_id={id}");
            plugin.status = PluginStatus::Error;
            plugin.last_error = Some(message.clone());
            return Err(KernelError::Activation {
                plugin_id: id.to_string(),
                message,
            });
        }

        let (commands, keybindings) = ctx.into_parts();
        plugin.commands = commands.iter().map(|command| command.id.clone()).collect();
        plugin.keybindings = keybindings
            .iter()
            .map(|binding| binding.key.to_string())
            .collect();
        for command in commands {
            registries.commands.register(command)?;
        }
        for binding in keybindings {
            registries.keybindings.register(binding);
        }
        plugin.status = PluginStatus::Active;
        plugin.last_error = None;
        info!("event=plugin_activate module=plugin status=ok plugin_id={id}");
        Ok(())
    }

    fn deactivate(&mut self, id: &str, registries: Contributions<'_>) {
        self.deactivate_quietly(id, registries.commands, registries.keybindings);
        self.bus.emit(KernelEvent::PluginDisabled {
            plugin_id: id.to_string(),
        });
    }

    fn deactivate_quietly(
        &mut self,
        id: &str,
        commands: &mut CommandRegistry,
        keybindings: &mut KeybindingRegistry,
    ) {
        let Some(plugin) = self.installed.get_mut(id) else {
            return;
        };
        plugin.instance.deactivate();
        commands.unregister_by_source(id);
        keybindings.unregister_by_source(id);
        plugin.commands.clear();
        plugin.keybindings.clear();
        plugin.status = PluginStatus::Inactive;
    }
}
