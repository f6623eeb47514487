//! Module lifecycle
//!
//! Modules are installable units owning groups of route registrations.
//! Loading requires every declared dependency to be resident first;
//! unloading removes the module's routes and either refuses while loaded
//! dependents exist or cascades through them depth-first. Suspension is a
//! resource hint only - a suspended module's routes stay resolvable.

use crate::destination::SpecHandle;
use crate::error::{Result, RouterError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use waypoint_router::Registry;

/// A route contributed by a module at load time
pub struct RouteDef {
    pub pattern: String,
    pub destination: SpecHandle,
}

impl RouteDef {
    pub fn new(pattern: impl Into<String>, destination: SpecHandle) -> Self {
        Self {
            pattern: pattern.into(),
            destination,
        }
    }
}

/// An installable unit owning a group of routes
///
/// Lifecycle hooks are synchronous notifications; they run inside the
/// router's serialized state owner and must not block.
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    /// Names of modules that must be resident before this one loads
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Routes registered when the module loads
    fn routes(&self) -> Vec<RouteDef>;

    fn on_load(&self) {}
    fn on_unload(&self) {}
    fn on_suspend(&self) {}
    fn on_resume(&self) {}
}

/// Module lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModuleState {
    Unloaded,
    Loading,
    Loaded,
    Suspended,
}

impl ModuleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleState::Unloaded => "unloaded",
            ModuleState::Loading => "loading",
            ModuleState::Loaded => "loaded",
            ModuleState::Suspended => "suspended",
        }
    }

    /// Loaded or suspended: routes are registered and the module counts
    /// as a satisfied dependency
    fn is_resident(&self) -> bool {
        matches!(self, ModuleState::Loaded | ModuleState::Suspended)
    }
}

struct Slot {
    module: Arc<dyn Module>,
    state: ModuleState,
    last_used: Instant,
}

/// Tracks installed modules and drives their lifecycle against the registry
#[derive(Default)]
pub struct ModuleManager {
    slots: HashMap<String, Slot>,
}

impl ModuleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a module known to the manager (state: unloaded)
    ///
    /// Reinstalling an unloaded module replaces it; reinstalling a resident
    /// one is refused.
    pub fn install(&mut self, module: Arc<dyn Module>) -> Result<()> {
        let name = module.name().to_string();
        if let Some(existing) = self.slots.get(&name) {
            if existing.state.is_resident() {
                return Err(RouterError::InvalidModuleState {
                    module: name,
                    state: existing.state.as_str(),
                });
            }
        }
        self.slots.insert(
            name,
            Slot {
                module,
                state: ModuleState::Unloaded,
                last_used: Instant::now(),
            },
        );
        Ok(())
    }

    pub fn state(&self, name: &str) -> Option<ModuleState> {
        self.slots.get(name).map(|s| s.state)
    }

    /// Installed modules with their states, sorted by name
    pub fn modules(&self) -> Vec<(String, ModuleState)> {
        let mut out: Vec<_> = self
            .slots
            .iter()
            .map(|(name, slot)| (name.clone(), slot.state))
            .collect();
        out.sort();
        out
    }

    /// Load a module: dependencies first, then routes, then `on_load`
    ///
    /// Loading an already-resident module is a no-op. A route registration
    /// failure rolls the module back to unloaded with no routes left behind.
    pub fn load(&mut self, name: &str, registry: &mut Registry<SpecHandle>) -> Result<()> {
        let Some(slot) = self.slots.get(name) else {
            return Err(RouterError::ModuleNotFound(name.to_string()));
        };
        if slot.state.is_resident() || slot.state == ModuleState::Loading {
            return Ok(());
        }

        let module = slot.module.clone();
        for dep in module.dependencies() {
            let satisfied = self
                .slots
                .get(&dep)
                .is_some_and(|s| s.state.is_resident());
            if !satisfied {
                return Err(RouterError::DependencyNotSatisfied {
                    module: name.to_string(),
                    missing: dep,
                });
            }
        }

        self.set_state(name, ModuleState::Loading);
        for route in module.routes() {
            if let Err(e) = registry.register(&route.pattern, name, route.destination) {
                registry.unregister_module(name);
                self.set_state(name, ModuleState::Unloaded);
                return Err(e.into());
            }
        }
        module.on_load();
        self.set_state(name, ModuleState::Loaded);
        self.touch(name);
        tracing::debug!(module = name, "module loaded");
        Ok(())
    }

    /// Unload a module, deregistering all its routes
    ///
    /// Without `cascade`, refuses while resident dependents exist. With it,
    /// dependents are unloaded first, depth-first. Returns the unloaded
    /// module names in unload order.
    pub fn unload(
        &mut self,
        name: &str,
        cascade: bool,
        registry: &mut Registry<SpecHandle>,
    ) -> Result<Vec<String>> {
        let Some(slot) = self.slots.get(name) else {
            return Err(RouterError::ModuleNotFound(name.to_string()));
        };
        if !slot.state.is_resident() {
            return Ok(Vec::new());
        }

        let dependents = self.resident_dependents(name);
        if !dependents.is_empty() && !cascade {
            return Err(RouterError::DependencyViolation {
                module: name.to_string(),
                dependents,
            });
        }

        let mut visiting = Vec::new();
        let mut unloaded = Vec::new();
        self.unload_rec(name, registry, &mut visiting, &mut unloaded)?;
        Ok(unloaded)
    }

    fn unload_rec(
        &mut self,
        name: &str,
        registry: &mut Registry<SpecHandle>,
        visiting: &mut Vec<String>,
        unloaded: &mut Vec<String>,
    ) -> Result<()> {
        if visiting.iter().any(|v| v == name) {
            return Err(RouterError::CyclicDependency {
                module: name.to_string(),
            });
        }
        let resident = self
            .slots
            .get(name)
            .is_some_and(|s| s.state.is_resident());
        if !resident {
            return Ok(());
        }

        visiting.push(name.to_string());
        for dependent in self.resident_dependents(name) {
            self.unload_rec(&dependent, registry, visiting, unloaded)?;
        }
        visiting.pop();

        registry.unregister_module(name);
        if let Some(slot) = self.slots.get_mut(name) {
            slot.module.on_unload();
            slot.state = ModuleState::Unloaded;
        }
        unloaded.push(name.to_string());
        tracing::debug!(module = name, "module unloaded");
        Ok(())
    }

    /// Resident modules declaring `name` as a dependency, sorted for
    /// deterministic cascade order
    fn resident_dependents(&self, name: &str) -> Vec<String> {
        let mut out: Vec<String> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.state.is_resident())
            .filter(|(_, slot)| slot.module.dependencies().iter().any(|d| d == name))
            .map(|(dependent, _)| dependent.clone())
            .collect();
        out.sort();
        out
    }

    /// Suspend a loaded module; its routes remain resolvable
    pub fn suspend(&mut self, name: &str) -> Result<()> {
        match self.state(name) {
            None => Err(RouterError::ModuleNotFound(name.to_string())),
            Some(ModuleState::Suspended) => Ok(()),
            Some(ModuleState::Loaded) => {
                if let Some(slot) = self.slots.get_mut(name) {
                    slot.module.on_suspend();
                    slot.state = ModuleState::Suspended;
                    slot.last_used = Instant::now();
                }
                tracing::debug!(module = name, "module suspended");
                Ok(())
            }
            Some(state) => Err(RouterError::InvalidModuleState {
                module: name.to_string(),
                state: state.as_str(),
            }),
        }
    }

    /// Resume a suspended module
    pub fn resume(&mut self, name: &str) -> Result<()> {
        match self.state(name) {
            None => Err(RouterError::ModuleNotFound(name.to_string())),
            Some(ModuleState::Loaded) => Ok(()),
            Some(ModuleState::Suspended) => {
                if let Some(slot) = self.slots.get_mut(name) {
                    slot.module.on_resume();
                    slot.state = ModuleState::Loaded;
                    slot.last_used = Instant::now();
                }
                tracing::debug!(module = name, "module resumed");
                Ok(())
            }
            Some(state) => Err(RouterError::InvalidModuleState {
                module: name.to_string(),
                state: state.as_str(),
            }),
        }
    }

    /// Record that a navigation resolved into one of the module's routes
    pub fn touch(&mut self, name: &str) {
        if let Some(slot) = self.slots.get_mut(name) {
            slot.last_used = Instant::now();
        }
    }

    /// Loaded modules untouched for at least `max_idle`: suspension candidates
    pub fn idle_modules(&self, max_idle: Duration) -> Vec<String> {
        let mut out: Vec<String> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.state == ModuleState::Loaded)
            .filter(|(_, slot)| slot.last_used.elapsed() >= max_idle)
            .map(|(name, _)| name.clone())
            .collect();
        out.sort();
        out
    }

    fn set_state(&mut self, name: &str, state: ModuleState) {
        if let Some(slot) = self.slots.get_mut(name) {
            slot.state = state;
        }
    }
}
