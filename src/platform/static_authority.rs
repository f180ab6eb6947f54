use parking_lot::RwLock;
use std::collections::HashSet;

use crate::capability::authority::CapabilityAuthority;
use crate::capability::types::{Capability, CompiledPattern, Pattern};
use crate::config::PlatformConfig;
use crate::core::error::{Result, WardenError};

#[derive(Debug, Default)]
struct Overrides {
    granted: HashSet<Capability>,
    revoked: HashSet<Capability>,
    permanently_denied: HashSet<Capability>,
}

/// Pattern-driven authority with in-memory grant overrides.
///
/// Patterns come from configuration; overrides record decisions made at
/// runtime (for example by a presenter) and take precedence.
#[derive(Debug, Default)]
pub struct StaticAuthority {
    known: Vec<CompiledPattern>,
    granted: Vec<CompiledPattern>,
    permanently_denied: Vec<CompiledPattern>,
    overrides: RwLock<Overrides>,
}

impl StaticAuthority {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &PlatformConfig) -> Result<Self> {
        Ok(Self {
            known: compile(&config.known)?,
            granted: compile(&config.granted)?,
            permanently_denied: compile(&config.permanently_denied)?,
            overrides: RwLock::new(Overrides::default()),
        })
    }

    pub fn grant(&self, capability: &Capability) {
        let mut overrides = self.overrides.write();
        overrides.revoked.remove(capability);
        overrides.permanently_denied.remove(capability);
        overrides.granted.insert(capability.clone());
    }

    pub fn revoke(&self, capability: &Capability) {
        let mut overrides = self.overrides.write();
        overrides.granted.remove(capability);
        overrides.revoked.insert(capability.clone());
    }

    pub fn deny_permanently(&self, capability: &Capability) {
        self.revoke(capability);
        self.overrides
            .write()
            .permanently_denied
            .insert(capability.clone());
    }

    fn matches_any(patterns: &[CompiledPattern], capability: &Capability) -> bool {
        patterns.iter().any(|p| p.matches(capability.as_str()))
    }
}

fn compile(patterns: &[Pattern]) -> Result<Vec<CompiledPattern>> {
    patterns
        .iter()
        .map(|pattern| {
            pattern
                .compile()
                .map_err(|e| WardenError::Config(format!("Invalid pattern '{pattern}': {e}")))
        })
        .collect()
}

impl CapabilityAuthority for StaticAuthority {
    fn exists(&self, capability: &Capability) -> bool {
        let overrides = self.overrides.read();
        overrides.granted.contains(capability)
            || overrides.permanently_denied.contains(capability)
            || Self::matches_any(&self.known, capability)
            || Self::matches_any(&self.granted, capability)
            || Self::matches_any(&self.permanently_denied, capability)
    }

    fn is_granted(&self, capability: &Capability) -> bool {
        let overrides = self.overrides.read();
        if overrides.granted.contains(capability) {
            return true;
        }
        if overrides.revoked.contains(capability) {
            return false;
        }
        Self::matches_any(&self.granted, capability)
    }

    fn will_show_rationale(&self, capability: &Capability) -> bool {
        let overrides = self.overrides.read();
        if overrides.granted.contains(capability) {
            return true;
        }
        !overrides.permanently_denied.contains(capability)
            && !Self::matches_any(&self.permanently_denied, capability)
    }
}
