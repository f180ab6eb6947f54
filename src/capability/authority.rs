use super::types::Capability;

/// Source of truth for capability grant status.
///
/// Implementations are shared across every session and may be called
/// concurrently from any thread. The orchestrator only reads through this
/// interface; it never mutates grant state.
pub trait CapabilityAuthority: Send + Sync {
    /// Whether the platform recognizes the identifier at all.
    fn exists(&self, capability: &Capability) -> bool;

    /// Current grant status.
    fn is_granted(&self, capability: &Capability) -> bool;

    /// Whether a future request could still succeed. `false` for a
    /// capability that is not granted means the refusal is permanent.
    fn will_show_rationale(&self, capability: &Capability) -> bool;
}
