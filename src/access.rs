// Access control collaborators.
//
// The core never walks a role hierarchy; it asks two narrow questions:
// "does this caller hold capability X?" and "is this market/address
// nullified?". Both registries are plain in-memory stores the deployment
// wires up however it likes.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ============================================================================
// CAPABILITIES
// ============================================================================

/// Permissioned operations in the protocol core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    DeployMarket,
    CancelMarket,
    ReviewProposal,
    ActivateProposal,
    EscalateDispute,
    Administer,
}

impl Capability {
    pub fn all() -> [Capability; 6] {
        [
            Capability::DeployMarket,
            Capability::CancelMarket,
            Capability::ReviewProposal,
            Capability::ActivateProposal,
            Capability::EscalateDispute,
            Capability::Administer,
        ]
    }
}

/// caller -> set of granted capabilities
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilityRegistry {
    grants: HashMap<String, HashSet<Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with one account holding every capability.
    pub fn with_admin(admin: &str) -> Self {
        let mut registry = Self::new();
        for cap in Capability::all() {
            registry.grant(admin, cap);
        }
        registry
    }

    pub fn grant(&mut self, caller: &str, capability: Capability) {
        self.grants
            .entry(caller.to_string())
            .or_default()
            .insert(capability);
    }

    pub fn revoke(&mut self, caller: &str, capability: Capability) {
        if let Some(caps) = self.grants.get_mut(caller) {
            caps.remove(&capability);
        }
    }

    pub fn has_capability(&self, caller: &str, capability: Capability) -> bool {
        self.grants
            .get(caller)
            .map(|caps| caps.contains(&capability))
            .unwrap_or(false)
    }
}

// ============================================================================
// NULLIFICATION
// ============================================================================

/// Out-of-band flags blocking trading on a market or by an address.
///
/// Flags only bite while `enforcement` is on; with enforcement off, the
/// registry answers "not nullified" for everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NullificationRegistry {
    markets: HashSet<u64>,
    addresses: HashSet<String>,
    pub enforcement: bool,
}

impl NullificationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_enforcement(&mut self, enabled: bool) {
        self.enforcement = enabled;
    }

    pub fn nullify_market(&mut self, market_id: u64) {
        self.markets.insert(market_id);
    }

    pub fn clear_market(&mut self, market_id: u64) {
        self.markets.remove(&market_id);
    }

    pub fn nullify_address(&mut self, address: &str) {
        self.addresses.insert(address.to_string());
    }

    pub fn clear_address(&mut self, address: &str) {
        self.addresses.remove(address);
    }

    pub fn is_market_nullified(&self, market_id: u64) -> bool {
        self.enforcement && self.markets.contains(&market_id)
    }

    pub fn is_address_nullified(&self, address: &str) -> bool {
        self.enforcement && self.addresses.contains(address)
    }
}

// ============================================================================
// TESTS
// ============================================================================
