use bluer::Address;
use std::collections::HashMap;

/// Static mapping from hardware addresses to human-meaningful locations
///
/// Populated once from configuration at startup and read-only afterwards.
/// An unmapped address is a valid, expected state (hardware identities can
/// rotate); it resolves to a deterministic fallback label that embeds the
/// raw address so an operator can add the mapping later.
#[derive(Debug, Clone)]
pub struct LocationTable {
    locations: HashMap<Address, String>,
}

impl LocationTable {
    pub fn new(locations: HashMap<Address, String>) -> Self {
        LocationTable { locations }
    }

    pub fn resolve(&self, identity: Address) -> String {
        self.locations
            .get(&identity)
            .cloned()
            .unwrap_or_else(|| format!("Unknown ({})", identity))
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
