//! In-memory mirror of one logical port's address state.

use std::collections::HashSet;

use config::VrfId;
use prefix::Family;

#[derive(Debug, Clone)]
pub struct PortState {
    pub name: String,
    pub vrf: VrfId,
    pub primary_v4: Option<String>,
    pub primary_v6: Option<String>,
    pub secondary_v4: HashSet<String>,
    pub secondary_v6: HashSet<String>,
    pub internal_vlan_id: i32,
}

impl PortState {
    pub fn new(name: impl Into<String>, vrf: VrfId) -> Self {
        Self {
            name: name.into(),
            vrf,
            primary_v4: None,
            primary_v6: None,
            secondary_v4: HashSet::new(),
            secondary_v6: HashSet::new(),
            internal_vlan_id: config::NO_VLAN,
        }
    }

    pub fn find_secondary_v4(&self, addr: &str) -> bool {
        self.secondary_v4.contains(addr)
    }

    pub fn find_secondary_v6(&self, addr: &str) -> bool {
        self.secondary_v6.contains(addr)
    }

    /// True if `addr` is this port's primary or a secondary of `family`.
    pub fn contains(&self, addr: &str, family: Family) -> bool {
        match family {
            Family::V4 => self.primary_v4.as_deref() == Some(addr) || self.find_secondary_v4(addr),
            Family::V6 => self.primary_v6.as_deref() == Some(addr) || self.find_secondary_v6(addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_port_has_no_addresses() {
        let state = PortState::new("eth0", VrfId(0));
        assert!(state.primary_v4.is_none());
        assert!(state.secondary_v4.is_empty());
        assert_eq!(state.internal_vlan_id, config::NO_VLAN);
    }

    #[test]
    fn contains_checks_primary_and_secondary() {
        let mut state = PortState::new("eth0", VrfId(0));
        state.primary_v4 = Some("10.0.0.1/24".to_string());
        state.secondary_v4.insert("10.0.0.2/24".to_string());
        assert!(state.contains("10.0.0.1/24", Family::V4));
        assert!(state.contains("10.0.0.2/24", Family::V4));
        assert!(!state.contains("10.0.0.3/24", Family::V4));
        assert!(!state.contains("10.0.0.1/24", Family::V6));
    }
}
