//! In-memory CONFIG schema: port rows, route rows and the VRF map the
//! reconciliation core reads and writes through. The real daemon's CONFIG
//! client (transactions, change notification, the wire format to the
//! database) lives elsewhere; this crate only carries the row shapes and
//! a `Store` that behaves like it for tests and for the `portd` binary's
//! default in-process mode.

use std::collections::HashMap;

/// Identifies a VRF. The core never constructs these; it receives them
/// from `Store::vrfs`/`Store::first_vrf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VrfId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubAddressFamily {
    Unicast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource {
    Connected,
}

/// Sentinel for "no VLAN configured", matching the CONFIG column's
/// encoding of absence as a non-positive integer rather than an option.
pub const NO_VLAN: i32 = -1;

#[derive(Debug, Clone)]
pub struct PortRow {
    pub name: String,
    pub ip4_address: Option<String>,
    pub ip6_address: Option<String>,
    pub ip4_address_secondary: Vec<String>,
    pub ip6_address_secondary: Vec<String>,
    pub internal_vlan_id: i32,
}

impl PortRow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip4_address: None,
            ip6_address: None,
            ip4_address_secondary: Vec::new(),
            ip6_address_secondary: Vec::new(),
            internal_vlan_id: NO_VLAN,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NexthopRow {
    pub ports: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RouteRow {
    pub vrf: VrfId,
    pub address_family: Option<AddressFamily>,
    pub prefix: String,
    pub sub_address_family: Option<SubAddressFamily>,
    pub from: RouteSource,
    pub distance: Vec<u8>,
    pub selected: Vec<bool>,
    pub nexthops: Vec<NexthopRow>,
}

/// Which of the two secondary-address columns changed in the current
/// CONFIG pass, as handed to `ReconfigEngine::reconfigure` by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnModified {
    pub ip4_secondary: bool,
    pub ip6_secondary: bool,
}

/// In-memory stand-in for the CONFIG store. Holds one flat dirty flag in
/// place of the real client's transaction handle; the core only ever
/// appends rows and sets this flag, never commits.
#[derive(Debug, Default)]
pub struct Store {
    vrfs: Vec<VrfId>,
    ports: HashMap<VrfId, HashMap<String, PortRow>>,
    routes: HashMap<VrfId, Vec<RouteRow>>,
    dirty: bool,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vrf(&mut self, vrf: VrfId) {
        if !self.vrfs.contains(&vrf) {
            self.vrfs.push(vrf);
            self.ports.entry(vrf).or_default();
            self.routes.entry(vrf).or_default();
        }
    }

    pub fn first_vrf(&self) -> Option<VrfId> {
        self.vrfs.first().copied()
    }

    pub fn vrfs(&self) -> impl Iterator<Item = VrfId> + '_ {
        self.vrfs.iter().copied()
    }

    pub fn upsert_port(&mut self, vrf: VrfId, port: PortRow) {
        self.ports.entry(vrf).or_default().insert(port.name.clone(), port);
    }

    pub fn remove_port(&mut self, vrf: VrfId, name: &str) -> Option<PortRow> {
        self.ports.get_mut(&vrf).and_then(|m| m.remove(name))
    }

    pub fn port(&self, vrf: VrfId, name: &str) -> Option<&PortRow> {
        self.ports.get(&vrf)?.get(name)
    }

    /// All ports in one VRF, in an unspecified but stable iteration order.
    pub fn ports(&self, vrf: VrfId) -> impl Iterator<Item = &PortRow> + '_ {
        self.ports.get(&vrf).into_iter().flat_map(|m| m.values())
    }

    /// Every port across every VRF, paired with its owning VRF.
    pub fn all_ports(&self) -> impl Iterator<Item = (VrfId, &PortRow)> + '_ {
        self.ports
            .iter()
            .flat_map(|(vrf, m)| m.values().map(move |p| (*vrf, p)))
    }

    pub fn routes(&self, vrf: VrfId) -> &[RouteRow] {
        self.routes.get(&vrf).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn insert_route(&mut self, route: RouteRow) {
        self.routes.entry(route.vrf).or_default().push(route);
        self.mark_dirty();
    }

    /// Remove and return the route at `index` within `vrf`'s route list.
    /// Panics on an out-of-range index; callers locate the index with
    /// [`Self::routes`] in the same pass, so it cannot go stale.
    pub fn remove_route(&mut self, vrf: VrfId, index: usize) -> RouteRow {
        let row = self.routes.get_mut(&vrf).expect("vrf has no routes").remove(index);
        self.mark_dirty();
        row
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}
