//! Diffs a `PortState` against its CONFIG port row on every change batch
//! and issues the minimal kernel and connected-route operations.

use config::{ColumnModified, PortRow, Store};
use kernel::{AddrOp, KernelOps};
use prefix::Family;

use crate::diff;
use crate::error::Error;
use crate::port_state::PortState;
use crate::routes::ConnectedRouteWriter;

pub struct ReconfigEngine;

impl ReconfigEngine {
    /// Reconcile `state` towards `row`. `columns` tells which secondary
    /// columns changed in this pass; the corresponding diff is skipped
    /// entirely when unchanged.
    pub fn reconfigure(
        state: &mut PortState,
        row: &PortRow,
        store: &mut Store,
        kernel: &mut impl KernelOps,
        columns: ColumnModified,
    ) {
        Self::reconfigure_primary(state, row, store, kernel, Family::V4);
        Self::reconfigure_primary(state, row, store, kernel, Family::V6);

        if columns.ip4_secondary {
            Self::reconfigure_secondary(state, row, kernel, Family::V4);
        }
        if columns.ip6_secondary {
            Self::reconfigure_secondary(state, row, kernel, Family::V6);
        }

        state.internal_vlan_id = row.internal_vlan_id;
    }

    fn reconfigure_primary(
        state: &mut PortState,
        row: &PortRow,
        store: &mut Store,
        kernel: &mut impl KernelOps,
        family: Family,
    ) {
        let desired = match family {
            Family::V4 => row.ip4_address.as_deref(),
            Family::V6 => row.ip6_address.as_deref(),
        };
        let current = match family {
            Family::V4 => state.primary_v4.clone(),
            Family::V6 => state.primary_v6.clone(),
        };

        // Raw string equality: no canonicalisation before comparison, so
        // whitespace or formatting drift in the CONFIG column is treated
        // as a real change.
        match (desired, current.as_deref()) {
            (Some(new), Some(old)) if new != old => {
                Self::kernel_op(kernel, AddrOp::Del, &row.name, old, family, false);
                Self::route_del(store, old, &row.name, family);
                Self::set_primary(state, family, Some(new.to_string()));
                Self::kernel_op(kernel, AddrOp::Add, &row.name, new, family, false);
                Self::route_add(store, &row.name, new, family);
            }
            (Some(new), None) => {
                Self::set_primary(state, family, Some(new.to_string()));
                Self::kernel_op(kernel, AddrOp::Add, &row.name, new, family, false);
                Self::route_add(store, &row.name, new, family);
            }
            (None, Some(old)) => {
                Self::kernel_op(kernel, AddrOp::Del, &row.name, &old, family, false);
                Self::route_del(store, &old, &row.name, family);
                Self::set_primary(state, family, None);
            }
            _ => {}
        }
    }

    fn reconfigure_secondary(
        state: &mut PortState,
        row: &PortRow,
        kernel: &mut impl KernelOps,
        family: Family,
    ) {
        let desired = match family {
            Family::V4 => &row.ip4_address_secondary,
            Family::V6 => &row.ip6_address_secondary,
        };
        let current = match family {
            Family::V4 => &mut state.secondary_v4,
            Family::V6 => &mut state.secondary_v6,
        };

        diff::reconcile(
            desired,
            current,
            |addr| {
                if let Err(e) = kernel.set_address(AddrOp::Del, &row.name, addr, family, true) {
                    log::warn!("secondary del {addr} on {} failed: {e}", row.name);
                }
            },
            |addr| {
                if let Err(e) = kernel.set_address(AddrOp::Add, &row.name, addr, family, true) {
                    log::warn!("secondary add {addr} on {} failed: {e}", row.name);
                }
            },
        );
    }

    fn set_primary(state: &mut PortState, family: Family, value: Option<String>) {
        match family {
            Family::V4 => state.primary_v4 = value,
            Family::V6 => state.primary_v6 = value,
        }
    }

    fn kernel_op(
        kernel: &mut impl KernelOps,
        op: AddrOp,
        ifname: &str,
        addr: &str,
        family: Family,
        secondary: bool,
    ) {
        if let Err(e) = kernel.set_address(op, ifname, addr, family, secondary) {
            log::warn!("{op:?} {addr} on {ifname} failed: {e}");
        }
    }

    fn route_add(store: &mut Store, port_name: &str, addr: &str, family: Family) {
        match ConnectedRouteWriter::add_connected_route(store, port_name, addr, family) {
            Ok(()) => {}
            Err(Error::NoVrf) => log::warn!("no vrf yet, deferring connected route for {port_name}"),
            Err(e) => log::warn!("connected route insert failed for {port_name}: {e}"),
        }
    }

    fn route_del(store: &mut Store, addr: &str, port_name: &str, family: Family) {
        match ConnectedRouteWriter::delete_connected_route(store, addr, port_name, family) {
            Ok(()) => {}
            Err(Error::NoVrf) => {
                log::warn!("no vrf yet, skipping connected route delete for {port_name}")
            }
            Err(e) => log::warn!("connected route delete failed for {port_name}: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::VrfId;
    use kernel::KernelPort;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Add(String, String, bool),
        Del(String, String, bool),
    }

    #[derive(Default)]
    struct FakeKernel {
        ops: Vec<Op>,
    }

    impl KernelOps for FakeKernel {
        fn set_address(
            &mut self,
            op: AddrOp,
            ifname: &str,
            addr_text: &str,
            _family: Family,
            secondary: bool,
        ) -> Result<(), kernel::Error> {
            let entry = match op {
                AddrOp::Add => Op::Add(ifname.to_string(), addr_text.to_string(), secondary),
                AddrOp::Del => Op::Del(ifname.to_string(), addr_text.to_string(), secondary),
            };
            self.ops.push(entry);
            Ok(())
        }

        fn add_vlan_interface(
            &mut self,
            _parent_ifname: &str,
            _vlan_ifname: &str,
            _vlan_tag: u16,
        ) -> Result<(), kernel::Error> {
            Ok(())
        }

        fn delete_link(&mut self, _ifname: &str) -> Result<(), kernel::Error> {
            Ok(())
        }

        fn set_link_admin(&mut self, _ifname: &str, _status: &str) -> Result<(), kernel::Error> {
            Ok(())
        }

        fn dump_addresses(
            &mut self,
            _family: Family,
        ) -> Result<HashMap<String, KernelPort>, kernel::Error> {
            Ok(HashMap::new())
        }
    }

    fn row_with_primary_v4(addr: &str) -> PortRow {
        let mut row = PortRow::new("eth0");
        row.ip4_address = Some(addr.to_string());
        row
    }

    #[test]
    fn s1_empty_port_gains_primary_v4() {
        let mut store = Store::new();
        store.add_vrf(VrfId(0));
        let mut state = PortState::new("eth0", VrfId(0));
        let row = row_with_primary_v4("10.0.0.5/24");
        let mut kernel = FakeKernel::default();

        ReconfigEngine::reconfigure(&mut state, &row, &mut store, &mut kernel, ColumnModified::default());

        assert_eq!(
            kernel.ops,
            vec![Op::Add("eth0".to_string(), "10.0.0.5/24".to_string(), false)]
        );
        assert_eq!(state.primary_v4.as_deref(), Some("10.0.0.5/24"));
        let routes = store.routes(VrfId(0));
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].prefix, "10.0.0.0/24");
        assert_eq!(routes[0].nexthops[0].ports, vec!["eth0".to_string()]);
    }

    #[test]
    fn s2_primary_change_is_del_then_add_with_route_swap() {
        let mut store = Store::new();
        store.add_vrf(VrfId(0));
        let mut state = PortState::new("eth0", VrfId(0));
        let row = row_with_primary_v4("10.0.0.5/24");
        let mut kernel = FakeKernel::default();
        ReconfigEngine::reconfigure(&mut state, &row, &mut store, &mut kernel, ColumnModified::default());

        kernel.ops.clear();
        let row = row_with_primary_v4("10.0.0.5/25");
        ReconfigEngine::reconfigure(&mut state, &row, &mut store, &mut kernel, ColumnModified::default());

        assert_eq!(
            kernel.ops,
            vec![
                Op::Del("eth0".to_string(), "10.0.0.5/24".to_string(), false),
                Op::Add("eth0".to_string(), "10.0.0.5/25".to_string(), false),
            ]
        );
        let routes = store.routes(VrfId(0));
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].prefix, "10.0.0.0/25");
    }

    #[test]
    fn s3_secondary_v6_swap_emits_only_the_delta() {
        let mut store = Store::new();
        store.add_vrf(VrfId(0));
        let mut state = PortState::new("eth0", VrfId(0));
        state.secondary_v6.insert("2001:db8::1/64".to_string());
        state.secondary_v6.insert("2001:db8::2/64".to_string());

        let mut row = PortRow::new("eth0");
        row.ip6_address_secondary = vec!["2001:db8::2/64".to_string(), "2001:db8::3/64".to_string()];
        let mut kernel = FakeKernel::default();
        let columns = ColumnModified {
            ip4_secondary: false,
            ip6_secondary: true,
        };

        ReconfigEngine::reconfigure(&mut state, &row, &mut store, &mut kernel, columns);

        assert_eq!(
            kernel.ops,
            vec![
                Op::Del("eth0".to_string(), "2001:db8::1/64".to_string(), true),
                Op::Add("eth0".to_string(), "2001:db8::3/64".to_string(), true),
            ]
        );
        assert!(store.routes(VrfId(0)).is_empty());
    }

    #[test]
    fn secondary_diff_skipped_when_column_not_modified() {
        let mut store = Store::new();
        store.add_vrf(VrfId(0));
        let mut state = PortState::new("eth0", VrfId(0));
        state.secondary_v4.insert("10.0.0.9/24".to_string());

        let mut row = PortRow::new("eth0");
        row.ip4_address_secondary = Vec::new();
        let mut kernel = FakeKernel::default();

        ReconfigEngine::reconfigure(&mut state, &row, &mut store, &mut kernel, ColumnModified::default());

        assert!(kernel.ops.is_empty());
        assert!(state.secondary_v4.contains("10.0.0.9/24"));
    }

    #[test]
    fn clearing_primary_deletes_kernel_address_and_route() {
        let mut store = Store::new();
        store.add_vrf(VrfId(0));
        let mut state = PortState::new("eth0", VrfId(0));
        let row = row_with_primary_v4("10.0.0.5/24");
        let mut kernel = FakeKernel::default();
        ReconfigEngine::reconfigure(&mut state, &row, &mut store, &mut kernel, ColumnModified::default());

        kernel.ops.clear();
        let row = PortRow::new("eth0");
        ReconfigEngine::reconfigure(&mut state, &row, &mut store, &mut kernel, ColumnModified::default());

        assert_eq!(
            kernel.ops,
            vec![Op::Del("eth0".to_string(), "10.0.0.5/24".to_string(), false)]
        );
        assert!(state.primary_v4.is_none());
        assert!(store.routes(VrfId(0)).is_empty());
    }
}
