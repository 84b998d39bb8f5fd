//! Runs once before the main loop: converges kernel addresses to the
//! CONFIG's view and seeds the VRF port map so the first reconfigure pass
//! observes equality and emits nothing.

use std::collections::{HashMap, HashSet};

use config::{PortRow, Store, VrfId};
use kernel::{AddrOp, KernelOps, KernelPort};
use prefix::Family;

use crate::port_state::PortState;

pub struct StartupReconciler;

impl StartupReconciler {
    /// Dump kernel addresses for both families, diff each interface
    /// against its matching CONFIG port row, issue the minimum kernel
    /// mutations, and populate `vrf_ports` for matched ports.
    ///
    /// Ports with no same-named kernel interface at all are left out of
    /// `vrf_ports`; the main loop's first `ReconfigEngine::reconfigure`
    /// call will then treat them as brand new and add their addresses.
    pub fn run(
        kernel: &mut impl KernelOps,
        store: &Store,
        vrf_ports: &mut HashMap<VrfId, HashMap<String, PortState>>,
    ) {
        let mut kernel_ports: HashMap<String, KernelPort> = match kernel.dump_addresses(Family::V4) {
            Ok(ports) => ports,
            Err(e) => {
                log::warn!("startup: v4 address dump failed: {e}");
                HashMap::new()
            }
        };
        match kernel.dump_addresses(Family::V6) {
            Ok(v6_ports) => {
                for (name, port) in v6_ports {
                    kernel_ports
                        .entry(name.clone())
                        .or_insert_with(|| KernelPort::named(name))
                        .merge_from(port);
                }
            }
            Err(e) => log::warn!("startup: v6 address dump failed: {e}"),
        }

        let db_ports: HashMap<&str, (VrfId, &PortRow)> = store
            .all_ports()
            .map(|(vrf, row)| (row.name.as_str(), (vrf, row)))
            .collect();

        log::debug!(
            "startup: {} kernel interface(s) dumped, {} config port(s) to reconcile against",
            kernel_ports.len(),
            db_ports.len(),
        );

        for (ifname, kport) in &kernel_ports {
            match db_ports.get(ifname.as_str()) {
                None => Self::delete_all(kernel, ifname, kport),
                Some((vrf, row)) => {
                    let state = Self::converge_port(kernel, ifname, kport, row, *vrf);
                    vrf_ports
                        .entry(*vrf)
                        .or_default()
                        .insert(row.name.clone(), state);
                }
            }
        }
    }

    fn delete_all(kernel: &mut impl KernelOps, ifname: &str, kport: &KernelPort) {
        for addr in &kport.v4 {
            if let Err(e) = kernel.set_address(AddrOp::Del, ifname, addr, Family::V4, false) {
                log::warn!("startup: delete {addr} on {ifname} failed: {e}");
            }
        }
        for addr in &kport.v6 {
            if let Err(e) = kernel.set_address(AddrOp::Del, ifname, addr, Family::V6, false) {
                log::warn!("startup: delete {addr} on {ifname} failed: {e}");
            }
        }
    }

    fn converge_port(
        kernel: &mut impl KernelOps,
        ifname: &str,
        kport: &KernelPort,
        row: &PortRow,
        vrf: VrfId,
    ) -> PortState {
        let mut state = PortState::new(row.name.clone(), vrf);
        state.internal_vlan_id = row.internal_vlan_id;

        Self::converge_family(
            kernel,
            ifname,
            &kport.v4,
            row.ip4_address.as_deref(),
            &row.ip4_address_secondary,
            Family::V4,
            &mut state.primary_v4,
            &mut state.secondary_v4,
        );
        Self::converge_family(
            kernel,
            ifname,
            &kport.v6,
            row.ip6_address.as_deref(),
            &row.ip6_address_secondary,
            Family::V6,
            &mut state.primary_v6,
            &mut state.secondary_v6,
        );

        state
    }

    #[allow(clippy::too_many_arguments)]
    fn converge_family(
        kernel: &mut impl KernelOps,
        ifname: &str,
        kernel_addrs: &HashSet<String>,
        primary: Option<&str>,
        secondaries: &[String],
        family: Family,
        state_primary: &mut Option<String>,
        state_secondary: &mut HashSet<String>,
    ) {
        let wanted: HashSet<&str> = primary
            .into_iter()
            .chain(secondaries.iter().map(String::as_str))
            .collect();

        for addr in kernel_addrs {
            if !wanted.contains(addr.as_str()) {
                if let Err(e) = kernel.set_address(AddrOp::Del, ifname, addr, family, false) {
                    log::warn!("startup: delete {addr} on {ifname} failed: {e}");
                }
            }
        }

        if let Some(addr) = primary {
            if !kernel_addrs.contains(addr) {
                if let Err(e) = kernel.set_address(AddrOp::Add, ifname, addr, family, false) {
                    log::warn!("startup: add {addr} on {ifname} failed: {e}");
                }
            }
            *state_primary = Some(addr.to_string());
        }

        for addr in secondaries {
            if !kernel_addrs.contains(addr.as_str()) {
                if let Err(e) = kernel.set_address(AddrOp::Add, ifname, addr, family, true) {
                    log::warn!("startup: add {addr} on {ifname} failed: {e}");
                }
            }
            state_secondary.insert(addr.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::PortRow;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Add(String, String),
        Del(String, String),
    }

    #[derive(Default)]
    struct FakeKernel {
        ops: Vec<Op>,
        v4: HashMap<String, KernelPort>,
        v6: HashMap<String, KernelPort>,
    }

    impl KernelOps for FakeKernel {
        fn set_address(
            &mut self,
            op: AddrOp,
            ifname: &str,
            addr_text: &str,
            _family: Family,
            _secondary: bool,
        ) -> Result<(), kernel::Error> {
            let entry = (ifname.to_string(), addr_text.to_string());
            self.ops.push(match op {
                AddrOp::Add => Op::Add(entry.0, entry.1),
                AddrOp::Del => Op::Del(entry.0, entry.1),
            });
            Ok(())
        }

        fn add_vlan_interface(&mut self, _: &str, _: &str, _: u16) -> Result<(), kernel::Error> {
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
            family: Family,
        ) -> Result<HashMap<String, KernelPort>, kernel::Error> {
            Ok(match family {
                Family::V4 => self.v4.clone(),
                Family::V6 => self.v6.clone(),
            })
        }
    }

    fn kport(name: &str, v4: &[&str]) -> KernelPort {
        KernelPort {
            name: name.to_string(),
            v4: v4.iter().map(|s| s.to_string()).collect(),
            v6: HashSet::new(),
        }
    }

    #[test]
    fn s4_extra_kernel_secondary_is_deleted_and_port_cached() {
        let mut kernel = FakeKernel::default();
        kernel
            .v4
            .insert("eth0".to_string(), kport("eth0", &["192.0.2.1/24", "192.0.2.99/24"]));

        let mut store = Store::new();
        let vrf = VrfId(0);
        store.add_vrf(vrf);
        let mut row = PortRow::new("eth0");
        row.ip4_address = Some("192.0.2.1/24".to_string());
        store.upsert_port(vrf, row);

        let mut vrf_ports = HashMap::new();
        StartupReconciler::run(&mut kernel, &store, &mut vrf_ports);

        assert_eq!(
            kernel.ops,
            vec![Op::Del("eth0".to_string(), "192.0.2.99/24".to_string())]
        );
        let cached = &vrf_ports[&vrf]["eth0"];
        assert_eq!(cached.primary_v4.as_deref(), Some("192.0.2.1/24"));
        assert!(cached.secondary_v4.is_empty());
    }

    #[test]
    fn s5_kernel_interface_with_no_db_port_is_fully_deleted() {
        let mut kernel = FakeKernel::default();
        kernel.v4.insert("eth9".to_string(), kport("eth9", &["10.0.0.1/24"]));

        let store = Store::new();
        let mut vrf_ports = HashMap::new();
        StartupReconciler::run(&mut kernel, &store, &mut vrf_ports);

        assert_eq!(
            kernel.ops,
            vec![Op::Del("eth9".to_string(), "10.0.0.1/24".to_string())]
        );
        assert!(vrf_ports.is_empty());
    }

    #[test]
    fn missing_kernel_address_is_added() {
        let mut kernel = FakeKernel::default();
        kernel.v4.insert("eth0".to_string(), kport("eth0", &[]));

        let mut store = Store::new();
        let vrf = VrfId(0);
        store.add_vrf(vrf);
        let mut row = PortRow::new("eth0");
        row.ip4_address = Some("10.0.0.1/24".to_string());
        store.upsert_port(vrf, row);

        let mut vrf_ports = HashMap::new();
        StartupReconciler::run(&mut kernel, &store, &mut vrf_ports);

        assert_eq!(
            kernel.ops,
            vec![Op::Add("eth0".to_string(), "10.0.0.1/24".to_string())]
        );
    }
}
