//! Raw rtnetlink control channel: link and address requests, built and
//! parsed with bit-exact layout, plus the multi-part address dump.

mod attr;
mod dump;
mod error;
mod message;
mod socket;

use std::collections::HashMap;

pub use attr::AddrOp;
pub use dump::KernelPort;
pub use error::Error;
pub use prefix::Family;
pub use socket::KernelChannel;

/// The kernel control-channel operations the reconciliation core needs.
/// Exists so `reconcile` can run against a fake in unit tests instead of
/// a real `AF_NETLINK` socket; `KernelChannel` is the only production
/// implementation.
pub trait KernelOps {
    fn set_address(
        &mut self,
        op: AddrOp,
        ifname: &str,
        addr_text: &str,
        family: Family,
        secondary: bool,
    ) -> Result<(), Error>;

    fn add_vlan_interface(
        &mut self,
        parent_ifname: &str,
        vlan_ifname: &str,
        vlan_tag: u16,
    ) -> Result<(), Error>;

    fn delete_link(&mut self, ifname: &str) -> Result<(), Error>;

    fn set_link_admin(&mut self, ifname: &str, status: &str) -> Result<(), Error>;

    fn dump_addresses(&mut self, family: Family) -> Result<HashMap<String, KernelPort>, Error>;
}

impl KernelOps for KernelChannel {
    fn set_address(
        &mut self,
        op: AddrOp,
        ifname: &str,
        addr_text: &str,
        family: Family,
        secondary: bool,
    ) -> Result<(), Error> {
        KernelChannel::set_address(self, op, ifname, addr_text, family, secondary)
    }

    fn add_vlan_interface(
        &mut self,
        parent_ifname: &str,
        vlan_ifname: &str,
        vlan_tag: u16,
    ) -> Result<(), Error> {
        KernelChannel::add_vlan_interface(self, parent_ifname, vlan_ifname, vlan_tag)
    }

    fn delete_link(&mut self, ifname: &str) -> Result<(), Error> {
        KernelChannel::delete_link(self, ifname)
    }

    fn set_link_admin(&mut self, ifname: &str, status: &str) -> Result<(), Error> {
        KernelChannel::set_link_admin(self, ifname, status)
    }

    fn dump_addresses(&mut self, family: Family) -> Result<HashMap<String, KernelPort>, Error> {
        KernelChannel::dump_addresses(self, family)
    }
}
