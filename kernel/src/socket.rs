//! `KernelChannel`: the netlink socket wrapper requests are sent over and
//! dump/notification replies are read from.

use std::collections::HashMap;
use std::ffi::CString;
use std::io::{Read, Write};
use std::mem::size_of;
use std::os::fd::{FromRawFd, OwnedFd};
use std::os::unix::net::UnixStream;

use crate::attr::{self, AddrOp};
use crate::dump::{self, KernelPort, ParseOutcome};
use crate::error::Error;
use crate::message::RequestBuilder;
use prefix::Family;

/// Large enough to hold a full `RTM_GETADDR` dump reply chunk; dumps arrive
/// as a sequence of recv()s regardless of this size, so it only bounds how
/// many round trips a large dump takes.
const DUMP_BUF_CAP: usize = 65536;

#[repr(C)]
struct SockAddrNl {
    nl_family: u16,
    nl_pad: u16,
    nl_pid: u32,
    nl_groups: u32,
}

/// An open `AF_NETLINK`/`NETLINK_ROUTE` socket, connected to the kernel so
/// that plain `read`/`write` move messages without per-call addressing.
pub struct KernelChannel {
    inner: UnixStream,
    seq: u32,
}

impl KernelChannel {
    pub fn new() -> Result<Self, Error> {
        // SAFETY: a plain socket(2) call with no pointers involved.
        let fd = unsafe { libc::socket(libc::AF_NETLINK, libc::SOCK_RAW, libc::NETLINK_ROUTE) };
        if fd < 0 {
            return Err(Error::KernelIoError(std::io::Error::last_os_error()));
        }

        let bind_addr = SockAddrNl {
            nl_family: libc::AF_NETLINK as u16,
            nl_pad: 0,
            nl_pid: 0,
            nl_groups: attr::RTMGRP_IPV4_IFADDR | attr::RTMGRP_IPV6_IFADDR,
        };
        // SAFETY: fd is a freshly created netlink socket; bind_addr is a
        // correctly sized sockaddr_nl.
        let rc = unsafe {
            libc::bind(
                fd,
                (&bind_addr as *const SockAddrNl).cast(),
                size_of::<SockAddrNl>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(Error::KernelIoError(err));
        }

        // Fix the kernel (pid 0, no group) as the default peer so later
        // read()/write() work without sendto/recvfrom addressing.
        let kernel_addr = SockAddrNl {
            nl_family: libc::AF_NETLINK as u16,
            nl_pad: 0,
            nl_pid: 0,
            nl_groups: 0,
        };
        // SAFETY: same as above.
        let rc = unsafe {
            libc::connect(
                fd,
                (&kernel_addr as *const SockAddrNl).cast(),
                size_of::<SockAddrNl>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(Error::KernelIoError(err));
        }

        // SAFETY: fd is owned exclusively from this point on.
        let owned = unsafe { OwnedFd::from_raw_fd(fd) };
        Ok(Self {
            inner: owned.into(),
            seq: 0,
        })
    }

    fn next_seq(&mut self) -> u32 {
        self.seq += 1;
        self.seq
    }

    fn send(&mut self, mut req: RequestBuilder) -> Result<(), Error> {
        let seq = self.next_seq();
        req.set_seq(seq);
        self.inner.write_all(&req.finish())?;
        Ok(())
    }

    fn ifindex(ifname: &str) -> Result<u32, Error> {
        let cname = CString::new(ifname)
            .map_err(|_| Error::BadArgument(format!("interface name '{ifname}' has a NUL")))?;
        // SAFETY: cname is a valid NUL-terminated C string.
        let index = unsafe { libc::if_nametoindex(cname.as_ptr()) };
        if index == 0 {
            return Err(Error::NoSuchInterface(ifname.to_string()));
        }
        Ok(index)
    }

    /// Add or delete an address on an interface.
    pub fn set_address(
        &mut self,
        op: AddrOp,
        ifname: &str,
        addr_text: &str,
        family: Family,
        secondary: bool,
    ) -> Result<(), Error> {
        let index = Self::ifindex(ifname)?;
        let (bytes, prefixlen) = prefix::parse(family, addr_text)?;

        let msg_type = match op {
            AddrOp::Add => attr::RTM_NEWADDR,
            AddrOp::Del => attr::RTM_DELADDR,
        };
        let flags = attr::NLM_F_REQUEST
            | if op == AddrOp::Add {
                attr::NLM_F_CREATE
            } else {
                0
            };
        let mut req = RequestBuilder::new(msg_type, flags);

        let ifa = attr::IfAddrMsg {
            ifa_family: attr::family_byte(family),
            ifa_prefixlen: prefixlen,
            ifa_flags: if secondary { attr::IFA_F_SECONDARY } else { 0 },
            ifa_scope: 0,
            ifa_index: index,
        };
        // SAFETY: IfAddrMsg is repr(C) POD.
        req.append_body(unsafe { attr::as_bytes(&ifa) })?;
        req.append_attr(attr::IFA_LOCAL, &bytes)?;

        log::debug!("{op:?} {addr_text} on {ifname} (secondary={secondary})");
        self.send(req)
    }

    /// Create a VLAN sub-interface of `parent_ifname` tagged `vlan_tag`.
    pub fn add_vlan_interface(
        &mut self,
        parent_ifname: &str,
        vlan_ifname: &str,
        vlan_tag: u16,
    ) -> Result<(), Error> {
        let parent_index = Self::ifindex(parent_ifname)?;

        let mut req = RequestBuilder::new(
            attr::RTM_NEWLINK,
            attr::NLM_F_REQUEST | attr::NLM_F_CREATE,
        );
        let ifi = attr::IfInfoMsg {
            ifi_family: attr::AF_UNSPEC,
            ifi_pad: 0,
            ifi_type: 0,
            ifi_index: 0,
            ifi_flags: 0,
            ifi_change: 0,
        };
        // SAFETY: IfInfoMsg is repr(C) POD.
        req.append_body(unsafe { attr::as_bytes(&ifi) })?;

        let linkinfo = req.begin_nested(attr::IFLA_LINKINFO)?;
        req.append_attr(attr::IFLA_INFO_KIND, b"vlan")?;
        let data = req.begin_nested(attr::IFLA_INFO_DATA)?;
        req.append_attr(attr::IFLA_VLAN_ID, &vlan_tag.to_ne_bytes())?;
        req.end_nested(data);
        req.end_nested(linkinfo);

        req.append_attr(attr::IFLA_LINK, &parent_index.to_ne_bytes())?;
        let mut name = vlan_ifname.as_bytes().to_vec();
        name.push(0);
        req.append_attr(attr::IFLA_IFNAME, &name)?;

        log::debug!("creating vlan interface {vlan_ifname} on {parent_ifname} tag {vlan_tag}");
        self.send(req)
    }

    /// Delete any link (VLAN sub-interface or otherwise) by name.
    pub fn delete_link(&mut self, ifname: &str) -> Result<(), Error> {
        let index = Self::ifindex(ifname)?;
        let mut req = RequestBuilder::new(attr::RTM_DELLINK, attr::NLM_F_REQUEST);
        let ifi = attr::IfInfoMsg {
            ifi_family: attr::AF_UNSPEC,
            ifi_pad: 0,
            ifi_type: 0,
            ifi_index: index as i32,
            ifi_flags: 0,
            ifi_change: 0,
        };
        // SAFETY: IfInfoMsg is repr(C) POD.
        req.append_body(unsafe { attr::as_bytes(&ifi) })?;

        log::debug!("deleting link {ifname}");
        self.send(req)
    }

    /// Set administrative up/down state. `status` must be exactly "up" or
    /// "down".
    pub fn set_link_admin(&mut self, ifname: &str, status: &str) -> Result<(), Error> {
        let up = match status {
            "up" => true,
            "down" => false,
            other => return Err(Error::BadArgument(format!("invalid link status '{other}'"))),
        };
        let index = Self::ifindex(ifname)?;

        let mut req = RequestBuilder::new(attr::RTM_NEWLINK, attr::NLM_F_REQUEST);
        let ifi = attr::IfInfoMsg {
            ifi_family: attr::AF_UNSPEC,
            ifi_pad: 0,
            ifi_type: 0,
            ifi_index: index as i32,
            ifi_flags: if up { attr::IFF_UP } else { 0 },
            ifi_change: attr::IFF_UP,
        };
        // SAFETY: IfInfoMsg is repr(C) POD.
        req.append_body(unsafe { attr::as_bytes(&ifi) })?;

        log::debug!("setting {ifname} {status}");
        self.send(req)
    }

    /// Dump every address currently configured on every interface for one
    /// family. Loops recv() until the multi-part reply ends.
    pub fn dump_addresses(&mut self, family: Family) -> Result<HashMap<String, KernelPort>, Error> {
        let mut req = RequestBuilder::new(attr::RTM_GETADDR, attr::NLM_F_REQUEST | attr::NLM_F_DUMP);
        let ifa = attr::IfAddrMsg {
            ifa_family: attr::family_byte(family),
            ifa_prefixlen: 0,
            ifa_flags: 0,
            ifa_scope: 0,
            ifa_index: 0,
        };
        // SAFETY: IfAddrMsg is repr(C) POD.
        req.append_body(unsafe { attr::as_bytes(&ifa) })?;
        self.send(req)?;

        let mut ports = HashMap::new();
        let mut buf = vec![0u8; DUMP_BUF_CAP];
        loop {
            let n = self.inner.read(&mut buf)?;
            if n == 0 {
                break;
            }
            if let ParseOutcome::Done = dump::parse_dump_buffer(&buf[..n], &mut ports) {
                break;
            }
        }
        Ok(ports)
    }

    /// Toggle forwarding for a family via `/proc/sys`. Failures are the
    /// caller's to log and ignore; not every container has these knobs
    /// writable.
    pub fn set_ip_forwarding(family: Family, enabled: bool) -> Result<(), Error> {
        let path = match family {
            Family::V4 => "/proc/sys/net/ipv4/ip_forward",
            Family::V6 => "/proc/sys/net/ipv6/conf/all/forwarding",
        };
        let digit = if enabled { "1" } else { "0" };
        std::fs::write(path, digit)?;
        Ok(())
    }
}
