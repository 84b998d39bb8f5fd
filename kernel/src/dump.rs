//! Parsing of `RTM_GETADDR` dump replies into per-interface address sets.

use std::collections::{HashMap, HashSet};
use std::ffi::CStr;

use crate::attr::{self, IfAddrMsg, NlMsgHdr, RtAttr, IFADDRMSG_LEN, NLMSGHDR_LEN, RTATTR_LEN};

/// One interface's address sets, aggregated from dump replies. Transient:
/// built by [`crate::KernelChannel::dump_addresses`] and [`merge_from`]
/// for the caller to union across families, then discarded once the
/// startup reconciliation pass completes.
#[derive(Debug, Clone, Default)]
pub struct KernelPort {
    pub name: String,
    pub v4: HashSet<String>,
    pub v6: HashSet<String>,
}

impl KernelPort {
    pub fn named(name: String) -> Self {
        Self {
            name,
            v4: HashSet::new(),
            v6: HashSet::new(),
        }
    }

    /// Union this port's address sets with another's (same interface).
    pub fn merge_from(&mut self, other: KernelPort) {
        self.v4.extend(other.v4);
        self.v6.extend(other.v6);
    }
}

pub(crate) enum ParseOutcome {
    Continue,
    Done,
}

/// Parse every `nlmsghdr` in one recv buffer, folding any `RTM_NEWADDR`
/// messages into `ports`. Returns whether the multi-part reply is done
/// (a `NLMSG_DONE` message, or any message lacking `NLM_F_MULTI`).
pub(crate) fn parse_dump_buffer(
    buf: &[u8],
    ports: &mut HashMap<String, KernelPort>,
) -> ParseOutcome {
    let mut offset = 0;
    while offset + NLMSGHDR_LEN <= buf.len() {
        // SAFETY: bounds checked above.
        let hdr: NlMsgHdr = unsafe { attr::read_struct(&buf[offset..]) };
        let msg_len = hdr.nlmsg_len as usize;
        if msg_len < NLMSGHDR_LEN || offset + msg_len > buf.len() {
            log::warn!("dropping truncated netlink message at offset {offset}");
            break;
        }

        if hdr.nlmsg_type == attr::NLMSG_DONE {
            return ParseOutcome::Done;
        }
        if hdr.nlmsg_type == attr::RTM_NEWADDR {
            parse_newaddr(&buf[offset..offset + msg_len], ports);
        }

        if hdr.nlmsg_flags & attr::NLM_F_MULTI == 0 {
            return ParseOutcome::Done;
        }
        offset += attr::align(msg_len);
    }
    ParseOutcome::Continue
}

fn parse_newaddr(msg: &[u8], ports: &mut HashMap<String, KernelPort>) {
    let body = &msg[NLMSGHDR_LEN..];
    if body.len() < IFADDRMSG_LEN {
        return;
    }
    // SAFETY: length checked above.
    let ifa: IfAddrMsg = unsafe { attr::read_struct(body) };

    let ifname = match index_to_name(ifa.ifa_index) {
        Some(n) => n,
        None => return,
    };

    apply_newaddr(&ifa, ifname, &body[IFADDRMSG_LEN..], ports);
}

/// Fold one already-resolved `RTM_NEWADDR` message's attributes into
/// `ports`. Split out from [`parse_newaddr`] so the attribute-walking and
/// filtering logic can be exercised without a real interface index to
/// resolve via `if_indextoname`.
fn apply_newaddr(ifa: &IfAddrMsg, ifname: String, attrs: &[u8], ports: &mut HashMap<String, KernelPort>) {
    if ifname == "lo" {
        return;
    }
    if ifa.ifa_family == attr::AF_INET6 && ifa.ifa_scope == attr::RT_SCOPE_LINK {
        log::trace!("ignoring link-local v6 address on {ifname}");
        return;
    }

    let mut offset = 0;
    let mut local: Option<Vec<u8>> = None;
    let mut address: Option<Vec<u8>> = None;
    while offset + RTATTR_LEN <= attrs.len() {
        // SAFETY: bounds checked above.
        let rta: RtAttr = unsafe { attr::read_struct(&attrs[offset..]) };
        let rta_len = rta.rta_len as usize;
        if rta_len < RTATTR_LEN || offset + rta_len > attrs.len() {
            break;
        }
        let payload = &attrs[offset + RTATTR_LEN..offset + rta_len];
        match rta.rta_type {
            attr::IFA_LOCAL => local = Some(payload.to_vec()),
            attr::IFA_ADDRESS => address = Some(payload.to_vec()),
            _ => {}
        }
        offset += attr::align(rta_len);
    }

    let addr_bytes = match local.or(address) {
        Some(b) => b,
        None => return,
    };
    let family = if ifa.ifa_family == attr::AF_INET {
        prefix::Family::V4
    } else {
        prefix::Family::V6
    };
    if addr_bytes.len() != family.byte_len() {
        log::warn!("address length mismatch for {ifname}, dropping");
        return;
    }
    let text = prefix::canonical(family, &addr_bytes, ifa.ifa_prefixlen);

    let port = ports
        .entry(ifname.clone())
        .or_insert_with(|| KernelPort::named(ifname));
    match family {
        prefix::Family::V4 => {
            port.v4.insert(text);
        }
        prefix::Family::V6 => {
            port.v6.insert(text);
        }
    }
}

fn index_to_name(index: u32) -> Option<String> {
    let mut buf = [0u8; libc::IF_NAMESIZE];
    // SAFETY: buf is IF_NAMESIZE bytes, matching if_indextoname's contract.
    let ptr = unsafe { libc::if_indextoname(index, buf.as_mut_ptr().cast::<libc::c_char>()) };
    if ptr.is_null() {
        return None;
    }
    // SAFETY: if_indextoname null-terminates on success.
    let cstr = unsafe { CStr::from_ptr(ptr) };
    Some(cstr.to_string_lossy().into_owned())
}
