//! rtnetlink wire structures and attribute constants.
//!
//! Layouts mirror `linux/rtnetlink.h` / `linux/if_link.h` bit-for-bit.
//! Defined locally rather than pulled from `libc` so the exact field
//! widths and ordering used on the wire are visible in one place.

use std::mem::size_of;

pub const NLA_ALIGNTO: usize = 4;

pub fn align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}

/// Operation requested of `set_address`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::enum_variant_names)]
pub enum AddrOp {
    Add,
    Del,
}

// Message types (RTM_*).
pub const RTM_NEWLINK: u16 = 16;
pub const RTM_DELLINK: u16 = 17;
pub const RTM_NEWADDR: u16 = 20;
pub const RTM_DELADDR: u16 = 21;
pub const RTM_GETADDR: u16 = 22;
pub const NLMSG_DONE: u16 = 3;
pub const NLMSG_ERROR: u16 = 2;

// nlmsg_flags bits.
pub const NLM_F_REQUEST: u16 = 0x01;
pub const NLM_F_MULTI: u16 = 0x02;
pub const NLM_F_ACK: u16 = 0x04;
pub const NLM_F_ROOT: u16 = 0x100;
pub const NLM_F_MATCH: u16 = 0x200;
pub const NLM_F_DUMP: u16 = NLM_F_ROOT | NLM_F_MATCH;
pub const NLM_F_CREATE: u16 = 0x400;

// Address families.
pub const AF_INET: u8 = 2;
pub const AF_INET6: u8 = 10;
pub const AF_UNSPEC: u8 = 0;

// ifa_scope values (rtnetlink.h).
pub const RT_SCOPE_LINK: u8 = 253;

// ifa_flags bits.
pub const IFA_F_SECONDARY: u8 = 0x01;

// IFA_* attribute types.
pub const IFA_ADDRESS: u16 = 1;
pub const IFA_LOCAL: u16 = 2;

// IFLA_* attribute types.
pub const IFLA_LINK: u16 = 5;
pub const IFLA_IFNAME: u16 = 3;
pub const IFLA_LINKINFO: u16 = 18;

// Nested inside IFLA_LINKINFO.
pub const IFLA_INFO_KIND: u16 = 1;
pub const IFLA_INFO_DATA: u16 = 2;

// Nested inside IFLA_INFO_DATA when IFLA_INFO_KIND == "vlan".
pub const IFLA_VLAN_ID: u16 = 1;

// ifi_flags / ifi_change bit.
pub const IFF_UP: u32 = 0x1;

// Netlink multicast group bits (joined at bind time).
pub const RTMGRP_IPV4_IFADDR: u32 = 0x10;
pub const RTMGRP_IPV6_IFADDR: u32 = 0x100;

pub fn family_byte(family: prefix::Family) -> u8 {
    match family {
        prefix::Family::V4 => AF_INET,
        prefix::Family::V6 => AF_INET6,
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct NlMsgHdr {
    pub nlmsg_len: u32,
    pub nlmsg_type: u16,
    pub nlmsg_flags: u16,
    pub nlmsg_seq: u32,
    pub nlmsg_pid: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct RtAttr {
    pub rta_len: u16,
    pub rta_type: u16,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct IfAddrMsg {
    pub ifa_family: u8,
    pub ifa_prefixlen: u8,
    pub ifa_flags: u8,
    pub ifa_scope: u8,
    pub ifa_index: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct IfInfoMsg {
    pub ifi_family: u8,
    pub ifi_pad: u8,
    pub ifi_type: u16,
    pub ifi_index: i32,
    pub ifi_flags: u32,
    pub ifi_change: u32,
}

pub const NLMSGHDR_LEN: usize = size_of::<NlMsgHdr>();
pub const RTATTR_LEN: usize = size_of::<RtAttr>();
pub const IFADDRMSG_LEN: usize = size_of::<IfAddrMsg>();
pub const IFINFOMSG_LEN: usize = size_of::<IfInfoMsg>();

/// Reinterpret a `#[repr(C)]` POD struct as its raw bytes.
///
/// # Safety
/// `T` must be `repr(C)` with no padding-sensitive invariants; only used
/// here on the fixed-layout netlink header structs above.
pub unsafe fn as_bytes<T: Copy>(value: &T) -> &[u8] {
    std::slice::from_raw_parts((value as *const T).cast::<u8>(), size_of::<T>())
}

/// Reinterpret a byte slice as a `#[repr(C)]` POD struct by copying it out.
///
/// # Safety
/// `data` must contain at least `size_of::<T>()` bytes laid out as `T`.
pub unsafe fn read_struct<T: Copy>(data: &[u8]) -> T {
    debug_assert!(data.len() >= size_of::<T>());
    std::ptr::read_unaligned(data.as_ptr().cast::<T>())
}
