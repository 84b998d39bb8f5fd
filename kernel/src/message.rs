//! Builds netlink request messages into a fixed tail-capacity buffer,
//! patching nested attribute lengths after their children are appended.

use crate::attr::{self, NlMsgHdr, NLMSGHDR_LEN, RTATTR_LEN};
use crate::error::Error;

/// Total buffer capacity for one request. The messages this daemon sends
/// (address add/delete, link create/delete/up-down) are all small; this
/// leaves well over the required 128-byte tail beyond the largest header
/// (`ifinfomsg`) plus a handful of attributes.
const BUF_CAP: usize = 256;

/// Offset of a previously-written `rtattr` header, used to patch its
/// `rta_len` once all of its nested children have been appended.
pub struct NestedMark(usize);

pub struct RequestBuilder {
    buf: [u8; BUF_CAP],
    len: usize,
}

impl RequestBuilder {
    pub fn new(msg_type: u16, flags: u16) -> Self {
        let mut buf = [0u8; BUF_CAP];
        let hdr = NlMsgHdr {
            nlmsg_len: NLMSGHDR_LEN as u32,
            nlmsg_type: msg_type,
            nlmsg_flags: flags,
            nlmsg_seq: 0,
            nlmsg_pid: 0,
        };
        // SAFETY: NlMsgHdr is repr(C) POD and buf is large enough.
        let bytes = unsafe { attr::as_bytes(&hdr) };
        buf[..NLMSGHDR_LEN].copy_from_slice(bytes);
        Self {
            buf,
            len: NLMSGHDR_LEN,
        }
    }

    pub fn set_seq(&mut self, seq: u32) {
        self.buf[8..12].copy_from_slice(&seq.to_ne_bytes());
    }

    fn bump_len(&mut self, total_added: usize) -> Result<(), Error> {
        if self.len + total_added > BUF_CAP {
            return Err(Error::BufferFull);
        }
        self.len += total_added;
        self.buf[0..4].copy_from_slice(&(self.len as u32).to_ne_bytes());
        Ok(())
    }

    /// Append a fixed `repr(C)` body (`ifaddrmsg`/`ifinfomsg`) right after
    /// the netlink header.
    pub fn append_body(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let aligned = attr::align(bytes.len());
        if self.len + aligned > BUF_CAP {
            return Err(Error::BufferFull);
        }
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.bump_len(aligned)
    }

    /// Append one TLV attribute: 4-byte header, payload, padding to a
    /// 4-byte boundary. Returns the offset of the attribute's header so
    /// callers needing a nested attribute can patch its length later.
    pub fn append_attr(&mut self, attr_type: u16, payload: &[u8]) -> Result<NestedMark, Error> {
        let total_len = RTATTR_LEN + payload.len();
        let aligned = attr::align(total_len);
        if self.len + aligned > BUF_CAP {
            return Err(Error::BufferFull);
        }

        let mark = self.len;
        self.buf[mark..mark + 2].copy_from_slice(&(total_len as u16).to_ne_bytes());
        self.buf[mark + 2..mark + 4].copy_from_slice(&attr_type.to_ne_bytes());
        self.buf[mark + RTATTR_LEN..mark + total_len].copy_from_slice(payload);

        self.bump_len(aligned)?;
        Ok(NestedMark(mark))
    }

    /// Begin a nested attribute (e.g. `IFLA_LINKINFO`) with no payload of
    /// its own; its `rta_len` is patched in [`Self::end_nested`] once all
    /// children have been appended.
    pub fn begin_nested(&mut self, attr_type: u16) -> Result<NestedMark, Error> {
        self.append_attr(attr_type, &[])
    }

    /// Patch `mark`'s `rta_len` to span from its header to the current
    /// tail of the buffer, enclosing every attribute appended since.
    pub fn end_nested(&mut self, mark: NestedMark) {
        let span = (self.len - mark.0) as u16;
        self.buf[mark.0..mark.0 + 2].copy_from_slice(&span.to_ne_bytes());
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf[..self.len].to_vec()
    }
}
