//! C ABI layout of the `ip_queue` payload structures.
//!
//! The kernel reads and writes these as plain C structs, so field widths
//! follow the platform's `unsigned long`/`long`/`size_t` and offsets follow
//! natural alignment. Everything here is computed at compile time.

use std::ffi::c_ulong;
use std::mem::size_of;

/// Width of C `unsigned long` / `long`.
pub const ULONG: usize = size_of::<c_ulong>();
/// Width of C `size_t`.
pub const SIZE_T: usize = size_of::<usize>();
/// Width of C `unsigned int` / `int`.
pub const UINT: usize = 4;
/// Interface name length (`IFNAMSIZ`).
pub const IFNAMSIZ: usize = 16;
/// Hardware address field length.
pub const HW_ADDR_MAX: usize = 8;

const fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) & !(align - 1)
}

const fn max(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

/// `struct ipq_mode_msg { unsigned char value; size_t range; }`
pub mod mode {
    use super::*;

    pub const VALUE: usize = 0;
    pub const RANGE: usize = align_up(VALUE + 1, SIZE_T);
    pub const SIZE: usize = align_up(RANGE + SIZE_T, SIZE_T);
}

/// `struct ipq_verdict_msg { unsigned int value; unsigned long id; size_t data_len; unsigned char payload[0]; }`
pub mod verdict {
    use super::*;

    pub const VALUE: usize = 0;
    pub const ID: usize = align_up(VALUE + UINT, ULONG);
    pub const DATA_LEN: usize = align_up(ID + ULONG, SIZE_T);
    pub const SIZE: usize = align_up(DATA_LEN + SIZE_T, max(ULONG, SIZE_T));
}

/// `struct ipq_packet_msg`, the queued packet notification.
pub mod packet {
    use super::*;

    pub const PACKET_ID: usize = 0;
    pub const MARK: usize = PACKET_ID + ULONG;
    pub const TIMESTAMP_SEC: usize = MARK + ULONG;
    pub const TIMESTAMP_USEC: usize = TIMESTAMP_SEC + ULONG;
    pub const HOOK: usize = TIMESTAMP_USEC + ULONG;
    pub const INDEV_NAME: usize = HOOK + UINT;
    pub const OUTDEV_NAME: usize = INDEV_NAME + IFNAMSIZ;
    pub const HW_PROTOCOL: usize = OUTDEV_NAME + IFNAMSIZ;
    pub const HW_TYPE: usize = HW_PROTOCOL + 2;
    pub const HW_ADDRLEN: usize = HW_TYPE + 2;
    pub const HW_ADDR: usize = HW_ADDRLEN + 1;
    pub const DATA_LEN: usize = align_up(HW_ADDR + HW_ADDR_MAX, SIZE_T);
    pub const PAYLOAD: usize = DATA_LEN + SIZE_T;
    pub const SIZE: usize = align_up(PAYLOAD, max(ULONG, SIZE_T));
}

/// `struct nlmsgerr { int error; struct nlmsghdr msg; }`
pub mod error {
    use super::*;
    use crate::protocol::wire_format::HEADER_SIZE;

    pub const CODE: usize = 0;
    pub const ECHOED_HEADER: usize = CODE + UINT;
    pub const SIZE: usize = ECHOED_HEADER + HEADER_SIZE;
}

/// Size of `union ipq_peer_msg`. The kernel rejects any agent message whose
/// payload is shorter than this, whatever it actually carries.
pub const PEER_MSG_SIZE: usize = max(mode::SIZE, verdict::SIZE);
