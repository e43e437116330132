//! Encoders and decoders for the `ip_queue` payloads.
//!
//! All padding and buffer sizing for the protocol lives here. Outbound
//! messages go through [`build_request`], which pads every payload to
//! [`PEER_MSG_SIZE`]; inbound payloads are length-checked against their C
//! layout before any field is read.

use bytes::{Buf, BufMut, Bytes};

use crate::error::{IpqError, Result};
use crate::protocol::layout::{self, SIZE_T, UINT, ULONG};
use crate::protocol::{
    build_request, message_type, nlmsg_align, CopyMode, Decision, ErrorNotification, Header,
    ModeConfig, PacketEvent, Verdict, HEADER_SIZE, PEER_MSG_SIZE,
};

/// Largest copy range the kernel honours.
pub const MAX_COPY_RANGE: usize = 0xFFFF;

/// Build the mode negotiation message.
pub fn encode_mode_config(config: &ModeConfig, sequence: u32, origin_id: u32) -> Bytes {
    use layout::mode::*;

    build_request(message_type::MODE, SIZE, sequence, origin_id, |payload| {
        payload[VALUE] = config.mode.as_wire();
        put_word(payload, RANGE, SIZE_T, config.range as u64);
    })
}

/// Build a verdict message for one packet.
pub fn encode_verdict(verdict: &Verdict, sequence: u32, origin_id: u32) -> Bytes {
    use layout::verdict::*;

    build_request(message_type::VERDICT, SIZE, sequence, origin_id, |payload| {
        put_word(payload, VALUE, UINT, u64::from(verdict.decision.as_wire()));
        put_word(payload, ID, ULONG, verdict.packet_id);
        put_word(payload, DATA_LEN, SIZE_T, 0);
    })
}

/// Decode an `IPQM_PACKET` payload.
pub fn decode_packet_event(payload: &Bytes) -> Result<PacketEvent> {
    use layout::packet::*;

    require_len("packet event", payload, SIZE)?;

    let hw_addrlen = usize::from(payload[HW_ADDRLEN]).min(layout::HW_ADDR_MAX);
    let data_len = get_word(payload, DATA_LEN, SIZE_T) as usize;
    let copied_end = PAYLOAD.saturating_add(data_len).min(payload.len());

    Ok(PacketEvent {
        packet_id: get_word(payload, PACKET_ID, ULONG),
        mark: get_word(payload, MARK, ULONG),
        timestamp_sec: get_signed_word(payload, TIMESTAMP_SEC, ULONG),
        timestamp_usec: get_signed_word(payload, TIMESTAMP_USEC, ULONG),
        hook: get_word(payload, HOOK, UINT) as u32,
        indev_name: c_string(&payload[INDEV_NAME..INDEV_NAME + layout::IFNAMSIZ]),
        outdev_name: c_string(&payload[OUTDEV_NAME..OUTDEV_NAME + layout::IFNAMSIZ]),
        hw_protocol: u16::from_be_bytes([payload[HW_PROTOCOL], payload[HW_PROTOCOL + 1]]),
        hw_type: (&payload[HW_TYPE..HW_TYPE + 2]).get_u16_ne(),
        hw_addr: payload.slice(HW_ADDR..HW_ADDR + hw_addrlen),
        data_len,
        payload: payload.slice(PAYLOAD..copied_end),
    })
}

/// Decode an `NLMSG_ERROR` payload.
///
/// Only the error code is mandatory; the echoed request header is decoded
/// when present.
pub fn decode_error(payload: &[u8]) -> Result<ErrorNotification> {
    use layout::error::*;

    require_len("error notification", payload, ECHOED_HEADER)?;

    Ok(ErrorNotification {
        code: (&payload[CODE..CODE + UINT]).get_i32_ne(),
        offending: Header::decode(&payload[ECHOED_HEADER..]),
    })
}

/// Decode a mode negotiation payload.
pub fn decode_mode_config(payload: &[u8]) -> Result<ModeConfig> {
    use layout::mode::*;

    require_len("mode config", payload, PEER_MSG_SIZE)?;

    let mode = CopyMode::from_wire(payload[VALUE]).ok_or_else(|| {
        IpqError::decode(format!("unknown copy mode {}", payload[VALUE]))
    })?;
    Ok(ModeConfig {
        mode,
        range: get_word(payload, RANGE, SIZE_T) as usize,
    })
}

/// Decode a verdict payload.
pub fn decode_verdict(payload: &[u8]) -> Result<Verdict> {
    use layout::verdict::*;

    require_len("verdict", payload, PEER_MSG_SIZE)?;

    let value = get_word(payload, VALUE, UINT) as u32;
    let decision = Decision::from_wire(value)
        .ok_or_else(|| IpqError::decode(format!("unknown verdict value {}", value)))?;
    Ok(Verdict {
        packet_id: get_word(payload, ID, ULONG),
        decision,
    })
}

/// Receive buffer size needed for the given copy mode.
///
/// Never smaller than a header plus [`PEER_MSG_SIZE`].
pub fn receive_capacity(config: &ModeConfig) -> usize {
    let copied = match config.mode {
        CopyMode::Packet if config.range == 0 => MAX_COPY_RANGE,
        CopyMode::Packet => config.range.min(MAX_COPY_RANGE),
        CopyMode::None | CopyMode::Meta => 0,
    };
    HEADER_SIZE + nlmsg_align(PEER_MSG_SIZE.max(layout::packet::SIZE + copied))
}

fn require_len(what: &str, payload: &[u8], needed: usize) -> Result<()> {
    if payload.len() < needed {
        return Err(IpqError::decode(format!(
            "{} payload is {} bytes, expected at least {}",
            what,
            payload.len(),
            needed
        )));
    }
    Ok(())
}

fn put_word(dst: &mut [u8], offset: usize, width: usize, value: u64) {
    let mut slot = &mut dst[offset..offset + width];
    match width {
        8 => slot.put_u64_ne(value),
        _ => slot.put_u32_ne(value as u32),
    }
}

fn get_word(src: &[u8], offset: usize, width: usize) -> u64 {
    let mut slot = &src[offset..offset + width];
    match width {
        8 => slot.get_u64_ne(),
        _ => u64::from(slot.get_u32_ne()),
    }
}

fn get_signed_word(src: &[u8], offset: usize, width: usize) -> i64 {
    let mut slot = &src[offset..offset + width];
    match width {
        8 => slot.get_i64_ne(),
        _ => i64::from(slot.get_i32_ne()),
    }
}

fn c_string(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{flags, Frame};

    fn packet_payload(packet_id: u64, data: &[u8]) -> Bytes {
        use layout::packet::*;

        let mut buf = vec![0u8; SIZE + data.len()];
        put_word(&mut buf, PACKET_ID, ULONG, packet_id);
        put_word(&mut buf, MARK, ULONG, 0x2A);
        put_word(&mut buf, TIMESTAMP_SEC, ULONG, 1_700_000_000);
        put_word(&mut buf, TIMESTAMP_USEC, ULONG, 250);
        put_word(&mut buf, HOOK, UINT, 3);
        buf[INDEV_NAME..INDEV_NAME + 4].copy_from_slice(b"eth0");
        buf[OUTDEV_NAME..OUTDEV_NAME + 2].copy_from_slice(b"lo");
        buf[HW_PROTOCOL..HW_PROTOCOL + 2].copy_from_slice(&0x0800u16.to_be_bytes());
        (&mut buf[HW_TYPE..HW_TYPE + 2]).put_u16_ne(1);
        buf[HW_ADDRLEN] = 6;
        buf[HW_ADDR..HW_ADDR + 6].copy_from_slice(&[0, 0x11, 0x22, 0x33, 0x44, 0x55]);
        put_word(&mut buf, DATA_LEN, SIZE_T, data.len() as u64);
        buf[PAYLOAD..PAYLOAD + data.len()].copy_from_slice(data);
        Bytes::from(buf)
    }

    #[test]
    fn test_mode_config_is_padded_to_peer_msg() {
        let bytes = encode_mode_config(&ModeConfig::new(CopyMode::Meta, 0), 0, 4242);
        let frame = Frame::parse(bytes.clone()).unwrap();

        assert_eq!(frame.header.message_type, message_type::MODE);
        assert_eq!(frame.header.flags, flags::REQUEST);
        assert_eq!(frame.header.origin_id, 4242);
        assert!(frame.payload().len() >= PEER_MSG_SIZE);
        assert_eq!(frame.header.length as usize, HEADER_SIZE + frame.payload().len());
        assert_eq!(bytes.len(), frame.header.length as usize);
    }

    #[test]
    fn test_mode_config_fields() {
        let bytes = encode_mode_config(&ModeConfig::new(CopyMode::Packet, 128), 9, 1);
        let frame = Frame::parse(bytes).unwrap();
        let decoded = decode_mode_config(frame.payload()).unwrap();

        assert_eq!(decoded, ModeConfig::new(CopyMode::Packet, 128));
        assert_eq!(frame.sequence(), 9);
    }

    #[test]
    fn test_verdict_is_padded_and_echoes_id() {
        let verdict = Verdict::new(0xDEAD_BEEF, Decision::Drop);
        let bytes = encode_verdict(&verdict, 1, 7);
        let frame = Frame::parse(bytes).unwrap();

        assert_eq!(frame.header.message_type, message_type::VERDICT);
        assert!(frame.payload().len() >= PEER_MSG_SIZE);
        assert_eq!(frame.header.length as usize, HEADER_SIZE + frame.payload().len());
        assert_eq!(decode_verdict(frame.payload()).unwrap(), verdict);
    }

    #[test]
    fn test_verdict_data_len_is_zero() {
        let bytes = encode_verdict(&Verdict::new(5, Decision::Accept), 0, 0);
        let frame = Frame::parse(bytes).unwrap();
        let data_len = get_word(frame.payload(), layout::verdict::DATA_LEN, SIZE_T);
        assert_eq!(data_len, 0);
    }

    #[test]
    fn test_decode_packet_event_metadata() {
        let event = decode_packet_event(&packet_payload(42, &[])).unwrap();

        assert_eq!(event.packet_id, 42);
        assert_eq!(event.mark, 0x2A);
        assert_eq!(event.timestamp_sec, 1_700_000_000);
        assert_eq!(event.timestamp_usec, 250);
        assert_eq!(event.hook, 3);
        assert_eq!(event.indev_name, "eth0");
        assert_eq!(event.outdev_name, "lo");
        assert_eq!(event.hw_protocol, 0x0800);
        assert_eq!(event.hw_type, 1);
        assert_eq!(&event.hw_addr[..], &[0, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(event.data_len, 0);
        assert!(event.payload.is_empty());
    }

    #[test]
    fn test_decode_packet_event_clips_payload() {
        let mut raw = packet_payload(1, b"abcd").to_vec();
        raw.extend_from_slice(b"trailing");
        let event = decode_packet_event(&Bytes::from(raw)).unwrap();
        assert_eq!(&event.payload[..], b"abcd");

        // data_len larger than what was copied
        let mut raw = packet_payload(1, b"abcd").to_vec();
        put_word(&mut raw, layout::packet::DATA_LEN, SIZE_T, 1500);
        let event = decode_packet_event(&Bytes::from(raw)).unwrap();
        assert_eq!(event.data_len, 1500);
        assert_eq!(&event.payload[..], b"abcd");
    }

    #[test]
    fn test_decode_packet_event_too_short() {
        let raw = Bytes::from(vec![0u8; layout::packet::SIZE - 1]);
        let err = decode_packet_event(&raw).unwrap_err();
        assert!(err.to_string().contains("packet event"));
    }

    #[test]
    fn test_decode_error_with_echoed_header() {
        let echoed = Header::new(message_type::VERDICT, 40, flags::REQUEST, 12, 99);
        let mut raw = (-7i32).to_ne_bytes().to_vec();
        raw.extend_from_slice(&echoed.encode());

        let notification = decode_error(&raw).unwrap();
        assert_eq!(notification.code, -7);
        assert_eq!(notification.offending, Some(echoed));
    }

    #[test]
    fn test_decode_error_code_only() {
        let notification = decode_error(&7i32.to_ne_bytes()).unwrap();
        assert_eq!(notification.code, 7);
        assert!(notification.offending.is_none());

        assert!(decode_error(&[0u8; 3]).is_err());
    }

    #[test]
    fn test_decode_verdict_rejects_unknown_value() {
        let mut raw = vec![0u8; PEER_MSG_SIZE];
        put_word(&mut raw, layout::verdict::VALUE, UINT, 9);
        assert!(decode_verdict(&raw).is_err());
    }

    #[test]
    fn test_receive_capacity() {
        let meta = receive_capacity(&ModeConfig::new(CopyMode::Meta, 0));
        assert_eq!(meta, HEADER_SIZE + nlmsg_align(layout::packet::SIZE));
        assert!(meta >= HEADER_SIZE + PEER_MSG_SIZE);

        let ranged = receive_capacity(&ModeConfig::new(CopyMode::Packet, 128));
        assert_eq!(ranged, HEADER_SIZE + nlmsg_align(layout::packet::SIZE + 128));

        let whole = receive_capacity(&ModeConfig::new(CopyMode::Packet, 0));
        assert_eq!(whole, HEADER_SIZE + nlmsg_align(layout::packet::SIZE + MAX_COPY_RANGE));

        let capped = receive_capacity(&ModeConfig::new(CopyMode::Packet, 1 << 20));
        assert_eq!(capped, whole);
    }
}
