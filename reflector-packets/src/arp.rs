use crate::{
    EthernetFrame, Identity, MacAddr, PacketData, Reject, ARP_ETHER_TYPE, ETHERNET_HEADER_LEN,
    IPV4_ETHER_TYPE,
};
use std::convert::TryInto;
use std::net::Ipv4Addr;

/// Total wire length of an address-resolution frame: 14 byte Ethernet header
/// plus the 28 byte ARP body for 6/4 address lengths. The parser hands the
/// validator exactly this many bytes; a frame shorter than this never exists
/// as a value.
pub const ARP_FRAME_LEN: usize = 42;

pub enum ArpOp {
    Request = 1,
    Reply = 2,
}

pub enum ArpHardwareType {
    Ethernet = 1,
}

// Field offsets within the ARP body (relative to the end of the Ethernet
// header), per RFC 826 with 6-byte hardware and 4-byte protocol addresses.
const HARDWARE_TYPE_RANGE: (usize, usize) = (0, 2);
const PROTOCOL_TYPE_RANGE: (usize, usize) = (2, 4);
const HARDWARE_ADDR_LEN_RANGE: (usize, usize) = (4, 5);
const PROTOCOL_ADDR_LEN_RANGE: (usize, usize) = (5, 6);
const OPCODE_RANGE: (usize, usize) = (6, 8);
const SENDER_HARDWARE_ADDR_RANGE: (usize, usize) = (8, 14);
const SENDER_PROTOCOL_ADDR_RANGE: (usize, usize) = (14, 18);
const TARGET_HARDWARE_ADDR_RANGE: (usize, usize) = (18, 24);
const TARGET_PROTOCOL_ADDR_RANGE: (usize, usize) = (24, 28);

///
/// EthernetFrame wrapper with getters/setters for the packet structure
/// described in RFC 826, fixed to 6-byte hardware / 4-byte protocol
/// addresses.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArpFrame {
    frame: EthernetFrame,
}

impl ArpFrame {
    ///
    /// Constructs an empty frame with the template fields of the protocol
    /// variant already in place: ARP ether type, Ethernet hardware type,
    /// IPv4 protocol type, 6/4 address lengths. Addresses and opcode are
    /// zero.
    ///
    pub fn empty() -> Self {
        let mut frame = EthernetFrame::empty();
        frame.set_payload(&[0; ARP_FRAME_LEN - ETHERNET_HEADER_LEN]);
        frame.set_ether_type(ARP_ETHER_TYPE);

        let mut arp_frame = ArpFrame { frame };
        arp_frame.set_hardware_type(ArpHardwareType::Ethernet as u16);
        arp_frame.set_protocol_type(IPV4_ETHER_TYPE);
        arp_frame.set_hardware_addr_len(6);
        arp_frame.set_protocol_addr_len(4);
        arp_frame
    }

    /// Wraps an already complete frame without semantic validation; only the
    /// length is checked.
    pub fn from_buffer(data: PacketData) -> Result<ArpFrame, &'static str> {
        if data.len() != ARP_FRAME_LEN {
            return Err("Data is not the length of a resolution frame");
        }
        Ok(ArpFrame {
            frame: EthernetFrame::from_buffer(data)?,
        })
    }

    ///
    /// Runs the fixed-order validation chain against a complete candidate
    /// frame. Checks short-circuit: exactly one `Reject` is reported for a
    /// bad frame, and the destination-address check runs first, echo
    /// protection second, structural fields after that, the target-IP check
    /// last. Only an `Ok` frame is ever answered.
    ///
    /// `data` must be a complete frame of `ARP_FRAME_LEN` bytes; the parser
    /// guarantees this.
    ///
    pub fn validate_request(data: PacketData, identity: Identity) -> Result<ArpFrame, Reject> {
        assert_eq!(
            data.len(),
            ARP_FRAME_LEN,
            "candidate must be a complete ARP frame"
        );
        let candidate = ArpFrame {
            frame: EthernetFrame { data },
        };

        let dest = candidate.dest_mac();
        if dest != identity.mac && !dest.is_broadcast() {
            return Err(Reject::NotForUs);
        }
        if candidate.src_mac() == identity.mac {
            return Err(Reject::EchoOfSelf);
        }
        if candidate.ether_type() != ARP_ETHER_TYPE {
            return Err(Reject::WrongEtherType);
        }
        if candidate.hardware_type() != ArpHardwareType::Ethernet as u16 {
            return Err(Reject::WrongHardwareType);
        }
        if candidate.protocol_type() != IPV4_ETHER_TYPE {
            return Err(Reject::WrongProtocolType);
        }
        if candidate.hardware_addr_len() != 6 {
            return Err(Reject::WrongHardwareLen);
        }
        if candidate.protocol_addr_len() != 4 {
            return Err(Reject::WrongProtocolLen);
        }
        if candidate.opcode() != ArpOp::Request as u16 {
            return Err(Reject::WrongOpcode);
        }
        if candidate.target_protocol_addr() != identity.ip {
            return Err(Reject::NotOurAddress);
        }
        Ok(candidate)
    }

    ///
    /// Builds the reply frame for a validated request: destination is the
    /// requester, the sender fields carry our identity, and the target
    /// fields carry the requester's sender fields.
    ///
    pub fn build_reply(&self, identity: Identity) -> ArpFrame {
        let mut reply = ArpFrame::empty();
        reply.set_dest_mac(self.src_mac());
        reply.set_src_mac(identity.mac);
        reply.set_opcode(ArpOp::Reply as u16);
        reply.set_sender_hardware_addr(identity.mac);
        reply.set_sender_protocol_addr(identity.ip);
        reply.set_target_hardware_addr(self.sender_hardware_addr());
        reply.set_target_protocol_addr(self.sender_protocol_addr());
        reply
    }

    pub fn dest_mac(&self) -> MacAddr {
        self.frame.dest_mac()
    }

    pub fn src_mac(&self) -> MacAddr {
        self.frame.src_mac()
    }

    pub fn set_dest_mac(&mut self, mac: MacAddr) {
        self.frame.set_dest_mac(mac);
    }

    pub fn set_src_mac(&mut self, mac: MacAddr) {
        self.frame.set_src_mac(mac);
    }

    pub fn ether_type(&self) -> u16 {
        self.frame.ether_type()
    }

    pub fn hardware_type(&self) -> u16 {
        let (start, end) = HARDWARE_TYPE_RANGE;
        u16::from_be_bytes(self.arp_data(start, end).try_into().unwrap())
    }

    pub fn protocol_type(&self) -> u16 {
        let (start, end) = PROTOCOL_TYPE_RANGE;
        u16::from_be_bytes(self.arp_data(start, end).try_into().unwrap())
    }

    pub fn hardware_addr_len(&self) -> u8 {
        let (start, _) = HARDWARE_ADDR_LEN_RANGE;
        self.arp_data(start, start + 1)[0]
    }

    pub fn protocol_addr_len(&self) -> u8 {
        let (start, _) = PROTOCOL_ADDR_LEN_RANGE;
        self.arp_data(start, start + 1)[0]
    }

    pub fn opcode(&self) -> u16 {
        let (start, end) = OPCODE_RANGE;
        u16::from_be_bytes(self.arp_data(start, end).try_into().unwrap())
    }

    pub fn sender_hardware_addr(&self) -> MacAddr {
        let (start, end) = SENDER_HARDWARE_ADDR_RANGE;
        MacAddr::new(self.arp_data(start, end).try_into().unwrap())
    }

    pub fn sender_protocol_addr(&self) -> Ipv4Addr {
        let (start, end) = SENDER_PROTOCOL_ADDR_RANGE;
        let octets: [u8; 4] = self.arp_data(start, end).try_into().unwrap();
        Ipv4Addr::from(octets)
    }

    pub fn target_hardware_addr(&self) -> MacAddr {
        let (start, end) = TARGET_HARDWARE_ADDR_RANGE;
        MacAddr::new(self.arp_data(start, end).try_into().unwrap())
    }

    pub fn target_protocol_addr(&self) -> Ipv4Addr {
        let (start, end) = TARGET_PROTOCOL_ADDR_RANGE;
        let octets: [u8; 4] = self.arp_data(start, end).try_into().unwrap();
        Ipv4Addr::from(octets)
    }

    pub fn set_hardware_type(&mut self, htype: u16) {
        let (start, end) = HARDWARE_TYPE_RANGE;
        self.set_arp_data(&htype.to_be_bytes(), start, end);
    }

    pub fn set_protocol_type(&mut self, ptype: u16) {
        let (start, end) = PROTOCOL_TYPE_RANGE;
        self.set_arp_data(&ptype.to_be_bytes(), start, end);
    }

    pub fn set_hardware_addr_len(&mut self, len: u8) {
        let (start, end) = HARDWARE_ADDR_LEN_RANGE;
        self.set_arp_data(&[len], start, end);
    }

    pub fn set_protocol_addr_len(&mut self, len: u8) {
        let (start, end) = PROTOCOL_ADDR_LEN_RANGE;
        self.set_arp_data(&[len], start, end);
    }

    pub fn set_opcode(&mut self, code: u16) {
        let (start, end) = OPCODE_RANGE;
        self.set_arp_data(&code.to_be_bytes(), start, end);
    }

    pub fn set_sender_hardware_addr(&mut self, addr: MacAddr) {
        let (start, end) = SENDER_HARDWARE_ADDR_RANGE;
        self.set_arp_data(&addr.bytes, start, end);
    }

    pub fn set_sender_protocol_addr(&mut self, addr: Ipv4Addr) {
        let (start, end) = SENDER_PROTOCOL_ADDR_RANGE;
        self.set_arp_data(&addr.octets(), start, end);
    }

    pub fn set_target_hardware_addr(&mut self, addr: MacAddr) {
        let (start, end) = TARGET_HARDWARE_ADDR_RANGE;
        self.set_arp_data(&addr.bytes, start, end);
    }

    pub fn set_target_protocol_addr(&mut self, addr: Ipv4Addr) {
        let (start, end) = TARGET_PROTOCOL_ADDR_RANGE;
        self.set_arp_data(&addr.octets(), start, end);
    }

    // Move ownership of the frame back to the caller
    pub fn frame(self) -> EthernetFrame {
        self.frame
    }

    // Returns the bytes in the ARP body between start and end, exclusive
    fn arp_data(&self, start: usize, end: usize) -> &[u8] {
        &self.frame.data[ETHERNET_HEADER_LEN + start..ETHERNET_HEADER_LEN + end]
    }

    fn set_arp_data(&mut self, bytes: &[u8], start: usize, end: usize) {
        self.frame.data[ETHERNET_HEADER_LEN + start..ETHERNET_HEADER_LEN + end]
            .copy_from_slice(bytes);
    }
}

impl From<ArpFrame> for PacketData {
    fn from(arp_frame: ArpFrame) -> PacketData {
        arp_frame.frame.data
    }
}
