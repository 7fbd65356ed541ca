use crate::{
    internet_checksum, EthernetFrame, Identity, MacAddr, PacketData, Reject, ETHERNET_HEADER_LEN,
    IPV4_ETHER_TYPE,
};
use std::convert::TryInto;
use std::net::Ipv4Addr;

/// Total wire length of an echo frame: 14 byte Ethernet header, 20 byte IPv4
/// header, 8 byte ICMP echo header, 56 byte payload. The echo protocol
/// variant is fixed-length like the address-resolution one; the ping payload
/// size is pinned at the conventional 56 bytes.
pub const ECHO_FRAME_LEN: usize = 98;

pub const ECHO_PAYLOAD_LEN: usize = 56;

/// Every echo reply leaves with this TTL, regardless of the request's.
pub const REPLY_TTL: u8 = 64;

pub const ICMP_PROTOCOL: u8 = 1;

pub enum IcmpType {
    EchoReply = 0,
    EchoRequest = 8,
}

// Offsets of the two inner headers within the frame.
const LAYER3_OFFSET: usize = ETHERNET_HEADER_LEN;
const LAYER4_OFFSET: usize = LAYER3_OFFSET + 20;

///
/// EthernetFrame wrapper for an ICMP echo message carried in IPv4, with
/// getters/setters for the IPv4 header (RFC 791) and the echo header
/// (RFC 792) at their fixed offsets.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EchoFrame {
    frame: EthernetFrame,
}

impl EchoFrame {
    ///
    /// Constructs an empty frame with the template fields in place: IPv4
    /// ether type, version/IHL of 0x45, total length, reply TTL, ICMP
    /// protocol number, echo-request type. Addresses, identifier, sequence
    /// and payload are zero; checksums are not yet computed.
    ///
    pub fn empty() -> Self {
        let mut frame = EthernetFrame::empty();
        frame.set_payload(&[0; ECHO_FRAME_LEN - ETHERNET_HEADER_LEN]);
        frame.set_ether_type(IPV4_ETHER_TYPE);

        let mut echo_frame = EchoFrame { frame };
        echo_frame.frame.data[LAYER3_OFFSET] = 0x45;
        let total_len = (ECHO_FRAME_LEN - LAYER3_OFFSET) as u16;
        echo_frame.frame.data[LAYER3_OFFSET + 2..=LAYER3_OFFSET + 3]
            .copy_from_slice(&total_len.to_be_bytes());
        echo_frame.set_ttl(REPLY_TTL);
        echo_frame.frame.data[LAYER3_OFFSET + 9] = ICMP_PROTOCOL;
        echo_frame.set_icmp_type(IcmpType::EchoRequest as u8);
        echo_frame
    }

    /// Wraps an already complete frame without semantic validation; only the
    /// length is checked.
    pub fn from_buffer(data: PacketData) -> Result<EchoFrame, &'static str> {
        if data.len() != ECHO_FRAME_LEN {
            return Err("Data is not the length of an echo frame");
        }
        Ok(EchoFrame {
            frame: EthernetFrame::from_buffer(data)?,
        })
    }

    ///
    /// Runs the fixed-order validation chain against a complete candidate
    /// frame: destination address first, echo protection second, then the
    /// structural fields (ether type, IP version, IP protocol), the ICMP
    /// type/code, and the destination-IP check last. Short-circuits on the
    /// first failure.
    ///
    /// `data` must be a complete frame of `ECHO_FRAME_LEN` bytes; the parser
    /// guarantees this.
    ///
    pub fn validate_request(data: PacketData, identity: Identity) -> Result<EchoFrame, Reject> {
        assert_eq!(
            data.len(),
            ECHO_FRAME_LEN,
            "candidate must be a complete echo frame"
        );
        let candidate = EchoFrame {
            frame: EthernetFrame { data },
        };

        let dest = candidate.dest_mac();
        if dest != identity.mac && !dest.is_broadcast() {
            return Err(Reject::NotForUs);
        }
        if candidate.src_mac() == identity.mac {
            return Err(Reject::EchoOfSelf);
        }
        if candidate.ether_type() != IPV4_ETHER_TYPE {
            return Err(Reject::WrongEtherType);
        }
        if candidate.version() != 4 {
            return Err(Reject::WrongIpVersion);
        }
        if candidate.protocol() != ICMP_PROTOCOL {
            return Err(Reject::WrongIpProtocol);
        }
        if candidate.icmp_type() != IcmpType::EchoRequest as u8 || candidate.icmp_code() != 0 {
            return Err(Reject::WrongIcmpType);
        }
        if candidate.dest_addr() != identity.ip {
            return Err(Reject::NotOurAddress);
        }
        Ok(candidate)
    }

    ///
    /// Builds the echo reply for a validated request: Ethernet and IP
    /// addresses swapped towards the requester, TTL reset, ICMP type set to
    /// reply, identifier/sequence/payload copied verbatim, and both
    /// checksums recomputed.
    ///
    pub fn build_reply(&self, identity: Identity) -> EchoFrame {
        let mut reply = self.clone();
        reply.set_dest_mac(self.src_mac());
        reply.set_src_mac(identity.mac);
        reply.set_dest_addr(self.src_addr());
        reply.set_src_addr(identity.ip);
        reply.set_ttl(REPLY_TTL);
        reply.set_icmp_type(IcmpType::EchoReply as u8);
        reply.set_icmp_code(0);
        reply.set_header_checksum();
        reply.set_icmp_checksum();
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

    pub fn version(&self) -> u8 {
        self.frame.data[LAYER3_OFFSET] >> 4
    }

    pub fn ihl(&self) -> u8 {
        self.frame.data[LAYER3_OFFSET] & 0x0F
    }

    pub fn total_len(&self) -> u16 {
        u16::from_be_bytes(
            self.frame.data[LAYER3_OFFSET + 2..=LAYER3_OFFSET + 3]
                .try_into()
                .unwrap(),
        )
    }

    pub fn identification(&self) -> u16 {
        u16::from_be_bytes(
            self.frame.data[LAYER3_OFFSET + 4..=LAYER3_OFFSET + 5]
                .try_into()
                .unwrap(),
        )
    }

    pub fn set_identification(&mut self, id: u16) {
        self.frame.data[LAYER3_OFFSET + 4..=LAYER3_OFFSET + 5].copy_from_slice(&id.to_be_bytes());
    }

    pub fn ttl(&self) -> u8 {
        self.frame.data[LAYER3_OFFSET + 8]
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        self.frame.data[LAYER3_OFFSET + 8] = ttl;
    }

    pub fn protocol(&self) -> u8 {
        self.frame.data[LAYER3_OFFSET + 9]
    }

    pub fn header_checksum(&self) -> u16 {
        u16::from_be_bytes(
            self.frame.data[LAYER3_OFFSET + 10..=LAYER3_OFFSET + 11]
                .try_into()
                .unwrap(),
        )
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        let octets: [u8; 4] = self.frame.data[LAYER3_OFFSET + 12..LAYER3_OFFSET + 16]
            .try_into()
            .unwrap();
        Ipv4Addr::from(octets)
    }

    pub fn set_src_addr(&mut self, addr: Ipv4Addr) {
        self.frame.data[LAYER3_OFFSET + 12..LAYER3_OFFSET + 16].copy_from_slice(&addr.octets());
    }

    pub fn dest_addr(&self) -> Ipv4Addr {
        let octets: [u8; 4] = self.frame.data[LAYER3_OFFSET + 16..LAYER3_OFFSET + 20]
            .try_into()
            .unwrap();
        Ipv4Addr::from(octets)
    }

    pub fn set_dest_addr(&mut self, addr: Ipv4Addr) {
        self.frame.data[LAYER3_OFFSET + 16..LAYER3_OFFSET + 20].copy_from_slice(&addr.octets());
    }

    pub fn icmp_type(&self) -> u8 {
        self.frame.data[LAYER4_OFFSET]
    }

    pub fn set_icmp_type(&mut self, icmp_type: u8) {
        self.frame.data[LAYER4_OFFSET] = icmp_type;
    }

    pub fn icmp_code(&self) -> u8 {
        self.frame.data[LAYER4_OFFSET + 1]
    }

    pub fn set_icmp_code(&mut self, code: u8) {
        self.frame.data[LAYER4_OFFSET + 1] = code;
    }

    pub fn icmp_checksum(&self) -> u16 {
        u16::from_be_bytes(
            self.frame.data[LAYER4_OFFSET + 2..=LAYER4_OFFSET + 3]
                .try_into()
                .unwrap(),
        )
    }

    pub fn identifier(&self) -> u16 {
        u16::from_be_bytes(
            self.frame.data[LAYER4_OFFSET + 4..=LAYER4_OFFSET + 5]
                .try_into()
                .unwrap(),
        )
    }

    pub fn set_identifier(&mut self, identifier: u16) {
        self.frame.data[LAYER4_OFFSET + 4..=LAYER4_OFFSET + 5]
            .copy_from_slice(&identifier.to_be_bytes());
    }

    pub fn sequence_number(&self) -> u16 {
        u16::from_be_bytes(
            self.frame.data[LAYER4_OFFSET + 6..=LAYER4_OFFSET + 7]
                .try_into()
                .unwrap(),
        )
    }

    pub fn set_sequence_number(&mut self, sequence: u16) {
        self.frame.data[LAYER4_OFFSET + 6..=LAYER4_OFFSET + 7]
            .copy_from_slice(&sequence.to_be_bytes());
    }

    pub fn icmp_payload(&self) -> &[u8] {
        &self.frame.data[LAYER4_OFFSET + 8..]
    }

    pub fn set_icmp_payload(&mut self, payload: &[u8]) {
        assert_eq!(payload.len(), ECHO_PAYLOAD_LEN, "echo payload is 56 bytes");
        self.frame.data[LAYER4_OFFSET + 8..].copy_from_slice(payload);
    }

    /// Calculates what the IPv4 header checksum should be given the current
    /// header, with the checksum field itself treated as zero.
    pub fn calculate_header_checksum(&self) -> u16 {
        let mut header = [0u8; 20];
        header.copy_from_slice(&self.frame.data[LAYER3_OFFSET..LAYER4_OFFSET]);
        header[10] = 0;
        header[11] = 0;
        internet_checksum(&header)
    }

    /// Sets the IPv4 header checksum field to its valid value.
    pub fn set_header_checksum(&mut self) {
        let checksum = self.calculate_header_checksum();
        self.frame.data[LAYER3_OFFSET + 10..=LAYER3_OFFSET + 11]
            .copy_from_slice(&checksum.to_be_bytes());
    }

    /// A header whose one's-complement sum, including the stored checksum,
    /// folds to zero is intact.
    pub fn validate_header_checksum(&self) -> bool {
        internet_checksum(&self.frame.data[LAYER3_OFFSET..LAYER4_OFFSET]) == 0
    }

    /// Calculates what the ICMP checksum should be over {type, code,
    /// identifier, sequence, payload}, with the checksum field itself
    /// treated as zero.
    pub fn calculate_icmp_checksum(&self) -> u16 {
        let mut message = self.frame.data[LAYER4_OFFSET..].to_vec();
        message[2] = 0;
        message[3] = 0;
        internet_checksum(&message)
    }

    /// Sets the ICMP checksum field to its valid value.
    pub fn set_icmp_checksum(&mut self) {
        let checksum = self.calculate_icmp_checksum();
        self.frame.data[LAYER4_OFFSET + 2..=LAYER4_OFFSET + 3]
            .copy_from_slice(&checksum.to_be_bytes());
    }

    pub fn validate_icmp_checksum(&self) -> bool {
        internet_checksum(&self.frame.data[LAYER4_OFFSET..]) == 0
    }

    // Move ownership of the frame back to the caller
    pub fn frame(self) -> EthernetFrame {
        self.frame
    }
}

impl From<EchoFrame> for PacketData {
    fn from(echo_frame: EchoFrame) -> PacketData {
        echo_frame.frame.data
    }
}
