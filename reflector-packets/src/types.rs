use std::fmt;
use std::net::Ipv4Addr;

pub type PacketData = Vec<u8>;

pub const ARP_ETHER_TYPE: u16 = 0x0806;
pub const IPV4_ETHER_TYPE: u16 = 0x0800;

/// A 48-bit hardware address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MacAddr {
    pub bytes: [u8; 6],
}

impl MacAddr {
    pub fn new(bytes: [u8; 6]) -> Self {
        MacAddr { bytes }
    }

    pub fn broadcast() -> Self {
        MacAddr::new([0xFF; 6])
    }

    pub fn is_broadcast(self) -> bool {
        self.bytes == [0xFF; 6]
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// The local address configuration. Handed by value to every component at
/// construction and never mutated afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identity {
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
}

impl Identity {
    pub fn new(mac: MacAddr, ip: Ipv4Addr) -> Self {
        Identity { mac, ip }
    }
}

/// Why a candidate frame was refused. Exactly one reason is reported per
/// rejection; checks run in a fixed order and stop at the first failure.
/// Rejected frames are dropped without a reply, so none of these ever
/// surfaces past the parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reject {
    /// Destination MAC is neither ours nor broadcast.
    NotForUs,
    /// Source MAC is our own; answering would loop.
    EchoOfSelf,
    WrongEtherType,
    WrongHardwareType,
    WrongProtocolType,
    WrongHardwareLen,
    WrongProtocolLen,
    WrongOpcode,
    WrongIpVersion,
    WrongIpProtocol,
    WrongIcmpType,
    /// Target/destination IP is not ours.
    NotOurAddress,
}

/// 16-bit one's-complement checksum over big-endian words, end-around carry
/// folded in, final complement applied. A trailing odd byte is padded with
/// zero. Shared by the IPv4 header checksum and the ICMP checksum.
pub fn internet_checksum(data: &[u8]) -> u16 {
    let full_sum = data.chunks(2).fold(0u32, |acc, word| {
        let word = if word.len() == 2 {
            u16::from_be_bytes([word[0], word[1]])
        } else {
            u16::from_be_bytes([word[0], 0])
        };
        acc + u32::from(word)
    });

    let mut sum = full_sum;
    while sum & 0xFFFF_0000 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_display() {
        let mac = MacAddr::new([0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01]);
        assert_eq!(format!("{}", mac), "de:ad:be:ef:00:01");
    }

    #[test]
    fn broadcast_mac() {
        assert!(MacAddr::broadcast().is_broadcast());
        assert!(!MacAddr::new([0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE]).is_broadcast());
    }

    #[test]
    fn checksum_of_known_header() {
        // IPv4 header with its checksum field zeroed; the correct checksum
        // for it is 0xb8c0.
        let header: Vec<u8> = vec![
            0x45, 0x00, 0x00, 0x14, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0xc7,
        ];
        assert_eq!(internet_checksum(&header), 0xb8c0);
    }

    #[test]
    fn checksum_of_header_including_own_checksum_is_zero() {
        let header: Vec<u8> = vec![
            0x45, 0x00, 0x00, 0x14, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0xb8, 0xc0, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0xc7,
        ];
        assert_eq!(internet_checksum(&header), 0);
    }

    #[test]
    fn checksum_pads_odd_length_with_zero() {
        assert_eq!(internet_checksum(&[0xAB]), internet_checksum(&[0xAB, 0x00]));
    }

    #[test]
    fn checksum_of_empty_data() {
        assert_eq!(internet_checksum(&[]), 0xFFFF);
    }
}
