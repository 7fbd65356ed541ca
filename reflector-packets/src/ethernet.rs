use crate::{MacAddr, PacketData};
use std::convert::{TryFrom, TryInto};

pub const ETHERNET_HEADER_LEN: usize = 14;

/// An Ethernet II frame owning its bytes. Both protocol frames in this crate
/// wrap one of these and read their fields at fixed offsets past the header.
///
/// 0                    6                    12                      14
/// |---6 byte Dest_MAC--|---6 byte Src_MAC---|--2 Byte EtherType---|
#[derive(Clone, Debug)]
pub struct EthernetFrame {
    pub data: PacketData,
}

impl EthernetFrame {
    pub fn from_buffer(data: PacketData) -> Result<EthernetFrame, &'static str> {
        if data.len() < ETHERNET_HEADER_LEN {
            return Err("Frame is less than the minimum of 14 bytes");
        }
        Ok(EthernetFrame { data })
    }

    /// Returns an empty EthernetFrame where all values are populated to zero.
    pub fn empty() -> EthernetFrame {
        EthernetFrame {
            data: vec![0; ETHERNET_HEADER_LEN],
        }
    }

    pub fn dest_mac(&self) -> MacAddr {
        let bytes = <[u8; 6]>::try_from(&self.data[0..6]).unwrap();
        MacAddr::new(bytes)
    }

    pub fn src_mac(&self) -> MacAddr {
        let bytes = <[u8; 6]>::try_from(&self.data[6..12]).unwrap();
        MacAddr::new(bytes)
    }

    pub fn set_dest_mac(&mut self, mac: MacAddr) {
        self.data[..6].copy_from_slice(&mac.bytes[..6]);
    }

    pub fn set_src_mac(&mut self, mac: MacAddr) {
        self.data[6..12].copy_from_slice(&mac.bytes[..6]);
    }

    pub fn ether_type(&self) -> u16 {
        u16::from_be_bytes(self.data[12..=13].try_into().unwrap())
    }

    pub fn set_ether_type(&mut self, ether_type: u16) {
        self.data[12..=13].copy_from_slice(&ether_type.to_be_bytes());
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[ETHERNET_HEADER_LEN..]
    }

    pub fn set_payload(&mut self, payload: &[u8]) {
        self.data.truncate(ETHERNET_HEADER_LEN);
        self.data.reserve_exact(payload.len());
        self.data.extend(payload);
    }
}

/// EthernetFrames are considered the same if they carry the same bytes.
impl PartialEq for EthernetFrame {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for EthernetFrame {}
