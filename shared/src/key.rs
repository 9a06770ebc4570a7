use crate::{CipherSuite, MacAddr};

/// Extra firmware flags implied by a key's cipher (spec.md §4.3) together
/// with the caller-controlled flags (group/tx/rx-seq-valid).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyFlags {
    pub group: bool,
    pub tx: bool,
    pub rx_seq_valid: bool,
    pub ccmp256: bool,
    pub gcmp: bool,
    pub gcmp256: bool,
    pub aes_mcast_igtk: bool,
    pub gmac128: bool,
    pub gmac256: bool,
}

/// A cryptographic key to install, in the shape the key ring accepts
/// (spec.md §3 Key descriptor).
#[derive(Debug, Clone)]
pub struct KeyDescriptor {
    pub key_index: u8,
    pub address: MacAddr,
    pub cipher: CipherSuite,
    pub key_material: Vec<u8>,
    pub packet_number: Option<u64>,
    pub tx: bool,
}

impl KeyDescriptor {
    /// The complete flag set to send to firmware: cipher-implied flags plus
    /// `group` (derived from a broadcast address) and `rx_seq_valid`
    /// (derived from a supplied packet number), per §4.3.
    pub fn flags(&self) -> KeyFlags {
        let mut flags = self.cipher.key_flags();
        flags.group = self.address.is_broadcast();
        flags.tx = self.tx;
        flags.rx_seq_valid = self.packet_number.is_some();
        flags
    }
}
