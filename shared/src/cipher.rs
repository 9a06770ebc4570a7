use crate::{Error, KeyFlags};

/// Cipher suites the key ring accepts (spec.md §4.3). Any suite type octet
/// that does not map to one of these fails `add_key` with `InvalidArgs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherSuite {
    Wep40,
    Wep104,
    Tkip,
    Ccmp128,
    Ccmp256,
    Gcmp128,
    Gcmp256,
    BipCmac128,
    BipGmac128,
    BipGmac256,
}

impl CipherSuite {
    /// RSN cipher suite type octet (IEEE 802.11, suite selector `00-0F-AC:n`).
    pub fn suite_type(self) -> u8 {
        match self {
            CipherSuite::Wep40 => 1,
            CipherSuite::Tkip => 2,
            CipherSuite::Ccmp128 => 4,
            CipherSuite::Wep104 => 5,
            CipherSuite::BipCmac128 => 6,
            CipherSuite::Gcmp128 => 8,
            CipherSuite::Gcmp256 => 9,
            CipherSuite::Ccmp256 => 10,
            CipherSuite::BipGmac128 => 11,
            CipherSuite::BipGmac256 => 12,
        }
    }

    pub fn from_suite_type(suite_type: u8) -> Result<Self, Error> {
        Ok(match suite_type {
            1 => CipherSuite::Wep40,
            2 => CipherSuite::Tkip,
            4 => CipherSuite::Ccmp128,
            5 => CipherSuite::Wep104,
            6 => CipherSuite::BipCmac128,
            8 => CipherSuite::Gcmp128,
            9 => CipherSuite::Gcmp256,
            10 => CipherSuite::Ccmp256,
            11 => CipherSuite::BipGmac128,
            12 => CipherSuite::BipGmac256,
            other => {
                return Err(Error::InvalidArgs(format!(
                    "unsupported cipher suite type {other}"
                )))
            }
        })
    }

    /// The extra firmware flags this cipher requires, per the §4.3 table.
    pub fn key_flags(self) -> KeyFlags {
        match self {
            CipherSuite::Wep40
            | CipherSuite::Wep104
            | CipherSuite::Tkip
            | CipherSuite::Ccmp128 => KeyFlags::default(),
            CipherSuite::Ccmp256 => KeyFlags {
                ccmp256: true,
                ..KeyFlags::default()
            },
            CipherSuite::Gcmp128 => KeyFlags {
                gcmp: true,
                ..KeyFlags::default()
            },
            CipherSuite::Gcmp256 => KeyFlags {
                gcmp256: true,
                ..KeyFlags::default()
            },
            CipherSuite::BipCmac128 => KeyFlags {
                aes_mcast_igtk: true,
                ..KeyFlags::default()
            },
            CipherSuite::BipGmac128 => KeyFlags {
                aes_mcast_igtk: true,
                gmac128: true,
                ..KeyFlags::default()
            },
            CipherSuite::BipGmac256 => KeyFlags {
                aes_mcast_igtk: true,
                gmac256: true,
                ..KeyFlags::default()
            },
        }
    }
}
