//! Per-interface cryptographic key management (spec.md §4.3).

use crate::ifc::{KeyWireConfig, Payload, VendorRequest};
use crate::ioctl::{CompletionResult, IoctlAdapter};
use shared::{Error, KeyDescriptor, MacAddr, Result};
use std::sync::Arc;
use std::time::Duration;

pub struct KeyRing {
    bss_index: u8,
    ioctl: Arc<IoctlAdapter>,
    max_key_material_len: usize,
    ioctl_timeout: Duration,
}

impl KeyRing {
    pub fn new(
        bss_index: u8,
        ioctl: Arc<IoctlAdapter>,
        max_key_material_len: usize,
        ioctl_timeout: Duration,
    ) -> Self {
        KeyRing { bss_index, ioctl, max_key_material_len, ioctl_timeout }
    }

    pub fn add_key(&self, descriptor: KeyDescriptor) -> Result<()> {
        if descriptor.key_material.is_empty() {
            return Err(Error::InvalidArgs("key material must not be empty".into()));
        }
        if descriptor.key_material.len() > self.max_key_material_len {
            return Err(Error::InvalidArgs("key material exceeds firmware maximum".into()));
        }
        // cipher.key_flags() rejects unsupported suites; constructing the
        // descriptor already required a valid CipherSuite, so the only
        // remaining validation is the length checks above.
        let flags = descriptor.flags();
        let payload = Payload::SetKey(KeyWireConfig {
            key_index: descriptor.key_index,
            address: descriptor.address,
            key_material: descriptor.key_material,
            packet_number: descriptor.packet_number,
            flags,
        });
        self.issue(payload)
    }

    pub fn remove_key(&self, key_index: u8, address: MacAddr) -> Result<()> {
        self.issue(Payload::RemoveKey { key_index, address })
    }

    pub fn remove_all_keys(&self) -> Result<()> {
        self.issue(Payload::RemoveAllKeys)
    }

    pub fn enable_wep_key(&self, key_index: u8) -> Result<()> {
        self.issue(Payload::EnableWepKey { key_index })
    }

    fn issue(&self, payload: Payload) -> Result<()> {
        let request = VendorRequest { bss_index: self.bss_index, payload };
        match self.ioctl.issue_sync(request, Some(self.ioctl_timeout)) {
            CompletionResult::Success(_) => Ok(()),
            CompletionResult::Failure(status) => Err(Error::Internal(status)),
            CompletionResult::Timeout => Err(Error::Timeout),
            CompletionResult::Canceled => Err(Error::Canceled),
        }
    }
}

impl Drop for KeyRing {
    fn drop(&mut self) {
        if let Err(e) = self.remove_all_keys() {
            log::warn!("key ring teardown: remove_all_keys failed: {e}");
        }
    }
}
