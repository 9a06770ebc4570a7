//! Demonstration harness: wires a `Device` together with stand-in bus,
//! firmware, net-device, and fullmac-upcall adapters and keeps the process
//! resident. Real platform adapters (SDIO/PCIe bus, vendor MAC firmware,
//! OS network device) are out of scope for this crate; this binary exists
//! to show how the pieces fit together.

use nxpfmac_driver::config::DeviceConfig;
use nxpfmac_driver::device::Device;
use nxpfmac_driver::ifc::{
    BssConfig, BssDescriptor, Bus, CancelToken, CompletionSink, Frame, FullmacIfc, MlanAdapter,
    NetDevice, ScanEndCode, ScanResult, SyncOutcome, VendorRequest,
};
use shared::{Band, MacAddr};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

/// Stand-in bus: no real carrier, just satisfies the trait.
struct NullBus;

impl Bus for NullBus {
    fn tx_headroom(&self) -> usize {
        32
    }
    fn rx_headroom(&self) -> usize {
        32
    }
    fn buffer_alignment(&self) -> usize {
        4
    }
    fn trigger_main_process(&self) {}
    fn prepare_vmo(&self, _vmo_id: u64, _mapped_addr: usize, _size: usize) -> shared::Result<()> {
        Ok(())
    }
    fn release_vmo(&self, _vmo_id: u64) -> shared::Result<()> {
        Ok(())
    }
}

/// Stand-in firmware: every ioctl completes synchronously with success.
struct NullMlanAdapter;

impl MlanAdapter for NullMlanAdapter {
    fn ioctl(&self, _request: VendorRequest, _on_complete: CompletionSink) -> (SyncOutcome, CancelToken) {
        (SyncOutcome::Success(nxpfmac_driver::ifc::ResponseData::None), CancelToken(0))
    }
    fn cancel(&self, _token: CancelToken) -> bool {
        false
    }
    fn cancel_all(&self) {}
    fn channel_list(&self) -> Vec<u8> {
        vec![1, 6, 11, 36, 40, 100]
    }
    fn max_key_material_len(&self) -> usize {
        32
    }
    fn scan_table(&self) -> Vec<BssDescriptor> {
        Vec::new()
    }
    fn supported_rates(&self, band: Band) -> Vec<u8> {
        match band {
            Band::Ghz2_4 => vec![0x02, 0x04, 0x0b, 0x16],
            Band::Ghz5 => vec![0x0c, 0x12, 0x18, 0x24],
        }
    }
    fn bss_config(&self, _bss_index: u8) -> BssConfig {
        BssConfig::default()
    }
    fn send_packet(&self, _bss_index: u8, _frame: &[u8], _on_complete: CompletionSink) -> SyncOutcome {
        SyncOutcome::Success(nxpfmac_driver::ifc::ResponseData::None)
    }
}

struct NullNetDevice;

impl NetDevice for NullNetDevice {
    fn complete_tx(&self, _frame: Frame, _status: shared::Result<()>) {}
    fn complete_rx(&self, _frame: Frame) {}
}

struct LoggingFullmacIfc;

impl FullmacIfc for LoggingFullmacIfc {
    fn on_scan_result(&self, result: ScanResult) {
        log::info!("scan result: bssid={:?}", result.bss.bssid);
    }
    fn on_scan_end(&self, txn_id: u64, code: ScanEndCode) {
        log::info!("scan {txn_id} ended: {code:?}");
    }
    fn connect_confirm(&self, status: nxpfmac_driver::ifc::ConnectStatus, _ies: Vec<u8>) {
        log::info!("connect confirm: {status:?}");
    }
    fn on_sta_connect(&self, mac: MacAddr, _ies: Vec<u8>) {
        log::info!("station connected: {mac:?}");
    }
    fn on_sta_disconnect(&self, mac: MacAddr, reason: u16) {
        log::info!("station disconnected: {mac:?} reason={reason}");
    }
    fn on_eapol_transmitted(&self, _frame: Frame, status: shared::Result<()>) {
        log::info!("eapol tx complete: ok={}", status.is_ok());
    }
    fn on_eapol_received(&self, _frame: Frame) {
        log::info!("eapol rx");
    }
}

fn find_config_file() -> Option<PathBuf> {
    let exe_dir = env::current_exe().ok()?.parent()?.to_path_buf();
    let candidate = exe_dir.join("device.toml");
    if candidate.exists() {
        Some(candidate)
    } else {
        None
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _logger = nxpfmac_driver::logger::init_logger()?;
    log::info!("nxpfmac harness starting");

    let config = match find_config_file() {
        Some(path) => DeviceConfig::load(&path)?,
        None => {
            log::warn!("no device.toml found next to the binary, using defaults");
            DeviceConfig::default()
        }
    };

    let _device = Device::new(
        &config,
        Arc::new(NullBus),
        Arc::new(NullMlanAdapter),
        Arc::new(NullNetDevice),
        Arc::new(LoggingFullmacIfc),
    );

    log::info!("device wired, {} interface(s) configured", config.interfaces.len());

    // The driver stays resident; a real deployment would wire bus interrupt
    // handling and OS network-stack callbacks in here.
    thread::park();
    #[allow(unreachable_code)]
    Ok(())
}
