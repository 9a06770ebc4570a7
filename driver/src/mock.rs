//! In-memory test doubles for the collaborator traits in `ifc`. Used only
//! by `#[cfg(test)]` code across this crate.

use crate::ifc::{
    BssDescriptor, Bus, CancelToken, CompletionSink, FirmwareCompletion, Frame, FullmacIfc,
    MlanAdapter, ResponseData, ScanEndCode, SyncOutcome, VendorRequest,
};
use shared::{Band, MacAddr};
use std::sync::Mutex;

struct PendingCall {
    token: CancelToken,
    sink: CompletionSink,
}

#[derive(Default)]
struct State {
    next_token: u64,
    pending: Vec<PendingCall>,
    synchronous_successes_queued: u32,
    cancel_always_fails: bool,
    canceled_any: bool,
    channel_list: Vec<u8>,
    scan_table: Vec<BssDescriptor>,
    bss_config: crate::ifc::BssConfig,
    max_key_material_len: usize,
    last_requests: Vec<VendorRequest>,
}

/// A fake `MlanAdapter`: every `ioctl()` call is recorded, and completes
/// only when the test explicitly drives it with `complete_pending` or
/// `queue_synchronous_success`.
pub struct MockMlanAdapter {
    state: Mutex<State>,
}

impl MockMlanAdapter {
    pub fn new() -> Self {
        MockMlanAdapter {
            state: Mutex::new(State {
                max_key_material_len: 32,
                channel_list: vec![1, 6, 11, 36, 40, 100],
                ..Default::default()
            }),
        }
    }

    pub fn queue_synchronous_success(&self) {
        self.state.lock().unwrap().synchronous_successes_queued += 1;
    }

    pub fn set_cancel_always_fails(&self) {
        self.state.lock().unwrap().cancel_always_fails = true;
    }

    pub fn was_canceled(&self) -> bool {
        self.state.lock().unwrap().canceled_any
    }

    pub fn set_channel_list(&self, channels: Vec<u8>) {
        self.state.lock().unwrap().channel_list = channels;
    }

    pub fn set_scan_table(&self, table: Vec<BssDescriptor>) {
        self.state.lock().unwrap().scan_table = table;
    }

    pub fn last_request(&self) -> Option<VendorRequest> {
        self.state.lock().unwrap().last_requests.last().cloned()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().last_requests.len()
    }

    /// Completes the oldest still-pending request with `result`.
    pub fn complete_pending(&self, result: FirmwareCompletion) {
        let sink = {
            let mut s = self.state.lock().unwrap();
            if s.pending.is_empty() {
                None
            } else {
                Some(s.pending.remove(0).sink)
            }
        };
        if let Some(sink) = sink {
            sink(result);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }
}

impl MlanAdapter for MockMlanAdapter {
    fn ioctl(&self, request: VendorRequest, on_complete: CompletionSink) -> (SyncOutcome, CancelToken) {
        let mut s = self.state.lock().unwrap();
        s.last_requests.push(request);
        if s.synchronous_successes_queued > 0 {
            s.synchronous_successes_queued -= 1;
            return (SyncOutcome::Success(ResponseData::None), CancelToken(0));
        }
        let token = CancelToken(s.next_token);
        s.next_token += 1;
        s.pending.push(PendingCall { token, sink: on_complete });
        (SyncOutcome::Pending, token)
    }

    fn cancel(&self, token: CancelToken) -> bool {
        let mut s = self.state.lock().unwrap();
        if s.cancel_always_fails {
            return false;
        }
        if let Some(pos) = s.pending.iter().position(|p| p.token == token) {
            let call = s.pending.remove(pos);
            s.canceled_any = true;
            drop(s);
            (call.sink)(FirmwareCompletion::Canceled);
            true
        } else {
            false
        }
    }

    fn cancel_all(&self) {
        let pending = {
            let mut s = self.state.lock().unwrap();
            s.canceled_any = !s.pending.is_empty();
            std::mem::take(&mut s.pending)
        };
        for call in pending {
            (call.sink)(FirmwareCompletion::Canceled);
        }
    }

    fn channel_list(&self) -> Vec<u8> {
        self.state.lock().unwrap().channel_list.clone()
    }

    fn max_key_material_len(&self) -> usize {
        self.state.lock().unwrap().max_key_material_len
    }

    fn scan_table(&self) -> Vec<BssDescriptor> {
        self.state.lock().unwrap().scan_table.clone()
    }

    fn supported_rates(&self, band: Band) -> Vec<u8> {
        match band {
            Band::Ghz2_4 => vec![0x02, 0x04, 0x0b, 0x16],
            Band::Ghz5 => vec![0x0c, 0x12, 0x18, 0x24],
        }
    }

    fn bss_config(&self, _bss_index: u8) -> crate::ifc::BssConfig {
        self.state.lock().unwrap().bss_config.clone()
    }

    fn send_packet(&self, _bss_index: u8, _frame: &[u8], _on_complete: CompletionSink) -> SyncOutcome {
        SyncOutcome::Success(ResponseData::None)
    }
}

/// A fake `Bus`: records triggers, accepts any VMO.
#[derive(Default)]
pub struct MockBus {
    pub triggers: Mutex<u64>,
}

impl MockBus {
    pub fn new() -> Self {
        MockBus::default()
    }
}

impl Bus for MockBus {
    fn tx_headroom(&self) -> usize {
        32
    }
    fn rx_headroom(&self) -> usize {
        32
    }
    fn buffer_alignment(&self) -> usize {
        4
    }
    fn trigger_main_process(&self) {
        *self.triggers.lock().unwrap() += 1;
    }
    fn prepare_vmo(&self, _vmo_id: u64, _mapped_addr: usize, _size: usize) -> shared::Result<()> {
        Ok(())
    }
    fn release_vmo(&self, _vmo_id: u64) -> shared::Result<()> {
        Ok(())
    }
}

/// A fake `NetDevice`: records every completion it is handed.
#[derive(Default)]
pub struct MockNetDevice {
    pub tx_completions: Mutex<Vec<(Frame, bool)>>,
    pub rx_completions: Mutex<Vec<Frame>>,
}

impl MockNetDevice {
    pub fn new() -> Self {
        MockNetDevice::default()
    }
}

impl crate::ifc::NetDevice for MockNetDevice {
    fn complete_tx(&self, frame: Frame, status: shared::Result<()>) {
        self.tx_completions.lock().unwrap().push((frame, status.is_ok()));
    }
    fn complete_rx(&self, frame: Frame) {
        self.rx_completions.lock().unwrap().push(frame);
    }
}

/// A fake set of fullmac upcalls: records every call for assertions.
#[derive(Default)]
pub struct MockFullmacIfc {
    pub scan_results: Mutex<Vec<crate::ifc::ScanResult>>,
    pub scan_ends: Mutex<Vec<(u64, ScanEndCode)>>,
    pub connect_confirms: Mutex<Vec<(crate::ifc::ConnectStatus, Vec<u8>)>>,
    pub sta_connects: Mutex<Vec<(MacAddr, Vec<u8>)>>,
    pub sta_disconnects: Mutex<Vec<(MacAddr, u16)>>,
    pub eapol_tx: Mutex<Vec<(Frame, bool)>>,
    pub eapol_rx: Mutex<Vec<Frame>>,
}

impl MockFullmacIfc {
    pub fn new() -> Self {
        MockFullmacIfc::default()
    }
}

impl FullmacIfc for MockFullmacIfc {
    fn on_scan_result(&self, result: crate::ifc::ScanResult) {
        self.scan_results.lock().unwrap().push(result);
    }
    fn on_scan_end(&self, txn_id: u64, code: ScanEndCode) {
        self.scan_ends.lock().unwrap().push((txn_id, code));
    }
    fn connect_confirm(&self, status: crate::ifc::ConnectStatus, ies: Vec<u8>) {
        self.connect_confirms.lock().unwrap().push((status, ies));
    }
    fn on_sta_connect(&self, mac: MacAddr, ies: Vec<u8>) {
        self.sta_connects.lock().unwrap().push((mac, ies));
    }
    fn on_sta_disconnect(&self, mac: MacAddr, reason: u16) {
        self.sta_disconnects.lock().unwrap().push((mac, reason));
    }
    fn on_eapol_transmitted(&self, frame: Frame, status: shared::Result<()>) {
        self.eapol_tx.lock().unwrap().push((frame, status.is_ok()));
    }
    fn on_eapol_received(&self, frame: Frame) {
        self.eapol_rx.lock().unwrap().push(frame);
    }
}
