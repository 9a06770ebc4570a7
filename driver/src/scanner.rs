//! Active/passive network discovery orchestration (spec.md §4.4).

use crate::event_handler::{Event, EventHandler, Registration};
use crate::firmware_events::DRV_SCAN_REPORT;
use crate::ifc::{
    BssType, ChannelScanConfig, FullmacIfc, Payload, ScanChannel, ScanEndCode, ScanFwConfig,
    ScanRequest, ScanResult, ScanResultBss, ScanType, VendorRequest,
};
use crate::ioctl::{CompletionResult, IoctlAdapter, RequestHandle};
use crate::waitable::WaitableState;
use shared::{is_dfs_channel, Band, Error, Result};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const MAX_SSID_LEN: usize = 32;

/// Preserved verbatim; firmware's precise semantics for this extension mode
/// are undocumented (spec.md §9 open question).
const EXT_SCAN_ENHANCE: bool = false;

struct ScanState {
    current_txn_id: Option<u64>,
    pending_handle: Option<RequestHandle>,
}

pub struct Scanner {
    bss_index: u8,
    mlan: Arc<dyn crate::ifc::MlanAdapter>,
    ioctl: Arc<IoctlAdapter>,
    ifc: Arc<dyn FullmacIfc>,
    default_timeout: Duration,
    scan_in_progress: Arc<WaitableState<bool>>,
    ioctl_in_progress: Arc<WaitableState<bool>>,
    state: Mutex<ScanState>,
    _scan_report_sub: Registration,
}

impl Scanner {
    pub fn new(
        bss_index: u8,
        mlan: Arc<dyn crate::ifc::MlanAdapter>,
        ioctl: Arc<IoctlAdapter>,
        events: &Arc<EventHandler>,
        ifc: Arc<dyn FullmacIfc>,
        default_timeout: Duration,
    ) -> Arc<Self> {
        let scanner = Arc::new_cyclic(|weak: &std::sync::Weak<Scanner>| {
            let weak = weak.clone();
            let sub = events.register_interface(
                DRV_SCAN_REPORT,
                bss_index,
                Box::new(move |_event: &Event| {
                    if let Some(scanner) = weak.upgrade() {
                        scanner.on_scan_report();
                    }
                }),
            );
            Scanner {
                bss_index,
                mlan,
                ioctl,
                ifc,
                default_timeout,
                scan_in_progress: Arc::new(WaitableState::new(false)),
                ioctl_in_progress: Arc::new(WaitableState::new(false)),
                state: Mutex::new(ScanState { current_txn_id: None, pending_handle: None }),
                _scan_report_sub: sub,
            }
        });
        scanner
    }

    /// Orchestrates a scan per spec.md §4.4. Returns immediately; results
    /// and completion surface through the `FullmacIfc` upcalls.
    pub fn scan(self: &Arc<Self>, request: ScanRequest, timeout: Option<Duration>) -> Result<()> {
        if request.ssids.len() > shared::MAX_SSID_LIST {
            return Err(Error::InvalidArgs("too many SSIDs".into()));
        }
        if request.channels.len() > shared::MAX_USER_SCAN_CHAN {
            return Err(Error::InvalidArgs("too many channels".into()));
        }
        if !matches!(request.scan_type, ScanType::Active | ScanType::Passive) {
            return Err(Error::InvalidArgs("scan_type must be Active or Passive".into()));
        }
        if self.scan_in_progress.get() {
            return Err(Error::AlreadyExists);
        }

        let fw_config = self.build_fw_config(&request);
        self.scan_in_progress.set(true);
        self.ioctl_in_progress.set(true);
        {
            let mut state = self.state.lock().unwrap();
            state.current_txn_id = Some(request.txn_id);
        }

        let timeout = Some(timeout.unwrap_or(self.default_timeout));
        let vendor_request = VendorRequest { bss_index: self.bss_index, payload: Payload::Scan(fw_config) };
        let this = self.clone();
        match self
            .ioctl
            .issue_async(vendor_request, move |result| this.on_ioctl_complete(result), timeout)
        {
            crate::ioctl::IssueResult::Success(_) => {
                self.ioctl_in_progress.set(false);
                Ok(())
            }
            crate::ioctl::IssueResult::Failure(e) => {
                self.ioctl_in_progress.set(false);
                self.scan_in_progress.set(false);
                self.state.lock().unwrap().current_txn_id = None;
                Err(e)
            }
            crate::ioctl::IssueResult::Pending(handle) => {
                self.state.lock().unwrap().pending_handle = Some(handle);
                Ok(())
            }
        }
    }

    /// Cancels an in-progress scan. The on-scan-end callback receives
    /// `CanceledByDriverOrFirmware`.
    pub fn stop(&self) -> Result<()> {
        let handle = self.state.lock().unwrap().pending_handle.take();
        match handle {
            Some(handle) => {
                self.ioctl.cancel(&handle);
                self.state.lock().unwrap().pending_handle = Some(handle);
                Ok(())
            }
            None => Err(Error::NotFound),
        }
    }

    fn build_fw_config(&self, request: &ScanRequest) -> ScanFwConfig {
        let firmware_channels = self.mlan.channel_list();
        let candidate_channels: Vec<u8> = if !request.channels.is_empty() {
            request
                .channels
                .iter()
                .copied()
                .filter(|c| firmware_channels.contains(c))
                .collect()
        } else {
            firmware_channels.into_iter().take(shared::MAX_USER_SCAN_CHAN).collect()
        };

        let channels = candidate_channels
            .into_iter()
            .map(|channel| {
                let scan_type = if is_dfs_channel(channel) && request.scan_type == ScanType::Active {
                    ScanType::PassiveToActive
                } else {
                    request.scan_type
                };
                ChannelScanConfig { channel, radio_type: Band::for_channel(channel), scan_type }
            })
            .collect();

        let ssids = request
            .ssids
            .iter()
            .map(|ssid| ssid[..ssid.len().min(MAX_SSID_LEN)].to_vec())
            .collect();

        ScanFwConfig { txn_id: request.txn_id, channels, ssids, ext_scan_enhance: EXT_SCAN_ENHANCE }
    }

    fn on_ioctl_complete(&self, result: CompletionResult) {
        self.ioctl_in_progress.set(false);
        let end_code = match result {
            CompletionResult::Success(_) => return,
            CompletionResult::Timeout => {
                self.dispatch_partial_results();
                ScanEndCode::CanceledByDriverOrFirmware
            }
            CompletionResult::Canceled => ScanEndCode::CanceledByDriverOrFirmware,
            CompletionResult::Failure(_) => ScanEndCode::Failed,
        };
        self.finish_scan(end_code);
    }

    fn on_scan_report(&self) {
        self.dispatch_partial_results();
        self.finish_scan(ScanEndCode::Success);
    }

    fn dispatch_partial_results(&self) {
        let txn_id = match self.state.lock().unwrap().current_txn_id {
            Some(id) => id,
            None => return,
        };
        for bss in self.mlan.scan_table() {
            let ies = if bss.beacon_buf.len() > 12 { bss.beacon_buf[12..].to_vec() } else { Vec::new() };
            let rssi_dbm = -(bss.rssi as i16);
            self.ifc.on_scan_result(ScanResult {
                txn_id,
                timestamp_monotonic: Instant::now(),
                bss: ScanResultBss {
                    bss_type: BssType::Infrastructure,
                    bssid: bss.bssid,
                    beacon_period: bss.beacon_period,
                    capability_info: bss.capability_info,
                    ies,
                    channel: ScanChannel { primary: bss.channel, cbw: bss.curr_bw },
                    rssi_dbm: rssi_dbm.clamp(-128, 0) as i8,
                },
            });
        }
    }

    fn finish_scan(&self, code: ScanEndCode) {
        let txn_id = {
            let mut state = self.state.lock().unwrap();
            state.pending_handle = None;
            state.current_txn_id.take()
        };
        self.scan_in_progress.set(false);
        if let Some(txn_id) = txn_id {
            self.ifc.on_scan_end(txn_id, code);
        }
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        let _ = self.stop();
        self.scan_in_progress.wait_until_false();
        self.ioctl_in_progress.wait_until_false();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ifc::BssDescriptor;
    use crate::mock::{MockFullmacIfc, MockMlanAdapter};
    use shared::MacAddr;

    fn scanner(mlan: Arc<MockMlanAdapter>, ifc: Arc<MockFullmacIfc>) -> Arc<Scanner> {
        let events = EventHandler::new();
        let ioctl = Arc::new(IoctlAdapter::new(mlan.clone()));
        Scanner::new(0, mlan, ioctl, &events, ifc, Duration::from_secs(15))
    }

    #[test]
    fn scan_with_no_results_dispatches_empty_scan_end() {
        let mlan = Arc::new(MockMlanAdapter::new());
        let ifc = Arc::new(MockFullmacIfc::new());
        let scanner = scanner(mlan.clone(), ifc.clone());
        let request = ScanRequest {
            txn_id: 0x234776898ADF83,
            scan_type: ScanType::Active,
            ssids: vec![],
            channels: vec![],
        };
        scanner.scan(request, None).unwrap();
        mlan.complete_pending(crate::ifc::FirmwareCompletion::Success(crate::ifc::ResponseData::None));

        // DrvScanReport arrives asynchronously from firmware.
        let events_handler_side_channel: Arc<dyn crate::ifc::MlanAdapter> = mlan.clone();
        let _ = events_handler_side_channel;
        scanner.on_scan_report();

        assert!(ifc.scan_results.lock().unwrap().is_empty());
        let ends = ifc.scan_ends.lock().unwrap();
        assert_eq!(ends.len(), 1);
        assert_eq!(ends[0], (0x234776898ADF83, ScanEndCode::Success));
    }

    #[test]
    fn scan_with_one_result_reports_clamped_rssi_and_stripped_ies() {
        let mlan = Arc::new(MockMlanAdapter::new());
        let ifc = Arc::new(MockFullmacIfc::new());
        mlan.set_scan_table(vec![BssDescriptor {
            bssid: MacAddr([0x01, 0x02, 0x03, 0x04, 0x05, 0x06]),
            channel: 11,
            rssi: 40,
            beacon_period: 100,
            capability_info: 0x1234,
            curr_bw: 6,
            beacon_buf: vec![0u8; 32],
        }]);
        let scanner = scanner(mlan.clone(), ifc.clone());
        let request = ScanRequest {
            txn_id: 0x234776898ADF83,
            scan_type: ScanType::Active,
            ssids: vec![],
            channels: vec![],
        };
        scanner.scan(request, None).unwrap();
        mlan.complete_pending(crate::ifc::FirmwareCompletion::Success(crate::ifc::ResponseData::None));
        scanner.on_scan_report();

        let results = ifc.scan_results.lock().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].bss.bssid, MacAddr([0x01, 0x02, 0x03, 0x04, 0x05, 0x06]));
        assert_eq!(results[0].bss.channel.primary, 11);
        assert_eq!(results[0].bss.rssi_dbm, -40);
        assert_eq!(results[0].bss.ies.len(), 20);
        let ends = ifc.scan_ends.lock().unwrap();
        assert_eq!(ends[0], (0x234776898ADF83, ScanEndCode::Success));
    }

    #[test]
    fn second_scan_while_in_progress_is_already_exists() {
        let mlan = Arc::new(MockMlanAdapter::new());
        let ifc = Arc::new(MockFullmacIfc::new());
        let scanner = scanner(mlan.clone(), ifc);
        let request = |id| ScanRequest { txn_id: id, scan_type: ScanType::Active, ssids: vec![], channels: vec![] };
        scanner.scan(request(1), None).unwrap();
        assert!(matches!(scanner.scan(request(2), None), Err(Error::AlreadyExists)));
        mlan.complete_pending(crate::ifc::FirmwareCompletion::Success(crate::ifc::ResponseData::None));
        scanner.on_scan_report();
    }

    #[test]
    fn too_many_ssids_is_invalid_args() {
        let mlan = Arc::new(MockMlanAdapter::new());
        let ifc = Arc::new(MockFullmacIfc::new());
        let scanner = scanner(mlan, ifc);
        let request = ScanRequest {
            txn_id: 1,
            scan_type: ScanType::Active,
            ssids: (0..shared::MAX_SSID_LIST + 1).map(|_| vec![0u8]).collect(),
            channels: vec![],
        };
        assert!(matches!(scanner.scan(request, None), Err(Error::InvalidArgs(_))));
    }

    #[test]
    fn dfs_channel_with_active_request_becomes_passive_to_active() {
        let mlan = Arc::new(MockMlanAdapter::new());
        mlan.set_channel_list(vec![52]);
        let ifc = Arc::new(MockFullmacIfc::new());
        let scanner = scanner(mlan.clone(), ifc);
        let request = ScanRequest { txn_id: 1, scan_type: ScanType::Active, ssids: vec![], channels: vec![52] };
        scanner.scan(request, None).unwrap();
        let last = mlan.last_request().unwrap();
        match last.payload {
            Payload::Scan(cfg) => {
                assert_eq!(cfg.channels[0].scan_type, ScanType::PassiveToActive);
            }
            _ => panic!("expected scan payload"),
        }
        mlan.complete_pending(crate::ifc::FirmwareCompletion::Success(crate::ifc::ResponseData::None));
        scanner.on_scan_report();
    }
}
