//! BSS lifecycle and station join/leave surfacing for a software access
//! point (spec.md §4.6).

use crate::event_handler::{Event, EventHandler, Registration};
use crate::firmware_events::{UAP_FW_STA_CONNECT, UAP_FW_STA_DISCONNECT};
use crate::ifc::{BssConfig, FullmacIfc, Payload, VendorRequest};
use crate::ioctl::{CompletionResult, IoctlAdapter};
use shared::{Band, Error, MacAddr, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SOFTAP_BANDWIDTH_MHZ: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartResult {
    Success,
    BssAlreadyStartedOrJoined,
    NotSupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopResult {
    Success,
    BssAlreadyStopped,
    InternalError,
}

struct State {
    started: bool,
    ssid: Vec<u8>,
}

pub struct SoftAp {
    bss_index: u8,
    mlan: Arc<dyn crate::ifc::MlanAdapter>,
    ioctl: Arc<IoctlAdapter>,
    ioctl_timeout: Duration,
    state: Mutex<State>,
    _join_sub: Registration,
    _leave_sub: Registration,
}

impl SoftAp {
    pub fn new(
        bss_index: u8,
        mlan: Arc<dyn crate::ifc::MlanAdapter>,
        ioctl: Arc<IoctlAdapter>,
        events: &Arc<EventHandler>,
        ifc: Arc<dyn FullmacIfc>,
        ioctl_timeout: Duration,
    ) -> Arc<Self> {
        let join_ifc = ifc.clone();
        let join_sub = events.register_interface(
            UAP_FW_STA_CONNECT,
            bss_index,
            Box::new(move |event: &Event| {
                Self::handle_sta_connect(&join_ifc, event);
            }),
        );
        let leave_ifc = ifc.clone();
        let leave_sub = events.register_interface(
            UAP_FW_STA_DISCONNECT,
            bss_index,
            Box::new(move |event: &Event| {
                Self::handle_sta_disconnect(&leave_ifc, event);
            }),
        );
        Arc::new(SoftAp {
            bss_index,
            mlan,
            ioctl,
            ioctl_timeout,
            state: Mutex::new(State { started: false, ssid: Vec::new() }),
            _join_sub: join_sub,
            _leave_sub: leave_sub,
        })
    }

    /// Starts the access point (spec.md §4.6 Start). All ioctls here are
    /// synchronous.
    pub fn start(&self, ssid: Vec<u8>, channel: u8) -> Result<StartResult> {
        {
            let state = self.state.lock().unwrap();
            if state.started {
                return Ok(StartResult::BssAlreadyStartedOrJoined);
            }
        }

        let band = Band::for_channel(channel);
        let mut config: BssConfig = self.mlan.bss_config(self.bss_index);
        config.ssid = ssid.clone();
        config.channel = channel;
        config.band = Some(band);
        config.bandwidth_mhz = SOFTAP_BANDWIDTH_MHZ;
        config.rates = self.mlan.supported_rates(band);

        match self.issue_sync(Payload::BssConfigSet(config)) {
            Ok(()) => {}
            Err(Error::NotSupported) => return Ok(StartResult::NotSupported),
            Err(e) => return Err(e),
        }
        match self.issue_sync(Payload::BssStart) {
            Ok(()) => {
                let mut state = self.state.lock().unwrap();
                state.started = true;
                state.ssid = ssid;
                Ok(StartResult::Success)
            }
            Err(Error::NotSupported) => Ok(StartResult::NotSupported),
            Err(e) => Err(e),
        }
    }

    /// Stops the access point (spec.md §4.6 Stop).
    pub fn stop(&self, ssid: &[u8]) -> Result<StopResult> {
        {
            let state = self.state.lock().unwrap();
            if !state.started {
                return Ok(StopResult::BssAlreadyStopped);
            }
            if state.ssid != ssid {
                return Ok(StopResult::InternalError);
            }
        }
        match self.issue_sync(Payload::BssStop { ssid: ssid.to_vec() }) {
            Ok(()) => {
                let mut state = self.state.lock().unwrap();
                state.started = false;
                state.ssid.clear();
                Ok(StopResult::Success)
            }
            Err(_) => Ok(StopResult::InternalError),
        }
    }

    fn issue_sync(&self, payload: Payload) -> Result<()> {
        let request = VendorRequest { bss_index: self.bss_index, payload };
        match self.ioctl.issue_sync(request, Some(self.ioctl_timeout)) {
            CompletionResult::Success(_) => Ok(()),
            CompletionResult::Failure(status) => Err(Error::Internal(status)),
            CompletionResult::Timeout => Err(Error::Timeout),
            CompletionResult::Canceled => Err(Error::Canceled),
        }
    }

    fn handle_sta_connect(ifc: &Arc<dyn FullmacIfc>, event: &Event) {
        if event.data.len() < 6 {
            log::warn!("UapFwStaConnect event too short: {} bytes", event.data.len());
            return;
        }
        let mac = MacAddr::from_slice(&event.data[..6]);
        let ies = event.data[6..].to_vec();
        ifc.on_sta_connect(mac, ies);
    }

    fn handle_sta_disconnect(ifc: &Arc<dyn FullmacIfc>, event: &Event) {
        if event.data.len() < 8 {
            log::warn!("UapFwStaDisconnect event too short: {} bytes", event.data.len());
            return;
        }
        let reason = u16::from_le_bytes([event.data[0], event.data[1]]);
        let mac = MacAddr::from_slice(&event.data[2..8]);
        ifc.on_sta_disconnect(mac, reason);
    }
}
