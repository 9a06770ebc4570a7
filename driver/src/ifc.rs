//! Collaborator interfaces the core consumes (spec.md §6): `Bus`,
//! `MlanAdapter`, `NetDevice`, and the fullmac upcalls. These are out of
//! scope for the core itself — only the shapes it needs from them live
//! here, plus the small set of value types that cross those boundaries.

use shared::{Band, FirmwareStatus, KeyFlags, MacAddr};
use std::sync::Arc;

pub type Frame = Vec<u8>;

/// A request action plus its target interface and firmware-specific
/// payload. Only this crate can construct one (the payload variants are
/// private to the crate), which is how §9's "magic cookie vs. foreign
/// pointer" problem is avoided: a `VendorRequest` is a real Rust value, not
/// an untyped pointer, so nothing but this crate's own components can hand
/// one to an `MlanAdapter`.
#[derive(Debug, Clone)]
pub struct VendorRequest {
    pub bss_index: u8,
    pub payload: Payload,
}

#[derive(Debug, Clone)]
pub enum Payload {
    Scan(ScanFwConfig),
    BssConfigSet(BssConfig),
    BssStart,
    BssStop { ssid: Vec<u8> },
    Connect(ConnectParams),
    SetKey(KeyWireConfig),
    RemoveKey { key_index: u8, address: MacAddr },
    RemoveAllKeys,
    EnableWepKey { key_index: u8 },
}

#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub bssid: MacAddr,
    pub channel: u8,
}

#[derive(Debug, Clone)]
pub struct KeyWireConfig {
    pub key_index: u8,
    pub address: MacAddr,
    pub key_material: Vec<u8>,
    pub packet_number: Option<u64>,
    pub flags: KeyFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    Active,
    Passive,
    /// Listen passively before switching to active, used on DFS channels
    /// when the caller asked for `Active` (spec.md §4.4 Request construction
    /// step 3).
    PassiveToActive,
}

#[derive(Debug, Clone)]
pub struct ChannelScanConfig {
    pub channel: u8,
    pub radio_type: Band,
    pub scan_type: ScanType,
}

#[derive(Debug, Clone)]
pub struct ScanFwConfig {
    pub txn_id: u64,
    pub channels: Vec<ChannelScanConfig>,
    pub ssids: Vec<Vec<u8>>,
    /// Opaque extension-mode flag preserved verbatim; its firmware
    /// semantics are undocumented here (spec.md §9 open question).
    pub ext_scan_enhance: bool,
}

/// Caller-facing scan request (spec.md §4.4).
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub txn_id: u64,
    pub scan_type: ScanType,
    pub ssids: Vec<Vec<u8>>,
    pub channels: Vec<u8>,
}

/// A BSS as firmware reports it in the scan table (spec.md §3 Scan table).
#[derive(Debug, Clone)]
pub struct BssDescriptor {
    pub bssid: MacAddr,
    pub channel: u8,
    /// RSSI magnitude in dB, e.g. `40` means -40 dBm.
    pub rssi: u8,
    pub beacon_period: u16,
    pub capability_info: u16,
    pub curr_bw: u8,
    /// Raw beacon buffer, including the fixed 12-byte prefix that the
    /// scanner strips before handing IEs upstream (spec.md §4.4).
    pub beacon_buf: Vec<u8>,
}

/// BSS configuration as used by GET/overlay/SET in soft-AP start (spec.md
/// §4.6).
#[derive(Debug, Clone, Default)]
pub struct BssConfig {
    pub ssid: Vec<u8>,
    pub channel: u8,
    pub band: Option<Band>,
    pub bandwidth_mhz: u8,
    pub rates: Vec<u8>,
}

/// Data a firmware completion may carry back to the caller.
#[derive(Debug, Clone)]
pub enum ResponseData {
    None,
    /// Association response status code (0 = success) and IEs for a connect
    /// ioctl (spec.md §4.5 completion, §6 `connect_confirm`).
    AssocStatus { status_code: u16, ies: Vec<u8> },
}

/// What firmware reports when a pending request finally completes.
pub enum FirmwareCompletion {
    Success(ResponseData),
    Failure(FirmwareStatus),
    Canceled,
}

pub type CompletionSink = Arc<dyn Fn(FirmwareCompletion) + Send + Sync>;

/// Firmware's synchronous answer to an issued request.
pub enum SyncOutcome {
    Success(ResponseData),
    Failure(FirmwareStatus),
    Pending,
}

/// An opaque correlation handle for a request that completed
/// asynchronously; used only to ask firmware to cancel it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelToken(pub u64);

/// The vendor MAC firmware, reached through whatever bus carries it
/// (spec.md §6, out of scope here beyond this shape).
pub trait MlanAdapter: Send + Sync {
    /// Issues `request`. `on_complete` is invoked at most once, strictly
    /// later than this call returns, and only if this call returns
    /// `SyncOutcome::Pending`.
    fn ioctl(&self, request: VendorRequest, on_complete: CompletionSink) -> (SyncOutcome, CancelToken);

    /// Cancels whichever request `token` still refers to. Returns true iff
    /// firmware reports the cancellation succeeded.
    fn cancel(&self, token: CancelToken) -> bool;

    /// Broadcast cancel: every outstanding request's `on_complete` fires
    /// with `Canceled`.
    fn cancel_all(&self);

    fn channel_list(&self) -> Vec<u8>;
    fn max_key_material_len(&self) -> usize;
    fn scan_table(&self) -> Vec<BssDescriptor>;
    fn supported_rates(&self, band: Band) -> Vec<u8>;
    fn bss_config(&self, bss_index: u8) -> BssConfig;

    /// Hands `frame` to firmware for transmission. `on_complete` is invoked
    /// at most once, and only if this call returns `SyncOutcome::Pending`
    /// (spec.md §4.7 Transmit).
    fn send_packet(&self, bss_index: u8, frame: &[u8], on_complete: CompletionSink) -> SyncOutcome;
}

/// Carrier bus capability (spec.md §6); only the slice this core touches.
pub trait Bus: Send + Sync {
    fn tx_headroom(&self) -> usize;
    fn rx_headroom(&self) -> usize;
    fn buffer_alignment(&self) -> usize;
    fn trigger_main_process(&self);
    fn prepare_vmo(&self, vmo_id: u64, mapped_addr: usize, size: usize) -> shared::Result<()>;
    fn release_vmo(&self, vmo_id: u64) -> shared::Result<()>;
}

/// Network device plumbing the host presents to the OS stack (spec.md §6).
pub trait NetDevice: Send + Sync {
    fn complete_tx(&self, frame: Frame, status: shared::Result<()>);
    fn complete_rx(&self, frame: Frame);
}

/// Fullmac upcalls the core produces (spec.md §6).
pub trait FullmacIfc: Send + Sync {
    fn on_scan_result(&self, result: ScanResult);
    fn on_scan_end(&self, txn_id: u64, code: ScanEndCode);
    fn connect_confirm(&self, status: ConnectStatus, ies: Vec<u8>);
    fn on_sta_connect(&self, mac: MacAddr, ies: Vec<u8>);
    fn on_sta_disconnect(&self, mac: MacAddr, reason: u16);
    fn on_eapol_transmitted(&self, frame: Frame, status: shared::Result<()>);
    fn on_eapol_received(&self, frame: Frame);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanChannel {
    pub primary: u8,
    pub cbw: u8,
}

#[derive(Debug, Clone)]
pub struct ScanResultBss {
    pub bss_type: BssType,
    pub bssid: MacAddr,
    pub beacon_period: u16,
    pub capability_info: u16,
    pub ies: Vec<u8>,
    pub channel: ScanChannel,
    pub rssi_dbm: i8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BssType {
    Infrastructure,
}

#[derive(Debug, Clone)]
pub struct ScanResult {
    pub txn_id: u64,
    pub timestamp_monotonic: std::time::Instant,
    pub bss: ScanResultBss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEndCode {
    Success,
    CanceledByDriverOrFirmware,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStatus {
    Success,
    RefusedReasonUnspecified,
    JoinFailure,
    Canceled,
    StatusCode(u16),
}
