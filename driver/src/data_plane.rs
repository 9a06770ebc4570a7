//! TX submission, RX completion, and EAPOL-frame demultiplexing (spec.md
//! §4.7). Frames cross this boundary as plain owned buffers (`Frame =
//! Vec<u8>`); the original's placement-new trick for embedding firmware
//! buffer headers inside reserved frame headroom has no idiomatic
//! equivalent here; `BufferInfo` still reports the geometry a `NetDevice`
//! implementation needs to reserve.

use crate::ifc::{Bus, FirmwareCompletion, Frame, FullmacIfc, MlanAdapter, NetDevice, SyncOutcome};
use crate::worker::Worker;
use shared::Result;
use std::sync::Arc;

const ETHERTYPE_EAPOL: u16 = 0x888E;
const ETHERNET_HEADER_LEN: usize = 14;

const TX_DEPTH: u32 = 512;
const RX_DEPTH: u32 = 512;
const RX_THRESHOLD: u32 = 128;
const MAX_BUFFER_PARTS: u32 = 1;
const PAGE_SIZE: usize = 4096;
const IEEE80211_MSDU_MAX: usize = 2304;
/// Stand-in for the combined size of the firmware-side frame/buffer
/// descriptors the original embeds ahead of frame data.
const FRAME_DESCRIPTOR_OVERHEAD: usize = 64;

fn align_up(value: usize, alignment: usize) -> usize {
    if alignment == 0 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferInfo {
    pub tx_depth: u32,
    pub rx_depth: u32,
    pub rx_threshold: u32,
    pub max_buffer_parts: u32,
    pub max_buffer_length: usize,
    pub buffer_alignment: usize,
    pub min_rx_buffer_length: usize,
    pub tx_head_length: usize,
}

fn is_eapol(frame: &[u8]) -> bool {
    frame.len() >= ETHERNET_HEADER_LEN
        && u16::from_be_bytes([frame[12], frame[13]]) == ETHERTYPE_EAPOL
}

pub struct DataPlane {
    bus: Arc<dyn Bus>,
    mlan: Arc<dyn MlanAdapter>,
    netdev: Arc<dyn NetDevice>,
    ifc: Arc<dyn FullmacIfc>,
    rx_worker: Arc<Worker>,
}

impl DataPlane {
    pub fn new(
        bus: Arc<dyn Bus>,
        mlan: Arc<dyn MlanAdapter>,
        netdev: Arc<dyn NetDevice>,
        ifc: Arc<dyn FullmacIfc>,
    ) -> Self {
        DataPlane { bus, mlan, netdev, ifc, rx_worker: Worker::spawn("rx-worker") }
    }

    /// Submits `frames` for transmission on `bss_index` (spec.md §4.7
    /// Transmit). Firmware's synchronous answer determines whether the
    /// completion fires now or later.
    pub fn queue_tx(&self, bss_index: u8, frames: Vec<Frame>) {
        for frame in frames {
            self.submit_one(bss_index, frame);
        }
        self.bus.trigger_main_process();
    }

    fn submit_one(&self, bss_index: u8, frame: Frame) {
        let is_eapol_frame = is_eapol(&frame);
        let netdev = self.netdev.clone();
        let ifc = self.ifc.clone();
        let frame_for_sink = frame.clone();
        let sink: crate::ifc::CompletionSink = Arc::new(move |completion: FirmwareCompletion| {
            let status = match completion {
                FirmwareCompletion::Success(_) => Ok(()),
                FirmwareCompletion::Failure(status) => Err(shared::Error::Internal(status)),
                FirmwareCompletion::Canceled => Err(shared::Error::Canceled),
            };
            Self::complete_tx(&netdev, &ifc, frame_for_sink.clone(), status, is_eapol_frame);
        });

        match self.mlan.send_packet(bss_index, &frame, sink) {
            SyncOutcome::Success(_) => {
                Self::complete_tx(&self.netdev, &self.ifc, frame, Ok(()), is_eapol_frame);
            }
            SyncOutcome::Failure(status) => {
                Self::complete_tx(&self.netdev, &self.ifc, frame, Err(shared::Error::Internal(status)), is_eapol_frame);
            }
            SyncOutcome::Pending => {}
        }
    }

    fn complete_tx(
        netdev: &Arc<dyn NetDevice>,
        ifc: &Arc<dyn FullmacIfc>,
        frame: Frame,
        status: Result<()>,
        is_eapol_frame: bool,
    ) {
        if is_eapol_frame {
            ifc.on_eapol_transmitted(frame, status);
        } else {
            netdev.complete_tx(frame, status);
        }
    }

    /// Dispatches a received frame (spec.md §4.7 Receive): EAPOL control
    /// frames are demultiplexed to the fullmac upcall, everything else goes
    /// to the network device.
    pub fn complete_rx(&self, frame: Frame) {
        if is_eapol(&frame) {
            self.ifc.on_eapol_received(frame);
        } else {
            self.netdev.complete_rx(frame);
        }
    }

    /// Posts firmware's RX-process entrypoint onto the dedicated RX worker
    /// so draining received frames cannot block the IRQ worker.
    pub fn defer_rx_work(&self, rx_process: impl FnOnce() + Send + 'static) {
        self.rx_worker.post(rx_process);
    }

    pub fn get_info(&self) -> BufferInfo {
        let alignment = self.bus.buffer_alignment();
        BufferInfo {
            tx_depth: TX_DEPTH,
            rx_depth: RX_DEPTH,
            rx_threshold: RX_THRESHOLD,
            max_buffer_parts: MAX_BUFFER_PARTS,
            max_buffer_length: PAGE_SIZE,
            buffer_alignment: alignment,
            min_rx_buffer_length: align_up(IEEE80211_MSDU_MAX + self.bus.rx_headroom(), PAGE_SIZE),
            tx_head_length: align_up(FRAME_DESCRIPTOR_OVERHEAD, alignment) + self.bus.tx_headroom(),
        }
    }

    pub fn prepare_vmo(&self, vmo_id: u64, mapped_addr: usize, size: usize) -> Result<()> {
        self.bus.prepare_vmo(vmo_id, mapped_addr, size)
    }

    pub fn release_vmo(&self, vmo_id: u64) -> Result<()> {
        self.bus.release_vmo(vmo_id)
    }
}
