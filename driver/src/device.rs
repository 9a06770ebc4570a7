//! Top-level wiring: one `Device` owns the shared `MlanAdapter`,
//! `IoctlAdapter`, `EventHandler`, and `DataPlane`; each configured
//! interface owns its own `Scanner`, connection controller, and `KeyRing`
//! (spec.md §2).

use crate::client_connection::ClientConnection;
use crate::config::{DeviceConfig, InterfaceRole};
use crate::data_plane::DataPlane;
use crate::event_handler::EventHandler;
use crate::ifc::{Bus, FullmacIfc, MlanAdapter, NetDevice};
use crate::ioctl::IoctlAdapter;
use crate::key_ring::KeyRing;
use crate::scanner::Scanner;
use crate::softap::SoftAp;
use shared::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub enum Role {
    Client(Arc<ClientConnection>),
    SoftAp(Arc<SoftAp>),
}

pub struct Interface {
    pub bss_index: u8,
    pub scanner: Arc<Scanner>,
    pub role: Role,
    pub keys: KeyRing,
}

pub struct Device {
    mlan: Arc<dyn MlanAdapter>,
    ioctl: Arc<IoctlAdapter>,
    events: Arc<EventHandler>,
    data_plane: Arc<DataPlane>,
    interfaces: Mutex<HashMap<u8, Arc<Interface>>>,
}

impl Device {
    pub fn new(
        config: &DeviceConfig,
        bus: Arc<dyn Bus>,
        mlan: Arc<dyn MlanAdapter>,
        netdev: Arc<dyn NetDevice>,
        ifc: Arc<dyn FullmacIfc>,
    ) -> Arc<Self> {
        let ioctl = Arc::new(IoctlAdapter::new(mlan.clone()));
        let events = EventHandler::new();
        let data_plane = Arc::new(DataPlane::new(bus, mlan.clone(), netdev, ifc.clone()));

        let device = Arc::new(Device {
            mlan: mlan.clone(),
            ioctl: ioctl.clone(),
            events: events.clone(),
            data_plane,
            interfaces: Mutex::new(HashMap::new()),
        });

        let mut interfaces = device.interfaces.lock().unwrap();
        for interface_config in &config.interfaces {
            let bss_index = interface_config.bss_index;
            let scanner = Scanner::new(
                bss_index,
                mlan.clone(),
                ioctl.clone(),
                &events,
                ifc.clone(),
                config.scan_timeout(),
            );
            let role = match interface_config.role {
                InterfaceRole::Client => Role::Client(ClientConnection::new(
                    bss_index,
                    ioctl.clone(),
                    ifc.clone(),
                    config.connect_timeout(),
                )),
                InterfaceRole::SoftAp => Role::SoftAp(SoftAp::new(
                    bss_index,
                    mlan.clone(),
                    ioctl.clone(),
                    &events,
                    ifc.clone(),
                    config.ioctl_timeout(),
                )),
            };
            let keys =
                KeyRing::new(bss_index, ioctl.clone(), mlan.max_key_material_len(), config.ioctl_timeout());
            interfaces.insert(bss_index, Arc::new(Interface { bss_index, scanner, role, keys }));
        }
        drop(interfaces);

        device
    }

    pub fn interface(&self, bss_index: u8) -> Result<Arc<Interface>> {
        self.interfaces
            .lock()
            .unwrap()
            .get(&bss_index)
            .cloned()
            .ok_or(Error::NotFound)
    }

    pub fn data_plane(&self) -> &Arc<DataPlane> {
        &self.data_plane
    }

    pub fn events(&self) -> &Arc<EventHandler> {
        &self.events
    }

    pub fn ioctl(&self) -> &Arc<IoctlAdapter> {
        &self.ioctl
    }

    pub fn mlan(&self) -> &Arc<dyn MlanAdapter> {
        &self.mlan
    }
}
