//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`PreferenceStore`] for the hub and persists [`LinkConfig`].
//!
//! Each preference block is stored as a postcard record carrying its kind,
//! a CRC-32 of the payload, and the payload itself.  A record whose CRC does
//! not match is reported as absent, so the link falls back to whatever the
//! firmware substitutes (usually defaults).
//!
//! - **`feature = "espidf"`**: blobs live in the `packlink` NVS namespace.
//! - otherwise: an in-memory map, used by host tests and simulation.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::PreferenceStore;
use crate::config::LinkConfig;
use crate::error::{Error, StorageError};
use crate::protocol::packet::MAX_PAYLOAD;
use crate::protocol::{PreferenceBlock, PreferenceKind};

#[cfg(not(feature = "espidf"))]
use std::collections::HashMap;

#[cfg(feature = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(feature = "espidf")]
use log::debug;

#[cfg(feature = "espidf")]
const NAMESPACE: &[u8] = b"packlink\0";
const CONFIG_KEY: &[u8] = b"linkcfg\0";

/// Upper bound on any record this adapter writes.
const MAX_RECORD: usize = 128;

/// On-flash form of a preference block.
#[derive(Debug, Serialize, Deserialize)]
struct StoredBlock {
    kind: PreferenceKind,
    crc: u32,
    bytes: heapless::Vec<u8, MAX_PAYLOAD>,
}

impl StoredBlock {
    fn seal(block: &PreferenceBlock) -> Self {
        let mut bytes = heapless::Vec::new();
        // A block never exceeds MAX_PAYLOAD.
        let _ = bytes.extend_from_slice(block.as_bytes());
        Self {
            kind: block.kind(),
            crc: crc32fast::hash(block.as_bytes()),
            bytes,
        }
    }

    fn open(self) -> Result<PreferenceBlock, StorageError> {
        if crc32fast::hash(&self.bytes) != self.crc {
            return Err(StorageError::Corrupted);
        }
        PreferenceBlock::new(self.kind, &self.bytes).map_err(|_| StorageError::Corrupted)
    }
}

fn block_key(kind: PreferenceKind) -> &'static [u8] {
    match kind {
        PreferenceKind::Hub => b"prefs_hub\0",
        PreferenceKind::Accessory => b"prefs_acc\0",
        PreferenceKind::Shared => b"prefs_shr\0",
    }
}

pub struct NvsAdapter {
    #[cfg(not(feature = "espidf"))]
    store: std::cell::RefCell<HashMap<&'static [u8], Vec<u8>>>,
}

impl NvsAdapter {
    /// Initialise NVS flash.  On first boot or after a layout change the
    /// partition is erased and re-initialised.
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(feature = "espidf")]
        {
            // SAFETY: called once from the main task before any NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK
                {
                    return Err(StorageError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(StorageError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(feature = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(feature = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    // ── Config ───────────────────────────────────────────────

    /// Load the stored link config, or defaults when absent or unreadable.
    pub fn load_config(&self) -> LinkConfig {
        let cfg = match self.read_blob(CONFIG_KEY) {
            Ok(bytes) => postcard::from_bytes::<LinkConfig>(&bytes).ok(),
            Err(StorageError::NotFound) => None,
            Err(e) => {
                warn!("NvsAdapter: config read failed: {}", e);
                None
            }
        };
        match cfg {
            Some(cfg) if cfg.validate().is_ok() => {
                info!("NvsAdapter: loaded link config");
                cfg
            }
            Some(_) => {
                warn!("NvsAdapter: stored config out of range, using defaults");
                LinkConfig::default()
            }
            None => LinkConfig::default(),
        }
    }

    /// Validate and persist `config`.
    pub fn save_config(&mut self, config: &LinkConfig) -> Result<(), Error> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| StorageError::IoError)?;
        self.write_blob(CONFIG_KEY, &bytes)?;
        info!("NvsAdapter: link config saved ({} bytes)", bytes.len());
        Ok(())
    }

    // ── Raw blobs: simulation backend ────────────────────────

    #[cfg(not(feature = "espidf"))]
    fn read_blob(&self, key: &'static [u8]) -> Result<Vec<u8>, StorageError> {
        self.store
            .borrow()
            .get(key)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    #[cfg(not(feature = "espidf"))]
    fn write_blob(&mut self, key: &'static [u8], data: &[u8]) -> Result<(), StorageError> {
        if data.len() > MAX_RECORD {
            return Err(StorageError::IoError);
        }
        self.store.borrow_mut().insert(key, data.to_vec());
        Ok(())
    }

    /// Overwrite a stored record; lets tests model flash corruption.
    #[cfg(not(feature = "espidf"))]
    pub fn corrupt(&self, kind: PreferenceKind) {
        if let Some(bytes) = self.store.borrow_mut().get_mut(block_key(kind)) {
            if let Some(last) = bytes.last_mut() {
                *last ^= 0xFF;
            }
        }
    }

    // ── Raw blobs: ESP-IDF backend ───────────────────────────

    /// Open the namespace, run `f` with the handle, then close it.
    #[cfg(feature = "espidf")]
    fn with_handle<T>(
        write: bool,
        f: impl FnOnce(nvs_handle_t) -> Result<T, i32>,
    ) -> Result<T, i32> {
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let mut handle: nvs_handle_t = 0;
        // SAFETY: NAMESPACE is NUL-terminated and outlives the call.
        let ret = unsafe { nvs_open(NAMESPACE.as_ptr().cast(), mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        // SAFETY: handle was opened above and is not used afterwards.
        unsafe { nvs_close(handle) };
        result
    }

    #[cfg(feature = "espidf")]
    fn read_blob(&self, key: &'static [u8]) -> Result<Vec<u8>, StorageError> {
        let result = Self::with_handle(false, |handle| {
            let mut buf = vec![0u8; MAX_RECORD];
            let mut size = buf.len();
            // SAFETY: key is NUL-terminated; buf holds `size` writable bytes.
            let ret = unsafe {
                nvs_get_blob(handle, key.as_ptr().cast(), buf.as_mut_ptr().cast(), &mut size)
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            buf.truncate(size);
            Ok(buf)
        });
        match result {
            Ok(bytes) => Ok(bytes),
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(StorageError::NotFound),
            Err(e) => {
                debug!("NvsAdapter: nvs_get_blob returned {}", e);
                Err(StorageError::IoError)
            }
        }
    }

    #[cfg(feature = "espidf")]
    fn write_blob(&mut self, key: &'static [u8], data: &[u8]) -> Result<(), StorageError> {
        if data.len() > MAX_RECORD {
            return Err(StorageError::IoError);
        }
        Self::with_handle(true, |handle| {
            // SAFETY: key is NUL-terminated; data is a valid slice.
            let ret = unsafe {
                nvs_set_blob(handle, key.as_ptr().cast(), data.as_ptr().cast(), data.len())
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            // SAFETY: handle is open for writing.
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(|e| {
            warn!("NvsAdapter: NVS write error {}", e);
            StorageError::IoError
        })
    }
}

impl PreferenceStore for NvsAdapter {
    fn load(&self, kind: PreferenceKind) -> Option<PreferenceBlock> {
        let bytes = match self.read_blob(block_key(kind)) {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound) => return None,
            Err(e) => {
                warn!("NvsAdapter: reading {:?} failed: {}", kind, e);
                return None;
            }
        };
        let opened = postcard::from_bytes::<StoredBlock>(&bytes)
            .map_err(|_| StorageError::Corrupted)
            .and_then(StoredBlock::open);
        match opened {
            Ok(block) if block.kind() == kind => Some(block),
            Ok(_) | Err(_) => {
                warn!("NvsAdapter: stored {:?} block failed validation", kind);
                None
            }
        }
    }

    fn store(&mut self, block: &PreferenceBlock) -> Result<(), StorageError> {
        let record = StoredBlock::seal(block);
        let bytes = postcard::to_allocvec(&record).map_err(|_| StorageError::IoError)?;
        self.write_blob(block_key(block.kind()), &bytes)?;
        info!("NvsAdapter: {:?} block saved ({} bytes)", block.kind(), bytes.len());
        Ok(())
    }
}

#[cfg(all(test, not(feature = "espidf")))]
mod tests {
    use super::*;

    fn block(kind: PreferenceKind, fill: u8) -> PreferenceBlock {
        PreferenceBlock::new(kind, &vec![fill; kind.len()]).unwrap()
    }

    #[test]
    fn missing_block_loads_none() {
        let nvs = NvsAdapter::new().unwrap();
        assert!(nvs.load(PreferenceKind::Hub).is_none());
    }

    #[test]
    fn stored_block_loads_back() {
        let mut nvs = NvsAdapter::new().unwrap();
        let b = block(PreferenceKind::Shared, 9);
        nvs.store(&b).unwrap();
        assert_eq!(nvs.load(PreferenceKind::Shared), Some(b));
        assert!(nvs.load(PreferenceKind::Accessory).is_none());
    }

    #[test]
    fn kinds_do_not_collide() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.store(&block(PreferenceKind::Hub, 1)).unwrap();
        nvs.store(&block(PreferenceKind::Accessory, 2)).unwrap();
        assert_eq!(nvs.load(PreferenceKind::Hub).unwrap().as_bytes()[0], 1);
        assert_eq!(nvs.load(PreferenceKind::Accessory).unwrap().as_bytes()[0], 2);
    }

    #[test]
    fn corrupted_block_is_rejected() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.store(&block(PreferenceKind::Hub, 4)).unwrap();
        nvs.corrupt(PreferenceKind::Hub);
        assert!(nvs.load(PreferenceKind::Hub).is_none());
    }

    #[test]
    fn config_defaults_when_absent() {
        let nvs = NvsAdapter::new().unwrap();
        assert_eq!(nvs.load_config(), LinkConfig::default());
    }

    #[test]
    fn config_round_trips() {
        let mut nvs = NvsAdapter::new().unwrap();
        let cfg = LinkConfig {
            disconnect_timeout_ms: 10_000,
            ..LinkConfig::default()
        };
        nvs.save_config(&cfg).unwrap();
        assert_eq!(nvs.load_config(), cfg);
    }

    #[test]
    fn invalid_config_is_not_saved() {
        let mut nvs = NvsAdapter::new().unwrap();
        let cfg = LinkConfig {
            initial_retry_ms: 0,
            ..LinkConfig::default()
        };
        assert!(matches!(nvs.save_config(&cfg), Err(Error::Config(_))));
        assert_eq!(nvs.load_config(), LinkConfig::default());
    }
}
