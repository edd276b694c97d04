//! Persistent config store.
//!
//! Implements [`ConfigPort`] over NVS on the device and over an in-memory
//! map on the host.  The config is stored as one `postcard` blob.
//!
//! - Validation runs before every write; invalid configs are refused.
//! - A missing blob loads as [`PanelConfig::default()`].
//! - A blob that fails to decode or validate is reported as
//!   [`ConfigError::Corrupted`]; the caller decides whether to fall back.

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::PanelConfig;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "inkpanel";
const CONFIG_KEY: &str = "panelcfg";

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const MAX_BLOB_SIZE: usize = 1024;

pub struct ConfigStore {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl ConfigStore {
    /// Initialise NVS flash (erasing a full or outdated partition).
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("ConfigStore: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("ConfigStore: NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("ConfigStore: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    /// Load, falling back to defaults on any error.  Boot must not fail on
    /// a bad blob.
    pub fn load_or_default(&self) -> PanelConfig {
        self.load().unwrap_or_else(|e| {
            warn!("ConfigStore: {e}, using defaults");
            PanelConfig::default()
        })
    }

    fn decode(bytes: &[u8]) -> Result<PanelConfig, ConfigError> {
        let cfg: PanelConfig = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate().map_err(|_| ConfigError::Corrupted)?;
        Ok(cfg)
    }

    /// Host only: overwrite the raw blob (for corruption tests).
    #[cfg(not(target_os = "espidf"))]
    pub fn put_raw(&self, bytes: &[u8]) {
        self.store
            .borrow_mut()
            .insert(composite_key(CONFIG_NAMESPACE, CONFIG_KEY), bytes.to_vec());
    }

    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns = b"inkpanel\0";
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let ret = unsafe { nvs_open(ns.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        unsafe { nvs_close(handle) };
        result
    }
}

#[cfg(not(target_os = "espidf"))]
fn composite_key(namespace: &str, key: &str) -> String {
    format!("{namespace}::{key}")
}

impl ConfigPort for ConfigStore {
    fn load(&self) -> Result<PanelConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let key = composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
            match self.store.borrow().get(&key) {
                Some(bytes) => {
                    let cfg = Self::decode(bytes)?;
                    info!("ConfigStore: loaded config ({} bytes)", bytes.len());
                    Ok(cfg)
                }
                None => {
                    info!("ConfigStore: no stored config, using defaults");
                    Ok(PanelConfig::default())
                }
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(false, |handle| {
                let key = b"panelcfg\0";
                let mut size: usize = 0;
                let ret = unsafe {
                    nvs_get_blob(handle, key.as_ptr() as *const _, core::ptr::null_mut(), &mut size)
                };
                if ret != ESP_OK || size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ret);
                }
                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(handle, key.as_ptr() as *const _, buf.as_mut_ptr() as *mut _, &mut size)
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(buf)
            });
            match result {
                Ok(bytes) => {
                    let cfg = Self::decode(&bytes)?;
                    info!("ConfigStore: loaded config from NVS ({} bytes)", bytes.len());
                    Ok(cfg)
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("ConfigStore: no stored config, using defaults");
                    Ok(PanelConfig::default())
                }
                Err(e) => {
                    warn!("ConfigStore: NVS read error {e}");
                    Err(ConfigError::IoError)
                }
            }
        }
    }

    fn save(&self, config: &PanelConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::StorageFull);
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(composite_key(CONFIG_NAMESPACE, CONFIG_KEY), bytes);
            info!("ConfigStore: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(true, |handle| {
                let key = b"panelcfg\0";
                let ret = unsafe {
                    nvs_set_blob(handle, key.as_ptr() as *const _, bytes.as_ptr() as *const _, bytes.len())
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                match unsafe { nvs_commit(handle) } {
                    ESP_OK => Ok(()),
                    err => Err(err),
                }
            });
            match result {
                Ok(()) => {
                    info!("ConfigStore: saved {} bytes to NVS", bytes.len());
                    Ok(())
                }
                Err(e) if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE => Err(ConfigError::StorageFull),
                Err(e) => {
                    warn!("ConfigStore: NVS write error {e}");
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}
