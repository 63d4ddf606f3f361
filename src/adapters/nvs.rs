//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`StoragePort`] for the tracker's flat key layout.  One
//! namespace is selected by [`begin`](StoragePort::begin); the handle is
//! opened lazily on first access and released by
//! [`end`](StoragePort::end).
//!
//! Values are typed the way ESP-IDF NVS types them: reading a key as a
//! different type than it was written with is a
//! [`StorageError::TypeMismatch`].  Booleans are stored as `u8`.
//!
//! The host build swaps the flash backend for an in-memory map with the
//! same typing rules (dev/test only).

use crate::app::ports::{StorageError, StoragePort};
use log::info;

#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use core::cell::Cell;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// NVS keys and namespaces are limited to 15 characters.
pub const MAX_KEY_LEN: usize = 15;

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
enum StoredValue {
    Str(String),
    I32(i32),
    U32(u32),
    Bool(bool),
}

pub struct NvsAdapter {
    namespace: String,
    #[cfg(target_os = "espidf")]
    handle: Cell<Option<nvs_handle_t>>,
    #[cfg(not(target_os = "espidf"))]
    open: bool,
    #[cfg(not(target_os = "espidf"))]
    store: HashMap<String, StoredValue>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// Returns `Err(StorageError::IoError)` if flash initialisation fails
    /// unrecoverably.  On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised automatically.
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as esp_err_t
                || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as esp_err_t
            {
                warn!("NVS: erasing and re-initialising flash partition");
                check(unsafe { nvs_flash_erase() })?;
                check(unsafe { nvs_flash_init() })?;
            } else {
                check(ret)?;
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            namespace: String::new(),
            #[cfg(target_os = "espidf")]
            handle: Cell::new(None),
            #[cfg(not(target_os = "espidf"))]
            open: false,
            #[cfg(not(target_os = "espidf"))]
            store: HashMap::new(),
        })
    }

    /// Currently selected namespace (empty before `begin`).
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether a backing handle is currently held.
    pub fn is_open(&self) -> bool {
        #[cfg(target_os = "espidf")]
        {
            self.handle.get().is_some()
        }
        #[cfg(not(target_os = "espidf"))]
        {
            self.open
        }
    }
}

/// Copy `s` into a NUL-terminated 16-byte buffer, truncating to 15 bytes.
fn c_name(s: &str) -> [u8; MAX_KEY_LEN + 1] {
    let mut buf = [0u8; MAX_KEY_LEN + 1];
    let bytes = s.as_bytes();
    let len = bytes.len().min(MAX_KEY_LEN);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

// ── ESP-IDF backend ────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn check(ret: esp_err_t) -> Result<(), StorageError> {
    if ret == ESP_OK as esp_err_t {
        Ok(())
    } else if ret == ESP_ERR_NVS_NOT_ENOUGH_SPACE as esp_err_t {
        Err(StorageError::Full)
    } else if ret == ESP_ERR_NVS_TYPE_MISMATCH as esp_err_t {
        Err(StorageError::TypeMismatch)
    } else if ret == ESP_ERR_NVS_INVALID_HANDLE as esp_err_t {
        Err(StorageError::NotOpen)
    } else {
        Err(StorageError::IoError)
    }
}

/// Like [`check`], but a missing key maps to `Ok(None)`.
#[cfg(target_os = "espidf")]
fn check_get<T>(ret: esp_err_t, value: T) -> Result<Option<T>, StorageError> {
    if ret == ESP_ERR_NVS_NOT_FOUND as esp_err_t {
        return Ok(None);
    }
    check(ret).map(|()| Some(value))
}

#[cfg(target_os = "espidf")]
impl NvsAdapter {
    fn handle(&self) -> Result<nvs_handle_t, StorageError> {
        if let Some(handle) = self.handle.get() {
            return Ok(handle);
        }
        if self.namespace.is_empty() {
            return Err(StorageError::NotOpen);
        }
        let ns = c_name(&self.namespace);
        let mut handle: nvs_handle_t = 0;
        // SAFETY: `ns` is NUL-terminated and outlives the call.
        let ret = unsafe {
            nvs_open(
                ns.as_ptr().cast(),
                nvs_open_mode_t_NVS_READWRITE,
                &mut handle,
            )
        };
        if ret != ESP_OK as esp_err_t {
            warn!("NvsAdapter: nvs_open('{}') failed: {}", self.namespace, ret);
            return Err(StorageError::NotOpen);
        }
        self.handle.set(Some(handle));
        Ok(handle)
    }

    fn commit(handle: nvs_handle_t) -> Result<(), StorageError> {
        check(unsafe { nvs_commit(handle) })
    }
}

#[cfg(target_os = "espidf")]
impl StoragePort for NvsAdapter {
    fn begin(&mut self, namespace: &str) -> bool {
        if self.namespace != namespace {
            self.end();
            self.namespace = namespace.into();
        }
        self.handle().is_ok()
    }

    fn get_str(&self, key: &str) -> Result<Option<String>, StorageError> {
        let handle = self.handle()?;
        let k = c_name(key);
        let mut len: usize = 0;
        // First call: get size (including the terminator).
        let ret = unsafe { nvs_get_str(handle, k.as_ptr().cast(), core::ptr::null_mut(), &mut len) };
        if check_get(ret, ())?.is_none() || len == 0 {
            return Ok(None);
        }
        let mut buf = vec![0u8; len];
        let ret = unsafe { nvs_get_str(handle, k.as_ptr().cast(), buf.as_mut_ptr().cast(), &mut len) };
        check(ret)?;
        buf.truncate(len.saturating_sub(1));
        String::from_utf8(buf).map(Some).map_err(|_| StorageError::IoError)
    }

    fn get_i32(&self, key: &str) -> Result<Option<i32>, StorageError> {
        let handle = self.handle()?;
        let k = c_name(key);
        let mut out: i32 = 0;
        let ret = unsafe { nvs_get_i32(handle, k.as_ptr().cast(), &mut out) };
        check_get(ret, out)
    }

    fn get_u32(&self, key: &str) -> Result<Option<u32>, StorageError> {
        let handle = self.handle()?;
        let k = c_name(key);
        let mut out: u32 = 0;
        let ret = unsafe { nvs_get_u32(handle, k.as_ptr().cast(), &mut out) };
        check_get(ret, out)
    }

    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError> {
        let handle = self.handle()?;
        let k = c_name(key);
        let mut out: u8 = 0;
        let ret = unsafe { nvs_get_u8(handle, k.as_ptr().cast(), &mut out) };
        check_get(ret, out != 0)
    }

    fn put_str(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let handle = self.handle()?;
        let k = c_name(key);
        let v = std::ffi::CString::new(value).map_err(|_| StorageError::IoError)?;
        check(unsafe { nvs_set_str(handle, k.as_ptr().cast(), v.as_ptr()) })?;
        Self::commit(handle)
    }

    fn put_i32(&mut self, key: &str, value: i32) -> Result<(), StorageError> {
        let handle = self.handle()?;
        let k = c_name(key);
        check(unsafe { nvs_set_i32(handle, k.as_ptr().cast(), value) })?;
        Self::commit(handle)
    }

    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), StorageError> {
        let handle = self.handle()?;
        let k = c_name(key);
        check(unsafe { nvs_set_u32(handle, k.as_ptr().cast(), value) })?;
        Self::commit(handle)
    }

    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), StorageError> {
        let handle = self.handle()?;
        let k = c_name(key);
        check(unsafe { nvs_set_u8(handle, k.as_ptr().cast(), u8::from(value)) })?;
        Self::commit(handle)
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        let handle = self.handle()?;
        check(unsafe { nvs_erase_all(handle) })?;
        Self::commit(handle)?;
        info!("NvsAdapter: namespace '{}' erased", self.namespace);
        Ok(())
    }

    fn end(&mut self) {
        if let Some(handle) = self.handle.take() {
            // SAFETY: the handle came from nvs_open and is closed once.
            unsafe { nvs_close(handle) };
        }
    }
}

// ── Simulation backend ─────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl NvsAdapter {
    /// Same refusal as the device: nothing is reachable before `begin`.
    fn require_namespace(&self) -> Result<(), StorageError> {
        if self.namespace.is_empty() {
            return Err(StorageError::NotOpen);
        }
        Ok(())
    }

    fn composite_key(&self, key: &str) -> String {
        format!("{}::{}", self.namespace, key)
    }

    fn get_typed<T>(
        &self,
        key: &str,
        extract: impl FnOnce(&StoredValue) -> Option<T>,
    ) -> Result<Option<T>, StorageError> {
        self.require_namespace()?;
        match self.store.get(&self.composite_key(key)) {
            None => Ok(None),
            Some(v) => extract(v).map(Some).ok_or(StorageError::TypeMismatch),
        }
    }

    fn put_typed(&mut self, key: &str, value: StoredValue) -> Result<(), StorageError> {
        self.require_namespace()?;
        let composite = self.composite_key(key);
        let mismatched = self
            .store
            .get(&composite)
            .is_some_and(|existing| {
                core::mem::discriminant(existing) != core::mem::discriminant(&value)
            });
        if mismatched {
            return Err(StorageError::TypeMismatch);
        }
        self.open = true;
        self.store.insert(composite, value);
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl StoragePort for NvsAdapter {
    fn begin(&mut self, namespace: &str) -> bool {
        self.namespace = c_name_string(namespace);
        self.open = true;
        true
    }

    fn get_str(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.get_typed(key, |v| match v {
            StoredValue::Str(s) => Some(s.clone()),
            _ => None,
        })
    }

    fn get_i32(&self, key: &str) -> Result<Option<i32>, StorageError> {
        self.get_typed(key, |v| match v {
            StoredValue::I32(n) => Some(*n),
            _ => None,
        })
    }

    fn get_u32(&self, key: &str) -> Result<Option<u32>, StorageError> {
        self.get_typed(key, |v| match v {
            StoredValue::U32(n) => Some(*n),
            _ => None,
        })
    }

    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError> {
        self.get_typed(key, |v| match v {
            StoredValue::Bool(b) => Some(*b),
            _ => None,
        })
    }

    fn put_str(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.put_typed(key, StoredValue::Str(value.into()))
    }

    fn put_i32(&mut self, key: &str, value: i32) -> Result<(), StorageError> {
        self.put_typed(key, StoredValue::I32(value))
    }

    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), StorageError> {
        self.put_typed(key, StoredValue::U32(value))
    }

    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), StorageError> {
        self.put_typed(key, StoredValue::Bool(value))
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.require_namespace()?;
        let prefix = format!("{}::", self.namespace);
        self.store.retain(|k, _| !k.starts_with(&prefix));
        info!("NvsAdapter: namespace '{}' erased (simulation)", self.namespace);
        Ok(())
    }

    fn end(&mut self) {
        self.open = false;
    }
}

/// Namespace as NVS would see it (truncated to the key length limit).
#[cfg(not(target_os = "espidf"))]
fn c_name_string(s: &str) -> String {
    let buf = c_name(s);
    let len = buf.iter().position(|&b| b == 0).unwrap_or(MAX_KEY_LEN);
    String::from_utf8_lossy(&buf[..len]).into_owned()
}
