//! Foreign Function Interface for embedding into a C/C++ host TLS stack.
//!
//! The boundary runs in both directions: the host registers an engine vtable
//! (how the bridge drives the OS GOST provider) at initialization, and passes
//! a session vtable (how the bridge observes and synthesizes one host
//! session) on every per-session call.
//!
//! ## Memory Safety
//!
//! - Vtable structs are copied at the call; the bridge never retains pointers
//!   into host memory beyond the call, except the engine vtable registered at
//!   init, which must stay valid for the process lifetime
//! - Buffers passed in are read within the call only; buffers passed out are
//!   owned by the host
//! - Errors are returned as negative integers
//!
//! ## Thread Safety
//!
//! All exported functions are thread-safe. Per-session calls for the same
//! identity serialize on the session's worker.

#![allow(unsafe_code)]

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};
use std::sync::OnceLock;

use bytes::Bytes;

use crate::bridge::{Bridge, Verdict};
use crate::cache::StatusStore;
use crate::certs::{self, CertStore, StoreCandidate};
use crate::engine::{
    CipherInfo, EngineHandle, EngineState, GostEngine, VerifyOutcome, ENGINE_DONE,
};
use crate::error::{Error, Result};
use crate::session::{HostCapabilities, HostSession, TlsVersion, WaitState};
use crate::BridgeConfig;

/// Result code indicating success.
pub const GOSTLINK_OK: c_int = 0;
/// Result code indicating generic error.
pub const GOSTLINK_ERROR: c_int = -1;
/// Result code indicating invalid argument.
pub const GOSTLINK_ERROR_INVALID_ARG: c_int = -2;
/// Result code indicating the alternate engine is unavailable.
pub const GOSTLINK_ERROR_ENGINE: c_int = -3;
/// Result code indicating the host stack lacks a required cipher object.
pub const GOSTLINK_ERROR_CIPHER: c_int = -4;
/// Result code indicating the bridge was not initialized.
pub const GOSTLINK_ERROR_UNINITIALIZED: c_int = -5;
/// Verdict code: the host stack should proceed natively.
pub const GOSTLINK_NATIVE: c_int = -1000;

/// Borrowed byte buffer crossing the boundary.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct GostlinkBuf {
    /// Pointer to the first byte; may be null only when `len` is zero
    pub ptr: *const u8,
    /// Byte length
    pub len: usize,
}

/// How the bridge drives one engine session. All function pointers are
/// mandatory; `handle` arguments are the opaque pointer `open` returned.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct GostlinkEngineVtable {
    /// Factory context passed back to `open`
    pub ctx: *mut c_void,
    /// Open a session handle; null means the engine is unavailable
    pub open: unsafe extern "C" fn(ctx: *mut c_void) -> *mut c_void,
    /// Release a session handle
    pub close: unsafe extern "C" fn(handle: *mut c_void),
    /// Set the target hostname (null-terminated)
    pub set_hostname: unsafe extern "C" fn(handle: *mut c_void, hostname: *const c_char),
    /// Set the session-cache tag (null-terminated)
    pub set_cache_tag: unsafe extern "C" fn(handle: *mut c_void, tag: *const c_char),
    /// Offer ALPN protocols in TLS wire format
    pub set_alpn_offer: unsafe extern "C" fn(handle: *mut c_void, data: *const u8, len: usize),
    /// Drive one handshake step; 1 means complete
    pub connect_step: unsafe extern "C" fn(handle: *mut c_void) -> c_int,
    /// Read decrypted data; byte count or engine code
    pub read: unsafe extern "C" fn(handle: *mut c_void, buf: *mut u8, len: usize) -> c_int,
    /// Write plaintext data; byte count or engine code
    pub write: unsafe extern "C" fn(handle: *mut c_void, buf: *const u8, len: usize) -> c_int,
    /// Pending-operation flag bits
    pub state: unsafe extern "C" fn(handle: *mut c_void) -> u32,
    /// Fill negotiated identifiers; returns 1 when available
    pub cipher_info:
        unsafe extern "C" fn(handle: *mut c_void, protocol: *mut u32, suite: *mut u16) -> c_int,
    /// Copy the selected ALPN protocol into `buf`; returns its length, or 0
    pub selected_alpn:
        unsafe extern "C" fn(handle: *mut c_void, buf: *mut u8, cap: usize) -> c_int,
    /// Number of peer certificates
    pub peer_cert_count: unsafe extern "C" fn(handle: *mut c_void) -> c_int,
    /// Borrow the DER of peer certificate `index`; returns 1 on success
    pub peer_cert: unsafe extern "C" fn(
        handle: *mut c_void,
        index: c_int,
        out: *mut GostlinkBuf,
    ) -> c_int,
    /// Number of acceptable issuer names, or -1 when unavailable
    pub issuer_count: unsafe extern "C" fn(handle: *mut c_void) -> c_int,
    /// Borrow issuer name `index`; returns 1 on success
    pub issuer_name: unsafe extern "C" fn(
        handle: *mut c_void,
        index: c_int,
        out: *mut GostlinkBuf,
    ) -> c_int,
    /// Peer-chain verification verdict: 0 trusted, 1 untrusted, else raw
    pub verify_peer: unsafe extern "C" fn(handle: *mut c_void) -> u32,
    /// Register a client certificate; returns 1 on acceptance
    pub set_client_cert:
        unsafe extern "C" fn(handle: *mut c_void, der: *const u8, len: usize) -> c_int,
}

/// How the bridge observes and synthesizes one host session. All function
/// pointers are mandatory. Install functions return 0 on success.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct GostlinkSessionVtable {
    /// Copy the requested hostname into `buf`; returns its length, or 0
    pub hostname: unsafe extern "C" fn(ctx: *mut c_void, buf: *mut u8, cap: usize) -> c_int,
    /// Copy the ALPN offer (wire format) into `buf`; returns its length, or 0
    pub alpn_offer: unsafe extern "C" fn(ctx: *mut c_void, buf: *mut u8, cap: usize) -> c_int,
    /// Whether a session is already established
    pub is_established: unsafe extern "C" fn(ctx: *mut c_void) -> c_int,
    /// Suite the host's own handshake negotiated, or -1
    pub negotiated_suite: unsafe extern "C" fn(ctx: *mut c_void) -> c_int,
    /// Move the host state machine into connecting
    pub begin_connect: unsafe extern "C" fn(ctx: *mut c_void),
    /// Signal the wait state: 0 idle, 1 reading, 2 writing, 3 cert lookup
    pub set_wait_state: unsafe extern "C" fn(ctx: *mut c_void, state: u32),
    /// Record the negotiated application protocol
    pub install_alpn:
        unsafe extern "C" fn(ctx: *mut c_void, proto: *const u8, len: usize) -> c_int,
    /// Allocate a session with the given wire version and suite
    pub install_session:
        unsafe extern "C" fn(ctx: *mut c_void, wire_version: u16, suite: u16) -> c_int,
    /// Copy the peer chain, leaf first
    pub install_peer_chain:
        unsafe extern "C" fn(ctx: *mut c_void, certs: *const GostlinkBuf, count: usize) -> c_int,
    /// Mark the handshake complete
    pub mark_established: unsafe extern "C" fn(ctx: *mut c_void),
    /// Fire the handshake-completion callback
    pub notify_handshake_done: unsafe extern "C" fn(ctx: *mut c_void),
    /// Raise the host's alternate-suite-required error marker
    pub raise_alternate_required: unsafe extern "C" fn(ctx: *mut c_void),
    /// Whether a certificate-selection callback is configured
    pub wants_client_cert: unsafe extern "C" fn(ctx: *mut c_void) -> c_int,
    /// Whether the issuer list is already populated
    pub issuers_installed: unsafe extern "C" fn(ctx: *mut c_void) -> c_int,
    /// Populate the issuer-name list
    pub install_issuers:
        unsafe extern "C" fn(ctx: *mut c_void, names: *const GostlinkBuf, count: usize) -> c_int,
    /// Invoke the selection callback: positive continue, 0 fail, negative retry
    pub select_client_cert: unsafe extern "C" fn(ctx: *mut c_void) -> c_int,
}

/// How the bridge enumerates the platform personal store during client
/// certificate selection.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct GostlinkStoreVtable {
    /// Store context
    pub ctx: *mut c_void,
    /// Number of certificates in the personal store, or -1 when unopenable
    pub count: unsafe extern "C" fn(ctx: *mut c_void) -> c_int,
    /// Borrow certificate `index`; sets `has_private_key`; returns 1 on success
    pub cert: unsafe extern "C" fn(
        ctx: *mut c_void,
        index: c_int,
        out: *mut GostlinkBuf,
        has_private_key: *mut c_int,
    ) -> c_int,
}

struct ExternEngine {
    vt: GostlinkEngineVtable,
}

// The vtable is registered once and required to stay valid for the process
// lifetime; the host guarantees its functions are callable from any thread.
unsafe impl Send for ExternEngine {}
unsafe impl Sync for ExternEngine {}

impl GostEngine for ExternEngine {
    fn open(&self) -> Result<Box<dyn EngineHandle>> {
        let raw = unsafe { (self.vt.open)(self.vt.ctx) };
        if raw.is_null() {
            return Err(Error::engine("provider refused to open a session"));
        }
        Ok(Box::new(ExternHandle { vt: self.vt, raw }))
    }
}

struct ExternHandle {
    vt: GostlinkEngineVtable,
    raw: *mut c_void,
}

unsafe impl Send for ExternHandle {}

impl Drop for ExternHandle {
    fn drop(&mut self) {
        unsafe { (self.vt.close)(self.raw) };
    }
}

impl ExternHandle {
    fn borrowed_list(
        &self,
        count: unsafe extern "C" fn(*mut c_void) -> c_int,
        get: unsafe extern "C" fn(*mut c_void, c_int, *mut GostlinkBuf) -> c_int,
    ) -> Option<Vec<Bytes>> {
        let n = unsafe { count(self.raw) };
        if n < 0 {
            return None;
        }
        let mut out = Vec::with_capacity(n as usize);
        for i in 0..n {
            let mut buf = GostlinkBuf {
                ptr: std::ptr::null(),
                len: 0,
            };
            if unsafe { get(self.raw, i, &mut buf) } != 1 || (buf.ptr.is_null() && buf.len != 0) {
                return None;
            }
            let der: &[u8] = if buf.len == 0 {
                &[]
            } else {
                unsafe { std::slice::from_raw_parts(buf.ptr, buf.len) }
            };
            out.push(Bytes::copy_from_slice(der));
        }
        Some(out)
    }
}

impl EngineHandle for ExternHandle {
    fn set_hostname(&mut self, hostname: &str) {
        if let Ok(c) = std::ffi::CString::new(hostname) {
            unsafe { (self.vt.set_hostname)(self.raw, c.as_ptr()) };
        }
    }

    fn set_cache_tag(&mut self, tag: &str) {
        if let Ok(c) = std::ffi::CString::new(tag) {
            unsafe { (self.vt.set_cache_tag)(self.raw, c.as_ptr()) };
        }
    }

    fn set_alpn_offer(&mut self, protocols: &[u8]) {
        unsafe { (self.vt.set_alpn_offer)(self.raw, protocols.as_ptr(), protocols.len()) };
    }

    fn connect_step(&mut self) -> i32 {
        unsafe { (self.vt.connect_step)(self.raw) }
    }

    fn read(&mut self, buf: &mut [u8]) -> i32 {
        unsafe { (self.vt.read)(self.raw, buf.as_mut_ptr(), buf.len()) }
    }

    fn write(&mut self, buf: &[u8]) -> i32 {
        unsafe { (self.vt.write)(self.raw, buf.as_ptr(), buf.len()) }
    }

    fn state(&self) -> EngineState {
        EngineState::new(unsafe { (self.vt.state)(self.raw) })
    }

    fn cipher_info(&self) -> Option<CipherInfo> {
        let mut protocol = 0u32;
        let mut suite = 0u16;
        let ok = unsafe { (self.vt.cipher_info)(self.raw, &mut protocol, &mut suite) };
        (ok == 1).then_some(CipherInfo { protocol, suite })
    }

    fn selected_alpn(&self) -> Option<String> {
        let mut buf = [0u8; 255];
        let len = unsafe { (self.vt.selected_alpn)(self.raw, buf.as_mut_ptr(), buf.len()) };
        if len <= 0 || len as usize > buf.len() {
            return None;
        }
        String::from_utf8(buf[..len as usize].to_vec()).ok()
    }

    fn peer_certs(&self) -> Vec<Bytes> {
        self.borrowed_list(self.vt.peer_cert_count, self.vt.peer_cert)
            .unwrap_or_default()
    }

    fn issuer_names(&self) -> Option<Vec<Bytes>> {
        self.borrowed_list(self.vt.issuer_count, self.vt.issuer_name)
    }

    fn verify_peer(&self) -> VerifyOutcome {
        match unsafe { (self.vt.verify_peer)(self.raw) } {
            0 => VerifyOutcome::Trusted,
            1 => VerifyOutcome::Untrusted,
            code => VerifyOutcome::Other(code),
        }
    }

    fn set_client_cert(&mut self, der: &[u8]) -> bool {
        unsafe { (self.vt.set_client_cert)(self.raw, der.as_ptr(), der.len()) == 1 }
    }
}

struct ExternSession {
    vt: GostlinkSessionVtable,
    ctx: *mut c_void,
}

impl ExternSession {
    fn copied_string(
        &self,
        get: unsafe extern "C" fn(*mut c_void, *mut u8, usize) -> c_int,
    ) -> Option<Vec<u8>> {
        let mut buf = [0u8; 1024];
        let len = unsafe { get(self.ctx, buf.as_mut_ptr(), buf.len()) };
        if len <= 0 || len as usize > buf.len() {
            return None;
        }
        Some(buf[..len as usize].to_vec())
    }

    fn install_list(
        &self,
        items: &[Bytes],
        install: unsafe extern "C" fn(*mut c_void, *const GostlinkBuf, usize) -> c_int,
        what: &str,
    ) -> Result<()> {
        let bufs: Vec<GostlinkBuf> = items
            .iter()
            .map(|b| GostlinkBuf {
                ptr: b.as_ptr(),
                len: b.len(),
            })
            .collect();
        if unsafe { install(self.ctx, bufs.as_ptr(), bufs.len()) } != 0 {
            return Err(Error::synthesis(format!("host rejected {what}")));
        }
        Ok(())
    }
}

impl HostSession for ExternSession {
    fn hostname(&self) -> Option<String> {
        self.copied_string(self.vt.hostname)
            .and_then(|v| String::from_utf8(v).ok())
    }

    fn alpn_offer(&self) -> Option<Vec<u8>> {
        self.copied_string(self.vt.alpn_offer)
    }

    fn is_established(&self) -> bool {
        unsafe { (self.vt.is_established)(self.ctx) != 0 }
    }

    fn negotiated_suite(&self) -> Option<u16> {
        let suite = unsafe { (self.vt.negotiated_suite)(self.ctx) };
        u16::try_from(suite).ok()
    }

    fn begin_connect(&mut self) {
        unsafe { (self.vt.begin_connect)(self.ctx) };
    }

    fn set_wait_state(&mut self, state: WaitState) {
        let code = match state {
            WaitState::Idle => 0,
            WaitState::Reading => 1,
            WaitState::Writing => 2,
            WaitState::X509Lookup => 3,
        };
        unsafe { (self.vt.set_wait_state)(self.ctx, code) };
    }

    fn install_alpn(&mut self, protocol: &[u8]) -> Result<()> {
        if unsafe { (self.vt.install_alpn)(self.ctx, protocol.as_ptr(), protocol.len()) } != 0 {
            return Err(Error::synthesis("host rejected application protocol"));
        }
        Ok(())
    }

    fn install_session(&mut self, version: TlsVersion, suite: u16) -> Result<()> {
        if unsafe { (self.vt.install_session)(self.ctx, version.wire_id(), suite) } != 0 {
            return Err(Error::synthesis("host rejected session parameters"));
        }
        Ok(())
    }

    fn install_peer_chain(&mut self, chain: &[Bytes]) -> Result<()> {
        self.install_list(chain, self.vt.install_peer_chain, "peer chain")
    }

    fn mark_established(&mut self) {
        unsafe { (self.vt.mark_established)(self.ctx) };
    }

    fn notify_handshake_done(&mut self) {
        unsafe { (self.vt.notify_handshake_done)(self.ctx) };
    }

    fn raise_alternate_required(&mut self) {
        unsafe { (self.vt.raise_alternate_required)(self.ctx) };
    }

    fn wants_client_cert(&self) -> bool {
        unsafe { (self.vt.wants_client_cert)(self.ctx) != 0 }
    }

    fn issuers_installed(&self) -> bool {
        unsafe { (self.vt.issuers_installed)(self.ctx) != 0 }
    }

    fn install_issuers(&mut self, names: &[Bytes]) -> Result<()> {
        self.install_list(names, self.vt.install_issuers, "issuer list")
    }

    fn select_client_cert(&mut self) -> i32 {
        unsafe { (self.vt.select_client_cert)(self.ctx) }
    }
}

struct ExternStore {
    vt: GostlinkStoreVtable,
}

// The store vtable only lives for one enumeration call; the host guarantees
// its functions are callable from any thread.
unsafe impl Send for ExternStore {}
unsafe impl Sync for ExternStore {}

impl CertStore for ExternStore {
    fn personal_certs(&self) -> Result<Vec<StoreCandidate>> {
        let n = unsafe { (self.vt.count)(self.vt.ctx) };
        if n < 0 {
            return Err(Error::cert_store("personal store unopenable"));
        }
        let mut out = Vec::with_capacity(n as usize);
        for i in 0..n {
            let mut buf = GostlinkBuf {
                ptr: std::ptr::null(),
                len: 0,
            };
            let mut has_key: c_int = 0;
            if unsafe { (self.vt.cert)(self.vt.ctx, i, &mut buf, &mut has_key) } != 1
                || buf.ptr.is_null()
            {
                continue;
            }
            let der = unsafe { std::slice::from_raw_parts(buf.ptr, buf.len) };
            out.push(StoreCandidate {
                der: Bytes::copy_from_slice(der),
                has_private_key: has_key != 0,
            });
        }
        Ok(out)
    }
}

struct ExternCaps {
    has_cipher: unsafe extern "C" fn(suite: u16) -> c_int,
}

impl HostCapabilities for ExternCaps {
    fn has_cipher(&self, suite: u16) -> bool {
        unsafe { (self.has_cipher)(suite) != 0 }
    }
}

static BRIDGE: OnceLock<Bridge> = OnceLock::new();

fn bridge() -> Option<&'static Bridge> {
    BRIDGE.get()
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_target(false)
            .init();
    });
}

/// Initialize the bridge.
///
/// Must be called once before any other function. `has_cipher` answers
/// whether the host stack recognizes a numeric cipher-suite identifier.
/// `status_path`, when non-null, names a JSON file persisting host
/// capability statuses across restarts.
///
/// # Safety
///
/// `engine` must point to a fully populated vtable whose functions stay
/// callable for the process lifetime.
#[no_mangle]
pub unsafe extern "C" fn gostlink_init(
    engine: *const GostlinkEngineVtable,
    has_cipher: Option<unsafe extern "C" fn(suite: u16) -> c_int>,
    status_path: *const c_char,
) -> c_int {
    init_tracing();

    let (engine, has_cipher) = match (engine.as_ref(), has_cipher) {
        (Some(engine), Some(has_cipher)) => (engine, has_cipher),
        _ => return GOSTLINK_ERROR_INVALID_ARG,
    };
    if BRIDGE.get().is_some() {
        return GOSTLINK_OK;
    }

    let extern_engine = Box::new(ExternEngine { vt: *engine });
    let caps = ExternCaps { has_cipher };
    let store = persistent_store(status_path);

    let built = match store {
        Some(store) => Bridge::with_store(extern_engine, &caps, BridgeConfig::default(), store),
        None => Bridge::new(extern_engine, &caps, BridgeConfig::default()),
    };
    match built {
        Ok(bridge) => {
            let _ = BRIDGE.set(bridge);
            GOSTLINK_OK
        }
        Err(Error::EngineUnavailable(_)) => GOSTLINK_ERROR_ENGINE,
        Err(Error::MissingCipher(_)) => GOSTLINK_ERROR_CIPHER,
        Err(_) => GOSTLINK_ERROR,
    }
}

#[cfg(feature = "persist")]
unsafe fn persistent_store(status_path: *const c_char) -> Option<Box<dyn StatusStore>> {
    if status_path.is_null() {
        return None;
    }
    let path = CStr::from_ptr(status_path).to_str().ok()?;
    Some(Box::new(crate::cache::FileStatusStore::open(path)))
}

#[cfg(not(feature = "persist"))]
unsafe fn persistent_store(_status_path: *const c_char) -> Option<Box<dyn StatusStore>> {
    None
}

/// Register a worker for a session, signaling intent to bridge it.
///
/// # Safety
///
/// `session` must point to a fully populated vtable valid for this call;
/// `session_ctx` is passed back to it unchanged. `discriminator` is a
/// null-terminated string or null.
#[no_mangle]
pub unsafe extern "C" fn gostlink_register(
    id: u64,
    session: *const GostlinkSessionVtable,
    session_ctx: *mut c_void,
    discriminator: *const c_char,
) -> c_int {
    let Some(bridge) = bridge() else {
        return GOSTLINK_ERROR_UNINITIALIZED;
    };
    let Some(vt) = session.as_ref() else {
        return GOSTLINK_ERROR_INVALID_ARG;
    };
    let discriminator = if discriminator.is_null() {
        None
    } else {
        match CStr::from_ptr(discriminator).to_str() {
            Ok(s) => Some(s.to_owned()),
            Err(_) => return GOSTLINK_ERROR_INVALID_ARG,
        }
    };

    let session = ExternSession {
        vt: *vt,
        ctx: session_ctx,
    };
    match bridge.register(id, &session, discriminator.as_deref()) {
        Ok(()) => GOSTLINK_OK,
        Err(Error::EngineUnavailable(_)) => GOSTLINK_ERROR_ENGINE,
        Err(_) => GOSTLINK_ERROR,
    }
}

unsafe fn with_session<F>(
    session: *const GostlinkSessionVtable,
    session_ctx: *mut c_void,
    f: F,
) -> c_int
where
    F: FnOnce(&'static Bridge, &mut ExternSession) -> Verdict,
{
    let Some(bridge) = bridge() else {
        return GOSTLINK_ERROR_UNINITIALIZED;
    };
    let Some(vt) = session.as_ref() else {
        return GOSTLINK_ERROR_INVALID_ARG;
    };
    let mut session = ExternSession {
        vt: *vt,
        ctx: session_ctx,
    };
    match f(bridge, &mut session) {
        Verdict::Native => GOSTLINK_NATIVE,
        Verdict::Alternate(code) => code,
    }
}

/// Drive the alternate handshake for a session.
///
/// Returns [`GOSTLINK_NATIVE`] when the host should negotiate natively,
/// otherwise the engine's result code (1 on completion).
///
/// # Safety
///
/// Same contract as [`gostlink_register`].
#[no_mangle]
pub unsafe extern "C" fn gostlink_connect(
    id: u64,
    session: *const GostlinkSessionVtable,
    session_ctx: *mut c_void,
) -> c_int {
    with_session(session, session_ctx, |bridge, s| bridge.connect(id, s))
}

/// Read decrypted application data for a bridged session.
///
/// # Safety
///
/// `buf` must be valid for `len` writable bytes; same session contract as
/// [`gostlink_register`].
#[no_mangle]
pub unsafe extern "C" fn gostlink_read(
    id: u64,
    session: *const GostlinkSessionVtable,
    session_ctx: *mut c_void,
    buf: *mut u8,
    len: usize,
) -> c_int {
    // a slice pointer must be non-null even for length zero
    let slice: &mut [u8] = if len == 0 {
        &mut []
    } else if buf.is_null() {
        return GOSTLINK_ERROR_INVALID_ARG;
    } else {
        std::slice::from_raw_parts_mut(buf, len)
    };
    with_session(session, session_ctx, |bridge, s| bridge.read(id, s, slice))
}

/// Write application data through a bridged session.
///
/// # Safety
///
/// `buf` must be valid for `len` readable bytes; same session contract as
/// [`gostlink_register`].
#[no_mangle]
pub unsafe extern "C" fn gostlink_write(
    id: u64,
    session: *const GostlinkSessionVtable,
    session_ctx: *mut c_void,
    buf: *const u8,
    len: usize,
) -> c_int {
    // a slice pointer must be non-null even for length zero
    let slice: &[u8] = if len == 0 {
        &[]
    } else if buf.is_null() {
        return GOSTLINK_ERROR_INVALID_ARG;
    } else {
        std::slice::from_raw_parts(buf, len)
    };
    with_session(session, session_ctx, |bridge, s| bridge.write(id, s, slice))
}

/// Release the worker for a session. Idempotent; safe for never-registered
/// identities.
#[no_mangle]
pub extern "C" fn gostlink_free(id: u64) {
    if let Some(bridge) = bridge() {
        bridge.free(id);
    }
}

/// Check whether the host's native handshake negotiated a GOST suite and
/// must be retried through the alternate engine. Returns 1 when it must.
///
/// # Safety
///
/// Same contract as [`gostlink_register`].
#[no_mangle]
pub unsafe extern "C" fn gostlink_tls_gost_required(
    id: u64,
    session: *const GostlinkSessionVtable,
    session_ctx: *mut c_void,
) -> c_int {
    let Some(bridge) = bridge() else {
        return 0;
    };
    let Some(vt) = session.as_ref() else {
        return 0;
    };
    let mut session = ExternSession {
        vt: *vt,
        ctx: session_ctx,
    };
    bridge.alternate_suite_required(id, &mut session) as c_int
}

/// Verification verdict for a bridged session: 0 when the host verifies
/// natively, 1 when the engine trusts the chain, otherwise an error code.
#[no_mangle]
pub extern "C" fn gostlink_verify_result(id: u64) -> u32 {
    match bridge() {
        Some(bridge) => bridge.verify_result(id),
        None => 0,
    }
}

/// Pin a selected client certificate for the next handshake step.
///
/// # Safety
///
/// `der` must be valid for `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn gostlink_pin_client_cert(
    id: u64,
    der: *const u8,
    len: usize,
) -> c_int {
    if der.is_null() || len == 0 {
        return GOSTLINK_ERROR_INVALID_ARG;
    }
    let Some(bridge) = bridge() else {
        return GOSTLINK_ERROR_UNINITIALIZED;
    };
    bridge.pin_client_cert(id, std::slice::from_raw_parts(der, len));
    GOSTLINK_OK
}

/// Enumerate engine-capable client certificates for an in-flight
/// alternate-suite handshake.
///
/// Invokes `emit` once per eligible certificate. Returns the number
/// emitted, or [`GOSTLINK_NATIVE`] when the handshake is not on the
/// alternate path and the host should enumerate natively.
///
/// # Safety
///
/// `store` must point to a fully populated vtable valid for this call.
#[no_mangle]
pub unsafe extern "C" fn gostlink_client_cert_candidates(
    id: u64,
    store: *const GostlinkStoreVtable,
    now_unix: i64,
    emit: Option<unsafe extern "C" fn(ctx: *mut c_void, der: *const u8, len: usize)>,
    emit_ctx: *mut c_void,
) -> c_int {
    let Some(bridge) = bridge() else {
        return GOSTLINK_ERROR_UNINITIALIZED;
    };
    let (Some(vt), Some(emit)) = (store.as_ref(), emit) else {
        return GOSTLINK_ERROR_INVALID_ARG;
    };

    let store = ExternStore { vt: *vt };
    match bridge.client_cert_candidates(id, &store, now_unix) {
        None => GOSTLINK_NATIVE,
        Some(certs) => {
            for der in &certs {
                emit(emit_ctx, der.as_ptr(), der.len());
            }
            certs.len() as c_int
        }
    }
}

/// Classify a DER-encoded certificate: returns 1 when its signature
/// algorithm is a recognized GOST OID. Malformed input classifies as 0.
///
/// # Safety
///
/// `der` must be valid for `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn gostlink_is_gost_cert(der: *const u8, len: usize) -> c_int {
    if der.is_null() || len == 0 {
        return 0;
    }
    certs::is_gost_certificate(std::slice::from_raw_parts(der, len)) as c_int
}

/// Engine result code meaning an operation completed.
#[no_mangle]
pub extern "C" fn gostlink_done_code() -> c_int {
    ENGINE_DONE
}

/// Get the library version string. Caller must not free this pointer.
#[no_mangle]
pub extern "C" fn gostlink_version() -> *const c_char {
    static VERSION: &[u8] = b"0.1.0\0";
    VERSION.as_ptr() as *const c_char
}
