use crate::{
    errors::{get_last_error, set_last_error, ErrorCode},
    telemetry::{self, StatsCallback},
    types::Family,
    CidrTree,
};
use std::{ffi::CStr, os::raw::c_char};

/// Tree handle owned by the C caller; release it with [`cidrtrie_close`].
/// Values stored through the C ABI are plain `u64`s.
pub type CidrTreeHandle = *mut CidrTree<u64>;

// ─────────────────────────── helpers ─────────────────────────────────── //

#[inline]
fn cstr<'a>(p: *const c_char) -> Result<&'a str, ErrorCode> {
    if p.is_null() {
        return Err(ErrorCode::Utf8Error);
    }
    unsafe { CStr::from_ptr(p) }
        .to_str()
        .map_err(|_| ErrorCode::Utf8Error)
}

#[inline]
fn tree_ref<'a>(h: CidrTreeHandle) -> Result<&'a CidrTree<u64>, ErrorCode> {
    unsafe { h.as_ref() }.ok_or(ErrorCode::InvalidHandle)
}

#[inline]
fn tree_mut<'a>(h: CidrTreeHandle) -> Result<&'a mut CidrTree<u64>, ErrorCode> {
    unsafe { h.as_mut() }.ok_or(ErrorCode::InvalidHandle)
}

/// Record the outcome as the thread's last error and hand it back.
#[inline]
fn finish(r: Result<(), ErrorCode>) -> ErrorCode {
    let code = match r {
        Ok(()) => ErrorCode::Success,
        Err(code) => code,
    };
    set_last_error(code);
    code
}

// early-return on Err, recording the code as the last error
macro_rules! try_c { ($expr:expr) => { match $expr {
    Ok(v)  => v,
    Err(e) => return finish(Err(e)),
}}}

// ───────────────────────── lifetime ──────────────────────────────────── //

/// Create an empty tree. `prealloc` pre-sizes the node arena (0 = default).
/// Returns `Success` **and** stores the handle in `*out`.
#[no_mangle]
pub extern "C" fn cidrtrie_open(ipv6: bool, prealloc: usize, out: *mut CidrTreeHandle) -> ErrorCode {
    if out.is_null() {
        return finish(Err(ErrorCode::InvalidHandle));
    }
    let tree = CidrTree::with_capacity(Family::from_ipv6_flag(ipv6), prealloc);
    unsafe { *out = Box::into_raw(Box::new(tree)) };
    finish(Ok(()))
}

#[no_mangle]
pub extern "C" fn cidrtrie_close(h: CidrTreeHandle) {
    if !h.is_null() {
        unsafe { drop(Box::from_raw(h)) };
    }
}

// ───────────────────────── CRUD ──────────────────────────────────────── //

/// Insert; fails with `NodeBusy` if the exact prefix already has a value.
#[no_mangle]
pub extern "C" fn cidrtrie_add(h: CidrTreeHandle, cidr_utf8: *const c_char, value: u64) -> ErrorCode {
    let tree = try_c!(tree_mut(h));
    let cidr = try_c!(cstr(cidr_utf8));
    finish(tree.add_cidr(cidr, value).map_err(ErrorCode::from))
}

/// Insert or replace.
#[no_mangle]
pub extern "C" fn cidrtrie_set(h: CidrTreeHandle, cidr_utf8: *const c_char, value: u64) -> ErrorCode {
    let tree = try_c!(tree_mut(h));
    let cidr = try_c!(cstr(cidr_utf8));
    finish(tree.set_cidr(cidr, value).map(|_| ()).map_err(ErrorCode::from))
}

/// Remove the exact prefix; nested prefixes stay.
#[no_mangle]
pub extern "C" fn cidrtrie_delete(h: CidrTreeHandle, cidr_utf8: *const c_char) -> ErrorCode {
    let tree = try_c!(tree_mut(h));
    let cidr = try_c!(cstr(cidr_utf8));
    finish(tree.delete_cidr(cidr).map(|_| ()).map_err(ErrorCode::from))
}

/// Remove the prefix and everything nested inside it. `out_removed` may be
/// NULL; otherwise it receives the number of values removed.
#[no_mangle]
pub extern "C" fn cidrtrie_delete_whole_range(
    h: CidrTreeHandle,
    cidr_utf8: *const c_char,
    out_removed: *mut u64,
) -> ErrorCode {
    let tree = try_c!(tree_mut(h));
    let cidr = try_c!(cstr(cidr_utf8));
    let removed = try_c!(tree.delete_whole_range_cidr(cidr).map_err(ErrorCode::from));
    if !out_removed.is_null() {
        unsafe { *out_removed = removed as u64 };
    }
    finish(Ok(()))
}

/// Longest-prefix lookup of an address or subnet.
#[no_mangle]
pub extern "C" fn cidrtrie_find(
    h: CidrTreeHandle,
    cidr_utf8: *const c_char,
    out_value: *mut u64,
) -> ErrorCode {
    if out_value.is_null() {
        return finish(Err(ErrorCode::InvalidHandle));
    }
    let tree = try_c!(tree_ref(h));
    let cidr = try_c!(cstr(cidr_utf8));
    let value = try_c!(tree.find_cidr(cidr).map_err(ErrorCode::from));
    unsafe { *out_value = *value };
    finish(Ok(()))
}

// ───────────────────── introspection & maintenance ───────────────────── //

#[no_mangle]
pub extern "C" fn cidrtrie_len(h: CidrTreeHandle, out: *mut u64) -> ErrorCode {
    if out.is_null() {
        return finish(Err(ErrorCode::InvalidHandle));
    }
    let tree = try_c!(tree_ref(h));
    unsafe { *out = tree.len() as u64 };
    finish(Ok(()))
}

#[no_mangle]
pub extern "C" fn cidrtrie_clear(h: CidrTreeHandle) -> ErrorCode {
    finish(tree_mut(h).map(|t| t.clear()))
}

/// Emit pool gauges through the registered stats callback.
#[no_mangle]
pub extern "C" fn cidrtrie_report_metrics(h: CidrTreeHandle) -> ErrorCode {
    finish(tree_ref(h).map(|t| t.report_pool_metrics()))
}

/// Register a callback from C/other languages.
///
/// # Safety
/// `cb` must stay callable for the life of the process and may be invoked
/// from any thread that uses a tree.
#[no_mangle]
pub unsafe extern "C" fn cidrtrie_register_stats_callback(cb: StatsCallback) -> bool {
    telemetry::register_callback(cb)
}

// ───────────────────── convenience ─────────────────────────────────── //

#[no_mangle]
pub extern "C" fn cidrtrie_last_error() -> ErrorCode {
    get_last_error()
}

#[no_mangle]
pub extern "C" fn cidrtrie_strerror(code: ErrorCode) -> *const c_char {
    code.as_cstr()
}
