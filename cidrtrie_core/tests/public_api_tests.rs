use std::{
    ffi::{CStr, CString},
    os::raw::{c_char, c_ulonglong},
    ptr,
    sync::atomic::{AtomicU64, Ordering},
};

use cidrtrie_core::*;

fn c(s: &str) -> CString {
    CString::new(s).unwrap()
}

fn open(ipv6: bool) -> CidrTreeHandle {
    let mut h: CidrTreeHandle = ptr::null_mut();
    assert_eq!(cidrtrie_open(ipv6, 0, &mut h), ErrorCode::Success);
    assert!(!h.is_null());
    h
}

fn find(h: CidrTreeHandle, cidr: &str) -> Result<u64, ErrorCode> {
    let mut out = 0u64;
    match cidrtrie_find(h, c(cidr).as_ptr(), &mut out) {
        ErrorCode::Success => Ok(out),
        code => Err(code),
    }
}

#[test]
fn add_find_delete_round_trip() {
    let h = open(false);
    assert_eq!(cidrtrie_add(h, c("192.168.0.0/16").as_ptr(), 7), ErrorCode::Success);
    assert_eq!(cidrtrie_add(h, c("192.168.1.0/24").as_ptr(), 8), ErrorCode::Success);
    assert_eq!(find(h, "192.168.1.9"), Ok(8));
    assert_eq!(find(h, "192.168.2.9"), Ok(7));

    assert_eq!(cidrtrie_add(h, c("192.168.0.0/16").as_ptr(), 9), ErrorCode::NodeBusy);
    assert_eq!(cidrtrie_last_error(), ErrorCode::NodeBusy);
    assert_eq!(cidrtrie_set(h, c("192.168.0.0/16").as_ptr(), 9), ErrorCode::Success);
    assert_eq!(cidrtrie_last_error(), ErrorCode::Success);
    assert_eq!(find(h, "192.168.2.9"), Ok(9));

    assert_eq!(cidrtrie_delete(h, c("192.168.0.0/16").as_ptr()), ErrorCode::Success);
    assert_eq!(find(h, "192.168.2.9"), Err(ErrorCode::NotFound));
    assert_eq!(find(h, "192.168.1.9"), Ok(8));

    let mut len = 0u64;
    assert_eq!(cidrtrie_len(h, &mut len), ErrorCode::Success);
    assert_eq!(len, 1);
    cidrtrie_close(h);
}

#[test]
fn whole_range_reports_removed_count() {
    let h = open(true);
    for (cidr, v) in [("2001:db8::/32", 1), ("2001:db8:1::/48", 2), ("10.0.0.0/8", 3)] {
        assert_eq!(cidrtrie_add(h, c(cidr).as_ptr(), v), ErrorCode::Success);
    }
    let mut removed = 0u64;
    assert_eq!(
        cidrtrie_delete_whole_range(h, c("2001:db8::/32").as_ptr(), &mut removed),
        ErrorCode::Success
    );
    assert_eq!(removed, 2);
    assert_eq!(find(h, "10.1.1.1"), Ok(3));

    // out pointer is optional
    assert_eq!(
        cidrtrie_delete_whole_range(h, c("10.0.0.0/8").as_ptr(), ptr::null_mut()),
        ErrorCode::Success
    );
    assert_eq!(
        cidrtrie_delete_whole_range(h, c("10.0.0.0/8").as_ptr(), ptr::null_mut()),
        ErrorCode::NotFound
    );

    assert_eq!(cidrtrie_add(h, c("::/0").as_ptr(), 4), ErrorCode::Success);
    assert_eq!(cidrtrie_clear(h), ErrorCode::Success);
    assert_eq!(find(h, "::1"), Err(ErrorCode::NotFound));
    cidrtrie_close(h);
}

#[test]
fn bad_input_and_null_pointers() {
    let h = open(false);
    assert_eq!(cidrtrie_add(h, c("300.0.0.0/8").as_ptr(), 1), ErrorCode::BadAddress);
    assert_eq!(cidrtrie_last_error(), ErrorCode::BadAddress);
    assert_eq!(cidrtrie_add(h, c("2001:db8::/32").as_ptr(), 1), ErrorCode::BadAddress);
    assert_eq!(cidrtrie_add(h, ptr::null(), 1), ErrorCode::Utf8Error);

    let invalid = [0xffu8, 0xfe, 0x00];
    assert_eq!(
        cidrtrie_add(h, invalid.as_ptr() as *const c_char, 1),
        ErrorCode::Utf8Error
    );

    assert_eq!(
        cidrtrie_add(ptr::null_mut(), c("1.0.0.0/8").as_ptr(), 1),
        ErrorCode::InvalidHandle
    );
    assert_eq!(
        cidrtrie_find(h, c("1.0.0.1").as_ptr(), ptr::null_mut()),
        ErrorCode::InvalidHandle
    );
    assert_eq!(cidrtrie_len(h, ptr::null_mut()), ErrorCode::InvalidHandle);
    assert_eq!(
        cidrtrie_open(false, 0, ptr::null_mut()),
        ErrorCode::InvalidHandle
    );

    // closing NULL is a no-op
    cidrtrie_close(ptr::null_mut());
    cidrtrie_close(h);
}

#[test]
fn strerror_is_nul_terminated() {
    for code in [
        ErrorCode::Success,
        ErrorCode::BadAddress,
        ErrorCode::NodeBusy,
        ErrorCode::NotFound,
        ErrorCode::CapacityExceeded,
        ErrorCode::InvalidHandle,
        ErrorCode::Utf8Error,
        ErrorCode::Unknown,
    ] {
        let text = unsafe { CStr::from_ptr(cidrtrie_strerror(code)) };
        assert_eq!(text.to_str().unwrap(), code.as_str());
    }
}

#[test]
fn error_maps_to_code() {
    assert_eq!(ErrorCode::from(Error::BadAddress), ErrorCode::BadAddress);
    assert_eq!(ErrorCode::from(Error::NodeBusy), ErrorCode::NodeBusy);
    assert_eq!(ErrorCode::from(Error::NotFound), ErrorCode::NotFound);
    assert_eq!(ErrorCode::from(Error::CapacityExceeded), ErrorCode::CapacityExceeded);
}

static INSERTS: AtomicU64 = AtomicU64::new(0);
static LIVE_REPORTS: AtomicU64 = AtomicU64::new(0);

unsafe extern "C" fn on_stat(name: *const c_char, value: c_ulonglong) {
    let name = unsafe { CStr::from_ptr(name) };
    match name.to_bytes() {
        b"cidrtrie_inserts_total" => {
            INSERTS.fetch_add(value, Ordering::Relaxed);
        }
        b"cidrtrie_live_nodes" => {
            LIVE_REPORTS.fetch_add(1, Ordering::Relaxed);
        }
        _ => {}
    }
}

#[test]
fn stats_callback_receives_metrics() {
    assert!(unsafe { cidrtrie_register_stats_callback(on_stat) });
    // only the first registration wins
    assert!(!unsafe { cidrtrie_register_stats_callback(on_stat) });

    let h = open(false);
    let before = INSERTS.load(Ordering::Relaxed);
    assert_eq!(cidrtrie_add(h, c("1.0.0.0/8").as_ptr(), 1), ErrorCode::Success);
    assert_eq!(cidrtrie_add(h, c("2.0.0.0/8").as_ptr(), 2), ErrorCode::Success);
    assert!(INSERTS.load(Ordering::Relaxed) >= before + 2);

    assert_eq!(cidrtrie_report_metrics(h), ErrorCode::Success);
    assert!(LIVE_REPORTS.load(Ordering::Relaxed) >= 1);
    cidrtrie_close(h);
}
