use std::{
    alloc::{GlobalAlloc, Layout, System},
    cell::Cell,
    net::IpAddr,
    os::raw::{c_char, c_ulonglong},
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
};

use cidrtrie_core::{cidrtrie_register_stats_callback, CidrTree, Family};
use ipnet::IpNet;

/// System allocator that counts allocations made by threads that opted in.
struct CountingAlloc;

static ALLOCS: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static COUNTING: Cell<bool> = const { Cell::new(false) };
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if COUNTING.try_with(|c| c.get()).unwrap_or(false) {
            ALLOCS.fetch_add(1, Ordering::Relaxed);
        }
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

static LOOKUPS: AtomicU64 = AtomicU64::new(0);

unsafe extern "C" fn on_stat(name: *const c_char, value: c_ulonglong) {
    let name = unsafe { std::ffi::CStr::from_ptr(name) };
    if name.to_bytes() == b"cidrtrie_lookups_total" {
        LOOKUPS.fetch_add(value, Ordering::Relaxed);
    }
}

fn allocs_during(f: impl FnOnce()) -> usize {
    let before = ALLOCS.load(Ordering::Relaxed);
    COUNTING.with(|c| c.set(true));
    f();
    COUNTING.with(|c| c.set(false));
    ALLOCS.load(Ordering::Relaxed) - before
}

#[test]
fn warm_operations_do_not_allocate_with_callback_registered() {
    let mut tree = CidrTree::new(Family::V6);
    tree.add_cidr("2001:db8::/32", 1u64).unwrap();
    tree.add_cidr("10.0.0.0/8", 2).unwrap();
    let v6: IpAddr = "2001:db8::1".parse().unwrap();
    let v4: IpAddr = "10.1.2.3".parse().unwrap();

    let quiet = allocs_during(|| {
        for _ in 0..1_000 {
            assert_eq!(tree.find_addr(v6), Ok(&1));
        }
    });
    assert_eq!(quiet, 0);

    assert!(unsafe { cidrtrie_register_stats_callback(on_stat) });
    // first use of each metric name builds its handle
    tree.find_addr(v4).unwrap();
    tree.add_cidr("2001:db8:1::/48", 3).unwrap();
    tree.delete_cidr("2001:db8:1::/48").unwrap();
    tree.report_pool_metrics();
    let counted = LOOKUPS.load(Ordering::Relaxed);
    let lab: IpNet = "2001:db8:1::/48".parse().unwrap();

    let reported = allocs_during(|| {
        for _ in 0..1_000 {
            assert_eq!(tree.find_addr(v6), Ok(&1));
            assert_eq!(tree.find_addr(v4), Ok(&2));
        }
        // path nodes come back from the free list
        for _ in 0..100 {
            tree.insert_net(lab, 3, false).unwrap();
            tree.remove_net(lab).unwrap();
        }
        tree.report_pool_metrics();
    });
    assert_eq!(reported, 0);
    assert!(LOOKUPS.load(Ordering::Relaxed) >= counted + 2_000);
}
