//! Stats callback bridge for the `metrics` facade.
//!
//! Prometheus export is left out. A host process can register a raw
//! callback that receives name/value pairs; until it does, no recorder is
//! installed and the `metrics` macros in the engine are no-ops (or feed
//! whatever recorder the host installed itself).

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use once_cell::sync::OnceCell;
use std::ffi::CString;
use std::collections::HashMap;
use std::os::raw::{c_char, c_ulonglong};
use std::sync::{Arc, RwLock};

/// Signature for external collectors.
///
/// `name` is NUL-terminated and lives for the rest of the process. Counter
/// increments and gauge adjustments arrive as the delta; a gauge decrement
/// passes the positive amount removed, so collectors that need direction
/// should rely on `set`-style gauges (all gauges this crate emits are).
pub type StatsCallback = unsafe extern "C" fn(name: *const c_char, value: c_ulonglong);

static CALLBACK: OnceCell<StatsCallback> = OnceCell::new();

/// Register `cb` and install the forwarding recorder. Only the first
/// registration wins; returns whether this one did.
pub fn register_callback(cb: StatsCallback) -> bool {
    let fresh = CALLBACK.set(cb).is_ok();
    if fresh {
        init();
    }
    fresh
}

/// Forwards every metric to [`CALLBACK`]. Handles are built once per metric
/// name; the `metrics` macros re-register on every call, so later calls
/// only clone the cached `Arc`.
#[derive(Default)]
struct CallbackRecorder {
    forwards: RwLock<HashMap<KeyName, Arc<Forward>>>,
}

impl CallbackRecorder {
    fn forward(&self, key: &Key) -> Arc<Forward> {
        if let Ok(map) = self.forwards.read() {
            if let Some(fwd) = map.get(key.name()) {
                return Arc::clone(fwd);
            }
        }
        match self.forwards.write() {
            Ok(mut map) => Arc::clone(
                map.entry(KeyName::from(key.name().to_owned()))
                    .or_insert_with(|| Arc::new(Forward::new(key))),
            ),
            // poisoned: still report, just without caching
            Err(_) => Arc::new(Forward::new(key)),
        }
    }
}

/// One registered metric; owns a NUL-terminated copy of its name.
struct Forward {
    name: CString,
}

impl Forward {
    fn new(key: &Key) -> Self {
        Self {
            name: CString::new(key.name()).unwrap_or_default(),
        }
    }

    fn emit(&self, value: u64) {
        if let Some(cb) = CALLBACK.get() {
            unsafe { cb(self.name.as_ptr(), value as c_ulonglong) };
        }
    }
}

impl Recorder for CallbackRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(self.forward(key))
    }
    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(self.forward(key))
    }
    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(self.forward(key))
    }
}

impl metrics::CounterFn for Forward {
    fn increment(&self, value: u64) {
        self.emit(value);
    }
    fn absolute(&self, value: u64) {
        self.emit(value);
    }
}

// Gauges and histograms are reported truncated to whole numbers.
impl metrics::GaugeFn for Forward {
    fn increment(&self, value: f64) {
        self.emit(value as u64);
    }
    fn decrement(&self, value: f64) {
        self.emit(value as u64);
    }
    fn set(&self, value: f64) {
        self.emit(value as u64);
    }
}

impl metrics::HistogramFn for Forward {
    fn record(&self, value: f64) {
        self.emit(value as u64);
    }
}

/// Install the forwarding recorder exactly once. Fails quietly if the host
/// already set a global recorder.
pub fn init() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        if metrics::set_global_recorder(CallbackRecorder::default()).is_err() {
            log::warn!("[TELEMETRY] a global metrics recorder is already installed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::GaugeFn;
    use std::ffi::CStr;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn handles_are_built_once_per_name() {
        let rec = CallbackRecorder::default();
        let key = Key::from_static_name("cidrtrie_lookups_total");
        let first = rec.forward(&key);
        let again = rec.forward(&key);
        assert!(Arc::ptr_eq(&first, &again));
        let other = rec.forward(&Key::from_static_name("cidrtrie_inserts_total"));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(rec.forwards.read().unwrap().len(), 2);
    }

    static LAST_GAUGE: AtomicU64 = AtomicU64::new(0);

    unsafe extern "C" fn on_stat(name: *const c_char, value: c_ulonglong) {
        if unsafe { CStr::from_ptr(name) }.to_bytes() == b"test_gauge" {
            LAST_GAUGE.store(value, Ordering::SeqCst);
        }
    }

    #[test]
    fn gauge_adjustments_forward_the_delta() {
        register_callback(on_stat);
        let fwd = Forward::new(&Key::from_static_name("test_gauge"));
        fwd.set(40.0);
        assert_eq!(LAST_GAUGE.load(Ordering::SeqCst), 40);
        fwd.decrement(3.0);
        assert_eq!(LAST_GAUGE.load(Ordering::SeqCst), 3);
        fwd.increment(5.0);
        assert_eq!(LAST_GAUGE.load(Ordering::SeqCst), 5);
    }
}
