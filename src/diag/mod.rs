/*!
 * Instrumentation Sink
 *
 * Injectable collaborator for debug names and lifetime markers. The active
 * sink is swappable at runtime; the default forwards to the `log` facade.
 * Marker call sites inside the primitives are compiled in only with the
 * `diagnostics` feature, so production builds carry no reporting overhead.
 */

use parking_lot::RwLock;
use std::sync::Arc;

/// Receives lifetime markers from threads and fibers.
///
/// All methods default to no-ops so a sink implements only the events it
/// cares about (e.g. a profiler bridge that only tracks fiber switches).
pub trait Instrumentation: Send + Sync {
    fn thread_started(&self, _name: &str) {}
    fn thread_exited(&self, _name: &str) {}
    fn fiber_created(&self, _name: &str) {}
    fn fiber_switched(&self, _name: &str) {}
    fn fiber_exited(&self, _name: &str) {}
}

/// Default sink forwarding markers to the log facade.
#[cfg(feature = "diagnostics")]
struct LogSink;

#[cfg(feature = "diagnostics")]
impl Instrumentation for LogSink {
    fn thread_started(&self, name: &str) {
        if !name.is_empty() {
            log::trace!("thread started: '{}'", name);
        }
    }

    fn thread_exited(&self, name: &str) {
        if !name.is_empty() {
            log::trace!("thread exited: '{}'", name);
        }
    }

    fn fiber_created(&self, name: &str) {
        if !name.is_empty() {
            log::trace!("fiber created: '{}'", name);
        }
    }

    fn fiber_switched(&self, name: &str) {
        if !name.is_empty() {
            log::trace!("fiber switched to: '{}'", name);
        }
    }

    fn fiber_exited(&self, name: &str) {
        if !name.is_empty() {
            log::trace!("fiber exited: '{}'", name);
        }
    }
}

static SINK: RwLock<Option<Arc<dyn Instrumentation>>> = RwLock::new(None);

/// Install a custom sink process-wide.
pub fn set_sink(sink: Arc<dyn Instrumentation>) {
    *SINK.write() = Some(sink);
}

/// Restore the default log-facade sink.
pub fn reset_sink() {
    *SINK.write() = None;
}

#[cfg(feature = "diagnostics")]
fn with_sink(f: impl FnOnce(&dyn Instrumentation)) {
    let guard = SINK.read();
    match guard.as_deref() {
        Some(sink) => f(sink),
        None => f(&LogSink),
    }
}

#[cfg(feature = "diagnostics")]
pub(crate) fn thread_started(name: &str) {
    with_sink(|sink| sink.thread_started(name));
}

#[cfg(feature = "diagnostics")]
pub(crate) fn thread_exited(name: &str) {
    with_sink(|sink| sink.thread_exited(name));
}

#[cfg(feature = "diagnostics")]
pub(crate) fn fiber_created(name: &str) {
    with_sink(|sink| sink.fiber_created(name));
}

#[cfg(feature = "diagnostics")]
pub(crate) fn fiber_switched(name: &str) {
    with_sink(|sink| sink.fiber_switched(name));
}

#[cfg(feature = "diagnostics")]
pub(crate) fn fiber_exited(name: &str) {
    with_sink(|sink| sink.fiber_exited(name));
}
