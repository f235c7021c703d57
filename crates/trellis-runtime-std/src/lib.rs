//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides a [`FrameScheduler`] built on `std` atomics and locks,
//! a [`StdRuntime`] bundling it with an in-memory host tree, a frame pump and
//! the `tracing-subscriber` setup used by binaries and examples.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing_subscriber::EnvFilter;
use trellis_core::{
    ComponentFn, FrameScheduler, HostNodeId, HostTree, InstanceId, MemoryHost, Props,
    RenderError, Runtime, RuntimeConfig, RuntimeHandle,
};

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "TRELLIS_LOG";

const DEFAULT_FILTER: &str = "warn";

type FrameWaker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Scheduler that records frame requests in an atomic flag and optionally
/// wakes an event loop.
pub struct StdScheduler {
    frame_requested: AtomicBool,
    frame_waker: RwLock<Option<FrameWaker>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            frame_requested: AtomicBool::new(false),
            frame_waker: RwLock::new(None),
        }
    }

    /// Returns whether a frame has been requested since the last call.
    pub fn take_frame_request(&self) -> bool {
        self.frame_requested.swap(false, Ordering::SeqCst)
    }

    /// Registers a waker invoked whenever a new frame is scheduled.
    pub fn set_frame_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self
            .frame_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    pub fn clear_frame_waker(&self) {
        *self
            .frame_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wake(&self) {
        let waker = self
            .frame_waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field(
                "frame_requested",
                &self.frame_requested.load(Ordering::SeqCst),
            )
            .finish()
    }
}

impl FrameScheduler for StdScheduler {
    fn schedule_frame(&self) {
        self.frame_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// Convenience container bundling the standard scheduler, a runtime and
/// the root container of its in-memory host tree.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    runtime: Runtime,
    container: HostNodeId,
}

impl StdRuntime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let scheduler = Arc::new(StdScheduler::default());
        let mut host = MemoryHost::new();
        let container = host.create_element("body");
        let runtime = Runtime::with_config(host, scheduler.clone(), config);
        Self {
            scheduler,
            runtime,
            container,
        }
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Host node every root rendered through [`StdRuntime::render`] is
    /// appended to.
    pub fn container(&self) -> HostNodeId {
        self.container
    }

    pub fn render(
        &self,
        component: ComponentFn,
        props: impl Into<Props>,
    ) -> Result<InstanceId, RenderError> {
        self.runtime.render_root(self.container, component, props)
    }

    pub fn take_frame_request(&self) -> bool {
        self.scheduler.take_frame_request()
    }

    pub fn set_frame_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_frame_waker(waker);
    }

    pub fn clear_frame_waker(&self) {
        self.scheduler.clear_frame_waker();
    }

    /// Flushes frame after frame until no instance is dirty and no frame is
    /// requested. Returns the number of instances rendered.
    ///
    /// Gives up after [`RuntimeConfig::max_flush_rounds`] flushes and logs a
    /// warning if work is still pending at that point.
    pub fn pump_until_idle(&self) -> Result<usize, RenderError> {
        let rounds = self.runtime.config().max_flush_rounds;
        let mut rendered = 0;
        for _ in 0..rounds {
            let requested = self.scheduler.take_frame_request();
            if !requested && !self.runtime.needs_flush() {
                return Ok(rendered);
            }
            rendered += self.runtime.flush()?;
        }
        if self.runtime.needs_flush() {
            tracing::warn!(
                rounds,
                runtime = %self.runtime.config().debug_name,
                "frame pump stopped with dirty instances left"
            );
        }
        Ok(rendered)
    }

    /// Markup of everything rendered into the container.
    pub fn to_markup(&self) -> String {
        self.runtime
            .with_host(|host: &MemoryHost| {
                host.children(self.container)
                    .into_iter()
                    .map(|child| host.to_markup(child))
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("runtime", &self.runtime)
            .field("container", &self.container)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs a global fmt subscriber filtered by `TRELLIS_LOG`, defaulting to
/// `warn`. Returns `false` when a global subscriber was already set.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::sync::atomic::AtomicUsize;

    use trellis_core::{markup, record, use_state, Observed, RenderResult};

    use super::*;

    thread_local! {
        static STATE: RefCell<Option<Observed>> = RefCell::new(None);
    }

    fn counter(_: &Props) -> Result<RenderResult, RenderError> {
        let state = use_state(record! { "count" => 0 })?;
        STATE.with(|slot| *slot.borrow_mut() = Some(state.clone()));
        Ok(markup!("<p>{}</p>", state.get_int("count").unwrap_or(0)))
    }

    fn runaway(_: &Props) -> Result<RenderResult, RenderError> {
        let state = use_state(record! { "count" => 0 })?;
        let count = state.get_int("count").unwrap_or(0);
        state.set("count", count + 1);
        Ok(markup!("<p>{}</p>", count))
    }

    fn state() -> Observed {
        STATE.with(|slot| slot.borrow().clone()).expect("state captured")
    }

    #[test]
    fn std_runtime_requests_frame_and_rerenders_on_state_change() {
        let runtime = StdRuntime::new();
        let root = runtime.render(counter, Props::default()).expect("render");
        assert_eq!(runtime.to_markup(), "<p>0</p>");
        assert!(!runtime.take_frame_request());

        state().set("count", 1);
        state().set("count", 2);
        assert!(runtime.take_frame_request(), "write should request a frame");
        assert!(!runtime.take_frame_request());

        assert_eq!(runtime.pump_until_idle().expect("pump"), 1);
        assert_eq!(runtime.to_markup(), "<p>2</p>");
        assert_eq!(runtime.runtime().render_count(root), Some(2));
    }

    #[test]
    fn frame_waker_fires_once_per_batch() {
        let runtime = StdRuntime::new();
        let wakes = Arc::new(AtomicUsize::new(0));
        runtime.set_frame_waker({
            let wakes = Arc::clone(&wakes);
            move || {
                wakes.fetch_add(1, Ordering::SeqCst);
            }
        });
        runtime.render(counter, Props::default()).expect("render");

        state().set("count", 1);
        state().set("count", 2);
        assert_eq!(wakes.load(Ordering::SeqCst), 1);

        runtime.pump_until_idle().expect("pump");
        runtime.clear_frame_waker();
        state().set("count", 3);
        assert_eq!(wakes.load(Ordering::SeqCst), 1);
        assert!(runtime.take_frame_request());
    }

    #[test]
    fn pump_is_bounded_by_max_flush_rounds() {
        let runtime = StdRuntime::with_config(RuntimeConfig::default().max_flush_rounds(3));
        runtime.render(runaway, Props::default()).expect("render");
        assert_eq!(runtime.pump_until_idle().expect("pump"), 3);
        assert!(runtime.runtime().needs_flush());
    }

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        assert!(!init_tracing());
    }
}
