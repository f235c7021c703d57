use std::sync::Arc;

use trellis_core::{
    ComponentFn, HostEvent, HostNodeId, HostTree, InstanceId, MemoryHost, Props,
    RecordingScheduler, RenderError, Runtime, RuntimeConfig, Store,
};

/// Headless harness for exercising components in tests.
///
/// `TestApp` owns a runtime over an in-memory host tree and a scheduler that
/// only counts frame requests; the test decides when frames happen by
/// calling [`TestApp::flush`] or [`TestApp::pump_until_idle`].
pub struct TestApp {
    runtime: Runtime,
    scheduler: Arc<RecordingScheduler>,
    container: HostNodeId,
    roots: Vec<InstanceId>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let mut host = MemoryHost::new();
        let container = host.create_element("root");
        let scheduler = Arc::new(RecordingScheduler::new());
        let runtime = Runtime::with_config(host, scheduler.clone(), config);
        Self {
            runtime,
            scheduler,
            container,
            roots: Vec::new(),
        }
    }

    /// Renders `component` as a new root under the harness container.
    pub fn mount(&mut self, component: ComponentFn) -> Result<InstanceId, RenderError> {
        self.mount_with(component, Props::default())
    }

    pub fn mount_with(
        &mut self,
        component: ComponentFn,
        props: impl Into<Props>,
    ) -> Result<InstanceId, RenderError> {
        let root = self.runtime.render_root(self.container, component, props)?;
        self.roots.push(root);
        Ok(root)
    }

    /// Unmounts every root mounted through this harness.
    pub fn unmount_all(&mut self) -> Result<(), RenderError> {
        for root in std::mem::take(&mut self.roots) {
            self.runtime.unmount_root(root)?;
        }
        Ok(())
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn container(&self) -> HostNodeId {
        self.container
    }

    pub fn roots(&self) -> &[InstanceId] {
        &self.roots
    }

    pub fn create_store(&self, initial: impl Into<trellis_core::Data>) -> Result<Store, RenderError> {
        self.runtime.create_store(initial)
    }

    /// Frames requested by the runtime since the harness was created.
    pub fn frame_requests(&self) -> usize {
        self.scheduler.requests()
    }

    /// Runs one frame.
    pub fn flush(&self) -> Result<usize, RenderError> {
        self.runtime.flush()
    }

    /// Runs frames until nothing is dirty, bounded by
    /// [`RuntimeConfig::max_flush_rounds`].
    pub fn pump_until_idle(&self) -> Result<usize, RenderError> {
        let mut rendered = 0;
        for _ in 0..self.runtime.config().max_flush_rounds {
            if !self.runtime.needs_flush() {
                break;
            }
            rendered += self.runtime.flush()?;
        }
        Ok(rendered)
    }

    /// Dispatches `event` to `node`. Returns whether a listener ran.
    pub fn dispatch(&self, node: HostNodeId, event: &str) -> bool {
        self.runtime.dispatch_event(node, event)
    }

    pub fn dispatch_with_detail(&self, node: HostNodeId, event: &str, detail: &str) -> bool {
        self.runtime
            .dispatch(&HostEvent::new(event, node).with_detail(detail))
    }

    /// Clicks the first element with `tag`. Returns whether a listener ran.
    pub fn click(&self, tag: &str) -> bool {
        self.find(tag)
            .is_some_and(|node| self.dispatch(node, "click"))
    }

    /// Clicks the `index`-th element with `tag` in document order.
    pub fn click_nth(&self, tag: &str, index: usize) -> bool {
        self.find_all(tag)
            .get(index)
            .is_some_and(|node| self.dispatch(*node, "click"))
    }

    pub fn find(&self, tag: &str) -> Option<HostNodeId> {
        self.with_host(|host| host.find_by_tag(self.container, tag))
            .flatten()
    }

    pub fn find_all(&self, tag: &str) -> Vec<HostNodeId> {
        self.with_host(|host| host.find_all_by_tag(self.container, tag))
            .unwrap_or_default()
    }

    pub fn text(&self, node: HostNodeId) -> String {
        self.with_host(|host| host.text_content(node))
            .unwrap_or_default()
    }

    pub fn attribute(&self, node: HostNodeId, name: &str) -> Option<String> {
        self.with_host(|host| host.attribute(node, name).map(str::to_owned))
            .flatten()
    }

    /// Markup of everything under the container.
    pub fn html(&self) -> String {
        self.with_host(|host| {
            host.children(self.container)
                .into_iter()
                .map(|child| host.to_markup(child))
                .collect::<String>()
        })
        .unwrap_or_default()
    }

    /// Indented dump of the host tree, one node per line.
    pub fn dump(&self) -> String {
        self.with_host(|host| host.dump_tree(Some(self.container)))
            .unwrap_or_default()
    }

    /// Host nodes created since the harness was built, including the
    /// container.
    pub fn created_count(&self) -> usize {
        self.with_host(MemoryHost::created_count).unwrap_or_default()
    }

    /// Host nodes currently alive, including the container.
    pub fn live_count(&self) -> usize {
        self.with_host(MemoryHost::len).unwrap_or_default()
    }

    pub fn with_host<R>(&self, f: impl FnOnce(&MemoryHost) -> R) -> Option<R> {
        self.runtime.with_host(f)
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// [`TestApp`].
pub fn run_test_app<R>(f: impl FnOnce(&mut TestApp) -> R) -> R {
    let mut app = TestApp::new();
    f(&mut app)
}
