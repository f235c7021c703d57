use std::sync::Arc;

use crate::{
    ComponentFn, HostNodeId, HostTree, InstanceId, MemoryHost, Props, RecordingScheduler,
    RenderError, Runtime, RuntimeConfig,
};

pub(crate) struct TestRuntime {
    pub(crate) runtime: Runtime,
    pub(crate) scheduler: Arc<RecordingScheduler>,
    pub(crate) container: HostNodeId,
}

impl TestRuntime {
    pub(crate) fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub(crate) fn with_config(config: RuntimeConfig) -> Self {
        let mut host = MemoryHost::new();
        let container = host.create_element("root");
        let scheduler = Arc::new(RecordingScheduler::new());
        let runtime = Runtime::with_config(host, scheduler.clone(), config);
        Self {
            runtime,
            scheduler,
            container,
        }
    }

    pub(crate) fn mount(&self, component: ComponentFn) -> Result<InstanceId, RenderError> {
        self.runtime
            .render_root(self.container, component, Props::default())
    }

    pub(crate) fn mount_with(
        &self,
        component: ComponentFn,
        props: impl Into<Props>,
    ) -> Result<InstanceId, RenderError> {
        self.runtime.render_root(self.container, component, props)
    }

    /// Markup of everything under the container.
    pub(crate) fn html(&self) -> String {
        self.runtime
            .with_host(|host: &MemoryHost| {
                host.children(self.container)
                    .into_iter()
                    .map(|child| host.to_markup(child))
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    pub(crate) fn find(&self, tag: &str) -> Option<HostNodeId> {
        self.runtime
            .with_host(|host: &MemoryHost| host.find_by_tag(self.container, tag))
            .flatten()
    }

    pub(crate) fn find_all(&self, tag: &str) -> Vec<HostNodeId> {
        self.runtime
            .with_host(|host: &MemoryHost| host.find_all_by_tag(self.container, tag))
            .unwrap_or_default()
    }

    pub(crate) fn created(&self) -> usize {
        self.runtime
            .with_host(MemoryHost::created_count)
            .unwrap_or_default()
    }

    pub(crate) fn click(&self, tag: &str) {
        let node = self.find(tag).expect("clickable node");
        assert!(
            self.runtime.dispatch_event(node, "click"),
            "no click listener on <{tag}>"
        );
    }

    pub(crate) fn flush(&self) -> usize {
        self.runtime.flush().expect("flush")
    }
}
