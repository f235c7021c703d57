use super::*;
use crate::test_support::TestRuntime;
use crate::{
    component, create_component, markup, record, use_state, use_updated, ComponentOptions,
    RenderResult, Value,
};
use std::cell::RefCell;

thread_local! {
    static STATE: RefCell<Option<Observed>> = RefCell::new(None);
    static RUNTIME: RefCell<Option<Runtime>> = RefCell::new(None);
    static FLUSH_FROM_HOOK: RefCell<Option<Result<usize, RenderError>>> = RefCell::new(None);
    static PARENT: RefCell<Option<Observed>> = RefCell::new(None);
}

fn parent_state() -> Observed {
    PARENT.with(|slot| slot.borrow().clone()).expect("parent state captured")
}

fn flag(source: Option<Data>) -> bool {
    source.and_then(|value| value.as_bool()) == Some(true)
}

fn state() -> Observed {
    STATE.with(|slot| slot.borrow().clone()).expect("state captured")
}

fn clicker(_: &Props) -> Result<RenderResult, RenderError> {
    let state = use_state(record! { "clicks" => 0 })?;
    STATE.with(|slot| *slot.borrow_mut() = Some(state.clone()));
    let clicks = state.get_int("clicks").unwrap_or(0);
    let on_click = {
        let state = state.clone();
        Value::handler(move |_| {
            state.update("clicks", |n| Data::from(n.as_int().unwrap_or(0) + 1));
        })
    };
    Ok(markup!("<button onclick={}>{}</button>", on_click, clicks))
}

#[test]
fn render_root_appends_to_container() {
    let app = TestRuntime::new();
    let root = app.mount(clicker).expect("mount");
    assert_eq!(app.runtime.lifecycle(root), Some(LifecycleState::Mounted));
    assert_eq!(app.html(), "<button>0</button>");
    assert_eq!(app.runtime.instance_count(), 1);
    assert_eq!(app.runtime.registry_len(), 1);
    assert_eq!(app.runtime.template_count(), 1);
    assert_eq!(app.runtime.host_node(root), app.find("button"));
}

#[test]
fn event_dispatch_schedules_one_frame() {
    let app = TestRuntime::new();
    app.mount(clicker).expect("mount");

    app.click("button");
    app.click("button");
    assert_eq!(app.scheduler.requests(), 1);
    assert!(app.runtime.needs_flush());

    assert_eq!(app.flush(), 1);
    assert_eq!(app.html(), "<button>2</button>");
    assert!(!app.runtime.needs_flush());

    app.click("button");
    assert_eq!(app.scheduler.requests(), 2);
}

#[test]
fn dispatch_without_listener_reports_false() {
    let app = TestRuntime::new();
    app.mount(clicker).expect("mount");
    let button = app.find("button").expect("button");
    assert!(!app.runtime.dispatch_event(button, "keydown"));
    assert!(!app.runtime.dispatch_event(app.container, "click"));
}

#[test]
fn flush_from_an_update_hook_does_not_nest() {
    fn reentrant(_: &Props) -> Result<RenderResult, RenderError> {
        let state = use_state(record! { "n" => 0 })?;
        STATE.with(|slot| *slot.borrow_mut() = Some(state.clone()));
        use_updated(&state, |_| {
            let runtime = RUNTIME.with(|slot| slot.borrow().clone()).expect("runtime");
            let nested = runtime.flush();
            FLUSH_FROM_HOOK.with(|slot| *slot.borrow_mut() = Some(nested));
        })?;
        Ok(markup!("<p>{}</p>", state.get_int("n").unwrap_or(0)))
    }

    let app = TestRuntime::new();
    app.mount(reentrant).expect("mount");
    RUNTIME.with(|slot| *slot.borrow_mut() = Some(app.runtime.clone()));

    state().set("n", 1);
    assert_eq!(app.flush(), 1);
    assert_eq!(FLUSH_FROM_HOOK.with(|slot| slot.borrow().clone()), Some(Ok(0)));
    assert_eq!(app.html(), "<p>1</p>");
    RUNTIME.with(|slot| slot.borrow_mut().take());
}

#[test]
fn marks_on_removed_instances_are_ignored() {
    let app = TestRuntime::new();
    let root = app.mount(clicker).expect("mount");
    let state = state();
    app.runtime.unmount_root(root).expect("unmount");

    assert!(state.set("clicks", 5));
    assert!(!app.runtime.needs_flush());
    assert_eq!(app.scheduler.requests(), 0);
    app.runtime.mark_dirty(root);
    assert!(!app.runtime.needs_flush());
}

#[test]
fn unmounting_unknown_root_fails() {
    let app = TestRuntime::new();
    assert_eq!(
        app.runtime.unmount_root(42).unwrap_err(),
        RenderError::UnknownInstance { id: 42 }
    );
}

#[test]
fn create_store_requires_record() {
    let app = TestRuntime::new();
    assert_eq!(
        app.runtime.create_store("text").unwrap_err(),
        RenderError::InvalidStateShape { found: "string" }
    );
    let store = app
        .runtime
        .create_store(record! { "count" => 1 })
        .expect("store");
    assert_eq!(store.get("count"), Some(Data::Int(1)));
}

#[test]
fn render_pass_cannot_nest() {
    let app = TestRuntime::new();
    app.mount(clicker).expect("mount");
    let _pass = app.runtime.begin_pass().expect("first pass");
    assert_eq!(
        app.runtime
            .render_root(app.container, clicker, Props::default()),
        Err(RenderError::Reentrant)
    );
    assert_eq!(app.runtime.flush(), Ok(0));
}

#[test]
fn handle_upgrades_while_runtime_lives() {
    let app = TestRuntime::new();
    let handle = app.runtime.handle();
    assert!(handle.upgrade().is_some());
    let TestRuntime { runtime, .. } = app;
    drop(runtime);
    assert!(handle.upgrade().is_none());
    handle.mark_dirty(1);
}

#[test]
fn debug_name_is_configurable() {
    let app = TestRuntime::with_config(RuntimeConfig::default().debug_name("panel"));
    assert_eq!(app.runtime.config().debug_name, "panel");
    assert_eq!(app.runtime.config().max_flush_rounds, 64);
    assert!(format!("{:?}", app.runtime).contains("panel"));
}

fn picky_child(props: &Props) -> Result<RenderResult, RenderError> {
    if flag(props.get("bad").cloned()) {
        return Err(RenderError::ContextNotProvided);
    }
    Ok(markup!("<i>ok</i>"))
}

fn picky_parent(_: &Props) -> Result<RenderResult, RenderError> {
    let state = use_state(record! { "bad" => false, "n" => 0 })?;
    PARENT.with(|slot| *slot.borrow_mut() = Some(state.clone()));
    let child = create_component(
        picky_child,
        ComponentOptions::new().props(record! { "bad" => flag(state.get("bad")) }),
    );
    Ok(markup!(
        "<div>{}{}</div>",
        state.get_int("n").unwrap_or(0),
        child
    ))
}

#[test]
fn failed_child_render_leaves_parent_retryable() {
    let app = TestRuntime::new();
    let root = app.mount(picky_parent).expect("mount");
    let leaf = app.find("i").expect("leaf");
    assert_eq!(app.html(), "<div>0<i>ok</i></div>");

    parent_state().set("bad", true);
    assert_eq!(app.runtime.flush(), Err(RenderError::ContextNotProvided));
    assert_eq!(app.runtime.lifecycle(root), Some(LifecycleState::Mounted));
    assert_eq!(app.html(), "<div>0<i>ok</i></div>");

    parent_state().set("bad", false);
    parent_state().set("n", 5);
    assert!(app.runtime.needs_flush());
    assert_eq!(app.flush(), 1);
    assert_eq!(app.html(), "<div>5<i>ok</i></div>");
    assert_eq!(app.find("i"), Some(leaf));
    assert_eq!(app.runtime.lifecycle(root), Some(LifecycleState::Mounted));
    assert_eq!(app.runtime.instance_count(), 2);

    parent_state().set("n", 6);
    assert_eq!(app.flush(), 1);
    assert_eq!(app.html(), "<div>6<i>ok</i></div>");
}

fn fragile(_: &Props) -> Result<RenderResult, RenderError> {
    let state = use_state(record! { "bad" => false })?;
    PARENT.with(|slot| *slot.borrow_mut() = Some(state.clone()));
    if flag(state.get("bad")) {
        return Err(RenderError::ContextNotProvided);
    }
    Ok(markup!("<b>x</b>"))
}

#[test]
fn failing_root_keeps_the_rest_of_its_batch_queued() {
    let app = TestRuntime::new();
    let fragile_root = app.mount(fragile).expect("fragile root");
    app.mount(clicker).expect("clicker root");
    assert_eq!(app.html(), "<b>x</b><button>0</button>");

    parent_state().set("bad", true);
    state().set("clicks", 7);
    assert_eq!(app.scheduler.requests(), 1);
    assert_eq!(app.runtime.flush(), Err(RenderError::ContextNotProvided));
    assert!(app.runtime.needs_flush());
    assert_eq!(app.scheduler.requests(), 2);

    assert_eq!(app.flush(), 1);
    assert_eq!(app.html(), "<b>x</b><button>7</button>");

    parent_state().set("bad", false);
    assert_eq!(app.flush(), 1);
    assert_eq!(
        app.runtime.lifecycle(fragile_root),
        Some(LifecycleState::Mounted)
    );
}

fn broken(_: &Props) -> Result<RenderResult, RenderError> {
    Err(RenderError::ContextNotProvided)
}

fn optional_parent(_: &Props) -> Result<RenderResult, RenderError> {
    let state = use_state(record! { "show" => false })?;
    PARENT.with(|slot| *slot.borrow_mut() = Some(state.clone()));
    let child = flag(state.get("show")).then(|| component(broken));
    Ok(markup!("<section>{}</section>", child))
}

#[test]
fn failed_first_mount_leaves_no_instance_behind() {
    let app = TestRuntime::new();
    let root = app.mount(optional_parent).expect("mount");

    parent_state().set("show", true);
    assert_eq!(app.runtime.flush(), Err(RenderError::ContextNotProvided));
    assert_eq!(app.runtime.instance_count(), 1);
    assert_eq!(app.runtime.registry_len(), 1);
    assert_eq!(app.runtime.lifecycle(root), Some(LifecycleState::Mounted));

    parent_state().set("show", false);
    assert_eq!(app.flush(), 1);
    assert_eq!(app.html(), "<section></section>");

    assert_eq!(
        app.runtime.render_root(app.container, broken, Props::default()),
        Err(RenderError::ContextNotProvided)
    );
    assert_eq!(app.runtime.instance_count(), 1);
}
