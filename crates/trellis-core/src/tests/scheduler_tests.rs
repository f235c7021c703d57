use crate::test_support::TestRuntime;
use crate::*;
use std::cell::RefCell;

thread_local! {
    static STATES: RefCell<Vec<(&'static str, Observed)>> = RefCell::new(Vec::new());
}

fn keep(name: &'static str, state: &Observed) {
    STATES.with(|states| {
        let mut states = states.borrow_mut();
        if !states.iter().any(|(_, known)| known.ptr_eq(state)) {
            states.push((name, state.clone()));
        }
    });
}

fn state(name: &str) -> Observed {
    STATES.with(|states| {
        states
            .borrow()
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, state)| state.clone())
            .expect("state registered")
    })
}

fn counter(_: &Props) -> Result<RenderResult, RenderError> {
    let state = use_state(record! { "count" => 0 })?;
    keep("counter", &state);
    Ok(markup!("<p>{}</p>", state.get_int("count").unwrap_or(0)))
}

#[test]
fn many_writes_produce_one_frame_and_one_render() {
    let app = TestRuntime::new();
    let root = app.mount(counter).expect("mount");
    for n in 1..=5 {
        state("counter").set("count", n);
    }
    assert_eq!(app.scheduler.requests(), 1);
    assert_eq!(app.flush(), 1);
    assert_eq!(app.runtime.render_count(root), Some(2));
    assert_eq!(app.html(), "<p>5</p>");
    assert_eq!(app.flush(), 0);
}

fn inner(_: &Props) -> Result<RenderResult, RenderError> {
    let state = use_state(record! { "n" => 0 })?;
    keep("inner", &state);
    Ok(markup!("<span>{}</span>", state.get_int("n").unwrap_or(0)))
}

fn outer(_: &Props) -> Result<RenderResult, RenderError> {
    let state = use_state(record! { "n" => 0, "show" => true })?;
    keep("outer", &state);
    let child = (state.get("show").and_then(|show| show.as_bool()) == Some(true))
        .then(|| component(inner));
    Ok(markup!(
        "<div><b>{}</b>{}</div>",
        state.get_int("n").unwrap_or(0),
        child
    ))
}

#[test]
fn parent_and_child_dirty_render_child_once() {
    let app = TestRuntime::new();
    let root = app.mount(outer).expect("mount");
    let child = app.runtime.children_of(root)[0];

    state("inner").set("n", 1);
    state("outer").set("n", 1);
    assert_eq!(app.scheduler.requests(), 1);

    assert_eq!(app.flush(), 1);
    assert_eq!(app.runtime.render_count(root), Some(2));
    assert_eq!(app.runtime.render_count(child), Some(2));
    assert_eq!(app.html(), "<div><b>1</b><span>1</span></div>");
}

#[test]
fn dirty_instance_removed_by_its_parent_is_skipped() {
    let app = TestRuntime::new();
    let root = app.mount(outer).expect("mount");
    let child = app.runtime.children_of(root)[0];

    state("inner").set("n", 9);
    state("outer").set("show", false);
    assert_eq!(app.flush(), 1);
    assert_eq!(app.runtime.lifecycle(child), None);
    assert_eq!(app.html(), "<div><b>0</b></div>");
    assert_eq!(app.runtime.instance_count(), 1);
}

fn echoing(_: &Props) -> Result<RenderResult, RenderError> {
    let state = use_state(record! { "n" => 0, "echo" => 0 })?;
    keep("echoing", &state);
    let writer = state.clone();
    use_updated(&state, move |_| {
        let n = writer.get_int("n").unwrap_or(0);
        writer.set("echo", n);
    })?;
    Ok(markup!(
        "<p>{}/{}</p>",
        state.get_int("n").unwrap_or(0),
        state.get_int("echo").unwrap_or(0)
    ))
}

#[test]
fn writes_during_flush_land_in_next_frame() {
    let app = TestRuntime::new();
    let root = app.mount(echoing).expect("mount");

    state("echoing").set("n", 2);
    assert_eq!(app.scheduler.requests(), 1);
    assert_eq!(app.flush(), 1);
    assert_eq!(app.html(), "<p>2/0</p>");
    assert!(app.runtime.needs_flush());
    assert_eq!(app.scheduler.requests(), 2);

    assert_eq!(app.flush(), 1);
    assert_eq!(app.html(), "<p>2/2</p>");
    assert_eq!(app.runtime.render_count(root), Some(3));
    assert!(!app.runtime.needs_flush());
}

#[test]
fn flush_without_marks_is_a_no_op() {
    let app = TestRuntime::new();
    app.mount(counter).expect("mount");
    assert!(!app.runtime.needs_flush());
    assert_eq!(app.flush(), 0);
    assert_eq!(app.scheduler.requests(), 0);
}
