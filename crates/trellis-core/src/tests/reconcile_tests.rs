use crate::test_support::TestRuntime;
use crate::*;
use std::cell::RefCell;

thread_local! {
    static STATES: RefCell<Vec<Observed>> = RefCell::new(Vec::new());
    static LOG: RefCell<Vec<String>> = RefCell::new(Vec::new());
    static REF_NODE: RefCell<Option<HostNodeId>> = RefCell::new(None);
}

fn keep(state: &Observed) {
    STATES.with(|states| {
        let mut states = states.borrow_mut();
        if !states.iter().any(|known| known.ptr_eq(state)) {
            states.push(state.clone());
        }
    });
}

fn state(index: usize) -> Observed {
    STATES.with(|states| states.borrow()[index].clone())
}

fn log(entry: impl Into<String>) {
    LOG.with(|log| log.borrow_mut().push(entry.into()));
}

fn take_log() -> Vec<String> {
    LOG.with(|log| log.take())
}

fn text_field(state: &Observed, field: &str) -> String {
    state
        .get(field)
        .and_then(|value| value.as_str().map(str::to_owned))
        .unwrap_or_default()
}

fn letters(_: &Props) -> Result<RenderResult, RenderError> {
    let state = use_state(record! { "order" => "abc" })?;
    keep(&state);
    let items: Vec<RenderResult> = text_field(&state, "order")
        .chars()
        .map(|letter| markup!("<li>{}</li>", letter.to_string()).keyed(letter.to_string()))
        .collect();
    Ok(markup!("<ul>{}</ul>", items))
}

#[test]
fn keyed_list_reorders_without_recreating_nodes() {
    let app = TestRuntime::new();
    app.mount(letters).expect("mount");
    let before = app.find_all("li");
    let created = app.created();
    assert_eq!(app.html(), "<ul><li>a</li><li>b</li><li>c</li></ul>");

    state(0).set("order", "cab");
    app.flush();
    assert_eq!(app.html(), "<ul><li>c</li><li>a</li><li>b</li></ul>");
    assert_eq!(app.find_all("li"), vec![before[2], before[0], before[1]]);
    assert_eq!(app.created(), created);
}

fn attribute_keyed_letters(_: &Props) -> Result<RenderResult, RenderError> {
    let state = use_state(record! { "order" => "abc" })?;
    keep(&state);
    let items: Vec<RenderResult> = text_field(&state, "order")
        .chars()
        .map(|letter| {
            let letter = letter.to_string();
            markup!("<li key={}>{}</li>", letter.clone(), letter)
        })
        .collect();
    Ok(markup!("<ul>{}</ul>", items))
}

#[test]
fn key_attribute_list_reorders_without_recreating_nodes() {
    let app = TestRuntime::new();
    app.mount(attribute_keyed_letters).expect("mount");
    let before = app.find_all("li");
    let created = app.created();
    assert_eq!(app.html(), "<ul><li>a</li><li>b</li><li>c</li></ul>");

    state(0).set("order", "bca");
    app.flush();
    assert_eq!(app.html(), "<ul><li>b</li><li>c</li><li>a</li></ul>");
    assert_eq!(app.find_all("li"), vec![before[1], before[2], before[0]]);
    assert_eq!(app.created(), created);

    state(0).set("order", "bb");
    assert_eq!(
        app.runtime.flush().unwrap_err(),
        RenderError::DuplicateKey { key: Key::from("b") }
    );
}

fn counter_item(props: &Props) -> Result<RenderResult, RenderError> {
    let state = use_state(record! { "clicks" => 0 })?;
    keep(&state);
    let label = props
        .get("label")
        .and_then(Data::to_text)
        .unwrap_or_default();
    let clicks = state.get_int("clicks").unwrap_or(0);
    let on_click = {
        let state = state.clone();
        Value::handler(move |_| {
            state.update("clicks", |n| Data::from(n.as_int().unwrap_or(0) + 1));
        })
    };
    Ok(markup!(
        "<li><button onclick={}>{}:{}</button></li>",
        on_click,
        label,
        clicks
    ))
}

fn counter_list(_: &Props) -> Result<RenderResult, RenderError> {
    let state = use_state(record! { "ids" => "0123456789" })?;
    keep(&state);
    let items: Vec<ComponentRef> = text_field(&state, "ids")
        .chars()
        .map(|id| {
            create_component(
                counter_item,
                ComponentOptions::new()
                    .key(id.to_string())
                    .props(record! { "label" => id.to_string() }),
            )
        })
        .collect();
    Ok(markup!("<ul>{}</ul>", items))
}

#[test]
fn removing_keyed_entries_keeps_surviving_nodes_and_state() {
    let app = TestRuntime::new();
    app.mount(counter_list).expect("mount");
    assert_eq!(app.find_all("li").len(), 10);
    assert_eq!(app.runtime.instance_count(), 11);

    let buttons = app.find_all("button");
    assert!(app.runtime.dispatch_event(buttons[7], "click"));
    app.flush();
    let created = app.created();

    // The list state was captured first, then one state per item.
    state(0).set("ids", "01346789");
    app.flush();

    let after = app.find_all("button");
    assert_eq!(after.len(), 8);
    assert_eq!(after[5], buttons[7]);
    assert_eq!(
        app.runtime
            .with_host(|host: &MemoryHost| host.text_content(after[5])),
        Some("7:1".to_string())
    );
    for (index, original) in [0, 1, 3, 4, 6, 7, 8, 9].into_iter().enumerate() {
        assert_eq!(after[index], buttons[original]);
    }
    assert_eq!(app.created(), created);
    assert_eq!(app.runtime.instance_count(), 9);
    assert_eq!(app.runtime.registry_len(), 9);
}

fn maybe_unkeyed(_: &Props) -> Result<RenderResult, RenderError> {
    let state = use_state(record! { "broken" => false })?;
    keep(&state);
    let items = if state.get("broken").and_then(|flag| flag.as_bool()) == Some(true) {
        vec![markup!("<li>x</li>"), markup!("<li>y</li>")]
    } else {
        vec![markup!("<li>x</li>")]
    };
    Ok(markup!("<ul>{}</ul>", items))
}

#[test]
fn missing_key_fails_before_any_host_mutation() {
    let app = TestRuntime::new();
    app.mount(maybe_unkeyed).expect("single unkeyed entry is fine");
    let html = app.html();
    let created = app.created();

    state(0).set("broken", true);
    assert_eq!(
        app.runtime.flush().unwrap_err(),
        RenderError::MissingKey { index: 0, len: 2 }
    );
    assert_eq!(app.html(), html);
    assert_eq!(app.created(), created);
}

fn styled(_: &Props) -> Result<RenderResult, RenderError> {
    let state = use_state(record! { "mode" => "plain", "text" => "hi" })?;
    keep(&state);
    let text = text_field(&state, "text");
    Ok(match text_field(&state, "mode").as_str() {
        "plain" => markup!("<main><p>{}</p><span>tail</span></main>", text),
        "loud" => markup!("<main><p class=\"loud\">{}</p><span>tail</span></main>", text),
        _ => markup!("<main><div>{}</div><span>tail</span></main>", text),
    })
}

#[test]
fn attributes_and_text_patch_in_place() {
    let app = TestRuntime::new();
    app.mount(styled).expect("mount");
    let paragraph = app.find("p").expect("p");

    state(0).set("mode", "loud");
    state(0).set("text", "hey");
    app.flush();
    assert_eq!(app.find("p"), Some(paragraph));
    assert_eq!(
        app.html(),
        "<main><p class=\"loud\">hey</p><span>tail</span></main>"
    );

    state(0).set("mode", "plain");
    app.flush();
    assert_eq!(app.find("p"), Some(paragraph));
    assert_eq!(app.html(), "<main><p>hey</p><span>tail</span></main>");
}

#[test]
fn tag_change_replaces_node_at_same_position() {
    let app = TestRuntime::new();
    app.mount(styled).expect("mount");
    let span = app.find("span").expect("span");

    state(0).set("mode", "block");
    app.flush();
    assert_eq!(app.find("p"), None);
    assert_eq!(app.find("span"), Some(span));
    assert_eq!(app.html(), "<main><div>hi</div><span>tail</span></main>");
}

fn stateful_leaf(_: &Props) -> Result<RenderResult, RenderError> {
    let state = use_state(record! { "n" => 0 })?;
    keep(&state);
    use_mount(|| {
        log("mount leaf");
        None
    })?;
    Ok(markup!("<em>{}</em>", state.get_int("n").unwrap_or(0)))
}

fn wrapping(_: &Props) -> Result<RenderResult, RenderError> {
    let state = use_state(record! { "section" => false })?;
    keep(&state);
    let leaf = component(stateful_leaf);
    Ok(
        if state.get("section").and_then(|flag| flag.as_bool()) == Some(true) {
            markup!("<section>{}</section>", leaf)
        } else {
            markup!("<div>{}</div>", leaf)
        },
    )
}

#[test]
fn component_moves_when_its_parent_element_is_replaced() {
    let app = TestRuntime::new();
    let root = app.mount(wrapping).expect("mount");
    let leaf = app.runtime.children_of(root)[0];
    let em = app.find("em").expect("em");
    state(1).set("n", 4);
    app.flush();
    assert_eq!(take_log(), vec!["mount leaf"]);

    state(0).set("section", true);
    app.flush();
    assert_eq!(app.html(), "<section><em>4</em></section>");
    assert_eq!(app.runtime.children_of(root), vec![leaf]);
    assert_eq!(app.find("em"), Some(em));
    assert!(take_log().is_empty());
}

fn announced_a(_: &Props) -> Result<RenderResult, RenderError> {
    use_mount(|| {
        log("mount a");
        Some(Box::new(|| log("unmount a")) as Cleanup)
    })?;
    Ok(markup!("<b>a</b>"))
}

fn announced_b(_: &Props) -> Result<RenderResult, RenderError> {
    use_mount(|| {
        log("mount b");
        None
    })?;
    use_unmount(|| log("unmount b"))?;
    Ok(markup!("<i>b</i>"))
}

fn switcher(_: &Props) -> Result<RenderResult, RenderError> {
    let state = use_state(record! { "second" => false })?;
    keep(&state);
    let child = if state.get("second").and_then(|flag| flag.as_bool()) == Some(true) {
        component(announced_b)
    } else {
        component(announced_a)
    };
    Ok(markup!("<div>{}</div>", child))
}

#[test]
fn stale_instances_unmount_before_new_mount_hooks() {
    let app = TestRuntime::new();
    app.mount(switcher).expect("mount");
    assert_eq!(take_log(), vec!["mount a"]);
    assert_eq!(app.runtime.instance_count(), 2);

    state(0).set("second", true);
    app.flush();
    assert_eq!(take_log(), vec!["unmount a", "mount b"]);
    assert_eq!(app.html(), "<div><i>b</i></div>");
    assert_eq!(app.runtime.instance_count(), 2);
    assert_eq!(app.runtime.registry_len(), 2);
}

fn with_ref(_: &Props) -> Result<RenderResult, RenderError> {
    let setter = RefSetter::new(|node| REF_NODE.with(|slot| *slot.borrow_mut() = Some(node)));
    Ok(markup!("<form><input ref={} /></form>", setter))
}

#[test]
fn ref_setter_receives_host_node() {
    let app = TestRuntime::new();
    app.mount(with_ref).expect("mount");
    let node = REF_NODE.with(|slot| *slot.borrow()).expect("ref set");
    assert_eq!(app.find("input"), Some(node));
}

fn swapping_root(_: &Props) -> Result<RenderResult, RenderError> {
    let state = use_state(record! { "open" => false })?;
    keep(&state);
    Ok(
        if state.get("open").and_then(|flag| flag.as_bool()) == Some(true) {
            markup!("<ol><li>open</li></ol>")
        } else {
            markup!("<p>closed</p>")
        },
    )
}

fn framing(_: &Props) -> Result<RenderResult, RenderError> {
    Ok(markup!(
        "<article><h1>title</h1>{}<footer>end</footer></article>",
        component(swapping_root)
    ))
}

#[test]
fn child_root_replacement_keeps_sibling_order() {
    let app = TestRuntime::new();
    let root = app.mount(framing).expect("mount");
    state(0).set("open", true);
    assert_eq!(app.flush(), 1);
    assert_eq!(
        app.html(),
        "<article><h1>title</h1><ol><li>open</li></ol><footer>end</footer></article>"
    );
    assert_eq!(app.runtime.render_count(root), Some(1));
}
