use htmltoolbox::{Anchor, HtmlToolbox, MatchKind, NodeId, Query, ToolboxConfig, ToolboxError};

const DIGITS: &str = "<div>1 and 2 and 3 and 4</div>";

fn digits() -> Query {
    Query::pattern(r"\d").expect("valid pattern")
}

fn find_element(tb: &HtmlToolbox, name: &str) -> NodeId {
    tb.steps()
        .map(|step| step.node)
        .find(|id| tb.node(*id).and_then(|node| node.name()) == Some(name))
        .unwrap_or_else(|| panic!("no <{name}> in document"))
}

#[test]
fn flush_is_idempotent() {
    let mut tb = HtmlToolbox::new("<p>a <b>b</b></p><ul><li>c</li></ul>");
    assert_eq!(tb.search("b"), Ok(1));
    assert!(tb.next_match().expect("cursor").is_some());
    tb.wrap("<i><!/></i>").expect("queued");
    tb.apply().expect("first flush");
    let text = tb.text().expect("text").to_string();
    let html = tb.html(None).expect("html");
    tb.apply().expect("second flush");
    assert_eq!(tb.text(), Ok(text.as_str()));
    assert_eq!(tb.html(None), Ok(html));
}

#[test]
fn rendered_offsets_point_into_text() {
    let mut tb = HtmlToolbox::new(
        "<h1>Title</h1><p>Some <em>emphasis</em> and a<br>break.</p><q>quoted</q> tail",
    );
    let text = tb.text().expect("text").to_string();
    let mut last = 0;
    for (_, node) in tb.rendered() {
        assert!(node.str_index() >= last, "offsets must not go backwards");
        last = node.str_index();
        let Some(value) = node.value().filter(|v| node.is_text() && !v.trim().is_empty()) else {
            continue;
        };
        let at = node.str_index() - 1;
        assert!(
            text[at..].starts_with(value),
            "{value:?} not found at {at} in {text:?}"
        );
    }
    assert_eq!(text, "Title\nSome emphasis and a\nbreak.\n\"quoted\" tail");
}

#[test]
fn removing_digits_leaves_the_words() {
    let mut tb = HtmlToolbox::new(DIGITS);
    assert_eq!(tb.remove_all(digits()), Ok(4));
    assert_eq!(tb.text(), Ok("and and and"));
    assert_eq!(tb.html(None), Ok("<div> and  and  and </div>".to_string()));
}

#[test]
fn wrapping_digits_gives_one_envelope_each() {
    let mut tb = HtmlToolbox::new(DIGITS);
    assert_eq!(tb.wrap_all(digits(), "<span>Number <!/></span>"), Ok(4));
    assert_eq!(
        tb.html(None),
        Ok("<div><span>Number 1</span> and <span>Number 2</span> and \
            <span>Number 3</span> and <span>Number 4</span></div>"
            .to_string())
    );
    assert_eq!(tb.text(), Ok("Number 1 and Number 2 and Number 3 and Number 4"));
}

#[test]
fn queued_removals_in_one_text_run() {
    let mut tb = HtmlToolbox::new("abcdef");
    assert_eq!(tb.remove_all(Query::pattern("bc|de").expect("valid pattern")), Ok(2));
    assert_eq!(tb.text(), Ok("af"));
    assert_eq!(tb.html(None), Ok("af".to_string()));
}

#[test]
fn input_value_follows_set_attribute() {
    let mut tb = HtmlToolbox::new("<p>x <input value=old> y</p>");
    assert_eq!(tb.text(), Ok("x old y"));
    let input = find_element(&tb, "input");
    tb.set_attribute(input, "value", "ab cd").expect("queued");
    assert_eq!(tb.text(), Ok("x ab cd y"));
    assert_eq!(
        tb.html(None),
        Ok("<p>x <input value=\"ab cd\"> y</p>".to_string())
    );
}

#[test]
fn hidden_inputs_do_not_render() {
    let mut tb = HtmlToolbox::new("a<input type=hidden value=secret>b");
    assert_eq!(tb.text(), Ok("a b"));
    let mut tb = HtmlToolbox::with_config(
        "a<input value=shown>b",
        ToolboxConfig::default().with_process_input_values(false),
    );
    assert_eq!(tb.text(), Ok("a b"));
}

#[test]
fn capture_groups_are_exposed() {
    let mut tb = HtmlToolbox::new("<p>key=value</p>");
    let query = Query::pattern(r"(\w+)=(\w+)").expect("valid pattern");
    assert_eq!(tb.search(query), Ok(1));
    let m = tb.next_match().expect("cursor").expect("match");
    assert_eq!(m.group(1), Some("key"));
    assert_eq!(m.group(2), Some("value"));
    assert_eq!(m.start_node, m.end_node);
    assert_eq!((m.start_offset, m.end_offset), (0, 9));
}

#[test]
fn literal_queries_match_across_elements() {
    let mut tb = HtmlToolbox::new("<p>a <b>b.c</b> d</p>");
    assert_eq!(tb.search(Query::Literal("b.c d".into())), Ok(1));
    let m = tb.next_match().expect("cursor").expect("match");
    assert_ne!(m.start_node, m.end_node);
    tb.replace("X", Anchor::Begin).expect("queued");
    assert_eq!(tb.next_match(), Ok(None));
    assert_eq!(tb.text(), Ok("a X"));
}

#[test]
fn element_matches_can_be_renamed_and_extended() {
    let mut tb = HtmlToolbox::new("<div><i>a</i></div>");
    assert_eq!(tb.search(Query::Elements), Ok(2));
    let div = tb.next_match().expect("cursor").expect("div");
    assert_eq!(div.kind, MatchKind::Element);
    let i = tb.next_match().expect("cursor").expect("i");
    tb.set_tag(i.start_node, "b").expect("queued");
    tb.insert("!", Anchor::Begin).expect("queued");
    assert_eq!(tb.next_match(), Ok(None));
    assert_eq!(tb.html(None), Ok("<div><b>a</b>!</div>".to_string()));
}

#[test]
fn edits_without_a_match_are_usage_errors() {
    let mut tb = HtmlToolbox::new("abc");
    assert_eq!(
        tb.insert("x", Anchor::End),
        Err(ToolboxError::NoActiveMatch { op: "insert" })
    );
    assert_eq!(tb.failure(), None);
    assert_eq!(tb.text(), Ok("abc"));
}

#[test]
fn closing_quote_matches_attach_to_the_quoted_text() {
    let mut tb = HtmlToolbox::new("say <q>hi</q>");
    assert_eq!(tb.search("\""), Ok(2));
    while let Some(m) = tb.next_match().expect("cursor") {
        assert!(tb.node(m.start_node).is_some_and(|node| node.is_text()));
        assert!(tb.node(m.end_node).is_some_and(|node| node.is_text()));
        tb.insert("<b>X</b>", Anchor::Begin).expect("queued");
    }
    assert_eq!(
        tb.html(None),
        Ok("say <q><b>X</b>hi<b>X</b></q>".to_string())
    );
}

#[test]
fn empty_raw_elements_are_matched_once() {
    let mut tb = HtmlToolbox::new("<div><script></script><style></style></div>");
    assert_eq!(tb.search(Query::Elements), Ok(3));
    while let Some(m) = tb.next_match().expect("cursor") {
        if tb.node(m.start_node).and_then(|node| node.name()) != Some("div") {
            tb.insert("!", Anchor::Begin).expect("queued");
        }
    }
    assert_eq!(
        tb.html(None),
        Ok("<div><script></script>!<style></style>!</div>".to_string())
    );
}

#[test]
fn emptied_input_serializes_an_empty_value() {
    let mut tb = HtmlToolbox::with_config(
        "x <input value='ab cd'> y",
        ToolboxConfig::default().with_delete_empty(false),
    );
    assert_eq!(tb.remove_all("x ab cd y"), Ok(1));
    assert_eq!(tb.text(), Ok(""));
    assert_eq!(tb.html(None), Ok("<input value=''>".to_string()));
}
