#![no_main]

use htmltoolbox::HtmlToolbox;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let mut tb = HtmlToolbox::new(input);
    let text = tb.text().map(str::to_string).expect("untouched document flattens");
    let mut last = 0;
    for (id, node) in tb.rendered() {
        assert!(node.str_index() >= last, "{id} goes backwards");
        assert!(node.str_index() <= text.len() + 1, "{id} points past the text");
        last = node.str_index();
    }
    let html = tb.html(None).expect("serialize");
    assert_eq!(tb.text().ok(), Some(text.as_str()));
    assert_eq!(tb.html(None).ok(), Some(html));
});
