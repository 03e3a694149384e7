#![no_main]

use htmltoolbox::{Anchor, HtmlToolbox, Query};
use libfuzzer_sys::fuzz_target;

// First byte picks the operation, second the literal length, the rest is markup.
fuzz_target!(|data: &[u8]| {
    let [op, len, rest @ ..] = data else {
        return;
    };
    let Ok(input) = std::str::from_utf8(rest) else {
        return;
    };
    let mut tb = HtmlToolbox::new(input);
    let Ok(text) = tb.text().map(str::to_string) else {
        return;
    };
    let needle: String = text.chars().take(usize::from(*len % 8) + 1).collect();
    let query = Query::Literal(needle);
    let outcome = match op % 4 {
        0 => tb.remove_all(query),
        1 => tb.replace_all(query, "<b>x</b>", Anchor::Begin),
        2 => tb.replace_all(query, "y", Anchor::End),
        _ => tb.wrap_all(query, "<span><!/></span>"),
    };
    assert!(outcome.is_ok(), "edit failed: {outcome:?}");
    assert!(tb.failure().is_none());
    let html = tb.html(None).expect("serialize");
    let mut again = HtmlToolbox::new(&html);
    assert!(again.text().is_ok());
});
