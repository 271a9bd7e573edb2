use std::collections::{HashMap, HashSet};

use ammonia::Builder;

/// Cleans rendered HTML down to the tags and attributes the handlers emit.
/// Comments are dropped; math delimiters survive as text.
pub fn sanitize_html(raw_html: &str) -> String {
    let tags: HashSet<&'static str> = [
        "a", "br", "code", "div", "em", "h1", "h2", "h3", "h4", "img", "li", "ol", "p", "pre",
        "span", "strong", "sup", "table", "tbody", "td", "tr", "ul",
    ]
    .iter()
    .copied()
    .collect();

    let mut generic_attributes: HashSet<&'static str> = HashSet::new();
    generic_attributes.insert("class");
    generic_attributes.insert("id");

    let mut tag_attributes = HashMap::new();
    tag_attributes.insert("a", ["href", "title"].iter().copied().collect());
    tag_attributes.insert("img", ["alt", "src", "title"].iter().copied().collect());
    tag_attributes.insert("ol", ["start"].iter().copied().collect());
    tag_attributes.insert("table", ["align"].iter().copied().collect());
    // Highlighted code carries inline colours.
    tag_attributes.insert("pre", ["style"].iter().copied().collect());
    tag_attributes.insert("span", ["style"].iter().copied().collect());

    Builder::new()
        .tags(tags)
        .generic_attributes(generic_attributes)
        .tag_attributes(tag_attributes)
        .link_rel(None)
        .clean(raw_html)
        .to_string()
}
