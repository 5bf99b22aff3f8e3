use scraper::{Html, Node};

/// Converts comment markup to plain text
///
/// Line breaks become newlines, block elements start on a new line,
/// entities are decoded and every other tag is dropped.
pub fn html_to_text(html: &str) -> String {
    if !html.contains('<') && !html.contains('&') {
        return html.to_string();
    }

    let fragment = Html::parse_fragment(html);
    let mut text = String::with_capacity(html.len());

    for node in fragment.tree.root().descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(element) => match element.name() {
                "br" => text.push('\n'),
                "p" | "div" if !text.is_empty() && !text.ends_with('\n') => text.push('\n'),
                _ => {}
            },
            _ => {}
        }
    }

    text
}
