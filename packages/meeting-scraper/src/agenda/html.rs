//! HTML agenda to plain text.

use scraper::{ElementRef, Html, Node};

/// Elements whose content is never agenda text.
const SKIPPED: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Elements that start a new line.
const BLOCKS: &[&str] = &[
    "p", "div", "li", "br", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "table", "ul", "ol",
    "section", "article", "header", "footer", "blockquote", "pre", "dt", "dd",
];

/// Visible text with one line per block element and whitespace collapsed
/// within each line. Blank lines are dropped.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut raw = String::new();
    walk(document.root_element(), &mut raw);

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn walk(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child_element) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = child_element.value().name();
                if SKIPPED.contains(&name) {
                    continue;
                }
                let block = BLOCKS.contains(&name);
                if block {
                    out.push('\n');
                }
                walk(child_element, out);
                if block {
                    out.push('\n');
                } else {
                    // Inline neighbours like <td>a</td><td>b</td> must not fuse
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_become_lines() {
        let html = r#"
            <html><head><title>Agenda</title><style>p { color: red }</style></head>
            <body>
              <h1>City Council   Regular Meeting</h1>
              <script>var tracking = 1;</script>
              <ol>
                <li>Call to order</li>
                <li>Approve the <b>consent</b> agenda</li>
              </ol>
              <p>Public hearing:<br>Ordinance 2025-14</p>
            </body></html>
        "#;

        let text = html_to_text(html);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "City Council Regular Meeting",
                "Call to order",
                "Approve the consent agenda",
                "Public hearing:",
                "Ordinance 2025-14",
            ]
        );
    }

    #[test]
    fn test_table_cells_do_not_fuse() {
        let text = html_to_text("<table><tr><td>Item 1</td><td>Budget report</td></tr></table>");
        assert_eq!(text, "Item 1 Budget report");
    }

    #[test]
    fn test_empty_html_is_empty_text() {
        assert_eq!(html_to_text("<html><body>  </body></html>"), "");
    }
}
