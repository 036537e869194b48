//! HTML back-end: a single self-contained page with inline CSS.

use super::layout::{Block, Span, Tone};

const STYLE: &str = r#"
        body {
            font-family: 'Segoe UI', 'Malgun Gothic', sans-serif;
            max-width: 900px;
            margin: 40px auto;
            padding: 20px;
            line-height: 1.8;
            background: #f9fafb;
        }
        h1 {
            text-align: center;
            color: #1f2937;
            border-bottom: 3px solid #6366f1;
            padding-bottom: 10px;
        }
        h2 {
            color: #4f46e5;
            margin-top: 30px;
            border-left: 4px solid #6366f1;
            padding-left: 10px;
        }
        h3 {
            color: #6366f1;
            margin-top: 20px;
        }
        .metadata {
            text-align: center;
            font-weight: bold;
            margin-bottom: 30px;
            padding: 10px;
            background: #e0e7ff;
            border-radius: 8px;
        }
        .option { margin: 2px 0 2px 2em; }
        .page-ref { color: #666666; font-style: italic; font-size: 0.9em; }
        .accent { color: #0066CC; }
        .check-ok { color: #008000; }
        .check-fail { color: #CC0000; }
        hr { border: none; border-top: 2px solid #c7d2fe; margin: 30px 0 10px; }
        .page-break { page-break-before: always; break-before: page; }
"#;

/// Escape text for HTML element content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn span_html(span: &Span) -> String {
    let mut text = escape_html(&span.text);
    if span.bold {
        text = format!("<strong>{text}</strong>");
    }
    if span.italic && span.tone != Tone::Muted {
        text = format!("<em>{text}</em>");
    }
    match span.tone {
        Tone::Plain => text,
        Tone::Muted => format!("<span class=\"page-ref\">{text}</span>"),
        Tone::Accent => format!("<span class=\"accent\">{text}</span>"),
        Tone::Alert => format!("<span class=\"check-fail\">{text}</span>"),
        Tone::Success => format!("<span class=\"check-ok\">{text}</span>"),
    }
}

fn spans_html(spans: &[Span]) -> String {
    spans.iter().map(span_html).collect()
}

/// Render blocks as a complete HTML document.
pub fn render_html(title: &str, blocks: &[Block]) -> String {
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n    <meta charset=\"UTF-8\">\n    \
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n    \
<title>{}</title>\n    <style>{}    </style>\n</head>\n<body>\n",
        escape_html(title),
        STYLE
    );

    let mut in_list = false;
    for block in blocks {
        let is_bullet = matches!(block, Block::Bullet(_));
        if in_list && !is_bullet {
            html.push_str("    </ul>\n");
            in_list = false;
        }

        match block {
            Block::Title(t) => html.push_str(&format!("    <h1>{}</h1>\n", escape_html(t))),
            Block::Centered(spans) => html.push_str(&format!(
                "    <div class=\"metadata\">{}</div>\n",
                spans_html(spans)
            )),
            Block::Heading1(t) => html.push_str(&format!("    <h2>{}</h2>\n", escape_html(t))),
            Block::Heading2(t) => html.push_str(&format!("    <h3>{}</h3>\n", escape_html(t))),
            Block::Paragraph(spans) => {
                html.push_str(&format!("    <p>{}</p>\n", spans_html(spans)))
            }
            Block::Bullet(spans) => {
                if !in_list {
                    html.push_str("    <ul>\n");
                    in_list = true;
                }
                html.push_str(&format!("        <li>{}</li>\n", spans_html(spans)));
            }
            Block::Indented(t) => html.push_str(&format!(
                "    <p class=\"option\">{}</p>\n",
                escape_html(t)
            )),
            Block::Rule => html.push_str("    <hr>\n"),
            Block::PageBreak => html.push_str("    <div class=\"page-break\"></div>\n"),
        }
    }
    if in_list {
        html.push_str("    </ul>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn consecutive_bullets_share_one_list() {
        let blocks = vec![
            Block::Heading2("Terms".into()),
            Block::Bullet(vec![Span::plain("a")]),
            Block::Bullet(vec![Span::plain("b")]),
            Block::Paragraph(vec![Span::plain("after")]),
            Block::Bullet(vec![Span::plain("c")]),
        ];
        let html = render_html("T", &blocks);
        assert_eq!(html.matches("<ul>").count(), 2);
        assert_eq!(html.matches("</ul>").count(), 2);
        assert!(html.find("</ul>").unwrap() < html.find("<p>after</p>").unwrap());
    }

    #[test]
    fn spans_are_styled_and_escaped() {
        let blocks = vec![Block::Paragraph(vec![
            Span::bold("Q <1>: "),
            Span::cite(" (p.2)"),
            Span::toned("✓ ", Tone::Success),
        ])];
        let html = render_html("T", &blocks);
        assert!(html.contains("<strong>Q &lt;1&gt;: </strong>"));
        assert!(html.contains("<span class=\"page-ref\"> (p.2)</span>"));
        assert!(html.contains("<span class=\"check-ok\"><strong>✓ </strong></span>"));
    }
}
