//! Markup tree → Markdown rendering.
//!
//! Output conventions: ATX headings, fenced code blocks, `_` emphasis,
//! `**` strong emphasis and inline links.

use crate::dom::{ArenaDom, NodeData, NodeId, is_block_tag, is_non_rendered_tag};

use super::escape::{
    calculate_fence_length, calculate_inline_code_ticks, escape_inline, escape_markdown,
};

/// Tracks list context for numbering.
#[derive(Debug, Clone)]
struct ListContext {
    ordered: bool,
    counter: usize,
}

/// Context for rendering (pure string accumulation, no I/O).
pub struct RenderContext<'a> {
    dom: &'a ArenaDom,
    output: String,
    line_prefix: String,
    list_stack: Vec<ListContext>,
    at_line_start: bool,
    has_line_content: bool,
    pending_newline: bool,
}

impl<'a> RenderContext<'a> {
    pub fn new(dom: &'a ArenaDom) -> Self {
        Self {
            dom,
            output: String::new(),
            line_prefix: String::new(),
            list_stack: Vec::new(),
            at_line_start: true,
            has_line_content: false,
            pending_newline: false,
        }
    }

    /// Render everything below `root`, consuming the context.
    pub fn render(mut self, root: NodeId) -> String {
        self.walk_children(root);
        let trimmed = self.output.trim_end().len();
        self.output.truncate(trimmed);
        self.output
    }

    /// Emit the blank line owed by the previous block, then the line prefix.
    fn ensure_line_started(&mut self) {
        if self.pending_newline {
            self.pending_newline = false;
            if !self.output.is_empty() {
                if !self.at_line_start {
                    self.write_newline();
                }
                self.output.push_str(self.line_prefix.trim_end());
                self.write_newline();
            }
        }
        if self.at_line_start {
            self.output.push_str(&self.line_prefix);
            self.at_line_start = false;
        }
    }

    fn write_newline(&mut self) {
        let trimmed = self.output.trim_end_matches(' ').len();
        self.output.truncate(trimmed);
        self.output.push('\n');
        self.at_line_start = true;
        self.has_line_content = false;
    }

    /// A block never continues a line that already has text on it.
    fn start_block(&mut self) {
        if self.has_line_content {
            self.pending_newline = true;
        }
    }

    fn end_block(&mut self) {
        self.pending_newline = true;
    }

    fn walk_children(&mut self, id: NodeId) {
        for child in self.dom.children(id) {
            self.walk_node(child);
        }
    }

    fn walk_node(&mut self, id: NodeId) {
        let Some(node) = self.dom.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Text(text) => self.write_text(text),
            NodeData::Document => self.walk_children(id),
            NodeData::Other => {}
            NodeData::Element { name, .. } => {
                let tag = name.local.as_ref();
                self.walk_element(id, tag);
            }
        }
    }

    fn walk_element(&mut self, id: NodeId, tag: &str) {
        if is_non_rendered_tag(tag) {
            return;
        }
        match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse::<usize>().unwrap_or(1);
                self.start_block();
                self.ensure_line_started();
                self.output.push_str(&"#".repeat(level));
                self.output.push(' ');
                self.walk_children(id);
                self.end_block();
            }

            "em" | "i" | "cite" | "dfn" | "var" => self.wrap_inline(id, "_"),
            "strong" | "b" => self.wrap_inline(id, "**"),

            "code" | "kbd" | "samp" | "tt" => {
                let content = collapse_whitespace(&self.dom.text_content(id));
                if content.is_empty() {
                    return;
                }
                self.ensure_line_started();
                let ticks = "`".repeat(calculate_inline_code_ticks(&content));
                let spacer = if content.starts_with('`') || content.ends_with('`') {
                    " "
                } else {
                    ""
                };
                self.output
                    .push_str(&format!("{ticks}{spacer}{content}{spacer}{ticks}"));
                self.has_line_content = true;
            }

            "a" => match self.dom.get_attr(id, "href").filter(|h| !h.is_empty()) {
                Some(href) => {
                    self.ensure_line_started();
                    self.output.push('[');
                    self.walk_children(id);
                    self.output.push_str(&format!("]({href})"));
                    self.has_line_content = true;
                }
                None => self.walk_children(id),
            },

            "img" => {
                let Some(src) = self.dom.get_attr(id, "src").filter(|s| !s.is_empty()) else {
                    return;
                };
                let alt = self.dom.get_attr(id, "alt").unwrap_or("");
                self.ensure_line_started();
                self.output.push_str(&format!("![{}]({src})", escape_inline(alt)));
                self.has_line_content = true;
            }

            "br" => {
                self.ensure_line_started();
                self.output.push('\\');
                self.write_newline();
            }

            "hr" => {
                self.start_block();
                self.ensure_line_started();
                self.output.push_str("* * *");
                self.end_block();
            }

            "pre" => self.write_code_block(id),

            "blockquote" => {
                self.start_block();
                self.ensure_line_started();
                // The outer prefix is already on this line; add ours by hand.
                self.output.push_str("> ");
                let old_prefix = self.line_prefix.clone();
                self.line_prefix.push_str("> ");
                self.walk_children(id);
                self.line_prefix = old_prefix;
                self.end_block();
            }

            "ul" | "ol" => {
                let start = self
                    .dom
                    .get_attr(id, "start")
                    .and_then(|s| s.trim().parse::<usize>().ok())
                    .unwrap_or(1);
                self.list_stack.push(ListContext {
                    ordered: tag == "ol",
                    counter: start.saturating_sub(1),
                });
                self.walk_children(id);
                self.list_stack.pop();
                self.end_block();
            }

            "li" => self.write_list_item(id),

            "tr" => {
                self.ensure_line_started();
                let cells: Vec<String> = self
                    .dom
                    .children(id)
                    .filter(|&c| matches!(self.dom.tag_name(c), Some("td" | "th")))
                    .map(|c| escape_inline(&collapse_whitespace(&self.dom.text_content(c))))
                    .collect();
                self.output.push_str(&cells.join(" | "));
                self.write_newline();
                self.pending_newline = false;
            }

            _ if is_block_tag(tag) => {
                self.start_block();
                self.walk_children(id);
                self.end_block();
            }

            _ => self.walk_children(id),
        }
    }

    fn wrap_inline(&mut self, id: NodeId, delimiter: &str) {
        if self.dom.text_content(id).trim().is_empty() {
            self.walk_children(id);
            return;
        }
        self.ensure_line_started();
        self.output.push_str(delimiter);
        self.walk_children(id);
        // Keep a trailing space outside the delimiter or the emphasis won't close.
        let had_space = self.output.ends_with(' ');
        if had_space {
            self.output.pop();
        }
        self.output.push_str(delimiter);
        if had_space {
            self.output.push(' ');
        }
        self.has_line_content = true;
    }

    fn write_list_item(&mut self, id: NodeId) {
        // A pending blank line separates the list from what came before it.
        if !self.pending_newline && !self.at_line_start {
            self.write_newline();
        }
        self.ensure_line_started();

        let bullet = match self.list_stack.last_mut() {
            Some(list) if list.ordered => {
                list.counter += 1;
                format!("{}. ", list.counter)
            }
            _ => "- ".to_string(),
        };
        self.output.push_str(&bullet);

        let old_prefix = self.line_prefix.clone();
        self.line_prefix.push_str(&" ".repeat(bullet.len()));
        self.walk_children(id);
        self.line_prefix = old_prefix;
        self.pending_newline = false;
    }

    fn write_code_block(&mut self, id: NodeId) {
        self.start_block();
        let text = self.dom.text_content(id);
        let language = self
            .dom
            .descendants(id)
            .filter_map(|n| self.dom.get_attr(n, "class"))
            .flat_map(str::split_whitespace)
            .find_map(|class| class.strip_prefix("language-"))
            .unwrap_or("");

        self.ensure_line_started();
        let fence = "`".repeat(calculate_fence_length(&text));
        self.output.push_str(&fence);
        self.output.push_str(language);
        self.write_newline();
        for line in text.trim_end_matches('\n').lines() {
            self.output.push_str(&self.line_prefix);
            self.output.push_str(line);
            self.output.push('\n');
        }
        self.output.push_str(&self.line_prefix);
        self.output.push_str(&fence);
        self.at_line_start = false;
        self.end_block();
    }

    fn write_text(&mut self, text: &str) {
        let has_leading = text.starts_with(char::is_whitespace);
        let has_trailing = text.ends_with(char::is_whitespace);
        let joined = collapse_whitespace(text);

        if joined.is_empty() {
            if self.has_line_content && !self.output.ends_with(' ') {
                self.output.push(' ');
            }
            return;
        }

        self.ensure_line_started();
        if has_leading && self.has_line_content && !self.output.ends_with(' ') {
            self.output.push(' ');
        }
        let escaped = if self.has_line_content {
            escape_inline(&joined)
        } else {
            escape_markdown(&joined)
        };
        self.output.push_str(&escaped);
        self.has_line_content = true;
        if has_trailing {
            self.output.push(' ');
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Convert an HTML or XHTML document (or fragment) to Markdown.
pub fn html_to_markdown(html: &str) -> String {
    let dom = crate::dom::parse_html(html);
    let root = dom.find_by_tag("body").unwrap_or(dom.document());
    RenderContext::new(&dom).render(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_and_paragraphs() {
        let md = html_to_markdown("<h1>Chapter One</h1><p>First.</p><p>Second.</p>");
        assert_eq!(md, "# Chapter One\n\nFirst.\n\nSecond.");
    }

    #[test]
    fn test_emphasis_delimiters() {
        let md = html_to_markdown("<p>An <em>odd</em> and <strong>bold </strong>claim.</p>");
        assert_eq!(md, "An _odd_ and **bold** claim.");
    }

    #[test]
    fn test_inline_link_and_image() {
        let md = html_to_markdown(r#"<p>See <a href="notes.xhtml#n1">note</a> <img src="a.png" alt="fig"/></p>"#);
        assert_eq!(md, "See [note](notes.xhtml#n1) ![fig](a.png)");
    }

    #[test]
    fn test_lists() {
        let md = html_to_markdown("<ul><li>one</li><li>two</li></ul><ol start=\"3\"><li>three</li></ol>");
        assert_eq!(md, "- one\n- two\n\n3. three");
    }

    #[test]
    fn test_nested_list_is_indented() {
        let md = html_to_markdown("<ul><li>outer<ul><li>inner</li></ul></li></ul>");
        assert_eq!(md, "- outer\n  - inner");
    }

    #[test]
    fn test_blockquote_keeps_prefix_on_blank_lines() {
        let md = html_to_markdown("<blockquote><p>a</p><p>b</p></blockquote>");
        assert_eq!(md, "> a\n>\n> b");
    }

    #[test]
    fn test_fenced_code_block() {
        let md = html_to_markdown("<pre><code class=\"language-rust\">let x = 1;\nlet y = 2;\n</code></pre>");
        assert_eq!(md, "```rust\nlet x = 1;\nlet y = 2;\n```");
    }

    #[test]
    fn test_scripts_and_styles_are_dropped() {
        let md = html_to_markdown("<head><style>p{}</style></head><body><script>x()</script><p>kept</p></body>");
        assert_eq!(md, "kept");
    }

    #[test]
    fn test_text_after_block_starts_new_paragraph() {
        let md = html_to_markdown("<div><p>block</p>tail</div>");
        assert_eq!(md, "block\n\ntail");
    }

    #[test]
    fn test_literal_markers_are_escaped() {
        let md = html_to_markdown("<p>*not emphasis* and 1. item</p>");
        assert_eq!(md, "\\*not emphasis\\* and 1. item");
    }
}
