//! Markdown Renderer - Telegram HTML 변환
//!
//! pulldown-cmark 이벤트를 Telegram이 허용하는 태그
//! (`<b> <i> <s> <code> <pre> <a> <blockquote>`)로 변환한다.
//! 지원하지 않는 구조는 평문으로 degrade하고, 모든 텍스트는 escape된다.

use nanobot_foundation::strings::{char_len, escape_html};
use nanobot_foundation::MarkupRenderer;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

/// Markdown → Telegram HTML
#[derive(Debug, Clone, Copy, Default)]
pub struct TelegramHtmlRenderer;

impl TelegramHtmlRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn to_html(&self, markdown: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);

        let mut state = RenderState::default();
        for event in Parser::new_ext(markdown, options) {
            state.process_event(event);
        }
        state.finish()
    }
}

impl MarkupRenderer for TelegramHtmlRenderer {
    fn render(&self, markdown: &str) -> String {
        self.to_html(markdown)
    }
}

/// 표 수집 상태
#[derive(Default)]
struct TableState {
    rows: Vec<Vec<String>>,
    header_rows: usize,
    cell: String,
}

/// 렌더링 상태
#[derive(Default)]
struct RenderState {
    out: String,
    /// 코드 블록 내용
    code_buffer: String,
    in_code_block: bool,
    /// 리스트 아이템 번호 (ordered list)
    list_counters: Vec<Option<u64>>,
    table: Option<TableState>,
}

impl RenderState {
    fn push_text(&mut self, text: &str) {
        if self.in_code_block {
            self.code_buffer.push_str(text);
        } else if let Some(table) = self.table.as_mut() {
            table.cell.push_str(text);
        } else {
            self.out.push_str(&escape_html(text));
        }
    }

    /// Markup is dropped inside tables; cells are plain text
    fn push_markup(&mut self, markup: &str) {
        if self.table.is_none() && !self.in_code_block {
            self.out.push_str(markup);
        }
    }

    fn trim_trailing_newlines(&mut self) {
        let trimmed = self.out.trim_end_matches('\n').len();
        self.out.truncate(trimmed);
    }

    /// Separate the next block from the previous one by a blank line
    fn end_block(&mut self) {
        self.trim_trailing_newlines();
        if !self.out.is_empty() && !self.out.ends_with("<blockquote>") {
            self.out.push_str("\n\n");
        }
    }

    fn process_event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => {
                if self.table.is_some() {
                    self.push_text(&code);
                } else {
                    self.out
                        .push_str(&format!("<code>{}</code>", escape_html(&code)));
                }
            }
            // raw HTML is shown, never interpreted
            Event::Html(html) | Event::InlineHtml(html) => self.push_text(&html),
            Event::SoftBreak | Event::HardBreak => self.push_text("\n"),
            Event::Rule => {
                self.end_block();
                self.out.push_str("─────\n");
            }
            Event::TaskListMarker(checked) => self.push_text(if checked { "☑ " } else { "☐ " }),
            Event::FootnoteReference(name) => self.push_text(&format!("[{}]", name)),
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag) {
        match tag {
            Tag::Heading { .. } => {
                self.end_block();
                self.push_markup("<b>");
            }
            Tag::Paragraph => {
                if self.list_counters.is_empty() {
                    self.end_block();
                }
            }
            Tag::BlockQuote(_) => {
                self.end_block();
                self.push_markup("<blockquote>");
            }
            Tag::CodeBlock(_) => {
                self.end_block();
                self.in_code_block = true;
                self.code_buffer.clear();
            }
            Tag::List(start) => {
                if self.list_counters.is_empty() {
                    self.end_block();
                } else if !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
                self.list_counters.push(start);
            }
            Tag::Item => {
                let indent = "  ".repeat(self.list_counters.len().saturating_sub(1));
                let marker = match self.list_counters.last_mut() {
                    Some(Some(num)) => {
                        let marker = format!("{}. ", num);
                        *num += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.out.push_str(&indent);
                self.out.push_str(&marker);
            }
            Tag::Emphasis => self.push_markup("<i>"),
            Tag::Strong => self.push_markup("<b>"),
            Tag::Strikethrough => self.push_markup("<s>"),
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                let open = format!("<a href=\"{}\">", escape_html(&dest_url));
                self.push_markup(&open);
            }
            Tag::Table(_) => {
                self.end_block();
                self.table = Some(TableState::default());
            }
            // header cells arrive without a TableRow wrapper
            Tag::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.rows.push(Vec::new());
                    table.header_rows += 1;
                }
            }
            Tag::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.rows.push(Vec::new());
                }
            }
            Tag::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    table.cell.clear();
                }
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                self.push_markup("</b>");
                self.out.push('\n');
            }
            TagEnd::Paragraph => {
                if self.list_counters.is_empty() {
                    self.out.push_str("\n\n");
                } else {
                    self.out.push('\n');
                }
            }
            TagEnd::BlockQuote(_) => {
                self.trim_trailing_newlines();
                self.push_markup("</blockquote>");
                self.out.push_str("\n\n");
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                let code = std::mem::take(&mut self.code_buffer);
                self.out.push_str(&format!(
                    "<pre>{}</pre>\n\n",
                    escape_html(code.trim_end_matches('\n'))
                ));
            }
            TagEnd::List(_) => {
                self.list_counters.pop();
                if self.list_counters.is_empty() {
                    self.out.push('\n');
                }
            }
            TagEnd::Item => {
                self.trim_trailing_newlines();
                self.out.push('\n');
            }
            TagEnd::Emphasis => self.push_markup("</i>"),
            TagEnd::Strong => self.push_markup("</b>"),
            TagEnd::Strikethrough => self.push_markup("</s>"),
            TagEnd::Link | TagEnd::Image => self.push_markup("</a>"),
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = std::mem::take(&mut table.cell).trim().to_string();
                    if let Some(row) = table.rows.last_mut() {
                        row.push(cell);
                    }
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    let art = table_to_box(&table.rows, table.header_rows);
                    if !art.is_empty() {
                        self.out
                            .push_str(&format!("<pre>{}</pre>\n\n", escape_html(&art)));
                    }
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> String {
        self.out.trim().to_string()
    }
}

/// Unicode box-drawing table, header separated by a rule
pub fn table_to_box(rows: &[Vec<String>], header_rows: usize) -> String {
    let rows: Vec<&Vec<String>> = rows.iter().filter(|row| !row.is_empty()).collect();
    if rows.is_empty() {
        return String::new();
    }
    let columns = rows.iter().map(|row| row.len()).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            rows.iter()
                .map(|row| row.get(i).map_or(0, |cell| char_len(cell)))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let rule = |left: &str, mid: &str, right: &str| {
        let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{}{}{}", left, segments.join(mid), right)
    };
    let format_row = |row: &Vec<String>| {
        let cells: Vec<String> = (0..columns)
            .map(|i| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                let pad = widths[i] - char_len(cell);
                format!(" {}{} ", cell, " ".repeat(pad))
            })
            .collect();
        format!("│{}│", cells.join("│"))
    };

    let mut lines = vec![rule("┌", "┬", "┐")];
    for (i, row) in rows.iter().enumerate() {
        lines.push(format_row(row));
        if header_rows > 0 && i + 1 == header_rows && i + 1 < rows.len() {
            lines.push(rule("├", "┼", "┤"));
        }
    }
    lines.push(rule("└", "┴", "┘"));
    lines.join("\n")
}
