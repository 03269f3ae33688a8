//! 终端展示层：把渲染模型转成纯文本写到 stdout
//!
//! 标记后的 HTML 片段在这里还原为终端文本（<br> 换行、<li> 项目符号、实体反转义），
//! 过长内容截断，按宽度折行。

use std::io::Write;
use std::sync::{Mutex, OnceLock};

use regex::Regex;

use crate::memory::{ConversationEntry, Speaker};
use crate::operations::FormInputs;
use crate::render::RenderModel;
use crate::ui::{Presentation, Severity, Slot};

/// 单段内容最多显示字符数
const MAX_DISPLAY_CHARS: usize = 4000;
const DEFAULT_WIDTH: usize = 100;

pub struct ConsoleSurface {
    out: Mutex<Box<dyn Write + Send>>,
    width: usize,
}

impl ConsoleSurface {
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            width: DEFAULT_WIDTH,
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    fn write_lines(&self, lines: &[String]) {
        let Ok(mut out) = self.out.lock() else {
            return;
        };
        for line in lines {
            for wrapped in wrap_text(line, self.width) {
                let _ = writeln!(out, "{wrapped}");
            }
        }
        let _ = out.flush();
    }

    /// 输出输入提示符
    pub fn prompt(&self) {
        if let Ok(mut out) = self.out.lock() {
            let _ = write!(out, "> ");
            let _ = out.flush();
        }
    }
}

/// 标记 HTML 还原为终端文本；先去掉标签再反转义，原文中的 `&lt;b&gt;` 最终显示为字面 `<b>`
pub fn html_to_text(html: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is a valid regex"));
    let text = html
        .replace("<br>", "\n")
        .replace("<li>", "\n• ")
        .replace("</ul>", "\n");
    let stripped = tag.replace_all(&text, "");
    let unescaped = stripped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    let lines: Vec<&str> = unescaped.lines().map(str::trim_end).collect();
    lines.join("\n").trim_matches('\n').to_string()
}

fn truncate_for_display(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    if chars.len() <= MAX_DISPLAY_CHARS {
        return content.to_string();
    }
    let head: String = chars.iter().take(MAX_DISPLAY_CHARS).collect();
    format!("{}\n... [kısaltıldı, toplam {} karakter]", head, chars.len())
}

/// 按字符数折行，不会切断 UTF-8 字符
fn wrap_text(s: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    for para in s.split('\n') {
        let mut line = String::new();
        for ch in para.chars() {
            if line.chars().count() >= width {
                lines.push(std::mem::take(&mut line));
            }
            line.push(ch);
        }
        lines.push(line);
    }
    lines
}

/// 渲染模型 -> 终端行
pub fn model_lines(slot: &Slot, model: &RenderModel) -> Vec<String> {
    let mut lines = vec![format!("── {} [{}] ──", model.title(), slot)];
    match model {
        RenderModel::Text { html, .. } => lines.push(truncate_for_display(&html_to_text(html))),
        RenderModel::Cards { cards, .. } => {
            for card in cards {
                lines.push(format!("◆ {}", card.heading));
                let body = html_to_text(&card.body_html);
                if !body.is_empty() {
                    lines.push(truncate_for_display(&body));
                }
                lines.extend(card.meta.iter().map(|(k, v)| format!("  {k}: {v}")));
            }
        }
        RenderModel::Table { columns, rows, .. } => {
            lines.push(columns.join(" | "));
            lines.push("-".repeat(columns.join(" | ").chars().count()));
            lines.extend(rows.iter().map(|row| row.join(" | ")));
        }
        RenderModel::List { items, .. } => lines.extend(items.iter().map(|i| format!("• {i}"))),
        RenderModel::Questions { questions, .. } => {
            for q in questions {
                lines.push(format!("{}. {}", q.number, html_to_text(&q.text_html)));
                lines.extend(q.options.iter().map(|o| format!("   {o}")));
                if let Some(answer) = &q.answer {
                    lines.push(format!("   ✓ {answer}"));
                }
                if let Some(explanation) = &q.explanation_html {
                    lines.push(format!("   {}", html_to_text(explanation)));
                }
            }
        }
        RenderModel::Document { href, .. } => lines.push(format!("📄 {href}")),
        RenderModel::NotFound { message, .. } => lines.push(message.clone()),
        RenderModel::Error { message, .. } => lines.push(format!("⚠️ {message}")),
    }
    lines
}

impl Presentation for ConsoleSurface {
    fn render(&self, slot: &Slot, model: &RenderModel) {
        self.write_lines(&model_lines(slot, model));
    }

    fn notify(&self, message: &str, severity: Severity) {
        let marker = match severity {
            Severity::Info => "[i]",
            Severity::Success => "[✓]",
            Severity::Warning => "[!]",
            Severity::Error => "[✗]",
        };
        self.write_lines(&[format!("{marker} {message}")]);
    }

    /// 只输出最新一条消息，避免每次重绘整段历史
    fn conversation(&self, entries: &[ConversationEntry]) {
        let Some(last) = entries.last() else {
            return;
        };
        let line = match (last.speaker, last.is_pending) {
            (_, true) => format!("… {}", last.text),
            (Speaker::User, false) => format!("Sen: {}", last.text),
            (Speaker::Assistant, false) => format!("Asistan: {}", truncate_for_display(&last.text)),
        };
        self.write_lines(&[line]);
    }

    fn prefill(&self, operation: &str, inputs: &FormInputs) {
        let args: Vec<String> = inputs.iter().map(|(k, v)| format!("{k}=\"{v}\"")).collect();
        self.write_lines(&[format!("Form hazır: op {operation} {}", args.join(" "))]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::format_text;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_html_to_text_keeps_escaped_tags_literal() {
        let html = format_text("<b>x</b> *y*");
        assert_eq!(html_to_text(&html), "<b>x</b> y");
    }

    #[test]
    fn test_html_to_text_lists_and_breaks() {
        let html = format_text("Başlık\n- bir\n- iki");
        assert_eq!(html_to_text(&html), "Başlık\n\n• bir\n• iki");
    }

    #[test]
    fn test_wrap_text_utf8() {
        let lines = wrap_text("çğıöşü", 4);
        assert_eq!(lines, vec!["çğıö", "şü"]);
    }

    #[test]
    fn test_render_table_and_notice() {
        let buffer = SharedBuffer::default();
        let surface = ConsoleSurface::with_writer(Box::new(buffer.clone()));
        surface.render(
            &Slot::Operation("search".into()),
            &RenderModel::Table {
                title: "Arama".into(),
                columns: vec!["Başlık".into(), "Skor".into()],
                rows: vec![vec!["Türev".into(), "0.90".into()]],
            },
        );
        surface.notify("Profil kaydedildi", Severity::Success);
        let text = buffer.text();
        assert!(text.contains("Arama [operation:search]"));
        assert!(text.contains("Türev | 0.90"));
        assert!(text.contains("[✓] Profil kaydedildi"));
    }

    #[test]
    fn test_conversation_prints_latest_entry() {
        let buffer = SharedBuffer::default();
        let surface = ConsoleSurface::with_writer(Box::new(buffer.clone()));
        surface.conversation(&[ConversationEntry::user("Merhaba"), ConversationEntry::pending()]);
        assert_eq!(buffer.text(), "… Yanıt hazırlanıyor...\n");
    }
}
