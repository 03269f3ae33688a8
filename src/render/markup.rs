//! 轻量文本标记
//!
//! 先对原文做 HTML 转义，再按顺序应用一组纯文本规则（列表、标题、粗体、斜体、换行），
//! 因此 AI 生成的文本中原有的标签只会以字面文本显示。

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// 规则的替换方式
pub enum Rewrite {
    Template(&'static str),
    With(fn(&Captures) -> String),
}

/// 单条转换规则，可单独测试
pub struct TextRule {
    pub name: &'static str,
    pattern: Regex,
    rewrite: Rewrite,
}

impl TextRule {
    pub fn new(name: &'static str, pattern: &str, rewrite: Rewrite) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("markup rule pattern is a valid regex"),
            rewrite,
        }
    }

    pub fn apply(&self, input: &str) -> String {
        match &self.rewrite {
            Rewrite::Template(t) => self.pattern.replace_all(input, *t).into_owned(),
            Rewrite::With(f) => self.pattern.replace_all(input, |c: &Captures| f(c)).into_owned(),
        }
    }
}

/// 有序规则链
pub struct Markup {
    rules: Vec<TextRule>,
}

impl Markup {
    pub fn new(rules: Vec<TextRule>) -> Self {
        Self { rules }
    }

    /// 列表 -> 列表包裹 -> 标题 -> 粗体 -> 斜体 -> 换行
    pub fn standard() -> Self {
        Self::new(vec![
            TextRule::new(
                "bullet",
                r"(?m)^[ \t]*[-*•][ \t]+(.+?)[ \t]*$",
                Rewrite::Template("<li>${1}</li>"),
            ),
            TextRule::new(
                "bullet_group",
                r"(?m)(?:^<li>.*</li>(?:\r?\n|$))+",
                Rewrite::With(wrap_list),
            ),
            TextRule::new(
                "heading",
                r"(?m)^#{1,6}[ \t]+(.+?)[ \t]*$",
                Rewrite::Template("<strong>${1}</strong>"),
            ),
            TextRule::new("bold", r"\*\*(.+?)\*\*", Rewrite::Template("<strong>${1}</strong>")),
            TextRule::new("italic", r"\*([^*\n]+?)\*", Rewrite::Template("<em>${1}</em>")),
            TextRule::new("line_break", r"\r?\n", Rewrite::Template("<br>")),
        ])
    }

    pub fn render(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(escape_html(text), |acc, rule| rule.apply(&acc))
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }
}

/// 连续的 <li> 行合并进一个 <ul>，行间换行被吞掉以免变成 <br>
fn wrap_list(caps: &Captures) -> String {
    let block = &caps[0];
    let trailing_newline = block.ends_with('\n');
    let items: String = block.lines().map(str::trim_end).collect();
    if trailing_newline {
        format!("<ul>{items}</ul>\n")
    } else {
        format!("<ul>{items}</ul>")
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// 使用标准规则链格式化自由文本
pub fn format_text(text: &str) -> String {
    static STANDARD: OnceLock<Markup> = OnceLock::new();
    STANDARD.get_or_init(Markup::standard).render(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_before_format() {
        let html = format_text("<b>x</b> *y*");
        assert_eq!(html, "&lt;b&gt;x&lt;/b&gt; <em>y</em>");
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_bold_and_italic() {
        assert_eq!(
            format_text("**Türev** bir *limit* tanımıdır"),
            "<strong>Türev</strong> bir <em>limit</em> tanımıdır"
        );
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(format_text("a\nb\r\nc"), "a<br>b<br>c");
    }

    #[test]
    fn test_bullet_list_is_grouped() {
        let html = format_text("Konular:\n- limit\n- türev\nSon");
        assert_eq!(html, "Konular:<br><ul><li>limit</li><li>türev</li></ul><br>Son");
    }

    #[test]
    fn test_star_bullet_not_treated_as_italic() {
        let html = format_text("* birinci\n* ikinci");
        assert_eq!(html, "<ul><li>birinci</li><li>ikinci</li></ul>");
    }

    #[test]
    fn test_heading() {
        assert_eq!(format_text("## Özet"), "<strong>Özet</strong>");
    }

    #[test]
    fn test_single_rule_in_isolation() {
        let rule = TextRule::new("bold", r"\*\*(.+?)\*\*", Rewrite::Template("<strong>${1}</strong>"));
        assert_eq!(rule.apply("**a** ve **b**"), "<strong>a</strong> ve <strong>b</strong>");
    }

    #[test]
    fn test_script_injection_neutralized() {
        let html = format_text("<script>alert('x')</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_rule_order() {
        assert_eq!(
            Markup::standard().rule_names(),
            vec!["bullet", "bullet_group", "heading", "bold", "italic", "line_break"]
        );
    }
}
