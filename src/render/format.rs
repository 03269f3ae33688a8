//! 响应格式化
//!
//! 每种操作/结果一个纯函数，从原始载荷构造 RenderModel。
//! 所有函数对任意载荷都是全函数：形状不符时返回空模型或 NotFound，而不是失败。

use serde_json::{Map, Value};

use crate::render::markup::format_text;
use crate::render::model::{Card, QuestionCard, RenderModel};

const HEADING_KEYS: [&str; 7] = ["front", "question", "term", "concept", "title", "name", "week"];
const BODY_KEYS: [&str; 8] = [
    "back",
    "answer",
    "definition",
    "content",
    "explanation",
    "description",
    "text",
    "summary",
];

/// 标量转文本；数组/对象返回 None
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "evet" } else { "hayır" }.to_string()),
        _ => None,
    }
}

/// 去掉 ```json 代码围栏后尝试解析 JSON 字符串
fn parse_embedded_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|s| s.trim_end().trim_end_matches("```"))
        .unwrap_or(trimmed)
        .trim();
    if !(inner.starts_with('[') || inner.starts_with('{')) {
        return None;
    }
    serde_json::from_str(inner).ok()
}

/// 载荷的纯文本形式（用于导出段落与对话条目）
pub fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match scalar_text(item) {
                Some(s) => format!("- {s}"),
                None => format!("- {item}"),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_default(),
    }
}

fn option_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|o| match o {
                Value::Object(obj) => {
                    let letter = obj.get("option_letter").and_then(Value::as_str).unwrap_or("");
                    let text = obj
                        .get("option_text")
                        .or_else(|| obj.get("text"))
                        .and_then(scalar_text)?;
                    Some(if letter.is_empty() { text } else { format!("{letter}) {text}") })
                }
                other => scalar_text(other),
            })
            .collect(),
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(letter, text)| scalar_text(text).map(|t| format!("{letter}) {t}")))
            .collect(),
        _ => Vec::new(),
    }
}

fn question_card(number: usize, value: &Value) -> Option<QuestionCard> {
    match value {
        Value::Object(obj) => {
            let text = ["question_text", "question", "text", "stem"]
                .iter()
                .find_map(|k| obj.get(*k).and_then(scalar_text))?;
            Some(QuestionCard {
                number,
                text_html: format_text(&text),
                options: option_list(obj.get("options").or_else(|| obj.get("choices"))),
                answer: ["correct_answer", "answer"]
                    .iter()
                    .find_map(|k| obj.get(*k).and_then(scalar_text)),
                explanation_html: obj.get("explanation").and_then(scalar_text).map(|e| format_text(&e)),
            })
        }
        other => scalar_text(other).map(|text| QuestionCard {
            number,
            text_html: format_text(&text),
            options: Vec::new(),
            answer: None,
            explanation_html: None,
        }),
    }
}

/// 题目集合：`questions` 可能是题目数组、包裹对象，或内嵌 JSON 的文本
pub fn questions(payload: &Value) -> RenderModel {
    let title = match (
        payload.get("subject").and_then(Value::as_str),
        payload.get("topic").and_then(Value::as_str),
    ) {
        (Some(s), Some(t)) => format!("Sorular: {s} / {t}"),
        _ => "Sorular".to_string(),
    };
    let raw = payload.get("questions").unwrap_or(payload);
    let resolved = match raw {
        Value::String(text) => match parse_embedded_json(text) {
            Some(parsed) => parsed,
            None if !text.trim().is_empty() => {
                return RenderModel::Text {
                    title,
                    html: format_text(text),
                }
            }
            None => return RenderModel::not_found(title),
        },
        other => other.clone(),
    };
    let items = match &resolved {
        Value::Array(items) => items.clone(),
        Value::Object(obj) => match obj.get("questions") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    let cards: Vec<QuestionCard> = items
        .iter()
        .enumerate()
        .filter_map(|(i, q)| question_card(i + 1, q))
        .collect();
    if cards.is_empty() {
        return RenderModel::not_found(title);
    }
    RenderModel::Questions {
        title,
        questions: cards,
    }
}

/// 学习计划：文本计划直接格式化；结构化计划按周/阶段拆成卡片
pub fn study_plan(payload: &Value) -> RenderModel {
    let mut title = "Çalışma Planı".to_string();
    if let Some(exam) = payload.get("target_exam").and_then(Value::as_str) {
        title.push_str(&format!(" ({exam}"));
        if let Some(weeks) = payload.get("duration_weeks").and_then(Value::as_u64) {
            title.push_str(&format!(", {weeks} hafta"));
        }
        if let Some(hours) = payload.get("daily_hours").and_then(Value::as_u64) {
            title.push_str(&format!(", günde {hours} saat"));
        }
        title.push(')');
    }
    let plan = payload.get("study_plan").unwrap_or(&Value::Null);
    match plan {
        Value::String(text) if !text.trim().is_empty() => match parse_embedded_json(text) {
            Some(parsed) => structured_plan(title, &parsed),
            None => RenderModel::Text {
                title,
                html: format_text(text),
            },
        },
        Value::Object(_) | Value::Array(_) => structured_plan(title, plan),
        _ => RenderModel::not_found(title),
    }
}

fn structured_plan(title: String, plan: &Value) -> RenderModel {
    let periods = ["weekly_schedule", "weeks", "phases", "schedule"]
        .iter()
        .find_map(|k| plan.get(*k).and_then(Value::as_array))
        .or_else(|| plan.as_array());
    match periods {
        Some(items) if !items.is_empty() => cards(&title, items),
        _ => table_from_object(title, plan),
    }
}

/// 知识库检索结果表格
pub fn search_results(payload: &Value) -> RenderModel {
    let title = match payload.get("query").and_then(Value::as_str) {
        Some(q) => format!("Arama: {q}"),
        None => "Arama Sonuçları".to_string(),
    };
    let Some(results) = payload.get("results").and_then(Value::as_array) else {
        return RenderModel::not_found(title);
    };
    let rows: Vec<Vec<String>> = results
        .iter()
        .filter_map(Value::as_object)
        .map(|r| {
            let text = |k: &str| r.get(k).and_then(scalar_text).unwrap_or_else(|| "-".to_string());
            let score = r
                .get("relevance_score")
                .or_else(|| r.get("score"))
                .and_then(Value::as_f64)
                .map(|s| format!("{s:.2}"))
                .unwrap_or_else(|| "-".to_string());
            let content: String = r
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or("")
                .chars()
                .take(120)
                .collect();
            vec![text("title"), text("topic"), score, text("source_type"), content]
        })
        .collect();
    if rows.is_empty() {
        return RenderModel::not_found(title);
    }
    RenderModel::Table {
        title,
        columns: ["Başlık", "Konu", "Skor", "Kaynak", "İçerik"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        rows,
    }
}

/// 内容分析文本
pub fn analysis(payload: &Value) -> RenderModel {
    let title = match payload.get("analysis_type").and_then(Value::as_str) {
        Some(kind) => format!("İçerik Analizi ({kind})"),
        None => "İçerik Analizi".to_string(),
    };
    match payload.get("analysis").and_then(scalar_text) {
        Some(text) => RenderModel::Text {
            title,
            html: format_text(&text),
        },
        None => RenderModel::not_found(title),
    }
}

/// 内容校验（幻觉检测）结果卡片
pub fn validation(payload: &Value) -> RenderModel {
    let title = "İçerik Doğrulama".to_string();
    let Some(obj) = payload.as_object() else {
        return RenderModel::not_found(title);
    };
    let mut meta = Vec::new();
    if let Some(valid) = obj.get("is_valid").and_then(Value::as_bool) {
        meta.push(("Geçerli".to_string(), if valid { "evet" } else { "hayır" }.to_string()));
    }
    if let Some(confidence) = obj.get("confidence").and_then(Value::as_f64) {
        meta.push(("Güven".to_string(), format!("%{:.0}", confidence * 100.0)));
    }
    let body = match obj.get("validation") {
        Some(Value::String(text)) => text.clone(),
        Some(other @ Value::Object(_)) => plain_text(other),
        _ => String::new(),
    };
    let issues = obj
        .get("issues")
        .and_then(Value::as_array)
        .map(|issues| issues.iter().filter_map(scalar_text).collect::<Vec<_>>())
        .unwrap_or_default();
    let body = if issues.is_empty() {
        body
    } else {
        let list = issues.iter().map(|i| format!("- {i}")).collect::<Vec<_>>().join("\n");
        format!("{body}\n{list}").trim().to_string()
    };
    if meta.is_empty() && body.is_empty() {
        return RenderModel::not_found(title);
    }
    RenderModel::Cards {
        title: title.clone(),
        cards: vec![Card {
            heading: title,
            body_html: format_text(&body),
            meta,
        }],
    }
}

/// 对话回复文本（`response` / `text` / `message`）
pub fn chat_text(payload: &Value) -> Option<String> {
    match payload {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(obj) => ["response", "text", "message"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(scalar_text)),
        _ => None,
    }
}

pub fn chat_reply(payload: &Value) -> RenderModel {
    match chat_text(payload) {
        Some(text) => RenderModel::Text {
            title: "Asistan".to_string(),
            html: format_text(&text),
        },
        None => RenderModel::not_found("Asistan"),
    }
}

/// 通用流水线结果：按形状选择文本 / 列表 / 卡片 / 表格 / 文档
pub fn task_result(title: &str, payload: &Value) -> RenderModel {
    let value = payload.get("result").unwrap_or(payload);
    match value {
        Value::String(s) if looks_like_file(s) => RenderModel::Document {
            title: title.to_string(),
            href: s.trim().to_string(),
        },
        Value::String(s) => match parse_embedded_json(s) {
            Some(parsed) => task_result(title, &parsed),
            None if !s.trim().is_empty() => RenderModel::Text {
                title: title.to_string(),
                html: format_text(s),
            },
            None => RenderModel::not_found(title),
        },
        Value::Array(items) if items.is_empty() => RenderModel::not_found(title),
        Value::Array(items) if items.iter().all(|i| i.is_object()) => cards(title, items),
        Value::Array(items) => RenderModel::List {
            title: title.to_string(),
            items: items
                .iter()
                .map(|i| scalar_text(i).unwrap_or_else(|| i.to_string()))
                .collect(),
        },
        Value::Object(_) => table_from_object(title.to_string(), value),
        Value::Number(_) | Value::Bool(_) => RenderModel::Text {
            title: title.to_string(),
            html: scalar_text(value).unwrap_or_default(),
        },
        Value::Null => RenderModel::not_found(title),
    }
}

fn looks_like_file(s: &str) -> bool {
    let s = s.trim();
    !s.contains('\n')
        && [".pdf", ".png", ".jpg", ".jpeg", ".svg", ".html", ".docx"]
            .iter()
            .any(|ext| s.to_lowercase().ends_with(ext))
}

fn cards(title: &str, items: &[Value]) -> RenderModel {
    let cards: Vec<Card> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let obj = item.as_object()?;
            let heading = first_str_owned(obj, &HEADING_KEYS)
                .map(|(_, h)| h)
                .unwrap_or_else(|| format!("#{}", i + 1));
            let (body_key, body) = first_str_owned(obj, &BODY_KEYS).unwrap_or(("", String::new()));
            let heading_key = first_str_owned(obj, &HEADING_KEYS).map(|(k, _)| k).unwrap_or("");
            let meta = obj
                .iter()
                .filter(|(k, _)| k.as_str() != body_key && k.as_str() != heading_key)
                .map(|(k, v)| (k.clone(), scalar_text(v).unwrap_or_else(|| plain_text(v))))
                .collect();
            Some(Card {
                heading,
                body_html: format_text(&body),
                meta,
            })
        })
        .collect();
    if cards.is_empty() {
        return RenderModel::not_found(title);
    }
    RenderModel::Cards {
        title: title.to_string(),
        cards,
    }
}

fn first_str_owned(obj: &Map<String, Value>, keys: &[&'static str]) -> Option<(&'static str, String)> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(scalar_text).map(|s| (*k, s)))
}

fn table_from_object(title: String, value: &Value) -> RenderModel {
    let Some(obj) = value.as_object().filter(|o| !o.is_empty()) else {
        return RenderModel::not_found(title);
    };
    RenderModel::Table {
        title,
        columns: vec!["Alan".to_string(), "Değer".to_string()],
        rows: obj
            .iter()
            .map(|(k, v)| vec![k.clone(), scalar_text(v).unwrap_or_else(|| plain_text(v))])
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_questions_from_array() {
        let payload = json!({
            "subject": "matematik",
            "topic": "türev",
            "questions": [{
                "question_text": "f(x)=x^2 ise f'(2)?",
                "options": ["A) 2", "B) 4"],
                "correct_answer": "B",
                "explanation": "**2x** türevi"
            }]
        });
        match questions(&payload) {
            RenderModel::Questions { title, questions } => {
                assert_eq!(title, "Sorular: matematik / türev");
                assert_eq!(questions.len(), 1);
                assert_eq!(questions[0].answer.as_deref(), Some("B"));
                assert_eq!(questions[0].options.len(), 2);
                assert_eq!(
                    questions[0].explanation_html.as_deref(),
                    Some("<strong>2x</strong> türevi")
                );
            }
            other => panic!("unexpected model {other:?}"),
        }
    }

    #[test]
    fn test_questions_from_fenced_json_text() {
        let payload = json!({
            "questions": "```json\n[{\"question\": \"Soru?\", \"options\": {\"A\": \"x\", \"B\": \"y\"}}]\n```"
        });
        match questions(&payload) {
            RenderModel::Questions { questions, .. } => {
                assert_eq!(questions[0].options, vec!["A) x", "B) y"]);
            }
            other => panic!("unexpected model {other:?}"),
        }
    }

    #[test]
    fn test_questions_plain_text_falls_back_to_text() {
        let model = questions(&json!({"questions": "1. Soru metni"}));
        assert!(matches!(model, RenderModel::Text { .. }));
    }

    #[test]
    fn test_malformed_payloads_render_not_found() {
        assert!(matches!(questions(&json!(42)), RenderModel::NotFound { .. }));
        assert!(matches!(search_results(&json!({"results": "x"})), RenderModel::NotFound { .. }));
        assert!(matches!(analysis(&json!([])), RenderModel::NotFound { .. }));
        assert!(matches!(study_plan(&json!(null)), RenderModel::NotFound { .. }));
        assert!(matches!(task_result("Özet", &json!({"result": null})), RenderModel::NotFound { .. }));
    }

    #[test]
    fn test_search_results_table() {
        let payload = json!({
            "query": "türev",
            "results": [{"title": "Limit", "topic": "Türev", "relevance_score": 0.876, "source_type": "curriculum", "content": "..." }]
        });
        match search_results(&payload) {
            RenderModel::Table { columns, rows, .. } => {
                assert_eq!(columns.len(), 5);
                assert_eq!(rows[0][0], "Limit");
                assert_eq!(rows[0][2], "0.88");
            }
            other => panic!("unexpected model {other:?}"),
        }
    }

    #[test]
    fn test_study_plan_text() {
        let payload = json!({"study_plan": "Hafta 1: *limit*", "target_exam": "TYT", "duration_weeks": 12, "daily_hours": 6});
        match study_plan(&payload) {
            RenderModel::Text { title, html } => {
                assert_eq!(title, "Çalışma Planı (TYT, 12 hafta, günde 6 saat)");
                assert_eq!(html, "Hafta 1: <em>limit</em>");
            }
            other => panic!("unexpected model {other:?}"),
        }
    }

    #[test]
    fn test_study_plan_structured_weeks() {
        let payload = json!({"study_plan": {"weekly_schedule": [{"week": "1", "content": "Limit"}, {"week": "2", "content": "Türev"}]}});
        match study_plan(&payload) {
            RenderModel::Cards { cards, .. } => {
                assert_eq!(cards.len(), 2);
                assert_eq!(cards[1].heading, "2");
                assert_eq!(cards[1].body_html, "Türev");
            }
            other => panic!("unexpected model {other:?}"),
        }
    }

    #[test]
    fn test_task_result_shapes() {
        assert!(matches!(
            task_result("Kavramlar", &json!({"result": ["limit", "türev"]})),
            RenderModel::List { .. }
        ));
        assert!(matches!(
            task_result("Kartlar", &json!({"result": [{"front": "a", "back": "b"}]})),
            RenderModel::Cards { .. }
        ));
        assert!(matches!(
            task_result("Kelime Bulutu", &json!({"result": "outputs/wordcloud.png"})),
            RenderModel::Document { .. }
        ));
        assert!(matches!(
            task_result("Özet", &json!({"result": "Kısa özet"})),
            RenderModel::Text { .. }
        ));
    }

    #[test]
    fn test_validation_card() {
        let payload = json!({"success": true, "is_valid": false, "confidence": 0.42, "validation": "Şüpheli", "issues": ["tarih yanlış"]});
        match validation(&payload) {
            RenderModel::Cards { cards, .. } => {
                assert!(cards[0].meta.contains(&("Güven".to_string(), "%42".to_string())));
                assert!(cards[0].body_html.contains("<li>tarih yanlış</li>"));
            }
            other => panic!("unexpected model {other:?}"),
        }
    }

    #[test]
    fn test_plain_text_of_list() {
        assert_eq!(plain_text(&json!(["a", "b"])), "- a\n- b");
    }
}
