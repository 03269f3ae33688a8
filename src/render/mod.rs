//! 响应格式化层：渲染模型、文本标记规则、各操作的载荷整形函数

pub mod format;
pub mod markup;
pub mod model;

pub use markup::{escape_html, format_text, Markup, Rewrite, TextRule};
pub use model::{user_message, Card, QuestionCard, RenderModel};
