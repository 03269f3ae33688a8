//! 输入提取
//!
//! 每个字段一个 FieldSpec：从 InputSource 取原始字符串，按类型校验并转为 JSON 值；
//! 缺省时按 Fallback 取默认值（固定值或档案中的值），必填字段缺失则返回 ValidationError。

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::core::{ControllerError, ExamType, Profile};

/// 表单输入来源（界面上的输入框、命令行参数等）
pub trait InputSource: Send + Sync {
    fn value(&self, field: &str) -> Option<String>;
}

/// 简单的键值表单
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormInputs {
    fields: BTreeMap<String, String>,
}

impl FormInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        self.fields.insert(field.to_string(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.fields.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormInputs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl InputSource for FormInputs {
    fn value(&self, field: &str) -> Option<String> {
        self.fields.get(field).cloned()
    }
}

/// 字段类型
#[derive(Clone, Debug)]
pub enum FieldKind {
    Text,
    /// 闭区间整数
    Integer { min: u64, max: u64 },
    Flag,
    /// 固定选项（大小写不敏感，输出规范写法）
    Choice(&'static [&'static str]),
    Exam,
}

/// 输入为空时的取值方式
#[derive(Clone, Debug)]
pub enum Fallback {
    Required,
    Value(Value),
    ProfileTargetExam,
    ProfileDailyHours,
}

#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub fallback: Fallback,
}

impl FieldSpec {
    pub fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            fallback: Fallback::Required,
        }
    }

    pub fn optional(name: &'static str, kind: FieldKind, fallback: Fallback) -> Self {
        Self { name, kind, fallback }
    }

    pub fn is_required(&self) -> bool {
        matches!(self.fallback, Fallback::Required)
    }

    pub fn extract(&self, source: &dyn InputSource, profile: &Profile) -> Result<Value, ControllerError> {
        let raw = source
            .value(self.name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        match raw {
            Some(raw) => self.parse(&raw),
            None => match &self.fallback {
                Fallback::Required => Err(ControllerError::validation(self.name, "zorunlu alan boş")),
                Fallback::Value(v) => Ok(v.clone()),
                Fallback::ProfileTargetExam => Ok(Value::from(profile.target_exam.as_str())),
                Fallback::ProfileDailyHours => Ok(Value::from(profile.daily_hours.get())),
            },
        }
    }

    fn parse(&self, raw: &str) -> Result<Value, ControllerError> {
        match &self.kind {
            FieldKind::Text => Ok(Value::from(raw)),
            FieldKind::Integer { min, max } => {
                let n: u64 = raw
                    .parse()
                    .map_err(|_| ControllerError::validation(self.name, format!("'{raw}' bir tam sayı değil")))?;
                if n < *min || n > *max {
                    return Err(ControllerError::validation(
                        self.name,
                        format!("{min} ile {max} arasında olmalı"),
                    ));
                }
                Ok(Value::from(n))
            }
            FieldKind::Flag => match raw.to_lowercase().as_str() {
                "true" | "1" | "evet" | "on" | "yes" => Ok(Value::Bool(true)),
                "false" | "0" | "hayır" | "hayir" | "off" | "no" => Ok(Value::Bool(false)),
                _ => Err(ControllerError::validation(self.name, format!("'{raw}' evet/hayır değil"))),
            },
            FieldKind::Choice(options) => {
                let lowered = raw.to_lowercase();
                options
                    .iter()
                    .find(|o| o.to_lowercase() == lowered)
                    .map(|o| Value::from(*o))
                    .ok_or_else(|| {
                        ControllerError::validation(self.name, format!("seçenekler: {}", options.join(", ")))
                    })
            }
            FieldKind::Exam => raw
                .parse::<ExamType>()
                .map(|e| Value::from(e.as_str()))
                .map_err(|e| ControllerError::validation(self.name, e)),
        }
    }
}

/// 已校验的输入；getter 在字段缺失时返回零值（提取阶段已保证存在）
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Inputs(Map<String, Value>);

impl Inputs {
    pub fn insert(&mut self, field: &str, value: Value) {
        self.0.insert(field.to_string(), value);
    }

    pub fn str(&self, field: &str) -> &str {
        self.0.get(field).and_then(Value::as_str).unwrap_or("")
    }

    pub fn u64(&self, field: &str) -> u64 {
        self.0.get(field).and_then(Value::as_u64).unwrap_or(0)
    }

    pub fn bool(&self, field: &str) -> bool {
        self.0.get(field).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn exam(&self, field: &str) -> ExamType {
        self.str(field).parse().unwrap_or_default()
    }
}

/// 按顺序运行所有提取器；第一个失败的字段即返回
pub fn extract_all(
    fields: &[FieldSpec],
    source: &dyn InputSource,
    profile: &Profile,
) -> Result<Inputs, ControllerError> {
    let mut inputs = Inputs::default();
    for field in fields {
        inputs.insert(field.name, field.extract(source, profile)?);
    }
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_field_missing() {
        let spec = FieldSpec::required("topic", FieldKind::Text);
        let err = spec.extract(&FormInputs::new().with("topic", "   "), &Profile::default()).unwrap_err();
        assert_eq!(err, ControllerError::validation("topic", "zorunlu alan boş"));
    }

    #[test]
    fn test_integer_bounds() {
        let spec = FieldSpec::required("count", FieldKind::Integer { min: 1, max: 20 });
        let profile = Profile::default();
        assert_eq!(spec.extract(&FormInputs::new().with("count", "3"), &profile).unwrap(), json!(3));
        assert!(spec.extract(&FormInputs::new().with("count", "0"), &profile).is_err());
        assert!(spec.extract(&FormInputs::new().with("count", "-2"), &profile).is_err());
        assert!(spec.extract(&FormInputs::new().with("count", "üç"), &profile).is_err());
    }

    #[test]
    fn test_choice_is_canonicalized() {
        let spec = FieldSpec::required("difficulty", FieldKind::Choice(&["easy", "medium", "hard"]));
        let value = spec
            .extract(&FormInputs::new().with("difficulty", "MEDIUM"), &Profile::default())
            .unwrap();
        assert_eq!(value, json!("medium"));
    }

    #[test]
    fn test_profile_fallbacks() {
        let profile = Profile {
            target_exam: ExamType::AYT,
            ..Profile::default()
        };
        let exam = FieldSpec::optional("exam_type", FieldKind::Exam, Fallback::ProfileTargetExam);
        let hours = FieldSpec::optional(
            "daily_hours",
            FieldKind::Integer { min: 1, max: 24 },
            Fallback::ProfileDailyHours,
        );
        assert_eq!(exam.extract(&FormInputs::new(), &profile).unwrap(), json!("AYT"));
        assert_eq!(hours.extract(&FormInputs::new(), &profile).unwrap(), json!(6));
    }

    #[test]
    fn test_flag_parsing() {
        let spec = FieldSpec::optional("include_suggestions", FieldKind::Flag, Fallback::Value(json!(true)));
        let profile = Profile::default();
        assert_eq!(spec.extract(&FormInputs::new(), &profile).unwrap(), json!(true));
        assert_eq!(
            spec.extract(&FormInputs::new().with("include_suggestions", "hayır"), &profile).unwrap(),
            json!(false)
        );
    }

    #[test]
    fn test_extract_all_stops_at_first_failure() {
        let fields = vec![
            FieldSpec::required("a", FieldKind::Text),
            FieldSpec::required("b", FieldKind::Text),
        ];
        let err = extract_all(&fields, &FormInputs::new(), &Profile::default()).unwrap_err();
        assert!(matches!(err, ControllerError::Validation { field, .. } if field == "a"));
    }
}
