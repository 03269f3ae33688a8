//! 会话数据模型：学生档案、当前 artifact、派生结果段落、课程缓存
//!
//! SessionState 是每个客户端会话唯一的状态值，由 SessionStore 持有并串行修改。

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::memory::ConversationHistory;

/// 目标考试类型
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ExamType {
    #[default]
    TYT,
    AYT,
    YKS,
    LGS,
}

impl ExamType {
    pub const ALL: [ExamType; 4] = [ExamType::TYT, ExamType::AYT, ExamType::YKS, ExamType::LGS];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExamType::TYT => "TYT",
            ExamType::AYT => "AYT",
            ExamType::YKS => "YKS",
            ExamType::LGS => "LGS",
        }
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        ExamType::ALL
            .into_iter()
            .find(|e| e.as_str() == upper)
            .ok_or_else(|| format!("unknown exam type '{}'", s.trim()))
    }
}

/// 学生档案；每次修改后立即整体写入持久化存储
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default)]
    pub target_exam: ExamType,
    #[serde(default = "default_daily_hours")]
    pub daily_hours: NonZeroU32,
    #[serde(default)]
    pub weak_subjects: BTreeSet<String>,
    #[serde(default)]
    pub strong_subjects: BTreeSet<String>,
}

fn default_daily_hours() -> NonZeroU32 {
    NonZeroU32::new(6).unwrap_or(NonZeroU32::MIN)
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            student_id: None,
            target_exam: ExamType::default(),
            daily_hours: default_daily_hours(),
            weak_subjects: BTreeSet::new(),
            strong_subjects: BTreeSet::new(),
        }
    }
}

/// 档案的部分更新：仅覆盖 Some 字段
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ProfilePatch {
    pub student_id: Option<String>,
    pub target_exam: Option<ExamType>,
    pub daily_hours: Option<NonZeroU32>,
    pub weak_subjects: Option<BTreeSet<String>>,
    pub strong_subjects: Option<BTreeSet<String>>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Profile {
    /// 将 patch 合并进当前档案，返回合并后的新值
    pub fn merged(&self, patch: &ProfilePatch) -> Profile {
        let mut next = self.clone();
        if let Some(id) = &patch.student_id {
            next.student_id = Some(id.clone());
        }
        if let Some(exam) = patch.target_exam {
            next.target_exam = exam;
        }
        if let Some(hours) = patch.daily_hours {
            next.daily_hours = hours;
        }
        if let Some(weak) = &patch.weak_subjects {
            next.weak_subjects = weak.clone();
        }
        if let Some(strong) = &patch.strong_subjects {
            next.strong_subjects = strong.clone();
        }
        next
    }
}

/// 流水线根步骤产出的单值 artifact（如转写文本）
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// 产出该值的步骤名
    pub step: String,
    pub value: String,
}

impl Artifact {
    pub fn new(step: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            value: value.into(),
        }
    }
}

/// 已物化的派生结果（摘要、思维导图等），供导出步骤使用
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResultSection {
    pub step: String,
    pub title: String,
    pub body: String,
    pub produced_at: DateTime<Utc>,
}

/// 科目名 -> 有序主题列表
pub type CurriculumTree = BTreeMap<String, Vec<String>>;

/// 会话状态单例
#[derive(Clone, Debug)]
pub struct SessionState {
    pub session_id: String,
    pub profile: Profile,
    pub history: ConversationHistory,
    /// 仅填充一次，之后只读；会话重置时清空
    pub curriculum: Option<CurriculumTree>,
    /// 最后写入者胜出
    pub current_artifact: Option<Artifact>,
    pub sections: Vec<ResultSection>,
    pub expanded_subjects: BTreeSet<String>,
}

impl SessionState {
    pub fn new(profile: Profile) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            profile,
            history: ConversationHistory::new(),
            curriculum: None,
            current_artifact: None,
            sections: Vec::new(),
            expanded_subjects: BTreeSet::new(),
        }
    }

    /// 同一步骤的旧段落被替换，其余保持插入顺序
    pub fn put_section(&mut self, section: ResultSection) {
        match self.sections.iter_mut().find(|s| s.step == section.step) {
            Some(existing) => *existing = section,
            None => self.sections.push(section),
        }
    }
}
