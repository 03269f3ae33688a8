//! 事件处理
//!
//! 把命令行输入解析为 UiEvent 并发送到主控循环。
//! 参数按空白切分，支持双引号包裹含空格的值（`topic="Mol Kavramı"`）。

use std::collections::BTreeSet;
use std::num::NonZeroU32;

use tokio::sync::mpsc;

use crate::core::{ProfilePatch, UiEvent};
use crate::operations::FormInputs;
use crate::pipeline::StepInput;

pub const HELP: &str = "\
Komutlar:
  op <işlem> alan=değer ...     işlem çalıştır (örn. op generate-questions subject=matematik topic=türev)
  describe <işlem>               işlem alanlarını göster
  fetch <url>                    videoyu indir ve transkript çıkar
  step <adım> [girdi]            türetilmiş adımı çalıştır (summarize, quiz, export ...)
  say <mesaj>                    asistana mesaj gönder
  profile [alan=değer ...]       profili göster / güncelle (target_exam, daily_hours, weak, strong, student_id)
  subjects                       müfredatı yükle
  toggle <ders>                  dersi aç / kapat
  topic <ders> <konu>            konuyu soru formuna aktar
  list                           işlem ve adımları listele
  reset                          oturumu sıfırla
  quit                           çıkış";

/// 按空白切分，双引号内的空白保留；引号本身被去掉
pub fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;
    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}

fn key_values(args: &[String]) -> Result<Vec<(String, String)>, String> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| format!("'{arg}' alan=değer biçiminde değil"))
        })
        .collect()
}

fn subject_set(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `profile` 命令参数 -> ProfilePatch
pub fn parse_profile_patch(args: &[String]) -> Result<ProfilePatch, String> {
    let mut patch = ProfilePatch::default();
    for (key, value) in key_values(args)? {
        match key.as_str() {
            "student_id" => patch.student_id = Some(value),
            "target_exam" | "exam" => patch.target_exam = Some(value.parse()?),
            "daily_hours" | "hours" => {
                let hours = value
                    .parse::<u32>()
                    .ok()
                    .and_then(NonZeroU32::new)
                    .filter(|h| h.get() <= 24)
                    .ok_or_else(|| format!("daily_hours 1 ile 24 arasında olmalı: '{value}'"))?;
                patch.daily_hours = Some(hours);
            }
            "weak" | "weak_subjects" => patch.weak_subjects = Some(subject_set(&value)),
            "strong" | "strong_subjects" => patch.strong_subjects = Some(subject_set(&value)),
            other => return Err(format!("bilinmeyen profil alanı: {other}")),
        }
    }
    Ok(patch)
}

/// 解析一行命令；空行返回 Ok(None)，用法错误返回 Err(提示文本)
pub fn parse_command(line: &str) -> Result<Option<UiEvent>, String> {
    let args = split_args(line);
    let Some((command, rest)) = args.split_first() else {
        return Ok(None);
    };
    let joined = || rest.join(" ");
    let event = match command.as_str() {
        "op" => {
            let (operation, fields) = rest.split_first().ok_or("kullanım: op <işlem> alan=değer ...")?;
            let inputs: FormInputs = key_values(fields)?.into_iter().collect();
            UiEvent::Execute {
                operation: operation.clone(),
                inputs,
            }
        }
        "describe" => UiEvent::Describe(rest.first().ok_or("kullanım: describe <işlem>")?.clone()),
        "fetch" => UiEvent::Acquire {
            url: rest.first().ok_or("kullanım: fetch <url>")?.clone(),
        },
        "step" => {
            let (step, input) = rest.split_first().ok_or("kullanım: step <adım> [girdi]")?;
            UiEvent::RunStep {
                step: step.clone(),
                input: StepInput::text(input.join(" ")),
            }
        }
        "say" => UiEvent::SendMessage(joined()),
        "profile" => UiEvent::UpdateProfile(parse_profile_patch(rest)?),
        "subjects" => UiEvent::LoadCurriculum,
        "toggle" => {
            if rest.is_empty() {
                return Err("kullanım: toggle <ders>".to_string());
            }
            UiEvent::ToggleSubject(joined())
        }
        "topic" => match rest {
            [subject, topic @ ..] if !topic.is_empty() => UiEvent::SelectTopic {
                subject: subject.clone(),
                topic: topic.join(" "),
            },
            _ => return Err("kullanım: topic <ders> <konu>".to_string()),
        },
        "list" | "help" => UiEvent::Catalog,
        "reset" => UiEvent::Reset,
        "quit" | "exit" => UiEvent::Quit,
        other => return Err(format!("bilinmeyen komut: {other}\n{HELP}")),
    };
    Ok(Some(event))
}

/// 事件处理器：持有发往主控循环的发送端
pub struct EventHandler {
    tx: mpsc::Sender<UiEvent>,
}

impl EventHandler {
    pub fn new(tx: mpsc::Sender<UiEvent>) -> Self {
        Self { tx }
    }

    /// 解析并发送一行输入；返回 Ok(false) 表示应停止读取
    pub async fn submit(&self, line: &str) -> Result<bool, String> {
        match parse_command(line)? {
            None => Ok(true),
            Some(event) => {
                let quit = event == UiEvent::Quit;
                self.tx
                    .send(event)
                    .await
                    .map_err(|_| "kontrolcü kapandı".to_string())?;
                Ok(!quit)
            }
        }
    }
}
