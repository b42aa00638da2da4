//! 资料导入服务
//!
//! 负责从资料到入库题目的完整流程：
//! 校验资料 → 调用生成服务 → 宽容解析 → 逐条严格校验 → 单事务批量入库

use std::str::FromStr;
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::models::{NewQuestion, QuestionType};
use crate::services::generation::QuestionGenerator;
use crate::store::Store;

/// 资料最少字数（不足则不发起外部调用）
const MIN_MATERIAL_CHARS: usize = 100;
/// 来源摘录的最大字数
const EXCERPT_MAX_CHARS: usize = 500;

/// 导入结果
#[derive(Debug)]
pub struct IngestionReport {
    /// 新建题目的ID，按入库顺序
    pub created_ids: Vec<i64>,
    /// 因不合格被跳过的生成条目数
    pub skipped: usize,
}

impl IngestionReport {
    /// 成功入库的题目数量
    pub fn created(&self) -> usize {
        self.created_ids.len()
    }
}

/// 资料导入服务
#[derive(Clone)]
pub struct IngestionService {
    store: Store,
    generator: Arc<dyn QuestionGenerator>,
}

impl IngestionService {
    pub fn new(store: Store, generator: Arc<dyn QuestionGenerator>) -> Self {
        Self { store, generator }
    }

    /// 从资料生成题目并入库
    ///
    /// # 参数
    /// - `material`: 资料内容
    /// - `count`: 期望生成的题目数量
    /// - `creator_id`: 题目创建者（由外部身份系统提供）
    ///
    /// # 返回
    /// 返回新建题目ID与跳过条目数；生成失败或响应无法解析时整体报错，
    /// 不产生任何部分写入。
    pub async fn generate_and_store(
        &self,
        material: &str,
        count: usize,
        creator_id: i64,
    ) -> Result<IngestionReport> {
        let material = material.trim();
        if material.chars().count() < MIN_MATERIAL_CHARS {
            return Err(AppError::validation(format!(
                "资料内容过短，无法生成题目（不少于 {} 字）",
                MIN_MATERIAL_CHARS
            )));
        }
        if count == 0 {
            return Err(AppError::validation("生成题目数量必须大于 0"));
        }

        // 外部生成调用在任何写事务之外完成，慢调用不会占用写锁
        let raw = self.generator.generate(material, count).await?;
        let items = parse_generated_items(&raw)?;

        let excerpt = source_excerpt(material);
        let mut new_questions = Vec::new();
        let mut skipped = 0usize;

        for (index, item) in items.into_iter().enumerate() {
            match validate_item(item) {
                Ok(generated) => new_questions.push(NewQuestion {
                    question_type: generated.question_type,
                    content: generated.content,
                    options: generated.options,
                    correct_answer: generated.correct_answer,
                    source_material: Some(excerpt.clone()),
                    creator_id,
                }),
                Err(reason) => {
                    warn!("第 {} 条生成结果不合格，跳过: {}", index + 1, reason);
                    skipped += 1;
                }
            }
        }

        // 通过校验的条目在同一事务内入库，整体提交或整体失败
        let created_ids = self.store.insert_questions(&new_questions)?;

        info!(
            "✓ 成功生成 {} 道题目，跳过 {} 条不合格结果",
            created_ids.len(),
            skipped
        );

        Ok(IngestionReport {
            created_ids,
            skipped,
        })
    }
}

/// 通过严格校验的生成条目
#[derive(Debug)]
struct GeneratedQuestion {
    question_type: QuestionType,
    content: String,
    options: Vec<String>,
    correct_answer: String,
}

/// 生成服务返回的原始条目（字段缺失时取默认值，由校验统一判定）
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawGeneratedItem {
    #[serde(rename = "type")]
    kind: String,
    content: String,
    options: Vec<String>,
    correct_answer: String,
}

/// 从生成服务的原始文本中解析出条目列表
///
/// 容忍 Markdown 代码块与 JSON 前后夹带的说明文字；
/// 无法还原成 questions 列表时以生成错误上报。
fn parse_generated_items(raw: &str) -> Result<Vec<Value>> {
    let payload = extract_json_payload(raw)?;
    let questions = payload
        .get("questions")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::generation("返回内容缺少 questions 列表"))?;
    Ok(questions.clone())
}

fn extract_json_payload(raw: &str) -> Result<Value> {
    let text = strip_code_fence(raw);
    let start = text.find('{');
    let end = text.rfind('}');
    let candidate = match (start, end) {
        (Some(s), Some(e)) if s < e => &text[s..=e],
        _ => return Err(AppError::generation("返回内容中找不到 JSON 对象")),
    };
    serde_json::from_str(candidate)
        .map_err(|e| AppError::generation(format!("返回内容无法解析为 JSON: {}", e)))
}

fn strip_code_fence(raw: &str) -> String {
    let fence = Regex::new(r"(?s)```[a-zA-Z0-9]*\s*(.*?)\s*```").expect("内置正则无效");
    match fence.captures(raw) {
        Some(caps) => caps[1].to_string(),
        None => raw.to_string(),
    }
}

/// 逐条严格校验生成条目
///
/// 返回 Err 时附带具体原因，调用方计入跳过统计。
fn validate_item(value: Value) -> std::result::Result<GeneratedQuestion, String> {
    let raw: RawGeneratedItem =
        serde_json::from_value(value).map_err(|e| format!("字段结构不合法: {}", e))?;

    let question_type = QuestionType::from_str(raw.kind.trim())
        .map_err(|_| format!("未知题目类型: {}", raw.kind))?;

    let content = raw.content.trim().to_string();
    if content.is_empty() {
        return Err("题干内容为空".to_string());
    }

    let correct_answer = raw.correct_answer.trim().to_string();
    if correct_answer.is_empty() {
        return Err("正确答案为空".to_string());
    }

    let options: Vec<String> = raw
        .options
        .into_iter()
        .map(|opt| opt.trim().to_string())
        .filter(|opt| !opt.is_empty())
        .collect();

    if question_type.is_choice() {
        if options.len() < 2 {
            return Err(format!("选择题选项不足（{} 个）", options.len()));
        }
    } else if !options.is_empty() {
        return Err("填空题不应包含选项".to_string());
    }

    Ok(GeneratedQuestion {
        question_type,
        content,
        options,
        correct_answer,
    })
}

/// 截取来源资料摘录（最长 500 字，超出加截断标记）
fn source_excerpt(material: &str) -> String {
    if material.chars().count() > EXCERPT_MAX_CHARS {
        material.chars().take(EXCERPT_MAX_CHARS).collect::<String>() + "..."
    } else {
        material.to_string()
    }
}
