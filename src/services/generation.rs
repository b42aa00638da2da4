//! 题目生成服务 - 外部协作方边界
//!
//! `QuestionGenerator` 是注入到导入流程的能力接口，
//! 测试中用确定性替身代替真实调用。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 DeepSeek, Azure, Doubao 等）

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, Result};

/// 题目生成能力
///
/// 输入资料与期望数量，返回生成服务的原始文本；
/// 解析与校验由导入流程负责。
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(&self, material: &str, count: usize) -> Result<String>;
}

/// 基于 OpenAI 兼容 API 的生成实现
pub struct LlmGenerator {
    client: Client<OpenAIConfig>,
    model_name: String,
    request_timeout: Duration,
}

impl LlmGenerator {
    /// 创建新的生成客户端
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            request_timeout: Duration::from_secs(config.llm_timeout_secs),
        }
    }
}

#[async_trait]
impl QuestionGenerator for LlmGenerator {
    async fn generate(&self, material: &str, count: usize) -> Result<String> {
        let prompt = build_generation_prompt(material, count);

        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("提示词长度: {} 字符", prompt.chars().count());

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.as_str())
            .build()
            .map_err(|e| AppError::generation(format!("构造请求失败: {}", e)))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .temperature(0.7)
            .build()
            .map_err(|e| AppError::generation(format!("构造请求失败: {}", e)))?;

        // 超时或失败直接上报，不在本层重试
        let response = timeout(self.request_timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                warn!("LLM API 调用超时（{} 秒）", self.request_timeout.as_secs());
                AppError::generation(format!(
                    "LLM API 调用超时（{} 秒）",
                    self.request_timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                warn!("LLM API 调用失败: {}", e);
                AppError::generation(format!("LLM API 调用失败: {}", e))
            })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| AppError::generation("LLM 返回内容为空"))?;

        Ok(content.trim().to_string())
    }
}

/// 构建生成提示词
///
/// 约定三种题型比例约 4:3:3，并要求严格的 JSON 输出格式。
pub(crate) fn build_generation_prompt(material: &str, count: usize) -> String {
    format!(
        r#"你是一个专业的题库生成助手，需要根据以下资料生成{count}道复习题，包含单选、多选、填空三种类型（比例约4:3:3）。
资料内容：{material}
要求：
1. 题目必须基于资料内容，不能编造信息；
2. 单选/多选题选项需合理，干扰项不能明显错误；
3. 输出格式严格按照JSON，不允许任何额外文字（否则无法解析）：
{{
    "questions": [
        {{
            "type": "single_choice/multiple_choice/fill_blank",
            "content": "题干内容",
            "options": ["A. 选项1", "B. 选项2", "C. 选项3", "D. 选项4"],
            "correct_answer": "A"
        }}
    ]
}}
单选题 correct_answer 填字母，多选题填多个字母用逗号分隔（如"A,C"），填空题填具体答案且不要 options 键。"#
    )
}
