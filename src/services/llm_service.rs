//! LLM 服务 - 业务能力层
//!
//! 只负责"把一组对话发给模型并拿回文本"，不关心分块和流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ServiceError;
use crate::models::{GenerationRequest, Role};

/// 外部文本生成调用
///
/// 输入有序的对话和系统指令，返回模型的文本响应。
/// 流程层只依赖这个 trait，测试时可以换成脚本化的实现。
pub trait Generator: Send + Sync {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<String, ServiceError>>;
}

/// LLM 服务
///
/// 职责：
/// - 把 `GenerationRequest` 转成 chat completion 请求
/// - 不出现 Chunk / PageMap
/// - 不关心调用节奏和重试
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    max_tokens: u32,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            max_tokens: config.llm_max_tokens,
        }
    }

    /// 构建消息列表：系统消息在前，随后按顺序排列的用户 / 助手消息
    fn build_messages(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<ChatCompletionRequestMessage>, ServiceError> {
        let mut messages = Vec::with_capacity(request.turns.len() + 1);

        if !request.system.is_empty() {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system.as_str())
                .build()
                .map_err(|e| self.build_failed(e))?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        for turn in &request.turns {
            let message = match turn.role {
                Role::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(turn.content.as_str())
                        .build()
                        .map_err(|e| self.build_failed(e))?,
                ),
                Role::Assistant => ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(turn.content.as_str())
                        .build()
                        .map_err(|e| self.build_failed(e))?,
                ),
            };
            messages.push(message);
        }

        Ok(messages)
    }

    /// 发送一次请求
    ///
    /// # 返回
    /// 返回去掉首尾空白的响应内容
    pub async fn send(&self, request: &GenerationRequest) -> Result<String, ServiceError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!(
            "对话轮数: {}, 总长度: {} 字符",
            request.turns.len(),
            request.turns.iter().map(|t| t.content.len()).sum::<usize>()
        );

        let messages = self.build_messages(request)?;

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| self.build_failed(e))?;

        // 调用 API
        let response = self.client.chat().create(chat_request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            ServiceError::api_call_failed(&self.model_name, e)
        })?;

        debug!("LLM API 调用成功");

        let choice = response
            .choices
            .first()
            .ok_or_else(|| ServiceError::EmptyResponse {
                model: self.model_name.clone(),
            })?;

        let content = choice
            .message
            .content
            .clone()
            .ok_or_else(|| ServiceError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }

    fn build_failed(&self, source: impl std::error::Error + Send + Sync + 'static) -> ServiceError {
        ServiceError::RequestBuildFailed {
            model: self.model_name.clone(),
            source: Box::new(source),
        }
    }
}

impl Generator for LlmService {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<String, ServiceError>> {
        Box::pin(self.send(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConversationTurn;

    /// 创建测试用的 LlmService
    fn create_test_service() -> LlmService {
        let config = Config {
            llm_api_key: "test-key".to_string(),
            llm_api_base_url: "http://localhost:9/v1".to_string(),
            llm_model_name: "test-model".to_string(),
            ..Default::default()
        };
        LlmService::new(&config)
    }

    #[test]
    fn test_build_messages_keeps_turn_order() {
        let service = create_test_service();
        let request = GenerationRequest {
            system: "Eres un asistente".to_string(),
            turns: vec![
                ConversationTurn::user("contenido"),
                ConversationTurn::assistant("respuesta previa"),
                ConversationTurn::user("pregunta"),
            ],
        };

        let messages = service.build_messages(&request).unwrap();

        assert_eq!(messages.len(), 4);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(messages[2], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(messages[3], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_empty_system_is_omitted() {
        let service = create_test_service();
        let request = GenerationRequest {
            system: String::new(),
            turns: vec![ConversationTurn::user("hola")],
        };

        let messages = service.build_messages(&request).unwrap();
        assert_eq!(messages.len(), 1);
    }

    /// 测试真实 API 调用
    ///
    /// 运行方式：
    /// ```bash
    /// LLM_API_KEY=... cargo test test_send_live -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_send_live() {
        let _ = tracing_subscriber::fmt::try_init();

        let config = Config::from_env().expect("环境变量配置有误");
        let service = LlmService::new(&config);
        let request = GenerationRequest {
            system: "Responde en una sola línea.".to_string(),
            turns: vec![ConversationTurn::user(
                "Escribe exactamente: Ejercicio 1 (Página 1): prueba",
            )],
        };

        let response = service.send(&request).await.expect("LLM 调用失败");
        println!("LLM 响应: {}", response);
        assert!(!response.is_empty());
    }
}
