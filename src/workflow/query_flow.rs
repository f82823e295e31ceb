//! 分块查询流程 - 流程层
//!
//! 核心职责：把一次用户查询按分块依次发给外部服务，累积响应和进度
//!
//! 流程顺序（每块）：
//! 1. 等待调用间隔（第一块除外）
//! 2. 构建对话：内容消息 + 用户查询（滚动对话模式在前面附上历史）
//! 3. 调用外部服务
//! 4. 成功：按页码范围标注后追加到合并响应；失败：中止剩余分块

use std::sync::Arc;

use phf::phf_map;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::QueryError;
use crate::models::{ChunkPlan, ConversationTurn, ExerciseRecord, GenerationRequest, ProgressState};
use crate::parsing::ExerciseExtractor;
use crate::services::chunk_builder::truncate_chars;
use crate::services::{FixedIntervalPacer, Generator, LlmService, Pacer};
use crate::utils::logging::{log_chunk_complete, log_chunk_start};
use crate::utils::truncate_text;
use crate::workflow::prompt::{chunk_message, whole_document_message, SYSTEM_INSTRUCTION};
use crate::workflow::query_ctx::QuerySession;

/// 失败分块没有页码范围时使用的名称
const WHOLE_DOCUMENT: &str = "全文";

/// 查询策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPolicy {
    /// 每块独立查询，块之间没有记忆
    Stateless,
    /// 每块都附上之前累积的对话历史
    Rolling,
    /// 整篇文档截断后一次查询
    OneShot,
    /// 每次查询只发送一个分块，多次查询之间轮换
    Rotating,
}

static QUERY_POLICY_NAMES: phf::Map<&'static str, QueryPolicy> = phf_map! {
    "stateless" => QueryPolicy::Stateless,
    "rolling" => QueryPolicy::Rolling,
    "one_shot" => QueryPolicy::OneShot,
    "oneshot" => QueryPolicy::OneShot,
    "rotating" => QueryPolicy::Rotating,
};

impl QueryPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        QUERY_POLICY_NAMES
            .get(name.trim().to_lowercase().as_str())
            .copied()
    }
}

/// 一个分块的原始响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkResponse {
    pub chunk_index: usize,
    /// 页码范围，一次性查询时为空
    pub page_range: String,
    pub text: String,
}

/// 一次查询的结果
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    pub progress: ProgressState,
    pub responses: Vec<ChunkResponse>,
}

impl QueryOutcome {
    /// 逐块抽取练习记录，每块一个列表
    pub fn extract(&self, extractor: &ExerciseExtractor, standard: &str) -> Vec<Vec<ExerciseRecord>> {
        self.responses
            .iter()
            .map(|response| extractor.extract(&response.text, standard))
            .collect()
    }
}

/// 一次外部调用要发送的内容
struct QueryUnit {
    chunk_index: usize,
    page_range: String,
    content: String,
}

/// 分块查询流程
///
/// - 按顺序逐块调用，不并发
/// - 不持有文档状态，状态全部在 `QuerySession` 中
/// - 失败即中止，不重试
pub struct QueryFlow {
    generator: Arc<dyn Generator>,
    pacer: Arc<dyn Pacer>,
    policy: QueryPolicy,
    max_chars: usize,
    verbose_logging: bool,
}

impl QueryFlow {
    /// 使用配置创建（真实 LLM + 固定间隔）
    pub fn new(config: &Config) -> Self {
        Self::with_parts(
            Arc::new(LlmService::new(config)),
            Arc::new(FixedIntervalPacer::new(config.pacing_interval())),
            config.query_policy,
            config.max_chars,
        )
        .verbose(config.verbose_logging)
    }

    /// 使用指定的生成器和节奏控制创建
    pub fn with_parts(
        generator: Arc<dyn Generator>,
        pacer: Arc<dyn Pacer>,
        policy: QueryPolicy,
        max_chars: usize,
    ) -> Self {
        Self {
            generator,
            pacer,
            policy,
            max_chars,
            verbose_logging: false,
        }
    }

    pub fn verbose(mut self, verbose_logging: bool) -> Self {
        self.verbose_logging = verbose_logging;
        self
    }

    /// 执行一次查询
    ///
    /// 任一分块失败时立即返回 `QueryError::ChunkFailed`，其中带有失败前已累积的进度
    pub async fn run(
        &self,
        session: &mut QuerySession,
        query: &str,
    ) -> Result<QueryOutcome, QueryError> {
        let units = self.plan_units(session);
        let total = units.len();
        let mut outcome = QueryOutcome {
            progress: ProgressState::new(total),
            responses: Vec::with_capacity(total),
        };

        if total == 0 {
            info!("{} 没有可查询的内容", session);
            return Ok(outcome);
        }

        info!("{} 🔍 开始查询，共 {} 次调用", session, total);

        for (position, unit) in units.into_iter().enumerate() {
            if position > 0 {
                self.pacer.wait().await;
            }

            log_chunk_start(position, total, &unit.page_range, unit.content.chars().count());

            let content_turn = ConversationTurn::user(unit.content);
            let query_turn = ConversationTurn::user(query);

            let mut turns = match self.policy {
                QueryPolicy::Rolling => session.history.clone(),
                _ => Vec::new(),
            };
            turns.push(content_turn.clone());
            turns.push(query_turn.clone());

            let request = GenerationRequest {
                system: SYSTEM_INSTRUCTION.to_string(),
                turns,
            };

            let text = match self.generator.generate(&request).await {
                Ok(text) => text,
                Err(source) => {
                    let page_range = if unit.page_range.is_empty() {
                        WHOLE_DOCUMENT.to_string()
                    } else {
                        unit.page_range
                    };
                    error!(
                        "{} ❌ 第 {} 块 (页 {}) 查询失败，中止剩余 {} 块: {}",
                        session,
                        unit.chunk_index + 1,
                        page_range,
                        total - position - 1,
                        source
                    );
                    return Err(QueryError::ChunkFailed {
                        chunk_index: unit.chunk_index,
                        page_range,
                        source,
                        progress: Box::new(outcome.progress),
                    });
                }
            };

            if self.verbose_logging {
                debug!("响应预览: {}", truncate_text(&text, 200));
            }

            outcome.progress.record_chunk(&unit.page_range, &text);
            log_chunk_complete(position, total, text.chars().count());

            if self.policy == QueryPolicy::Rolling {
                session.history.push(content_turn);
                session.history.push(query_turn);
                if !text.trim().is_empty() {
                    session.history.push(ConversationTurn::assistant(text.clone()));
                }
            }

            outcome.responses.push(ChunkResponse {
                chunk_index: unit.chunk_index,
                page_range: unit.page_range,
                text,
            });
        }

        if self.policy == QueryPolicy::Rotating {
            let chunk_count = session.plan.chunks().len();
            if chunk_count > 0 {
                session.page_group_cursor = (session.page_group_cursor + 1) % chunk_count;
            }
        }

        Ok(outcome)
    }

    /// 根据策略和分块计划决定本次要发送的内容
    fn plan_units(&self, session: &QuerySession) -> Vec<QueryUnit> {
        let whole_document = |text: &str| QueryUnit {
            chunk_index: 0,
            page_range: String::new(),
            content: whole_document_message(truncate_chars(text, self.max_chars)),
        };

        match (&session.plan, self.policy) {
            (ChunkPlan::RawText(text), _) => vec![whole_document(text)],
            (ChunkPlan::Paged(chunks), _) if chunks.is_empty() => Vec::new(),
            (ChunkPlan::Paged(_), QueryPolicy::OneShot) => vec![whole_document(&session.raw_text)],
            (ChunkPlan::Paged(chunks), QueryPolicy::Rotating) => {
                let chunk = &chunks[session.page_group_cursor % chunks.len()];
                vec![QueryUnit {
                    chunk_index: chunk.index,
                    page_range: chunk.page_range(),
                    content: chunk_message(chunk),
                }]
            }
            (ChunkPlan::Paged(chunks), QueryPolicy::Stateless | QueryPolicy::Rolling) => chunks
                .iter()
                .map(|chunk| QueryUnit {
                    chunk_index: chunk.index,
                    page_range: chunk.page_range(),
                    content: chunk_message(chunk),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use futures::future::BoxFuture;

    use super::*;
    use crate::error::ServiceError;
    use crate::models::Role;
    use crate::parsing::PageParser;
    use crate::services::{ChunkBuilder, NoPacing};

    /// 按顺序返回预设响应的生成器，同时记录收到的请求
    struct ScriptedGenerator {
        replies: Mutex<Vec<Result<String, ServiceError>>>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<Result<String, ServiceError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<GenerationRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Generator for ScriptedGenerator {
        fn generate<'a>(
            &'a self,
            request: &'a GenerationRequest,
        ) -> BoxFuture<'a, Result<String, ServiceError>> {
            self.requests.lock().unwrap().push(request.clone());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(String::new()));
            Box::pin(async move { reply })
        }
    }

    #[derive(Default)]
    struct CountingPacer {
        waits: AtomicUsize,
    }

    impl Pacer for CountingPacer {
        fn wait(&self) -> BoxFuture<'_, ()> {
            self.waits.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {})
        }
    }

    fn ok(text: &str) -> Result<String, ServiceError> {
        Ok(text.to_string())
    }

    fn session(pages: u32, per_chunk: usize) -> QuerySession {
        let text: String = (1..=pages)
            .map(|p| format!("[Pagina {}]\nEjercicio de la página {}\n", p, p))
            .collect();
        QuerySession::from_document(
            "libro.txt",
            text,
            &PageParser::default(),
            &ChunkBuilder::new(per_chunk, 50_000).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_stateless_two_chunks() {
        let generator = ScriptedGenerator::new(vec![
            ok("Ejercicio 1 (Página 2): a"),
            ok("Ejercicio 4 (Página 4): b"),
        ]);
        let pacer = Arc::new(CountingPacer::default());
        let flow = QueryFlow::with_parts(
            generator.clone(),
            pacer.clone(),
            QueryPolicy::Stateless,
            50_000,
        );
        let mut session = session(4, 2);

        let outcome = flow.run(&mut session, "ecuaciones").await.unwrap();

        assert_eq!(outcome.progress.chunks_total, 2);
        assert_eq!(outcome.progress.chunks_done, 2);
        assert_eq!(
            outcome.progress.combined_response,
            "### Páginas 1-2\nEjercicio 1 (Página 2): a\n\n### Páginas 3-4\nEjercicio 4 (Página 4): b\n\n"
        );
        // 只在第二块之前等待一次
        assert_eq!(pacer.waits.load(Ordering::SeqCst), 1);

        let requests = generator.requests();
        assert_eq!(requests.len(), 2);
        for request in &requests {
            assert_eq!(request.system, SYSTEM_INSTRUCTION);
            assert_eq!(request.turns.len(), 2);
            assert_eq!(request.turns[1], ConversationTurn::user("ecuaciones"));
        }
        assert!(requests[1].turns[0].content.contains("[Página 3]"));
        assert!(!requests[1].turns[0].content.contains("[Página 2]"));
        assert!(session.history.is_empty());
    }

    #[tokio::test]
    async fn test_failure_aborts_and_reports_page_range() {
        let generator = ScriptedGenerator::new(vec![
            ok("Ejercicio 1 (Página 1): a"),
            Err(ServiceError::EmptyContent {
                model: "test".to_string(),
            }),
            ok("never"),
        ]);
        let flow = QueryFlow::with_parts(
            generator.clone(),
            Arc::new(NoPacing),
            QueryPolicy::Stateless,
            50_000,
        );
        let mut session = session(30, 25);

        let err = flow.run(&mut session, "ecuaciones").await.unwrap_err();

        let QueryError::ChunkFailed {
            chunk_index,
            page_range,
            progress,
            ..
        } = err;
        assert_eq!(chunk_index, 1);
        assert_eq!(page_range, "26-30");
        assert_eq!(progress.chunks_done, 1);
        assert_eq!(
            progress.combined_response,
            "### Páginas 1-25\nEjercicio 1 (Página 1): a\n\n"
        );
        assert_eq!(generator.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_rolling_resends_history() {
        let generator = ScriptedGenerator::new(vec![ok("primera"), ok("segunda")]);
        let flow = QueryFlow::with_parts(
            generator.clone(),
            Arc::new(NoPacing),
            QueryPolicy::Rolling,
            50_000,
        );
        let mut session = session(2, 1);

        flow.run(&mut session, "ecuaciones").await.unwrap();

        let requests = generator.requests();
        assert_eq!(requests[0].turns.len(), 2);
        assert_eq!(requests[1].turns.len(), 5);
        assert_eq!(requests[1].turns[2], ConversationTurn::assistant("primera"));
        assert_eq!(session.history.len(), 6);
        assert_eq!(session.history[5].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_rolling_failure_keeps_history_of_successful_chunks() {
        let generator = ScriptedGenerator::new(vec![
            ok("primera"),
            Err(ServiceError::EmptyResponse {
                model: "test".to_string(),
            }),
        ]);
        let flow = QueryFlow::with_parts(
            generator,
            Arc::new(NoPacing),
            QueryPolicy::Rolling,
            50_000,
        );
        let mut session = session(3, 1);

        let result = flow.run(&mut session, "ecuaciones").await;

        assert!(result.is_err());
        assert_eq!(session.history.len(), 3);
        assert!(session.history[0].content.contains("[Página 1]"));
        assert_eq!(session.history[1], ConversationTurn::user("ecuaciones"));
        assert_eq!(session.history[2], ConversationTurn::assistant("primera"));
    }

    #[tokio::test]
    async fn test_rotating_failure_keeps_cursor() {
        let generator = ScriptedGenerator::new(vec![
            ok("a"),
            Err(ServiceError::EmptyContent {
                model: "test".to_string(),
            }),
            ok("b"),
        ]);
        let flow = QueryFlow::with_parts(
            generator,
            Arc::new(NoPacing),
            QueryPolicy::Rotating,
            50_000,
        );
        let mut session = session(4, 2);

        flow.run(&mut session, "q").await.unwrap();
        assert_eq!(session.page_group_cursor, 1);

        let err = flow.run(&mut session, "q").await.unwrap_err();
        let QueryError::ChunkFailed { page_range, .. } = err;
        assert_eq!(page_range, "3-4");
        assert_eq!(session.page_group_cursor, 1);

        // 重试时仍然发送同一组页面
        let retry = flow.run(&mut session, "q").await.unwrap();
        assert_eq!(retry.responses[0].page_range, "3-4");
        assert_eq!(session.page_group_cursor, 0);
    }

    #[tokio::test]
    async fn test_rotating_sends_one_group_per_query() {
        let generator = ScriptedGenerator::new(vec![ok("a"), ok("b"), ok("c")]);
        let pacer = Arc::new(CountingPacer::default());
        let flow = QueryFlow::with_parts(
            generator.clone(),
            pacer.clone(),
            QueryPolicy::Rotating,
            50_000,
        );
        let mut session = session(3, 2);

        let first = flow.run(&mut session, "q").await.unwrap();
        let second = flow.run(&mut session, "q").await.unwrap();
        let third = flow.run(&mut session, "q").await.unwrap();

        assert_eq!(first.responses[0].page_range, "1-2");
        assert_eq!(second.responses[0].page_range, "3");
        assert_eq!(third.responses[0].page_range, "1-2");
        assert_eq!(pacer.waits.load(Ordering::SeqCst), 0);
        assert!(generator.requests()[0].turns[0]
            .content
            .contains("Contenido páginas 1 a 2:"));
    }

    #[tokio::test]
    async fn test_raw_text_is_one_shot() {
        let generator = ScriptedGenerator::new(vec![ok("Ejercicio 1 (Página 0): x")]);
        let flow = QueryFlow::with_parts(
            generator.clone(),
            Arc::new(NoPacing),
            QueryPolicy::Stateless,
            5,
        );
        let mut session = QuerySession::from_document(
            "notas.txt",
            "texto sin marcas de página",
            &PageParser::default(),
            &ChunkBuilder::new(25, 5).unwrap(),
        );

        let outcome = flow.run(&mut session, "q").await.unwrap();

        assert_eq!(outcome.responses.len(), 1);
        assert_eq!(outcome.progress.combined_response, "Ejercicio 1 (Página 0): x\n\n");
        assert!(generator.requests()[0].turns[0]
            .content
            .ends_with("Contenido del documento:\n\ntexto"));
    }

    #[tokio::test]
    async fn test_one_shot_policy_ignores_pages() {
        let generator = ScriptedGenerator::new(vec![ok("ok")]);
        let flow = QueryFlow::with_parts(
            generator.clone(),
            Arc::new(NoPacing),
            QueryPolicy::OneShot,
            50_000,
        );
        let mut session = session(30, 25);

        let outcome = flow.run(&mut session, "q").await.unwrap();

        assert_eq!(outcome.progress.chunks_total, 1);
        assert_eq!(generator.requests().len(), 1);
        assert!(generator.requests()[0].turns[0].content.contains("[Pagina 30]"));
    }

    #[tokio::test]
    async fn test_empty_document_makes_no_calls() {
        let generator = ScriptedGenerator::new(vec![]);
        let flow = QueryFlow::with_parts(
            generator.clone(),
            Arc::new(NoPacing),
            QueryPolicy::Stateless,
            50_000,
        );
        let mut session = QuerySession::from_document(
            "vacio.txt",
            "",
            &PageParser::default(),
            &ChunkBuilder::default(),
        );

        let outcome = flow.run(&mut session, "q").await.unwrap();

        assert_eq!(outcome.progress.chunks_total, 0);
        assert!(outcome.progress.is_complete());
        assert!(generator.requests().is_empty());
    }

    #[tokio::test]
    async fn test_outcome_extract_per_chunk() {
        let generator = ScriptedGenerator::new(vec![
            ok("Ejercicio 1 (Página 1): a\nEjercicio 2 (Página 2): b"),
            ok("No se encontraron ejercicios."),
        ]);
        let flow = QueryFlow::with_parts(
            generator,
            Arc::new(NoPacing),
            QueryPolicy::Stateless,
            50_000,
        );
        let mut session = session(4, 2);

        let outcome = flow.run(&mut session, "ecuaciones").await.unwrap();
        let batches = outcome.extract(&ExerciseExtractor::default(), "ecuaciones");

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert!(batches[1].is_empty());
        assert_eq!(batches[0][1].standard, "ecuaciones");
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(QueryPolicy::from_name("Rolling"), Some(QueryPolicy::Rolling));
        assert_eq!(QueryPolicy::from_name("oneshot"), Some(QueryPolicy::OneShot));
        assert_eq!(QueryPolicy::from_name("parallel"), None);
    }
}
