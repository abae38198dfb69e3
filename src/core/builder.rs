//! Agent 构建器：由 AppConfig 组装 LLM、长期记忆、工具集与各引擎
//!
//! 所有入口（CLI 子命令、测试）共用同一套组装逻辑；LLM 与长期记忆可替换为测试替身。

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{env_fallback, AppConfig};
use crate::core::AgentError;
use crate::extraction::{ExtractionPolicy, LlmExtractor};
use crate::llm::{LlmClient, OpenAiClient, RetryConfig, RetryingLlmClient};
use crate::memory::{InMemoryLongTerm, LongTermMemory, RetrievalApiMemory};
use crate::objective::{ObjectiveSettings, TaskQueueEngine};
use crate::observability::EventSink;
use crate::react::{CardComponent, ComponentEngine, ComponentRegistry, ReactEngine};
use crate::tools::{default_registry, ToolRegistry};

pub struct AgentBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    memory: Option<Arc<dyn LongTermMemory>>,
    events: EventSink,
}

impl AgentBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            memory: None,
            events: EventSink::none(),
        }
    }

    /// 替换 LLM（不再包装重试层）
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn LongTermMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// OpenAI 兼容客户端 + 传输层重试
    pub fn build_llm(&self) -> Arc<dyn LlmClient> {
        if let Some(llm) = &self.llm {
            return llm.clone();
        }
        let cfg = &self.config.llm;
        let api_key = env_fallback(&cfg.api_key, "OPENAI_API_KEY");
        if api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY is not set; LLM calls will fail");
        }
        tracing::info!(model = %cfg.model, "Using OpenAI-compatible LLM");
        let client = OpenAiClient::new(cfg.base_url.as_deref(), &cfg.model, api_key.as_deref())
            .with_defaults(cfg.completion_options());
        Arc::new(RetryingLlmClient::new(
            Arc::new(client),
            RetryConfig::from(&cfg.retry),
        ))
    }

    /// 配置了检索服务时使用 RetrievalApiMemory，否则进程内关键词记忆
    pub fn build_memory(&self) -> Arc<dyn LongTermMemory> {
        if let Some(memory) = &self.memory {
            return memory.clone();
        }
        let cfg = &self.config.memory;
        match (
            env_fallback(&cfg.retrieval_api_url, "RETRIEVAL_API_URL"),
            env_fallback(&cfg.retrieval_api_key, "RETRIEVAL_API_KEY"),
        ) {
            (Some(url), key) => {
                tracing::info!(url = %url, "Using retrieval API memory");
                Arc::new(RetrievalApiMemory::new(
                    url,
                    key.unwrap_or_default(),
                    self.config.tools.timeout_secs,
                ))
            }
            (None, _) => {
                tracing::info!("No retrieval API configured, using in-process memory");
                Arc::new(InMemoryLongTerm::default())
            }
        }
    }

    pub fn build_tool_registry(&self, memory: Arc<dyn LongTermMemory>) -> ToolRegistry {
        let mut tools = self.config.tools.clone();
        tools.serp_api_key = env_fallback(&tools.serp_api_key, "SERP_API_KEY");
        default_registry(&tools, memory)
    }

    pub fn build_components(&self) -> AgentComponents {
        let llm = self.build_llm();
        let memory = self.build_memory();
        let tools = self.build_tool_registry(memory.clone());
        AgentComponents {
            llm,
            memory,
            tools,
            config: self.config.clone(),
            events: self.events.clone(),
        }
    }
}

/// 预构建的共享组件：LLM、长期记忆、工具集
pub struct AgentComponents {
    pub llm: Arc<dyn LlmClient>,
    pub memory: Arc<dyn LongTermMemory>,
    pub tools: ToolRegistry,
    pub config: AppConfig,
    pub events: EventSink,
}

impl AgentComponents {
    pub fn react_engine(&self) -> ReactEngine {
        ReactEngine::new(self.llm.clone(), &self.tools)
            .with_max_iterations(self.config.react.max_iterations)
            .with_context_max_tokens(self.config.react.context_max_tokens)
            .with_events(self.events.clone())
    }

    /// 卡片组件引擎
    pub fn component_engine(&self) -> ComponentEngine {
        let mut components = ComponentRegistry::new();
        components.register(CardComponent);
        ComponentEngine::new(self.llm.clone(), &self.tools, components)
            .with_max_iterations(self.config.react.max_iterations)
            .with_context_max_tokens(self.config.react.context_max_tokens)
            .with_events(self.events.clone())
    }

    pub fn extractor(&self) -> LlmExtractor {
        LlmExtractor::with_policy(self.llm.clone(), ExtractionPolicy::from(&self.config.extraction))
            .with_events(self.events.clone())
    }

    pub fn task_queue_engine(&self, objective: &str) -> TaskQueueEngine {
        TaskQueueEngine::new(self.llm.clone(), self.extractor(), self.memory.clone(), objective)
            .with_settings(ObjectiveSettings::from(&self.config.objective))
            .with_events(self.events.clone())
    }
}

/// 便捷函数：加载配置并创建 AgentBuilder；显式指定的配置文件缺失或格式错误时报错
pub fn create_agent_builder(config_path: Option<PathBuf>) -> Result<AgentBuilder, AgentError> {
    let config = crate::config::load_config(config_path)
        .map_err(|e| AgentError::ConfigError(e.to_string()))?;
    Ok(AgentBuilder::new(config))
}
