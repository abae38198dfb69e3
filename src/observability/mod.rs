//! 可观测性：tracing 订阅器初始化与引擎事件

pub mod events;

pub use events::{EngineEvent, EventSink};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 安装全局订阅器：默认 info，RUST_LOG 覆盖；日志写 stderr，stdout 留给回答
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
