//! 日志初始化
//!
//! 默认级别 info，`RUST_LOG` 优先；开启详细日志时默认 debug

use tracing_subscriber::EnvFilter;

/// 初始化全局日志订阅者（重复调用无副作用）
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
