use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 默认级别为 info，可通过 RUST_LOG 环境变量覆盖。
/// 重复调用是安全的（测试中每个用例都会调用一次）。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
