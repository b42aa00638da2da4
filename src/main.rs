use anyhow::Result;
use tiku_bank::app::App;
use tiku_bank::config::Config;
use tiku_bank::logger;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logger::init();

    // 加载配置
    let config = Config::from_env();

    // 初始化并运行应用
    App::initialize(config)?.run().await?;

    Ok(())
}
