use std::path::PathBuf;

use anyhow::{bail, Result};
use exercise_finder::{logger, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logger::init(config.verbose_logging);

    let mut args = std::env::args().skip(1);
    let Some(document) = args.next() else {
        bail!("用法: exercise_finder <文档路径> <查询内容...>");
    };
    let query = args.collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        bail!("查询内容不能为空");
    }

    // 初始化并运行应用
    let summary = App::initialize(config)
        .await?
        .run(&PathBuf::from(document), query.trim())
        .await?;

    println!(
        "{} 条练习已写入 {}",
        summary.records.len(),
        summary.exported.csv.display()
    );

    Ok(())
}
