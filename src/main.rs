// ==========================================
// 批量导入系统 - 命令行入口
// ==========================================
// 用法:
//   catalog-import <kind> <csv-path> [db-path]
//
// kind: catalog_item | curriculum_stage | learner | concept_mapping
// 导入结果以 JSON 输出到 stdout，日志输出到 stderr
// ==========================================

use catalog_import::{logging, EntityKind, ImportApi};
use std::path::PathBuf;

const USAGE: &str = "用法: catalog-import <kind> <csv-path> [db-path]";

/// 默认数据库路径
///
/// 优先级: CATALOG_IMPORT_DB_PATH 环境变量 > 用户数据目录 > 当前目录
fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var("CATALOG_IMPORT_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./catalog_import.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("catalog-import");
        std::fs::create_dir_all(&dir).ok();
        path = dir.join("catalog_import.db");
    }

    path.to_string_lossy().to_string()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let kind: EntityKind = args.next().ok_or(USAGE)?.parse()?;
    let csv_path = args.next().ok_or(USAGE)?;
    let db_path = args.next().unwrap_or_else(get_default_db_path);

    tracing::info!(version = catalog_import::VERSION, db_path = %db_path, "catalog-import 启动");

    let api = ImportApi::open(&db_path)?;
    let result = api.import_csv_file(kind, &csv_path).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
