// ==========================================
// 服务覆盖排班系统 - 命令行入口
// ==========================================
// 用法: coverage-roster [db_path] <start> <end> [--save]
// 说明: 对窗口执行贪心覆盖分配并输出汇总;--save 时覆盖写入结果表
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use coverage_roster::config::ConfigManager;
use coverage_roster::db::{get_default_db_path, init_schema, open_sqlite_connection};
use coverage_roster::domain::types::DATE_FORMAT;
use coverage_roster::engine::{CoverageOrchestrator, RosterRepositories};
use coverage_roster::{logging, DateWindow};
use std::sync::{Arc, Mutex};

struct CliArgs {
    db_path: String,
    window: DateWindow,
    save: bool,
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let save = args.iter().any(|a| a == "--save");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    let (db_path, start, end) = match positional.as_slice() {
        [start, end] => (get_default_db_path(), *start, *end),
        [db, start, end] => ((*db).clone(), *start, *end),
        _ => bail!("用法: coverage-roster [db_path] <start YYYY-MM-DD> <end YYYY-MM-DD> [--save]"),
    };

    let start = NaiveDate::parse_from_str(start, DATE_FORMAT)
        .with_context(|| format!("开始日期格式错误: {}", start))?;
    let end = NaiveDate::parse_from_str(end, DATE_FORMAT)
        .with_context(|| format!("结束日期格式错误: {}", end))?;
    if end < start {
        bail!("结束日期 {} 早于开始日期 {}", end, start);
    }

    Ok(CliArgs {
        db_path,
        window: DateWindow::new(start, end),
        save,
    })
}

fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_args(&args)?;

    tracing::info!("==================================================");
    tracing::info!("{} v{}", coverage_roster::APP_NAME, coverage_roster::VERSION);
    tracing::info!("使用数据库: {}", cli.db_path);
    tracing::info!("==================================================");

    let conn = open_sqlite_connection(&cli.db_path)
        .with_context(|| format!("无法打开数据库: {}", cli.db_path))?;
    init_schema(&conn).context("建表失败")?;
    let conn = Arc::new(Mutex::new(conn));

    let config = ConfigManager::from_connection(conn.clone())
        .map_err(|e| anyhow!("配置初始化失败: {}", e))?;
    let orchestrator =
        CoverageOrchestrator::new(RosterRepositories::from_connection(conn), Arc::new(config));

    let outcome = orchestrator.run_assignment(cli.window)?;
    tracing::info!(
        start = %cli.window.start,
        end = %cli.window.end,
        covered = outcome.covered.len(),
        uncovered = outcome.uncovered.len(),
        coverage_pct = %format!("{:.1}", outcome.coverage_pct()),
        "覆盖分配完成"
    );
    for (reason, count) in outcome.uncovered_by_reason() {
        tracing::info!(reason, count, "未覆盖原因统计");
    }

    if cli.save {
        let summary = orchestrator.persist_coverage(&outcome)?;
        tracing::info!(
            cleared_assignments = summary.cleared_assignments,
            cleared_gaps = summary.cleared_gaps,
            "覆盖结果已替换写入"
        );
    } else {
        tracing::info!("未指定 --save,结果未写入数据库");
    }

    Ok(())
}
