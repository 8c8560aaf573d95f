// ==========================================
// 注入数据稳定性核对 - 命令行入口
// ==========================================
// 流程: 加载配置 -> 依次查询活跃数据源 -> 合并 -> 写 CSV 报表
// 退出码: 0 完成（含部分数据源失败）; 1 配置错误或报表写入失败
// ==========================================

use anyhow::Context;
use clap::Parser;
use injection_audit::config::{resolve_config_path, ConfigView, InjectionParams};
use injection_audit::domain::SourceKind;
use injection_audit::report::{CsvReportWriter, ReportSink, DEFAULT_REPORT_FILE};
use injection_audit::{logging, perf, ReconciliationEngine};
use std::path::PathBuf;
use std::process::ExitCode;

/// 未启用 odbc 特性时 ASE 无法连接,其计数按 0 计入报表
const ODBC_BUILD_NOTE: &str = "\
注意: ASE 数据源通过 ODBC 访问,需要以 `cargo build --release --features odbc` 构建,
并安装 unixODBC 与 FreeTDS 驱动。默认构建中 [ase] 数据源总是连接失败,其产品类型计数为 0。";

#[derive(Debug, Parser)]
#[command(
    name = "injection-audit",
    version,
    about = "多数据源注入计数核对",
    after_help = ODBC_BUILD_NOTE
)]
struct Cli {
    /// 配置文件路径（默认: ./config.ini）
    #[arg(long, short = 'c', env = "INJECTION_AUDIT_CONFIG")]
    config: Option<PathBuf>,

    /// 报表输出路径（默认: ./Stability_results.csv）
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// 在 stdout 额外输出 JSON 摘要
    #[arg(long)]
    summary_json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // 初始化日志系统
    logging::init();
    perf::install_query_tracing();

    tracing::info!("==================================================");
    tracing::info!("{}", injection_audit::APP_NAME);
    tracing::info!("系统版本: {}", injection_audit::VERSION);
    tracing::info!("==================================================");

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = resolve_config_path(cli.config.as_deref());
    tracing::info!("使用配置文件: {}", config_path.display());

    let config = ConfigView::load(&config_path).context("读取配置文件失败")?;
    let injection = InjectionParams::from_config(&config).context("读取 [injection] 配置失败")?;
    let engine =
        ReconciliationEngine::from_config(&config, &injection).context("装配数据源失败")?;

    if !cfg!(feature = "odbc") && engine.active_sources().contains(&SourceKind::LegacyRdbms) {
        tracing::warn!("当前构建未启用 odbc 特性,[ase] 数据源将连接失败并按 0 计入");
    }

    let report = engine.run();

    let output = match cli.output {
        Some(path) => path,
        None => std::env::current_dir()
            .context("无法获取当前工作目录")?
            .join(DEFAULT_REPORT_FILE),
    };
    CsvReportWriter::new(&output)
        .write_report(report.product_types(), &report.merged)
        .with_context(|| format!("写入报表失败: {}", output.display()))?;

    if cli.summary_json {
        println!("{}", serde_json::to_string_pretty(&report.summary_json())?);
    }

    tracing::info!("核对完成,结果已保存到 {}", output.display());
    Ok(())
}
