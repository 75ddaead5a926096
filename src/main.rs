// ==========================================
// 订单瓶颈分析系统 - 分析命令行入口
// ==========================================
// 用法:
//   order-bottleneck-analytics [--db path] [--start YYYY-MM-DD] [--end YYYY-MM-DD]
//                              [--resolution hour|day|week] [--csv path]
// 输出: AnalysisResult JSON（stdout）；日志写到 stderr
// ==========================================

use order_bottleneck_analytics::app::{get_default_db_path, AppState};
use order_bottleneck_analytics::engine::RawAnalysisRequest;
use order_bottleneck_analytics::{logging, APP_NAME, VERSION};
use std::error::Error;

#[derive(Debug, Default)]
struct CliArgs {
    db_path: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    resolution: Option<String>,
    csv_path: Option<String>,
}

fn print_usage() {
    eprintln!(
        "Usage: order-bottleneck-analytics [--db <path>] [--start <date>] [--end <date>] \
         [--resolution hour|day|week] [--csv <path>]"
    );
}

fn parse_args() -> Result<Option<CliArgs>, Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let mut parsed = CliArgs::default();

    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .ok_or_else(|| format!("{} 需要一个参数值", name))
        };
        match arg.as_str() {
            "--db" => parsed.db_path = Some(value("--db")?),
            "--start" => parsed.start_date = Some(value("--start")?),
            "--end" => parsed.end_date = Some(value("--end")?),
            "--resolution" => parsed.resolution = Some(value("--resolution")?),
            "--csv" => parsed.csv_path = Some(value("--csv")?),
            "-h" | "--help" => return Ok(None),
            other => return Err(format!("未知参数: {}", other).into()),
        }
    }

    Ok(Some(parsed))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(e) => {
            print_usage();
            return Err(e);
        }
    };

    tracing::info!(version = VERSION, "{}", APP_NAME);

    let db_path = args.db_path.clone().unwrap_or_else(get_default_db_path);
    tracing::info!(db_path = %db_path, "使用数据库");

    let state = AppState::new(db_path).await?;
    let request = RawAnalysisRequest {
        start_date: args.start_date,
        end_date: args.end_date,
        resolution: args.resolution,
    };

    let result = match &args.csv_path {
        Some(csv_path) => {
            let (result, rows) = state.analytics_api.export_heat_map(&request, csv_path)?;
            tracing::info!(csv_path = %csv_path, rows, "热力图CSV已写出");
            result
        }
        None => state.analytics_api.analyze(&request),
    };

    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.is_error() {
        std::process::exit(1);
    }
    Ok(())
}
