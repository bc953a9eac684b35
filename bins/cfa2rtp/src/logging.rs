//! 日志初始化模块.
//!
//! 双输出:
//! - console: 彩色, 写到 stderr (stdout 可能承载二进制轨迹)
//! - file: 无色, 默认 info, 可通过 -v/-vv 或 CFA2RTP_LOG 环境变量调整
//!
//! 日志文件输出到 {directory}/{prefix}.{date}.log

use anyhow::{Context, Result};
use chrono::{Datelike, Local, Timelike};
use std::sync::OnceLock;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FormatEvent, FormatFields, format::Writer},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// 初始化日志系统
///
/// - `directory`: 日志目录
/// - `file_prefix`: 日志文件前缀 (如 "cfa2rtp")
/// - `verbosity`: 0=info, 1=debug, 2+=trace (由 -v/-vv 控制)
///
/// 库代码通过 `log` 输出的记录会被桥接到 tracing.
pub fn init(directory: &str, file_prefix: &str, verbosity: u8) -> Result<()> {
    std::fs::create_dir_all(directory)
        .with_context(|| format!("创建日志目录失败, path={directory}"))?;

    let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix(file_prefix)
        .filename_suffix("log")
        .build(directory)
        .context("创建日志文件失败")?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    LOG_GUARD.set(guard).ok();

    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // Console: 与文件同级, 彩色, stderr
    let console_layer = fmt::Layer::default()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .event_format(ConsoleFormatter)
        .with_filter(EnvFilter::new(level));

    // File: CFA2RTP_LOG 环境变量可覆盖
    let file_filter =
        EnvFilter::try_from_env("CFA2RTP_LOG").unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = fmt::Layer::default()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(file_filter);

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("日志系统已初始化")?;
    Ok(())
}

/// 行首前缀: `[MM-DD HH:MM:SS.mmm] LEVEL > `, `color` 为 ANSI 颜色码
fn write_prefix(
    writer: &mut Writer<'_>,
    level: &tracing::Level,
    color: Option<&str>,
) -> std::fmt::Result {
    let now = Local::now();
    write!(
        writer,
        "[{:02}-{:02} {:02}:{:02}:{:02}.{:03}] ",
        now.month(),
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        now.timestamp_subsec_millis(),
    )?;
    match color {
        Some(color) => write!(writer, "{color}{level:5}\x1b[0m > "),
        None => write!(writer, "{level:5} > "),
    }
}

fn level_color(level: &tracing::Level) -> &'static str {
    match *level {
        tracing::Level::ERROR => "\x1b[31m",
        tracing::Level::WARN => "\x1b[33m",
        tracing::Level::INFO => "\x1b[32m",
        _ => "\x1b[34m",
    }
}

/// Console 格式: 彩色
struct ConsoleFormatter;

impl<S, N> FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let level = event.metadata().level();
        write_prefix(&mut writer, level, Some(level_color(level)))?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// File 格式: 无色
struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        write_prefix(&mut writer, event.metadata().level(), None)?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
