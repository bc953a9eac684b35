//! cfa2rtp - 文本抓包日志转 rtpdump 命令行工具
//!
//! 读取 `<序号>,<时间戳>,<十六进制帧>` 格式的抓包日志,
//! 输出 rtpplay / Wireshark 可读取的 rtpdump 轨迹.

mod logging;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use cfa_core::{ClockZone, FractionMode};
use cfa_format::{FrameOffset, IoContext};
use cfa2rtp::{ConvertConfig, ConvertStats};

#[derive(Parser, Debug)]
#[command(
    name = "cfa2rtp",
    version,
    about = "文本抓包日志转 rtpdump 轨迹",
    disable_help_flag = true
)]
struct Cli {
    /// 显示帮助 (-h 用于指定帧起始签名)
    #[arg(long, action = clap::ArgAction::Help)]
    help: Option<bool>,

    /// 输入文件路径 ("-" 或省略表示标准输入)
    #[arg(short = 'r', long)]
    input: Option<String>,

    /// 输出文件路径 ("-" 或省略表示标准输出)
    #[arg(short = 'w', long)]
    output: Option<String>,

    /// 头部源地址 (点分十进制 IPv4, 默认 239.255.0.1)
    #[arg(short = 'a', long)]
    address: Option<String>,

    /// 头部端口 (默认 5004)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// RTP 帧在十六进制文本中的固定偏移 (字符数), 指定后不再搜索签名
    #[arg(short = 'o', long, conflicts_with = "signature")]
    offset: Option<usize>,

    /// RTP 帧起始签名 (默认 "80 60"), 也可写作 -s
    #[arg(short = 'h', long, visible_short_alias = 's')]
    signature: Option<String>,

    /// 单条记录载荷上限 (字节, 默认 1500)
    #[arg(long)]
    max_payload: Option<usize>,

    /// 按 UTC 解释时间戳 (默认本地时区)
    #[arg(long)]
    utc: bool,

    /// 将小数秒按位数换算为微秒 (默认按字面整数)
    #[arg(long)]
    scale_fraction: bool,

    /// JSON 配置文件, 命令行参数优先
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// 以 JSON 格式在 stderr 输出转换统计
    #[arg(long)]
    json: bool,

    /// 日志目录
    #[arg(long, default_value = "logs")]
    log_dir: String,

    /// 日志级别 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init(&cli.log_dir, "cfa2rtp", cli.verbose) {
        eprintln!("警告: 日志初始化失败: {e:#}");
    }

    match run(&cli) {
        Ok(stats) => {
            if cli.json {
                match stats_json(&stats) {
                    Ok(json) => eprintln!("{json}"),
                    Err(e) => error!("{e:#}"),
                }
            }
        }
        Err(e) => {
            error!("转换失败: {e:#}");
            eprintln!("错误: {e:#}");
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<ConvertStats> {
    let config = build_config(cli)?;
    info!(
        "cfa2rtp 版本 {}, 地址 {}/{}, 定位 {:?}",
        cfa2rtp::version(),
        config.address,
        config.port,
        config.frame_offset
    );

    let input = open_input(cli.input.as_deref())?;
    let mut io = open_output(cli.output.as_deref())?;
    let stats = cfa2rtp::convert(input, &mut io, config)?;
    Ok(stats)
}

/// 合并配置文件与命令行参数
fn build_config(cli: &Cli) -> Result<ConvertConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("读取配置文件失败, path={}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("解析配置文件失败, path={}", path.display()))?
        }
        None => ConvertConfig::default(),
    };

    if let Some(address) = &cli.address {
        config.address = address.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(offset) = cli.offset {
        config.frame_offset = FrameOffset::Fixed(offset);
    }
    if let Some(signature) = &cli.signature {
        config.frame_offset = FrameOffset::Signature(signature.clone());
    }
    if let Some(max_payload) = cli.max_payload {
        config.max_payload = max_payload;
    }
    if cli.utc {
        config.clock = ClockZone::Utc;
    }
    if cli.scale_fraction {
        config.fraction = FractionMode::Microseconds;
    }

    config.validate()?;
    // 地址无效时在读取输入前失败, 不依赖是否存在可解码记录
    config.check_address()?;
    Ok(config)
}

/// 转换统计的 JSON 文本
fn stats_json(stats: &ConvertStats) -> Result<String> {
    serde_json::to_string_pretty(stats).context("统计序列化失败")
}

fn open_input(path: Option<&str>) -> Result<Box<dyn BufRead>> {
    match path {
        None | Some("-") => Ok(Box::new(io::stdin().lock())),
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("无法打开输入文件 '{path}'"))?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

fn open_output(path: Option<&str>) -> Result<IoContext> {
    match path {
        None | Some("-") => Ok(IoContext::stdout()),
        Some(path) => {
            IoContext::open_write(path).with_context(|| format!("无法创建输出文件 '{path}'"))
        }
    }
}
