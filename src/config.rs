//! 转换配置.
//!
//! 在构造 [`Converter`](crate::Converter) 时显式传入, 不使用全局状态.
//! 支持 serde (反)序列化, 命令行工具可从 JSON 文件加载后再用参数覆盖.

use serde::{Deserialize, Serialize};

use cfa_core::{ClockZone, ConvError, ConvResult, DEFAULT_MAX_PAYLOAD, FractionMode};
use cfa_format::FrameOffset;
use cfa_format::muxers::rtpdump::{MAX_RECORD_PAYLOAD, RtpDumpMuxer};

/// 默认头部地址 (组播)
pub const DEFAULT_ADDRESS: &str = "239.255.0.1";

/// 默认头部端口
pub const DEFAULT_PORT: u16 = 5004;

/// 转换配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// 头部源地址 (点分十进制)
    pub address: String,
    /// 头部端口
    pub port: u16,
    /// 帧起始定位方式
    pub frame_offset: FrameOffset,
    /// 单条记录的载荷上限 (字节)
    pub max_payload: usize,
    /// 时间戳解释时区
    pub clock: ClockZone,
    /// 小数秒解释方式
    pub fraction: FractionMode,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            frame_offset: FrameOffset::default(),
            max_payload: DEFAULT_MAX_PAYLOAD,
            clock: ClockZone::default(),
            fraction: FractionMode::default(),
        }
    }
}

impl ConvertConfig {
    /// 校验配置
    ///
    /// 地址在写头部时才解析 (见 [`RtpDumpMuxer::parse_address`]),
    /// 这里只检查会导致转换无法进行的参数.
    pub fn validate(&self) -> ConvResult<()> {
        if self.max_payload == 0 || self.max_payload > MAX_RECORD_PAYLOAD {
            return Err(ConvError::InvalidConfig(format!(
                "max_payload 必须在 1..={} 之间, 实际为 {}",
                MAX_RECORD_PAYLOAD, self.max_payload
            )));
        }
        if let FrameOffset::Signature(sig) = &self.frame_offset {
            if sig.is_empty() {
                return Err(ConvError::InvalidConfig("帧起始签名不能为空".into()));
            }
        }
        Ok(())
    }

    /// 提前检查地址, 供需要尽早失败的调用方使用
    pub fn check_address(&self) -> ConvResult<()> {
        RtpDumpMuxer::parse_address(&self.address).map(|_| ())
    }
}
