//! 统一错误类型定义.
//!
//! 所有 cfa2rtp crate 共用的错误类型, 支持跨模块传播.
//! 错误分为两类: 可恢复 (丢弃当前行后继续) 与致命 (终止整个转换).

use thiserror::Error;

/// cfa2rtp 统一错误类型
#[derive(Debug, Error)]
pub enum ConvError {
    /// 时间戳文本不符合 `YYYY/MM/DD HH:MM:SS[.fraction]`
    #[error("时间戳解析失败: {0}")]
    Parse(String),

    /// 输入行字段不足或序号无效
    #[error("第 {line} 行格式错误: {reason}")]
    MalformedRecord { line: u64, reason: String },

    /// 签名搜索未命中
    #[error("未找到帧起始签名 '{0}'")]
    FrameNotFound(String),

    /// 解码结果超过传输单元上限
    #[error("载荷超过上限: 上限 {limit} 字节")]
    PayloadTooLarge { limit: usize },

    /// 记录时间早于轨迹起始时间
    #[error("记录时间早于起始时间: 相差 {micros} 微秒")]
    NegativeOffset { micros: i64 },

    /// 相对偏移超出 32 位毫秒可表示范围
    #[error("相对偏移超出范围: {millis} 毫秒")]
    OffsetOverflow { millis: i64 },

    /// 头部地址不是合法的点分十进制 IPv4
    #[error("无效地址: {0}")]
    InvalidAddress(String),

    /// 配置校验失败
    #[error("无效配置: {0}")]
    InvalidConfig(String),

    /// 封装器调用顺序错误 (如重复写头部)
    #[error("状态错误: {0}")]
    InvalidState(String),

    /// 输出写入失败
    #[error("写入失败: {0}")]
    Write(#[source] std::io::Error),

    /// 输入读取失败
    #[error("读取失败: {0}")]
    Read(#[source] std::io::Error),
}

impl ConvError {
    /// 是否为致命错误
    ///
    /// 致命错误终止转换; 其余错误只丢弃当前记录.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddress(_)
                | Self::InvalidConfig(_)
                | Self::InvalidState(_)
                | Self::Write(_)
                | Self::Read(_)
        )
    }

    /// 简短的错误类别名, 用于统计与日志
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::MalformedRecord { .. } => "malformed",
            Self::FrameNotFound(_) => "frame_not_found",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::NegativeOffset { .. } => "negative_offset",
            Self::OffsetOverflow { .. } => "offset_overflow",
            Self::InvalidAddress(_) => "invalid_address",
            Self::InvalidConfig(_) => "invalid_config",
            Self::InvalidState(_) => "invalid_state",
            Self::Write(_) => "write",
            Self::Read(_) => "read",
        }
    }
}

/// cfa2rtp 统一 Result 类型
pub type ConvResult<T> = Result<T, ConvError>;
