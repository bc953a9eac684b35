//! 轨迹头部与数据包.
//!
//! 封装器的输入: 一个全局头部描述整条轨迹, 随后每条记录一个数据包.

use bytes::Bytes;
use cfa_core::{Elapsed, Instant};

/// 轨迹全局头部信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceHeader {
    /// 源地址 (点分十进制文本, 由封装器解析)
    pub address: String,
    /// UDP 端口
    pub port: u16,
    /// 录制起始时间
    pub start: Instant,
}

/// 轨迹数据包
///
/// `payload` 为从帧起始位置解码出的原始字节, 不做内容校验.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracePacket {
    /// 解码后的载荷
    pub payload: Bytes,
    /// 相对录制起始时间的偏移
    pub offset: Elapsed,
}

impl TracePacket {
    /// 从数据创建数据包
    pub fn new(payload: impl Into<Bytes>, offset: Elapsed) -> Self {
        Self {
            payload: payload.into(),
            offset,
        }
    }

    /// 载荷大小 (字节)
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}
