//! 封装器 (Muxer) trait 定义.
//!
//! 定义了将轨迹头部与数据包写入输出格式的接口.

use cfa_core::ConvResult;

use crate::io::IoContext;
use crate::packet::{TraceHeader, TracePacket};

/// 封装器 trait
///
/// 使用流程:
/// 1. 调用 `write_header()` 写入头部 (恰好一次)
/// 2. 循环调用 `write_packet()` 写入数据包
/// 3. 调用 `write_trailer()` 完成封装并刷新输出
pub trait Muxer: Send {
    /// 获取格式名称
    fn name(&self) -> &str;

    /// 写入轨迹头部
    fn write_header(&mut self, io: &mut IoContext, header: &TraceHeader) -> ConvResult<()>;

    /// 写入一个数据包
    fn write_packet(&mut self, io: &mut IoContext, packet: &TracePacket) -> ConvResult<()>;

    /// 写入尾部, 完成封装
    fn write_trailer(&mut self, io: &mut IoContext) -> ConvResult<()>;
}
