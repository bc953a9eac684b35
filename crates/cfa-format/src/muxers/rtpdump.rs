//! rtpdump (rtpplay1.0) 封装器.
//!
//! rtptools / Wireshark 使用的 RTP 轨迹格式. 文件结构:
//! - 文本魔数行 `#!rtpplay1.0 <address>/<port>\n`
//! - 全局头部 (16 bytes): start.sec, start.usec, source, port, padding
//! - [记录头 (8 bytes): length, plen, offset + 载荷] ...
//!
//! 所有多字节字段均为大端.

use std::net::Ipv4Addr;

use cfa_core::{ConvError, ConvResult};
use log::{debug, info, warn};

use crate::io::IoContext;
use crate::muxer::Muxer;
use crate::packet::{TraceHeader, TracePacket};

/// 魔数行前缀
pub const RTPDUMP_MAGIC: &str = "#!rtpplay1.0";

/// 二进制全局头部大小
pub const FILE_HEADER_SIZE: usize = 16;

/// 记录头大小
pub const RECORD_HEADER_SIZE: usize = 8;

/// 单条记录可容纳的最大载荷 (length 字段为 16 位且包含记录头)
pub const MAX_RECORD_PAYLOAD: usize = u16::MAX as usize - RECORD_HEADER_SIZE;

/// rtpdump 封装器
#[derive(Debug, Default)]
pub struct RtpDumpMuxer {
    /// 是否已写入头部
    header_written: bool,
    /// 已写入的数据包数
    packets_written: u64,
}

impl RtpDumpMuxer {
    /// 创建封装器
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建封装器 (工厂函数)
    pub fn create() -> ConvResult<Box<dyn Muxer>> {
        Ok(Box::new(Self::new()))
    }

    /// 是否已写入头部
    pub fn header_written(&self) -> bool {
        self.header_written
    }

    /// 已写入的数据包数
    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    /// 解析点分十进制 IPv4 地址
    pub fn parse_address(text: &str) -> ConvResult<Ipv4Addr> {
        text.trim()
            .parse::<Ipv4Addr>()
            .map_err(|_| ConvError::InvalidAddress(text.to_string()))
    }
}

impl Muxer for RtpDumpMuxer {
    fn name(&self) -> &str {
        "rtpdump"
    }

    fn write_header(&mut self, io: &mut IoContext, header: &TraceHeader) -> ConvResult<()> {
        if self.header_written {
            return Err(ConvError::InvalidState("rtpdump: 头部已写入".into()));
        }
        let addr = Self::parse_address(&header.address)?;

        // 魔数行保留配置中的地址原文 (去掉首尾空白)
        let magic = format!(
            "{} {}/{}\n",
            RTPDUMP_MAGIC,
            header.address.trim(),
            header.port
        );
        io.write_all(magic.as_bytes())?;

        // 起始时间在解析阶段已保证可放入 32 位
        io.write_u32_be(header.start.seconds() as u32)?;
        io.write_u32_be(header.start.micros())?;
        // 地址按网络字节序写出: 八位组在文件中的顺序与点分文本一致
        io.write_u32_be(u32::from(addr))?;
        io.write_u16_be(header.port)?;
        io.write_u16_be(0)?; // padding

        self.header_written = true;
        info!(
            "rtpdump 头部: {}/{}, 起始 {}",
            addr, header.port, header.start
        );
        Ok(())
    }

    fn write_packet(&mut self, io: &mut IoContext, packet: &TracePacket) -> ConvResult<()> {
        if !self.header_written {
            return Err(ConvError::InvalidState(
                "rtpdump: 写入数据包前必须先写入头部".into(),
            ));
        }

        let len = packet.size();
        if len > MAX_RECORD_PAYLOAD {
            return Err(ConvError::PayloadTooLarge {
                limit: MAX_RECORD_PAYLOAD,
            });
        }
        if len == 0 {
            // plen = 0 在 rtpdump 中表示非 RTP 报文
            warn!("rtpdump: 空载荷, 记录将被视为非 RTP 报文");
        }
        let offset_ms = packet.offset.as_millis_u32()?;

        io.write_u16_be((len + RECORD_HEADER_SIZE) as u16)?; // length
        io.write_u16_be(len as u16)?; // plen
        io.write_u32_be(offset_ms)?; // offset
        io.write_all(&packet.payload)?;

        self.packets_written += 1;
        debug!("rtpdump 数据包: len={}, offset={}ms", len, offset_ms);
        Ok(())
    }

    fn write_trailer(&mut self, io: &mut IoContext) -> ConvResult<()> {
        // rtpdump 没有需要回填的尾部结构
        io.flush()
    }
}
