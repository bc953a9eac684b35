//! 转换流程编排.
//!
//! 状态机: `AwaitingHeader -> Streaming -> Done`.
//!
//! 每行记录依次经过时间戳解析、帧定位、十六进制解码. 第一条完整可解码的
//! 记录触发头部写入并确定起始时间, 之后每条记录写出一个数据包.
//! 可恢复错误只丢弃当前行; 致命错误 (写入失败、地址无效等) 立即终止.

use std::io::BufRead;

use log::{debug, info, warn};
use serde::Serialize;

use cfa_core::hex::decode_hex_tokens;
use cfa_core::timestamp::parse_timestamp;
use cfa_core::{ConvError, ConvResult, Instant, PayloadBuffer};
use cfa_format::{
    CaptureRecord, FrameLocator, IoContext, Muxer, RecordReader, RtpDumpMuxer, TraceHeader,
    TracePacket,
};

use crate::config::ConvertConfig;

/// 转换阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// 等待第一条可解码记录
    AwaitingHeader,
    /// 头部已写出, 逐条写入数据包
    Streaming,
    /// 输入结束
    Done,
}

/// 转换统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConvertStats {
    /// 读取的非空行数
    pub records: u64,
    /// 写出的数据包数
    pub packets: u64,
    /// 写出的载荷总字节数
    pub payload_bytes: u64,
    /// 字段不足或序号无效
    pub skipped_malformed: u64,
    /// 时间戳无效
    pub skipped_timestamp: u64,
    /// 签名未命中
    pub skipped_frame_not_found: u64,
    /// 载荷超过上限
    pub skipped_too_large: u64,
    /// 时间早于起始时间或偏移溢出
    pub skipped_out_of_order: u64,
}

impl ConvertStats {
    /// 跳过的记录总数
    pub fn skipped(&self) -> u64 {
        self.skipped_malformed
            + self.skipped_timestamp
            + self.skipped_frame_not_found
            + self.skipped_too_large
            + self.skipped_out_of_order
    }

    fn record_skip(&mut self, err: &ConvError) {
        match err {
            ConvError::MalformedRecord { .. } => self.skipped_malformed += 1,
            ConvError::Parse(_) => self.skipped_timestamp += 1,
            ConvError::FrameNotFound(_) => self.skipped_frame_not_found += 1,
            ConvError::PayloadTooLarge { .. } => self.skipped_too_large += 1,
            ConvError::NegativeOffset { .. } | ConvError::OffsetOverflow { .. } => {
                self.skipped_out_of_order += 1
            }
            _ => {}
        }
    }
}

/// 转换器
///
/// 持有整个运行期间的转换状态, 只在本结构内部修改.
pub struct Converter {
    config: ConvertConfig,
    locator: FrameLocator,
    muxer: Box<dyn Muxer>,
    phase: Phase,
    /// 第一条可解码记录的时间, 即轨迹起始时间
    start: Option<Instant>,
    stats: ConvertStats,
}

impl Converter {
    /// 创建输出 rtpdump 的转换器
    pub fn new(config: ConvertConfig) -> ConvResult<Self> {
        Self::with_muxer(config, RtpDumpMuxer::create()?)
    }

    /// 使用指定封装器创建转换器
    pub fn with_muxer(config: ConvertConfig, muxer: Box<dyn Muxer>) -> ConvResult<Self> {
        config.validate()?;
        let locator = FrameLocator::new(config.frame_offset.clone());
        Ok(Self {
            config,
            locator,
            muxer,
            phase: Phase::AwaitingHeader,
            start: None,
            stats: ConvertStats::default(),
        })
    }

    /// 当前阶段
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 是否已写出头部
    pub fn header_written(&self) -> bool {
        self.start.is_some()
    }

    /// 轨迹起始时间
    pub fn start_instant(&self) -> Option<Instant> {
        self.start
    }

    /// 当前统计
    pub fn stats(&self) -> &ConvertStats {
        &self.stats
    }

    /// 处理一条记录
    ///
    /// 返回可恢复错误时状态保持不变且没有任何输出.
    pub fn process_record(&mut self, io: &mut IoContext, record: &CaptureRecord) -> ConvResult<()> {
        if self.phase == Phase::Done {
            return Err(ConvError::InvalidState("转换已结束".into()));
        }
        debug!("记录 #{} (第 {} 行)", record.sequence, record.line);

        let instant = parse_timestamp(&record.timestamp, self.config.clock, self.config.fraction)?;
        debug!("时间戳 {} -> {}", record.timestamp.trim(), instant);

        let frame = self.locator.frame(&record.payload)?;
        let mut payload = PayloadBuffer::new(self.config.max_payload);
        let len = decode_hex_tokens(frame, &mut payload)?;
        debug!(
            "帧起始 '{}...', 解码 {} 字节",
            String::from_utf8_lossy(&frame[..frame.len().min(5)]),
            len
        );

        let start = match self.start {
            Some(start) => start,
            None => {
                let header = TraceHeader {
                    address: self.config.address.clone(),
                    port: self.config.port,
                    start: instant,
                };
                self.muxer.write_header(io, &header)?;
                self.start = Some(instant);
                self.phase = Phase::Streaming;
                instant
            }
        };

        let offset = instant.elapsed_since(&start)?;
        let packet = TracePacket::new(payload.into_vec(), offset);
        self.muxer.write_packet(io, &packet)?;

        self.stats.packets += 1;
        self.stats.payload_bytes += len as u64;
        Ok(())
    }

    /// 处理整个输入流
    ///
    /// 可恢复错误记录日志后继续; 遇到致命错误立即返回.
    pub fn run<R: BufRead>(&mut self, input: R, io: &mut IoContext) -> ConvResult<()> {
        let mut reader = RecordReader::new(input);
        while let Some(item) = reader.next() {
            let result = match item {
                Ok(record) => {
                    self.stats.records += 1;
                    self.process_record(io, &record)
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    self.stats.records += 1;
                    Err(e)
                }
            };
            if let Err(e) = result {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!("第 {} 行已跳过: {}", reader.line_number(), e);
                self.stats.record_skip(&e);
            }
        }
        Ok(())
    }

    /// 结束转换, 刷新输出并返回统计
    pub fn finish(&mut self, io: &mut IoContext) -> ConvResult<ConvertStats> {
        if self.phase == Phase::Done {
            return Err(ConvError::InvalidState("转换已结束".into()));
        }
        if self.header_written() {
            self.muxer.write_trailer(io)?;
        } else {
            io.flush()?;
            warn!("没有可解码的记录, 未生成任何输出");
        }
        self.phase = Phase::Done;
        info!(
            "转换完成: {} 行, 写出 {} 个数据包 ({} 字节载荷), 跳过 {} 行",
            self.stats.records,
            self.stats.packets,
            self.stats.payload_bytes,
            self.stats.skipped()
        );
        Ok(self.stats.clone())
    }
}

/// 将整个输入流转换为 rtpdump 轨迹
pub fn convert<R: BufRead>(
    input: R,
    io: &mut IoContext,
    config: ConvertConfig,
) -> ConvResult<ConvertStats> {
    let mut converter = Converter::new(config)?;
    converter.run(input, io)?;
    converter.finish(io)
}
