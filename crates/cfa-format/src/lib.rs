//! # cfa-format
//!
//! cfa2rtp 格式库: 读取文本抓包日志, 定位 RTP 帧,
//! 并封装为 rtpdump (`#!rtpplay1.0`) 二进制轨迹.

pub mod frame;
pub mod io;
pub mod muxer;
pub mod muxers;
pub mod packet;
pub mod record;

// 重导出常用类型
pub use frame::{FrameLocator, FrameOffset};
pub use io::{IoContext, MemoryBackend};
pub use muxer::Muxer;
pub use muxers::RtpDumpMuxer;
pub use packet::{TraceHeader, TracePacket};
pub use record::{CaptureRecord, RecordReader};
