//! # cfa-core
//!
//! cfa2rtp 核心库, 提供基础类型定义、错误处理和工具函数.
//!
//! 本 crate 不涉及任何 I/O, 只负责把抓包日志中的文本字段
//! (时间戳、十六进制载荷) 解析为结构化数据.

pub mod error;
pub mod hex;
pub mod timestamp;

// 重导出常用类型
pub use error::{ConvError, ConvResult};
pub use hex::{DEFAULT_MAX_PAYLOAD, PayloadBuffer};
pub use timestamp::{ClockZone, Elapsed, FractionMode, Instant};
