//! # cfa2rtp
//!
//! 将文本抓包日志转换为 rtpdump (`#!rtpplay1.0`) 二进制轨迹,
//! 供 rtpplay / Wireshark 等 RTP 分析工具回放.
//!
//! 输入每行形如 `<序号>,<YYYY/MM/DD HH:MM:SS[.fraction]>,<十六进制帧>`,
//! 输出为一个全局头部加每条记录一个数据包.
//!
//! # 快速开始
//!
//! ```rust
//! use cfa2rtp::format::{IoContext, MemoryBackend};
//! use cfa2rtp::{ConvertConfig, convert};
//!
//! let input = "1,2024/01/15 10:00:00.0,00,80,60,12,34\n";
//! let backend = MemoryBackend::new();
//! let mut io = IoContext::new(Box::new(backend.clone()));
//! let stats = convert(input.as_bytes(), &mut io, ConvertConfig::default()).unwrap();
//! assert_eq!(stats.packets, 1);
//! assert!(backend.data().starts_with(b"#!rtpplay1.0 239.255.0.1/5004\n"));
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `cfa-core` | 错误类型、时间戳解析、十六进制解码 |
//! | `cfa-format` | 记录读取、帧定位、rtpdump 封装 |

/// 核心类型与工具
pub use cfa_core as core;

/// 记录读取与轨迹封装
pub use cfa_format as format;

pub mod config;
pub mod convert;

pub use config::ConvertConfig;
pub use convert::{ConvertStats, Converter, Phase, convert};

/// 获取 cfa2rtp 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
