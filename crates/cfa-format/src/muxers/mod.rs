//! 内置封装器.

pub mod rtpdump;

pub use rtpdump::RtpDumpMuxer;
