//! 输出 I/O 抽象层.
//!
//! 为轨迹封装器提供统一的写入接口, 多字节整数一律按大端写出,
//! 与主机字节序无关. 支持文件、标准输出、内存缓冲区等不同后端.

use std::io::{self, BufWriter, Write};
use std::sync::{Arc, Mutex};

use cfa_core::{ConvError, ConvResult};

/// I/O 上下文
///
/// 封装底层写入操作, 记录已写出的字节数. 所有底层错误映射为
/// [`ConvError::Write`].
pub struct IoContext {
    /// 内部 I/O 实现
    inner: Box<dyn IoBackend>,
    /// 已写入字节数
    written: u64,
}

/// I/O 后端 trait
///
/// 实现此 trait 以支持不同的输出目标.
pub trait IoBackend: Send {
    /// 全部写入
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;
    /// 刷新缓冲
    fn flush(&mut self) -> io::Result<()>;
}

impl IoContext {
    /// 从 I/O 后端创建上下文
    pub fn new(backend: Box<dyn IoBackend>) -> Self {
        Self {
            inner: backend,
            written: 0,
        }
    }

    /// 从任意 `Write` 创建带缓冲的上下文
    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self::new(Box::new(WriterBackend::new(writer)))
    }

    /// 从文件路径打开 (写入, 截断已有文件)
    pub fn open_write(path: &str) -> ConvResult<Self> {
        let file = std::fs::File::create(path).map_err(ConvError::Write)?;
        Ok(Self::from_writer(file))
    }

    /// 写入标准输出
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    // ========================
    // 写入方法
    // ========================

    /// 写入全部数据
    pub fn write_all(&mut self, buf: &[u8]) -> ConvResult<()> {
        self.inner.write_all(buf).map_err(ConvError::Write)?;
        self.written += buf.len() as u64;
        Ok(())
    }

    /// 写入 u16 大端
    pub fn write_u16_be(&mut self, v: u16) -> ConvResult<()> {
        self.write_all(&v.to_be_bytes())
    }

    /// 写入 u32 大端
    pub fn write_u32_be(&mut self, v: u32) -> ConvResult<()> {
        self.write_all(&v.to_be_bytes())
    }

    /// 刷新底层缓冲
    pub fn flush(&mut self) -> ConvResult<()> {
        self.inner.flush().map_err(ConvError::Write)
    }

    /// 已写入的字节数
    pub fn position(&self) -> u64 {
        self.written
    }
}

/// 通用 `Write` 后端, 带缓冲
struct WriterBackend<W: Write + Send> {
    writer: BufWriter<W>,
}

impl<W: Write + Send> WriterBackend<W> {
    fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }
}

impl<W: Write + Send> IoBackend for WriterBackend<W> {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.writer.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// 内存缓冲区 I/O 后端
///
/// 用于测试和内存中处理. 克隆得到的句柄共享同一缓冲区,
/// 交给 [`IoContext`] 之后仍可读取写入结果.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    data: Arc<Mutex<Vec<u8>>>,
}

impl MemoryBackend {
    /// 创建空缓冲区
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取已写入数据的副本
    pub fn data(&self) -> Vec<u8> {
        match self.data.lock() {
            Ok(data) => data.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl IoBackend for MemoryBackend {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| io::Error::other("内存缓冲区锁已失效"))?;
        data.extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
