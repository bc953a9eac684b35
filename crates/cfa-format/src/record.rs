//! 抓包日志记录读取.
//!
//! 每行格式为 `<序号>,<时间戳>,<十六进制载荷>`, 按前两个逗号切分,
//! 载荷一直延伸到行尾. 字段不足的行产生可恢复错误, 由调用方跳过.

use std::io::BufRead;
use std::str::FromStr;

use cfa_core::{ConvError, ConvResult};
use log::trace;

/// 一行抓包记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRecord {
    /// 输入行号 (从 1 开始)
    pub line: u64,
    /// 抓包序号
    pub sequence: i64,
    /// 时间戳原文
    pub timestamp: String,
    /// 十六进制载荷原文
    pub payload: String,
}

impl CaptureRecord {
    /// 解析一行文本 (不含换行符)
    pub fn parse_line(line: u64, text: &str) -> ConvResult<Self> {
        let malformed = |reason: String| ConvError::MalformedRecord { line, reason };

        let mut fields = text.splitn(3, ',');
        let (Some(sequence), Some(timestamp), Some(payload)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(malformed("字段不足 3 个".into()));
        };

        let sequence = i64::from_str(sequence.trim())
            .map_err(|_| malformed(format!("序号无效: '{}'", sequence)))?;

        Ok(Self {
            line,
            sequence,
            timestamp: timestamp.to_string(),
            payload: payload.to_string(),
        })
    }
}

/// 逐行读取抓包记录
///
/// 作为迭代器产出 `ConvResult<CaptureRecord>`: 格式错误的行产出
/// [`ConvError::MalformedRecord`], 读取失败产出 [`ConvError::Read`]
/// 并结束迭代. 空行直接跳过.
pub struct RecordReader<R> {
    inner: R,
    line: u64,
    buf: Vec<u8>,
    finished: bool,
}

impl<R: BufRead> RecordReader<R> {
    /// 包装输入流
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: 0,
            buf: Vec::new(),
            finished: false,
        }
    }

    /// 已读取的行数
    pub fn line_number(&self) -> u64 {
        self.line
    }

    /// 读取下一行, 去除行尾 `\n` / `\r\n`
    fn next_line(&mut self) -> ConvResult<Option<String>> {
        self.buf.clear();
        let n = self
            .inner
            .read_until(b'\n', &mut self.buf)
            .map_err(ConvError::Read)?;
        if n == 0 {
            return Ok(None);
        }
        self.line += 1;
        let mut end = self.buf.len();
        while end > 0 && matches!(self.buf[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        Ok(Some(String::from_utf8_lossy(&self.buf[..end]).into_owned()))
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = ConvResult<CaptureRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            match self.next_line() {
                Ok(Some(text)) if text.trim().is_empty() => {
                    trace!("第 {} 行为空, 跳过", self.line);
                }
                Ok(Some(text)) => return Some(CaptureRecord::parse_line(self.line, &text)),
                Ok(None) => {
                    self.finished = true;
                    return None;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Read};

    #[test]
    fn test_解析_三个字段() {
        let rec = CaptureRecord::parse_line(1, "7,2024/01/15 10:00:00.0,00,80,60,12").unwrap();
        assert_eq!(rec.sequence, 7);
        assert_eq!(rec.timestamp, "2024/01/15 10:00:00.0");
        // 载荷延伸到行尾, 包括其中的逗号
        assert_eq!(rec.payload, "00,80,60,12");
    }

    #[test]
    fn test_解析_字段不足() {
        for bad in ["1,2024/01/15 10:00:00", "just text", "1"] {
            let err = CaptureRecord::parse_line(4, bad).unwrap_err();
            assert!(matches!(err, ConvError::MalformedRecord { line: 4, .. }));
            assert!(!err.is_fatal());
        }
    }

    #[test]
    fn test_解析_序号无效() {
        let err = CaptureRecord::parse_line(2, "No.,Time,Data").unwrap_err();
        assert!(matches!(err, ConvError::MalformedRecord { line: 2, .. }));
    }

    #[test]
    fn test_读取器_跳过空行并记录行号() {
        let input = "1,t1,80 60\r\n\n   \n2,t2,80 61\nbad\n";
        let results: Vec<_> = RecordReader::new(Cursor::new(input)).collect();
        assert_eq!(results.len(), 3);

        let first = results[0].as_ref().unwrap();
        assert_eq!((first.line, first.payload.as_str()), (1, "80 60"));
        let second = results[1].as_ref().unwrap();
        assert_eq!((second.line, second.sequence), (4, 2));
        assert!(matches!(
            results[2],
            Err(ConvError::MalformedRecord { line: 5, .. })
        ));
    }

    #[test]
    fn test_读取器_最后一行无换行() {
        let mut reader = RecordReader::new(Cursor::new("9,t,ab cd"));
        let rec = reader.next().unwrap().unwrap();
        assert_eq!(rec.payload, "ab cd");
        assert!(reader.next().is_none());
        assert_eq!(reader.line_number(), 1);
    }

    /// 读取时总是失败的输入
    struct FailingRead;

    impl Read for FailingRead {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("设备错误"))
        }
    }

    #[test]
    fn test_读取器_读取失败后结束() {
        let mut reader = RecordReader::new(io::BufReader::new(FailingRead));
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, ConvError::Read(_)));
        assert!(err.is_fatal());
        assert!(reader.next().is_none());
    }
}
