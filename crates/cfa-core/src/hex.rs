//! 十六进制载荷解码.
//!
//! 抓包日志中的帧以 "两位十六进制 + 1 个分隔符" 的记号序列表示,
//! 如 `80 60 12 34` 或 `80,60,12,34`. 解码按固定 3 字符步长前进,
//! 遇到第一个无法解析为两位十六进制的位置即正常结束.

use crate::error::{ConvError, ConvResult};

/// 默认传输单元上限 (字节)
pub const DEFAULT_MAX_PAYLOAD: usize = 1500;

/// 单个记号的步长: 2 位十六进制 + 1 个分隔符
pub const TOKEN_STRIDE: usize = 3;

/// 有界载荷缓冲区
///
/// 写入前检查容量, 超过上限返回 [`ConvError::PayloadTooLarge`],
/// 绝不静默截断.
#[derive(Debug, Clone)]
pub struct PayloadBuffer {
    data: Vec<u8>,
    limit: usize,
}

impl PayloadBuffer {
    /// 以指定上限创建缓冲区
    pub fn new(limit: usize) -> Self {
        Self {
            data: Vec::with_capacity(limit),
            limit,
        }
    }

    /// 追加 1 个字节
    pub fn push(&mut self, byte: u8) -> ConvResult<()> {
        if self.data.len() >= self.limit {
            return Err(ConvError::PayloadTooLarge { limit: self.limit });
        }
        self.data.push(byte);
        Ok(())
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    /// 消耗自身, 返回内部数据
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

/// 单个十六进制字符的值
fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// 将两位十六进制字符组合为 1 个字节
pub fn hex_pair(hi: u8, lo: u8) -> Option<u8> {
    Some((nibble(hi)? << 4) | nibble(lo)?)
}

/// 从 `text` 开头解码十六进制记号, 追加到 `out`
///
/// 返回本次解码的字节数. 文本结束或遇到非十六进制字符属于正常结束;
/// 只有超出缓冲区上限才会返回错误.
pub fn decode_hex_tokens(text: &[u8], out: &mut PayloadBuffer) -> ConvResult<usize> {
    let start_len = out.len();
    let mut pos = 0;
    while let Some(&[hi, lo]) = text.get(pos..pos + 2) {
        let Some(byte) = hex_pair(hi, lo) else {
            break;
        };
        out.push(byte)?;
        pos += TOKEN_STRIDE;
    }
    Ok(out.len() - start_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str) -> ConvResult<Vec<u8>> {
        let mut buf = PayloadBuffer::new(DEFAULT_MAX_PAYLOAD);
        decode_hex_tokens(text.as_bytes(), &mut buf)?;
        Ok(buf.into_vec())
    }

    #[test]
    fn test_解码_空格分隔() {
        assert_eq!(decode("80 60 12 34").unwrap(), vec![0x80, 0x60, 0x12, 0x34]);
    }

    #[test]
    fn test_解码_任意单字符分隔与大小写() {
        assert_eq!(decode("ab,CD-eF:01").unwrap(), vec![0xAB, 0xCD, 0xEF, 0x01]);
    }

    #[test]
    fn test_解码_n个记号得到n字节() {
        for n in 0..64usize {
            let text = (0..n)
                .map(|i| format!("{:02X}", i * 3 % 256))
                .collect::<Vec<_>>()
                .join(" ");
            let bytes = decode(&text).unwrap();
            assert_eq!(bytes.len(), n);
            for (i, b) in bytes.iter().enumerate() {
                assert_eq!(*b as usize, i * 3 % 256);
            }
        }
    }

    #[test]
    fn test_解码_遇到非十六进制停止() {
        assert_eq!(decode("12 34 zz 56").unwrap(), vec![0x12, 0x34]);
        // 单个十六进制字符不足一个记号
        assert_eq!(decode("12 3").unwrap(), vec![0x12]);
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_解码_末尾换行() {
        assert_eq!(decode("de ad\r\n").unwrap(), vec![0xDE, 0xAD]);
    }

    #[test]
    fn test_解码_超过上限报错() {
        let mut buf = PayloadBuffer::new(2);
        let res = decode_hex_tokens(b"01 02 03", &mut buf);
        assert!(matches!(res, Err(ConvError::PayloadTooLarge { limit: 2 })));

        // 恰好等于上限时成功
        let mut buf = PayloadBuffer::new(3);
        assert_eq!(decode_hex_tokens(b"01 02 03", &mut buf).unwrap(), 3);
    }

    #[test]
    fn test_两位十六进制() {
        assert_eq!(hex_pair(b'f', b'F'), Some(0xFF));
        assert_eq!(hex_pair(b'0', b'g'), None);
    }
}
