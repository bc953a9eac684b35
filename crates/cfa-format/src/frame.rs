//! RTP/RTCP 帧起始定位.
//!
//! 抓包帧通常带有链路层/IP/UDP 头, RTP 报文从中间某个位置开始.
//! 起始位置可以直接配置 (固定偏移), 也可以通过搜索签名得到.
//! 默认签名 `"80 60"` 是 RTP 版本 2、负载类型 96 报文的前两个字节.

use serde::{Deserialize, Serialize};

use cfa_core::{ConvError, ConvResult};

/// 默认帧起始签名
pub const DEFAULT_SIGNATURE: &str = "80 60";

/// 帧起始定位方式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOffset {
    /// 固定偏移 (十六进制文本中的字符位置), 不检查文本长度
    Fixed(usize),
    /// 搜索签名文本
    Signature(String),
}

impl Default for FrameOffset {
    fn default() -> Self {
        Self::Signature(DEFAULT_SIGNATURE.to_string())
    }
}

/// 帧定位器
///
/// 构造时预编译签名. 形如 `"80 60"` 的记号签名按记号匹配:
/// 十六进制不区分大小写, 分隔符位置匹配任意单个非十六进制字符,
/// 因此也能命中 `80,60`. 其他签名按字面子串搜索.
#[derive(Debug, Clone)]
pub struct FrameLocator {
    mode: FrameOffset,
    tokens: Option<Vec<u8>>,
}

impl FrameLocator {
    /// 创建定位器
    pub fn new(mode: FrameOffset) -> Self {
        let tokens = match &mode {
            FrameOffset::Signature(sig) => compile_tokens(sig.as_bytes()),
            FrameOffset::Fixed(_) => None,
        };
        Self { mode, tokens }
    }

    /// 返回帧在 `text` 中的起始位置
    ///
    /// 签名未命中时返回 [`ConvError::FrameNotFound`].
    pub fn locate(&self, text: &str) -> ConvResult<usize> {
        match &self.mode {
            FrameOffset::Fixed(offset) => Ok(*offset),
            FrameOffset::Signature(sig) => {
                let found = match &self.tokens {
                    Some(tokens) => find_tokens(text.as_bytes(), tokens),
                    None => text.find(sig.as_str()),
                };
                found.ok_or_else(|| ConvError::FrameNotFound(sig.clone()))
            }
        }
    }

    /// 返回从帧起始位置开始的文本字节
    ///
    /// 固定偏移越过文本末尾时得到空切片, 解码结果为 0 字节.
    pub fn frame<'a>(&self, text: &'a str) -> ConvResult<&'a [u8]> {
        let offset = self.locate(text)?;
        Ok(text.as_bytes().get(offset..).unwrap_or(&[]))
    }
}

/// 按给定方式定位帧起始位置
pub fn locate_frame(text: &str, mode: &FrameOffset) -> ConvResult<usize> {
    FrameLocator::new(mode.clone()).locate(text)
}

/// 签名为合法记号序列时返回各记号的字节值
fn compile_tokens(sig: &[u8]) -> Option<Vec<u8>> {
    if sig.len() < 2 || (sig.len() + 1) % 3 != 0 {
        return None;
    }
    let mut tokens = Vec::with_capacity((sig.len() + 1) / 3);
    for chunk in sig.chunks(3) {
        let byte = cfa_core::hex::hex_pair(chunk[0], chunk[1])?;
        if let Some(&sep) = chunk.get(2) {
            if sep.is_ascii_hexdigit() {
                return None;
            }
        }
        tokens.push(byte);
    }
    Some(tokens)
}

/// 在 `text` 中搜索记号序列, 返回首个匹配位置
fn find_tokens(text: &[u8], tokens: &[u8]) -> Option<usize> {
    let span = tokens.len() * 3 - 1;
    if text.len() < span {
        return None;
    }
    (0..=text.len() - span).find(|&start| {
        tokens.iter().enumerate().all(|(k, &want)| {
            let pos = start + k * 3;
            let digits_match = cfa_core::hex::hex_pair(text[pos], text[pos + 1]) == Some(want);
            let sep_ok = k + 1 == tokens.len() || !text[pos + 2].is_ascii_hexdigit();
            digits_match && sep_ok
        })
    })
}
