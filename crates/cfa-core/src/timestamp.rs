//! 抓包时间戳解析.
//!
//! 输入格式为 `YYYY/MM/DD HH:MM:SS[.fraction]`, 日历时间按本地时区
//! (或 UTC) 解释后转换为 POSIX 秒.
//!
//! 小数部分默认按字面整数保存为微秒, 即 `.5` 得到 5 微秒而不是 500000.
//! 这是与既有 rtpdump 工具链保持一致的行为, 需要正确换算时使用
//! [`FractionMode::Microseconds`].

use std::fmt;

use chrono::{DateTime, Local, LocalResult, NaiveDateTime, TimeZone};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ConvError, ConvResult};

/// 日历字段格式 (不含小数部分)
const CALENDAR_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// 每秒微秒数
const MICROS_PER_SEC: i64 = 1_000_000;

/// 日历时间的解释时区
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockZone {
    /// 本地时区
    #[default]
    Local,
    /// UTC, 输出与主机时区无关
    Utc,
}

/// 小数秒的解释方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FractionMode {
    /// 小数位按字面整数作为微秒 (`.5` -> 5)
    #[default]
    Literal,
    /// 按位数换算为微秒 (`.5` -> 500000), 第 6 位之后截断
    Microseconds,
}

/// 绝对时间点
///
/// `seconds` 为 POSIX 秒, 必须能放进 rtpdump 头部的 32 位字段;
/// `micros` 范围为 `0..=999_999`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant {
    seconds: i64,
    micros: u32,
}

impl Instant {
    /// 创建时间点, 校验字段范围
    pub fn new(seconds: i64, micros: u32) -> ConvResult<Self> {
        if u32::try_from(seconds).is_err() {
            return Err(ConvError::Parse(format!(
                "秒数 {} 超出 32 位无符号范围",
                seconds
            )));
        }
        if i64::from(micros) >= MICROS_PER_SEC {
            return Err(ConvError::Parse(format!("微秒数 {} 超出范围", micros)));
        }
        Ok(Self { seconds, micros })
    }

    /// POSIX 秒
    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// 微秒部分
    pub fn micros(&self) -> u32 {
        self.micros
    }

    /// 计算相对 `start` 的经过时间
    ///
    /// 直接相减并处理微秒借位, 不做截断. 结果为负时返回
    /// [`ConvError::NegativeOffset`].
    pub fn elapsed_since(&self, start: &Instant) -> ConvResult<Elapsed> {
        let mut seconds = self.seconds - start.seconds;
        let mut micros = i64::from(self.micros) - i64::from(start.micros);
        if micros < 0 {
            seconds -= 1;
            micros += MICROS_PER_SEC;
        }
        if seconds < 0 {
            return Err(ConvError::NegativeOffset {
                micros: seconds * MICROS_PER_SEC + micros,
            });
        }
        Ok(Elapsed {
            seconds,
            micros: micros as u32,
        })
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.seconds, self.micros)
    }
}

/// 非负的经过时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed {
    /// 整秒
    pub seconds: i64,
    /// 微秒 (0..=999_999)
    pub micros: u32,
}

impl Elapsed {
    /// 零时长
    pub const ZERO: Elapsed = Elapsed {
        seconds: 0,
        micros: 0,
    };

    /// 换算为整毫秒: `seconds * 1000 + micros / 1000`
    pub fn as_millis_u32(&self) -> ConvResult<u32> {
        let millis = self.seconds * 1000 + i64::from(self.micros / 1000);
        u32::try_from(millis).map_err(|_| ConvError::OffsetOverflow { millis })
    }
}

/// 解析时间戳文本
///
/// 失败时返回 [`ConvError::Parse`], 调用方应丢弃该记录.
pub fn parse_timestamp(text: &str, clock: ClockZone, fraction: FractionMode) -> ConvResult<Instant> {
    let text = text.trim();
    let (calendar, digits) = match text.split_once('.') {
        Some((calendar, digits)) => (calendar, Some(digits)),
        None => (text, None),
    };

    let naive = NaiveDateTime::parse_from_str(calendar, CALENDAR_FORMAT)
        .map_err(|e| ConvError::Parse(format!("'{}': {}", text, e)))?;

    let seconds = match clock {
        ClockZone::Utc => naive.and_utc().timestamp(),
        ClockZone::Local => resolve_local(text, Local.from_local_datetime(&naive))?,
    };

    let micros = match digits {
        Some(digits) => parse_fraction(digits, fraction)
            .ok_or_else(|| ConvError::Parse(format!("'{}': 小数部分无效", text)))?,
        None => 0,
    };

    Instant::new(seconds, micros)
}

/// 将本地日历时间的映射结果化为 POSIX 秒
///
/// 夏令时跳过的时刻不存在, 返回 [`ConvError::Parse`];
/// 回拨产生的重复时刻取两者中较早的一个.
fn resolve_local<Tz: TimeZone>(
    text: &str,
    mapped: LocalResult<DateTime<Tz>>,
) -> ConvResult<i64> {
    match mapped {
        LocalResult::Single(dt) => Ok(dt.timestamp()),
        LocalResult::Ambiguous(a, b) => {
            debug!("'{}' 对应两个本地时刻, 取较早者", text);
            Ok(a.timestamp().min(b.timestamp()))
        }
        LocalResult::None => Err(ConvError::Parse(format!("'{}': 本地时间不存在", text))),
    }
}

/// 解析小数位, 非法时返回 `None`
fn parse_fraction(digits: &str, mode: FractionMode) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match mode {
        FractionMode::Literal => {
            let value: u32 = digits.parse().ok()?;
            (i64::from(value) < MICROS_PER_SEC).then_some(value)
        }
        FractionMode::Microseconds => {
            let kept = &digits[..digits.len().min(6)];
            let value: u32 = kept.parse().ok()?;
            Some(value * 10u32.pow(6 - kept.len() as u32))
        }
    }
}
