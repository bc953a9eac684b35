//! 端到端集成测试: 文本抓包日志 → rtpdump 轨迹.
//!
//! 测试流程: 构造/读取抓包日志 → 转换 → 按 rtpdump 结构解析输出 → 验证

use std::io::Cursor;

use chrono::{Local, TimeZone};

use cfa2rtp::core::{ClockZone, ConvError, FractionMode};
use cfa2rtp::format::io::IoBackend;
use cfa2rtp::format::{FrameOffset, IoContext, MemoryBackend};
use cfa2rtp::{ConvertConfig, ConvertStats, convert};

const SAMPLE: &str = include_str!("../data/samples/capture.csv");

/// 样本中 RTP 报文前的以太网/IP/UDP 头部 (42 字节, 每字节 3 个字符)
const SAMPLE_FRAME_OFFSET: usize = 42 * 3;

/// 解析后的 rtpdump 轨迹
#[derive(Debug, PartialEq)]
struct Dump {
    magic: String,
    start_sec: u32,
    start_usec: u32,
    source: [u8; 4],
    port: u16,
    padding: u16,
    records: Vec<DumpRecord>,
}

#[derive(Debug, PartialEq)]
struct DumpRecord {
    length: u16,
    plen: u16,
    offset_ms: u32,
    payload: Vec<u8>,
}

/// 辅助: 按 rtpdump 结构解析输出
fn parse_dump(data: &[u8]) -> Dump {
    let nl = data.iter().position(|&b| b == b'\n').expect("缺少魔数行");
    let magic = String::from_utf8(data[..nl].to_vec()).unwrap();
    let hdr = &data[nl + 1..nl + 17];
    let mut rest = &data[nl + 17..];

    let mut records = Vec::new();
    while !rest.is_empty() {
        let length = u16::from_be_bytes([rest[0], rest[1]]);
        let plen = u16::from_be_bytes([rest[2], rest[3]]);
        let offset_ms = u32::from_be_bytes([rest[4], rest[5], rest[6], rest[7]]);
        let payload = rest[8..length as usize].to_vec();
        records.push(DumpRecord {
            length,
            plen,
            offset_ms,
            payload,
        });
        rest = &rest[length as usize..];
    }

    Dump {
        magic,
        start_sec: u32::from_be_bytes([hdr[0], hdr[1], hdr[2], hdr[3]]),
        start_usec: u32::from_be_bytes([hdr[4], hdr[5], hdr[6], hdr[7]]),
        source: [hdr[8], hdr[9], hdr[10], hdr[11]],
        port: u16::from_be_bytes([hdr[12], hdr[13]]),
        padding: u16::from_be_bytes([hdr[14], hdr[15]]),
        records,
    }
}

/// 辅助: 在内存中完成一次转换
fn run(input: &str, config: ConvertConfig) -> (ConvertStats, Vec<u8>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let backend = MemoryBackend::new();
    let mut io = IoContext::new(Box::new(backend.clone()));
    let stats = convert(Cursor::new(input), &mut io, config).unwrap();
    (stats, backend.data())
}

fn utc_config() -> ConvertConfig {
    ConvertConfig {
        clock: ClockZone::Utc,
        ..Default::default()
    }
}

/// 写入始终失败的后端
struct FailingBackend;

impl IoBackend for FailingBackend {
    fn write_all(&mut self, _buf: &[u8]) -> std::io::Result<()> {
        Err(std::io::Error::other("磁盘已满"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_单条记录_本地时区() {
    let (stats, data) = run(
        "1,2024/01/15 10:00:00.0,00,80,60,12,34,AB,CD\n",
        ConvertConfig::default(),
    );
    assert_eq!(stats.packets, 1);

    let expected_sec = Local
        .with_ymd_and_hms(2024, 1, 15, 10, 0, 0)
        .earliest()
        .unwrap()
        .timestamp() as u32;

    let dump = parse_dump(&data);
    assert_eq!(dump.magic, "#!rtpplay1.0 239.255.0.1/5004");
    assert_eq!(dump.start_sec, expected_sec);
    assert_eq!(dump.start_usec, 0);
    assert_eq!(dump.source, [239, 255, 0, 1]);
    assert_eq!(dump.port, 5004);
    assert_eq!(dump.padding, 0);
    assert_eq!(
        dump.records,
        vec![DumpRecord {
            length: 14,
            plen: 6,
            offset_ms: 0,
            payload: vec![0x80, 0x60, 0x12, 0x34, 0xAB, 0xCD],
        }]
    );
}

#[test]
fn test_样本_字面小数秒() {
    let (stats, data) = run(SAMPLE, utc_config());
    assert_eq!(stats.records, 6);
    assert_eq!(stats.packets, 4);
    assert_eq!(stats.skipped_malformed, 1);
    assert_eq!(stats.skipped_frame_not_found, 1);

    let dump = parse_dump(&data);
    assert_eq!(dump.start_sec, 1_705_312_800);
    let offsets: Vec<u32> = dump.records.iter().map(|r| r.offset_ms).collect();
    assert_eq!(offsets, vec![0, 0, 0, 1000]);

    for (i, record) in dump.records.iter().enumerate() {
        assert_eq!(record.plen, 16);
        assert_eq!(record.length, 24);
        assert_eq!(&record.payload[..2], &[0x80, 0x60]);
        assert_eq!(record.payload[3], i as u8 + 1, "RTP 序号");
    }
    assert_eq!(data.windows(12).filter(|w| *w == b"#!rtpplay1.0".as_slice()).count(), 1);
}

#[test]
fn test_样本_按位数换算小数秒() {
    let config = ConvertConfig {
        fraction: FractionMode::Microseconds,
        ..utc_config()
    };
    let (_, data) = run(SAMPLE, config);
    let offsets: Vec<u32> = parse_dump(&data).records.iter().map(|r| r.offset_ms).collect();
    assert_eq!(offsets, vec![0, 20, 40, 1000]);
}

#[test]
fn test_样本_固定偏移() {
    let config = ConvertConfig {
        frame_offset: FrameOffset::Fixed(SAMPLE_FRAME_OFFSET),
        ..utc_config()
    };
    let (stats, data) = run(SAMPLE, config);
    // 固定偏移不校验签名: ARP 帧长度不足偏移, 得到空载荷
    assert_eq!(stats.packets, 5);
    assert_eq!(stats.skipped_frame_not_found, 0);

    let dump = parse_dump(&data);
    let plens: Vec<u16> = dump.records.iter().map(|r| r.plen).collect();
    assert_eq!(plens, vec![16, 16, 0, 16, 16]);
    assert_eq!(&dump.records[0].payload[..2], &[0x80, 0x60]);
}

#[test]
fn test_重复运行输出一致() {
    let (_, first) = run(SAMPLE, utc_config());
    let (_, second) = run(SAMPLE, utc_config());
    assert_eq!(first, second);
}

#[test]
fn test_无可解码记录时无输出() {
    let input = "seq,time,data\n1,2024/01/15 10:00:00,00 11 22\n2,garbage,80 60\n";
    let (stats, data) = run(input, utc_config());
    assert!(data.is_empty());
    assert_eq!(stats.packets, 0);
    assert_eq!(stats.skipped(), 3);
}

#[test]
fn test_空输入() {
    let (stats, data) = run("", utc_config());
    assert!(data.is_empty());
    assert_eq!(stats, ConvertStats::default());
}

#[test]
fn test_自定义地址与端口() {
    let config = ConvertConfig {
        address: "10.20.30.40".into(),
        port: 6970,
        ..utc_config()
    };
    let (_, data) = run("1,2024/01/15 10:00:00.5,80 60\n", config);
    let dump = parse_dump(&data);
    assert_eq!(dump.magic, "#!rtpplay1.0 10.20.30.40/6970");
    assert_eq!(dump.source, [10, 20, 30, 40]);
    assert_eq!(dump.port, 6970);
    assert_eq!(dump.start_usec, 5);
}

#[test]
fn test_文件输出与内存输出一致() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.rtp");

    let mut io = IoContext::open_write(path.to_str().unwrap()).unwrap();
    convert(Cursor::new(SAMPLE), &mut io, utc_config()).unwrap();
    drop(io);

    let (_, expected) = run(SAMPLE, utc_config());
    assert_eq!(std::fs::read(&path).unwrap(), expected);
}

#[test]
fn test_写入失败为致命错误() {
    let mut io = IoContext::new(Box::new(FailingBackend));
    let err = convert(Cursor::new(SAMPLE), &mut io, utc_config()).unwrap_err();
    assert!(matches!(err, ConvError::Write(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_乱序记录被丢弃() {
    let input = "\
1,2024/01/15 10:00:05,80 60 01
2,2024/01/15 10:00:04,80 60 02
3,2024/01/15 10:00:06,80 60 03
";
    let (stats, data) = run(input, utc_config());
    assert_eq!(stats.packets, 2);
    assert_eq!(stats.skipped_out_of_order, 1);
    let dump = parse_dump(&data);
    let offsets: Vec<u32> = dump.records.iter().map(|r| r.offset_ms).collect();
    assert_eq!(offsets, vec![0, 1000]);
    assert_eq!(dump.records[1].payload, vec![0x80, 0x60, 0x03]);
}
