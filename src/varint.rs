//! 变长整数（LEB128 风格）
//!
//! 每字节 7 位有效数据，低位组在前，除最后一个字节外最高位均置 1。
//! 有符号值先经 zig-zag 折叠：负数映射为奇数、非负数映射为偶数，
//! 使正负方向的小幅 delta 都只占 1~2 字节。

use std::io::{self, Read};

use byteorder::ReadBytesExt;

use crate::common::{CodecError, Result};

/// u64 最多 10 个字节
const MAX_BYTES_U64: usize = 10;

// ── zig-zag ───────────────────────────────────────────────────────────────────

pub fn zigzag_encode32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

pub fn zigzag_decode32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

pub fn zigzag_encode64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

pub fn zigzag_decode64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

// ── 写 ────────────────────────────────────────────────────────────────────────

pub fn write_unsigned(out: &mut Vec<u8>, mut n: u64) {
    while n >= 0x80 {
        out.push((n as u8 & 0x7f) | 0x80);
        n >>= 7;
    }
    out.push(n as u8);
}

pub fn write_signed32(out: &mut Vec<u8>, n: i32) {
    write_unsigned(out, zigzag_encode32(n) as u64);
}

pub fn write_signed64(out: &mut Vec<u8>, n: i64) {
    write_unsigned(out, zigzag_encode64(n));
}

/// 编码后的字节数
pub fn encoded_len(mut n: u64) -> usize {
    let mut len = 1;
    while n >= 0x80 {
        n >>= 7;
        len += 1;
    }
    len
}

// ── 读 ────────────────────────────────────────────────────────────────────────

/// 流提前结束时返回 `UnexpectedEof` 的 I/O 错误
pub fn read_unsigned<R: Read + ?Sized>(input: &mut R) -> Result<u64> {
    let mut value: u64 = 0;
    for i in 0..MAX_BYTES_U64 {
        let byte  = input.read_u8()?;
        let bits  = (byte & 0x7f) as u64;
        let shift = 7 * i as u32;
        // 第 10 字节只允许携带最高 1 位
        if i == MAX_BYTES_U64 - 1 && bits > 1 {
            return Err(CodecError::VarIntOverflow);
        }
        value |= bits << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(CodecError::VarIntOverflow)
}

pub fn read_unsigned32<R: Read + ?Sized>(input: &mut R) -> Result<u32> {
    u32::try_from(read_unsigned(input)?).map_err(|_| CodecError::VarIntOverflow)
}

pub fn read_signed32<R: Read + ?Sized>(input: &mut R) -> Result<i32> {
    Ok(zigzag_decode32(read_unsigned32(input)?))
}

pub fn read_signed64<R: Read + ?Sized>(input: &mut R) -> Result<i64> {
    Ok(zigzag_decode64(read_unsigned(input)?))
}

/// 读一个 `varint(len)` + `len` 字节的块。
/// 缓冲区随实际读到的字节增长，不按声明长度预分配
pub fn read_chunk<R: Read + ?Sized>(input: &mut R) -> Result<Vec<u8>> {
    let len = read_unsigned32(input)? as u64;
    read_exact_len(input, len)
}

/// 从流中读恰好 `len` 字节；流提前结束时返回 `UnexpectedEof`
pub fn read_exact_len<R: Read + ?Sized>(input: &mut R, len: u64) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    input.take(len).read_to_end(&mut buf)?;
    if (buf.len() as u64) < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {len} bytes, stream ended after {}", buf.len()),
        )
        .into());
    }
    Ok(buf)
}

/// 切片版本：声明长度超过剩余字节时在分配前报 `Corrupt`
pub fn take_chunk<'a>(input: &mut &'a [u8]) -> Result<&'a [u8]> {
    let len = read_unsigned32(input)? as usize;
    if len > input.len() {
        return Err(CodecError::Corrupt(format!(
            "chunk declares {len} bytes, {} remain",
            input.len()
        )));
    }
    let (chunk, rest) = input.split_at(len);
    *input = rest;
    Ok(chunk)
}

/// 写一个长度前缀块；空输入只写一个 0
pub fn write_chunk(out: &mut Vec<u8>, bytes: &[u8]) {
    write_unsigned(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn unsigned_bytes(n: u64) -> Vec<u8> {
        let mut out = Vec::new();
        write_unsigned(&mut out, n);
        out
    }

    #[test]
    fn unsigned_layout() {
        assert_eq!(unsigned_bytes(0), vec![0x00]);
        assert_eq!(unsigned_bytes(1), vec![0x01]);
        assert_eq!(unsigned_bytes(127), vec![0x7f]);
        assert_eq!(unsigned_bytes(128), vec![0x80, 0x01]);
        assert_eq!(unsigned_bytes(300), vec![0xac, 0x02]);
        assert_eq!(unsigned_bytes(u64::MAX).len(), 10);
        assert_eq!(encoded_len(300), 2);
        assert_eq!(encoded_len(u64::MAX), 10);
    }

    #[test]
    fn zigzag_folds_sign() {
        assert_eq!(zigzag_encode32(0), 0);
        assert_eq!(zigzag_encode32(-1), 1);
        assert_eq!(zigzag_encode32(1), 2);
        assert_eq!(zigzag_encode32(-2), 3);
        assert_eq!(zigzag_encode32(i32::MIN), u32::MAX);
        assert_eq!(zigzag_encode64(i64::MIN), u64::MAX);
        assert_eq!(zigzag_decode32(u32::MAX), i32::MIN);
        assert_eq!(zigzag_decode64(zigzag_encode64(i64::MAX)), i64::MAX);
    }

    #[test]
    fn extremes_survive() {
        let mut out = Vec::new();
        for v in [0, 1, -1, i32::MAX, i32::MIN] {
            write_signed32(&mut out, v);
        }
        for v in [0, -64, 64, i64::MAX, i64::MIN] {
            write_signed64(&mut out, v);
        }
        write_unsigned(&mut out, u64::MAX);

        let mut cur = out.as_slice();
        for v in [0, 1, -1, i32::MAX, i32::MIN] {
            assert_eq!(read_signed32(&mut cur).unwrap(), v);
        }
        for v in [0, -64, 64, i64::MAX, i64::MIN] {
            assert_eq!(read_signed64(&mut cur).unwrap(), v);
        }
        assert_eq!(read_unsigned(&mut cur).unwrap(), u64::MAX);
        assert!(cur.is_empty());
    }

    #[test]
    fn premature_end_is_io_error() {
        let mut cur: &[u8] = &[0x80, 0x80];
        assert!(matches!(read_unsigned(&mut cur), Err(CodecError::Io(_))));
    }

    #[test]
    fn overflow_is_rejected() {
        let mut cur: &[u8] = &[0xff; 11];
        assert!(matches!(read_unsigned(&mut cur), Err(CodecError::VarIntOverflow)));

        // 2^32 不能装进 u32
        let bytes = unsigned_bytes(1 << 32);
        assert!(matches!(
            read_unsigned32(&mut bytes.as_slice()),
            Err(CodecError::VarIntOverflow)
        ));
    }

    #[test]
    fn chunk_with_empty_payload() {
        let mut out = Vec::new();
        write_chunk(&mut out, b"");
        write_chunk(&mut out, b"abc");
        assert_eq!(out, vec![0, 3, b'a', b'b', b'c']);
        let mut cur = out.as_slice();
        assert!(read_chunk(&mut cur).unwrap().is_empty());
        assert_eq!(read_chunk(&mut cur).unwrap(), b"abc");
    }

    #[test]
    fn oversized_chunk_length_is_rejected_before_allocating() {
        // 声明 u32::MAX 字节，实际只有 2 字节
        let mut bytes = unsigned_bytes(u32::MAX as u64);
        bytes.extend_from_slice(b"ab");

        let mut cur = bytes.as_slice();
        assert!(matches!(take_chunk(&mut cur), Err(CodecError::Corrupt(_))));

        let mut cur = bytes.as_slice();
        assert!(matches!(read_chunk(&mut cur), Err(CodecError::Io(ref e)) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn take_chunk_borrows_from_input() {
        let mut cur: &[u8] = &[2, b'h', b'i', 0, 9];
        assert_eq!(take_chunk(&mut cur).unwrap(), b"hi");
        assert!(take_chunk(&mut cur).unwrap().is_empty());
        assert_eq!(cur, &[9]);
    }
}
