//! crc16: CRC-16/T10-DIF, guard checksum для DIF.
//!
//! Параметры: poly = 0x8BB7, init = 0, без отражения, без финального xor.
//! Check value ("123456789") = 0xD0DB.
//!
//! Сам алгоритм берём из crate `crc` (CRC_16_T10_DIF, табличная реализация).
//! Для блоков, разрезанных между несколькими буферами, используется Digest:
//! куски подаются по порядку через update(), результат через finalize().

use crc::{Crc, Digest, CRC_16_T10_DIF};

/// Общий экземпляр алгоритма (таблица строится в compile time).
pub static CRC16_T10DIF: Crc<u16> = Crc::<u16>::new(&CRC_16_T10_DIF);

/// Guard по непрерывному срезу.
#[inline]
pub fn crc16_t10dif(buf: &[u8]) -> u16 {
    CRC16_T10DIF.checksum(buf)
}

/// Потоковый guard для данных, приходящих кусками.
#[inline]
pub fn guard_digest() -> Digest<'static, u16> {
    CRC16_T10DIF.digest()
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLY: u16 = 0x8BB7;

    /// Побитовая эталонная реализация для сверки.
    fn crc16_bitwise(buf: &[u8]) -> u16 {
        let mut crc: u16 = 0;
        for &b in buf {
            crc ^= (b as u16) << 8;
            for _ in 0..8 {
                crc = if crc & 0x8000 != 0 {
                    (crc << 1) ^ POLY
                } else {
                    crc << 1
                };
            }
        }
        crc
    }

    #[test]
    fn check_value() {
        assert_eq!(crc16_t10dif(b"123456789"), 0xD0DB);
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(crc16_t10dif(&[]), 0);
        assert_eq!(guard_digest().finalize(), 0);
    }

    #[test]
    fn matches_bitwise_reference() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i.wrapping_mul(31) ^ (i >> 3)) as u8).collect();
        assert_eq!(crc16_t10dif(&data), crc16_bitwise(&data));
    }

    #[test]
    fn digest_in_pieces_equals_whole() {
        let data: Vec<u8> = (0..517u32).map(|i| (i * 7) as u8).collect();
        let whole = crc16_t10dif(&data);
        for split in [1usize, 2, 100, 256, 516] {
            let mut d = guard_digest();
            d.update(&data[..split]);
            d.update(&[]);
            d.update(&data[split..]);
            assert_eq!(d.finalize(), whole, "split at {split}");
        }
    }

    #[test]
    fn zeroes_give_zero() {
        // init=0 и нулевые данные: CRC остаётся нулём.
        assert_eq!(crc16_t10dif(&[0u8; 512]), 0);
    }
}
