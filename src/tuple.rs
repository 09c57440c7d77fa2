//! tuple: 8-байтовый DIF tuple и его wire-кодек.
//!
//! Раскладка фиксирована стандартом (T10-PI / NVMe PI), все поля big-endian:
//!   [guard u16][app_tag u16][ref_tag u32]
//!
//! Кодек явный (byteorder), а не через layout структуры в памяти.

use byteorder::{BigEndian, ByteOrder};

use crate::consts::{DIF_OFF_APP_TAG, DIF_OFF_GUARD, DIF_OFF_REF_TAG, DIF_TUPLE_SIZE};

/// DIF tuple одного блока.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DifTuple {
    pub guard: u16,
    pub app_tag: u16,
    pub ref_tag: u32,
}

impl DifTuple {
    /// Закодировать в 8 байт (big-endian).
    #[inline]
    pub fn encode(&self) -> [u8; DIF_TUPLE_SIZE] {
        let mut out = [0u8; DIF_TUPLE_SIZE];
        BigEndian::write_u16(&mut out[DIF_OFF_GUARD..DIF_OFF_GUARD + 2], self.guard);
        BigEndian::write_u16(&mut out[DIF_OFF_APP_TAG..DIF_OFF_APP_TAG + 2], self.app_tag);
        BigEndian::write_u32(&mut out[DIF_OFF_REF_TAG..DIF_OFF_REF_TAG + 4], self.ref_tag);
        out
    }

    /// Разобрать 8 байт (big-endian).
    #[inline]
    pub fn decode(buf: &[u8; DIF_TUPLE_SIZE]) -> Self {
        Self {
            guard: BigEndian::read_u16(&buf[DIF_OFF_GUARD..DIF_OFF_GUARD + 2]),
            app_tag: BigEndian::read_u16(&buf[DIF_OFF_APP_TAG..DIF_OFF_APP_TAG + 2]),
            ref_tag: BigEndian::read_u32(&buf[DIF_OFF_REF_TAG..DIF_OFF_REF_TAG + 4]),
        }
    }
}
