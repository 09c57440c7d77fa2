//! ctx: DIF контекст (геометрия блока, тип DIF, расположение tuple и маска проверок).
//!
//! Контекст строится один раз валидирующим конструктором и дальше неизменяем
//! (поля приватные, только аксессоры). Буферами не владеет, поэтому Copy и
//! свободно шарится между потоками.

use anyhow::{anyhow, Result};
use std::fmt;

use crate::consts::{
    DIF_FLAGS_APPTAG_CHECK, DIF_FLAGS_GUARD_CHECK, DIF_FLAGS_REFTAG_CHECK, DIF_TUPLE_SIZE,
};

/// Тип защиты (T10 PI type).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifType {
    Disable = 0,
    Type1 = 1,
    Type2 = 2,
    Type3 = 3,
}

impl DifType {
    pub fn to_u32(self) -> u32 {
        self as u32
    }

    /// Разобрать сырое значение. Всё вне 0..=3: None.
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            0 => Some(DifType::Disable),
            1 => Some(DifType::Type1),
            2 => Some(DifType::Type2),
            3 => Some(DifType::Type3),
            _ => None,
        }
    }
}

impl fmt::Display for DifType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DifType::Disable => write!(f, "disable"),
            DifType::Type1 => write!(f, "type1"),
            DifType::Type2 => write!(f, "type2"),
            DifType::Type3 => write!(f, "type3"),
        }
    }
}

/// Где внутри метаданных блока лежит tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifLocation {
    /// Первые 8 байт метаданных.
    Start,
    /// Последние 8 байт метаданных (md_size - 8).
    End,
}

impl fmt::Display for DifLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DifLocation::Start => write!(f, "start"),
            DifLocation::End => write!(f, "end"),
        }
    }
}

/// Маска проверок (биты 26..=28, как в PRCHK NVMe).
/// Прочие биты не трогаем и не интерпретируем.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct DifFlags(u32);

impl DifFlags {
    pub const REFTAG_CHECK: u32 = DIF_FLAGS_REFTAG_CHECK;
    pub const APPTAG_CHECK: u32 = DIF_FLAGS_APPTAG_CHECK;
    pub const GUARD_CHECK: u32 = DIF_FLAGS_GUARD_CHECK;

    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Все три проверки.
    #[inline]
    pub const fn all_checks() -> Self {
        Self(Self::REFTAG_CHECK | Self::APPTAG_CHECK | Self::GUARD_CHECK)
    }

    #[inline]
    pub const fn from_bits(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn with(self, flag: u32) -> Self {
        Self(self.0 | flag)
    }

    #[inline]
    pub const fn check_ref_tag(self) -> bool {
        self.0 & Self::REFTAG_CHECK != 0
    }

    #[inline]
    pub const fn check_app_tag(self) -> bool {
        self.0 & Self::APPTAG_CHECK != 0
    }

    #[inline]
    pub const fn check_guard(self) -> bool {
        self.0 & Self::GUARD_CHECK != 0
    }
}

impl fmt::Display for DifFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.check_guard() {
            parts.push("guard");
        }
        if self.check_app_tag() {
            parts.push("apptag");
        }
        if self.check_ref_tag() {
            parts.push("reftag");
        }
        if parts.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", parts.join("|"))
        }
    }
}

/// Неизменяемый DIF контекст.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifCtx {
    block_size: u32,
    md_size: u32,
    guard_interval: u32,
    md_interleave: bool,
    dif_loc: DifLocation,
    dif_type: DifType,
    dif_flags: DifFlags,
    init_ref_tag: u32,
    apptag_mask: u16,
    app_tag: u16,
}

/// Байт данных в блоке для данной геометрии.
/// Interleaved: block_size включает метаданные; separate (DIX): block_size = только данные.
#[inline]
pub(crate) fn data_size_for(block_size: u32, md_size: u32, md_interleave: bool) -> u32 {
    if md_interleave {
        block_size.saturating_sub(md_size)
    } else {
        block_size
    }
}

impl DifCtx {
    /// Построить контекст. Guard покрывает всю data-область блока;
    /// частичный guard: через DifCtxBuilder.
    ///
    /// При md_interleave=true block_size включает метаданные (520 = 512 + 8),
    /// при md_interleave=false block_size: размер блока данных (512), метаданные
    /// лежат отдельно по md_size байт на блок.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        block_size: u32,
        md_size: u32,
        md_interleave: bool,
        dif_loc: DifLocation,
        dif_type: DifType,
        dif_flags: DifFlags,
        init_ref_tag: u32,
        apptag_mask: u16,
        app_tag: u16,
    ) -> Result<Self> {
        Self::with_guard_interval(
            block_size,
            md_size,
            md_interleave,
            dif_loc,
            dif_type,
            dif_flags,
            init_ref_tag,
            apptag_mask,
            app_tag,
            data_size_for(block_size, md_size, md_interleave),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn with_guard_interval(
        block_size: u32,
        md_size: u32,
        md_interleave: bool,
        dif_loc: DifLocation,
        dif_type: DifType,
        dif_flags: DifFlags,
        init_ref_tag: u32,
        apptag_mask: u16,
        app_tag: u16,
        guard_interval: u32,
    ) -> Result<Self> {
        if md_interleave && block_size <= md_size {
            return Err(anyhow!(
                "invalid DIF context: block_size ({}) must be greater than md_size ({})",
                block_size,
                md_size
            ));
        }
        if block_size == 0 {
            return Err(anyhow!("invalid DIF context: block_size must be non-zero"));
        }
        if md_size == 0 && dif_type != DifType::Disable {
            return Err(anyhow!(
                "invalid DIF context: dif_type={} requires metadata (md_size=0)",
                dif_type
            ));
        }
        if dif_type != DifType::Disable && (md_size as usize) < DIF_TUPLE_SIZE {
            return Err(anyhow!(
                "invalid DIF context: md_size ({}) must be >= {} when DIF is enabled",
                md_size,
                DIF_TUPLE_SIZE
            ));
        }
        let data_size = data_size_for(block_size, md_size, md_interleave);
        if guard_interval == 0 || guard_interval > data_size {
            return Err(anyhow!(
                "invalid DIF context: guard_interval ({}) must be in 1..={}",
                guard_interval,
                data_size
            ));
        }

        Ok(Self {
            block_size,
            md_size,
            guard_interval,
            md_interleave,
            dif_loc,
            dif_type,
            dif_flags,
            init_ref_tag,
            apptag_mask,
            app_tag,
        })
    }

    // ---------- accessors ----------

    #[inline]
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    #[inline]
    pub fn md_size(&self) -> u32 {
        self.md_size
    }

    /// Байт данных в блоке (без метаданных), с учётом раскладки.
    #[inline]
    pub fn data_size(&self) -> u32 {
        data_size_for(self.block_size, self.md_size, self.md_interleave)
    }

    #[inline]
    pub fn guard_interval(&self) -> u32 {
        self.guard_interval
    }

    #[inline]
    pub fn md_interleave(&self) -> bool {
        self.md_interleave
    }

    #[inline]
    pub fn dif_loc(&self) -> DifLocation {
        self.dif_loc
    }

    #[inline]
    pub fn dif_type(&self) -> DifType {
        self.dif_type
    }

    #[inline]
    pub fn dif_flags(&self) -> DifFlags {
        self.dif_flags
    }

    #[inline]
    pub fn init_ref_tag(&self) -> u32 {
        self.init_ref_tag
    }

    #[inline]
    pub fn apptag_mask(&self) -> u16 {
        self.apptag_mask
    }

    #[inline]
    pub fn app_tag(&self) -> u16 {
        self.app_tag
    }

    #[inline]
    pub fn dif_enabled(&self) -> bool {
        self.dif_type != DifType::Disable
    }

    /// Смещение tuple внутри метаданных блока.
    #[inline]
    pub fn dif_offset(&self) -> usize {
        match self.dif_loc {
            DifLocation::Start => 0,
            DifLocation::End => (self.md_size as usize).saturating_sub(DIF_TUPLE_SIZE),
        }
    }

    /// Ожидаемый ref_tag блока с индексом `index`.
    /// Type 1/2: init_ref_tag + index (wrapping), Type 3: init_ref_tag как есть.
    #[inline]
    pub fn ref_tag_for(&self, index: u32) -> u32 {
        match self.dif_type {
            DifType::Type3 => self.init_ref_tag,
            _ => self.init_ref_tag.wrapping_add(index),
        }
    }
}

impl fmt::Display for DifCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DifCtx {{ \
             block_size: {}, \
             md_size: {}, \
             guard_interval: {}, \
             md_interleave: {}, \
             dif_loc: {}, \
             dif_type: {}, \
             checks: {}, \
             init_ref_tag: {}, \
             app_tag: {:#06x}, \
             apptag_mask: {:#06x} \
             }}",
            self.block_size,
            self.md_size,
            self.guard_interval,
            self.md_interleave,
            self.dif_loc,
            self.dif_type,
            self.dif_flags,
            self.init_ref_tag,
            self.app_tag,
            self.apptag_mask,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(block_size: u32, md_size: u32, ty: DifType) -> Result<DifCtx> {
        DifCtx::new(
            block_size,
            md_size,
            true,
            DifLocation::Start,
            ty,
            DifFlags::all_checks(),
            0,
            0,
            0,
        )
    }

    #[test]
    fn valid_520_8() {
        let c = ctx(520, 8, DifType::Type1).expect("valid ctx");
        assert_eq!(c.data_size(), 512);
        assert_eq!(c.guard_interval(), 512);
        assert_eq!(c.dif_offset(), 0);
        assert!(c.dif_enabled());
    }

    #[test]
    fn rejects_block_not_larger_than_md() {
        assert!(ctx(8, 8, DifType::Type1).is_err());
        assert!(ctx(4, 8, DifType::Type1).is_err());
    }

    #[test]
    fn rejects_small_md_when_enabled() {
        assert!(ctx(516, 4, DifType::Type1).is_err());
        assert!(ctx(512, 0, DifType::Type3).is_err());
        // без DIF метаданные любого размера допустимы
        assert!(ctx(516, 4, DifType::Disable).is_ok());
        assert!(ctx(512, 0, DifType::Disable).is_ok());
    }

    #[test]
    fn dif_offset_end() {
        let c = DifCtx::new(
            4096 + 64,
            64,
            true,
            DifLocation::End,
            DifType::Type1,
            DifFlags::all_checks(),
            0,
            0,
            0,
        )
        .unwrap();
        assert_eq!(c.dif_offset(), 56);
    }

    #[test]
    fn ref_tag_per_type() {
        let mk = |ty| {
            DifCtx::new(520, 8, true, DifLocation::Start, ty, DifFlags::all_checks(), 100, 0, 0)
                .unwrap()
        };
        assert_eq!(mk(DifType::Type1).ref_tag_for(5), 105);
        assert_eq!(mk(DifType::Type2).ref_tag_for(5), 105);
        assert_eq!(mk(DifType::Type3).ref_tag_for(5), 100);
    }

    #[test]
    fn ref_tag_wraps() {
        let c = DifCtx::new(
            520,
            8,
            true,
            DifLocation::Start,
            DifType::Type1,
            DifFlags::all_checks(),
            u32::MAX,
            0,
            0,
        )
        .unwrap();
        assert_eq!(c.ref_tag_for(1), 0);
    }

    #[test]
    fn separate_block_size_is_data_only() {
        let mk = |bs, md, interleave| {
            DifCtx::new(
                bs,
                md,
                interleave,
                DifLocation::End,
                DifType::Type1,
                DifFlags::all_checks(),
                0,
                0,
                0,
            )
        };
        let c = mk(512, 8, false).unwrap();
        assert_eq!(c.block_size(), 512);
        assert_eq!(c.data_size(), 512);
        assert_eq!(c.guard_interval(), 512);

        // метаданные больше блока данных допустимы только для DIX
        assert_eq!(mk(8, 64, false).unwrap().data_size(), 8);
        assert!(mk(8, 64, true).is_err());
        assert!(mk(0, 8, false).is_err());
    }

    #[test]
    fn dif_type_from_u32() {
        assert_eq!(DifType::from_u32(2), Some(DifType::Type2));
        assert_eq!(DifType::from_u32(4), None);
        assert_eq!(DifType::Type3.to_u32(), 3);
    }

    #[test]
    fn flags_predicates_keep_foreign_bits() {
        let f = DifFlags::from_bits(DifFlags::GUARD_CHECK | 0x1);
        assert!(f.check_guard());
        assert!(!f.check_app_tag());
        assert!(!f.check_ref_tag());
        assert_eq!(f.bits() & 0x1, 0x1);
        assert_eq!(DifFlags::all_checks().bits(), 0x1C00_0000);
    }
}
