//! engine: generate / verify / copy / inject поверх BlockWalker + SglCursor.
//!
//! Разделение по подмодулям:
//! - generate.rs: dif_generate (interleaved), dix_generate (separate md).
//! - verify.rs  : dif_verify, dix_verify; первая ошибка останавливает проход.
//! - copy.rs    : dif_generate_copy / dif_verify_copy (scattered data <-> bounce).
//! - inject.rs  : dif_inject_error / dix_inject_error (детерминированный bit flip).
//!
//! Общие хелперы (ожидаемый tuple, сравнение, guard по диапазону): здесь.

pub mod copy;
pub mod generate;
pub mod inject;
pub mod verify;

use anyhow::{anyhow, Result};

use crate::consts::{DIF_APPTAG_ERROR, DIF_GUARD_ERROR, DIF_REFTAG_ERROR, DIF_TUPLE_SIZE};
use crate::crc16::{crc16_t10dif, guard_digest};
use crc::Digest;
use crate::ctx::{DifCtx, DifType};
use crate::error::DifError;
use crate::sgl::SglCursor;
use crate::tuple::DifTuple;
use crate::walk::Layout;

/// Операция требует включённого DIF.
pub(crate) fn require_dif(ctx: &DifCtx, op: &str) -> Result<()> {
    if !ctx.dif_enabled() {
        return Err(anyhow!(
            "{}: DIF is disabled (dif_type={}, md_size={})",
            op,
            ctx.dif_type(),
            ctx.md_size()
        ));
    }
    Ok(())
}

/// Точка входа рассчитана на конкретную раскладку метаданных.
pub(crate) fn require_layout(ctx: &DifCtx, layout: Layout, op: &str) -> Result<()> {
    let want = layout == Layout::Interleaved;
    if ctx.md_interleave() != want {
        return Err(anyhow!(
            "{}: context md_interleave={} does not match {:?} layout",
            op,
            ctx.md_interleave(),
            layout
        ));
    }
    Ok(())
}

/// Tuple, который generate запишет в блок `index`.
/// `guard` приходит из guard_at/GuardAcc (0, если проверка guard выключена).
#[inline]
pub(crate) fn expected_tuple(ctx: &DifCtx, index: u32, guard: u16) -> DifTuple {
    DifTuple {
        guard,
        app_tag: ctx.app_tag(),
        ref_tag: ctx.ref_tag_for(index),
    }
}

/// Сравнить сохранённый tuple с ожидаемым. Порядок: guard, app_tag, ref_tag.
/// Проверяются только поля, включённые в dif_flags.
pub(crate) fn check_tuple(
    ctx: &DifCtx,
    index: u32,
    guard: u16,
    stored: &DifTuple,
) -> Option<DifError> {
    let flags = ctx.dif_flags();

    if flags.check_guard() && stored.guard != guard {
        return Some(DifError::new(
            DIF_GUARD_ERROR,
            guard as u32,
            stored.guard as u32,
            index,
        ));
    }

    // Биты, выставленные в apptag_mask,: "don't care".
    if flags.check_app_tag() && (stored.app_tag ^ ctx.app_tag()) & !ctx.apptag_mask() != 0 {
        return Some(DifError::new(
            DIF_APPTAG_ERROR,
            ctx.app_tag() as u32,
            stored.app_tag as u32,
            index,
        ));
    }

    // Type 3: ref_tag не несёт последовательности и не проверяется.
    if flags.check_ref_tag() && ctx.dif_type() != DifType::Type3 {
        let expected = ctx.ref_tag_for(index);
        if stored.ref_tag != expected {
            return Some(DifError::new(
                DIF_REFTAG_ERROR,
                expected,
                stored.ref_tag,
                index,
            ));
        }
    }

    None
}

/// Guard по guard_interval байтам начиная с `data` (Digest по кускам).
/// Если проверка guard выключена: 0 без расчёта.
pub(crate) fn guard_at<S: AsRef<[u8]>>(
    cur: &mut SglCursor,
    bufs: &[S],
    data: usize,
    ctx: &DifCtx,
) -> Result<u16> {
    if !ctx.dif_flags().check_guard() {
        return Ok(0);
    }
    let mut digest = guard_digest();
    cur.for_each_chunk(bufs, data, ctx.guard_interval() as usize, |chunk| {
        digest.update(chunk);
    })?;
    Ok(digest.finalize())
}

/// Накопитель guard для кусков, приходящих по порядку (копирование + CRC за один проход).
/// digest = None, если проверка guard выключена.
pub(crate) struct GuardAcc {
    digest: Option<Digest<'static, u16>>,
    seen: usize,
    interval: usize,
}

impl GuardAcc {
    pub(crate) fn new(ctx: &DifCtx) -> Self {
        Self {
            digest: ctx.dif_flags().check_guard().then(guard_digest),
            seen: 0,
            interval: ctx.guard_interval() as usize,
        }
    }

    #[inline]
    pub(crate) fn update(&mut self, chunk: &[u8]) {
        if let Some(d) = self.digest.as_mut() {
            if self.seen < self.interval {
                let n = (self.interval - self.seen).min(chunk.len());
                d.update(&chunk[..n]);
            }
        }
        self.seen += chunk.len();
    }

    #[inline]
    pub(crate) fn finish(self) -> u16 {
        self.digest.map_or(0, |d| d.finalize())
    }
}

/// Прочитать tuple по абсолютному смещению (может быть разрезан между буферами).
pub(crate) fn read_tuple<S: AsRef<[u8]>>(
    cur: &mut SglCursor,
    bufs: &[S],
    abs: usize,
) -> Result<DifTuple> {
    let mut raw = [0u8; DIF_TUPLE_SIZE];
    cur.read(bufs, abs, &mut raw)?;
    Ok(DifTuple::decode(&raw))
}

/// Tuple из непрерывного буфера.
#[inline]
pub(crate) fn tuple_from_slice(buf: &[u8], abs: usize) -> DifTuple {
    let mut raw = [0u8; DIF_TUPLE_SIZE];
    raw.copy_from_slice(&buf[abs..abs + DIF_TUPLE_SIZE]);
    DifTuple::decode(&raw)
}
