//! engine/inject: детерминированная порча одного блока для тестов verify.
//!
//! inject_flags: маска DIF_*_ERROR (можно несколько полей сразу). Целевой блок:
//! `*inject_offset % num_blocks`; после каждой инъекции это значение пишется обратно
//! в `*inject_offset` (сохраняется последнее).
//!
//! Какие биты флипаются:
//! - ref_tag: младший бит (ref_tag ^ 1);
//! - app_tag: младший бит, не покрытый apptag_mask (бит 0, если маска покрывает все);
//! - guard:   младший бит (guard ^ 1);
//! - data:    бит 0 первого байта данных блока (всегда внутри guard_interval).

use anyhow::{anyhow, Result};
use log::debug;

use crate::consts::{
    APPTAG_MASK_ALL, DIF_APPTAG_ERROR, DIF_DATA_ERROR, DIF_GUARD_ERROR, DIF_OFF_APP_TAG,
    DIF_OFF_GUARD, DIF_OFF_REF_TAG, DIF_REFTAG_ERROR, DIF_TUPLE_SIZE,
};
use crate::ctx::DifCtx;
use crate::engine::require_layout;
use crate::sgl::{total_len, SglCursor};
use crate::walk::{BlockRef, BlockWalker, Layout};

/// Куда попадает флип.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Data,
    Md,
}

/// Один флип: регион, абсолютное смещение байта, XOR-маска.
#[derive(Debug, Clone, Copy)]
struct Flip {
    kind: u8,
    region: Region,
    abs: usize,
    mask: u8,
}

/// Байт и маска для бита `bit` 16-битного big-endian поля по смещению `field`.
#[inline]
fn be16_bit(field: usize, bit: u32) -> (usize, u8) {
    let byte = if bit >= 8 { field } else { field + 1 };
    (byte, 1u8 << (bit % 8))
}

fn plan_flips(ctx: &DifCtx, blk: &BlockRef, inject_flags: u32) -> Result<Vec<Flip>> {
    let tuple_fields = inject_flags
        & (DIF_REFTAG_ERROR | DIF_APPTAG_ERROR | DIF_GUARD_ERROR) as u32;
    if tuple_fields != 0 && (ctx.md_size() as usize) < DIF_TUPLE_SIZE {
        return Err(anyhow!(
            "cannot inject tuple error: md_size ({}) is smaller than a DIF tuple",
            ctx.md_size()
        ));
    }

    let t = blk.tuple(ctx);
    let mut flips = Vec::with_capacity(4);

    if inject_flags & DIF_REFTAG_ERROR as u32 != 0 {
        // младший байт big-endian u32: последний
        flips.push(Flip {
            kind: DIF_REFTAG_ERROR,
            region: Region::Md,
            abs: t + DIF_OFF_REF_TAG + 3,
            mask: 0x01,
        });
    }
    if inject_flags & DIF_APPTAG_ERROR as u32 != 0 {
        let care = !ctx.apptag_mask();
        let bit = if ctx.apptag_mask() == APPTAG_MASK_ALL {
            0
        } else {
            care.trailing_zeros()
        };
        let (byte, mask) = be16_bit(t + DIF_OFF_APP_TAG, bit);
        flips.push(Flip {
            kind: DIF_APPTAG_ERROR,
            region: Region::Md,
            abs: byte,
            mask,
        });
    }
    if inject_flags & DIF_GUARD_ERROR as u32 != 0 {
        let (byte, mask) = be16_bit(t + DIF_OFF_GUARD, 0);
        flips.push(Flip {
            kind: DIF_GUARD_ERROR,
            region: Region::Md,
            abs: byte,
            mask,
        });
    }
    if inject_flags & DIF_DATA_ERROR as u32 != 0 {
        flips.push(Flip {
            kind: DIF_DATA_ERROR,
            region: Region::Data,
            abs: blk.data,
            mask: 0x01,
        });
    }
    Ok(flips)
}

fn require_md(ctx: &DifCtx, op: &str) -> Result<()> {
    if ctx.md_size() == 0 {
        return Err(anyhow!("{}: no metadata to corrupt (md_size=0)", op));
    }
    Ok(())
}

/// Внести ошибку в interleaved payload.
pub fn dif_inject_error<S>(
    iovs: &mut [S],
    num_blocks: u32,
    ctx: &DifCtx,
    inject_flags: u32,
    inject_offset: &mut u32,
) -> Result<()>
where
    S: AsRef<[u8]> + AsMut<[u8]>,
{
    require_md(ctx, "dif_inject_error")?;
    require_layout(ctx, Layout::Interleaved, "dif_inject_error")?;
    let mut walker = BlockWalker::interleaved(total_len(iovs), num_blocks, ctx)?;
    if num_blocks == 0 {
        return Ok(());
    }

    let index = *inject_offset % num_blocks;
    let blk = walker
        .nth(index as usize)
        .ok_or_else(|| anyhow!("dif_inject_error: block {} not found", index))?;

    let mut cur = SglCursor::new();
    for flip in plan_flips(ctx, &blk, inject_flags)? {
        // в interleaved и данные, и md лежат в одном списке
        cur.xor_byte(iovs, flip.abs, flip.mask)?;
        *inject_offset = index;
        debug!(
            "dif_inject_error: kind={:#x} block={} byte={} mask={:#04x}",
            flip.kind, index, flip.abs, flip.mask
        );
    }
    Ok(())
}

/// Внести ошибку в DIX payload: данные в `iovs`, метаданные в `md`.
pub fn dix_inject_error<S>(
    iovs: &mut [S],
    md: &mut [u8],
    num_blocks: u32,
    ctx: &DifCtx,
    inject_flags: u32,
    inject_offset: &mut u32,
) -> Result<()>
where
    S: AsRef<[u8]> + AsMut<[u8]>,
{
    require_md(ctx, "dix_inject_error")?;
    require_layout(ctx, Layout::Separate, "dix_inject_error")?;
    let mut walker = BlockWalker::separate(total_len(iovs), md.len(), num_blocks, ctx)?;
    if num_blocks == 0 {
        return Ok(());
    }

    let index = *inject_offset % num_blocks;
    let blk = walker
        .nth(index as usize)
        .ok_or_else(|| anyhow!("dix_inject_error: block {} not found", index))?;

    let mut cur = SglCursor::new();
    for flip in plan_flips(ctx, &blk, inject_flags)? {
        match flip.region {
            Region::Data => cur.xor_byte(iovs, flip.abs, flip.mask)?,
            Region::Md => md[flip.abs] ^= flip.mask,
        }
        *inject_offset = index;
        debug!(
            "dix_inject_error: kind={:#x} block={} byte={} mask={:#04x}",
            flip.kind, index, flip.abs, flip.mask
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn be16_bit_positions() {
        // бит 0: младший байт (второй в BE)
        assert_eq!(be16_bit(10, 0), (11, 0x01));
        assert_eq!(be16_bit(10, 7), (11, 0x80));
        assert_eq!(be16_bit(10, 8), (10, 0x01));
        assert_eq!(be16_bit(10, 15), (10, 0x80));
    }
}
