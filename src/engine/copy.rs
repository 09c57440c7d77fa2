//! engine/copy: копирование между scattered data-only списком и непрерывным
//! interleaved bounce-буфером, совмещённое с generate/verify за один проход.
//!
//! - dif_generate_copy: iovs (только данные) -> bounce (данные + md), затем tuple
//!   в bounce. Копирование безусловное; байты метаданных вне tuple не трогаются.
//! - dif_verify_copy: bounce -> iovs, затем проверка блока в bounce. Копируются все
//!   блоки до первого сбойного включительно; после него проход прекращается.
//!
//! CRC считается прямо по копируемым кускам (GuardAcc), второй проход по данным не нужен.

use anyhow::Result;
use log::{debug, trace};

use crate::consts::DIF_TUPLE_SIZE;
use crate::ctx::DifCtx;
use crate::engine::{
    check_tuple, expected_tuple, require_dif, require_layout, tuple_from_slice, GuardAcc,
};
use crate::sgl::{total_len, SglCursor};
use crate::walk::{check_len, BlockWalker, Layout};

/// Скопировать данные из `iovs` в `bounce` и сгенерировать DIF в `bounce`.
///
/// `iovs`: num_blocks * data_size байт, `bounce`: num_blocks * block_size байт.
pub fn dif_generate_copy<S>(
    iovs: &[S],
    bounce: &mut [u8],
    num_blocks: u32,
    ctx: &DifCtx,
) -> Result<()>
where
    S: AsRef<[u8]>,
{
    require_dif(ctx, "dif_generate_copy")?;
    require_layout(ctx, Layout::Interleaved, "dif_generate_copy")?;
    check_len("data payload", total_len(iovs), num_blocks, ctx.data_size())?;
    let walker = BlockWalker::interleaved(bounce.len(), num_blocks, ctx)?;

    let data_size = ctx.data_size() as usize;
    let mut cur = SglCursor::new();
    for blk in walker {
        let dst = &mut bounce[blk.data..blk.data + data_size];
        let mut acc = GuardAcc::new(ctx);
        let mut pos = 0;
        cur.for_each_chunk(iovs, blk.index as usize * data_size, data_size, |chunk| {
            dst[pos..pos + chunk.len()].copy_from_slice(chunk);
            acc.update(chunk);
            pos += chunk.len();
        })?;

        let tuple = expected_tuple(ctx, blk.index, acc.finish());
        let t = blk.tuple(ctx);
        bounce[t..t + DIF_TUPLE_SIZE].copy_from_slice(&tuple.encode());
    }

    trace!("dif_generate_copy: {} blocks, {}", num_blocks, ctx);
    Ok(())
}

/// Проверить DIF в `bounce` и скопировать данные в `iovs`.
///
/// На первом сбойном блоке возвращает DifError; данные этого блока уже скопированы,
/// последующие блоки не копируются.
pub fn dif_verify_copy<S>(
    iovs: &mut [S],
    bounce: &[u8],
    num_blocks: u32,
    ctx: &DifCtx,
) -> Result<()>
where
    S: AsRef<[u8]> + AsMut<[u8]>,
{
    require_dif(ctx, "dif_verify_copy")?;
    require_layout(ctx, Layout::Interleaved, "dif_verify_copy")?;
    check_len("data payload", total_len(iovs), num_blocks, ctx.data_size())?;
    let walker = BlockWalker::interleaved(bounce.len(), num_blocks, ctx)?;

    let data_size = ctx.data_size() as usize;
    let mut cur = SglCursor::new();
    for blk in walker {
        let src = &bounce[blk.data..blk.data + data_size];
        let mut acc = GuardAcc::new(ctx);
        let mut pos = 0;
        cur.for_each_chunk_mut(iovs, blk.index as usize * data_size, data_size, |chunk| {
            let n = chunk.len();
            chunk.copy_from_slice(&src[pos..pos + n]);
            acc.update(chunk);
            pos += n;
        })?;

        let stored = tuple_from_slice(bounce, blk.tuple(ctx));
        if let Some(err) = check_tuple(ctx, blk.index, acc.finish(), &stored) {
            debug!("dif_verify_copy: {}", err);
            return Err(err.into());
        }
    }

    trace!("dif_verify_copy: {} blocks ok", num_blocks);
    Ok(())
}
