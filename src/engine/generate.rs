//! engine/generate: запись DIF tuple в каждый блок.
//!
//! Для блока i: guard = CRC16 по guard_interval байт данных (если включена
//! проверка guard, иначе 0), app_tag = ctx.app_tag, ref_tag = ctx.ref_tag_for(i).
//! Tuple перезаписывается целиком; прочие байты метаданных не трогаются.

use anyhow::Result;
use log::trace;

use crate::consts::DIF_TUPLE_SIZE;
use crate::ctx::DifCtx;
use crate::engine::{expected_tuple, guard_at, require_dif, require_layout};
use crate::sgl::{total_len, SglCursor};
use crate::walk::{BlockWalker, Layout};

/// Сгенерировать DIF для interleaved payload (extended LBA).
pub fn dif_generate<S>(iovs: &mut [S], num_blocks: u32, ctx: &DifCtx) -> Result<()>
where
    S: AsRef<[u8]> + AsMut<[u8]>,
{
    require_dif(ctx, "dif_generate")?;
    require_layout(ctx, Layout::Interleaved, "dif_generate")?;
    let walker = BlockWalker::interleaved(total_len(iovs), num_blocks, ctx)?;

    // Один курсор: внутри блока md всегда после data, проход только вперёд.
    let mut cur = SglCursor::new();
    for blk in walker {
        let guard = guard_at(&mut cur, iovs, blk.data, ctx)?;
        let tuple = expected_tuple(ctx, blk.index, guard);
        cur.write(iovs, blk.tuple(ctx), &tuple.encode())?;
    }

    trace!("dif_generate: {} blocks, {}", num_blocks, ctx);
    Ok(())
}

/// Сгенерировать DIF для DIX payload: данные в `iovs`, метаданные в `md`.
pub fn dix_generate<S>(iovs: &[S], md: &mut [u8], num_blocks: u32, ctx: &DifCtx) -> Result<()>
where
    S: AsRef<[u8]>,
{
    require_dif(ctx, "dix_generate")?;
    require_layout(ctx, Layout::Separate, "dix_generate")?;
    let walker = BlockWalker::separate(total_len(iovs), md.len(), num_blocks, ctx)?;

    let mut cur = SglCursor::new();
    for blk in walker {
        let guard = guard_at(&mut cur, iovs, blk.data, ctx)?;
        let tuple = expected_tuple(ctx, blk.index, guard);
        let t = blk.tuple(ctx);
        md[t..t + DIF_TUPLE_SIZE].copy_from_slice(&tuple.encode());
    }

    trace!("dix_generate: {} blocks, {}", num_blocks, ctx);
    Ok(())
}
