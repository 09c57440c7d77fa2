//! engine/verify: проверка DIF tuple по блокам.
//!
//! Ожидаемый tuple пересчитывается так же, как в generate, и сравнивается с
//! сохранённым только по включённым в dif_flags полям (guard → app_tag → ref_tag).
//! Первый же несовпавший блок останавливает проход: возвращается anyhow::Error
//! с DifError внутри (`err.downcast_ref::<DifError>()`).

use anyhow::Result;
use log::{debug, trace};

use crate::ctx::DifCtx;
use crate::engine::{
    check_tuple, guard_at, read_tuple, require_dif, require_layout, tuple_from_slice,
};
use crate::sgl::{total_len, SglCursor};
use crate::walk::{BlockWalker, Layout};

/// Проверить DIF interleaved payload (extended LBA).
pub fn dif_verify<S>(iovs: &[S], num_blocks: u32, ctx: &DifCtx) -> Result<()>
where
    S: AsRef<[u8]>,
{
    require_dif(ctx, "dif_verify")?;
    require_layout(ctx, Layout::Interleaved, "dif_verify")?;
    let walker = BlockWalker::interleaved(total_len(iovs), num_blocks, ctx)?;

    let mut cur = SglCursor::new();
    for blk in walker {
        let guard = guard_at(&mut cur, iovs, blk.data, ctx)?;
        let stored = read_tuple(&mut cur, iovs, blk.tuple(ctx))?;
        if let Some(err) = check_tuple(ctx, blk.index, guard, &stored) {
            debug!("dif_verify: {}", err);
            return Err(err.into());
        }
    }

    trace!("dif_verify: {} blocks ok", num_blocks);
    Ok(())
}

/// Проверить DIF для DIX payload: данные в `iovs`, метаданные в `md`.
pub fn dix_verify<S>(iovs: &[S], md: &[u8], num_blocks: u32, ctx: &DifCtx) -> Result<()>
where
    S: AsRef<[u8]>,
{
    require_dif(ctx, "dix_verify")?;
    require_layout(ctx, Layout::Separate, "dix_verify")?;
    let walker = BlockWalker::separate(total_len(iovs), md.len(), num_blocks, ctx)?;

    let mut cur = SglCursor::new();
    for blk in walker {
        let guard = guard_at(&mut cur, iovs, blk.data, ctx)?;
        let stored = tuple_from_slice(md, blk.tuple(ctx));
        if let Some(err) = check_tuple(ctx, blk.index, guard, &stored) {
            debug!("dix_verify: {}", err);
            return Err(err.into());
        }
    }

    trace!("dix_verify: {} blocks ok", num_blocks);
    Ok(())
}
