use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use env_logger::{Builder, Env};
use log::{error, info};
use serde::Serialize;
use std::time::{Duration, Instant};

use blockdif::{
    dif_generate, dif_generate_copy, dif_inject_error, dif_verify, dif_verify_copy,
    dix_generate, dix_inject_error, dix_verify, DifCtx, DifCtxBuilder, DifError, DifFlags,
    DifLocation, DifType, DIF_APPTAG_ERROR, DIF_DATA_ERROR, DIF_GUARD_ERROR, DIF_REFTAG_ERROR,
};

/// Генератор тестовой нагрузки: xorshift64* по seed из `--seed`.
/// Один seed даёт один и тот же payload и ту же нарезку на буферы.
struct PayloadGen {
    state: u64,
}

impl PayloadGen {
    fn new(seed: u64) -> Self {
        // нулевое состояние у xorshift вырождено
        Self { state: seed | 1 }
    }

    fn step(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn payload(&mut self, len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len + 8);
        while out.len() < len {
            out.extend_from_slice(&self.step().to_be_bytes());
        }
        out.truncate(len);
        out
    }

    /// Разрезать payload на куски случайной длины 1..=max_iov (0: один буфер).
    fn split(&mut self, payload: &[u8], max_iov: usize) -> Vec<Vec<u8>> {
        if max_iov == 0 {
            return vec![payload.to_vec()];
        }
        let mut out = Vec::new();
        let mut rest = payload;
        while !rest.is_empty() {
            let n = (1 + self.step() as usize % max_iov).min(rest.len());
            let (head, tail) = rest.split_at(n);
            out.push(head.to_vec());
            rest = tail;
        }
        out
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Loc {
    Start,
    End,
}

/// DIF/DIX micro-bench and self-check
///
/// Примеры:
///   difbench --blocks 4096 --block-size 520 --md-size 8 --json
///   difbench --separate --block-size 4096 --md-size 64 --dif-loc end --max-iov 3000
#[derive(Parser, Debug)]
#[command(name = "difbench", version, about = "blockdif micro-bench CLI")]
struct Opt {
    /// Block size in bytes: data + metadata, or data only with --separate
    #[arg(long, default_value_t = 520)]
    block_size: u32,

    /// Metadata bytes per block
    #[arg(long, default_value_t = 8)]
    md_size: u32,

    /// DIF type (1, 2 or 3)
    #[arg(long, default_value_t = 1)]
    dif_type: u32,

    /// Tuple location inside metadata
    #[arg(long, value_enum, default_value_t = Loc::Start)]
    dif_loc: Loc,

    /// Separate metadata buffer (DIX) instead of interleaved
    #[arg(long, default_value_t = false)]
    separate: bool,

    /// Number of blocks per call
    #[arg(long, default_value_t = 1024)]
    blocks: u32,

    /// Calls per phase
    #[arg(long, default_value_t = 64)]
    iterations: u32,

    /// Max length of one buffer in the scatter list (0 = one contiguous buffer)
    #[arg(long, default_value_t = 0)]
    max_iov: usize,

    /// Initial reference tag
    #[arg(long, default_value_t = 0)]
    init_ref_tag: u32,

    /// Application tag
    #[arg(long, default_value_t = 0x4242)]
    app_tag: u16,

    /// Random seed
    #[arg(long, default_value_t = 0xA1B2_C3D4_E5F6_7788)]
    seed: u64,

    /// JSON output
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
struct PhaseStats {
    name: String,
    calls: u64,
    bytes: u64,
    elapsed_sec: f64,
    mib_per_sec: f64,
}

#[derive(Debug, Clone, Serialize)]
struct InjectCheck {
    kind: &'static str,
    detected: Option<DifError>,
}

#[derive(Debug, Clone, Serialize)]
struct BenchReport {
    ctx: String,
    blocks: u32,
    iovs: usize,
    phases: Vec<PhaseStats>,
    inject: Vec<InjectCheck>,
}

fn init_logger() {
    // Уровень берём из RUST_LOG, иначе дефолт: info.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        error!("{:?}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let opt = Opt::parse();

    let dif_type = DifType::from_u32(opt.dif_type)
        .filter(|t| *t != DifType::Disable)
        .ok_or_else(|| anyhow!("--dif-type must be 1, 2 or 3 (got {})", opt.dif_type))?;
    let ctx = DifCtxBuilder::new()
        .block_size(opt.block_size, opt.md_size)
        .md_interleave(!opt.separate)
        .dif_loc(match opt.dif_loc {
            Loc::Start => DifLocation::Start,
            Loc::End => DifLocation::End,
        })
        .dif_type(dif_type)
        .dif_flags(DifFlags::all_checks())
        .init_ref_tag(opt.init_ref_tag)
        .app_tag(opt.app_tag, 0)
        .build()?;
    info!("difbench: {}", ctx);

    let mut load = PayloadGen::new(opt.seed);
    let unit = (if opt.separate { ctx.data_size() } else { ctx.block_size() }) as usize;
    let payload = load.payload(unit * opt.blocks as usize);
    let mut iovs = load.split(&payload, opt.max_iov);
    let mut md = vec![0u8; ctx.md_size() as usize * opt.blocks as usize];

    let mut phases = Vec::new();
    if opt.separate {
        phases.push(phase("dix_generate", &opt, unit, || {
            dix_generate(&iovs, &mut md, opt.blocks, &ctx)
        })?);
        phases.push(phase("dix_verify", &opt, unit, || {
            dix_verify(&iovs, &md, opt.blocks, &ctx)
        })?);
    } else {
        phases.push(phase("generate", &opt, unit, || {
            dif_generate(&mut iovs, opt.blocks, &ctx)
        })?);
        phases.push(phase("verify", &opt, unit, || dif_verify(&iovs, opt.blocks, &ctx))?);

        // copy-фазы: data-only список <-> interleaved bounce
        let data_size = ctx.data_size() as usize;
        let data = load.payload(data_size * opt.blocks as usize);
        let mut data_iovs = load.split(&data, opt.max_iov);
        let mut bounce = vec![0u8; ctx.block_size() as usize * opt.blocks as usize];
        phases.push(phase("generate_copy", &opt, data_size, || {
            dif_generate_copy(&data_iovs, &mut bounce, opt.blocks, &ctx)
        })?);
        phases.push(phase("verify_copy", &opt, data_size, || {
            dif_verify_copy(&mut data_iovs, &bounce, opt.blocks, &ctx)
        })?);
    }

    let inject = inject_checks(&ctx, &opt, &mut iovs, &mut md)?;

    let report = BenchReport {
        ctx: ctx.to_string(),
        blocks: opt.blocks,
        iovs: iovs.len(),
        phases,
        inject,
    };

    if opt.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report_human(&report);
    }
    Ok(())
}

fn phase<F>(name: &str, opt: &Opt, unit: usize, mut f: F) -> Result<PhaseStats>
where
    F: FnMut() -> Result<()>,
{
    let start = Instant::now();
    for _ in 0..opt.iterations {
        f()?;
    }
    let elapsed = start.elapsed();
    let bytes = unit as u64 * opt.blocks as u64 * opt.iterations as u64;
    let stats = stats(name, opt.iterations as u64, bytes, elapsed);
    info!(
        "{:>14} done: calls={} elapsed={:.3}s, {:.1} MiB/s",
        stats.name, stats.calls, stats.elapsed_sec, stats.mib_per_sec
    );
    Ok(stats)
}

fn stats(name: &str, calls: u64, bytes: u64, elapsed: Duration) -> PhaseStats {
    let secs = elapsed.as_secs_f64();
    let mib = if secs > 0.0 {
        bytes as f64 / (1024.0 * 1024.0) / secs
    } else {
        0.0
    };
    PhaseStats {
        name: name.to_string(),
        calls,
        bytes,
        elapsed_sec: secs,
        mib_per_sec: mib,
    }
}

/// Для каждого поля: испортить блок, убедиться, что verify ловит ошибку, перегенерировать.
fn inject_checks(
    ctx: &DifCtx,
    opt: &Opt,
    iovs: &mut [Vec<u8>],
    md: &mut [u8],
) -> Result<Vec<InjectCheck>> {
    if opt.blocks == 0 {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    let kinds = [
        ("guard", DIF_GUARD_ERROR),
        ("app_tag", DIF_APPTAG_ERROR),
        ("ref_tag", DIF_REFTAG_ERROR),
        ("data", DIF_DATA_ERROR),
    ];
    for (i, (kind, flag)) in kinds.into_iter().enumerate() {
        let mut offset = (i as u32).wrapping_mul(7919);
        let res = if opt.separate {
            dix_inject_error(iovs, md, opt.blocks, ctx, flag as u32, &mut offset)?;
            let r = dix_verify(iovs, md, opt.blocks, ctx);
            dix_inject_error(iovs, md, opt.blocks, ctx, flag as u32, &mut offset)?;
            r
        } else {
            dif_inject_error(iovs, opt.blocks, ctx, flag as u32, &mut offset)?;
            let r = dif_verify(iovs, opt.blocks, ctx);
            // повторный флип тех же битов возвращает payload в исходное состояние
            dif_inject_error(iovs, opt.blocks, ctx, flag as u32, &mut offset)?;
            r
        };
        let detected = match res {
            Ok(()) => None,
            Err(e) => Some(
                *e.downcast_ref::<DifError>()
                    .ok_or_else(|| anyhow!("inject {}: unexpected error: {:#}", kind, e))?,
            ),
        };
        out.push(InjectCheck { kind, detected });
    }
    Ok(out)
}

fn print_report_human(r: &BenchReport) {
    println!("blockdif bench report:");
    println!("  ctx    = {}", r.ctx);
    println!("  blocks = {}", r.blocks);
    println!("  iovs   = {}", r.iovs);
    println!("Phases:");
    for p in &r.phases {
        println!(
            "  {:>14}: calls={} bytes={} elapsed={:.3}s {:.1} MiB/s",
            p.name, p.calls, p.bytes, p.elapsed_sec, p.mib_per_sec
        );
    }
    println!("Injection:");
    for c in &r.inject {
        match &c.detected {
            Some(e) => println!("  {:>8}: detected ({})", c.kind, e),
            None => println!("  {:>8}: NOT detected", c.kind),
        }
    }
}
