use anyhow::Result;
use oorandom::Rand64;

use blockdif::{
    dif_generate, dif_inject_error, dif_verify, DifCtx, DifCtxBuilder, DifError, DifType,
    DIF_APPTAG_ERROR, DIF_DATA_ERROR, DIF_GUARD_ERROR, DIF_REFTAG_ERROR,
};

const BS: usize = 520;

fn setup(n: usize, ty: DifType, mask: u16, seed: u128) -> Result<(DifCtx, Vec<Vec<u8>>)> {
    let ctx = DifCtxBuilder::new()
        .block_size(BS as u32, 8)
        .dif_type(ty)
        .init_ref_tag(500)
        .app_tag(0x0F0F, mask)
        .build()?;
    let mut rng = Rand64::new(seed);
    let payload: Vec<u8> = (0..BS * n).map(|_| rng.rand_u64() as u8).collect();
    // несколько буферов, tuple блока 0 разрезан
    let mut iovs = vec![payload[..515].to_vec(), payload[515..].to_vec()];
    dif_generate(&mut iovs, n as u32, &ctx)?;
    Ok((ctx, iovs))
}

fn dif_err(res: Result<()>) -> DifError {
    let err = res.expect_err("verify must fail after injection");
    *err.downcast_ref::<DifError>()
        .unwrap_or_else(|| panic!("not a DIF error: {err:#}"))
}

#[test]
fn each_kind_is_detected_with_matching_error() -> Result<()> {
    let cases = [
        (DIF_GUARD_ERROR, DIF_GUARD_ERROR),
        (DIF_APPTAG_ERROR, DIF_APPTAG_ERROR),
        (DIF_REFTAG_ERROR, DIF_REFTAG_ERROR),
        // порча данных ловится проверкой guard
        (DIF_DATA_ERROR, DIF_GUARD_ERROR),
    ];
    for (i, &(inject, reported)) in cases.iter().enumerate() {
        let (ctx, mut iovs) = setup(4, DifType::Type1, 0, i as u128)?;
        for target in 0..4u32 {
            let mut offset = target;
            dif_inject_error(&mut iovs, 4, &ctx, inject as u32, &mut offset)?;
            assert_eq!(offset, target);

            let e = dif_err(dif_verify(&iovs, 4, &ctx));
            assert_eq!(e.err_type, reported, "inject={inject:#x}");
            assert_eq!(e.err_offset, target);

            // повторный флип тех же битов откатывает порчу
            dif_inject_error(&mut iovs, 4, &ctx, inject as u32, &mut offset)?;
            dif_verify(&iovs, 4, &ctx)?;
        }
    }
    Ok(())
}

#[test]
fn offset_wraps_modulo_num_blocks() -> Result<()> {
    let (ctx, mut iovs) = setup(3, DifType::Type1, 0, 11)?;
    let mut offset = 10;
    dif_inject_error(&mut iovs, 3, &ctx, DIF_REFTAG_ERROR as u32, &mut offset)?;
    assert_eq!(offset, 1);
    let e = dif_err(dif_verify(&iovs, 3, &ctx));
    assert_eq!((e.err_type, e.err_offset), (DIF_REFTAG_ERROR, 1));
    assert_eq!((e.expected, e.actual), (501, 501 ^ 1));
    Ok(())
}

#[test]
fn guard_flip_changes_lowest_bit() -> Result<()> {
    let (ctx, mut iovs) = setup(2, DifType::Type1, 0, 12)?;
    let mut offset = 1;
    dif_inject_error(&mut iovs, 2, &ctx, DIF_GUARD_ERROR as u32, &mut offset)?;
    let e = dif_err(dif_verify(&iovs, 2, &ctx));
    assert_eq!(e.actual, e.expected ^ 1);
    Ok(())
}

#[test]
fn app_tag_flip_avoids_masked_bits() -> Result<()> {
    // младшие 4 бита маскированы: флип должен попасть в бит 4
    let (ctx, mut iovs) = setup(2, DifType::Type1, 0x000F, 13)?;
    let mut offset = 0;
    dif_inject_error(&mut iovs, 2, &ctx, DIF_APPTAG_ERROR as u32, &mut offset)?;
    let e = dif_err(dif_verify(&iovs, 2, &ctx));
    assert_eq!(e.err_type, DIF_APPTAG_ERROR);
    assert_eq!(e.actual, 0x0F0F ^ 0x0010);
    Ok(())
}

#[test]
fn multiple_kinds_report_first_in_check_order() -> Result<()> {
    let (ctx, mut iovs) = setup(2, DifType::Type1, 0, 14)?;
    let mut offset = 1;
    let flags = (DIF_REFTAG_ERROR | DIF_APPTAG_ERROR) as u32;
    dif_inject_error(&mut iovs, 2, &ctx, flags, &mut offset)?;
    let e = dif_err(dif_verify(&iovs, 2, &ctx));
    assert_eq!((e.err_type, e.err_offset), (DIF_APPTAG_ERROR, 1));
    Ok(())
}

#[test]
fn type3_ref_tag_injection_is_invisible() -> Result<()> {
    let (ctx, mut iovs) = setup(2, DifType::Type3, 0, 15)?;
    let mut offset = 0;
    dif_inject_error(&mut iovs, 2, &ctx, DIF_REFTAG_ERROR as u32, &mut offset)?;
    dif_verify(&iovs, 2, &ctx)?;
    Ok(())
}

#[test]
fn zero_blocks_is_noop() -> Result<()> {
    let ctx = DifCtxBuilder::new().build()?;
    let mut iovs: Vec<Vec<u8>> = Vec::new();
    let mut offset = 77;
    dif_inject_error(&mut iovs, 0, &ctx, DIF_GUARD_ERROR as u32, &mut offset)?;
    assert_eq!(offset, 77);
    Ok(())
}

#[test]
fn no_metadata_is_error() -> Result<()> {
    let ctx = DifCtxBuilder::new()
        .block_size(512, 0)
        .dif_type(DifType::Disable)
        .build()?;
    let mut iovs = vec![vec![0u8; 512]];
    let mut offset = 0;
    let err = dif_inject_error(&mut iovs, 1, &ctx, DIF_DATA_ERROR as u32, &mut offset).unwrap_err();
    assert!(format!("{err:#}").contains("md_size=0"));
    assert!(iovs[0].iter().all(|&b| b == 0));
    Ok(())
}

#[test]
fn wrong_length_is_error_and_untouched() -> Result<()> {
    let (ctx, iovs) = setup(2, DifType::Type1, 0, 16)?;
    let mut short = vec![iovs[0].clone()];
    let before = short.clone();
    let mut offset = 0;
    assert!(dif_inject_error(&mut short, 2, &ctx, DIF_GUARD_ERROR as u32, &mut offset).is_err());
    assert_eq!(short, before);
    Ok(())
}
