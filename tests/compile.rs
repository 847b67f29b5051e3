// SPDX-License-Identifier: CC0-1.0

//! Lowering to Script under the limits of each context.

mod setup;

use miniscript::{Error, Expr, Legacy, Limit, ScriptMetrics, Segwitv0, SizeLimitError};

/// Fourteen `v:pk` checks followed by `and_v(v:hash160(H),after(n))`.
///
/// Each check is 35 bytes and the hashlock 27, so the script is
/// `517 + script_num_size(n)` bytes long.
fn legacy_script(n: u32) -> Expr<bitcoin::PublicKey, Legacy> {
    let data = setup::TestData::new_fixed_data(14);
    let hash = setup::hash160_of(&setup::preimage(0));
    let mut expr = Expr::and_v(
        Expr::verify(Expr::hash160(hash)).unwrap(),
        Expr::after(n).unwrap(),
    )
    .unwrap();
    for pk in data.pks.iter().rev() {
        expr = Expr::and_v(Expr::verify(Expr::pk(*pk).unwrap()).unwrap(), expr).unwrap();
    }
    expr
}

#[test]
fn legacy_script_size_ceiling() {
    setup::setup_logger();

    let ms = legacy_script(1).validate().unwrap();
    let compiled = ms.compile().unwrap();
    assert_eq!(compiled.script.len(), 519);
    assert_eq!(compiled.metrics.script_size, 519);

    let ms = legacy_script(100).validate().unwrap();
    let compiled = ms.compile().unwrap();
    assert_eq!(compiled.script.len(), 520);

    let ms = legacy_script(1000).validate().unwrap();
    assert_eq!(ms.script_size(), 521);
    assert_eq!(
        ms.compile(),
        Err(SizeLimitError { limit: Limit::ScriptSize, measured: 521, ceiling: 520 })
    );
    // The typed tree itself is fine; only the compiled form is too big.
    assert!(!ms.within_resource_limits());
    let err: Error = ms.compile().unwrap_err().into();
    assert_eq!(err.to_string(), "script size of 521 exceeds the limit of 520");
}

#[test]
fn segwit_allows_larger_scripts() {
    let data = setup::TestData::new_fixed_data(20);
    let mut expr = Expr::<_, Segwitv0>::pk(data.pks[0]).unwrap();
    for pk in &data.pks[1..] {
        expr = Expr::and_v(Expr::verify(Expr::pk(*pk).unwrap()).unwrap(), expr).unwrap();
    }
    let ms = expr.validate().unwrap();
    let compiled = ms.compile().unwrap();
    assert_eq!(compiled.script.len(), 20 * 35);
    assert_eq!(compiled.metrics.op_count, 20);
    assert_eq!(compiled.metrics.max_witness_elements, Some(20));
    assert_eq!(compiled.metrics.max_witness_size, Some(20 * 73));
}

#[test]
fn compiled_output_is_deterministic() {
    let a = legacy_script(100).validate().unwrap().compile().unwrap();
    let b = legacy_script(100).validate().unwrap().compile().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.script.as_bytes(), b.script.as_bytes());
}

#[test]
fn metrics_without_encoding() {
    let ms = legacy_script(1).validate().unwrap();
    let compiled = ms.compile().unwrap();
    assert_eq!(compiled.metrics, ScriptMetrics { script_size: 519, ..ms.metrics() });
    assert_eq!(ms.metrics(), compiled.metrics);
}

#[cfg(feature = "serde")]
#[test]
fn metrics_serde() {
    use serde_test::{assert_tokens, Token};

    let metrics = ScriptMetrics {
        script_size: 35,
        op_count: 1,
        max_witness_elements: Some(1),
        max_witness_size: Some(73),
        max_script_sig_size: Some(73),
        max_exec_stack: None,
    };
    assert_tokens(
        &metrics,
        &[
            Token::Struct { name: "ScriptMetrics", len: 6 },
            Token::Str("script_size"),
            Token::U64(35),
            Token::Str("op_count"),
            Token::U64(1),
            Token::Str("max_witness_elements"),
            Token::Some,
            Token::U64(1),
            Token::Str("max_witness_size"),
            Token::Some,
            Token::U64(73),
            Token::Str("max_script_sig_size"),
            Token::Some,
            Token::U64(73),
            Token::Str("max_exec_stack"),
            Token::None,
            Token::StructEnd,
        ],
    );
    assert_tokens(&Limit::ScriptSize, &[Token::UnitVariant { name: "Limit", variant: "ScriptSize" }]);
}
