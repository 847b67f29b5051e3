// SPDX-License-Identifier: CC0-1.0

//! Building and typechecking trees through the public API.

mod setup;

use miniscript::miniscript::types::{Base, ErrorKind};
use miniscript::{
    Error, Expr, ExprError, Legacy, Miniscript, ScriptContextError, Segwitv0, Tap,
};

type SegwitExpr = Expr<bitcoin::PublicKey, Segwitv0>;

#[test]
fn type_errors_name_the_failing_node() {
    setup::setup_logger();
    let data = setup::TestData::new_fixed_data(2);
    let (a, b) = (data.pks[0], data.pks[1]);

    // and_v needs a V on the left.
    let expr = SegwitExpr::and_v(SegwitExpr::pk(a).unwrap(), SegwitExpr::pk(b).unwrap()).unwrap();
    match expr.validate() {
        Err(Error::TypeCheck(e)) => {
            assert_eq!(e.fragment_name, "and_v");
            assert_eq!(e.fragment_string, format!("and_v(pk({}),pk({}))", a, b));
            assert!(matches!(e.error, ErrorKind::ChildBase2 { found: (Base::B, Base::B), .. }));
        }
        other => panic!("expected a type error, got {:?}", other),
    }

    // The innermost bad node is reported, not the root.
    let inner = SegwitExpr::thresh(2, vec![SegwitExpr::pk(a).unwrap(), SegwitExpr::pk(b).unwrap()])
        .unwrap();
    let expr = SegwitExpr::or_i(inner, SegwitExpr::pk(a).unwrap()).unwrap();
    match expr.validate() {
        Err(Error::TypeCheck(e)) => {
            assert_eq!(e.fragment_name, "thresh");
            assert_eq!(
                e.error,
                ErrorKind::ThresholdBase { index: 1, expected: Base::W, found: Base::B }
            );
            assert!(e.to_string().contains("thresh(2,"));
        }
        other => panic!("expected a type error, got {:?}", other),
    }
}

#[test]
fn well_typed_trees_validate() {
    let data = setup::TestData::new_fixed_data(4);
    let (a, b, c, d) = (data.pks[0], data.pks[1], data.pks[2], data.pks[3]);
    let expr = SegwitExpr::and_or(
        SegwitExpr::pk(a).unwrap(),
        SegwitExpr::older(144).unwrap(),
        SegwitExpr::thresh(
            2,
            vec![
                SegwitExpr::pk(b).unwrap(),
                SegwitExpr::swap(SegwitExpr::pk(c).unwrap()).unwrap(),
                SegwitExpr::alt(SegwitExpr::pk(d).unwrap()).unwrap(),
            ],
        )
        .unwrap(),
    )
    .unwrap();
    let ms = expr.validate().unwrap();
    assert_eq!(ms.ty().corr.base, Base::B);
    assert!(ms.ty().mall.non_malleable);
    assert!(ms.sanity_check().is_ok());
    assert_eq!(ms.iter_pk().collect::<Vec<_>>(), vec![a, b, c, d]);
}

#[test]
fn threshold_bounds() {
    let data = setup::TestData::new_fixed_data(21);
    let three = data.pks[..3].to_vec();

    let bounds = |res: Result<SegwitExpr, ExprError>| match res {
        Err(ExprError::Threshold(e)) => (e.k(), e.n()),
        Err(e) => panic!("expected a threshold error, got {}", e),
        Ok(expr) => panic!("expected a threshold error, got {}", expr),
    };
    assert_eq!(bounds(SegwitExpr::multi(0, three.clone())), (0, 3));
    assert_eq!(bounds(SegwitExpr::multi(4, three.clone())), (4, 3));
    assert_eq!(bounds(SegwitExpr::multi(1, vec![])), (1, 0));
    assert_eq!(bounds(SegwitExpr::multi(1, data.pks.clone())), (1, 21));
    assert!(SegwitExpr::multi(20, data.pks[..20].to_vec()).is_ok());
    assert!(SegwitExpr::multi(1, three.clone()).is_ok());
    assert!(SegwitExpr::multi(3, three).is_ok());

    let subs = || vec![SegwitExpr::pk(data.pks[0]).unwrap(), SegwitExpr::TRUE];
    assert_eq!(bounds(SegwitExpr::thresh(0, subs())), (0, 2));
    assert_eq!(bounds(SegwitExpr::thresh(3, subs())), (3, 2));
    assert!(SegwitExpr::thresh(2, subs()).is_ok());

    // multi_a has no key cap below the script size limit.
    let xonly = vec![data.x_only_pks[0]; 100];
    assert!(Expr::<_, Tap>::multi_a(100, xonly.clone()).is_ok());
    assert!(matches!(Expr::<_, Tap>::multi_a(101, xonly), Err(ExprError::Threshold(..))));
}

#[test]
fn context_rules_apply_on_construction() {
    let data = setup::TestData::new_fixed_data(1);
    let uncompressed = bitcoin::PublicKey { compressed: false, inner: data.pks[0].inner };

    assert_eq!(
        SegwitExpr::pk(uncompressed).unwrap_err(),
        ExprError::Context(ScriptContextError::UncompressedKeysNotAllowed(uncompressed.to_string()))
    );
    assert!(Expr::<_, Legacy>::pk(uncompressed).is_ok());
    assert_eq!(
        Expr::<_, Tap>::multi(1, vec![data.x_only_pks[0]]).unwrap_err(),
        ExprError::Context(ScriptContextError::TaprootMultiDisabled)
    );
    assert_eq!(
        SegwitExpr::multi_a(1, vec![data.pks[0]]).unwrap_err(),
        ExprError::Context(ScriptContextError::MultiANotAllowed)
    );
    assert!(SegwitExpr::after(0).is_err());
    assert!(SegwitExpr::older(0).is_err());
}

#[test]
fn validation_is_deterministic() {
    let data = setup::TestData::new_fixed_data(3);
    let build = || {
        SegwitExpr::or_d(
            SegwitExpr::multi(2, data.pks.clone()).unwrap(),
            SegwitExpr::and_v(
                SegwitExpr::verify(SegwitExpr::pk(data.pks[0]).unwrap()).unwrap(),
                SegwitExpr::older(4032).unwrap(),
            )
            .unwrap(),
        )
        .unwrap()
    };
    let first = Miniscript::validate(&build()).unwrap();
    let second = Miniscript::validate(&build()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.ty(), second.ty());
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(format!("{:?}", first), format!("{:?}", second));
    assert_eq!(first.encode(), second.encode());
}
