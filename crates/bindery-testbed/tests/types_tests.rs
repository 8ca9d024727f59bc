//! Integration tests for the conversion protocol through the `types` module
//!
//! Tests cover:
//! - Values exported to script for every supported type
//! - Typed module functions: tuples, pairs, variants, maps and sets
//! - Range checks on narrow integer arguments
//! - Round trips through `from_script` and `to_script`
//! - Variant alternative priority and map key fidelity

use std::collections::BTreeMap;

use bindery::{BindError, FromNative, IntoNative, NativeType, NativeTyped, NativeValue, ScriptValue, U16String};
use bindery_testbed::types::string_or_number;
use bindery_testbed::Runtime;

fn runtime() -> Runtime {
    Runtime::new().expect("runtime")
}

fn export(rt: &Runtime, name: &str) -> ScriptValue {
    rt.types().get(name).cloned().unwrap_or(ScriptValue::Undefined)
}

// ============================================================================
// ToScript exports
// ============================================================================

#[test]
fn test_scalar_exports() {
    let rt = runtime();
    assert_eq!(export(&rt, "value"), ScriptValue::string("value"));
    assert_eq!(export(&rt, "null"), ScriptValue::Null);
    assert_eq!(export(&rt, "integer"), ScriptValue::Int(123));
    assert_eq!(export(&rt, "number"), ScriptValue::Float(3.14));
    assert_eq!(export(&rt, "bool"), ScriptValue::Bool(false));
    assert_eq!(export(&rt, "variant"), ScriptValue::Int(8964));
    assert_eq!(export(&rt, "symbol").type_name(), "symbol");
}

#[test]
fn test_string_exports() {
    let rt = runtime();
    assert_eq!(export(&rt, "string"), ScriptValue::string("字符串"));
    assert_eq!(export(&rt, "ustring"), ScriptValue::string("ustring"));
    assert_eq!(export(&rt, "charptr"), ScriptValue::string("チャーポインター"));
    assert_eq!(export(&rt, "ucharptr"), ScriptValue::string("ucharptr"));
}

#[test]
fn test_container_exports() {
    let rt = runtime();
    assert_eq!(
        export(&rt, "tuple"),
        ScriptValue::Array(vec![
            ScriptValue::Int(89),
            ScriptValue::Bool(true),
            ScriptValue::string("64"),
        ])
    );
    assert_eq!(export(&rt, "tuple").to_string(), "[89, true, '64']");
    assert_eq!(
        export(&rt, "pair"),
        ScriptValue::Array(vec![ScriptValue::string("a"), ScriptValue::string("pair")])
    );
    assert_eq!(export(&rt, "map"), ScriptValue::map([("123", ScriptValue::Int(456))]));
}

// ============================================================================
// FromScript through module functions
// ============================================================================

#[test]
fn test_pass_tuple_and_pair() {
    let mut rt = runtime();
    let input = ScriptValue::Array(vec![ScriptValue::Int(89), ScriptValue::Int(64)]);
    assert_eq!(rt.call_types("passTuple", &[input.clone()]).unwrap(), input);
    assert_eq!(rt.call_types("passPair", &[input.clone()]).unwrap(), input);

    // Wrong arity is reported against the argument
    let short = ScriptValue::Array(vec![ScriptValue::Int(89)]);
    let err = rt.call_types("passPair", &[short]).unwrap_err();
    assert!(matches!(err, BindError::Arity { index: 0, expected: 2, actual: 1 }));
}

#[test]
fn test_pass_variant() {
    let mut rt = runtime();
    assert_eq!(
        rt.call_types("passVariant", &[ScriptValue::string("str")]).unwrap(),
        ScriptValue::string("str")
    );
    // An integer comes back through the Number alternative unchanged
    let number = rt.call_types("passVariant", &[ScriptValue::Int(2)]).unwrap();
    assert_eq!(number, ScriptValue::Int(2));
    assert_eq!(
        rt.call_types("passVariant", &[ScriptValue::Float(2.5)]).unwrap(),
        ScriptValue::Float(2.5)
    );

    let err = rt.call_types("passVariant", &[ScriptValue::Bool(false)]).unwrap_err();
    assert!(err.to_string().starts_with("Error processing argument at index 0"));
    assert_eq!(err.argument_index(), Some(0));
}

#[test]
fn test_pass_map() {
    let mut rt = runtime();
    let input = ScriptValue::map([("str", ScriptValue::Int(123))]);
    assert_eq!(rt.call_types("passMap", &[input.clone()]).unwrap(), input);

    // Values are converted, not coerced
    let bad = ScriptValue::map([("str", ScriptValue::string("123"))]);
    assert!(rt.call_types("passMap", &[bad]).is_err());
}

#[test]
fn test_pass_set_drops_duplicates() {
    let mut rt = runtime();
    let ints = |items: &[i64]| ScriptValue::Array(items.iter().map(|i| ScriptValue::Int(*i)).collect());

    // Duplicates collapse on the way in, order follows the native set
    let out = rt.call_types("passSet", &[ints(&[3, 1, 2, 2, 3])]).unwrap();
    assert_eq!(out, ints(&[1, 2, 3]));
    assert_eq!(rt.call_types("passSet", &[ints(&[])]).unwrap(), ints(&[]));

    let err = rt
        .call_types("passSet", &[ScriptValue::Array(vec![ScriptValue::string("1")])])
        .unwrap_err();
    assert!(matches!(err, BindError::Conversion { index: 0, .. }));
}

#[test]
fn test_narrow_integer_is_range_checked() {
    let mut rt = runtime();
    assert_eq!(rt.call_types("passByte", &[ScriptValue::Int(255)]).unwrap(), ScriptValue::Int(255));

    for bad in [ScriptValue::Int(256), ScriptValue::Int(-1), ScriptValue::Float(1.5)] {
        let err = rt.call_types("passByte", &[bad]).unwrap_err();
        assert!(err.is_conversion_failure());
        assert!(err.to_string().ends_with("to u8"), "{}", err);
    }
}

#[test]
fn test_missing_argument_is_undefined() {
    let mut rt = runtime();
    let err = rt.call_types("passVariant", &[]).unwrap_err();
    assert!(matches!(err, BindError::Conversion { index: 0, ref actual, .. } if actual == "undefined"));
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_scalar_round_trips() {
    let mut rt = runtime();
    let bridge = rt.bridge();
    let cases = [
        (ScriptValue::Null, NativeType::Null),
        (ScriptValue::Bool(true), NativeType::Bool),
        (ScriptValue::Int(-42), NativeType::Integer),
        (ScriptValue::Float(3.14), NativeType::Number),
        (ScriptValue::Int(2), NativeType::Number),
        (ScriptValue::Float(64.0), NativeType::Integer),
        (ScriptValue::string("字符串"), NativeType::String),
        (ScriptValue::string("チャーポインター"), NativeType::U16String),
        (ScriptValue::string(""), NativeType::String),
    ];
    for (value, ty) in cases {
        let native = bridge.from_script(&value, &ty, 0).unwrap();
        assert_eq!(bridge.to_script(native).unwrap(), value, "round trip of {}", ty);
    }
}

#[test]
fn test_native_round_trips() {
    let mut rt = runtime();
    let bridge = rt.bridge();

    let text = "字符串".to_string();
    let script = bridge.to_script(text.clone().into_native()).unwrap();
    let back = bridge.from_script(&script, &String::native_type(), 0).unwrap();
    assert_eq!(String::from_native(back).unwrap(), text);

    let units = U16String::from_str("ustring");
    let script = bridge.to_script(units.clone().into_native()).unwrap();
    let back = bridge.from_script(&script, &U16String::native_type(), 0).unwrap();
    assert_eq!(U16String::from_native(back).unwrap(), units);

    let list = vec![1i64, 2, 3];
    let script = bridge.to_script(list.clone().into_native()).unwrap();
    let back = bridge.from_script(&script, &Vec::<i64>::native_type(), 0).unwrap();
    assert_eq!(Vec::<i64>::from_native(back).unwrap(), list);
}

#[test]
fn test_tuple_from_script_is_exact() {
    let mut rt = runtime();
    let bridge = rt.bridge();
    let script = ScriptValue::Array(vec![
        ScriptValue::Int(89),
        ScriptValue::Bool(true),
        ScriptValue::string("64"),
    ]);
    let native = bridge
        .from_script(&script, &<(i64, bool, String)>::native_type(), 0)
        .unwrap();
    let (a, b, c) = <(i64, bool, String)>::from_native(native.clone()).unwrap();
    assert_eq!((a, b, c.as_str()), (89, true, "64"));
    assert_eq!(bridge.to_script(native).unwrap().to_string(), "[89, true, '64']");
}

#[test]
fn test_variant_priority() {
    let mut rt = runtime();
    let bridge = rt.bridge();
    let ty = string_or_number();

    let v = bridge.from_script(&ScriptValue::string("str"), &ty, 0).unwrap();
    assert!(matches!(v, NativeValue::Variant { index: 0, .. }));
    let v = bridge.from_script(&ScriptValue::Int(2), &ty, 0).unwrap();
    assert!(matches!(v, NativeValue::Variant { index: 1, .. }));
    let err = bridge.from_script(&ScriptValue::Bool(false), &ty, 0).unwrap_err();
    assert!(matches!(err, BindError::Conversion { index: 0, .. }));
}

#[test]
fn test_map_fidelity() {
    let mut rt = runtime();
    let bridge = rt.bridge();
    let script = ScriptValue::map([("str", ScriptValue::Int(123))]);
    let native = bridge
        .from_script(&script, &BTreeMap::<String, i64>::native_type(), 0)
        .unwrap();
    let typed = BTreeMap::<String, i64>::from_native(native.clone()).unwrap();
    assert_eq!(typed.get("str"), Some(&123));
    assert_eq!(bridge.to_script(native).unwrap(), script);
}
