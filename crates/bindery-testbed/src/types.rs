//! `types` module: one exported value per supported conversion, and
//! identity functions that round-trip typed arguments.

use std::collections::{BTreeMap, BTreeSet};

use bindery::{
    arg, IntoNative, ModuleBuilder, ModuleDef, NativeType, NativeTyped, NativeValue, ScriptValue, Symbol, U16String,
};

/// Module name, also the global the exports are published under
pub const MODULE: &str = "types";

/// Declared type of `passVariant`'s argument
pub fn string_or_number() -> NativeType {
    NativeType::Variant(vec![NativeType::String, NativeType::Number])
}

/// Build the `types` module
pub fn module() -> ModuleDef {
    let map: BTreeMap<i64, i64> = [(123, 456)].into_iter().collect();

    ModuleBuilder::new(MODULE)
        .value("value", ScriptValue::string("value"))
        .value("null", NativeValue::Null)
        .value("integer", 123i64)
        .value("number", 3.14f64)
        .value("bool", false)
        .value("string", "字符串".to_string())
        .value("ustring", U16String::from_str("ustring"))
        .value("charptr", "チャーポインター")
        .value("ucharptr", U16String::from_str("ucharptr"))
        .value("symbol", Symbol::new("symbol"))
        .value("tuple", (89i64, true, "64"))
        .value("pair", ("a", "pair"))
        .value(
            "variant",
            NativeValue::Variant {
                index: 1,
                value: Box::new(NativeValue::Integer(8964)),
            },
        )
        .value("map", map)
        .function("passTuple", vec![<(i64, i64)>::native_type()], |_cx, args| {
            let tuple: (i64, i64) = arg(&args, 0)?;
            Ok(tuple.into_native())
        })
        .function("passPair", vec![<(i64, i64)>::native_type()], |_cx, args| {
            let pair: (i64, i64) = arg(&args, 0)?;
            Ok(pair.into_native())
        })
        .function("passVariant", vec![string_or_number()], |_cx, mut args| {
            Ok(args.pop().unwrap_or_default())
        })
        .function("passSet", vec![BTreeSet::<i64>::native_type()], |_cx, args| {
            let set: BTreeSet<i64> = arg(&args, 0)?;
            Ok(set.into_native())
        })
        .function("passByte", vec![u8::native_type()], |_cx, args| {
            let byte: u8 = arg(&args, 0)?;
            Ok(byte.into_native())
        })
        .function("passMap", vec![BTreeMap::<String, i64>::native_type()], |_cx, args| {
            let map: BTreeMap<String, i64> = arg(&args, 0)?;
            Ok(map.into_native())
        })
        .build()
}
