use parser::canonical_type;
use quote::ToTokens;
use syn::{Expr, Lit, UnOp};

/// Where the type of a usage site comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// A concrete type, canonically spaced
    Known(String),
    /// Whatever type another slot ends up with
    Slot(usize),
    /// A borrow of another slot
    Ref { slot: usize, mutable: bool },
    /// Nothing can be said, the site contributes no type
    Unknown,
}

/// Classify an expression's type using `lookup` to resolve identifiers to slots
pub fn classify(text: &str, lookup: &impl Fn(&str) -> Option<usize>) -> Origin {
    match syn::parse_str::<Expr>(text) {
        Ok(expr) => classify_expr(&expr, lookup),
        Err(_) => Origin::Unknown,
    }
}

fn known(ty: &str) -> Origin {
    Origin::Known(ty.to_string())
}

/// The type of a borrow of `ty`
pub fn borrowed(ty: &str, mutable: bool) -> String {
    let prefix = if mutable { "&mut " } else { "&" };

    canonical_type(&format!("{prefix}{ty}")).unwrap_or_else(|| format!("{prefix}{ty}"))
}

fn classify_expr(expr: &Expr, lookup: &impl Fn(&str) -> Option<usize>) -> Origin {
    match expr {
        Expr::Lit(expr) => literal(&expr.lit),
        Expr::Paren(expr) => classify_expr(&expr.expr, lookup),
        Expr::Group(expr) => classify_expr(&expr.expr, lookup),
        Expr::Unary(expr) if matches!(expr.op, UnOp::Neg(_)) => classify_expr(&expr.expr, lookup),
        Expr::Reference(expr) => {
            let mutable = expr.mutability.is_some();

            match classify_expr(&expr.expr, lookup) {
                Origin::Known(ty) => Origin::Known(borrowed(&ty, mutable)),
                Origin::Slot(slot) => Origin::Ref { slot, mutable },
                _ => Origin::Unknown,
            }
        }
        Expr::Cast(expr) => canonical_type(&expr.ty.to_token_stream().to_string())
            .map(Origin::Known)
            .unwrap_or(Origin::Unknown),
        Expr::Call(call) => match call.func.as_ref() {
            Expr::Path(func) if is_path(&func.path, &["String", "from"]) => known("String"),
            Expr::Path(func) if is_path(&func.path, &["String", "new"]) => known("String"),
            _ => Origin::Unknown,
        },
        Expr::Macro(expr) if is_path(&expr.mac.path, &["format"]) => known("String"),
        Expr::MethodCall(call) if call.method == "to_string" => known("String"),
        Expr::MethodCall(call) if call.method == "clone" && call.args.is_empty() => {
            match classify_expr(&call.receiver, lookup) {
                Origin::Ref { slot, .. } => Origin::Slot(slot),
                origin => origin,
            }
        }
        Expr::MethodCall(call) if call.method == "to_owned" => {
            match classify_expr(&call.receiver, lookup) {
                Origin::Known(ty) if ty == "&str" => known("String"),
                _ => Origin::Unknown,
            }
        }
        Expr::Path(expr) if expr.qself.is_none() => expr
            .path
            .get_ident()
            .and_then(|ident| lookup(&ident.to_string()))
            .map(Origin::Slot)
            .unwrap_or(Origin::Unknown),
        _ => Origin::Unknown,
    }
}

fn literal(lit: &Lit) -> Origin {
    match lit {
        Lit::Str(_) => known("&str"),
        Lit::Char(_) => known("char"),
        Lit::Bool(_) => known("bool"),
        Lit::Byte(_) => known("u8"),
        Lit::Int(int) if int.suffix().is_empty() => known("i32"),
        Lit::Int(int) => known(int.suffix()),
        Lit::Float(float) if float.suffix().is_empty() => known("f64"),
        Lit::Float(float) => known(float.suffix()),
        _ => Origin::Unknown,
    }
}

fn is_path(path: &syn::Path, segments: &[&str]) -> bool {
    path.segments.len() == segments.len()
        && path
            .segments
            .iter()
            .zip(segments)
            .all(|(segment, expected)| segment.ident == expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lookup(name: &str) -> Option<usize> {
        match name {
            "name" => Some(0),
            "age" => Some(1),
            _ => None,
        }
    }

    macro_rules! origin_test {
        ($test_name:ident, $expr:expr, $origin:expr) => {
            #[test]
            fn $test_name() {
                assert_eq!($origin, classify($expr, &lookup));
            }
        };
    }

    origin_test!(string_literal, r#""Edward""#, known("&str"));

    origin_test!(char_literal, "'x'", known("char"));

    origin_test!(bool_literal, "false", known("bool"));

    origin_test!(integer_literal, "9001", known("i32"));

    origin_test!(suffixed_integer, "9001u64", known("u64"));

    origin_test!(float_literal, "1.5", known("f64"));

    origin_test!(suffixed_float, "1.5f32", known("f32"));

    origin_test!(negative_literal, "-19", known("i32"));

    origin_test!(parenthesized_literal, "((19))", known("i32"));

    origin_test!(cast, "age as  u8", known("u8"));

    origin_test!(cast_to_reference, "x as & str", known("&str"));

    origin_test!(string_from, r#"String::from("a")"#, known("String"));

    origin_test!(string_new, "String::new()", known("String"));

    origin_test!(format_macro, r#"format!("{}!", name)"#, known("String"));

    origin_test!(to_string, "age.to_string()", known("String"));

    origin_test!(to_owned_on_literal, r#""a".to_owned()"#, known("String"));

    origin_test!(to_owned_on_other, "name.to_owned()", Origin::Unknown);

    origin_test!(identifier, "age", Origin::Slot(1));

    origin_test!(unknown_identifier, "other", Origin::Unknown);

    origin_test!(
        borrowed_identifier,
        "&name",
        Origin::Ref {
            slot: 0,
            mutable: false
        }
    );

    origin_test!(
        mutably_borrowed_identifier,
        "&mut age",
        Origin::Ref {
            slot: 1,
            mutable: true
        }
    );

    origin_test!(borrowed_literal, "&1u8", known("&u8"));

    origin_test!(borrowed_str_literal, r#"&"Edward""#, known("&&str"));

    origin_test!(borrowed_unknown, "&compute()", Origin::Unknown);

    origin_test!(cloned_identifier, "name.clone()", Origin::Slot(0));

    origin_test!(cloned_borrow, "(&age).clone()", Origin::Slot(1));

    origin_test!(cloned_literal, r#""a".clone()"#, known("&str"));

    origin_test!(function_call, "compute(1)", Origin::Unknown);

    origin_test!(not_an_expression, "let x = ", Origin::Unknown);
}
