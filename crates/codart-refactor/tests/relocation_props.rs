use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use codart_refactor::{build_model, move_field, FileModel, MoveFieldParams};
use codart_syntax::parse_java;
use proptest::prelude::*;

const PROPTEST_CASES: u32 = 64;

const TYPES: &[(&str, &str)] = &[
    ("int", "0"),
    ("long[]", "null"),
    ("String", "\"s\""),
    ("List<String>", "null"),
    ("Map<String, Integer>", "null"),
    ("java.util.Set<?>", "null"),
];

#[derive(Clone, Debug)]
struct FieldShape {
    annotated: bool,
    access: Option<&'static str>,
    is_static: bool,
    is_final: bool,
    ty: (&'static str, &'static str),
    initialized: bool,
    has_sibling: bool,
}

impl FieldShape {
    fn source(&self) -> String {
        let mut decl = String::new();
        if self.annotated {
            decl.push_str("@Deprecated ");
        }
        if let Some(access) = self.access {
            decl.push_str(access);
            decl.push(' ');
        }
        if self.is_static {
            decl.push_str("static ");
        }
        if self.is_final {
            decl.push_str("final ");
        }
        let (ty, init) = self.ty;
        decl.push_str(ty);
        decl.push_str(" a");
        if self.initialized {
            decl.push_str(" = ");
            decl.push_str(init);
        }
        if self.has_sibling {
            decl.push_str(", b");
        }
        format!(
            "package source;\n\npublic class Source {{\n    {decl};\n\n    Object read() {{\n        return a;\n    }}\n}}\n"
        )
    }
}

fn arb_field_shape() -> impl Strategy<Value = FieldShape> {
    (
        any::<bool>(),
        prop::sample::select(vec![None, Some("public"), Some("protected"), Some("private")]),
        any::<bool>(),
        any::<bool>(),
        prop::sample::select(TYPES.to_vec()),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(
            |(annotated, access, is_static, is_final, ty, initialized, has_sibling)| FieldShape {
                annotated,
                access,
                is_static,
                is_final,
                ty,
                initialized,
                has_sibling,
            },
        )
}

fn model(text: &str) -> FileModel {
    build_model(text, &parse_java(text))
}

/// Modifiers the moved declaration is expected to carry: the original ones, made `private`
/// when they name no access level.
fn relocated_modifiers(original: &[String]) -> Vec<String> {
    let mut modifiers = original.to_vec();
    if !modifiers
        .iter()
        .any(|m| matches!(m.as_str(), "public" | "protected" | "private"))
    {
        let after_annotations = modifiers.iter().take_while(|m| m.starts_with('@')).count();
        modifiers.insert(after_annotations, "private".to_string());
    }
    modifiers
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: PROPTEST_CASES,
        .. ProptestConfig::default()
    })]

    #[test]
    fn moved_field_keeps_its_type_and_modifiers(shape in arb_field_shape()) {
        let source = shape.source();
        let original = model(&source);
        let field = original.class("Source").unwrap().fields["a"].clone();

        let files = BTreeMap::from([
            (PathBuf::from("source/Source.java"), source.clone()),
            (
                PathBuf::from("target/Target.java"),
                "package target;\n\npublic class Target {\n}\n".to_string(),
            ),
        ]);
        let outcome = move_field(
            &files,
            &MoveFieldParams::new("source", "Source", "a", "target", "Target"),
        )
        .unwrap();

        let source_after = model(&outcome.files[Path::new("source/Source.java")]);
        prop_assert_eq!(source_after.parse_error_count, 0);
        let source_class = source_after.class("Source").unwrap();
        prop_assert!(!source_class.fields.contains_key("a"));
        prop_assert_eq!(source_class.fields.contains_key("b"), shape.has_sibling);
        let read = &source_class.methods["read(Target)"];
        prop_assert_eq!(&read.parameters, &vec![("Target".to_string(), "$$target".to_string())]);

        let target_after = model(&outcome.files[Path::new("target/Target.java")]);
        prop_assert_eq!(target_after.parse_error_count, 0);
        let target_class = target_after.class("Target").unwrap();
        let moved = &target_class.fields["a"];
        prop_assert_eq!(&moved.ty, &field.ty);
        prop_assert_eq!(&moved.modifiers, &relocated_modifiers(&field.modifiers));
        prop_assert_eq!(&moved.declarator_text, &field.declarator_text);

        let ty_key: String = field.ty.chars().filter(|c| !c.is_whitespace()).collect();
        prop_assert!(target_class.methods.contains_key("getA()"));
        let setter_key = format!("setA({ty_key})");
        prop_assert!(target_class.methods.contains_key(&setter_key));
    }
}
