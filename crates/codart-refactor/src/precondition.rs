use std::fmt;
use std::path::Path;

use crate::model::{Class, Field, FileModel};
use crate::move_field::{MoveFieldError, MoveFieldParams};

/// The part a file plays in a field move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileRole {
    Source,
    Target,
    Other,
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileRole::Source => "source",
            FileRole::Target => "target",
            FileRole::Other => "project",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Participation {
    Participate,
    Skip { reason: String },
}

/// Legality checks for a field move. Nothing here touches file contents.
#[derive(Debug, Clone, Copy)]
pub struct PreconditionChecker<'a> {
    params: &'a MoveFieldParams,
}

impl<'a> PreconditionChecker<'a> {
    pub fn new(params: &'a MoveFieldParams) -> Self {
        Self { params }
    }

    /// Files with constructs the rewrite cannot handle are skipped, unless they are the source or
    /// target file.
    pub fn participation(
        &self,
        path: &Path,
        model: &FileModel,
        role: FileRole,
    ) -> Result<Participation, MoveFieldError> {
        let Some(reason) = model.unsupported_reason() else {
            return Ok(Participation::Participate);
        };
        match role {
            FileRole::Other => Ok(Participation::Skip { reason }),
            FileRole::Source | FileRole::Target => Err(MoveFieldError::UnsupportedConstruct {
                file: path.to_path_buf(),
                role,
                reason,
            }),
        }
    }

    /// The field to move, as declared in the source file.
    pub fn check_source<'m>(&self, model: &'m FileModel) -> Result<&'m Field, MoveFieldError> {
        let params = self.params;
        model
            .declares(&params.source_package, &params.source_class)
            .then(|| model.class(&params.source_class))
            .flatten()
            .and_then(|class| class.fields.get(&params.field_name))
            .ok_or_else(|| MoveFieldError::FieldNotFound {
                class: params.source_qualified_name(),
                field: params.field_name.clone(),
            })
    }

    /// The target class, which must exist, must not already declare the field and must be
    /// constructible without arguments.
    pub fn check_target<'m>(&self, model: &'m FileModel) -> Result<&'m Class, MoveFieldError> {
        let params = self.params;
        let class = model
            .declares(&params.target_package, &params.target_class)
            .then(|| model.class(&params.target_class))
            .flatten()
            .ok_or_else(|| MoveFieldError::TargetDoesNotExist {
                class: params.target_qualified_name(),
            })?;

        if class.fields.contains_key(&params.field_name) {
            return Err(MoveFieldError::DuplicateField {
                class: params.target_qualified_name(),
                field: params.field_name.clone(),
            });
        }
        if !class.has_no_arg_constructor() {
            return Err(MoveFieldError::TargetNoEmptyConstructor {
                class: params.target_qualified_name(),
            });
        }
        Ok(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::build_model;
    use codart_syntax::parse_java;

    fn model(text: &str) -> FileModel {
        build_model(text, &parse_java(text))
    }

    fn params() -> MoveFieldParams {
        MoveFieldParams::new("source", "Source", "a", "target", "Target")
    }

    #[test]
    fn finds_the_source_field() {
        let params = params();
        let checker = PreconditionChecker::new(&params);
        let source = model("package source; public class Source { int a; }");
        assert_eq!(checker.check_source(&source).unwrap().name, "a");

        let missing = model("package source; public class Source { int b; }");
        assert!(matches!(
            checker.check_source(&missing),
            Err(MoveFieldError::FieldNotFound { .. })
        ));

        let wrong_package = model("package other; public class Source { int a; }");
        assert!(matches!(
            checker.check_source(&wrong_package),
            Err(MoveFieldError::FieldNotFound { .. })
        ));
    }

    #[test]
    fn target_checks() {
        let params = params();
        let checker = PreconditionChecker::new(&params);

        let ok = model("package target; public class Target { public Target() {} Target(int x) {} }");
        assert_eq!(checker.check_target(&ok).unwrap().name, "Target");

        let implicit_ctor = model("package target; public class Target {}");
        assert!(checker.check_target(&implicit_ctor).is_ok());

        let absent = model("package target; public class Other {}");
        assert!(matches!(
            checker.check_target(&absent),
            Err(MoveFieldError::TargetDoesNotExist { .. })
        ));

        let duplicate = model("package target; public class Target { String a; }");
        assert!(matches!(
            checker.check_target(&duplicate),
            Err(MoveFieldError::DuplicateField { .. })
        ));

        let no_empty = model("package target; public class Target { Target(int x) {} }");
        assert!(matches!(
            checker.check_target(&no_empty),
            Err(MoveFieldError::TargetNoEmptyConstructor { .. })
        ));
    }

    #[test]
    fn unsupported_files_are_skipped_unless_they_play_a_role() {
        let params = params();
        let checker = PreconditionChecker::new(&params);
        let nested = model("package p; public class A { class B {} }");
        let path = Path::new("p/A.java");

        assert_eq!(
            checker
                .participation(path, &nested, FileRole::Other)
                .unwrap(),
            Participation::Skip {
                reason: "nested type declaration".to_string()
            }
        );
        let err = checker
            .participation(path, &nested, FileRole::Target)
            .unwrap_err();
        assert!(
            matches!(err, MoveFieldError::UnsupportedConstruct { role: FileRole::Target, .. }),
            "{err:?}"
        );

        let plain = model("package p; public class A {}");
        assert_eq!(
            checker.participation(path, &plain, FileRole::Source).unwrap(),
            Participation::Participate
        );
    }
}
