//! Java refactorings over token-accurate rewrites.
//!
//! The centre of the crate is the field move (`move_field`): it moves a field from one class to
//! another and threads a target instance through every method that used the field. Alongside it:
//! - a token-indexed rewrite buffer (`rewrite`)
//! - a per-file symbol model and its builder (`model`, `symbols`)
//! - a project driver that discovers files and writes results (`project`)
//! - refactorings backed by a semantic index (`single_file`, `pushdown`, `index`)

mod call_sites;
mod model;
mod move_field;
mod precondition;
mod project;
mod pushdown;
mod rewrite;
mod single_file;
mod symbols;

pub mod index;

pub use model::{
    simple_type_name, BodyItem, Class, ClassBodyLocation, ExpressionName, Field, FieldLocation,
    FileModel, Import, ImportAnchors, LocalVariable, Method, MethodInvocation, MethodLocation,
    Package, TokenSpan,
};
pub use move_field::{
    accessor_names, move_field, MoveFieldError, MoveFieldOutcome, MoveFieldParams, MovedField,
    SkippedFile, UpdatedMethod,
};
pub use precondition::{FileRole, Participation, PreconditionChecker};
pub use project::{
    discover_java_files, is_class_file, order_files, refactor, refactor_project,
    suffix_output_path, MoveFieldReport, MoveFieldRequest, OutputPathStrategy,
};
pub use pushdown::{push_down_field, push_down_method};
pub use rewrite::{InsertSide, RewriteBuffer, RewriteError, RewriteOp};
pub use single_file::{
    decrease_field_visibility, make_class_non_final, make_field_non_static, make_method_static,
    IndexRefactorError, SingleFileEdit,
};
pub use symbols::build_model;
