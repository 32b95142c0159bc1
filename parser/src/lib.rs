pub use ast::*;
pub use directive::{parse_directive, REPEATABLE_DIRECTIVES};
pub use parser::{parse, TemplateParser};
pub use scan::split_arguments;
pub use syntax::{canonical_type, is_identifier, parse_call, CallSyntax, RESERVED_SECTION_NAME};

mod ast;
mod directive;
mod parser;
mod scan;
mod syntax;
