pub use codegen::generate;
pub use diagnostics;
pub use errors;
pub use errors::{BbError, ErrorS};
pub use files::*;
pub use infer::infer;
pub use lexer::{tokenize, Tokenizer};
pub use parser::{parse, Node, Param, ParamType, QualifiedName, Section, SectionCall, Template};
pub use span::*;
pub use token::{Token, TokenKind};

use tracing::debug;

mod files;

/// Unit name used when neither the options nor the template name one
pub const DEFAULT_UNIT_NAME: &str = "template";

/// How a template is compiled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Name of the generated top level module. A `name` directive wins over it.
    pub name: Option<String>,
    /// Source file named in the generated header comment
    pub file_name: Option<String>,
}

impl CompileOptions {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

/// Tokenize, parse and infer a template
pub fn analyze(source: &str) -> Result<Template, ErrorS> {
    let tokens = tokenize(source)?;
    debug!(tokens = tokens.len(), "tokenized template");

    let template = parse(&tokens)?;
    debug!(
        sections = template.sections().len(),
        directives = template.directives.len(),
        "parsed template"
    );

    let template = infer(template)?;
    debug!("inferred parameter types");

    Ok(template)
}

/// Compile a template in to Rust source
///
/// No output is produced when any stage fails.
pub fn compile(source: &str, options: &CompileOptions) -> Result<String, ErrorS> {
    let template = analyze(source)?;

    let unit_name = options.name.as_deref().unwrap_or(DEFAULT_UNIT_NAME);
    let generated = generate(&template, unit_name)?;
    debug!(bytes = generated.len(), "generated unit");

    let header = match &options.file_name {
        Some(file_name) => format!("// @generated by bb from {file_name}\n"),
        None => "// @generated by bb\n".to_string(),
    };

    Ok(header + &generated)
}
