use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term::{self, termcolor::NoColor};
use errors::{BbError, ErrorS, StructuralError, SyntaxError, TypeError};
use serde::{Deserialize, Serialize};
use span::{Location, Span};

/// Get a list of diagnostics from a list of errors
pub fn get_diagnostics(errs: &[ErrorS], source: &str) -> Vec<Diagnosis> {
    errs.iter()
        .map(|(err, location)| Diagnosis {
            range: get_range(source, location),
            severity: Some(DiagnosisSeverity::ERROR),
            message: err.to_string(),
        })
        .collect()
}

/// Render an error as a human readable report pointing at the template source
pub fn report(err: &ErrorS, file_name: &str, source: &str) -> String {
    let (err, location) = err;

    let file = SimpleFile::new(file_name, source);
    let diagnostic = err.as_diagnostic(&get_span(source, location));

    let mut writer = NoColor::new(Vec::new());

    match term::emit(&mut writer, &term::Config::default(), &file, &diagnostic) {
        Ok(()) => String::from_utf8_lossy(&writer.into_inner()).to_string(),
        Err(_) => format!("{file_name}:{location}: {err}\n"),
    }
}

/// Byte span of the character at the location, empty at the end of a line
fn get_span(source: &str, location: &Location) -> Span {
    let start = location.offset.min(source.len());

    let width = source[start..]
        .chars()
        .next()
        .filter(|c| *c != '\n')
        .map(char::len_utf8)
        .unwrap_or_default();

    start..start + width
}

fn get_range(source: &str, location: &Location) -> DiagnosisRange {
    let span = get_span(source, location);

    let start = get_position(location);
    let end = DiagnosisPosition {
        character: start.character + u32::from(!span.is_empty()),
        ..start
    };

    DiagnosisRange { start, end }
}

fn get_position(location: &Location) -> DiagnosisPosition {
    DiagnosisPosition {
        line: location.line.saturating_sub(1) as u32,
        character: location.column.saturating_sub(1) as u32,
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub range: DiagnosisRange,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<DiagnosisSeverity>,

    pub message: String,
}

#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Deserialize, Serialize)]
#[serde(transparent)]
pub struct DiagnosisSeverity(i32);
impl DiagnosisSeverity {
    pub const ERROR: DiagnosisSeverity = DiagnosisSeverity(1);
}

/// Zero based line and character
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Default, Deserialize, Serialize)]
pub struct DiagnosisPosition {
    pub line: u32,
    pub character: u32,
}

impl DiagnosisPosition {
    pub fn new(line: u32, character: u32) -> DiagnosisPosition {
        DiagnosisPosition { line, character }
    }
}

#[derive(Debug, Eq, PartialEq, Copy, Clone, Default, Deserialize, Serialize)]
pub struct DiagnosisRange {
    /// The range's start position (inclusive)
    pub start: DiagnosisPosition,
    /// The range's end position (exclusive)
    pub end: DiagnosisPosition,
}

impl DiagnosisRange {
    pub fn new(start: DiagnosisPosition, end: DiagnosisPosition) -> DiagnosisRange {
        DiagnosisRange { start, end }
    }
}

trait AsDiagnostic {
    fn as_diagnostic(&self, span: &Span) -> Diagnostic<()>;
}

macro_rules! impl_as_diagnostic {
    ($($error:tt),+) => {$(
        impl AsDiagnostic for $error {
            fn as_diagnostic(&self, span: &Span) -> Diagnostic<()> {
                Diagnostic::error()
                    .with_code(stringify!($error))
                    .with_message(self.to_string())
                    .with_labels(vec![Label::primary((), span.clone())])
            }
        }
    )+};
}

impl_as_diagnostic!(SyntaxError, StructuralError, TypeError);

impl AsDiagnostic for BbError {
    fn as_diagnostic(&self, span: &Span) -> Diagnostic<()> {
        match self {
            BbError::SyntaxError(e) => e.as_diagnostic(span),
            BbError::StructuralError(e) => e.as_diagnostic(span),
            BbError::TypeError(e) => e.as_diagnostic(span),
        }
    }
}
