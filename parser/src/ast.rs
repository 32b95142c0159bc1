use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use span::{Located, Location};

/// Directive names understood by the parser
pub const IMPORT_DIRECTIVE: &str = "import";
pub const PARAMS_DIRECTIVE: &str = "params";
pub const NAME_DIRECTIVE: &str = "name";

/// Path of section names from the template root, e.g. `outer.inner`
///
/// The root section has an empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualifiedName(Vec<String>);

impl QualifiedName {
    pub fn root() -> Self {
        Self(vec![])
    }

    pub fn new(segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.into());
        Self(segments)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The last segment, empty for the root
    pub fn ident(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// A parsed template: the unnamed root section plus every directive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub directives: Vec<Directive>,
    pub root: Section,
}

impl Template {
    /// Paths brought in to scope with `<%@ import ... %>`
    pub fn imports(&self) -> Vec<&str> {
        self.directives
            .iter()
            .filter(|directive| directive.name == IMPORT_DIRECTIVE)
            .filter_map(|directive| directive.attribute("path").or(directive.attribute("value")))
            .collect()
    }

    /// Unit name declared with `<%@ name ... %>`, if any
    pub fn declared_name(&self) -> Option<&str> {
        self.directives
            .iter()
            .find(|directive| directive.name == NAME_DIRECTIVE)
            .and_then(|directive| directive.attribute("value"))
    }

    /// Find a section by its qualified name
    pub fn section(&self, name: &QualifiedName) -> Option<&Section> {
        name.segments()
            .iter()
            .try_fold(&self.root, |section, segment| section.child(segment))
    }

    /// Find a section by its qualified name
    pub fn section_mut(&mut self, name: &QualifiedName) -> Option<&mut Section> {
        name.segments()
            .iter()
            .try_fold(&mut self.root, |section, segment| {
                section
                    .sections
                    .iter_mut()
                    .find(|child| child.name.ident() == segment)
            })
    }

    /// Every section, root first, in definition order (pre-order)
    pub fn sections(&self) -> Vec<&Section> {
        let mut sections = vec![];
        let mut pending = vec![&self.root];

        while let Some(section) = pending.pop() {
            sections.push(section);
            pending.extend(section.sections.iter().rev());
        }

        sections
    }
}

/// A compile time declaration, e.g. `<%@ import std::fmt::Display %>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub location: Location,
}

impl Directive {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// A named, parametrized nested template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: QualifiedName,
    pub params: Vec<Param>,
    pub body: Vec<Located<Node>>,
    pub sections: Vec<Section>,
    pub location: Location,
}

impl Section {
    pub fn new(name: QualifiedName, params: Vec<Param>, location: Location) -> Self {
        Self {
            name,
            params,
            body: vec![],
            sections: vec![],
            location,
        }
    }

    /// A directly nested section
    pub fn child(&self, ident: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|section| section.name.ident() == ident)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: ParamType,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamType {
    /// Written in the template
    Declared(String),
    /// Computed from usage sites
    Inferred(String),
    /// Not declared and not inferred yet
    Unresolved,
}

impl ParamType {
    pub fn resolved(&self) -> Option<&str> {
        match self {
            ParamType::Declared(ty) | ParamType::Inferred(ty) => Some(ty),
            ParamType::Unresolved => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Verbatim text
    Literal(String),
    /// Code spliced in to the render procedure
    Statement(String),
    /// Code whose value is rendered
    Expression(String),
    /// Render another section in to the same output
    SectionCall(SectionCall),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionCall {
    pub target: QualifiedName,
    pub args: Vec<String>,
}
