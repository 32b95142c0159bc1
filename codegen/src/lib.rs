use errors::{BbError, ErrorS, StructuralError, TypeError};
use parser::{Node, Param, QualifiedName, Section, Template};
use quote::quote;

/// Lints generated code can trip without it being a mistake in the template
const ALLOWED_LINTS: &str = "#[allow(non_snake_case, non_camel_case_types, dead_code, unused_imports, unused_mut, unused_variables, unused_parens, clippy::all)]";

/// Name of the sink every render procedure writes to
const SINK: &str = "__bb_out";

const INDENT: &str = "    ";

/// Generate a Rust module for the template
///
/// The module is named after the `name` directive when the template has one,
/// `unit_name` otherwise. Every section becomes a nested module with the same
/// shape as the top level unit. Every parameter type must be resolved.
pub fn generate(template: &Template, unit_name: &str) -> Result<String, ErrorS> {
    let imports = template
        .directives
        .iter()
        .filter(|directive| directive.name == parser::IMPORT_DIRECTIVE)
        .map(|directive| {
            let path = directive
                .attribute("path")
                .or(directive.attribute("value"))
                .unwrap_or_default()
                .trim()
                .trim_end_matches(';');

            match syn::parse_str::<syn::UseTree>(path) {
                Ok(_) => Ok(path.to_string()),
                Err(_) => Err(BbError::from(StructuralError::MalformedDirective {
                    message: format!("`{path}` is not a valid import path"),
                })
                .at(directive.location)),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut generator = Generator {
        out: String::new(),
        imports,
    };

    let name = template.declared_name().unwrap_or(unit_name);

    generator.unit(&template.root, name, 0)?;

    Ok(generator.out)
}

struct Generator {
    out: String,
    imports: Vec<String>,
}

impl Generator {
    fn line(&mut self, depth: usize, text: &str) {
        if !text.is_empty() {
            self.out.push_str(&INDENT.repeat(depth));
            self.out.push_str(text);
        }

        self.out.push('\n');
    }

    fn unit(&mut self, section: &Section, name: &str, depth: usize) -> Result<(), ErrorS> {
        let params = typed_params(section)?;
        let args = section
            .params
            .iter()
            .map(|param| format!(", {}", param.name))
            .collect::<String>();

        self.line(depth, ALLOWED_LINTS);
        self.line(depth, &format!("pub mod {name} {{"));

        let depth = depth + 1;

        self.line(depth, "use ::std::fmt::Write as _;");

        if !section.name.is_root() {
            self.line(depth, "use super::*;");
        }

        for import in self.imports.clone() {
            self.line(depth, &format!("use {import};"));
        }

        self.line(depth, "");
        self.line(depth, "pub struct Template;");
        self.line(depth, "");
        self.line(depth, "impl ::bb_runtime::BaseTemplate for Template {}");
        self.line(depth, "");
        self.line(depth, "pub static INSTANCE: Template = Template;");
        self.line(depth, "");

        self.line(
            depth,
            &format!(
                "pub fn render({}) -> ::std::string::String {{",
                params.trim_start_matches(", ")
            ),
        );
        self.line(
            depth + 1,
            &format!("::bb_runtime::render_to_string(|{SINK}| INSTANCE.render_impl({SINK}{args}))"),
        );
        self.line(depth, "}");
        self.line(depth, "");

        self.line(
            depth,
            &format!(
                "pub fn render_into({SINK}: &mut dyn ::std::fmt::Write{params}) -> ::std::result::Result<(), ::bb_runtime::RenderError> {{"
            ),
        );
        self.line(
            depth + 1,
            &format!("INSTANCE.render_impl({SINK}{args}).map_err(::bb_runtime::RenderError::from)"),
        );
        self.line(depth, "}");
        self.line(depth, "");

        self.line(depth, "impl Template {");
        self.line(
            depth + 1,
            &format!(
                "pub fn render_impl(&self, {SINK}: &mut dyn ::std::fmt::Write{params}) -> ::std::fmt::Result {{"
            ),
        );

        for (node, _) in &section.body {
            self.node(node, &section.name, depth + 2);
        }

        self.line(depth + 2, "::std::result::Result::Ok(())");
        self.line(depth + 1, "}");
        self.line(depth, "}");

        for child in &section.sections {
            self.line(depth, "");
            self.unit(child, child.name.ident(), depth)?;
        }

        self.line(depth - 1, "}");

        Ok(())
    }

    fn node(&mut self, node: &Node, current: &QualifiedName, depth: usize) {
        match node {
            Node::Literal(text) if text.is_empty() => {}
            Node::Literal(text) => {
                let literal = quote!(#text).to_string();
                self.line(depth, &format!("{SINK}.write_str({literal})?;"));
            }
            Node::Expression(code) => self.line(
                depth,
                &format!("{SINK}.write_str(&::bb_runtime::BaseTemplate::to_s(self, &({code})))?;"),
            ),
            Node::Statement(code) => self.line(depth, code),
            Node::SectionCall(call) => {
                let args = call
                    .args
                    .iter()
                    .map(|arg| format!(", {arg}"))
                    .collect::<String>();

                self.line(
                    depth,
                    &format!(
                        "{}::INSTANCE.render_impl({SINK}{args})?;",
                        relative_path(current, &call.target)
                    ),
                );
            }
        }
    }
}

/// `, name: Type` for every parameter of the section
fn typed_params(section: &Section) -> Result<String, ErrorS> {
    section
        .params
        .iter()
        .map(|param: &Param| match param.ty.resolved() {
            Some(ty) => Ok(format!(", {}: {ty}", param.name)),
            None => Err(BbError::from(TypeError::UnresolvedType {
                name: param.name.clone(),
            })
            .at(section.location)),
        })
        .collect()
}

/// Module path from the unit of `from` to the unit of `to`
fn relative_path(from: &QualifiedName, to: &QualifiedName) -> String {
    let from = from.segments();
    let to = to.segments();

    let common = from
        .iter()
        .zip(to)
        .take_while(|(a, b)| a == b)
        .count();

    let mut path: Vec<&str> = if common == from.len() {
        vec!["self"]
    } else {
        vec!["super"; from.len() - common]
    };

    path.extend(to[common..].iter().map(String::as_str));

    path.join("::")
}
