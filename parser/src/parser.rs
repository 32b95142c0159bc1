use std::collections::HashSet;

use errors::{BbError, ErrorS, StructuralError};
use span::Location;
use token::{Token, TokenKind};

use crate::ast::{
    Directive, Node, QualifiedName, Section, SectionCall, Template, NAME_DIRECTIVE,
    PARAMS_DIRECTIVE,
};
use crate::directive::{parse_directive, REPEATABLE_DIRECTIVES};
use crate::syntax::{classify_statement, is_identifier, parse_call, parse_params, StatementKind};

/// Parse tokens in to a template with every section call resolved
pub fn parse(tokens: &[Token]) -> Result<Template, ErrorS> {
    TemplateParser::new().parse(tokens)
}

#[derive(Debug, Default)]
pub struct TemplateParser {}

impl TemplateParser {
    pub fn new() -> Self {
        Self {}
    }

    /// Build the section tree then bind section calls to their targets
    ///
    /// Binding happens after the whole tree exists so a section can be
    /// called before its definition.
    pub fn parse(&self, tokens: &[Token]) -> Result<Template, ErrorS> {
        let mut template = TreeBuilder::default().build(tokens)?;

        let defined: HashSet<String> = template
            .sections()
            .iter()
            .filter(|section| !section.name.is_root())
            .map(|section| section.name.ident().to_string())
            .collect();

        let mut scopes = vec![];

        resolve_calls(&mut template.root, &mut scopes, &defined)?;

        Ok(template)
    }
}

#[derive(Debug, Default)]
struct TreeBuilder {
    root: Section,
    open: Vec<Section>,
    directives: Vec<Directive>,
}

impl TreeBuilder {
    fn build(mut self, tokens: &[Token]) -> Result<Template, ErrorS> {
        for token in tokens {
            let location = token.location();

            match token.kind {
                TokenKind::Comment => {}
                TokenKind::Literal => self.push(Node::Literal(token.text.clone()), location),
                TokenKind::Expression if token.text.is_empty() => {
                    return Err(BbError::from(StructuralError::EmptyExpression).at(location));
                }
                TokenKind::Expression => self.push(Node::Expression(token.text.clone()), location),
                TokenKind::Directive => self.directive(&token.text, location)?,
                TokenKind::Statement => self.statement(&token.text, location)?,
            }
        }

        if let Some(unclosed) = self.open.pop() {
            return Err(
                BbError::from(StructuralError::UnclosedSection(unclosed.name.to_string()))
                    .at(unclosed.location),
            );
        }

        Ok(Template {
            directives: self.directives,
            root: self.root,
        })
    }

    fn current(&mut self) -> &mut Section {
        self.open.last_mut().unwrap_or(&mut self.root)
    }

    fn push(&mut self, node: Node, location: Location) {
        self.current().body.push((node, location));
    }

    fn directive(&mut self, text: &str, location: Location) -> Result<(), ErrorS> {
        let directive = parse_directive(text, location)?;

        let repeatable = REPEATABLE_DIRECTIVES.contains(&directive.name.as_str());

        if !repeatable && self.directives.iter().any(|d| d.name == directive.name) {
            return Err(
                BbError::from(StructuralError::DuplicateDirective(directive.name)).at(location),
            );
        }

        match directive.name.as_str() {
            PARAMS_DIRECTIVE => {
                let params = directive.attribute("params").unwrap_or_default();
                self.root.params = parse_params(params, location)?;
            }
            NAME_DIRECTIVE => {
                let name = directive.attribute("value").unwrap_or_default();

                if !is_identifier(name) {
                    return Err(BbError::from(StructuralError::MalformedDirective {
                        message: format!("'{name}' can not be used as a unit name"),
                    })
                    .at(location));
                }
            }
            _ => {}
        }

        self.directives.push(directive);

        Ok(())
    }

    fn statement(&mut self, text: &str, location: Location) -> Result<(), ErrorS> {
        let kind = classify_statement(text).map_err(|err| BbError::from(err).at(location))?;

        match kind {
            StatementKind::SectionStart { name, params } => {
                let parent = self.current();
                let qualified = parent.name.child(name);

                if parent.child(name).is_some() {
                    return Err(BbError::from(StructuralError::DuplicateSection(
                        qualified.to_string(),
                    ))
                    .at(location));
                }

                let params = match params {
                    Some(params) => parse_params(params, location)?,
                    None => vec![],
                };

                self.open.push(Section::new(qualified, params, location));
            }
            StatementKind::SectionEnd => {
                let Some(section) = self.open.pop() else {
                    return Err(BbError::from(StructuralError::UnexpectedEndSection).at(location));
                };

                self.current().sections.push(section);
            }
            StatementKind::Code => self.push(Node::Statement(text.to_string()), location),
        }

        Ok(())
    }
}

/// A section that can be called from a body: its name, path and arity
type Visible = (String, QualifiedName, usize);

fn resolve_calls(
    section: &mut Section,
    scopes: &mut Vec<Vec<Visible>>,
    defined: &HashSet<String>,
) -> Result<(), ErrorS> {
    scopes.push(
        section
            .sections
            .iter()
            .map(|child| {
                (
                    child.name.ident().to_string(),
                    child.name.clone(),
                    child.params.len(),
                )
            })
            .collect(),
    );

    for (node, location) in section.body.iter_mut() {
        let code = match node {
            Node::Statement(code) | Node::Expression(code) => code,
            _ => continue,
        };

        let Some(call) = parse_call(code) else {
            continue;
        };

        let target = scopes
            .iter()
            .rev()
            .find_map(|scope| scope.iter().find(|(name, _, _)| *name == call.name));

        let Some((_, target, arity)) = target else {
            if call.explicit || defined.contains(&call.name) {
                return Err(
                    BbError::from(StructuralError::UndefinedSection(call.name)).at(*location)
                );
            }

            continue;
        };

        if call.args.len() != *arity {
            return Err(BbError::from(StructuralError::ArityMismatch {
                section: target.to_string(),
                expected: *arity,
                found: call.args.len(),
            })
            .at(*location));
        }

        *node = Node::SectionCall(SectionCall {
            target: target.clone(),
            args: call.args,
        });
    }

    for child in section.sections.iter_mut() {
        resolve_calls(child, scopes, defined)?;
    }

    scopes.pop();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Param, ParamType};
    use lexer::tokenize;
    use pretty_assertions::assert_eq;
    use textwrap::dedent;

    fn parse_source(source: &str) -> Result<Template, ErrorS> {
        parse(&tokenize(source).unwrap())
    }

    fn nodes(section: &Section) -> Vec<Node> {
        section.body.iter().map(|(node, _)| node.clone()).collect()
    }

    fn call(target: &[&str], args: &[&str]) -> Node {
        Node::SectionCall(SectionCall {
            target: QualifiedName::new(target.iter().copied()),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        })
    }

    fn structural(err: StructuralError) -> BbError {
        BbError::StructuralError(err)
    }

    #[test]
    fn simple_section() {
        let template = parse_source(
            "This is a section test <% section mySection %>(this is a section)<% end section %><% mySection() %>",
        )
        .unwrap();

        assert_eq!(
            vec![
                Node::Literal("This is a section test ".to_string()),
                call(&["mySection"], &[]),
            ],
            nodes(&template.root)
        );

        let section = template.section(&QualifiedName::new(["mySection"])).unwrap();

        assert_eq!(
            vec![Node::Literal("(this is a section)".to_string())],
            nodes(section)
        );
        assert_eq!(Location::new(1, 24, 23), section.location);
    }

    #[test]
    fn section_with_params() {
        let template = parse_source(
            r#"<% section mySection(name: &str, age) %>(${name} is ${age} years old)<% end section %><% mySection.render("Carson", 9001); %>"#,
        )
        .unwrap();

        let section = template.section(&QualifiedName::new(["mySection"])).unwrap();

        assert_eq!(
            vec![
                Param {
                    name: "name".to_string(),
                    ty: ParamType::Declared("&str".to_string()),
                    location: Location::START,
                },
                Param {
                    name: "age".to_string(),
                    ty: ParamType::Unresolved,
                    location: Location::START,
                },
            ],
            section.params
        );

        assert_eq!(
            vec![
                Node::Literal("(".to_string()),
                Node::Expression("name".to_string()),
                Node::Literal(" is ".to_string()),
                Node::Expression("age".to_string()),
                Node::Literal(" years old)".to_string()),
            ],
            nodes(section)
        );

        assert_eq!(
            vec![call(&["mySection"], &[r#""Carson""#, "9001"])],
            nodes(&template.root)
        );
    }

    #[test]
    fn forward_references_and_expression_calls() {
        let template =
            parse_source("${ row(1) }<% section row(i) %>[${i}]<% end section %>").unwrap();

        assert_eq!(vec![call(&["row"], &["1"])], nodes(&template.root));
    }

    #[test]
    fn calls_inside_loops() {
        let template = parse_source(&dedent(
            "
            <% section paren(i) %>(${i})<% end section %>
            <% for i in 0..5 { %><% paren(i) %><% } %>
            ",
        ))
        .unwrap();

        assert_eq!(
            vec![
                Node::Literal("\n".to_string()),
                Node::Literal("\n".to_string()),
                Node::Statement("for i in 0..5 {".to_string()),
                call(&["paren"], &["i"]),
                Node::Statement("}".to_string()),
                Node::Literal("\n".to_string()),
            ],
            nodes(&template.root)
        );
    }

    #[test]
    fn nested_sections_see_enclosing_sections() {
        let template = parse_source(
            "<% section a %><% section inner %><% b() %><% end section %><% inner() %><% end section %><% section b %>b<% end section %>",
        )
        .unwrap();

        let a = template.section(&QualifiedName::new(["a"])).unwrap();
        let inner = template.section(&QualifiedName::new(["a", "inner"])).unwrap();

        assert_eq!(vec![call(&["a", "inner"], &[])], nodes(a));
        assert_eq!(vec![call(&["b"], &[])], nodes(inner));
    }

    #[test]
    fn sections_in_siblings_are_not_visible() {
        let result = parse_source(
            "<% section a %><% section inner %>x<% end section %><% end section %><% section b %><% inner() %><% end section %>",
        );

        assert_eq!(
            Err((
                structural(StructuralError::UndefinedSection("inner".to_string())),
                Location::new(1, 85, 84)
            )),
            result
        );
    }

    #[test]
    fn unknown_function_calls_are_code() {
        let template = parse_source("<% helper(1); %>${ format(x) }").unwrap();

        assert_eq!(
            vec![
                Node::Statement("helper(1);".to_string()),
                Node::Expression("format(x)".to_string()),
            ],
            nodes(&template.root)
        );
    }

    #[test]
    fn explicit_render_of_unknown_section() {
        let (err, _) = parse_source("<% missing.render() %>").unwrap_err();

        assert_eq!(
            structural(StructuralError::UndefinedSection("missing".to_string())),
            err
        );
    }

    #[test]
    fn arity_mismatch() {
        let (err, _) =
            parse_source("<% section s(a, b) %><% end section %><% s(1) %>").unwrap_err();

        assert_eq!(
            structural(StructuralError::ArityMismatch {
                section: "s".to_string(),
                expected: 2,
                found: 1
            }),
            err
        );
    }

    #[test]
    fn duplicate_section_in_same_body() {
        let (err, _) =
            parse_source("<% section s %><% end section %><% section s %><% end section %>")
                .unwrap_err();

        assert_eq!(structural(StructuralError::DuplicateSection("s".to_string())), err);
    }

    #[test]
    fn same_name_in_different_bodies() {
        let template = parse_source(
            "<% section a %><% section s %><% end section %><% end section %><% section s %><% end section %>",
        );

        assert!(template.is_ok());
    }

    #[test]
    fn unclosed_section() {
        let result = parse_source("<% section outer %><% section inner %><% end section %>");

        assert_eq!(
            Err((
                structural(StructuralError::UnclosedSection("outer".to_string())),
                Location::START
            )),
            result
        );
    }

    #[test]
    fn stray_end_section() {
        let result = parse_source("abc<% end section %>");

        assert_eq!(
            Err((
                structural(StructuralError::UnexpectedEndSection),
                Location::new(1, 4, 3)
            )),
            result
        );
    }

    #[test]
    fn turbofish_argument_is_one_argument() {
        let template = parse_source(
            "<% section s(map) %><% end section %><% s(HashMap::<i32, i32>::new()) %>",
        )
        .unwrap();

        assert_eq!(
            vec![call(&["s"], &["HashMap::<i32, i32>::new()"])],
            nodes(&template.root)
        );
    }

    #[test]
    fn empty_expressions() {
        for (source, location) in [
            ("a${}", Location::new(1, 2, 1)),
            ("a\n<%=   %>", Location::new(2, 1, 2)),
        ] {
            assert_eq!(
                Err((structural(StructuralError::EmptyExpression), location)),
                parse_source(source)
            );
        }
    }

    #[test]
    fn directives_are_collected_and_comments_dropped() {
        let template = parse_source(&dedent(
            r#"
            <%@ import std::fmt::Write %><%@ import path="std::collections::HashMap" %>
            <%@ params(name: &str, count) %><%@ name page %>
            <%-- ignored --%>${name}
            "#,
        ))
        .unwrap();

        assert_eq!(
            vec!["std::fmt::Write", "std::collections::HashMap"],
            template.imports()
        );
        assert_eq!(Some("page"), template.declared_name());

        let params: Vec<(&str, &ParamType)> = template
            .root
            .params
            .iter()
            .map(|param| (param.name.as_str(), &param.ty))
            .collect();

        assert_eq!(
            vec![
                ("name", &ParamType::Declared("&str".to_string())),
                ("count", &ParamType::Unresolved),
            ],
            params
        );

        assert_eq!(
            vec![
                Node::Literal("\n".to_string()),
                Node::Literal("\n".to_string()),
                Node::Literal("\n".to_string()),
                Node::Expression("name".to_string()),
                Node::Literal("\n".to_string()),
            ],
            nodes(&template.root)
        );
    }

    #[test]
    fn duplicate_directive() {
        let (err, _) = parse_source("<%@ name a %><%@ name b %>").unwrap_err();

        assert_eq!(structural(StructuralError::DuplicateDirective("name".to_string())), err);
    }

    #[test]
    fn name_directive_must_be_an_identifier() {
        assert!(parse_source("<%@ name my page %>").is_err());
    }
}
