use std::collections::{BTreeSet, HashMap};

use errors::{BbError, ErrorS, TypeError};
use parser::{canonical_type, Node, ParamType, QualifiedName, Section, SectionCall, Template};
use span::Location;

use locals::Event;
use origin::{borrowed, classify, Origin};

mod locals;
mod origin;

/// Type of an unsuffixed integer literal nothing else constrains
const DEFAULT_INTEGER: &str = "i32";

const INTEGER_TYPES: [&str; 12] = [
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize",
];

/// Resolve the type of every section parameter
///
/// Untyped parameters take the single type observed across all of their call
/// sites. Locals passed as section arguments must resolve to a single type
/// too, as must locals declared with `let x;` and typed by later assignments.
pub fn infer(mut template: Template) -> Result<Template, ErrorS> {
    let mut inference = Inference::new(&template);

    for section in template.sections() {
        inference.collect(section);
    }

    let resolved = inference.resolve()?;

    for (name, types) in resolved {
        let Some(section) = template.section_mut(&name) else {
            continue;
        };

        for (param, ty) in section.params.iter_mut().zip(types) {
            if param.ty.resolved().is_none() {
                param.ty = ParamType::Inferred(ty);
            }
        }
    }

    Ok(template)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotKind {
    Param,
    Local,
}

/// A parameter or local whose type is being inferred
#[derive(Debug)]
struct Slot {
    name: String,
    kind: SlotKind,
    location: Location,
    declared: Option<String>,
    origins: Vec<Origin>,
    /// Seen an unsuffixed integer literal, any integer type fits it
    integer_literal: bool,
    /// Passed as an argument to an untyped parameter
    feeds_call: bool,
    /// Declared without a type or initializer
    deferred: bool,
}

impl Slot {
    fn new(name: String, kind: SlotKind, location: Location, declared: Option<String>) -> Self {
        Self {
            name,
            kind,
            location,
            declared,
            origins: vec![],
            integer_literal: false,
            feeds_call: false,
            deferred: false,
        }
    }

    /// Record a value assigned or passed to the slot
    fn observe(&mut self, origin: Origin, value: &str) {
        if is_unsuffixed_integer(value) {
            self.integer_literal = true;
        } else {
            self.origins.push(origin);
        }
    }
}

type Scopes = Vec<Vec<(String, usize)>>;

#[derive(Debug, Default)]
struct Inference {
    slots: Vec<Slot>,
    params: HashMap<QualifiedName, Vec<usize>>,
}

impl Inference {
    fn new(template: &Template) -> Self {
        let mut inference = Self::default();

        for section in template.sections() {
            let ids = section
                .params
                .iter()
                .map(|param| {
                    inference.add(Slot::new(
                        param.name.clone(),
                        SlotKind::Param,
                        section.location,
                        param.ty.resolved().map(String::from),
                    ))
                })
                .collect();

            inference.params.insert(section.name.clone(), ids);
        }

        inference
    }

    fn add(&mut self, slot: Slot) -> usize {
        self.slots.push(slot);
        self.slots.len() - 1
    }

    /// Walk a section body in order, tracking locals and call sites
    fn collect(&mut self, section: &Section) {
        let params = self.params.get(&section.name).cloned().unwrap_or_default();

        let mut scopes: Scopes = vec![section
            .params
            .iter()
            .map(|param| param.name.clone())
            .zip(params)
            .collect()];

        for (node, location) in &section.body {
            match node {
                Node::Statement(code) => {
                    for event in locals::scan(code) {
                        self.apply(event, &mut scopes, *location);
                    }
                }
                Node::SectionCall(call) => self.call(call, &scopes),
                Node::Literal(_) | Node::Expression(_) => {}
            }
        }
    }

    fn apply(&mut self, event: Event, scopes: &mut Scopes, location: Location) {
        match event {
            Event::Let { name, ty, init } => {
                let declared = ty.as_deref().and_then(canonical_type);

                let mut slot = Slot::new(name, SlotKind::Local, location, declared);
                slot.deferred = ty.is_none() && init.is_none();

                if let Some(init) = init {
                    slot.observe(classify(&init, &|name: &str| lookup(scopes, name)), &init);
                }

                self.declare(slot, scopes);
            }
            Event::For { name, bounds } => {
                let mut slot = Slot::new(name, SlotKind::Local, location, None);

                for bound in bounds.into_iter().flat_map(|(start, end)| [start, end]) {
                    slot.observe(classify(&bound, &|name: &str| lookup(scopes, name)), &bound);
                }

                self.declare(slot, scopes);
            }
            Event::Assign { name, value } => {
                let origin = classify(&value, &|name: &str| lookup(scopes, name));

                if let Some(id) = lookup(scopes, &name) {
                    let slot = &mut self.slots[id];

                    if slot.kind == SlotKind::Local && slot.declared.is_none() {
                        slot.observe(origin, &value);
                    }
                }
            }
            Event::OpenScope => scopes.push(vec![]),
            Event::CloseScope => {
                if scopes.len() > 1 {
                    scopes.pop();
                }
            }
        }
    }

    fn declare(&mut self, slot: Slot, scopes: &mut Scopes) {
        let name = slot.name.clone();
        let id = self.add(slot);

        if let Some(scope) = scopes.last_mut() {
            scope.push((name, id));
        }
    }

    fn call(&mut self, call: &SectionCall, scopes: &Scopes) {
        let targets = self.params.get(&call.target).cloned().unwrap_or_default();

        for (arg, target) in call.args.iter().zip(targets) {
            let origin = classify(arg, &|name: &str| lookup(scopes, name));

            if self.slots[target].declared.is_some() {
                continue;
            }

            if let Origin::Slot(id) | Origin::Ref { slot: id, .. } = origin {
                if self.slots[id].kind == SlotKind::Local {
                    self.slots[id].feeds_call = true;
                }
            }

            self.slots[target].observe(origin, arg);
        }
    }

    /// Solve every slot's set of types
    ///
    /// Integer literals only count once everything else has flowed: they
    /// fit any integer type and default to `i32` next to anything else.
    fn solve(&self) -> Vec<BTreeSet<String>> {
        let mut types: Vec<BTreeSet<String>> = self
            .slots
            .iter()
            .map(|slot| slot.declared.iter().cloned().collect())
            .collect();

        self.propagate(&mut types);

        for (id, slot) in self.slots.iter().enumerate() {
            if !slot.integer_literal || slot.declared.is_some() {
                continue;
            }

            let fits = !types[id].is_empty()
                && types[id]
                    .iter()
                    .all(|ty| INTEGER_TYPES.contains(&ty.as_str()));

            if !fits {
                types[id].insert(DEFAULT_INTEGER.to_string());
            }
        }

        self.propagate(&mut types);

        types
    }

    /// Flow types between slots until nothing changes
    fn propagate(&self, types: &mut [BTreeSet<String>]) {
        loop {
            let mut changed = false;

            for (id, slot) in self.slots.iter().enumerate() {
                if slot.declared.is_some() {
                    continue;
                }

                for origin in &slot.origins {
                    let found: Vec<String> = match origin {
                        Origin::Known(ty) => vec![ty.clone()],
                        Origin::Slot(other) => types[*other].iter().cloned().collect(),
                        Origin::Ref { slot, mutable } => types[*slot]
                            .iter()
                            .map(|ty| borrowed(ty, *mutable))
                            .collect(),
                        Origin::Unknown => vec![],
                    };

                    for ty in found {
                        changed |= types[id].insert(ty);
                    }
                }
            }

            if !changed {
                return;
            }
        }
    }

    /// The single type of every parameter, keyed by section
    fn resolve(&self) -> Result<HashMap<QualifiedName, Vec<String>>, ErrorS> {
        let types = self.solve();

        let checked = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| {
                slot.kind == SlotKind::Local && (slot.feeds_call || slot.deferred)
            })
            .chain(
                self.slots
                    .iter()
                    .enumerate()
                    .filter(|(_, slot)| slot.kind == SlotKind::Param),
            );

        for (id, slot) in checked {
            let error = match types[id].len() {
                1 => continue,
                // assigned only values that can't be typed here, rustc decides
                0 if slot.kind == SlotKind::Local
                    && !slot.feeds_call
                    && !slot.origins.is_empty() =>
                {
                    continue
                }
                0 => TypeError::UnresolvedType {
                    name: slot.name.clone(),
                },
                _ => TypeError::AmbiguousType {
                    name: slot.name.clone(),
                    types: types[id].iter().cloned().collect(),
                },
            };

            return Err(BbError::from(error).at(slot.location));
        }

        Ok(self
            .params
            .iter()
            .map(|(name, ids)| {
                let resolved = ids
                    .iter()
                    .filter_map(|id| types[*id].iter().next().cloned())
                    .collect();

                (name.clone(), resolved)
            })
            .collect())
    }
}

/// The innermost local or parameter with this name
fn lookup(scopes: &Scopes, name: &str) -> Option<usize> {
    scopes.iter().rev().find_map(|scope| {
        scope
            .iter()
            .rev()
            .find(|(local, _)| local == name)
            .map(|(_, id)| *id)
    })
}

fn is_unsuffixed_integer(text: &str) -> bool {
    let digits = text.trim();
    let digits = digits.strip_prefix('-').unwrap_or(digits).trim_start();

    digits.starts_with(|c: char| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '_')
}
