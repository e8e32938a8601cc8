//! Parameter schema extraction
//!
//! Walks the call sites of a template in document order and turns every
//! recognized declaration into a [`ParameterDescriptor`]. The template text
//! is never modified; every descriptor keeps the exact byte ranges the
//! synthesizer later edits.

use crate::declaration::{DeclarationKind, Slot};
use crate::descriptor::{
    ArrayGroup, BlockSchema, Constraints, DefaultLiteral, LiteralStyle, ParameterDescriptor,
};
use crate::error::ExtractError;
use crate::value::{ParamKind, ParamValue};
use macrogen_template::{scan, Argument, BlockId, CallSite, Literal, TemplateSource};
use std::collections::HashSet;
use tracing::debug;

/// Extract the parameter schema of a template
///
/// Deterministic: the same text always yields the same schema, ordered by
/// source position.
///
/// # Errors
/// - `ExtractError::Parse` if the template is not valid script
/// - `ExtractError::DuplicateParameter` if two declarations share a name
/// - `ExtractError::InvalidDeclaration` for malformed defaults or drivers
pub fn extract(source: &TemplateSource) -> Result<BlockSchema, ExtractError> {
    let block_id = source.block_id();
    let tree = scan(source.text()).map_err(|e| ExtractError::Parse {
        block_id: block_id.clone(),
        source: e,
    })?;

    let mut descriptors = Vec::new();
    let mut groups = Vec::new();
    let mut seen = HashSet::new();

    for call in tree.call_sites() {
        let Some(kind) = DeclarationKind::from_callee(&call.callee) else {
            continue;
        };
        let args = Args::new(kind, &call);

        let Some((name, name_range)) = args
            .get(Slot::Name)
            .and_then(|a| a.literal.as_string().map(|n| (n.to_string(), a.range.clone())))
        else {
            debug!(callee = %call.callee, at = call.range.start, "declaration without literal name skipped");
            continue;
        };

        if !seen.insert(name.clone()) {
            return Err(ExtractError::DuplicateParameter {
                block_id: block_id.clone(),
                name,
            });
        }

        match kind.param_kind() {
            Some(param_kind) => descriptors.push(descriptor(
                block_id, kind, param_kind, name, name_range, &args, &call,
            )?),
            None => groups.push(group(block_id, name, &args, &call)?),
        }
    }

    link_groups(block_id, &mut descriptors, &mut groups)?;

    debug!(
        block = %block_id,
        parameters = descriptors.len(),
        groups = groups.len(),
        "schema extracted"
    );

    Ok(BlockSchema {
        block_id: block_id.clone(),
        source_hash: source.hash(),
        descriptors,
        groups,
    })
}

/// Positional arguments plus an optional trailing object of named ones
struct Args<'a> {
    kind: DeclarationKind,
    positional: &'a [Argument],
    named: Vec<(&'a str, &'a Argument)>,
}

impl<'a> Args<'a> {
    fn new(kind: DeclarationKind, call: &'a CallSite) -> Self {
        match call.arguments.split_last() {
            Some((last, rest)) if !rest.is_empty() => match &last.literal {
                Literal::Object(pairs) => Self {
                    kind,
                    positional: rest,
                    named: pairs.iter().map(|(k, v)| (k.as_str(), v)).collect(),
                },
                _ => Self::positional(kind, &call.arguments),
            },
            _ => Self::positional(kind, &call.arguments),
        }
    }

    fn positional(kind: DeclarationKind, arguments: &'a [Argument]) -> Self {
        Self {
            kind,
            positional: arguments,
            named: Vec::new(),
        }
    }

    /// Named argument if present, positional otherwise
    fn get(&self, slot: Slot) -> Option<&'a Argument> {
        let keys = DeclarationKind::key(slot);
        self.named
            .iter()
            .find(|(k, _)| keys.contains(k))
            .map(|(_, v)| *v)
            .or_else(|| {
                self.kind
                    .position(slot)
                    .and_then(|i| self.positional.get(i))
            })
    }

    fn number(&self, slot: Slot) -> Option<f64> {
        self.get(slot).and_then(|a| a.literal.as_number())
    }

    fn text(&self, slot: Slot) -> Option<String> {
        self.get(slot)
            .and_then(|a| a.literal.as_text())
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != "null" && *t != "undefined")
            .map(str::to_string)
    }
}

#[allow(clippy::too_many_arguments)]
fn descriptor(
    block_id: &BlockId,
    kind: DeclarationKind,
    param_kind: ParamKind,
    name: String,
    name_range: std::ops::Range<usize>,
    args: &Args<'_>,
    call: &CallSite,
) -> Result<ParameterDescriptor, ExtractError> {
    let label_arg = args.get(Slot::Label).filter(|a| a.literal.as_string().is_some());
    let label = label_arg
        .and_then(|a| a.literal.as_string())
        .unwrap_or(name.as_str())
        .to_string();

    let default_arg = args
        .get(Slot::Default)
        .ok_or_else(|| ExtractError::invalid(block_id, &name, "missing default value"))?;
    let (value, style) = default_of(param_kind, &default_arg.literal).ok_or_else(|| {
        ExtractError::invalid(
            block_id,
            &name,
            format!("default `{}` is not a {param_kind} literal", default_arg.text),
        )
    })?;

    let options = match args.get(Slot::Options).map(|a| &a.literal) {
        Some(Literal::Array(items)) => items
            .iter()
            .filter_map(|item| match &item.literal {
                Literal::Number(_) => Some(item.text.clone()),
                other => other.as_text().map(str::to_string),
            })
            .collect(),
        _ => Vec::new(),
    };

    let constraints = Constraints {
        min: args.number(Slot::Min),
        max: args.number(Slot::Max),
        step: args.number(Slot::Step),
        must_be_even: args
            .get(Slot::Even)
            .and_then(|a| a.literal.as_bool())
            .unwrap_or(false),
        options,
    };

    if let (Some(min), Some(max)) = (constraints.min, constraints.max) {
        if min > max {
            return Err(ExtractError::invalid(
                block_id,
                &name,
                format!("minimum {min} exceeds maximum {max}"),
            ));
        }
    }

    let descriptor = ParameterDescriptor {
        kind: param_kind,
        label,
        unit: args.text(Slot::Unit),
        default: DefaultLiteral {
            text: default_arg.text.clone(),
            range: default_arg.range.clone(),
            style,
            value,
        },
        constraints,
        dependency: args.text(Slot::Dependency),
        is_dynamic_array_member: false,
        array_driver: None,
        member_index: None,
        declaration: kind,
        call_range: call.range.clone(),
        statement_range: call.statement.clone(),
        name_range,
        label_range: label_arg.map(|a| a.range.clone()),
        name,
    };

    descriptor
        .validate(descriptor.default_value())
        .map_err(|e| ExtractError::invalid(block_id, &descriptor.name, format!("default rejected: {e}")))?;

    Ok(descriptor)
}

fn default_of(kind: ParamKind, literal: &Literal) -> Option<(ParamValue, LiteralStyle)> {
    match (kind, literal) {
        (ParamKind::Float, Literal::Number(n)) => Some((ParamValue::Float(*n), LiteralStyle::Number)),
        #[allow(clippy::cast_possible_truncation)]
        (ParamKind::Integer, Literal::Number(n)) if n.fract() == 0.0 => {
            Some((ParamValue::Integer(*n as i64), LiteralStyle::Number))
        }
        (ParamKind::Boolean, Literal::Bool(b)) => Some((ParamValue::Boolean(*b), LiteralStyle::Bool)),
        (ParamKind::Enumeration, Literal::Str { value, quote }) => Some((
            ParamValue::Choice(value.clone()),
            LiteralStyle::Quoted(*quote),
        )),
        (ParamKind::Enumeration, Literal::Token(token)) => {
            Some((ParamValue::Choice(token.clone()), LiteralStyle::Bare))
        }
        _ => None,
    }
}

fn group(
    block_id: &BlockId,
    name: String,
    args: &Args<'_>,
    call: &CallSite,
) -> Result<ArrayGroup, ExtractError> {
    let driver = args
        .text(Slot::Driver)
        .ok_or_else(|| ExtractError::invalid(block_id, &name, "dynamic array without driver"))?;
    let label_template = args
        .get(Slot::Label)
        .and_then(|a| a.literal.as_string())
        .map_or_else(|| format!("{name} {{i}}"), str::to_string);

    Ok(ArrayGroup {
        label_template,
        driver,
        declaration_range: call.statement.clone(),
        members: Vec::new(),
        name,
    })
}

/// Check drivers and flag group members
fn link_groups(
    block_id: &BlockId,
    descriptors: &mut [ParameterDescriptor],
    groups: &mut [ArrayGroup],
) -> Result<(), ExtractError> {
    for group in groups.iter_mut() {
        let driver_kind = descriptors
            .iter()
            .find(|d| d.name == group.driver)
            .map(|d| d.kind);
        if driver_kind != Some(ParamKind::Integer) {
            return Err(ExtractError::invalid(
                block_id,
                &group.name,
                format!("driver '{}' is not an integer parameter", group.driver),
            ));
        }

        for descriptor in descriptors.iter_mut() {
            if descriptor.is_dynamic_array_member {
                continue;
            }
            if let Some(index) = group.index_of(&descriptor.name) {
                descriptor.is_dynamic_array_member = true;
                descriptor.array_driver = Some(group.driver.clone());
                descriptor.member_index = Some(index);
                group.members.push(descriptor.name.clone());
            }
        }
    }
    Ok(())
}
