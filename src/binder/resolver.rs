//! Resolution of bound parameter values from enclosing rows.

use tracing::trace;

use crate::catalog::GroupDef;
use crate::error::{NestqlError, Result};
use crate::template::{ParameterSlot, QueryTemplate};
use crate::types::{Row, Value};

use super::scope::AncestorScope;

/// Resolves one bound parameter from the row of its ancestor group.
///
/// # Errors
///
/// - `BindingResolutionError` if `outer_group` is not the group the slot
///   reads from, or the row arity differs from the group's element count
/// - `TypeMismatch` if the value cannot be coerced to the expected type
pub fn resolve_binding(slot: &ParameterSlot, outer_row: &Row, outer_group: &GroupDef) -> Result<Value> {
    if outer_group.name() != slot.group {
        return Err(NestqlError::BindingResolutionError(format!(
            "binding '{}' expects a row of '{}', got a row of '{}'",
            slot.binding.element,
            slot.group,
            outer_group.name()
        )));
    }

    if outer_row.len() != outer_group.arity() {
        return Err(NestqlError::BindingResolutionError(format!(
            "row of '{}' has {} value(s), expected {}",
            outer_group.name(),
            outer_row.len(),
            outer_group.arity()
        )));
    }

    let value = &outer_row[slot.position];
    match slot.expected() {
        Some(expected) => value.coerce_to(expected).map_err(|err| match err {
            NestqlError::TypeMismatch {
                expected, actual, ..
            } => NestqlError::TypeMismatch {
                expected,
                actual,
                detail: format!("binding '{}' value {value}", slot.binding.element),
            },
            other => other,
        }),
        None => Ok(value.clone()),
    }
}

/// Builds the parameter vector of `template` for the position described by
/// `scope`, in binding declaration order.
///
/// # Errors
///
/// Returns `BindingResolutionError` if the scope is shallower than a slot
/// requires, plus any error from [`resolve_binding`].
pub fn resolve_parameters(template: &QueryTemplate, scope: &AncestorScope) -> Result<Vec<Value>> {
    let params = template
        .slots()
        .iter()
        .map(|slot| {
            let frame = scope.frame(slot.levels_up).ok_or_else(|| {
                NestqlError::BindingResolutionError(format!(
                    "binding '{}' needs an enclosing row of '{}' but the scope has {} frame(s)",
                    slot.binding.element,
                    slot.group,
                    scope.depth()
                ))
            })?;
            resolve_binding(slot, frame.row(), frame.group())
        })
        .collect::<Result<Vec<_>>>()?;

    trace!(parameters = params.len(), "resolved template parameters");
    Ok(params)
}
