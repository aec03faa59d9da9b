//! # Enable-When Resolution
//!
//! A source question's `enableWhen` names its target by linkId. The rendering engine needs
//! a path from the field holding the condition to the target field instead, expressed
//! only in `parent` hops and indexed `fieldGroup` steps:
//!
//! ```text
//! parent.parent.fieldGroup.2     two levels up, then the third child
//! parent                         the target is the holder's parent
//! ""                             the target is the holder itself
//! ```
//!
//! [`resolve`] computes that path against the partially built tree: ancestors and
//! earlier siblings exist, later siblings do not. A target can be addressed either by its
//! own key (`linkId`) or by its answer container (`linkId.answer`).
//!
//! ## Repeating sections
//!
//! A repeating section renders its row template one model level deeper than the tree it
//! was built in. [`rescope_field_array`] runs once the rows are complete and prepends one
//! `parent.` to every expression inside the rows whose target is not part of the rows.

use std::collections::HashSet;

use thiserror::Error;
use tracing::error;

use crate::field_group::{FieldGroupId, FieldGroupTree};
use crate::properties::{EnableBehavior, EnableWhenExpr};
use crate::questionnaire::SourceEnableWhen;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnableWhenError {
    /// No ancestor, ancestor sibling or the holder itself carries the target key.
    /// This is a defect of the source questionnaire.
    #[error("enableWhen target '{question_id}' not reachable from field group '{field_group}'")]
    TargetNotFound {
        field_group: String,
        question_id: String,
    },
}

/// Keys under which a question can appear in the tree.
pub fn target_keys(link_id: &str) -> [String; 2] {
    [link_id.to_string(), format!("{link_id}.answer")]
}

/// Resolves one condition relative to `holder`.
///
/// The walk starts at `holder` and repeats for each ancestor:
/// 1. the current node carries a target key: the accumulated path is the answer
/// 2. a sibling of the current node carries a target key: append
///    `parent.fieldGroup.<index>` and stop
/// 3. otherwise append `parent` and continue with the parent
///
/// Running out of parents yields [`EnableWhenError::TargetNotFound`].
pub fn resolve(
    tree: &FieldGroupTree,
    condition: &SourceEnableWhen,
    holder: FieldGroupId,
) -> Result<EnableWhenExpr, EnableWhenError> {
    let keys = target_keys(&condition.target_link_id);
    let expr = |path: String| EnableWhenExpr {
        path,
        operator: condition.operator.clone(),
        value: condition.answer_code.clone(),
        source_question_id: condition.target_link_id.clone(),
    };

    let mut path = String::new();
    let mut current = holder;
    loop {
        if tree.get(current).key_matches(&keys) {
            return Ok(expr(path));
        }

        let Some(parent) = tree.parent(current) else {
            return Err(EnableWhenError::TargetNotFound {
                field_group: describe(tree, holder),
                question_id: condition.target_link_id.clone(),
            });
        };

        if !path.is_empty() {
            path.push('.');
        }

        let sibling = tree
            .children(parent)
            .iter()
            .position(|&child| child != current && tree.get(child).key_matches(&keys));
        if let Some(index) = sibling {
            path.push_str(&format!("parent.fieldGroup.{index}"));
            return Ok(expr(path));
        }

        path.push_str("parent");
        current = parent;
    }
}

/// Resolves every condition against the same holder and stores the results, together with
/// the enable behavior, in the holder's properties. Conditions that cannot be resolved are
/// logged and dropped; the rest still apply.
pub fn apply(
    tree: &mut FieldGroupTree,
    holder: FieldGroupId,
    conditions: &[SourceEnableWhen],
    behavior: Option<EnableBehavior>,
) {
    if conditions.is_empty() {
        return;
    }

    let mut resolved = Vec::with_capacity(conditions.len());
    for condition in conditions {
        match resolve(tree, condition, holder) {
            Ok(expr) => resolved.push(expr),
            Err(EnableWhenError::TargetNotFound {
                field_group,
                question_id,
            }) => {
                error!(
                    field_group = %field_group,
                    question = %question_id,
                    "Questionnaire defect: enableWhen target not found, dropping condition"
                );
            }
        }
    }

    if resolved.is_empty() {
        return;
    }
    let props = tree.get_mut(holder).props_mut();
    props.enable_when.extend(resolved);
    props.enable_behavior = behavior;
}

/// Prepends `parent.` to every expression inside the field array of `section` whose
/// target lies outside the array's rows. Expressions in nested field arrays are included.
pub fn rescope_field_array(tree: &mut FieldGroupTree, section: FieldGroupId) {
    let Some(template) = tree.get(section).field_array().map(|a| a.template()) else {
        return;
    };

    let mut nodes = vec![template];
    nodes.extend(tree.descendants(template));

    let local_keys: HashSet<String> = nodes
        .iter()
        .filter_map(|id| tree.get(*id).key.clone())
        .collect();

    for id in nodes {
        let Some(props) = tree.get_mut(id).props.as_mut() else {
            continue;
        };
        for expr in &mut props.enable_when {
            if targets_outside(&expr.source_question_id, &local_keys) {
                expr.path = format!("parent.{}", expr.path);
            }
        }
    }
}

/// True when neither key of `question_id` is one of `local_keys`.
fn targets_outside(question_id: &str, local_keys: &HashSet<String>) -> bool {
    target_keys(question_id)
        .iter()
        .all(|key| !local_keys.contains(key))
}

/// Human readable location of a node for log messages, e.g. `clinical/onset.answer`.
pub fn describe(tree: &FieldGroupTree, id: FieldGroupId) -> String {
    let mut segments = Vec::new();
    let mut current = Some(id);
    while let Some(node) = current {
        if let Some(key) = &tree.get(node).key {
            segments.push(key.clone());
        }
        current = tree.parent(node);
    }
    if segments.is_empty() {
        return "<root>".to_string();
    }
    segments.reverse();
    segments.join("/")
}
