//! # Field Group Tree
//!
//! The compiled form schema is a tree of [`FieldGroup`] nodes. Nodes live in an arena
//! ([`FieldGroupTree`]) and refer to each other through [`FieldGroupId`] handles, so the
//! parent relation is a plain lookup index rather than a pointer.
//!
//! ## Construction
//!
//! Creating a node and wiring it into the tree are two separate steps:
//!
//! ```rust
//! use atrius_form_schema::{FieldGroup, FieldGroupTree, FieldKind};
//!
//! let mut tree = FieldGroupTree::new();
//! let root = tree.root();
//! let first = tree.create(FieldGroup::keyed("first").with_kind(FieldKind::Input));
//! tree.attach(first, root);
//! let second = tree.add_child(root, FieldGroup::keyed("second"));
//!
//! assert_eq!(tree.children(root), &[first, second]);
//! assert_eq!(tree.index_in_parent(second), Some(1));
//! ```
//!
//! The order in which nodes are attached is their sibling order, and that index is what
//! enable-when paths address (`parent.fieldGroup.<index>`).
//!
//! ## Serialization
//!
//! [`FieldGroupTree::to_json`] renders the tree from its root. Children are emitted under
//! `fieldGroup`, a field array under `fieldArray`, absent or empty fields are left out and
//! the parent relation is never written.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::properties::{Properties, Validator};

/// Handle of a node inside a [`FieldGroupTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldGroupId(usize);

/// Rendering kind of a field group.
///
/// Grouping nodes have no kind at all (`FieldGroup::kind == None`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Input,
    Textarea,
    SingleChoice,
    MultiChoice,
    RadioChoice,
    Checkbox,
    RepeatSection,
    /// A choice control requested through an item-control hint the compiler has no
    /// dedicated kind for; rendered verbatim.
    Custom(String),
}

impl FieldKind {
    /// Kind for a `<hint>-coding` control type.
    pub fn from_control_type(control_type: &str) -> Self {
        match control_type {
            "drop-down-coding" | "autocomplete-coding" => FieldKind::SingleChoice,
            "autocomplete-multi-coding" => FieldKind::MultiChoice,
            "radio-button-coding" => FieldKind::RadioChoice,
            other => FieldKind::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::Input => "input",
            FieldKind::Textarea => "textarea",
            FieldKind::SingleChoice => "autocomplete-coding",
            FieldKind::MultiChoice => "autocomplete-multi-coding",
            FieldKind::RadioChoice => "radio-button-coding",
            FieldKind::Checkbox => "checkbox",
            FieldKind::RepeatSection => "repeat",
            FieldKind::Custom(kind) => kind,
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, FieldKind::SingleChoice | FieldKind::MultiChoice)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrapper {
    FormField,
    Panel,
}

impl Wrapper {
    fn as_str(self) -> &'static str {
        match self {
            Wrapper::FormField => "form-field",
            Wrapper::Panel => "panel",
        }
    }
}

/// Row template of a repeating section.
///
/// The template is itself a node of the same arena; its children are the fields of one
/// repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldArray {
    template: FieldGroupId,
}

impl FieldArray {
    pub fn new(template: FieldGroupId) -> Self {
        Self { template }
    }

    pub fn template(&self) -> FieldGroupId {
        self.template
    }
}

/// One node of the compiled form schema.
#[derive(Debug, Clone, Default)]
pub struct FieldGroup {
    pub key: Option<String>,
    pub kind: Option<FieldKind>,
    pub class_name: Option<String>,
    pub field_group_class_name: Option<String>,
    pub props: Option<Properties>,
    pub validators: Vec<Validator>,
    wrappers: Vec<Wrapper>,
    field_array: Option<FieldArray>,
    children: Vec<FieldGroupId>,
    parent: Option<FieldGroupId>,
}

impl FieldGroup {
    /// A keyless grouping node.
    pub fn group() -> Self {
        Self::default()
    }

    pub fn keyed(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_props(mut self, props: Properties) -> Self {
        self.props = Some(props);
        self
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_field_group_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.field_group_class_name = Some(class_name.into());
        self
    }

    pub fn with_wrapper(mut self, wrapper: Wrapper) -> Self {
        self.add_wrapper(wrapper);
        self
    }

    /// Wrappers form an ordered set.
    pub fn add_wrapper(&mut self, wrapper: Wrapper) {
        if !self.wrappers.contains(&wrapper) {
            self.wrappers.push(wrapper);
        }
    }

    pub fn wrappers(&self) -> &[Wrapper] {
        &self.wrappers
    }

    pub fn field_array(&self) -> Option<&FieldArray> {
        self.field_array.as_ref()
    }

    pub fn props_mut(&mut self) -> &mut Properties {
        self.props.get_or_insert_with(Properties::default)
    }

    pub fn key_matches(&self, keys: &[String]) -> bool {
        self.key.as_ref().is_some_and(|key| keys.contains(key))
    }
}

/// Arena owning every node of one compiled form.
#[derive(Debug, Clone)]
pub struct FieldGroupTree {
    nodes: Vec<FieldGroup>,
    root: FieldGroupId,
}

impl Default for FieldGroupTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldGroupTree {
    /// Creates a tree holding a single keyless root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![FieldGroup::group()],
            root: FieldGroupId(0),
        }
    }

    pub fn root(&self) -> FieldGroupId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a detached node to the arena.
    pub fn create(&mut self, node: FieldGroup) -> FieldGroupId {
        let id = FieldGroupId(self.nodes.len());
        self.nodes.push(FieldGroup {
            parent: None,
            children: Vec::new(),
            field_array: None,
            ..node
        });
        id
    }

    /// Sets the back-reference of `child` and appends it to `parent`'s children.
    ///
    /// A node that is already attached somewhere is moved.
    pub fn attach(&mut self, child: FieldGroupId, parent: FieldGroupId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// `create` followed by `attach`.
    pub fn add_child(&mut self, parent: FieldGroupId, node: FieldGroup) -> FieldGroupId {
        let id = self.create(node);
        self.attach(id, parent);
        id
    }

    /// Removes `id` from its parent's children. The node stays in the arena but is no
    /// longer reachable from the root.
    pub fn detach(&mut self, id: FieldGroupId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    pub fn get(&self, id: FieldGroupId) -> &FieldGroup {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: FieldGroupId) -> &mut FieldGroup {
        &mut self.nodes[id.0]
    }

    pub fn parent(&self, id: FieldGroupId) -> Option<FieldGroupId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: FieldGroupId) -> &[FieldGroupId] {
        &self.nodes[id.0].children
    }

    pub fn index_in_parent(&self, id: FieldGroupId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Installs the row template of a repeating section.
    ///
    /// A template with at least one row replaces the node's own children; an empty template
    /// leaves them alone. The template keeps its back-reference to `id` so lookups from
    /// inside the rows can still walk upwards.
    pub fn set_field_array(&mut self, id: FieldGroupId, field_array: FieldArray) {
        let template = field_array.template();
        if !self.children(template).is_empty() {
            let cleared = std::mem::take(&mut self.nodes[id.0].children);
            for child in cleared {
                if child != template {
                    self.nodes[child.0].parent = None;
                }
            }
        }
        self.nodes[template.0].parent = Some(id);
        self.nodes[id.0].field_array = Some(field_array);
    }

    /// Nodes below `id` (not including `id`), descending into field array templates.
    pub fn descendants(&self, id: FieldGroupId) -> Vec<FieldGroupId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.get(current);
            for child in node.children.iter().rev() {
                stack.push(*child);
                out.push(*child);
            }
            if let Some(array) = node.field_array {
                stack.push(array.template);
                out.push(array.template);
            }
        }
        out
    }

    /// A serializable view rooted at `id`.
    pub fn view(&self, id: FieldGroupId) -> FieldGroupView<'_> {
        FieldGroupView { tree: self, id }
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self.view(self.root))
    }
}

/// Borrowed node handle implementing [`Serialize`].
pub struct FieldGroupView<'a> {
    tree: &'a FieldGroupTree,
    id: FieldGroupId,
}

impl Serialize for FieldGroupView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = self.tree.get(self.id);
        let mut map = serializer.serialize_map(None)?;

        if let Some(key) = &node.key {
            map.serialize_entry("key", key)?;
        }
        if let Some(kind) = &node.kind {
            map.serialize_entry("type", kind.as_str())?;
        }
        if let Some(class_name) = &node.class_name {
            map.serialize_entry("className", class_name)?;
        }
        if let Some(class_name) = &node.field_group_class_name {
            map.serialize_entry("fieldGroupClassName", class_name)?;
        }
        if !node.wrappers.is_empty() {
            let wrappers: Vec<&str> = node.wrappers.iter().map(|w| w.as_str()).collect();
            map.serialize_entry("wrappers", &wrappers)?;
        }
        if let Some(props) = &node.props {
            map.serialize_entry("props", props)?;
        }
        if !node.validators.is_empty() {
            map.serialize_entry(
                "validators",
                &serde_json::json!({ "validation": node.validators }),
            )?;
        }
        if let Some(array) = node.field_array {
            map.serialize_entry("fieldArray", &self.tree.view(array.template))?;
        }
        if !node.children.is_empty() {
            let children: Vec<FieldGroupView<'_>> =
                node.children.iter().map(|c| self.tree.view(*c)).collect();
            map.serialize_entry("fieldGroup", &children)?;
        }
        map.end()
    }
}
