//! Organization sub-tree: name, address, contact person and telecom.

use crate::field_group::{FieldGroupId, FieldGroupTree};
use crate::processors::{ItemContext, with_rows};
use crate::processors::reference::{Leaf, panel};
use crate::questionnaire::SourceQuestion;

/// Where an organization is placed and which clipboard entries address it.
#[derive(Debug, Clone)]
pub struct OrganizationSlot {
    pub key: String,
    pub label: Option<String>,
    /// Clipboard linkId the leaf field names are matched under.
    pub link_id: String,
    pub required: bool,
    /// One organization per row of a repeat section.
    pub repeats: bool,
}

const ADDRESS: [(&str, &str, &str); 5] = [
    ("street", "Street", "address.street"),
    ("houseNumber", "House number", "address.houseNumber"),
    ("postalCode", "Postal code", "address.postalCode"),
    ("city", "City", "address.city"),
    ("country", "Country", "address.country"),
];

const CONTACT: [(&str, &str, &str); 3] = [
    ("prefix", "Salutation", "contact.prefix"),
    ("given", "Given name", "contact.given"),
    ("family", "Family name", "contact.family"),
];

const TELECOM: [(&str, &str, &str); 2] = [
    ("phone", "Phone", "telecom.phone"),
    ("email", "Email", "telecom.email"),
];

/// Builds the organization panel below `parent` and returns it. The question's enable-when
/// lands on the panel unless the context suppresses it; a repeating slot turns the panel into
/// a repeat section.
pub fn build(
    tree: &mut FieldGroupTree,
    question: &SourceQuestion,
    parent: FieldGroupId,
    slot: &OrganizationSlot,
    ctx: &ItemContext<'_>,
) -> FieldGroupId {
    let organization = panel(tree, parent, &slot.key, slot.label.as_deref());
    ctx.apply_enable_when(tree, organization, question);

    with_rows(tree, organization, slot.repeats, |tree, row| {
        Leaf::input("name", "Name")
            .required(slot.required)
            .add_to(tree, row, &slot.link_id, ctx);

        for (key, label, fields) in [
            ("address", "Address", &ADDRESS[..]),
            ("contact", "Contact person", &CONTACT[..]),
            ("telecom", "Contact details", &TELECOM[..]),
        ] {
            let section = panel(tree, row, key, Some(label));
            for (leaf_key, leaf_label, clipboard_field) in fields {
                let required =
                    slot.required && matches!(*leaf_key, "street" | "postalCode" | "city");
                Leaf::input(leaf_key, leaf_label)
                    .required(required)
                    .clipboard_field(clipboard_field)
                    .add_to(tree, section, &slot.link_id, ctx);
            }
        }
    });

    organization
}
