use crate::visibility::Visibility;
use vaultfill_core::dom::Element;
use vaultfill_core::{Document, NodeId};

/// Input types that can never hold a username
pub const NON_USERNAME_TYPES: &[&str] = &["password", "hidden", "submit", "button", "checkbox", "radio"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attribute {
    Type,
    Name,
    Id,
    Autocomplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Match {
    Exact(&'static str),
    Contains(&'static str),
}

/// One attribute selector, e.g. `input[name*="email"]`
#[derive(Debug, Clone, Copy)]
struct UsernameSelector {
    attribute: Attribute,
    pattern: Match,
}

impl UsernameSelector {
    const fn exact(attribute: Attribute, value: &'static str) -> Self {
        Self {
            attribute,
            pattern: Match::Exact(value),
        }
    }

    const fn contains(attribute: Attribute, value: &'static str) -> Self {
        Self {
            attribute,
            pattern: Match::Contains(value),
        }
    }

    fn matches(&self, element: &Element) -> bool {
        let value = match self.attribute {
            // The type attribute is compared case-insensitively, like HTML does
            Attribute::Type => match element.attr("type") {
                Some(t) => return self.matches_value(&t.trim().to_lowercase()),
                None => return false,
            },
            Attribute::Name => element.attr("name"),
            Attribute::Id => element.attr("id"),
            Attribute::Autocomplete => element.attr("autocomplete"),
        };
        value.is_some_and(|v| self.matches_value(v))
    }

    fn matches_value(&self, value: &str) -> bool {
        match self.pattern {
            Match::Exact(expected) => value == expected,
            Match::Contains(needle) => value.contains(needle),
        }
    }
}

/// Username selectors, most specific first. Typed and exact signals outrank
/// substring guesses.
const USERNAME_SELECTORS: &[UsernameSelector] = &[
    UsernameSelector::exact(Attribute::Type, "email"),
    UsernameSelector::exact(Attribute::Name, "email"),
    UsernameSelector::exact(Attribute::Id, "email"),
    UsernameSelector::exact(Attribute::Autocomplete, "username"),
    UsernameSelector::exact(Attribute::Autocomplete, "email"),
    UsernameSelector::contains(Attribute::Name, "email"),
    UsernameSelector::contains(Attribute::Id, "email"),
    UsernameSelector::exact(Attribute::Name, "username"),
    UsernameSelector::exact(Attribute::Id, "username"),
    UsernameSelector::contains(Attribute::Name, "username"),
    UsernameSelector::contains(Attribute::Id, "username"),
    UsernameSelector::contains(Attribute::Name, "user"),
    UsernameSelector::contains(Attribute::Id, "user"),
    UsernameSelector::contains(Attribute::Name, "login"),
    UsernameSelector::contains(Attribute::Id, "login"),
    UsernameSelector::contains(Attribute::Name, "account"),
    UsernameSelector::contains(Attribute::Id, "account"),
];

/// Picks the username-like input inside a container
pub struct FieldClassifier;

impl FieldClassifier {
    /// Best username candidate under `container`, or `None` for a
    /// password-only form
    pub fn find_username_field(doc: &Document, container: NodeId) -> Option<NodeId> {
        let inputs: Vec<(NodeId, &Element)> = doc.inputs(container).collect();
        if inputs.is_empty() {
            return None;
        }

        if let Some(found) = Self::by_selector(doc, &inputs) {
            return Some(found);
        }
        if let Some(found) = Self::before_password(doc, &inputs) {
            tracing::debug!("Username field {} found by position", found);
            return Some(found);
        }
        let found = Self::any_text_like(doc, &inputs);
        if found.is_none() {
            tracing::debug!("No username field in {}", doc.describe(container));
        }
        found
    }

    /// Tier 1: ordered attribute selectors
    fn by_selector(doc: &Document, inputs: &[(NodeId, &Element)]) -> Option<NodeId> {
        USERNAME_SELECTORS.iter().find_map(|selector| {
            inputs
                .iter()
                .filter(|(_, e)| selector.matches(e))
                .map(|(id, _)| *id)
                .find(|&id| Visibility::is_visible(doc, id))
        })
    }

    /// Tier 2: first text-like input preceding the first password input
    fn before_password(doc: &Document, inputs: &[(NodeId, &Element)]) -> Option<NodeId> {
        let password_index = inputs.iter().position(|(_, e)| e.is_password_input())?;

        inputs[..password_index]
            .iter()
            .filter(|(_, e)| Self::is_text_like(e))
            .map(|(id, _)| *id)
            .find(|&id| Visibility::is_visible(doc, id))
    }

    /// Tier 3: any visible text-like input
    fn any_text_like(doc: &Document, inputs: &[(NodeId, &Element)]) -> Option<NodeId> {
        inputs
            .iter()
            .filter(|(_, e)| Self::is_text_like(e))
            .map(|(id, _)| *id)
            .find(|&id| Visibility::is_visible(doc, id))
    }

    pub fn is_text_like(element: &Element) -> bool {
        !NON_USERNAME_TYPES.contains(&element.input_type().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{block, field, find, page};

    fn form(children: impl IntoIterator<Item = vaultfill_core::dom::NodeSnapshot>) -> Document {
        page([block("form").children(children)])
    }

    fn container(doc: &Document) -> NodeId {
        find(doc, |e| e.is("form"))
    }

    #[test]
    fn test_email_type_wins_over_username_name() {
        let doc = form([
            field("text", 1.0).name("username"),
            field("email", 2.0).name("contact"),
            field("password", 3.0),
        ]);
        let expected = find(&doc, |e| e.input_type() == "email");
        assert_eq!(
            FieldClassifier::find_username_field(&doc, container(&doc)),
            Some(expected)
        );
    }

    #[test]
    fn test_selector_priority_order() {
        let doc = form([
            field("text", 1.0).name("account_id"),
            field("text", 2.0).id("login-user"),
            field("text", 3.0).attr("autocomplete", "username"),
            field("password", 4.0),
        ]);
        let expected = find(&doc, |e| e.attr("autocomplete") == Some("username"));
        assert_eq!(
            FieldClassifier::find_username_field(&doc, container(&doc)),
            Some(expected)
        );
    }

    #[test]
    fn test_hidden_match_falls_through_to_next_selector() {
        let doc = form([
            field("email", 1.0).display("none"),
            field("text", 2.0).name("user_name"),
            field("password", 3.0),
        ]);
        let expected = find(&doc, |e| e.attr("name") == Some("user_name"));
        assert_eq!(
            FieldClassifier::find_username_field(&doc, container(&doc)),
            Some(expected)
        );
    }

    #[test]
    fn test_attribute_values_are_case_sensitive_except_type() {
        let doc = form([
            field("text", 1.0).name("EMAIL"),
            field("EMAIL", 2.0).name("contact"),
            field("password", 3.0),
        ]);
        let expected = find(&doc, |e| e.attr("name") == Some("contact"));
        assert_eq!(
            FieldClassifier::find_username_field(&doc, container(&doc)),
            Some(expected)
        );
    }

    #[test]
    fn test_positional_fallback_before_password() {
        let doc = form([
            field("checkbox", 1.0),
            field("hidden", 1.5),
            field("tel", 2.0).name("phone"),
            field("password", 3.0),
            field("text", 4.0).name("otp"),
        ]);
        let expected = find(&doc, |e| e.attr("name") == Some("phone"));
        assert_eq!(
            FieldClassifier::find_username_field(&doc, container(&doc)),
            Some(expected)
        );
    }

    #[test]
    fn test_last_resort_after_password() {
        let doc = form([field("password", 1.0), field("text", 2.0).name("code")]);
        let expected = find(&doc, |e| e.attr("name") == Some("code"));
        assert_eq!(
            FieldClassifier::find_username_field(&doc, container(&doc)),
            Some(expected)
        );
    }

    #[test]
    fn test_untyped_input_counts_as_text() {
        let doc = form([
            vaultfill_core::dom::NodeSnapshot::new("input").rect(10.0, 10.0, 200.0, 30.0),
            field("password", 2.0),
        ]);
        assert!(FieldClassifier::find_username_field(&doc, container(&doc)).is_some());
    }

    #[test]
    fn test_password_only_form() {
        let doc = form([field("password", 1.0), field("submit", 2.0)]);
        assert_eq!(FieldClassifier::find_username_field(&doc, container(&doc)), None);
    }

    #[test]
    fn test_decoy_inputs_never_selected() {
        let doc = form([
            vaultfill_core::dom::NodeSnapshot::input("email").rect(0.0, 0.0, 1.0, 1.0),
            block("div").display("none").child(field("text", 1.0).name("username")),
            field("password", 2.0),
        ]);
        assert_eq!(FieldClassifier::find_username_field(&doc, container(&doc)), None);
    }
}
