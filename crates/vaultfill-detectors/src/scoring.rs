use crate::visibility::Visibility;
use lazy_static::lazy_static;
use regex::Regex;
use vaultfill_core::{Document, NodeId};

lazy_static! {
    static ref AUTH_KEYWORD: Regex = Regex::new(r"login|auth").unwrap();
}

/// Independent observations about one candidate container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerSignals {
    pub is_form: bool,
    pub has_visible_text_input: bool,
    pub has_visible_password_input: bool,
    pub has_submit_control: bool,
    pub has_auth_keyword: bool,
}

impl ContainerSignals {
    /// Read the signals of `node` from the document
    pub fn collect(doc: &Document, node: NodeId) -> Option<Self> {
        let element = doc.element(node)?;

        let mut signals = ContainerSignals {
            is_form: element.is("form"),
            has_auth_keyword: AUTH_KEYWORD.is_match(&element.id().to_lowercase())
                || AUTH_KEYWORD.is_match(&element.class_name().to_lowercase()),
            ..Self::default()
        };

        for (id, descendant) in doc.descendant_elements(node) {
            if descendant.is_input() {
                let input_type = descendant.input_type();
                if !signals.has_visible_text_input
                    && (input_type == "text" || input_type == "email")
                    && Visibility::is_visible(doc, id)
                {
                    signals.has_visible_text_input = true;
                }
                if !signals.has_visible_password_input
                    && input_type == "password"
                    && Visibility::is_visible(doc, id)
                {
                    signals.has_visible_password_input = true;
                }
            }

            if !signals.has_submit_control && is_submit_control(descendant) {
                signals.has_submit_control = true;
            }
        }

        Some(signals)
    }
}

/// `button[type=submit]` or `input[type=submit]`
pub fn is_submit_control(element: &vaultfill_core::dom::Element) -> bool {
    (element.is("button") || element.is("input"))
        && element
            .attr("type")
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("submit"))
}

/// A weighted predicate over [`ContainerSignals`]
#[derive(Debug, Clone, Copy)]
pub struct ScoringRule {
    pub name: &'static str,
    pub weight: i32,
    pub applies: fn(&ContainerSignals) -> bool,
}

/// Container scoring policy, folded additively over every candidate
pub const CONTAINER_RULES: &[ScoringRule] = &[
    ScoringRule {
        name: "form-tag",
        weight: 10,
        applies: |s| s.is_form,
    },
    ScoringRule {
        name: "text-input",
        weight: 5,
        applies: |s| s.has_visible_text_input,
    },
    ScoringRule {
        name: "password-input",
        weight: 5,
        applies: |s| s.has_visible_password_input,
    },
    ScoringRule {
        name: "submit-control",
        weight: 3,
        applies: |s| s.has_submit_control,
    },
    ScoringRule {
        name: "auth-keyword",
        weight: 5,
        applies: |s| s.has_auth_keyword,
    },
];

/// Total score of a candidate under `rules`
pub fn score(signals: &ContainerSignals, rules: &[ScoringRule]) -> i32 {
    rules
        .iter()
        .filter(|rule| (rule.applies)(signals))
        .fold(0, |total, rule| total + rule.weight)
}
