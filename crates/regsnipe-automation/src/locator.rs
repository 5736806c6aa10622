//! Element locators and handles.

use serde::{Deserialize, Serialize};

/// Strategy for locating an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locator {
    /// By `id` attribute.
    Id(String),
    /// By `name` attribute.
    Name(String),
    /// By CSS selector.
    Css(String),
    /// By XPath expression.
    XPath(String),
    /// By tag name.
    Tag(String),
}

impl Locator {
    /// By-id locator.
    pub fn id(value: impl Into<String>) -> Self {
        Locator::Id(value.into())
    }

    /// By-name locator.
    pub fn name(value: impl Into<String>) -> Self {
        Locator::Name(value.into())
    }

    /// CSS selector locator.
    pub fn css(value: impl Into<String>) -> Self {
        Locator::Css(value.into())
    }

    /// XPath locator.
    pub fn xpath(value: impl Into<String>) -> Self {
        Locator::XPath(value.into())
    }

    /// Tag-name locator.
    pub fn tag(value: impl Into<String>) -> Self {
        Locator::Tag(value.into())
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Id(v) => write!(f, "id={}", v),
            Locator::Name(v) => write!(f, "name={}", v),
            Locator::Css(v) => write!(f, "css={}", v),
            Locator::XPath(v) => write!(f, "xpath={}", v),
            Locator::Tag(v) => write!(f, "tag={}", v),
        }
    }
}

/// Opaque handle to a located element, valid within one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle(String);

impl ElementHandle {
    /// Create a handle from a backend-specific reference.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// The backend-specific reference.
    pub fn reference(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_display() {
        assert_eq!(Locator::id("txt_crn1").to_string(), "id=txt_crn1");
        assert_eq!(Locator::name("username").to_string(), "name=username");
        assert_eq!(Locator::tag("body").to_string(), "tag=body");
    }
}
