use crate::errors::{FormError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a selector string is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Id,
    Css,
    XPath,
    /// Exact match on an element's own trimmed text.
    Text,
    Name,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Id => "id",
            Strategy::Css => "css",
            Strategy::XPath => "xpath",
            Strategy::Text => "text",
            Strategy::Name => "name",
        };
        f.write_str(name)
    }
}

/// Immutable description of how to find element(s) in the current DOM.
///
/// A locator never holds a reference to a live node; it is resolved again on
/// every operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLocator", into = "RawLocator")]
pub struct Locator {
    strategy: Strategy,
    selector: String,
    index: Option<usize>,
}

#[derive(Serialize, Deserialize)]
struct RawLocator {
    strategy: Strategy,
    selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    index: Option<usize>,
}

impl TryFrom<RawLocator> for Locator {
    type Error = FormError;

    fn try_from(raw: RawLocator) -> Result<Self> {
        let locator = Locator::new(raw.strategy, raw.selector)?;
        Ok(match raw.index {
            Some(index) => locator.nth(index),
            None => locator,
        })
    }
}

impl From<Locator> for RawLocator {
    fn from(locator: Locator) -> Self {
        RawLocator {
            strategy: locator.strategy,
            selector: locator.selector,
            index: locator.index,
        }
    }
}

impl Locator {
    pub fn new(strategy: Strategy, selector: impl Into<String>) -> Result<Self> {
        let selector = selector.into();
        if selector.trim().is_empty() {
            return Err(FormError::InvalidLocator(format!(
                "empty {} selector",
                strategy
            )));
        }
        Ok(Self {
            strategy,
            selector,
            index: None,
        })
    }

    pub fn id(selector: impl Into<String>) -> Result<Self> {
        Self::new(Strategy::Id, selector)
    }

    pub fn css(selector: impl Into<String>) -> Result<Self> {
        Self::new(Strategy::Css, selector)
    }

    pub fn xpath(selector: impl Into<String>) -> Result<Self> {
        Self::new(Strategy::XPath, selector)
    }

    pub fn text(selector: impl Into<String>) -> Result<Self> {
        Self::new(Strategy::Text, selector)
    }

    pub fn name(selector: impl Into<String>) -> Result<Self> {
        Self::new(Strategy::Name, selector)
    }

    /// Built-in selector literals used by configuration defaults.
    pub(crate) fn builtin(strategy: Strategy, selector: &'static str) -> Self {
        debug_assert!(!selector.trim().is_empty());
        Self {
            strategy,
            selector: selector.to_string(),
            index: None,
        }
    }

    /// The `index`-th match (document order) of this locator.
    pub fn nth(&self, index: usize) -> Self {
        Self {
            strategy: self.strategy,
            selector: self.selector.clone(),
            index: Some(index),
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Same strategy and selector, ignoring any `nth` narrowing.
    pub fn same_query(&self, other: &Locator) -> bool {
        self.strategy == other.strategy && self.selector == other.selector
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy, self.selector)?;
        if let Some(index) = self.index {
            write!(f, "[{}]", index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_selector_rejected() {
        assert!(Locator::css("").is_err());
        assert!(Locator::xpath("   ").is_err());
        assert!(Locator::id("save-btn").is_ok());
    }

    #[test]
    fn test_nth_keeps_query() {
        let radios = Locator::xpath("//input[@type='radio']").unwrap();
        let third = radios.nth(2);
        assert!(third.same_query(&radios));
        assert_eq!(third.index(), Some(2));
        assert_eq!(radios.index(), None);
        assert_eq!(third.to_string(), "xpath=//input[@type='radio'][2]");
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Locator =
            serde_json::from_str(r#"{"strategy":"css","selector":"div.Select-option"}"#).unwrap();
        assert_eq!(ok.strategy(), Strategy::Css);

        let empty = serde_json::from_str::<Locator>(r#"{"strategy":"xpath","selector":""}"#);
        assert!(empty.is_err());
    }

    #[test]
    fn test_serialized_index_survives() {
        let third = Locator::xpath("//input[@type='radio']").unwrap().nth(2);
        let json = serde_json::to_string(&third).unwrap();
        let back: Locator = serde_json::from_str(&json).unwrap();
        assert_eq!(back, third);

        let base = serde_json::to_string(&Locator::id("save-btn").unwrap()).unwrap();
        assert!(!base.contains("index"));
    }
}
