//! Script snippets shared by the interaction layer and the Chrome backend.
//!
//! Scripts that take an element receive it as `arguments[0]`.

use crate::core::Locator;

pub const SCROLL_INTO_VIEW_CENTER: &str = "arguments[0].scrollIntoView({block: 'center'});";

pub const SCROLL_INTO_VIEW_NEAREST: &str =
    "arguments[0].scrollIntoView({block: 'nearest', inline: 'nearest'});";

/// Dispatches a click directly on the node, bypassing hit testing.
pub const FORCE_CLICK: &str = "arguments[0].click();";

pub const IS_OBSCURED: &str = r#"
    const el = arguments[0];
    const rect = el.getBoundingClientRect();
    const x = rect.left + rect.width / 2;
    const y = rect.top + rect.height / 2;
    const hit = document.elementFromPoint(x, y);
    return !!hit && hit !== el && !el.contains(hit);
"#;

/// Prefix of the scripted value assignment produced by [`set_value`].
pub const SET_VALUE_FN: &str = "(function(el, value)";

/// Assigns `value` to `arguments[0]` and fires `input` and `change` so
/// framework-controlled inputs pick it up.
pub fn set_value(value: &str) -> String {
    format!(
        "{} {{ el.value = value; el.dispatchEvent(new Event('input', {{bubbles: true}})); \
         el.dispatchEvent(new Event('change', {{bubbles: true}})); }})(arguments[0], {});",
        SET_VALUE_FN,
        json_string(value)
    )
}

/// Reads back the value passed to a script built by [`set_value`].
pub fn parse_set_value(script: &str) -> Option<String> {
    let rest = script.strip_prefix(SET_VALUE_FN)?;
    let start = rest.rfind("(arguments[0], ")? + "(arguments[0], ".len();
    let end = rest.rfind(");")?;
    serde_json::from_str(rest.get(start..end)?).ok()
}

/// Sets a field found by DOM id, without requiring it to be visible.
pub fn set_field_by_id(field_id: &str, value: &str) -> String {
    format!(
        "var el = document.getElementById({}); if (el) {{ el.value = {}; \
         el.dispatchEvent(new Event('input', {{bubbles: true}})); \
         el.dispatchEvent(new Event('change', {{bubbles: true}})); }}",
        json_string(field_id),
        json_string(value)
    )
}

/// Clicks the first element with the given `name` attribute, if any.
pub fn click_by_name(name: &str) -> String {
    format!(
        "var btn = document.getElementsByName({})[0]; if (btn) {{ btn.click(); }}",
        json_string(name)
    )
}

/// Expression evaluating to an array of the nodes a locator matches, in
/// document order.
pub fn query_all(locator: &Locator) -> String {
    let selector = json_string(locator.selector());
    match locator.strategy() {
        crate::core::Strategy::Css => {
            format!("Array.from(document.querySelectorAll({}))", selector)
        }
        crate::core::Strategy::Id => format!(
            "(function() {{ const el = document.getElementById({}); return el ? [el] : []; }})()",
            selector
        ),
        crate::core::Strategy::Name => {
            format!("Array.from(document.getElementsByName({}))", selector)
        }
        crate::core::Strategy::XPath => format!(
            "(function() {{ const r = document.evaluate({}, document, null, \
             XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
             for (let i = 0; i < r.snapshotLength; i++) {{ out.push(r.snapshotItem(i)); }} \
             return out; }})()",
            selector
        ),
        crate::core::Strategy::Text => format!(
            "Array.from(document.body.querySelectorAll('*')).filter(el => \
             Array.from(el.childNodes).filter(n => n.nodeType === 3) \
             .map(n => n.textContent).join('').trim() === {})",
            selector
        ),
    }
}

pub fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_value_round_trips_quotes() {
        let script = set_value("O'Brien \"Ltd\"");
        assert!(script.starts_with(SET_VALUE_FN));
        assert_eq!(parse_set_value(&script).as_deref(), Some("O'Brien \"Ltd\""));
        assert_eq!(parse_set_value(FORCE_CLICK), None);
    }

    #[test]
    fn test_query_escapes_selector() {
        let locator = Locator::xpath("//div[text()='IT']").unwrap();
        let script = query_all(&locator);
        assert!(script.contains(r#""//div[text()='IT']""#));
    }

    #[test]
    fn test_field_scripts_reference_targets() {
        assert!(set_field_by_id("signInFormUsername", "bad_user").contains("\"signInFormUsername\""));
        assert!(click_by_name("signInSubmitButton").contains("getElementsByName(\"signInSubmitButton\")"));
    }
}
