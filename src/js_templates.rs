use serde::Serialize;

pub const READY_STATE: &str = "document.readyState";

/// Encodes a value as a JavaScript literal. JSON is a subset of JS, so this
/// also takes care of quoting inside selectors.
fn literal<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

pub fn any_selector_present(selectors: &[&str]) -> String {
    format!(
        r#"(function(){{const s={};return s.some(x=>{{try{{return document.querySelectorAll(x).length>0}}catch(e){{return false}}}})}})()"#,
        literal(selectors)
    )
}

pub fn collect_links(selector: &str) -> String {
    format!(
        r#"(function(){{let els;try{{els=document.querySelectorAll({})}}catch(e){{return[]}}return Array.from(els).map(el=>el.href).filter(h=>typeof h==='string')}})()"#,
        literal(selector)
    )
}

pub fn remove_elements(selectors: &[String]) -> String {
    format!(
        r#"(function(){{let n=0;for(const s of {}){{try{{document.querySelectorAll(s).forEach(el=>{{el.remove();n++}})}}catch(e){{}}}}return n}})()"#,
        literal(selectors)
    )
}
