//! Scripts injected into the page.
//!
//! Each script inspects a single scope: the document when `arguments[0]` is
//! null, otherwise the shadow root of the host passed in. Recursion over
//! nested shadow roots happens on the Rust side.

/// `(scope)` → elements in the scope that host a shadow root.
pub const HOSTS_IN_SCOPE: &str = r#"
const scope = arguments[0] ? arguments[0].shadowRoot : document;
if (!scope) return [];
const hosts = [];
const walker = document.createTreeWalker(scope, NodeFilter.SHOW_ELEMENT);
let node;
while ((node = walker.nextNode())) {
  if (node.shadowRoot) hosts.push(node);
}
return hosts;
"#;

/// `(scope, selector)` → elements in the scope matching the selector.
pub const QUERY_IN_SCOPE: &str = r#"
const scope = arguments[0] ? arguments[0].shadowRoot : document;
if (!scope) return [];
return Array.from(scope.querySelectorAll(arguments[1]));
"#;

/// `(scope, text)` → elements in the scope whose trimmed visible text equals `text`.
pub const TEXT_IN_SCOPE: &str = r#"
const scope = arguments[0] ? arguments[0].shadowRoot : document;
if (!scope) return [];
const wanted = String(arguments[1]).trim();
const hits = [];
const walker = document.createTreeWalker(scope, NodeFilter.SHOW_ELEMENT);
let node;
while ((node = walker.nextNode())) {
  try {
    if ((node.innerText || "").trim() === wanted) hits.push(node);
  } catch (e) {}
}
return hits;
"#;

/// `(element)` → its serialized markup.
pub const OUTER_HTML: &str = r#"
const el = arguments[0];
return el ? el.outerHTML : null;
"#;

/// `(element)` → the element itself if clickable, else its first link or button.
pub const CLICK_TARGET: &str = r#"
const el = arguments[0];
const tag = (el.tagName || "").toLowerCase();
const role = (el.getAttribute("role") || "").toLowerCase();
if (tag === "a" || tag === "button" || role === "button") return el;
return el.querySelector("a,button") || el;
"#;

/// `(element)` → scrolls it to the middle of the viewport.
pub const SCROLL_INTO_VIEW: &str = r#"
arguments[0].scrollIntoView({block: "center"});
return true;
"#;

/// `(element)` → focuses it.
pub const FOCUS: &str = r#"
arguments[0].focus();
return true;
"#;

/// `(element)` → DOM-level click, for controls that refuse a native click.
pub const SCRIPT_CLICK: &str = r#"
arguments[0].click();
return true;
"#;

/// `(input, value)` → sets the value and fires the events a framework listens for.
pub const SET_VALUE_AND_SUBMIT: &str = r#"
const el = arguments[0], val = arguments[1];
el.focus();
el.value = val;
el.dispatchEvent(new Event("input", {bubbles: true}));
el.dispatchEvent(new Event("change", {bubbles: true}));
el.dispatchEvent(new KeyboardEvent("keydown", {key: "Enter", bubbles: true}));
el.dispatchEvent(new KeyboardEvent("keyup", {key: "Enter", bubbles: true}));
return true;
"#;

/// `()` → scrolls the window to the bottom to trigger lazy rendering.
pub const SCROLL_TO_BOTTOM: &str = r#"
window.scrollTo(0, document.body.scrollHeight);
return true;
"#;
