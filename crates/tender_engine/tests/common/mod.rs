#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::{Mutex, Once};
use std::time::{Duration, Instant};

use scraper::{Html, Selector};
use tender_engine::{
    scripts, BrowserSession, Clock, ElementRef, EventSink, OutputRecord, RecordSink, RunEvent,
    ScrapeSettings, ScriptArg, ScriptValue, SessionError, SinkError,
};

pub const PORTAL_URL: &str = "https://portal.test/search";

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

/// Settings tuned for the fake portal: one scroll per collect, no jitter.
pub fn test_settings(end_page: u32) -> ScrapeSettings {
    ScrapeSettings {
        portal_url: PORTAL_URL.to_string(),
        end_page: Some(end_page),
        scroll_repeats: 1,
        poll_jitter: Duration::ZERO,
        ..ScrapeSettings::default()
    }
}

// ---------------------------------------------------------------------------
// Clock

struct ClockState {
    origin: Instant,
    elapsed: Cell<Duration>,
    sleeps: RefCell<Vec<Duration>>,
}

/// Virtual time: `sleep` advances the clock instantly and is recorded.
#[derive(Clone)]
pub struct FakeClock {
    state: Rc<ClockState>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            state: Rc::new(ClockState {
                origin: Instant::now(),
                elapsed: Cell::new(Duration::ZERO),
                sleeps: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.state.elapsed.get()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.sleeps.borrow().clone()
    }

    pub fn clear_sleeps(&self) {
        self.state.sleeps.borrow_mut().clear();
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.state.origin + self.state.elapsed.get()
    }

    fn sleep(&self, duration: Duration) {
        self.state.sleeps.borrow_mut().push(duration);
        self.state.elapsed.set(self.state.elapsed.get() + duration);
    }
}

// ---------------------------------------------------------------------------
// Events and records

#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<RunEvent>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<RunEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl EventSink for RecordingEvents {
    fn emit(&self, event: RunEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Default)]
pub struct MemorySink {
    pub records: Vec<OutputRecord>,
    pub flushes: usize,
    /// Appends beyond this many records fail.
    pub capacity: Option<usize>,
}

impl MemorySink {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }
}

impl RecordSink for MemorySink {
    fn append(&mut self, record: &OutputRecord) -> Result<(), SinkError> {
        if self.capacity.is_some_and(|cap| self.records.len() >= cap) {
            return Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::StorageFull,
                "disk full",
            )));
        }
        self.records.push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.flushes += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Portal content

#[derive(Debug, Clone)]
pub struct CardSpec {
    pub title: String,
    pub href: String,
    pub description: Option<String>,
}

pub fn card(title: &str, href: &str) -> CardSpec {
    CardSpec {
        title: title.to_string(),
        href: href.to_string(),
        description: None,
    }
}

/// `count` distinct cards for `page`, linking to `/posting/{page}-{i}`.
pub fn page_of(page: u32, count: usize) -> Vec<CardSpec> {
    (1..=count)
        .map(|i| CardSpec {
            title: format!("Opportunity {page}-{i}"),
            href: format!("/posting/{page}-{i}"),
            description: Some(format!("Summary of {page}-{i}")),
        })
        .collect()
}

/// Interactions that change what the portal shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Navigate(String),
    Click(String),
    ScriptClick(String),
    TypedEnter(String),
    ScriptSubmit(String),
    Scroll,
}

impl Action {
    pub fn is_navigation(&self) -> bool {
        !matches!(self, Action::Scroll)
    }
}

// ---------------------------------------------------------------------------
// DOM model

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<usize>,
    shadow: Option<Vec<usize>>,
}

impl Node {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Default)]
struct Dom {
    nodes: Vec<Node>,
}

impl Dom {
    const ROOT: usize = 0;

    fn new() -> Self {
        let mut dom = Self::default();
        dom.push("#document", &[], "");
        dom
    }

    fn push(&mut self, tag: &str, attrs: &[(&str, &str)], text: &str) -> usize {
        self.nodes.push(Node {
            tag: tag.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            text: text.to_string(),
            children: Vec::new(),
            shadow: None,
        });
        self.nodes.len() - 1
    }

    fn append(&mut self, parent: usize, tag: &str, attrs: &[(&str, &str)], text: &str) -> usize {
        let id = self.push(tag, attrs, text);
        self.nodes[parent].children.push(id);
        id
    }

    fn attach_shadow(&mut self, host: usize) {
        self.nodes[host].shadow.get_or_insert_with(Vec::new);
    }

    fn append_shadow(&mut self, host: usize, tag: &str, attrs: &[(&str, &str)], text: &str) -> usize {
        let id = self.push(tag, attrs, text);
        self.nodes[host].shadow.get_or_insert_with(Vec::new).push(id);
        id
    }

    /// Top-level nodes of a scope: document children or a host's shadow root.
    fn scope_roots(&self, scope: usize) -> Option<&[usize]> {
        if scope == Self::ROOT {
            Some(self.nodes[scope].children.as_slice())
        } else {
            self.nodes[scope].shadow.as_deref()
        }
    }

    /// Light-tree preorder below `roots`; shadow roots are not entered.
    fn preorder(&self, roots: &[usize]) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id].children.iter().rev().copied());
        }
        out
    }

    fn inner_text(&self, id: usize) -> String {
        let mut text = self.nodes[id].text.clone();
        for child in &self.nodes[id].children {
            text.push_str(&self.inner_text(*child));
        }
        text
    }

    fn render(&self, id: usize, tagged: bool, out: &mut String) {
        let node = &self.nodes[id];
        out.push('<');
        out.push_str(&node.tag);
        if tagged {
            out.push_str(&format!(" data-fake=\"{id}\""));
        }
        for (key, value) in &node.attrs {
            out.push_str(&format!(" {key}=\"{}\"", escape(value)));
        }
        out.push('>');
        if node.tag == "input" {
            return;
        }
        out.push_str(&escape(&node.text));
        for child in &node.children {
            self.render(*child, tagged, out);
        }
        out.push_str(&format!("</{}>", node.tag));
    }

    /// `querySelectorAll` restricted to one scope, via scraper.
    fn query(&self, scope: usize, selector: &str) -> Result<Vec<usize>, SessionError> {
        let selector = Selector::parse(selector)
            .map_err(|err| SessionError::ScriptBlocked(format!("bad selector: {err}")))?;
        let Some(roots) = self.scope_roots(scope) else {
            return Ok(Vec::new());
        };
        let mut markup = String::new();
        for root in roots {
            self.render(*root, true, &mut markup);
        }
        let fragment = Html::parse_fragment(&markup);
        Ok(fragment
            .select(&selector)
            .filter_map(|el| el.value().attr("data-fake"))
            .filter_map(|id| id.parse().ok())
            .collect())
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ---------------------------------------------------------------------------
// Fake portal

/// A results portal rendered as nested shadow roots:
///
/// ```text
/// apc-app ─┬─ #shadow ─ apc-results ─ #shadow ─ apc-result-list ─ #shadow ─ cards
///          └─ #shadow ─ apc-paginator ─ #shadow ─ buttons [input]
/// ```
pub struct FakePortal {
    clock: FakeClock,
    pages: Vec<Vec<CardSpec>>,
    displayed: u32,
    pending: Option<(u32, Instant)>,
    render_delay: Duration,
    with_page_input: bool,
    native_click_fails: bool,
    native_input_fails: bool,
    hidden_controls: HashMap<u32, u32>,
    hiding: Option<String>,
    frozen: HashSet<u32>,
    block_scripts_from: Option<u32>,
    script_failures: HashMap<u32, u32>,
    blank_scrolls: HashMap<u32, u32>,
    blank: bool,

    dom: Dom,
    handles: Vec<Option<usize>>,
    handle_of: HashMap<usize, u64>,
    input_value: String,
    actions: Vec<Action>,
    scripts_run: usize,
}

impl FakePortal {
    pub fn new(clock: &FakeClock, pages: Vec<Vec<CardSpec>>) -> Self {
        Self {
            clock: clock.clone(),
            pages,
            displayed: 0,
            pending: None,
            render_delay: Duration::ZERO,
            with_page_input: false,
            native_click_fails: false,
            native_input_fails: false,
            hidden_controls: HashMap::new(),
            hiding: None,
            frozen: HashSet::new(),
            block_scripts_from: None,
            script_failures: HashMap::new(),
            blank_scrolls: HashMap::new(),
            blank: false,
            dom: Dom::new(),
            handles: Vec::new(),
            handle_of: HashMap::new(),
            input_value: String::new(),
            actions: Vec::new(),
            scripts_run: 0,
        }
    }

    /// Portal with `pages` pages of `per_page` distinct cards each.
    pub fn uniform(clock: &FakeClock, pages: u32, per_page: usize) -> Self {
        Self::new(clock, (1..=pages).map(|p| page_of(p, per_page)).collect())
    }

    pub fn with_page_input(mut self) -> Self {
        self.with_page_input = true;
        self
    }

    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = delay;
        self
    }

    pub fn with_native_click_failing(mut self) -> Self {
        self.native_click_fails = true;
        self
    }

    pub fn with_native_input_failing(mut self) -> Self {
        self.native_input_fails = true;
        self
    }

    /// The control for `page` cannot be found by the next `lookups` text searches.
    pub fn hide_control(mut self, page: u32, lookups: u32) -> Self {
        self.hidden_controls.insert(page, lookups);
        self
    }

    /// Requests to show `page` are ignored.
    pub fn freeze(mut self, page: u32) -> Self {
        self.frozen.insert(page);
        self
    }

    /// Every script fails once `page` or a later one is shown.
    pub fn block_scripts_from(mut self, page: u32) -> Self {
        self.block_scripts_from = Some(page);
        self
    }

    /// The next `count` scripts run while `page` is shown throw.
    pub fn fail_scripts_on(mut self, page: u32, count: u32) -> Self {
        self.script_failures.insert(page, count);
        self
    }

    /// The next `scrolls` scrolls on `page` leave it without cards.
    pub fn blank_after_scroll(mut self, page: u32, scrolls: u32) -> Self {
        self.blank_scrolls.insert(page, scrolls);
        self
    }

    /// Shows page 1 without going through `navigate_to`.
    pub fn loaded(mut self) -> Self {
        self.show(1);
        self
    }

    pub fn displayed_page(&self) -> u32 {
        self.displayed
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn navigation_actions(&self) -> Vec<Action> {
        self.actions
            .iter()
            .filter(|a| a.is_navigation())
            .cloned()
            .collect()
    }

    pub fn scripts_run(&self) -> usize {
        self.scripts_run
    }

    pub fn tag_of(&self, handle: ElementRef) -> Option<String> {
        let id = (*self.handles.get(handle.id() as usize)?)?;
        Some(self.dom.nodes[id].tag.clone())
    }

    pub fn text_of(&self, handle: ElementRef) -> Option<String> {
        let id = (*self.handles.get(handle.id() as usize)?)?;
        Some(self.dom.inner_text(id))
    }

    fn request(&mut self, page: u32) {
        if self.frozen.contains(&page) || page == 0 || page as usize > self.pages.len() {
            return;
        }
        self.pending = Some((page, self.clock.now() + self.render_delay));
    }

    fn tick(&mut self) {
        if let Some((page, ready_at)) = self.pending {
            if self.clock.now() >= ready_at {
                self.pending = None;
                self.blank = false;
                self.show(page);
            }
        }
    }

    fn show(&mut self, page: u32) {
        self.displayed = page;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        for slot in &mut self.handles {
            *slot = None;
        }
        self.handle_of.clear();

        let mut dom = Dom::new();
        if self.displayed > 0 {
            let app = dom.append(Dom::ROOT, "apc-app", &[], "");
            dom.attach_shadow(app);
            let results = dom.append_shadow(app, "apc-results", &[], "");
            let list = dom.append_shadow(results, "apc-result-list", &[], "");
            dom.attach_shadow(list);
            if !self.blank {
                let cards = self.pages[self.displayed as usize - 1].clone();
                for spec in &cards {
                    let card = dom.append_shadow(list, "apc-opportunity-search-result", &[], "");
                    dom.append(card, "a", &[("href", spec.href.as_str())], &spec.title);
                    if let Some(description) = &spec.description {
                        dom.append(
                            card,
                            "span",
                            &[("class", "search-result__description")],
                            description,
                        );
                    }
                }
            }
            let pager = dom.append_shadow(app, "apc-paginator", &[], "");
            for number in 1..=self.pages.len() {
                let label = number.to_string();
                dom.append_shadow(pager, "button", &[("type", "button")], &label);
            }
            if self.with_page_input {
                dom.append_shadow(
                    pager,
                    "input",
                    &[("type", "number"), ("aria-label", "Page Number")],
                    "",
                );
            }
        }
        self.dom = dom;
    }

    fn handle(&mut self, id: usize) -> ElementRef {
        if let Some(existing) = self.handle_of.get(&id) {
            return ElementRef::new(*existing);
        }
        let handle = self.handles.len() as u64;
        self.handles.push(Some(id));
        self.handle_of.insert(id, handle);
        ElementRef::new(handle)
    }

    fn resolve(&self, handle: ElementRef) -> Result<usize, SessionError> {
        self.handles
            .get(handle.id() as usize)
            .copied()
            .flatten()
            .ok_or_else(|| SessionError::StaleElement(format!("handle {}", handle.id())))
    }

    fn scope(&self, arg: Option<&ScriptArg>) -> Result<usize, SessionError> {
        match arg {
            Some(ScriptArg::Element(handle)) => self.resolve(*handle),
            _ => Ok(Dom::ROOT),
        }
    }

    fn element_arg(&self, args: &[ScriptArg]) -> Result<usize, SessionError> {
        match args.first() {
            Some(ScriptArg::Element(handle)) => self.resolve(*handle),
            other => Err(SessionError::ScriptBlocked(format!("expected element, got {other:?}"))),
        }
    }

    fn text_arg(args: &[ScriptArg], index: usize) -> String {
        match args.get(index) {
            Some(ScriptArg::Text(text)) => text.clone(),
            _ => String::new(),
        }
    }

    fn elements(&mut self, ids: Vec<usize>) -> ScriptValue {
        ScriptValue::Elements(ids.into_iter().map(|id| self.handle(id)).collect())
    }

    fn activate(&mut self, id: usize) {
        let node = &self.dom.nodes[id];
        if node.tag == "button" {
            if let Ok(page) = node.text.trim().parse() {
                self.request(page);
            }
        }
    }

    fn hosts_in_scope(&mut self, scope: usize) -> ScriptValue {
        let Some(roots) = self.dom.scope_roots(scope) else {
            return ScriptValue::Elements(Vec::new());
        };
        let hosts = self
            .dom
            .preorder(roots)
            .into_iter()
            .filter(|id| self.dom.nodes[*id].shadow.is_some())
            .collect();
        self.elements(hosts)
    }

    fn text_in_scope(&mut self, scope: usize, wanted: &str) -> ScriptValue {
        if scope == Dom::ROOT {
            self.hiding = None;
            if let Ok(page) = wanted.parse::<u32>() {
                if let Some(left) = self.hidden_controls.get_mut(&page) {
                    if *left > 0 {
                        *left -= 1;
                        self.hiding = Some(wanted.to_string());
                    }
                }
            }
        }
        if self.hiding.as_deref() == Some(wanted) {
            return ScriptValue::Elements(Vec::new());
        }
        let Some(roots) = self.dom.scope_roots(scope) else {
            return ScriptValue::Elements(Vec::new());
        };
        let hits = self
            .dom
            .preorder(roots)
            .into_iter()
            .filter(|id| self.dom.inner_text(*id).trim() == wanted.trim())
            .collect();
        self.elements(hits)
    }

    fn click_target(&mut self, id: usize) -> ScriptValue {
        let clickable = |tag: &str| tag == "a" || tag == "button";
        let target = if clickable(&self.dom.nodes[id].tag) {
            id
        } else {
            self.dom
                .preorder(&self.dom.nodes[id].children)
                .into_iter()
                .find(|child| clickable(&self.dom.nodes[*child].tag))
                .unwrap_or(id)
        };
        ScriptValue::Element(self.handle(target))
    }

    fn scroll_to_bottom(&mut self) -> ScriptValue {
        self.actions.push(Action::Scroll);
        let page = self.displayed;
        let blank = match self.blank_scrolls.get_mut(&page) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        };
        if blank != self.blank {
            self.blank = blank;
            self.rebuild();
        }
        ScriptValue::Bool(true)
    }
}

impl BrowserSession for FakePortal {
    fn navigate_to(&mut self, url: &str) -> Result<(), SessionError> {
        self.actions.push(Action::Navigate(url.to_string()));
        self.displayed = 0;
        self.rebuild();
        self.pending = Some((1, self.clock.now() + self.render_delay));
        Ok(())
    }

    fn current_url(&mut self) -> Result<String, SessionError> {
        Ok(format!("{PORTAL_URL}?page={}", self.displayed))
    }

    fn execute_script(
        &mut self,
        script: &str,
        args: &[ScriptArg],
    ) -> Result<ScriptValue, SessionError> {
        self.scripts_run += 1;
        self.tick();
        if let Some(from) = self.block_scripts_from {
            if self.displayed >= from {
                return Err(SessionError::ScriptBlocked(
                    "Content Security Policy refused script".into(),
                ));
            }
        }
        if let Some(left) = self.script_failures.get_mut(&self.displayed) {
            if *left > 0 {
                *left -= 1;
                return Err(SessionError::ScriptFailed(
                    "TypeError: shadowRoot is null".into(),
                ));
            }
        }

        if script == scripts::HOSTS_IN_SCOPE {
            let scope = self.scope(args.first())?;
            Ok(self.hosts_in_scope(scope))
        } else if script == scripts::QUERY_IN_SCOPE {
            let scope = self.scope(args.first())?;
            let found = self.dom.query(scope, &Self::text_arg(args, 1))?;
            Ok(self.elements(found))
        } else if script == scripts::TEXT_IN_SCOPE {
            let scope = self.scope(args.first())?;
            Ok(self.text_in_scope(scope, &Self::text_arg(args, 1)))
        } else if script == scripts::OUTER_HTML {
            let id = self.element_arg(args)?;
            let mut html = String::new();
            self.dom.render(id, false, &mut html);
            Ok(ScriptValue::Text(html))
        } else if script == scripts::CLICK_TARGET {
            let id = self.element_arg(args)?;
            Ok(self.click_target(id))
        } else if script == scripts::SCROLL_INTO_VIEW || script == scripts::FOCUS {
            self.element_arg(args)?;
            Ok(ScriptValue::Bool(true))
        } else if script == scripts::SCRIPT_CLICK {
            let id = self.element_arg(args)?;
            self.actions
                .push(Action::ScriptClick(self.dom.inner_text(id)));
            self.activate(id);
            Ok(ScriptValue::Bool(true))
        } else if script == scripts::SET_VALUE_AND_SUBMIT {
            self.element_arg(args)?;
            let value = Self::text_arg(args, 1);
            self.actions.push(Action::ScriptSubmit(value.clone()));
            if let Ok(page) = value.trim().parse() {
                self.request(page);
            }
            Ok(ScriptValue::Bool(true))
        } else if script == scripts::SCROLL_TO_BOTTOM {
            Ok(self.scroll_to_bottom())
        } else {
            Err(SessionError::ScriptBlocked("unknown script".into()))
        }
    }

    fn click(&mut self, element: ElementRef) -> Result<(), SessionError> {
        let id = self.resolve(element)?;
        if self.native_click_fails {
            return Err(SessionError::Interaction("element click intercepted".into()));
        }
        self.actions.push(Action::Click(self.dom.inner_text(id)));
        self.activate(id);
        Ok(())
    }

    fn clear(&mut self, element: ElementRef) -> Result<(), SessionError> {
        self.resolve(element)?;
        if self.native_input_fails {
            return Err(SessionError::Interaction("element not interactable".into()));
        }
        self.input_value.clear();
        Ok(())
    }

    fn send_keys(&mut self, element: ElementRef, text: &str) -> Result<(), SessionError> {
        self.resolve(element)?;
        self.input_value.push_str(text);
        Ok(())
    }

    fn press_enter(&mut self, element: ElementRef) -> Result<(), SessionError> {
        self.resolve(element)?;
        let value = std::mem::take(&mut self.input_value);
        self.actions.push(Action::TypedEnter(value.clone()));
        if let Ok(page) = value.trim().parse() {
            self.request(page);
        }
        Ok(())
    }
}
