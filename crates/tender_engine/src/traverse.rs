use std::collections::HashSet;

use engine_logging::engine_trace;

use crate::error::PageError;
use crate::scripts;
use crate::session::{BrowserSession, ElementRef, ScriptArg, SessionError};

/// Composed-tree discovery over nested shadow roots.
///
/// Scopes are visited depth first: the document, then every host in the
/// order it was found, each followed by the hosts inside its own shadow root.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShadowTraverser;

impl ShadowTraverser {
    pub fn new() -> Self {
        Self
    }

    /// All shadow hosts reachable from `root` (the document when `None`).
    ///
    /// A host is reported once even if it turns up again deeper down. A host
    /// that goes stale while being walked is skipped.
    pub fn find_hosts(
        &self,
        session: &mut dyn BrowserSession,
        root: Option<ElementRef>,
    ) -> Result<Vec<ElementRef>, PageError> {
        let mut visited = HashSet::new();
        if let Some(root) = root {
            visited.insert(root);
        }
        let mut hosts = Vec::new();
        self.walk_hosts(session, root, &mut visited, &mut hosts)?;
        Ok(hosts)
    }

    fn walk_hosts(
        &self,
        session: &mut dyn BrowserSession,
        scope: Option<ElementRef>,
        visited: &mut HashSet<ElementRef>,
        hosts: &mut Vec<ElementRef>,
    ) -> Result<(), PageError> {
        let found = match session.execute_script(scripts::HOSTS_IN_SCOPE, &[scope.into()]) {
            Ok(value) => value.into_elements(),
            Err(SessionError::StaleElement(message)) => {
                engine_trace!("skipping stale shadow host: {}", message);
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        for host in found {
            if !visited.insert(host) {
                continue;
            }
            hosts.push(host);
            self.walk_hosts(session, Some(host), visited, hosts)?;
        }
        Ok(())
    }

    /// Every element matching `selector` in the light DOM and all shadow trees.
    pub fn deep_query(
        &self,
        session: &mut dyn BrowserSession,
        selector: &str,
    ) -> Result<Vec<ElementRef>, PageError> {
        self.collect_in_scopes(session, scripts::QUERY_IN_SCOPE, selector)
    }

    /// Every element whose trimmed visible text equals `text`, across all scopes.
    pub fn deep_find_by_text(
        &self,
        session: &mut dyn BrowserSession,
        text: &str,
    ) -> Result<Vec<ElementRef>, PageError> {
        self.collect_in_scopes(session, scripts::TEXT_IN_SCOPE, text)
    }

    fn collect_in_scopes(
        &self,
        session: &mut dyn BrowserSession,
        script: &str,
        needle: &str,
    ) -> Result<Vec<ElementRef>, PageError> {
        let hosts = self.find_hosts(session, None)?;
        let scopes = std::iter::once(None).chain(hosts.into_iter().map(Some));

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for scope in scopes {
            let args = [scope.into(), ScriptArg::Text(needle.to_string())];
            let matches = match session.execute_script(script, &args) {
                Ok(value) => value.into_elements(),
                Err(SessionError::StaleElement(_)) => continue,
                Err(err) => return Err(err.into()),
            };
            out.extend(matches.into_iter().filter(|el| seen.insert(*el)));
        }
        Ok(out)
    }
}
