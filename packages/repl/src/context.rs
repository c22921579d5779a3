//! Console state: the registry, a caching client over it, and the
//! object currently selected with `cd`.

use std::sync::Arc;

use mgmt_core::{Client, ManagedName, NamePattern, Registry};

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error(transparent)]
    Mgmt(#[from] mgmt_core::Error),

    #[error("no object selected (use 'cd <name>')")]
    NoSelection,

    #[error("no registered name matches '{0}'")]
    NoMatch(String),

    #[error("'{pattern}' matches {} names: {}", .matches.len(), join_names(.matches))]
    Ambiguous {
        pattern: String,
        matches: Vec<ManagedName>,
    },
}

fn join_names(names: &[ManagedName]) -> String {
    names
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct ConsoleContext {
    registry: Arc<Registry>,
    client: Client<Arc<Registry>>,
    current: Option<ManagedName>,
}

impl ConsoleContext {
    pub fn new(registry: Arc<Registry>) -> Self {
        let client = Client::new(Arc::clone(&registry), Arc::clone(registry.types()));
        Self {
            registry,
            client,
            current: None,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn client(&self) -> &Client<Arc<Registry>> {
        &self.client
    }

    pub fn current(&self) -> Option<&ManagedName> {
        self.current.as_ref()
    }

    pub fn object_count(&self) -> usize {
        self.registry.len()
    }

    /// Select the object `text` resolves to.
    pub fn select(&mut self, text: &str) -> Result<&ManagedName, ContextError> {
        let name = self.resolve_name(text)?;
        Ok(&*self.current.insert(name))
    }

    pub fn clear_selection(&mut self) {
        self.current = None;
    }

    /// The object a command acts on: `explicit` if given, else the selection.
    pub fn target(&self, explicit: Option<&str>) -> Result<ManagedName, ContextError> {
        match explicit {
            Some(text) => self.resolve_name(text),
            None => self.current.clone().ok_or(ContextError::NoSelection),
        }
    }

    /// Resolve a full name, a leaf name, or a glob that matches exactly one
    /// registered name.
    pub fn resolve_name(&self, text: &str) -> Result<ManagedName, ContextError> {
        if let Ok(name) = ManagedName::parse(text) {
            if self.registry.contains(&name) {
                return Ok(name);
            }
        }

        let pattern = NamePattern::new(text);
        let mut matches: Vec<ManagedName> = self
            .client
            .names(&NamePattern::any())?
            .into_iter()
            .filter(|name| pattern.matches(name) || name.leaf() == text)
            .collect();

        match matches.len() {
            0 => Err(ContextError::NoMatch(text.to_string())),
            1 => Ok(matches.remove(0)),
            _ => Err(ContextError::Ambiguous {
                pattern: text.to_string(),
                matches,
            }),
        }
    }
}

impl std::fmt::Debug for ConsoleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleContext")
            .field("registry", &self.registry)
            .field("current", &self.current)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo;

    fn context() -> ConsoleContext {
        let registry = Arc::new(Registry::default());
        demo::install(&registry).unwrap();
        ConsoleContext::new(registry)
    }

    #[test]
    fn resolves_full_name() {
        let ctx = context();
        let name = ctx.resolve_name("demo:name=scheduler").unwrap();
        assert_eq!(name.leaf(), "scheduler");
    }

    #[test]
    fn resolves_leaf_and_glob() {
        let ctx = context();
        assert_eq!(
            ctx.resolve_name("sessions").unwrap().to_string(),
            "demo:00=caches,name=sessions"
        );
        assert_eq!(
            ctx.resolve_name("*listener").unwrap().to_string(),
            "demo:00=net,name=listener"
        );
    }

    #[test]
    fn ambiguous_glob_lists_matches() {
        let ctx = context();
        let err = ctx.resolve_name("demo:00=caches,*").unwrap_err();
        match err {
            ContextError::Ambiguous { matches, .. } => assert_eq!(matches.len(), 2),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn unknown_name_is_no_match() {
        let ctx = context();
        assert!(matches!(ctx.resolve_name("nothing"), Err(ContextError::NoMatch(_))));
    }

    #[test]
    fn selection_drives_target() {
        let mut ctx = context();
        assert!(matches!(ctx.target(None), Err(ContextError::NoSelection)));

        ctx.select("scheduler").unwrap();
        assert_eq!(ctx.target(None).unwrap().leaf(), "scheduler");
        assert_eq!(ctx.target(Some("templates")).unwrap().leaf(), "templates");

        ctx.clear_selection();
        assert!(ctx.current().is_none());
    }

    #[test]
    fn stopped_registry_surfaces_error() {
        let ctx = context();
        ctx.registry().stop();
        let err = ctx.resolve_name("sessions").unwrap_err();
        assert!(matches!(err, ContextError::Mgmt(mgmt_core::Error::Stopped)));
    }
}
