use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::handler::DynActionHandler;

/// Resilience variant a handler was registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    /// Older handler; the dispatcher wraps it in timeout + retry.
    Legacy,
    /// Newer handler that owns its resilience policy; invoked directly.
    Framework,
}

impl std::fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Framework => write!(f, "framework"),
        }
    }
}

/// A handler resolved from the registry.
#[derive(Clone)]
pub enum RegisteredHandler {
    Legacy(Arc<dyn DynActionHandler>),
    Framework(Arc<dyn DynActionHandler>),
}

impl RegisteredHandler {
    pub fn kind(&self) -> HandlerKind {
        match self {
            Self::Legacy(_) => HandlerKind::Legacy,
            Self::Framework(_) => HandlerKind::Framework,
        }
    }

    pub fn handler(&self) -> &Arc<dyn DynActionHandler> {
        match self {
            Self::Legacy(h) | Self::Framework(h) => h,
        }
    }
}

impl std::fmt::Debug for RegisteredHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredHandler")
            .field("action_type", &self.handler().action_type())
            .field("kind", &self.kind())
            .finish()
    }
}

/// Registered action type and its variant, for health reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerInfo {
    pub action_type: String,
    pub kind: HandlerKind,
}

/// Maps action-type strings to handlers.
///
/// Built once at startup and then shared read-only. Registering an action
/// type twice replaces the earlier handler, whichever variant it was.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, RegisteredHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a legacy handler under its [`DynActionHandler::action_type`].
    pub fn register_legacy(&mut self, handler: Arc<dyn DynActionHandler>) {
        let name = handler.action_type().to_owned();
        self.handlers
            .insert(name, RegisteredHandler::Legacy(handler));
    }

    /// Register a framework handler under its [`DynActionHandler::action_type`].
    pub fn register_framework(&mut self, handler: Arc<dyn DynActionHandler>) {
        let name = handler.action_type().to_owned();
        self.handlers
            .insert(name, RegisteredHandler::Framework(handler));
    }

    pub fn get(&self, action_type: &str) -> Option<RegisteredHandler> {
        self.handlers.get(action_type).cloned()
    }

    pub fn contains(&self, action_type: &str) -> bool {
        self.handlers.contains_key(action_type)
    }

    /// Registered handlers sorted by action type.
    pub fn list(&self) -> Vec<HandlerInfo> {
        let mut infos: Vec<HandlerInfo> = self
            .handlers
            .iter()
            .map(|(name, h)| HandlerInfo {
                action_type: name.clone(),
                kind: h.kind(),
            })
            .collect();
        infos.sort_unstable_by(|a, b| a.action_type.cmp(&b.action_type));
        infos
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.list())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Invocation;
    use crate::error::HandlerError;
    use crate::handler::{ActionHandler, HandlerReport};

    struct StubHandler {
        name: String,
    }

    impl StubHandler {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_owned(),
            })
        }
    }

    impl ActionHandler for StubHandler {
        fn action_type(&self) -> &str {
            &self.name
        }

        async fn handle(&self, _invocation: &Invocation<'_>) -> Result<HandlerReport, HandlerError> {
            Ok(HandlerReport::success("stub"))
        }
    }

    #[test]
    fn empty_registry() {
        let reg = HandlerRegistry::new();
        assert!(reg.is_empty());
        assert_eq!(reg.len(), 0);
        assert!(reg.get("reset_trackman").is_none());
    }

    #[test]
    fn lookup_returns_registered_variant() {
        let mut reg = HandlerRegistry::new();
        reg.register_framework(StubHandler::new("unlock_door"));
        reg.register_legacy(StubHandler::new("escalate"));

        assert_eq!(
            reg.get("unlock_door").map(|h| h.kind()),
            Some(HandlerKind::Framework)
        );
        assert_eq!(
            reg.get("escalate").map(|h| h.kind()),
            Some(HandlerKind::Legacy)
        );
        assert!(reg.contains("escalate"));
        assert!(!reg.contains("reboot_pc"));
    }

    #[test]
    fn re_registering_replaces_variant() {
        let mut reg = HandlerRegistry::new();
        reg.register_legacy(StubHandler::new("reset_trackman"));
        reg.register_framework(StubHandler::new("reset_trackman"));
        assert_eq!(reg.len(), 1);
        assert_eq!(
            reg.get("reset_trackman").map(|h| h.kind()),
            Some(HandlerKind::Framework)
        );
    }

    #[test]
    fn list_is_sorted() {
        let mut reg = HandlerRegistry::new();
        reg.register_legacy(StubHandler::new("send_message"));
        reg.register_framework(StubHandler::new("reboot_pc"));
        reg.register_legacy(StubHandler::new("escalate"));
        let names: Vec<String> = reg.list().into_iter().map(|i| i.action_type).collect();
        assert_eq!(names, vec!["escalate", "reboot_pc", "send_message"]);
    }

    #[test]
    fn handler_info_serializes_kind() {
        let info = HandlerInfo {
            action_type: "escalate".into(),
            kind: HandlerKind::Legacy,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["kind"], "legacy");
    }
}
