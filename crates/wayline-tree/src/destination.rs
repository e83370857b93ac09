//! # Destinations
//!
//! A [`Destination`] names one navigation target. It carries an opaque
//! [`TargetKind`], an optional context payload handed to the handler, and two
//! identifiers that decide identity:
//!
//! - `user_identifier`: optional, caller-supplied, promised unique when set
//! - `instance_identifier`: generated once at construction
//!
//! Equality is identity, never structure. When both sides carry a user
//! identifier only those are compared; otherwise the instance identifiers are.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

/// Untyped payload carried from the navigation state to the handler.
pub type ContextData = Arc<dyn Any + Send + Sync>;

/// Opaque tag identifying which kind of view/handler a destination stands for.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetKind(&'static str);

impl TargetKind {
    /// Kind derived from a Rust type, typically the handler's own type.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(std::any::type_name::<T>())
    }

    /// Kind derived from a static label.
    pub const fn named(label: &'static str) -> Self {
        Self(label)
    }

    /// The label backing this kind.
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TargetKind({})", self.0)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Identity-bearing descriptor of one navigation target.
///
/// `Destination` implements [`PartialEq`] but deliberately not `Eq`/`Hash`:
/// the mixed user/instance identifier rule is not transitive when callers mix
/// identified and anonymous destinations, so lookups are linear scans.
#[derive(Clone)]
pub struct Destination {
    target_kind: TargetKind,
    context: Option<ContextData>,
    user_identifier: Option<String>,
    instance_identifier: Uuid,
}

impl Destination {
    /// Create a destination with a freshly generated instance identifier.
    pub fn new(target_kind: TargetKind) -> Self {
        Self {
            target_kind,
            context: None,
            user_identifier: None,
            instance_identifier: Uuid::new_v4(),
        }
    }

    /// Attach a context payload.
    #[must_use]
    pub fn with_context<T: Any + Send + Sync>(mut self, context: T) -> Self {
        self.context = Some(Arc::new(context));
        self
    }

    /// Attach an already shared context payload.
    #[must_use]
    pub fn with_shared_context(mut self, context: ContextData) -> Self {
        self.context = Some(context);
        self
    }

    /// Attach a caller-chosen identifier. It must be unique process-wide.
    #[must_use]
    pub fn with_user_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.user_identifier = Some(identifier.into());
        self
    }

    /// Override the generated instance identifier (restored state).
    #[must_use]
    pub fn with_instance_identifier(mut self, identifier: Uuid) -> Self {
        self.instance_identifier = identifier;
        self
    }

    /// Which kind of handler realises this destination.
    pub fn target_kind(&self) -> TargetKind {
        self.target_kind
    }

    /// The untyped context payload, if any.
    pub fn context_data(&self) -> Option<&ContextData> {
        self.context.as_ref()
    }

    /// The context payload downcast to `T`.
    pub fn context<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.context.as_deref().and_then(|c| c.downcast_ref::<T>())
    }

    /// Caller-chosen identifier.
    pub fn user_identifier(&self) -> Option<&str> {
        self.user_identifier.as_deref()
    }

    /// Generated identifier, unique per constructed destination.
    pub fn instance_identifier(&self) -> Uuid {
        self.instance_identifier
    }
}

impl PartialEq for Destination {
    fn eq(&self, other: &Self) -> bool {
        match (&self.user_identifier, &other.user_identifier) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            _ => self.instance_identifier == other.instance_identifier,
        }
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("target_kind", &self.target_kind)
            .field("user_identifier", &self.user_identifier)
            .field("instance_identifier", &self.instance_identifier)
            .field("has_context", &self.context.is_some())
            .finish()
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.user_identifier {
            Some(id) => write!(f, "{}#{}", self.target_kind, id),
            None => write!(f, "{}@{}", self.target_kind, self.instance_identifier),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const SCREEN: TargetKind = TargetKind::named("screen");

    #[test]
    fn test_same_fields_different_instances_are_distinct() {
        let a = Destination::new(SCREEN);
        let b = Destination::new(SCREEN);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_user_identifier_wins_when_both_present() {
        let a = Destination::new(SCREEN).with_user_identifier("inbox");
        let b = Destination::new(TargetKind::named("other")).with_user_identifier("inbox");
        assert_eq!(a, b);

        let c = Destination::new(SCREEN).with_user_identifier("outbox");
        assert_ne!(a, c);
    }

    #[test]
    fn test_falls_back_to_instance_when_one_side_is_anonymous() {
        let anonymous = Destination::new(SCREEN);
        let named = anonymous.clone().with_user_identifier("settings");
        assert_eq!(anonymous, named);

        let unrelated = Destination::new(SCREEN).with_user_identifier("settings");
        assert_ne!(anonymous, unrelated);
    }

    #[test]
    fn test_typed_context_access() {
        #[derive(Debug, PartialEq)]
        struct Animated(bool);

        let dest = Destination::new(SCREEN).with_context(Animated(true));
        assert_eq!(dest.context::<Animated>(), Some(&Animated(true)));
        assert!(dest.context::<String>().is_none());
    }

    #[test]
    fn test_kind_of_type() {
        struct Settings;
        assert_eq!(TargetKind::of::<Settings>(), TargetKind::of::<Settings>());
        assert_ne!(TargetKind::of::<Settings>(), TargetKind::of::<String>());
    }
}
