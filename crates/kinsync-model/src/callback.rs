//! Change notification for bodies.

use std::sync::{Arc, Weak};

use crate::env::BodyId;

/// Body properties observers can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyProperty {
    /// Geometry of a link was replaced; shape-derived state is stale.
    LinkGeometry,
    /// Link transforms changed.
    LinkTransforms,
    /// A link was enabled or disabled.
    LinkEnable,
}

pub(crate) type ChangeCallback = Arc<dyn Fn(BodyId) + Send + Sync>;

pub(crate) struct Subscriber {
    pub(crate) property: BodyProperty,
    pub(crate) token: Weak<()>,
    pub(crate) callback: ChangeCallback,
}

impl Subscriber {
    pub(crate) fn is_alive(&self) -> bool {
        self.token.strong_count() > 0
    }
}

/// Registration handle returned by
/// [`KinBody::register_change_callback`](crate::KinBody::register_change_callback).
///
/// The callback stays registered for as long as this value lives.
#[must_use = "dropping the subscription unregisters the callback"]
#[derive(Debug)]
pub struct ChangeSubscription {
    _token: Arc<()>,
}

impl ChangeSubscription {
    pub(crate) fn new() -> (Self, Weak<()>) {
        let token = Arc::new(());
        let weak = Arc::downgrade(&token);
        (Self { _token: token }, weak)
    }
}
