//! Navigation capability.
//!
//! Fire-and-forget instructions to the shell's navigator. Only transitions
//! the core decides on its own go through here (post-submit moves); screen
//! entry initiated by the user arrives as `*Opened` events instead.

use crux_core::capability::{CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::Route;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NavOperation {
    /// Pop the current screen off the shell's stack.
    Back,
    Push { route: Route },
    /// Replace the whole stack, so back cannot return to the old screen.
    Replace { route: Route },
}

impl Operation for NavOperation {
    type Output = ();
}

pub struct Navigator<E> {
    context: CapabilityContext<NavOperation, E>,
}

impl<E> crux_core::capability::Capability<E> for Navigator<E> {
    type Operation = NavOperation;
    type MappedSelf<MappedEv> = Navigator<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> E + Send + Sync + 'static,
        E: 'static,
        NewEv: 'static + Send,
    {
        Navigator::new(self.context.map_event(f))
    }
}

impl<E> Navigator<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<NavOperation, E>) -> Self {
        Self { context }
    }

    pub fn back(&self) {
        self.notify(NavOperation::Back);
    }

    pub fn push(&self, route: Route) {
        self.notify(NavOperation::Push { route });
    }

    pub fn replace(&self, route: Route) {
        self.notify(NavOperation::Replace { route });
    }

    fn notify(&self, operation: NavOperation) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context.notify_shell(operation).await;
        });
    }
}
