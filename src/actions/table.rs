use crate::config::{ActionRoute, DispatchConfig};

/// Static name → number routing for the dial step.
#[derive(Clone, Copy, Debug)]
pub struct ActionTable {
    routes: &'static [ActionRoute],
}

impl ActionTable {
    pub const fn new(routes: &'static [ActionRoute]) -> Self {
        Self { routes }
    }

    pub fn from_config(config: &'static DispatchConfig) -> Self {
        Self::new(config.actions)
    }

    /// Names are matched exactly; stored bindings carry the display name.
    pub fn resolve(&self, name: &str) -> Option<&'static ActionRoute> {
        self.routes.iter().find(|route| route.name == name)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

pub fn dial_uri(number: &str) -> String {
    format!("tel:{number}")
}
