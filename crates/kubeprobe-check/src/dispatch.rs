use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use kubeprobe_types::{Action, ProbeError, Resource};

use crate::deployments::{discover_deployments, get_deployments, render_value};

/// Arguments passed through to every handler
#[derive(Clone, Copy, Debug)]
pub struct Query<'a> {
    pub resource_name: &'a str,
    pub key: &'a str,
}

/// Turns fetched data into the text printed for the monitor
pub type Handler = fn(&Value, &Query<'_>) -> Result<String, ProbeError>;

/// Dispatch table from (action, resource) pairs to handlers
pub struct Dispatcher {
    handlers: HashMap<(Action, Resource), Handler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let mut handlers: HashMap<(Action, Resource), Handler> = HashMap::new();

        handlers.insert((Action::Discover, Resource::Deployments), discover_handler);
        handlers.insert((Action::Get, Resource::Deployments), get_handler);

        Self { handlers }
    }

    /// Look up the handler for a pair
    pub fn handler_for(&self, action: Action, resource: Resource) -> Result<Handler, ProbeError> {
        self.handlers
            .get(&(action, resource))
            .copied()
            .ok_or(ProbeError::UnsupportedCombination { action, resource })
    }

    pub fn supports(&self, action: Action, resource: Resource) -> bool {
        self.handlers.contains_key(&(action, resource))
    }

    /// Every known pair that has no handler wired
    pub fn unsupported(&self) -> Vec<(Action, Resource)> {
        Action::ALL
            .into_iter()
            .flat_map(|a| Resource::ALL.into_iter().map(move |r| (a, r)))
            .filter(|(a, r)| !self.supports(*a, *r))
            .collect()
    }

    /// Run the handler for `action` on `resource` data
    pub fn dispatch(
        &self,
        action: Action,
        resource: Resource,
        data: &Value,
        resource_name: &str,
        key: &str,
    ) -> Result<String, ProbeError> {
        let handler = self.handler_for(action, resource)?;
        debug!(%action, %resource, resource_name, key, "dispatching");
        handler(data, &Query { resource_name, key })
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_handler(data: &Value, _query: &Query<'_>) -> Result<String, ProbeError> {
    let names = discover_deployments(data)?;
    Ok(Value::from(names).to_string())
}

fn get_handler(data: &Value, query: &Query<'_>) -> Result<String, ProbeError> {
    let value = get_deployments(data, query.resource_name, query.key)?;
    Ok(render_value(&value))
}
