//! Ansible play and task structures.
//!
//! Plays serialize through `serde_yaml`, so every interpolated value is
//! quoted by the emitter rather than spliced into text.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_yaml::{Mapping, Value};

/// Shorthand for a YAML string value.
pub fn text(value: impl Into<String>) -> Value {
    Value::String(value.into())
}

/// Build a mapping from key/value pairs, preserving order.
pub fn mapping<I>(entries: I) -> Mapping
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    let mut map = Mapping::new();
    for (key, value) in entries {
        map.insert(text(key), value);
    }
    map
}

/// One Ansible task: a name, a module invocation and task-level keywords.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    name: String,
    module: String,
    args: Value,
    keywords: Mapping,
}

impl Task {
    pub fn new(name: impl Into<String>, module: impl Into<String>, args: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            args: args.into(),
            keywords: Mapping::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set a task keyword such as `loop` or `register`.
    pub fn keyword(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.keywords.insert(text(key), value.into());
        self
    }

    pub fn notify(self, handler: &str) -> Self {
        self.keyword("notify", text(handler))
    }

    pub fn when(self, condition: &str) -> Self {
        self.keyword("when", text(condition))
    }

    pub fn register(self, variable: &str) -> Self {
        self.keyword("register", text(variable))
    }

    pub fn become_user(self, user: &str) -> Self {
        self.keyword("become_user", text(user))
    }
}

impl Serialize for Task {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2 + self.keywords.len()))?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry(&self.module, &self.args)?;
        for (key, value) in &self.keywords {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// One play: a host pattern and the tasks run against it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Play {
    pub name: String,
    pub hosts: String,
    #[serde(rename = "become")]
    pub become_root: bool,
    /// Replicas read the primary's address from its gathered facts.
    pub gather_facts: bool,
    #[serde(skip_serializing_if = "Mapping::is_empty")]
    pub vars: Mapping,
    pub tasks: Vec<Task>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub handlers: Vec<Task>,
}

impl Play {
    pub fn new(name: impl Into<String>, hosts: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hosts: hosts.into(),
            become_root: true,
            gather_facts: true,
            vars: Mapping::new(),
            tasks: Vec::new(),
            handlers: Vec::new(),
        }
    }

    pub fn with_vars(mut self, vars: Mapping) -> Self {
        self.vars = vars;
        self
    }

    pub fn with_tasks(mut self, tasks: Vec<Task>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_handler(mut self, handler: Task) -> Self {
        self.handlers.push(handler);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_key_order() {
        let task = Task::new(
            "Start PostgreSQL",
            "service",
            mapping([("name", text("postgresql")), ("state", text("started"))]),
        )
        .when("not skip");

        let yaml = serde_yaml::to_string(&task).unwrap();
        assert_eq!(
            yaml,
            "name: Start PostgreSQL\nservice:\n  name: postgresql\n  state: started\nwhen: not skip\n"
        );
    }

    #[test]
    fn test_jinja_values_are_quoted() {
        let task = Task::new("Echo", "debug", mapping([("msg", text("{{ item }}"))]));
        let yaml = serde_yaml::to_string(&task).unwrap();
        let parsed: Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed["debug"]["msg"], text("{{ item }}"));
    }

    #[test]
    fn test_play_skips_empty_sections() {
        let yaml = serde_yaml::to_string(&Play::new("Noop", "all")).unwrap();
        assert!(yaml.contains("become: true"));
        assert!(!yaml.contains("vars"));
        assert!(!yaml.contains("handlers"));
    }
}
