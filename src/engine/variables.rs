//! Named numeric variables owned by one sprite.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::VariableView;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub value: f64,
    #[serde(default)]
    pub show_on_stage: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableStore {
    vars: BTreeMap<String, Variable>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.vars.get(name).map(|v| v.value)
    }

    /// Value of `name`; unknown names read as zero.
    pub fn value(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(0.0)
    }

    /// Write a value, creating the variable on first write.
    pub fn set(&mut self, name: &str, value: f64) {
        match self.vars.get_mut(name) {
            Some(v) => v.value = value,
            None => {
                self.vars.insert(name.to_string(), Variable { value, show_on_stage: false });
            }
        }
    }

    pub fn change(&mut self, name: &str, by: f64) {
        let current = self.value(name);
        self.set(name, current + by);
    }

    /// Toggle the stage monitor of `name`, creating the variable at zero if
    /// it does not exist yet.
    pub fn set_shown(&mut self, name: &str, shown: bool) {
        self.vars
            .entry(name.to_string())
            .or_insert(Variable { value: 0.0, show_on_stage: false })
            .show_on_stage = shown;
    }

    /// Copy one variable (value and monitor flag) from `other`.
    pub fn copy_from(&mut self, other: &VariableStore, name: &str) {
        if let Some(v) = other.vars.get(name) {
            self.vars.insert(name.to_string(), *v);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Snapshot for the variable display layer.
    pub fn views(&self) -> Vec<VariableView> {
        self.vars
            .iter()
            .map(|(name, v)| VariableView {
                name: name.clone(),
                value: v.value,
                show_on_stage: v.show_on_stage,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_reads_as_zero_and_first_write_creates() {
        let mut vars = VariableStore::new();
        assert_eq!(vars.value("score"), 0.0);
        assert_eq!(vars.get("score"), None);
        vars.change("score", 5.0);
        assert_eq!(vars.get("score"), Some(5.0));
        vars.set("score", 2.0);
        assert_eq!(vars.value("score"), 2.0);
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn views_carry_monitor_flag() {
        let mut vars = VariableStore::new();
        vars.set("a", 1.0);
        vars.set_shown("b", true);
        let views = vars.views();
        assert_eq!(views.len(), 2);
        assert!(!views[0].show_on_stage);
        assert_eq!(views[1], VariableView { name: "b".into(), value: 0.0, show_on_stage: true });
    }
}
