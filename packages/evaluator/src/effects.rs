//! Mount-time effects.
//!
//! Each effect body is a function run once, with no arguments, in the same
//! scope methods get. Declared `deps` do not schedule re-runs.

use crate::methods::{compile_function, MethodTable};
use genui_parser::UIComponent;
use serde::Serialize;
use tracing::{debug, error, instrument};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectFailure {
    pub index: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EffectReport {
    pub executed: usize,
    pub failed: Vec<EffectFailure>,
}

impl EffectReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Run every effect in order. A failing effect is logged and skipped.
#[instrument(skip_all, fields(component = %component.id, effects = component.effects.len()))]
pub fn run_effects(component: &UIComponent, methods: &MethodTable) -> EffectReport {
    let mut report = EffectReport::default();

    for (index, effect) in component.effects.iter().enumerate() {
        if !effect.deps.is_empty() {
            debug!(index, deps = ?effect.deps, "Effect deps are not tracked; running once");
        }

        let name = format!("effect[{}]", index);
        let outcome = compile_function(&name, &effect.source)
            .map_err(|err| err.to_string())
            .and_then(|function| methods.run_thunk(&function).map_err(|err| err.to_string()));

        match outcome {
            Ok(_) => report.executed += 1,
            Err(message) => {
                error!(index, source = %effect.source, error = %message, "Effect failed");
                report.failed.push(EffectFailure { index, message });
            }
        }
    }
    report
}
