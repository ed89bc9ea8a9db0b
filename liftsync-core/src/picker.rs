//! Exercise picker view: custom and catalog definitions merged into one
//! searchable, selectable list.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::{CustomExercise, ExerciseDefinition, TemplateExercise};

/// Picker state. Custom entries come first, then catalog entries, each in
/// the order their subscription delivered them. Selection is keyed by id and
/// survives filtering and source updates.
#[derive(Debug, Clone, Default)]
pub struct ExercisePicker {
    custom: Vec<CustomExercise>,
    templates: Vec<TemplateExercise>,
    query: String,
    selection: HashMap<String, bool>,
}

impl ExercisePicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_custom(&mut self, custom: Vec<CustomExercise>) {
        self.custom = custom;
    }

    pub fn set_templates(&mut self, templates: Vec<TemplateExercise>) {
        self.templates = templates;
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Every definition, unfiltered. Name collisions are kept.
    pub fn merged(&self) -> Vec<ExerciseDefinition> {
        self.custom
            .iter()
            .cloned()
            .map(ExerciseDefinition::from)
            .chain(self.templates.iter().cloned().map(ExerciseDefinition::from))
            .collect()
    }

    /// Definitions whose name contains the query, ignoring case.
    pub fn visible(&self) -> Vec<ExerciseDefinition> {
        let needle = self.query.to_lowercase();
        self.merged()
            .into_iter()
            .filter(|d| d.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Flips the selection of `id` and returns the new state.
    pub fn toggle(&mut self, id: &str) -> bool {
        let selected = !self.is_selected(id);
        self.selection.insert(id.to_string(), selected);
        selected
    }

    pub fn set_selected(&mut self, id: &str, selected: bool) {
        self.selection.insert(id.to_string(), selected);
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.get(id).copied().unwrap_or(false)
    }

    /// Selected definitions in merged order.
    pub fn selected(&self) -> Vec<ExerciseDefinition> {
        self.merged()
            .into_iter()
            .filter(|d| self.is_selected(&d.id))
            .collect()
    }

    /// Selects the id published through `handoff`, if any. The handoff is
    /// consumed, so a later call does not select it again.
    pub fn accept_handoff(&mut self, handoff: &NewExerciseHandoff) -> Option<String> {
        let id = handoff.take()?;
        self.set_selected(&id, true);
        Some(id)
    }
}

/// Carries the id of a custom exercise created on another screen back to
/// the picker.
#[derive(Debug, Clone, Default)]
pub struct NewExerciseHandoff {
    slot: Arc<Mutex<Option<String>>>,
}

impl NewExerciseHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, id: impl Into<String>) {
        *self.slot.lock() = Some(id.into());
    }

    pub fn take(&self) -> Option<String> {
        self.slot.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picker() -> ExercisePicker {
        let mut picker = ExercisePicker::new();
        picker.set_custom(vec![
            CustomExercise::new("Arnold Press").with_id("a"),
            CustomExercise::new("Bulgarian Split Squat").with_id("b"),
        ]);
        picker.set_templates(vec![
            TemplateExercise::new("Calf Raise").with_id("c"),
            TemplateExercise::new("Deadlift").with_id("d"),
        ]);
        picker
    }

    fn ids(defs: &[ExerciseDefinition]) -> Vec<&str> {
        defs.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_custom_entries_first() {
        assert_eq!(ids(&picker().merged()), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_filter_is_case_insensitive_and_keeps_order() {
        let mut picker = picker();
        picker.set_query("AR");
        assert_eq!(ids(&picker.visible()), vec!["a", "b"]);

        picker.set_query("gArIaN");
        assert_eq!(ids(&picker.visible()), vec!["b"]);

        picker.set_query("");
        assert_eq!(picker.visible().len(), 4);
    }

    #[test]
    fn test_filter_matching_b_and_d() {
        let mut picker = picker();
        picker.set_custom(vec![
            CustomExercise::new("Row").with_id("a"),
            CustomExercise::new("Hip Thrust").with_id("b"),
        ]);
        picker.set_templates(vec![
            TemplateExercise::new("Plank").with_id("c"),
            TemplateExercise::new("Barbell Hip Hinge").with_id("d"),
        ]);
        picker.set_query("hip");
        assert_eq!(ids(&picker.visible()), vec!["b", "d"]);
    }

    #[test]
    fn test_duplicate_names_kept() {
        let mut picker = ExercisePicker::new();
        picker.set_custom(vec![CustomExercise::new("Squat").with_id("c1")]);
        picker.set_templates(vec![TemplateExercise::new("Squat").with_id("t1")]);
        assert_eq!(picker.merged().len(), 2);
    }

    #[test]
    fn test_selection_survives_filtering() {
        let mut picker = picker();
        assert!(picker.toggle("d"));
        picker.set_query("arnold");
        assert!(picker.is_selected("d"));
        picker.set_query("");
        assert_eq!(ids(&picker.selected()), vec!["d"]);
        assert!(!picker.toggle("d"));
        assert!(picker.selected().is_empty());
    }

    #[test]
    fn test_handoff_selects_once() {
        let mut picker = picker();
        let handoff = NewExerciseHandoff::new();
        handoff.publish("b");

        assert_eq!(picker.accept_handoff(&handoff), Some("b".to_string()));
        assert!(picker.is_selected("b"));

        picker.set_selected("b", false);
        assert_eq!(picker.accept_handoff(&handoff), None);
        assert!(!picker.is_selected("b"));
    }
}
