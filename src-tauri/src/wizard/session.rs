use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::template::{Category, MeasurementField, MeasurementTemplate, Unit};
use super::validation::{parse_measurement, validate_intro, IntroDetails, IntroForm};
use crate::error::{CkStyleError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Intro,
    Measuring,
    Review,
    Complete,
}

/// A collected entry. `Skipped` is stored as `0` in the record store; the
/// wizard never accepts a non-positive measurement, so the two stay distinct
/// when read back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Measured(f64),
    Skipped,
}

impl FieldValue {
    pub const SKIPPED_VALUE: f64 = 0.0;

    pub fn stored_value(&self) -> f64 {
        match self {
            FieldValue::Measured(v) => *v,
            FieldValue::Skipped => Self::SKIPPED_VALUE,
        }
    }

    /// Interpret a persisted value.
    pub fn from_stored(value: f64) -> Self {
        if value > 0.0 {
            FieldValue::Measured(value)
        } else {
            FieldValue::Skipped
        }
    }

    pub fn display(&self, unit: Unit) -> String {
        match self {
            FieldValue::Measured(v) => format!("{} {}", v, unit),
            FieldValue::Skipped => "Skipped".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub percent: f64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub index: usize,
    pub total: usize,
    pub category: Category,
    pub key: String,
    pub display_name: String,
    pub instructions: String,
    /// Value to prefill the input with; empty when nothing was entered.
    pub input: String,
    pub is_last: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewRow {
    pub index: usize,
    pub category: Category,
    pub key: String,
    pub display_name: String,
    pub value: Option<FieldValue>,
    pub display: String,
}

/// Serializable snapshot the UI renders from.
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub stage: Stage,
    pub intro: IntroForm,
    pub step: Option<StepView>,
    pub review: Vec<ReviewRow>,
    pub progress: Progress,
    pub saved_record_id: Option<String>,
}

/// In-memory state of one pass through the measurement wizard.
///
/// Linear flow `intro -> measuring -> review -> complete`, with explicit
/// backward moves. Every transition either succeeds or returns an error and
/// leaves the session untouched.
#[derive(Debug, Clone)]
pub struct WizardSession {
    stage: Stage,
    current_field_index: usize,
    intro: Option<IntroDetails>,
    template: Option<&'static MeasurementTemplate>,
    collected: BTreeMap<String, FieldValue>,
    saved_record_id: Option<String>,
}

impl Default for WizardSession {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardSession {
    pub fn new() -> Self {
        Self {
            stage: Stage::Intro,
            current_field_index: 0,
            intro: None,
            template: None,
            collected: BTreeMap::new(),
            saved_record_id: None,
        }
    }

    /// Rebuild a session at the review stage, e.g. from a stashed draft.
    /// Entries for keys outside the template are dropped; missing fields
    /// count as skipped.
    pub fn restore_for_review(
        intro: IntroDetails,
        values: impl IntoIterator<Item = (String, FieldValue)>,
    ) -> Self {
        let template = MeasurementTemplate::for_sex(intro.sex);
        let mut collected: BTreeMap<String, FieldValue> = values
            .into_iter()
            .filter(|(key, _)| template.contains_key(key))
            .collect();
        for field in template.fields {
            collected
                .entry(field.key.to_string())
                .or_insert(FieldValue::Skipped);
        }
        Self {
            stage: Stage::Review,
            current_field_index: template.last_index(),
            intro: Some(intro),
            template: Some(template),
            collected,
            saved_record_id: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn current_field_index(&self) -> usize {
        self.current_field_index
    }

    pub fn intro(&self) -> Option<&IntroDetails> {
        self.intro.as_ref()
    }

    pub fn template(&self) -> Option<&'static MeasurementTemplate> {
        self.template
    }

    pub fn collected(&self) -> &BTreeMap<String, FieldValue> {
        &self.collected
    }

    pub fn value(&self, key: &str) -> Option<FieldValue> {
        self.collected.get(key).copied()
    }

    pub fn saved_record_id(&self) -> Option<&str> {
        self.saved_record_id.as_deref()
    }

    pub fn current_field(&self) -> Option<&'static MeasurementField> {
        match self.stage {
            Stage::Measuring => self.template?.field(self.current_field_index),
            _ => None,
        }
    }

    /// Text to show in the input for the current field.
    pub fn current_input(&self) -> String {
        match self.current_field().and_then(|f| self.value(f.key)) {
            Some(FieldValue::Measured(v)) => v.to_string(),
            _ => String::new(),
        }
    }

    /// True once every template field has an entry.
    pub fn is_fully_collected(&self) -> bool {
        self.template
            .map(|t| t.fields.iter().all(|f| self.collected.contains_key(f.key)))
            .unwrap_or(false)
    }

    pub fn submit_intro(&mut self, form: &IntroForm) -> Result<()> {
        self.expect_stage(Stage::Intro, "start measuring")?;
        let details = validate_intro(form)?;

        let template = MeasurementTemplate::for_sex(details.sex);
        self.collected.retain(|key, _| template.contains_key(key));
        self.template = Some(template);
        self.intro = Some(details);
        self.stage = Stage::Measuring;
        self.current_field_index = 0;
        info!(
            "Wizard started with {} template ({} fields)",
            template.name,
            template.len()
        );
        Ok(())
    }

    pub fn advance(&mut self, input: &str) -> Result<()> {
        self.expect_stage(Stage::Measuring, "go to the next measurement")?;
        let value = parse_measurement(input)?;
        self.record_current(FieldValue::Measured(value))
    }

    pub fn skip(&mut self) -> Result<()> {
        self.expect_stage(Stage::Measuring, "skip a measurement")?;
        self.record_current(FieldValue::Skipped)
    }

    pub fn back(&mut self) -> Result<()> {
        match self.stage {
            Stage::Measuring if self.current_field_index > 0 => {
                self.current_field_index -= 1;
            }
            Stage::Measuring => {
                self.stage = Stage::Intro;
            }
            Stage::Review => {
                self.stage = Stage::Measuring;
                self.current_field_index = self.template_or_err()?.last_index();
            }
            Stage::Intro | Stage::Complete => {
                return Err(invalid_transition(self.stage, "go back"));
            }
        }
        Ok(())
    }

    pub fn edit(&mut self, index: usize) -> Result<()> {
        self.expect_stage(Stage::Review, "edit a measurement")?;
        let template = self.template_or_err()?;
        if index >= template.len() {
            return Err(CkStyleError::Validation(format!(
                "No measurement at position {}",
                index + 1
            )));
        }
        self.stage = Stage::Measuring;
        self.current_field_index = index;
        Ok(())
    }

    /// Called by the persistence layer after both writes succeeded.
    pub(crate) fn mark_complete(&mut self, record_id: String) -> Result<()> {
        self.expect_stage(Stage::Review, "save")?;
        self.stage = Stage::Complete;
        self.saved_record_id = Some(record_id);
        Ok(())
    }

    pub fn progress(&self) -> Progress {
        match self.stage {
            Stage::Intro => Progress {
                percent: 0.0,
                label: "Getting Started".to_string(),
            },
            Stage::Measuring => {
                let total = self.template.map(|t| t.len()).unwrap_or(1).max(1);
                let current = self.current_field_index + 1;
                Progress {
                    percent: current as f64 / total as f64 * 100.0,
                    label: format!("Step {} of {}", current, total),
                }
            }
            Stage::Review => Progress {
                percent: 100.0,
                label: "Final Review".to_string(),
            },
            Stage::Complete => Progress {
                percent: 100.0,
                label: "Saved".to_string(),
            },
        }
    }

    pub fn review_rows(&self) -> Vec<ReviewRow> {
        let (Some(template), Some(intro)) = (self.template, self.intro.as_ref()) else {
            return Vec::new();
        };
        template
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let value = self.value(field.key);
                ReviewRow {
                    index,
                    category: field.category,
                    key: field.key.to_string(),
                    display_name: field.display_name.to_string(),
                    value,
                    display: value
                        .unwrap_or(FieldValue::Skipped)
                        .display(intro.unit),
                }
            })
            .collect()
    }

    pub fn view(&self) -> WizardView {
        let step = self.current_field().map(|field| {
            let total = self.template.map(|t| t.len()).unwrap_or(0);
            StepView {
                index: self.current_field_index,
                total,
                category: field.category,
                key: field.key.to_string(),
                display_name: field.display_name.to_string(),
                instructions: field.instructions.to_string(),
                input: self.current_input(),
                is_last: self.current_field_index + 1 == total,
            }
        });
        let review = match self.stage {
            Stage::Review | Stage::Complete => self.review_rows(),
            _ => Vec::new(),
        };
        WizardView {
            stage: self.stage,
            intro: self.intro.as_ref().map(IntroForm::from).unwrap_or_else(|| IntroForm {
                unit: Unit::default().to_string(),
                ..IntroForm::default()
            }),
            step,
            review,
            progress: self.progress(),
            saved_record_id: self.saved_record_id.clone(),
        }
    }

    fn record_current(&mut self, value: FieldValue) -> Result<()> {
        let template = self.template_or_err()?;
        let field = template
            .field(self.current_field_index)
            .ok_or_else(|| CkStyleError::Validation("No current measurement".to_string()))?;
        self.collected.insert(field.key.to_string(), value);

        if self.current_field_index < template.last_index() {
            self.current_field_index += 1;
        } else {
            self.stage = Stage::Review;
        }
        Ok(())
    }

    fn template_or_err(&self) -> Result<&'static MeasurementTemplate> {
        self.template
            .ok_or_else(|| CkStyleError::Validation("No measurement template selected".to_string()))
    }

    fn expect_stage(&self, expected: Stage, action: &str) -> Result<()> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(invalid_transition(self.stage, action))
        }
    }
}

fn invalid_transition(stage: Stage, action: &str) -> CkStyleError {
    CkStyleError::Validation(format!("Cannot {} from the {:?} step", action, stage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::template::Sex;

    fn intro(sex: &str) -> IntroForm {
        IntroForm {
            subject_name: "Mr. John".to_string(),
            profile_label: "Wedding Suit".to_string(),
            sex: sex.to_string(),
            unit: "cm".to_string(),
        }
    }

    fn started(sex: &str) -> WizardSession {
        let mut wizard = WizardSession::new();
        wizard.submit_intro(&intro(sex)).unwrap();
        wizard
    }

    #[test]
    fn test_intro_selects_template() {
        let wizard = started("female");
        assert_eq!(wizard.stage(), Stage::Measuring);
        assert_eq!(wizard.current_field_index(), 0);
        assert_eq!(wizard.template().unwrap().sex, Sex::Female);
        assert_eq!(wizard.current_field().unwrap().key, "hand_length");
        assert_eq!(wizard.progress().label, "Step 1 of 18");
    }

    #[test]
    fn test_incomplete_intro_keeps_stage() {
        let mut wizard = WizardSession::new();
        let mut form = intro("male");
        form.profile_label.clear();
        assert!(wizard.submit_intro(&form).is_err());
        assert_eq!(wizard.stage(), Stage::Intro);
        assert!(wizard.template().is_none());
    }

    #[test]
    fn test_rejects_non_positive_without_moving() {
        let mut wizard = started("male");
        for bad in ["0", "-1", "abc", ""] {
            assert!(wizard.advance(bad).is_err());
            assert_eq!(wizard.stage(), Stage::Measuring);
            assert_eq!(wizard.current_field_index(), 0);
        }
        assert!(wizard.collected().is_empty());
    }

    #[test]
    fn test_back_then_next_restores_value() {
        let mut wizard = started("male");
        wizard.advance("42.5").unwrap();
        assert_eq!(wizard.current_field_index(), 1);

        wizard.back().unwrap();
        assert_eq!(wizard.current_field_index(), 0);
        assert_eq!(wizard.current_input(), "42.5");

        let input = wizard.current_input();
        wizard.advance(&input).unwrap();
        assert_eq!(wizard.value("hand_length"), Some(FieldValue::Measured(42.5)));
    }

    #[test]
    fn test_back_from_first_field_returns_to_intro_keeping_data() {
        let mut wizard = started("male");
        wizard.advance("10").unwrap();
        wizard.back().unwrap();
        wizard.back().unwrap();
        assert_eq!(wizard.stage(), Stage::Intro);
        assert!(wizard.template().is_some());
        assert_eq!(wizard.value("hand_length"), Some(FieldValue::Measured(10.0)));
        assert_eq!(wizard.view().intro.subject_name, "Mr. John");
    }

    #[test]
    fn test_changing_sex_drops_foreign_keys() {
        let mut wizard = started("female");
        for _ in 0..9 {
            wizard.advance("10").unwrap();
        }
        assert!(wizard.value("gown_length").is_some());

        while wizard.stage() != Stage::Intro {
            wizard.back().unwrap();
        }
        wizard.submit_intro(&intro("male")).unwrap();
        assert!(wizard.value("gown_length").is_none());
        assert_eq!(wizard.value("chest"), Some(FieldValue::Measured(10.0)));
        let template = wizard.template().unwrap();
        assert!(wizard.collected().keys().all(|k| template.contains_key(k)));
    }

    #[test]
    fn test_skip_last_field_goes_to_review() {
        let mut wizard = started("male");
        for _ in 0..14 {
            wizard.advance("10").unwrap();
        }
        assert_eq!(wizard.current_field().unwrap().key, "hips");
        wizard.skip().unwrap();

        assert_eq!(wizard.stage(), Stage::Review);
        assert_eq!(wizard.value("hips"), Some(FieldValue::Skipped));
        assert_eq!(FieldValue::Skipped.stored_value(), 0.0);
        assert!(wizard.is_fully_collected());

        let rows = wizard.review_rows();
        assert_eq!(rows.len(), 15);
        assert_eq!(rows.last().unwrap().display, "Skipped");
        assert_eq!(rows[0].display, "10 cm");
        assert_eq!(wizard.progress().percent, 100.0);
    }

    #[test]
    fn test_review_navigation() {
        let mut wizard = started("male");
        for _ in 0..15 {
            wizard.skip().unwrap();
        }
        assert_eq!(wizard.stage(), Stage::Review);

        wizard.edit(3).unwrap();
        assert_eq!(wizard.stage(), Stage::Measuring);
        assert_eq!(wizard.current_field().unwrap().key, "chest");
        assert_eq!(wizard.current_input(), "");

        for _ in 3..15 {
            wizard.advance("20").unwrap();
        }
        assert_eq!(wizard.stage(), Stage::Review);

        wizard.back().unwrap();
        assert_eq!(wizard.stage(), Stage::Measuring);
        assert_eq!(wizard.current_field_index(), 14);
    }

    #[test]
    fn test_edit_out_of_range_is_rejected() {
        let mut wizard = started("male");
        for _ in 0..15 {
            wizard.skip().unwrap();
        }
        assert!(wizard.edit(15).is_err());
        assert_eq!(wizard.stage(), Stage::Review);
    }

    #[test]
    fn test_invalid_transitions() {
        let mut wizard = WizardSession::new();
        assert!(wizard.advance("10").is_err());
        assert!(wizard.skip().is_err());
        assert!(wizard.back().is_err());
        assert!(wizard.edit(0).is_err());
        assert!(wizard.mark_complete("id".to_string()).is_err());
        assert_eq!(wizard.stage(), Stage::Intro);
    }

    #[test]
    fn test_restore_for_review_fills_missing_and_drops_unknown() {
        let details = validate_intro(&intro("male")).unwrap();
        let wizard = WizardSession::restore_for_review(
            details,
            vec![
                ("chest".to_string(), FieldValue::Measured(90.0)),
                ("gown_length".to_string(), FieldValue::Measured(120.0)),
            ],
        );
        assert_eq!(wizard.stage(), Stage::Review);
        assert!(wizard.is_fully_collected());
        assert_eq!(wizard.collected().len(), 15);
        assert!(wizard.value("gown_length").is_none());
        assert_eq!(wizard.value("waist"), Some(FieldValue::Skipped));
    }

    #[test]
    fn test_field_value_stored_round_trip() {
        assert_eq!(FieldValue::from_stored(0.0), FieldValue::Skipped);
        assert_eq!(FieldValue::from_stored(12.0), FieldValue::Measured(12.0));
        assert_eq!(FieldValue::Measured(12.0).display(Unit::Inch), "12 inch");
    }
}
