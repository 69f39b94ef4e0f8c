pub mod persist;
pub mod session;
pub mod template;
pub mod validation;

pub use persist::{build_items, save_measurements};
pub use session::{FieldValue, Progress, ReviewRow, Stage, StepView, WizardSession, WizardView};
pub use template::{Category, MeasurementField, MeasurementTemplate, Sex, Unit};
pub use validation::{IntroDetails, IntroForm};
