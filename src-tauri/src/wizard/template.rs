use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Top,
    Gown,
    Trousers,
}

impl Category {
    /// Display order used by the detail view and exports.
    pub const ALL: [Category; 3] = [Category::Top, Category::Gown, Category::Trousers];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Top => "top",
            Category::Gown => "gown",
            Category::Trousers => "trousers",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top" => Ok(Category::Top),
            "gown" => Ok(Category::Gown),
            "trousers" => Ok(Category::Trousers),
            other => Err(format!("Unknown measurement category: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "male" => Ok(Sex::Male),
            "female" => Ok(Sex::Female),
            other => Err(format!("Unknown sex: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Cm,
    Inch,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Cm => "cm",
            Unit::Inch => "inch",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cm" => Ok(Unit::Cm),
            "inch" => Ok(Unit::Inch),
            other => Err(format!("Unknown unit: {}", other)),
        }
    }
}

/// One body measurement the wizard asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeasurementField {
    pub category: Category,
    pub key: &'static str,
    pub display_name: &'static str,
    pub instructions: &'static str,
}

const fn field(
    category: Category,
    key: &'static str,
    display_name: &'static str,
    instructions: &'static str,
) -> MeasurementField {
    MeasurementField {
        category,
        key,
        display_name,
        instructions,
    }
}

/// A named, ordered list of fields. Static configuration.
#[derive(Debug, PartialEq, Eq)]
pub struct MeasurementTemplate {
    pub name: &'static str,
    pub sex: Sex,
    pub fields: &'static [MeasurementField],
}

impl MeasurementTemplate {
    pub fn for_sex(sex: Sex) -> &'static MeasurementTemplate {
        match sex {
            Sex::Male => &MALE_TEMPLATE,
            Sex::Female => &FEMALE_TEMPLATE,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, index: usize) -> Option<&'static MeasurementField> {
        self.fields.get(index)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|f| f.key == key)
    }

    pub fn last_index(&self) -> usize {
        self.fields.len().saturating_sub(1)
    }
}

use Category::{Gown, Top, Trousers};

static MALE_FIELDS: [MeasurementField; 15] = [
    field(Top, "hand_length", "Hand Length", "Measure from shoulder joint to wrist bone."),
    field(Top, "hand_round", "Hand Round", "Wrap tape around widest part of upper arm."),
    field(Top, "wrist_round", "Wrist Round", "Measure around the wrist at its narrowest point."),
    field(Top, "chest", "Chest", "Measure around fullest part of chest."),
    field(Top, "shoulder", "Shoulder", "Measure from one shoulder bone to the other."),
    field(Top, "neck", "Neck Round", "Measure around base of neck."),
    field(Top, "stomach", "Stomach", "Measure around fullest part of stomach."),
    field(Top, "top_length", "Top Length", "Measure from shoulder down to desired length."),
    field(Trousers, "trouser_length", "Trouser Length", "Measure from waist to ankle."),
    field(Trousers, "lap", "Lap (Thigh)", "Measure around widest part of thigh."),
    field(Trousers, "waist", "Waist", "Measure around natural waistline."),
    field(Trousers, "back_foot", "Back Foot", "Measure from waist (back) to ankle."),
    field(Trousers, "foot_round", "Foot Round", "Measure around ankle opening."),
    field(Trousers, "knee_round", "Knee Round", "Measure around knee while standing."),
    field(Trousers, "hips", "Hips", "Measure around fullest part of hips."),
];

static FEMALE_FIELDS: [MeasurementField; 18] = [
    field(Top, "hand_length", "Hand Length", "Measure from shoulder joint to wrist bone. Arm relaxed, not bent."),
    field(Top, "hand_round", "Hand Round", "Wrap tape around widest part of upper arm. Snug but not tight."),
    field(Top, "wrist_round", "Wrist Round", "Measure around the wrist at its narrowest point."),
    field(Top, "chest", "Chest", "Measure around fullest part of chest, under arms, tape level."),
    field(Top, "shoulder", "Shoulder", "Measure from one shoulder bone to the other across back."),
    field(Top, "neck", "Neck Round", "Measure around base of neck. Leave one finger space."),
    field(Top, "stomach", "Stomach", "Measure around fullest part of stomach. Stand naturally."),
    field(Top, "top_length", "Top Length", "Measure from shoulder down to desired top length."),
    field(Gown, "gown_length", "Gown Length", "Measure from shoulder to desired gown length."),
    field(Gown, "gown_shoulder", "Gown Shoulder", "Measure shoulder to shoulder across back."),
    field(Gown, "gown_chest", "Gown Chest", "Measure around fullest part of chest."),
    field(Trousers, "trouser_length", "Trouser Length", "Measure from waist to ankle. Stand straight."),
    field(Trousers, "lap", "Lap (Thigh)", "Measure around widest part of thigh."),
    field(Trousers, "waist", "Waist", "Measure around natural waistline. No tightening."),
    field(Trousers, "back_foot", "Back Foot", "Measure from waist (back) down to ankle."),
    field(Trousers, "foot_round", "Foot Round", "Measure around ankle opening."),
    field(Trousers, "knee_round", "Knee Round", "Measure around knee while standing."),
    field(Trousers, "hips", "Hips", "Measure around fullest part of hips/buttocks."),
];

pub static MALE_TEMPLATE: MeasurementTemplate = MeasurementTemplate {
    name: "Male",
    sex: Sex::Male,
    fields: &MALE_FIELDS,
};

pub static FEMALE_TEMPLATE: MeasurementTemplate = MeasurementTemplate {
    name: "Female",
    sex: Sex::Female,
    fields: &FEMALE_FIELDS,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_templates_non_empty_with_unique_keys() {
        for sex in [Sex::Male, Sex::Female] {
            let template = MeasurementTemplate::for_sex(sex);
            assert!(!template.is_empty(), "{} template is empty", template.name);

            let keys: HashSet<&str> = template.fields.iter().map(|f| f.key).collect();
            assert_eq!(
                keys.len(),
                template.len(),
                "{} template has duplicate keys",
                template.name
            );
        }
    }

    #[test]
    fn test_female_is_superset_with_gown() {
        let male = MeasurementTemplate::for_sex(Sex::Male);
        let female = MeasurementTemplate::for_sex(Sex::Female);

        for f in male.fields {
            assert!(female.contains_key(f.key), "female template lacks {}", f.key);
        }
        assert!(female.fields.iter().any(|f| f.category == Category::Gown));
        assert!(!male.fields.iter().any(|f| f.category == Category::Gown));
        assert_eq!(male.len(), 15);
        assert_eq!(female.len(), 18);
    }

    #[test]
    fn test_fields_grouped_in_category_order() {
        for sex in [Sex::Male, Sex::Female] {
            let template = MeasurementTemplate::for_sex(sex);
            let categories: Vec<Category> = template.fields.iter().map(|f| f.category).collect();
            let mut sorted = categories.clone();
            sorted.sort();
            assert_eq!(categories, sorted);
        }
    }

    #[test]
    fn test_enum_string_round_trip() {
        assert_eq!("female".parse::<Sex>().unwrap(), Sex::Female);
        assert_eq!("inch".parse::<Unit>().unwrap(), Unit::Inch);
        assert_eq!("gown".parse::<Category>().unwrap(), Category::Gown);
        assert!("".parse::<Sex>().is_err());
        assert!("mm".parse::<Unit>().is_err());
        assert_eq!(serde_json::to_string(&Category::Trousers).unwrap(), "\"trousers\"");
    }
}
