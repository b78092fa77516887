use serde::{Deserialize, Serialize};

pub const MENU_SLOTS: usize = 5;
pub const ALCOHOL_SLOTS: usize = 5;
pub const PHOTO_SLOTS: usize = 2;

pub const MENU_MAX_CHARS: usize = 20;
pub const WEIGHT_NOTE_MAX_CHARS: usize = 16;
pub const DIARY_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightSlot {
    Morning,
    Evening,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Morning,
    Lunch,
    Dinner,
}

/// Context dropdown next to a weight entry (wire field `option1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeightContext {
    #[default]
    #[serde(rename = "")]
    Empty,
    AfterWaking,
    AfterMeal,
}

/// Condition dropdown next to a weight entry (wire field `option2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeightCondition {
    #[default]
    #[serde(rename = "")]
    Empty,
    AfterUrination,
    AfterDefecation,
}

/// One weighing. `value` stays the string the user typed (decimal kg);
/// consumers parse it leniently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    #[serde(default)]
    pub value: String,
    /// `HHMM` clock time the weight was taken.
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub option1: WeightContext,
    #[serde(default)]
    pub option2: WeightCondition,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    #[serde(default)]
    pub morning: Option<WeightEntry>,
    #[serde(default)]
    pub evening: Option<WeightEntry>,
    #[serde(default)]
    pub other: Option<WeightEntry>,
}

impl Weights {
    pub fn slot(&self, slot: WeightSlot) -> &Option<WeightEntry> {
        match slot {
            WeightSlot::Morning => &self.morning,
            WeightSlot::Evening => &self.evening,
            WeightSlot::Other => &self.other,
        }
    }

    pub fn slot_mut(&mut self, slot: WeightSlot) -> &mut Option<WeightEntry> {
        match slot {
            WeightSlot::Morning => &mut self.morning,
            WeightSlot::Evening => &mut self.evening,
            WeightSlot::Other => &mut self.other,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AlcoholEntry {
    /// Percent alcohol by volume, clamped to 0..=100.
    #[serde(default)]
    pub degree: f64,
    /// Milliliters consumed, never negative.
    #[serde(default)]
    pub amount: f64,
}

impl AlcoholEntry {
    /// Builds an entry from raw form input, coercing malformed numbers to 0
    /// and clamping into range. Never rejects.
    pub fn from_input(degree: &str, amount: &str) -> Self {
        Self {
            degree: coerce_input(degree).clamp(0.0, 100.0),
            amount: coerce_input(amount).max(0.0),
        }
    }

    pub fn pure_alcohol_ml(&self) -> f64 {
        self.degree / 100.0 * self.amount
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    #[serde(default)]
    pub menus: [String; MENU_SLOTS],
    #[serde(default)]
    pub alcohols: [AlcoholEntry; ALCOHOL_SLOTS],
    /// Inline-encoded photo payloads, `None` for empty slots.
    #[serde(default)]
    pub photos: [Option<String>; PHOTO_SLOTS],
}

impl MealEntry {
    pub fn set_menu(&mut self, index: usize, text: &str) {
        if let Some(slot) = self.menus.get_mut(index) {
            *slot = truncate_chars(text, MENU_MAX_CHARS);
        }
    }

    pub fn total_alcohol_ml(&self) -> f64 {
        self.alcohols.iter().map(AlcoholEntry::pure_alcohol_ml).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meals {
    #[serde(default)]
    pub morning: MealEntry,
    #[serde(default)]
    pub lunch: MealEntry,
    #[serde(default)]
    pub dinner: MealEntry,
}

impl Meals {
    pub fn slot(&self, slot: MealSlot) -> &MealEntry {
        match slot {
            MealSlot::Morning => &self.morning,
            MealSlot::Lunch => &self.lunch,
            MealSlot::Dinner => &self.dinner,
        }
    }

    pub fn slot_mut(&mut self, slot: MealSlot) -> &mut MealEntry {
        match slot {
            MealSlot::Morning => &mut self.morning,
            MealSlot::Lunch => &mut self.lunch,
            MealSlot::Dinner => &mut self.dinner,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OvertimeKind {
    #[default]
    #[serde(rename = "0h")]
    ZeroHours,
    #[serde(rename = "2h")]
    TwoHours,
    #[serde(rename = "3h")]
    ThreeHours,
    #[serde(rename = "holiday")]
    Holiday,
    #[serde(rename = "custom")]
    Custom,
}

impl OvertimeKind {
    /// Hours implied by the kind, `None` for `Custom` (independently entered).
    pub fn derived_hours(self) -> Option<f64> {
        match self {
            OvertimeKind::ZeroHours | OvertimeKind::Holiday => Some(0.0),
            OvertimeKind::TwoHours => Some(2.0),
            OvertimeKind::ThreeHours => Some(3.0),
            OvertimeKind::Custom => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Overtime {
    #[serde(rename = "type", default)]
    pub kind: OvertimeKind,
    #[serde(default)]
    pub hours: f64,
}

impl Overtime {
    /// Switching away from `Custom` resets the hours to the kind's derived
    /// value; switching to `Custom` keeps whatever was entered so far.
    pub fn set_kind(&mut self, kind: OvertimeKind) {
        self.kind = kind;
        if let Some(hours) = kind.derived_hours() {
            self.hours = hours;
        }
    }

    /// Freely editable only while the kind is `Custom`; ignored otherwise.
    pub fn set_custom_hours(&mut self, raw: &str) {
        if self.kind == OvertimeKind::Custom {
            self.hours = coerce_input(raw).max(0.0);
        }
    }
}

/// One calendar day's record. The slot shape is fixed: every named slot and
/// every array position exists at all times, only contents are empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    #[serde(default)]
    pub weights: Weights,
    #[serde(default)]
    pub meals: Meals,
    #[serde(default)]
    pub overtime: Overtime,
    #[serde(default)]
    pub diary: String,
}

impl DailyRecord {
    /// Past the 200-character limit the diary is truncated, never rejected.
    pub fn set_diary(&mut self, text: &str) {
        self.diary = truncate_chars(text, DIARY_MAX_CHARS);
    }
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => s[..cut].to_string(),
        None => s.to_string(),
    }
}

pub(crate) fn coerce_input(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_has_fixed_arities() {
        let rec = DailyRecord::default();
        for slot in [MealSlot::Morning, MealSlot::Lunch, MealSlot::Dinner] {
            let meal = rec.meals.slot(slot);
            assert_eq!(meal.menus.len(), MENU_SLOTS);
            assert_eq!(meal.alcohols.len(), ALCOHOL_SLOTS);
            assert_eq!(meal.photos.len(), PHOTO_SLOTS);
            assert!(meal.menus.iter().all(String::is_empty));
            assert!(meal.photos.iter().all(Option::is_none));
        }
        assert!(rec.weights.morning.is_none());
        assert_eq!(rec.overtime.kind, OvertimeKind::ZeroHours);
        assert_eq!(rec.overtime.hours, 0.0);
        assert!(rec.diary.is_empty());
    }

    #[test]
    fn alcohol_input_is_coerced_and_clamped() {
        let entry = AlcoholEntry::from_input("abc", "-50");
        assert_eq!(entry.degree, 0.0);
        assert_eq!(entry.amount, 0.0);

        let entry = AlcoholEntry::from_input("150", "500");
        assert_eq!(entry.degree, 100.0);
        assert_eq!(entry.amount, 500.0);
    }

    #[test]
    fn total_alcohol_sums_pure_volume() {
        let mut meal = MealEntry::default();
        meal.alcohols[0] = AlcoholEntry::from_input("5", "350");
        meal.alcohols[1] = AlcoholEntry::from_input("12", "125");
        assert!((meal.total_alcohol_ml() - (17.5 + 15.0)).abs() < 1e-9);
    }

    #[test]
    fn switching_overtime_kind_resets_derived_hours() {
        let mut ot = Overtime::default();
        ot.set_kind(OvertimeKind::Custom);
        ot.set_custom_hours("1.75");
        assert_eq!(ot.hours, 1.75);

        ot.set_kind(OvertimeKind::TwoHours);
        assert_eq!(ot.hours, 2.0);

        ot.set_kind(OvertimeKind::Holiday);
        assert_eq!(ot.hours, 0.0);

        // Back to custom: previous derived value is kept until re-entered.
        ot.set_kind(OvertimeKind::Custom);
        assert_eq!(ot.hours, 0.0);
    }

    #[test]
    fn custom_hours_ignored_outside_custom_kind() {
        let mut ot = Overtime::default();
        ot.set_custom_hours("4.5");
        assert_eq!(ot.hours, 0.0);
    }

    #[test]
    fn diary_truncates_at_char_boundary() {
        let mut rec = DailyRecord::default();
        let long: String = "あ".repeat(250);
        rec.set_diary(&long);
        assert_eq!(rec.diary.chars().count(), DIARY_MAX_CHARS);
    }

    #[test]
    fn menu_text_truncates_to_limit() {
        let mut meal = MealEntry::default();
        meal.set_menu(0, &"x".repeat(40));
        assert_eq!(meal.menus[0].len(), MENU_MAX_CHARS);
        meal.set_menu(99, "out of range is ignored");
        assert_eq!(meal.menus.iter().filter(|m| !m.is_empty()).count(), 1);
    }
}
