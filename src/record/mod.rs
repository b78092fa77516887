mod codec;
mod date_key;
mod types;

pub use codec::{diff, merge_value, normalize};
pub use date_key::DateKey;
pub use types::{
    AlcoholEntry, DailyRecord, MealEntry, MealSlot, Meals, Overtime, OvertimeKind, WeightCondition,
    WeightContext, WeightEntry, WeightSlot, Weights, ALCOHOL_SLOTS, DIARY_MAX_CHARS, MENU_MAX_CHARS,
    MENU_SLOTS, PHOTO_SLOTS, WEIGHT_NOTE_MAX_CHARS,
};
