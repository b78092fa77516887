use anyhow::Context;
use serde_json::{Map, Value};

use super::types::{
    truncate_chars, AlcoholEntry, DailyRecord, MealEntry, Overtime, OvertimeKind, WeightEntry,
    ALCOHOL_SLOTS, DIARY_MAX_CHARS, MENU_MAX_CHARS, MENU_SLOTS, PHOTO_SLOTS, WEIGHT_NOTE_MAX_CHARS,
};

/// Rebuilds a well-formed [`DailyRecord`] from a partial or legacy-shaped
/// document, backfilling missing slots and array elements from the default
/// shape without discarding present values. Idempotent.
pub fn normalize(raw: &Value) -> DailyRecord {
    let mut rec = DailyRecord::default();
    let Some(obj) = raw.as_object() else {
        return rec;
    };

    if let Some(weights) = obj.get("weights").and_then(Value::as_object) {
        rec.weights.morning = normalize_weight(weights.get("morning"));
        rec.weights.evening = normalize_weight(weights.get("evening"));
        rec.weights.other = normalize_weight(weights.get("other"));
    }

    if let Some(meals) = obj.get("meals").and_then(Value::as_object) {
        rec.meals.morning = normalize_meal(meals.get("morning"));
        rec.meals.lunch = normalize_meal(meals.get("lunch"));
        rec.meals.dinner = normalize_meal(meals.get("dinner"));
    }

    if let Some(ot) = obj.get("overtime").and_then(Value::as_object) {
        let kind: OvertimeKind = ot
            .get("type")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        let hours = match kind.derived_hours() {
            Some(derived) => derived,
            None => coerce_number(ot.get("hours")).max(0.0),
        };
        rec.overtime = Overtime { kind, hours };
    }

    if let Some(diary) = obj.get("diary").and_then(Value::as_str) {
        rec.diary = truncate_chars(diary, DIARY_MAX_CHARS);
    }

    rec
}

fn normalize_weight(v: Option<&Value>) -> Option<WeightEntry> {
    let obj = v?.as_object()?;
    Some(WeightEntry {
        value: string_or_number(obj.get("value")),
        time: obj
            .get("time")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        option1: obj
            .get("option1")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default(),
        option2: obj
            .get("option2")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default(),
        note: truncate_chars(
            obj.get("note").and_then(Value::as_str).unwrap_or_default(),
            WEIGHT_NOTE_MAX_CHARS,
        ),
    })
}

fn normalize_meal(v: Option<&Value>) -> MealEntry {
    let mut meal = MealEntry::default();
    let Some(obj) = v.and_then(Value::as_object) else {
        return meal;
    };

    if let Some(menus) = obj.get("menus").and_then(Value::as_array) {
        for i in 0..MENU_SLOTS {
            if let Some(text) = menus.get(i).and_then(Value::as_str) {
                meal.menus[i] = truncate_chars(text, MENU_MAX_CHARS);
            }
        }
    }

    if let Some(alcohols) = obj.get("alcohols").and_then(Value::as_array) {
        for i in 0..ALCOHOL_SLOTS {
            if let Some(entry) = alcohols.get(i).and_then(Value::as_object) {
                meal.alcohols[i] = AlcoholEntry {
                    degree: coerce_number(entry.get("degree")).clamp(0.0, 100.0),
                    amount: coerce_number(entry.get("amount")).max(0.0),
                };
            }
        }
    }

    if let Some(photos) = obj.get("photos").and_then(Value::as_array) {
        for i in 0..PHOTO_SLOTS {
            meal.photos[i] = photos
                .get(i)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
        }
    }

    meal
}

/// Legacy documents stored some numerics as strings; either form is accepted
/// and anything malformed collapses to 0.
fn coerce_number(v: Option<&Value>) -> f64 {
    match v {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

fn string_or_number(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// The partial document containing exactly the fields whose values differ
/// between `base` and `cur`. Recursive on maps; arrays and scalars are
/// written wholesale. `diff(x, x)` is the empty object, and merging the
/// result into `base` yields `cur`.
pub fn diff(base: &DailyRecord, cur: &DailyRecord) -> anyhow::Result<Value> {
    let base = serde_json::to_value(base).context("encode merge base")?;
    let cur = serde_json::to_value(cur).context("encode draft")?;
    Ok(diff_value(&base, &cur).unwrap_or_else(|| Value::Object(Map::new())))
}

fn diff_value(base: &Value, cur: &Value) -> Option<Value> {
    if base == cur {
        return None;
    }
    match (base, cur) {
        (Value::Object(b), Value::Object(c)) => {
            let mut out = Map::new();
            for (key, cv) in c {
                match b.get(key) {
                    Some(bv) => {
                        if let Some(changed) = diff_value(bv, cv) {
                            out.insert(key.clone(), changed);
                        }
                    }
                    None => {
                        out.insert(key.clone(), cv.clone());
                    }
                }
            }
            Some(Value::Object(out))
        }
        _ => Some(cur.clone()),
    }
}

/// Applies `patch` to `target` the way the remote applies a merge-write:
/// maps merge recursively, everything else is replaced.
pub fn merge_value(target: &mut Value, patch: &Value) {
    if let (Some(t), Some(p)) = (target.as_object_mut(), patch.as_object()) {
        for (key, pv) in p {
            match t.get_mut(key) {
                Some(tv) if tv.is_object() && pv.is_object() => merge_value(tv, pv),
                _ => {
                    t.insert(key.clone(), pv.clone());
                }
            }
        }
        return;
    }
    *target = patch.clone();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn renormalize(rec: &DailyRecord) -> DailyRecord {
        normalize(&serde_json::to_value(rec).expect("record encodes"))
    }

    #[test]
    fn normalize_of_empty_document_is_default() {
        assert_eq!(normalize(&json!({})), DailyRecord::default());
        assert_eq!(normalize(&Value::Null), DailyRecord::default());
    }

    #[test]
    fn normalize_backfills_missing_slots() {
        let legacy = json!({
            "weights": { "morning": { "value": "64.8" } },
            "meals": { "lunch": { "menus": ["ramen"] } },
            "diary": "short day"
        });
        let rec = normalize(&legacy);

        let morning = rec.weights.morning.as_ref().expect("slot kept");
        assert_eq!(morning.value, "64.8");
        assert_eq!(morning.time, "");
        assert!(rec.weights.evening.is_none());

        assert_eq!(rec.meals.lunch.menus[0], "ramen");
        assert_eq!(rec.meals.lunch.menus[1], "");
        assert_eq!(rec.meals.lunch.alcohols.len(), 5);
        assert_eq!(rec.meals.morning, MealEntry::default());
        assert_eq!(rec.diary, "short day");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            json!({}),
            json!({ "weights": { "morning": { "value": 65.2, "note": "after run, long note over limit" } } }),
            json!({ "meals": { "dinner": {
                "menus": ["a", "b", "c", "d", "e", "overflow ignored"],
                "alcohols": [{ "degree": "200", "amount": "-3" }],
                "photos": ["data:image/jpeg;base64,xxxx", "", null]
            } } }),
            json!({ "overtime": { "type": "custom", "hours": "1.5" }, "diary": 42 }),
            json!({ "overtime": { "type": "3h", "hours": 9.0 } }),
        ];
        for raw in samples {
            let once = normalize(&raw);
            assert_eq!(renormalize(&once), once, "not idempotent for {raw}");
        }
    }

    #[test]
    fn normalize_coerces_numeric_invariants() {
        let raw = json!({ "meals": { "morning": {
            "alcohols": [
                { "degree": 150, "amount": 200 },
                { "degree": -5, "amount": -1 },
                { "degree": "abc", "amount": "12.5" }
            ]
        } } });
        let rec = normalize(&raw);
        let alcohols = &rec.meals.morning.alcohols;
        assert_eq!((alcohols[0].degree, alcohols[0].amount), (100.0, 200.0));
        assert_eq!((alcohols[1].degree, alcohols[1].amount), (0.0, 0.0));
        assert_eq!((alcohols[2].degree, alcohols[2].amount), (0.0, 12.5));
    }

    #[test]
    fn normalize_derives_non_custom_overtime_hours() {
        let rec = normalize(&json!({ "overtime": { "type": "2h", "hours": 7.0 } }));
        assert_eq!(rec.overtime.hours, 2.0);

        let rec = normalize(&json!({ "overtime": { "type": "custom", "hours": 1.25 } }));
        assert_eq!(rec.overtime.hours, 1.25);
    }

    #[test]
    fn diff_of_identical_records_is_empty() {
        let rec = normalize(&json!({ "diary": "same" }));
        let patch = diff(&rec, &rec).expect("diff encodes");
        assert_eq!(patch, json!({}));
    }

    #[test]
    fn diff_contains_only_changed_fields() {
        let base = DailyRecord::default();
        let mut cur = base.clone();
        cur.set_diary("edited");
        cur.meals.lunch.set_menu(0, "soba");

        let patch = diff(&base, &cur).expect("diff encodes");
        let obj = patch.as_object().expect("patch is object");
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["diary"], json!("edited"));
        assert!(obj["meals"].get("lunch").is_some());
        assert!(obj["meals"].get("dinner").is_none());
        assert!(obj.get("weights").is_none());
    }

    #[test]
    fn merge_of_diff_reproduces_current_record() {
        let base = normalize(&json!({ "diary": "remote", "overtime": { "type": "2h" } }));
        let mut cur = base.clone();
        cur.weights.morning = Some(WeightEntry {
            value: "65.2".into(),
            ..WeightEntry::default()
        });

        let patch = diff(&base, &cur).expect("diff encodes");
        let mut doc = serde_json::to_value(&base).expect("base encodes");
        merge_value(&mut doc, &patch);
        assert_eq!(normalize(&doc), cur);

        // Idempotent under retry.
        merge_value(&mut doc, &patch);
        assert_eq!(normalize(&doc), cur);
    }

    #[test]
    fn merge_leaves_unrelated_remote_fields_alone() {
        let mut doc = json!({ "diary": "synced elsewhere", "extra": { "keep": true } });
        merge_value(
            &mut doc,
            &json!({ "weights": { "morning": { "value": "65.2" } } }),
        );
        assert_eq!(doc["diary"], json!("synced elsewhere"));
        assert_eq!(doc["extra"]["keep"], json!(true));
        assert_eq!(doc["weights"]["morning"]["value"], json!("65.2"));
    }
}
