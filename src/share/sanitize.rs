//! Profile sanitizer.
//!
//! Projects a raw, owner-supplied profile document onto the public shape that
//! share-link holders are allowed to see. Stored profiles come from many app
//! versions, so every field is accepted in several legacy shapes and anything
//! unexpected degrades to an empty value. Only the six public fields are ever
//! emitted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The public, sanitized view of a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub name: String,
    pub blood_group: String,
    pub allergies: Vec<String>,
    pub emergency_contacts: Vec<EmergencyContact>,
    pub address: String,
    pub medical_notes: Vec<String>,
}

/// A contact shown on the public profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
}

/// Field names accepted for the blood group, in priority order.
const BLOOD_GROUP_KEYS: &[&str] = &["bloodGroup", "bloodgroup"];

/// Field names that can carry an allergy label inside an object entry.
const ALLERGY_LABEL_KEYS: &[&str] = &["allergen", "name"];

/// Shape of a single raw field.
///
/// Numbers, booleans and `null` carry nothing we publish, so they classify as
/// `Absent` along with missing fields.
#[derive(Debug, Clone, Copy)]
enum RawField<'a> {
    Absent,
    Text(&'a str),
    List(&'a [Value]),
    Map(&'a Map<String, Value>),
}

impl<'a> From<Option<&'a Value>> for RawField<'a> {
    fn from(value: Option<&'a Value>) -> Self {
        match value {
            Some(Value::String(s)) => RawField::Text(s),
            Some(Value::Array(items)) => RawField::List(items),
            Some(Value::Object(map)) => RawField::Map(map),
            Some(Value::Null | Value::Bool(_) | Value::Number(_)) | None => RawField::Absent,
        }
    }
}

/// Sanitize a raw profile document. Never fails.
pub fn sanitize(raw: &Value) -> PublicProfile {
    let Some(doc) = raw.as_object() else {
        return PublicProfile::default();
    };
    let field = |name: &str| RawField::from(doc.get(name));

    PublicProfile {
        name: text(field("name")),
        blood_group: blood_group(doc),
        allergies: allergies(field("allergies")),
        emergency_contacts: emergency_contacts(field("emergencyContacts")),
        address: text(field("address")),
        medical_notes: medical_notes(field("medicalNotes")),
    }
}

fn text(field: RawField<'_>) -> String {
    match field {
        RawField::Text(s) => s.trim().to_string(),
        RawField::Absent | RawField::List(_) | RawField::Map(_) => String::new(),
    }
}

fn blood_group(doc: &Map<String, Value>) -> String {
    BLOOD_GROUP_KEYS
        .iter()
        .find_map(|key| match RawField::from(doc.get(*key)) {
            RawField::Text(s) => Some(s.trim().to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

fn allergies(field: RawField<'_>) -> Vec<String> {
    let mut out = Vec::new();
    match field {
        RawField::Absent => {}
        RawField::Text(s) => push_comma_separated(s, &mut out),
        RawField::List(items) => {
            for item in items {
                push_allergy_entry(RawField::from(Some(item)), &mut out);
            }
        }
        RawField::Map(map) => {
            for value in ordered_values(map) {
                match RawField::from(Some(value)) {
                    RawField::Text(s) => push_comma_separated(s, &mut out),
                    RawField::List(items) => {
                        for item in items {
                            push_allergy_entry(RawField::from(Some(item)), &mut out);
                        }
                    }
                    entry => push_allergy_entry(entry, &mut out),
                }
            }
        }
    }
    out
}

/// Push one list entry: a label string or an object with a label field.
/// Label strings inside a list are kept whole.
fn push_allergy_entry(entry: RawField<'_>, out: &mut Vec<String>) {
    match entry {
        RawField::Text(s) => {
            let label = s.trim();
            if !label.is_empty() {
                out.push(label.to_string());
            }
        }
        RawField::Map(obj) => {
            let label = ALLERGY_LABEL_KEYS
                .iter()
                .find_map(|key| match RawField::from(obj.get(*key)) {
                    RawField::Text(s) if !s.trim().is_empty() => Some(s.trim()),
                    _ => None,
                });
            if let Some(label) = label {
                out.push(label.to_string());
            }
        }
        RawField::Absent | RawField::List(_) => {}
    }
}

/// Values of a keyed map in source order. Maps keyed by array index
/// (`"0"`, `"1"`, ..., `"10"`) are ordered numerically; any other keys keep
/// the map's own key order.
fn ordered_values(map: &Map<String, Value>) -> Vec<&Value> {
    let mut indexed = Vec::with_capacity(map.len());
    for (key, value) in map {
        match key.parse::<u64>() {
            Ok(index) => indexed.push((index, value)),
            Err(_) => return map.values().collect(),
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, value)| value).collect()
}

fn push_comma_separated(s: &str, out: &mut Vec<String>) {
    out.extend(
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string),
    );
}

fn medical_notes(field: RawField<'_>) -> Vec<String> {
    let mut out = Vec::new();
    match field {
        RawField::Text(s) => push_lines(s, &mut out),
        RawField::List(items) => {
            for item in items {
                if let RawField::Text(s) = RawField::from(Some(item)) {
                    push_lines(s, &mut out);
                }
            }
        }
        RawField::Absent | RawField::Map(_) => {}
    }
    out
}

fn push_lines(s: &str, out: &mut Vec<String>) {
    out.extend(
        s.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string),
    );
}

fn emergency_contacts(field: RawField<'_>) -> Vec<EmergencyContact> {
    let entries: Vec<&Value> = match field {
        RawField::List(items) => items.iter().collect(),
        RawField::Map(map) => ordered_values(map),
        RawField::Absent | RawField::Text(_) => return Vec::new(),
    };

    entries
        .into_iter()
        .filter_map(|entry| match RawField::from(Some(entry)) {
            RawField::Map(obj) => {
                let contact = EmergencyContact {
                    name: text(RawField::from(obj.get("name"))),
                    phone: phone(obj.get("phone")),
                };
                (!contact.name.is_empty() || !contact.phone.is_empty()).then_some(contact)
            }
            _ => None,
        })
        .collect()
}

/// Phone numbers were stored as numbers by some older clients.
fn phone(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => n.to_string(),
        other => text(RawField::from(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_document() {
        let profile = sanitize(&json!({}));
        assert_eq!(profile, PublicProfile::default());

        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "",
                "bloodGroup": "",
                "allergies": [],
                "emergencyContacts": [],
                "address": "",
                "medicalNotes": [],
            })
        );
    }

    #[test]
    fn test_non_object_documents() {
        for raw in [json!(null), json!(42), json!("x"), json!([1, 2]), json!(true)] {
            assert_eq!(sanitize(&raw), PublicProfile::default());
        }
    }

    #[test]
    fn test_full_document() {
        let raw = json!({
            "name": " Jane Doe ",
            "bloodGroup": "O+",
            "allergies": ["Peanuts", "Latex"],
            "emergencyContacts": [{ "name": "Mom", "phone": "+1555" }],
            "address": "1 Main St",
            "medicalNotes": ["Asthma", "Type 1 diabetes"],
        });

        let profile = sanitize(&raw);
        assert_eq!(profile.name, "Jane Doe");
        assert_eq!(profile.blood_group, "O+");
        assert_eq!(profile.allergies, vec!["Peanuts", "Latex"]);
        assert_eq!(
            profile.emergency_contacts,
            vec![EmergencyContact {
                name: "Mom".into(),
                phone: "+1555".into()
            }]
        );
        assert_eq!(profile.address, "1 Main St");
        assert_eq!(profile.medical_notes, vec!["Asthma", "Type 1 diabetes"]);
    }

    #[test]
    fn test_unknown_fields_never_pass_through() {
        let raw = json!({
            "name": "Jane",
            "ssn": "123-45-6789",
            "insurance": { "id": "X" },
            "uid": "owner-1",
        });

        let value = serde_json::to_value(sanitize(&raw)).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 6);
        assert!(value.get("ssn").is_none());
        assert!(value.get("insurance").is_none());
        assert!(value.get("uid").is_none());
    }

    #[test]
    fn test_type_mismatches_default() {
        let raw = json!({
            "name": 12,
            "bloodGroup": ["A+"],
            "allergies": 7,
            "emergencyContacts": "Mom",
            "address": { "line1": "x" },
            "medicalNotes": { "a": "b" },
        });
        assert_eq!(sanitize(&raw), PublicProfile::default());
    }

    #[test]
    fn test_blood_group_alias() {
        assert_eq!(sanitize(&json!({ "bloodgroup": "B-" })).blood_group, "B-");
        assert_eq!(
            sanitize(&json!({ "bloodGroup": "A+", "bloodgroup": "B-" })).blood_group,
            "A+"
        );
        // First alias that is a string wins.
        assert_eq!(
            sanitize(&json!({ "bloodGroup": 5, "bloodgroup": "AB+" })).blood_group,
            "AB+"
        );
    }

    #[test]
    fn test_allergies_comma_string() {
        let profile = sanitize(&json!({ "allergies": "Peanuts, Penicillin" }));
        assert_eq!(profile.allergies, vec!["Peanuts", "Penicillin"]);

        let profile = sanitize(&json!({ "allergies": " , Peanuts,, " }));
        assert_eq!(profile.allergies, vec!["Peanuts"]);
    }

    #[test]
    fn test_allergies_object_list() {
        let raw = json!({
            "allergies": [
                { "allergen": "Bees", "severity": "high" },
                { "name": "Shellfish" },
                { "allergen": "", "name": "Dust" },
                { "severity": "low" },
                "Latex",
                "",
                42,
            ]
        });
        assert_eq!(
            sanitize(&raw).allergies,
            vec!["Bees", "Shellfish", "Dust", "Latex"]
        );
    }

    #[test]
    fn test_allergies_keyed_map() {
        let raw = json!({
            "allergies": {
                "a": "Peanuts",
                "b": { "allergen": "Bees" },
                "c": ["Latex", { "name": "Mold" }],
                "d": null,
            }
        });
        assert_eq!(
            sanitize(&raw).allergies,
            vec!["Peanuts", "Bees", "Latex", "Mold"]
        );
    }

    #[test]
    fn test_medical_notes_string() {
        let raw = json!({ "medicalNotes": "Asthma\n\n  Pacemaker  \r\nEpilepsy\n" });
        assert_eq!(
            sanitize(&raw).medical_notes,
            vec!["Asthma", "Pacemaker", "Epilepsy"]
        );
    }

    #[test]
    fn test_medical_notes_list() {
        let raw = json!({ "medicalNotes": ["Asthma", "", "  ", 3, "Line one\nLine two"] });
        assert_eq!(
            sanitize(&raw).medical_notes,
            vec!["Asthma", "Line one", "Line two"]
        );
    }

    #[test]
    fn test_contacts_drop_empty_entries() {
        let raw = json!({
            "emergencyContacts": [
                { "name": "Mom", "phone": "+1555" },
                { "name": "", "phone": "" },
            ]
        });
        assert_eq!(
            sanitize(&raw).emergency_contacts,
            vec![EmergencyContact {
                name: "Mom".into(),
                phone: "+1555".into()
            }]
        );
    }

    #[test]
    fn test_contacts_partial_and_legacy_shapes() {
        let raw = json!({
            "emergencyContacts": [
                { "name": "Dad" },
                { "phone": 15551234 },
                { "name": "Sis", "phone": "+1666", "email": "sis@example.com" },
                "not a contact",
                null,
            ]
        });
        let contacts = sanitize(&raw).emergency_contacts;
        assert_eq!(contacts.len(), 3);
        assert_eq!(contacts[0].name, "Dad");
        assert_eq!(contacts[0].phone, "");
        assert_eq!(contacts[1].name, "");
        assert_eq!(contacts[1].phone, "15551234");
        assert_eq!(contacts[2].phone, "+1666");

        let value = serde_json::to_value(&contacts[2]).unwrap();
        assert!(value.get("email").is_none());
    }

    #[test]
    fn test_contacts_keyed_map() {
        let raw = json!({
            "emergencyContacts": {
                "c1": { "name": "Mom", "phone": "+1555" },
                "c2": { "name": "", "phone": "" },
                "c3": { "name": "Dad", "phone": "+1777" },
            }
        });
        let names: Vec<String> = sanitize(&raw)
            .emergency_contacts
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Mom", "Dad"]);
    }

    #[test]
    fn test_index_keyed_maps_keep_array_order() {
        let mut contacts = Map::new();
        let mut allergies = Map::new();
        for i in 0..12 {
            contacts.insert(
                i.to_string(),
                json!({ "name": format!("C{i}"), "phone": format!("+1{i}") }),
            );
            allergies.insert(i.to_string(), json!(format!("A{i}")));
        }
        let raw = json!({ "emergencyContacts": contacts, "allergies": allergies });

        let profile = sanitize(&raw);
        let names: Vec<String> = profile
            .emergency_contacts
            .into_iter()
            .map(|c| c.name)
            .collect();
        let expected: Vec<String> = (0..12).map(|i| format!("C{i}")).collect();
        assert_eq!(names, expected);
        assert_eq!(names[2], "C2");

        let expected: Vec<String> = (0..12).map(|i| format!("A{i}")).collect();
        assert_eq!(profile.allergies, expected);
    }

    #[test]
    fn test_allergy_list_entries_are_not_split() {
        let raw = json!({ "allergies": ["Penicillin, amoxicillin class", "  Latex "] });
        assert_eq!(
            sanitize(&raw).allergies,
            vec!["Penicillin, amoxicillin class", "Latex"]
        );

        // A string value inside a keyed map is still a comma list.
        let raw = json!({ "allergies": { "a": "Peanuts, Penicillin" } });
        assert_eq!(sanitize(&raw).allergies, vec!["Peanuts", "Penicillin"]);
    }
}
