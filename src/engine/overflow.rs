//! Splitting a measure whose voices run past the bar
//!
//! Every segment of every part is cut at its part's bar capacity. The head
//! stays in the measure (staff barlines are dropped so validation re-adds
//! one at the new end) and the tail moves to a new measure right after it.

use super::patch::Operation;
use crate::models::{Measure, MeasurePart, Model, ModelKind, Segment};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Number of leading voice elements that fit in `capacity`
fn voice_split(models: &[Model], capacity: u32) -> usize {
    let mut divs = 0;
    let mut split = 0;
    for model in models {
        divs += model.div_count;
        if divs > capacity {
            break;
        }
        split += 1;
    }
    split
}

/// Number of leading staff elements that start inside `capacity`
fn staff_split(models: &[Model], capacity: u32) -> usize {
    let mut divs = 0;
    let mut split = 0;
    while divs <= capacity && split < models.len() {
        divs += models[split].div_count;
        split += 1;
    }
    split
}

fn split_segment(segment: &Segment, capacity: u32) -> (Segment, Segment) {
    let (head, tail) = if segment.is_staff() {
        let at = staff_split(&segment.models, capacity);
        let head: Vec<Model> = segment.models[..at]
            .iter()
            .filter(|m| m.effective_kind() != ModelKind::Barline)
            .cloned()
            .collect();
        (head, segment.models[at..].to_vec())
    } else {
        let at = voice_split(&segment.models, capacity);
        (segment.models[..at].to_vec(), segment.models[at..].to_vec())
    };
    (
        segment.clone().with_models(head),
        segment.clone().with_models(tail),
    )
}

/// Number for the tail of `number` that no measure in `taken` uses: the next
/// integer if it is free, otherwise the head's number with a letter appended
fn tail_number(number: &str, taken: &BTreeSet<&str>) -> String {
    if let Ok(n) = number.parse::<i64>() {
        let next = (n + 1).to_string();
        if !taken.contains(next.as_str()) {
            return next;
        }
    }
    let mut attempt = 0;
    loop {
        let candidate = match char::from_u32(u32::from('a') + attempt).filter(char::is_ascii_lowercase) {
            Some(letter) => format!("{}{}", number, letter),
            None => format!("{}-{}", number, attempt),
        };
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        attempt += 1;
    }
}

/// Operations replacing `measure` (at `index`) by its head and inserting the
/// tail after it. Parts without a known capacity stay whole. `taken` holds
/// the numbers already used in the document.
pub fn split_measure(
    measure: &Measure,
    index: usize,
    capacities: &BTreeMap<String, u32>,
    taken: &BTreeSet<&str>,
) -> Vec<Operation> {
    let mut head = measure.clone();
    let mut tail = Measure {
        uuid: Uuid::new_v4(),
        number: tail_number(&measure.number, taken),
        implicit: false,
        width: None,
        version: 0,
        parts: BTreeMap::new(),
    };

    for (id, part) in measure.parts.iter() {
        let Some(capacity) = capacities.get(id).copied() else {
            continue;
        };
        let mut kept = MeasurePart::default();
        let mut moved = MeasurePart::default();
        for (owner, segment) in &part.staves {
            let (h, t) = split_segment(segment, capacity);
            kept.staves.insert(*owner, h);
            moved.staves.insert(*owner, t);
        }
        for (owner, segment) in &part.voices {
            let (h, t) = split_segment(segment, capacity);
            kept.voices.insert(*owner, h);
            moved.voices.insert(*owner, t);
        }
        head.parts.insert(id.clone(), kept);
        tail.parts.insert(id.clone(), moved);
    }

    log::info!(
        "measure {} overflows; moving the remainder to new measure {}",
        measure.number,
        tail.number
    );
    vec![
        Operation::ReplaceMeasure {
            index,
            measure: head,
        },
        Operation::InsertMeasure {
            index: index + 1,
            measure: tail,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BarlineData, ModelData, OwnerType};

    fn chord(div_count: u32) -> Model {
        Model::new(ModelData::Chord(Default::default())).with_div_count(div_count)
    }

    fn spacer(div_count: u32) -> Model {
        Model::new(ModelData::Spacer(Default::default())).with_div_count(div_count)
    }

    #[test]
    fn test_voice_split_keeps_what_fits() {
        assert_eq!(voice_split(&[chord(2), chord(6), chord(4)], 8), 2);
        assert_eq!(voice_split(&[chord(9)], 8), 0);
        assert_eq!(voice_split(&[], 8), 0);
    }

    #[test]
    fn test_staff_split_includes_trailing_barline() {
        let staff = vec![
            Model::new(ModelData::Print(Default::default())),
            Model::new(ModelData::Attributes(Default::default())),
            spacer(4),
            spacer(4),
            Model::new(ModelData::Barline(BarlineData::default())),
        ];
        assert_eq!(staff_split(&staff, 8), 5);
        assert_eq!(staff_split(&staff, 4), 4);
    }

    #[test]
    fn test_split_measure_moves_tail() {
        let mut measure = Measure::new("7");
        measure.insert_segment(Segment::new("P1", OwnerType::Staff, 1, 1).with_models(vec![
            Model::new(ModelData::Attributes(Default::default())),
            spacer(4),
            Model::new(ModelData::Barline(BarlineData::default())),
        ]));
        measure.insert_segment(
            Segment::new("P1", OwnerType::Voice, 1, 1).with_models(vec![chord(3), chord(3)]),
        );
        let capacities = BTreeMap::from([("P1".to_string(), 4)]);

        let ops = split_measure(&measure, 2, &capacities, &BTreeSet::from(["7"]));
        assert_eq!(ops.len(), 2);
        let (head, tail) = match (&ops[0], &ops[1]) {
            (
                Operation::ReplaceMeasure { index: 2, measure: head },
                Operation::InsertMeasure { index: 3, measure: tail },
            ) => (head, tail),
            other => panic!("unexpected operations {:?}", other),
        };

        assert_eq!(head.uuid, measure.uuid);
        assert_ne!(tail.uuid, measure.uuid);
        assert_eq!(tail.number, "8");

        let head_voice = &head.parts["P1"].voices[&1];
        let tail_voice = &tail.parts["P1"].voices[&1];
        assert_eq!(head_voice.models.len(), 1);
        assert_eq!(tail_voice.models.len(), 1);

        let head_staff = &head.parts["P1"].staves[&1];
        assert!(head_staff
            .models
            .iter()
            .all(|m| m.kind() != ModelKind::Barline));
        assert!(tail.parts["P1"].staves[&1].models.is_empty());
    }

    #[test]
    fn test_tail_number_is_unique() {
        assert_eq!(tail_number("3", &BTreeSet::from(["3"])), "4");
        assert_eq!(tail_number("3", &BTreeSet::from(["3", "4"])), "3a");
        assert_eq!(tail_number("3", &BTreeSet::from(["3", "4", "3a"])), "3b");
        assert_eq!(tail_number("X", &BTreeSet::from(["X"])), "Xa");
    }
}
