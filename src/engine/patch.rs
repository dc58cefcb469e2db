//! Document patches and the fixup seam
//!
//! Validation never edits the document directly. It describes each repair as
//! a list of [`Operation`]s and hands them to a [`Fixup`], which applies them
//! (and may record them for undo). [`ApplyInPlace`] is the plain applier used
//! when no history is kept.

use crate::error::{EngineError, Result};
use crate::models::{Document, Measure, Model, ModelKind, SegmentRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A single structural edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Operation {
    #[serde(rename_all = "camelCase")]
    InsertModel {
        measure: Uuid,
        segment: SegmentRef,
        index: usize,
        model: Model,
    },
    /// `model` is the element the caller expects to find at `index`
    #[serde(rename_all = "camelCase")]
    DeleteModel {
        measure: Uuid,
        segment: SegmentRef,
        index: usize,
        model: Model,
    },
    #[serde(rename_all = "camelCase")]
    SetField {
        measure: Uuid,
        segment: SegmentRef,
        index: usize,
        field: String,
        value: serde_json::Value,
    },
    InsertMeasure { index: usize, measure: Measure },
    ReplaceMeasure { index: usize, measure: Measure },
    DeleteMeasure { index: usize, uuid: Uuid },
}

impl Operation {
    /// Whether the measure walk must start over after this edit.
    ///
    /// Inserting, deleting or resizing shifts indices or divisions the cursor
    /// has already passed. Any other field edit only touches one element and
    /// is absorbed by the walk in progress.
    pub fn restart_required(&self) -> bool {
        match self {
            Operation::SetField { field, .. } => field == "divCount",
            _ => true,
        }
    }
}

/// `SetField` edits turning `before` into `after`, one per top-level field
/// that differs. Both must serialize to JSON objects.
pub fn set_fields<T: Serialize>(
    measure: Uuid,
    segment: &SegmentRef,
    index: usize,
    before: &T,
    after: &T,
) -> Result<Vec<Operation>> {
    let (Value::Object(before), Value::Object(after)) = (serde_json::to_value(before)?, serde_json::to_value(after)?)
    else {
        return Err(EngineError::Invariant(format!(
            "{} index {}: field edits need an object payload",
            segment, index
        )));
    };
    Ok(after
        .into_iter()
        .filter(|(field, value)| before.get(field) != Some(value))
        .map(|(field, value)| Operation::SetField {
            measure,
            segment: segment.clone(),
            index,
            field,
            value,
        })
        .collect())
}

/// Applies patches to a document
pub trait Fixup {
    /// Apply `operations` in order. `segment` names the segment the request
    /// originated from, when there is one.
    ///
    /// `restart_required` is false for field edits the measure walk already
    /// made to the element it was visiting; applying them again leaves the
    /// document unchanged.
    fn fixup(
        &mut self,
        doc: &mut Document,
        segment: Option<&SegmentRef>,
        operations: &[Operation],
        restart_required: bool,
    ) -> Result<()>;
}

/// Applies operations directly, keeping no history
#[derive(Debug, Default, Clone, Copy)]
pub struct ApplyInPlace;

impl Fixup for ApplyInPlace {
    fn fixup(
        &mut self,
        doc: &mut Document,
        _segment: Option<&SegmentRef>,
        operations: &[Operation],
        _restart_required: bool,
    ) -> Result<()> {
        for op in operations {
            apply(doc, op)?;
        }
        Ok(())
    }
}

fn measure_mut(doc: &mut Document, uuid: Uuid) -> Result<&mut Measure> {
    doc.measures
        .iter_mut()
        .find(|m| m.uuid == uuid)
        .ok_or_else(|| EngineError::PatchPath(format!("measure {}", uuid)))
}

fn models_in<'a>(measure: &'a mut Measure, segment: &SegmentRef) -> Result<&'a mut Vec<Model>> {
    let uuid = measure.uuid;
    measure
        .segment_mut(segment)
        .map(|s| &mut s.models)
        .ok_or_else(|| EngineError::PatchPath(format!("measure {} {}", uuid, segment)))
}

/// Apply one element edit to `measure`, which must be the measure it names
pub fn apply_to_measure(target: &mut Measure, op: &Operation) -> Result<()> {
    match op {
        Operation::InsertModel {
            measure,
            segment,
            index,
            model,
        } if *measure == target.uuid => {
            let models = models_in(target, segment)?;
            if *index > models.len() {
                return Err(EngineError::PatchPath(format!(
                    "{} insert index {} out of bounds (len {})",
                    segment,
                    index,
                    models.len()
                )));
            }
            models.insert(*index, model.clone());
        }
        Operation::DeleteModel {
            measure,
            segment,
            index,
            model,
        } if *measure == target.uuid => {
            let models = models_in(target, segment)?;
            let Some(found) = models.get(*index) else {
                return Err(EngineError::PatchPath(format!(
                    "{} delete index {} out of bounds",
                    segment, index
                )));
            };
            if found != model {
                let drift_is_safe = matches!(
                    found.kind(),
                    ModelKind::Chord | ModelKind::Attributes | ModelKind::Print
                ) && found.kind() == model.kind();
                if !drift_is_safe {
                    return Err(EngineError::PatchMismatch(format!(
                        "{} index {} holds {} {}, expected {} {}",
                        segment,
                        index,
                        found.kind(),
                        found.key,
                        model.kind(),
                        model.key
                    )));
                }
                log::warn!(
                    "deleting {} at {} index {} whose content drifted from the patch",
                    found.kind(),
                    segment,
                    index
                );
            }
            models.remove(*index);
        }
        Operation::SetField {
            measure,
            segment,
            index,
            field,
            value,
        } if *measure == target.uuid => {
            let models = models_in(target, segment)?;
            let slot = models.get_mut(*index).ok_or_else(|| {
                EngineError::PatchPath(format!("{} set index {} out of bounds", segment, index))
            })?;
            let mut json = serde_json::to_value(&*slot)?;
            match json.as_object_mut() {
                Some(object) => {
                    object.insert(field.clone(), value.clone());
                }
                None => {
                    return Err(EngineError::Invariant(format!(
                        "model {} did not serialize to an object",
                        slot.key
                    )))
                }
            }
            *slot = serde_json::from_value(json)?;
        }
        Operation::InsertModel { measure, .. }
        | Operation::DeleteModel { measure, .. }
        | Operation::SetField { measure, .. } => {
            return Err(EngineError::PatchPath(format!(
                "edit for measure {} applied to measure {}",
                measure, target.uuid
            )))
        }
        Operation::InsertMeasure { .. } | Operation::ReplaceMeasure { .. } | Operation::DeleteMeasure { .. } => {
            return Err(EngineError::Invariant("measure operations apply to the document".into()))
        }
    }
    Ok(())
}

/// Apply one operation to the document
pub fn apply(doc: &mut Document, op: &Operation) -> Result<()> {
    match op {
        Operation::InsertModel { measure, .. }
        | Operation::DeleteModel { measure, .. }
        | Operation::SetField { measure, .. } => {
            let uuid = *measure;
            apply_to_measure(measure_mut(doc, uuid)?, op)?;
        }
        Operation::InsertMeasure { index, measure } => {
            if *index > doc.measures.len() {
                return Err(EngineError::PatchPath(format!("measure index {}", index)));
            }
            doc.measures.insert(*index, measure.clone());
        }
        Operation::ReplaceMeasure { index, measure } => {
            let slot = doc
                .measures
                .get_mut(*index)
                .ok_or_else(|| EngineError::PatchPath(format!("measure index {}", index)))?;
            *slot = measure.clone();
        }
        Operation::DeleteMeasure { index, uuid } => {
            match doc.measures.get(*index) {
                Some(m) if m.uuid == *uuid => {
                    doc.measures.remove(*index);
                }
                Some(m) => {
                    return Err(EngineError::PatchMismatch(format!(
                        "measure index {} is {}, expected {}",
                        index, m.uuid, uuid
                    )))
                }
                None => return Err(EngineError::PatchPath(format!("measure index {}", index))),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChordData, ModelData, Note, OwnerType, Segment, SpacerData, Step};

    fn chord(div_count: u32) -> Model {
        Model::new(ModelData::Chord(ChordData {
            notes: vec![Note::pitched(Step::C, 4)],
            grace: false,
        }))
        .with_div_count(div_count)
    }

    fn doc_with(models: Vec<Model>) -> (Document, Uuid) {
        let mut measure = Measure::new("1");
        measure.insert_segment(Segment::new("P1", OwnerType::Voice, 1, 1).with_models(models));
        let uuid = measure.uuid;
        (
            Document {
                measures: vec![measure],
                ..Default::default()
            },
            uuid,
        )
    }

    #[test]
    fn test_insert_and_delete_model() {
        let first = chord(1);
        let (mut doc, uuid) = doc_with(vec![first.clone()]);
        let segment = SegmentRef::voice("P1", 1);
        let spacer = Model::new(ModelData::Spacer(SpacerData {})).with_div_count(3);

        ApplyInPlace
            .fixup(
                &mut doc,
                Some(&segment),
                &[Operation::InsertModel {
                    measure: uuid,
                    segment: segment.clone(),
                    index: 1,
                    model: spacer.clone(),
                }],
                true,
            )
            .unwrap();
        assert_eq!(doc.measures[0].segment(&segment).unwrap().total_div_count(), 4);

        apply(
            &mut doc,
            &Operation::DeleteModel {
                measure: uuid,
                segment: segment.clone(),
                index: 0,
                model: first,
            },
        )
        .unwrap();
        assert_eq!(doc.measures[0].segment(&segment).unwrap().models, vec![spacer]);
    }

    #[test]
    fn test_delete_drift_on_chord_is_tolerated() {
        let stored = chord(2);
        let (mut doc, uuid) = doc_with(vec![stored.clone()]);
        let mut stale = stored;
        stale.div_count = 1;
        let result = apply(
            &mut doc,
            &Operation::DeleteModel {
                measure: uuid,
                segment: SegmentRef::voice("P1", 1),
                index: 0,
                model: stale,
            },
        );
        assert!(result.is_ok());
        assert!(doc.measures[0].segment(&SegmentRef::voice("P1", 1)).unwrap().models.is_empty());
    }

    #[test]
    fn test_delete_drift_on_other_kinds_fails() {
        let spacer = Model::new(ModelData::Spacer(SpacerData {})).with_div_count(2);
        let (mut doc, uuid) = doc_with(vec![spacer.clone()]);
        let mut stale = spacer;
        stale.div_count = 1;
        let result = apply(
            &mut doc,
            &Operation::DeleteModel {
                measure: uuid,
                segment: SegmentRef::voice("P1", 1),
                index: 0,
                model: stale,
            },
        );
        assert!(matches!(result, Err(EngineError::PatchMismatch(_))));
    }

    #[test]
    fn test_set_field_rewrites_model() {
        let (mut doc, uuid) = doc_with(vec![chord(1)]);
        apply(
            &mut doc,
            &Operation::SetField {
                measure: uuid,
                segment: SegmentRef::voice("P1", 1),
                index: 0,
                field: "divCount".to_string(),
                value: serde_json::json!(6),
            },
        )
        .unwrap();
        assert_eq!(doc.measures[0].segment(&SegmentRef::voice("P1", 1)).unwrap().models[0].div_count, 6);
    }

    #[test]
    fn test_missing_segment_is_a_path_error() {
        let (mut doc, uuid) = doc_with(vec![]);
        let result = apply(
            &mut doc,
            &Operation::InsertModel {
                measure: uuid,
                segment: SegmentRef::staff("P1", 1),
                index: 0,
                model: chord(1),
            },
        );
        assert!(matches!(result, Err(EngineError::PatchPath(_))));
    }

    #[test]
    fn test_only_duration_neutral_field_edits_skip_restart() {
        let set = |field: &str| Operation::SetField {
            measure: Uuid::new_v4(),
            segment: SegmentRef::staff("P1", 1),
            index: 0,
            field: field.to_string(),
            value: serde_json::json!(1),
        };
        assert!(!set("clefs").restart_required());
        assert!(set("divCount").restart_required());
        assert!(Operation::DeleteMeasure {
            index: 0,
            uuid: Uuid::new_v4()
        }
        .restart_required());
    }

    #[test]
    fn test_set_fields_lists_changed_fields_only() {
        let before = crate::models::AttributesData::default();
        let after = crate::models::AttributesData {
            divisions: Some(4),
            staves: Some(2),
            ..before.clone()
        };
        let ops = set_fields(Uuid::new_v4(), &SegmentRef::staff("P1", 1), 1, &before, &after).unwrap();
        let mut fields: Vec<&str> = ops
            .iter()
            .map(|op| match op {
                Operation::SetField { field, index: 1, .. } => field.as_str(),
                other => panic!("unexpected operation {:?}", other),
            })
            .collect();
        fields.sort_unstable();
        assert_eq!(fields, vec!["divisions", "staves"]);
        assert!(set_fields(Uuid::new_v4(), &SegmentRef::staff("P1", 1), 1, &after, &after)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_edit_for_another_measure_is_rejected() {
        let mut measure = Measure::new("1");
        measure.insert_segment(Segment::new("P1", OwnerType::Voice, 1, 1).with_models(vec![chord(1)]));
        let result = apply_to_measure(
            &mut measure,
            &Operation::SetField {
                measure: Uuid::new_v4(),
                segment: SegmentRef::voice("P1", 1),
                index: 0,
                field: "staffIdx".into(),
                value: serde_json::json!(2),
            },
        );
        assert!(matches!(result, Err(EngineError::PatchPath(_))));
    }
}
