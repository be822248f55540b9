use serde::{Deserialize, Serialize};

use crate::{BoundingBox, EmbeddingTable, RowGeometry, Triplet};

/// One annotated subject–relation–object instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationRecord {
    #[serde(flatten)]
    pub triplet: Triplet,
    pub subject_box: BoundingBox,
    pub object_box: BoundingBox,
}

impl RelationRecord {
    #[must_use]
    pub fn geometry(&self) -> RowGeometry {
        RowGeometry {
            subject: self.subject_box,
            object: self.object_box,
        }
    }
}

/// A tabular training dataset; the row index is the record's position.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub records: Vec<RelationRecord>,
}

impl Dataset {
    #[must_use]
    pub fn new(records: Vec<RelationRecord>) -> Self {
        Self { records }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Mirrors every row whose object lies left of its subject.
    ///
    /// Both boxes of such a row are reflected across the image centre, so after
    /// this call no object centre is left of its subject centre. Returns the
    /// number of mirrored rows.
    ///
    /// ```
    /// use spatrel_data::{BoundingBox, Dataset, RelationRecord, Triplet};
    ///
    /// let mut dataset = Dataset::new(vec![RelationRecord {
    ///     triplet: Triplet::new("man", "beside", "car"),
    ///     subject_box: BoundingBox::new(0.7, 0.5, 0.1, 0.1),
    ///     object_box: BoundingBox::new(0.2, 0.5, 0.1, 0.1),
    /// }]);
    /// assert_eq!(dataset.mirror_x(), 1);
    /// let record = &dataset.records[0];
    /// assert!(record.object_box.ctr_x >= record.subject_box.ctr_x);
    /// ```
    pub fn mirror_x(&mut self) -> usize {
        let mut mirrored = 0;
        for record in &mut self.records {
            if record.object_box.ctr_x < record.subject_box.ctr_x {
                record.subject_box = record.subject_box.mirrored_x();
                record.object_box = record.object_box.mirrored_x();
                mirrored += 1;
            }
        }
        mirrored
    }

    /// Drops rows that mention a word missing from `table`.
    ///
    /// Returns the number of dropped rows.
    pub fn retain_known_words(&mut self, table: &EmbeddingTable) -> usize {
        let before = self.records.len();
        self.records
            .retain(|record| record.triplet.words().all(|word| table.contains(word)));
        before - self.records.len()
    }

    pub fn triplets(&self) -> impl Iterator<Item = &Triplet> {
        self.records.iter().map(|record| &record.triplet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(subject: &str, relation: &str, object: &str, sx: f32, ox: f32) -> RelationRecord {
        RelationRecord {
            triplet: Triplet::new(subject, relation, object),
            subject_box: BoundingBox::new(sx, 0.5, 0.1, 0.1),
            object_box: BoundingBox::new(ox, 0.4, 0.1, 0.1),
        }
    }

    #[test]
    fn test_mirror_only_leftward_objects() {
        let mut dataset = Dataset::new(vec![
            record("man", "riding", "horse", 0.25, 0.75),
            record("dog", "beside", "car", 0.75, 0.25),
        ]);
        assert_eq!(dataset.mirror_x(), 1);
        assert_eq!(dataset.records[0].subject_box.ctr_x, 0.25);
        assert_eq!(dataset.records[1].subject_box.ctr_x, 0.25);
        assert_eq!(dataset.records[1].object_box.ctr_x, 0.75);
    }

    #[test]
    fn test_retain_known_words() {
        let table = EmbeddingTable::new(
            1,
            vec!["man".into(), "riding".into(), "horse".into()],
            vec![0.0; 3],
        )
        .unwrap();
        let mut dataset = Dataset::new(vec![
            record("man", "riding", "horse", 0.5, 0.5),
            record("man", "riding", "kite", 0.5, 0.5),
        ]);
        assert_eq!(dataset.retain_known_words(&table), 1);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.records[0].triplet.object, "horse");
    }

    #[test]
    fn test_json_layout_is_flat() {
        let json = serde_json::to_value(record("man", "riding", "horse", 0.5, 0.5)).unwrap();
        assert_eq!(json["subject"], "man");
        assert_eq!(json["relation"], "riding");
        assert_eq!(json["object"], "horse");
        assert!(json["object_box"]["ctr_x"].is_number());
    }
}
