//! Class names and typical real-world heights, indexed by label.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

const COCO_CLASSES: [(&str, f32); 80] = [
    ("person", 1.7),
    ("bicycle", 1.0),
    ("car", 1.5),
    ("motorcycle", 1.1),
    ("airplane", 19.4),
    ("bus", 3.25),
    ("train", 4.5),
    ("truck", 4.0),
    ("boat", 2.5),
    ("traffic light", 4.5),
    ("fire hydrant", 0.825),
    ("stop sign", 2.25),
    ("parking meter", 1.25),
    ("bench", 0.675),
    ("bird", 0.3),
    ("cat", 0.25),
    ("dog", 0.5),
    ("horse", 1.55),
    ("sheep", 0.9),
    ("cow", 1.5),
    ("elephant", 3.25),
    ("bear", 2.8),
    ("zebra", 1.65),
    ("giraffe", 5.5),
    ("backpack", 0.5),
    ("umbrella", 0.9),
    ("handbag", 0.3),
    ("tie", 1.4),
    ("suitcase", 0.55),
    ("frisbee", 0.025),
    ("skis", 1.75),
    ("snowboard", 1.55),
    ("sports ball", 0.24),
    ("kite", 1.0),
    ("baseball bat", 0.85),
    ("baseball glove", 0.3),
    ("skateboard", 0.8),
    ("surfboard", 2.25),
    ("tennis racket", 0.68),
    ("bottle", 0.3),
    ("wine glass", 0.2),
    ("cup", 0.1),
    ("fork", 0.2),
    ("knife", 0.23),
    ("spoon", 0.2),
    ("bowl", 0.07),
    ("banana", 0.19),
    ("apple", 0.1),
    ("sandwich", 0.05),
    ("orange", 0.1),
    ("broccoli", 0.18),
    ("carrot", 0.2),
    ("hot dog", 0.15),
    ("pizza", 0.4),
    ("donut", 0.1),
    ("cake", 0.18),
    ("chair", 0.9),
    ("couch", 1.05),
    ("potted plant", 0.65),
    ("bed", 0.6),
    ("dining table", 0.775),
    ("toilet", 0.45),
    ("tv", 0.75),
    ("laptop", 0.025),
    ("mouse", 0.04),
    ("remote", 0.2),
    ("keyboard", 0.018),
    ("cell phone", 0.018),
    ("microwave", 0.3),
    ("oven", 0.9),
    ("toaster", 0.25),
    ("sink", 0.18),
    ("refrigerator", 1.75),
    ("book", 0.035),
    ("clock", 0.4),
    ("vase", 0.4),
    ("scissors", 0.2),
    ("teddy bear", 0.5),
    ("hair drier", 0.2),
    ("toothbrush", 0.175),
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    pub height_m: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassTable {
    classes: Vec<ClassInfo>,
}

#[derive(Debug, Deserialize)]
struct ClassTableFile {
    classes: Vec<ClassInfo>,
}

#[derive(Debug, Error)]
pub enum ClassTableError {
    #[error("failed to read class table: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse class table: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid class table: {0}")]
    Invalid(String),
}

impl ClassTable {
    pub fn new(classes: Vec<ClassInfo>) -> Self {
        Self { classes }
    }

    /// The 80 COCO classes with typical heights in meters.
    pub fn coco() -> Self {
        Self::new(
            COCO_CLASSES
                .iter()
                .map(|&(name, height_m)| ClassInfo {
                    name: name.to_string(),
                    height_m,
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn get(&self, label: usize) -> Option<&ClassInfo> {
        self.classes.get(label)
    }

    pub fn name(&self, label: usize) -> Option<&str> {
        self.get(label).map(|c| c.name.as_str())
    }
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::coco()
    }
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<ClassTable, ClassTableError> {
    let contents = std::fs::read_to_string(path)?;
    let file: ClassTableFile = serde_json::from_str(&contents)?;
    if file.classes.is_empty() {
        return Err(ClassTableError::Invalid("no classes defined".to_string()));
    }
    if let Some(class) = file.classes.iter().find(|c| c.name.trim().is_empty()) {
        return Err(ClassTableError::Invalid(format!(
            "class with height {} has an empty name",
            class.height_m
        )));
    }
    Ok(ClassTable::new(file.classes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn coco_table_has_eighty_classes() {
        let table = ClassTable::coco();

        assert_eq!(table.len(), 80);
        assert_eq!(table.name(0), Some("person"));
        assert_eq!(table.get(0).map(|c| c.height_m), Some(1.7));
        assert_eq!(table.name(79), Some("toothbrush"));
        assert_eq!(table.name(80), None);
    }

    #[test]
    fn load_from_path_reads_json() -> Result<(), Box<dyn std::error::Error>> {
        let unique = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let path = std::env::temp_dir().join(format!("pathsense-classes-{unique}.json"));
        fs::write(
            &path,
            r#"{ "classes": [ { "name": "door", "height_m": 2.0 }, { "name": "person", "height_m": 1.7 } ] }"#,
        )?;

        let table = load_from_path(&path)?;
        let _ = fs::remove_file(&path);

        assert_eq!(table.len(), 2);
        assert_eq!(table.name(0), Some("door"));
        Ok(())
    }

    #[test]
    fn empty_class_list_is_invalid() -> Result<(), Box<dyn std::error::Error>> {
        let unique = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let path = std::env::temp_dir().join(format!("pathsense-classes-empty-{unique}.json"));
        fs::write(&path, r#"{ "classes": [] }"#)?;

        let result = load_from_path(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(ClassTableError::Invalid(_))));
        Ok(())
    }
}
