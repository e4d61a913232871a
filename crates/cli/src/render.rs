use album_core::models::FurnitureRecord;
use album_core::pipeline::{BatchReport, IngestOutcome};
use album_core::uploads::ImageStore;
use serde::Serialize;

/// Listing row: the stored attributes plus where the image lives on disk.
#[derive(Debug, Serialize)]
pub struct RecordView {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
    pub image_path: String,
    pub image: String,
}

impl RecordView {
    pub fn new(record: FurnitureRecord, images: &ImageStore) -> Self {
        let image = images
            .path_of(&record.image_path)
            .to_string_lossy()
            .into_owned();
        Self {
            id: record.id,
            kind: record.kind,
            color: record.color,
            material: record.material,
            image_path: record.image_path,
            image,
        }
    }
}

pub fn views(records: Vec<FurnitureRecord>, images: &ImageStore) -> Vec<RecordView> {
    records
        .into_iter()
        .map(|r| RecordView::new(r, images))
        .collect()
}

fn attr(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

pub fn records_text(rows: &[RecordView]) -> String {
    if rows.is_empty() {
        return "no furniture found".to_string();
    }
    rows.iter()
        .map(|r| {
            format!(
                "#{:<4} {:<16} {:<12} {:<12} {}",
                r.id,
                attr(&r.kind),
                attr(&r.color),
                attr(&r.material),
                r.image_path
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn report_text(report: &BatchReport) -> String {
    let mut lines: Vec<String> = report
        .items
        .iter()
        .map(|item| match &item.outcome {
            IngestOutcome::Stored { record } => format!(
                "stored  {} -> #{} {}, {}, {}",
                item.filename,
                record.id,
                attr(&record.kind),
                attr(&record.color),
                attr(&record.material)
            ),
            IngestOutcome::Failed { error, .. } => {
                format!("failed  {}: {}", item.filename, error)
            }
        })
        .collect();
    lines.push(format!(
        "upload summary: stored={}, failed={}",
        report.stored().count(),
        report.failed()
    ));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use album_core::pipeline::{FailureKind, IngestItem};

    fn record(id: i64, kind: Option<&str>) -> FurnitureRecord {
        FurnitureRecord {
            id,
            kind: kind.map(String::from),
            color: Some("Red".into()),
            material: None,
            image_path: format!("img-{id}.png"),
        }
    }

    #[test]
    fn listing_marks_unknown_attributes() {
        let images = ImageStore::new("uploads");
        let rows = views(vec![record(1, Some("Chair")), record(2, None)], &images);
        let text = records_text(&rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Chair") && lines[0].contains("img-1.png"));
        assert!(lines[1].starts_with("#2") && lines[1].contains(" - "));
        assert!(rows[0].image.ends_with("img-1.png"));
    }

    #[test]
    fn empty_listing_says_so() {
        assert_eq!(records_text(&[]), "no furniture found");
    }

    #[test]
    fn json_rows_use_type_key() {
        let images = ImageStore::new("uploads");
        let rows = views(vec![record(7, Some("Bed"))], &images);
        let json = serde_json::to_value(&rows).unwrap();
        assert_eq!(json[0]["type"], "Bed");
        assert_eq!(json[0]["material"], serde_json::Value::Null);
    }

    #[test]
    fn report_lists_each_file_and_summary() {
        let report = BatchReport {
            items: vec![
                IngestItem {
                    filename: "a.png".into(),
                    outcome: IngestOutcome::Stored {
                        record: record(1, Some("Bed")),
                    },
                },
                IngestItem {
                    filename: "b.png".into(),
                    outcome: IngestOutcome::Failed {
                        kind: FailureKind::Service,
                        error: "timeout".into(),
                    },
                },
            ],
        };
        let text = report_text(&report);
        assert!(text.contains("stored  a.png -> #1 Bed"));
        assert!(text.contains("failed  b.png: timeout"));
        assert!(text.ends_with("stored=1, failed=1"));
    }
}
