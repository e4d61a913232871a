use crate::models::{AttributeTriple, FurnitureRecord, SearchFilter};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

const SELECT_RECORDS: &str = "SELECT id, type, color, material, image_path FROM furniture";
const LIST_RECORDS: &str =
    "SELECT id, type, color, material, image_path FROM furniture ORDER BY id";

/// Durable store of furniture records.
///
/// Records are append-only: there is no update and no per-record delete.
/// Writes go through the pool, so concurrent inserts each get their own
/// atomic statement and a distinct id.
#[derive(Clone)]
pub struct Catalog {
    pool: SqlitePool,
}

impl Catalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn open(database_url: &str) -> anyhow::Result<Self> {
        let pool = crate::connect(database_url).await?;
        let catalog = Self::new(pool);
        catalog.init_schema().await?;
        Ok(catalog)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn init_schema(&self) -> anyhow::Result<()> {
        crate::migrate(&self.pool).await
    }

    pub async fn insert(
        &self,
        triple: &AttributeTriple,
        image_path: &str,
    ) -> Result<FurnitureRecord, sqlx::Error> {
        let res = sqlx::query(
            "INSERT INTO furniture (type, color, material, image_path) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(triple.kind.as_deref())
        .bind(triple.color.as_deref())
        .bind(triple.material.as_deref())
        .bind(image_path)
        .execute(&self.pool)
        .await?;

        let record = FurnitureRecord {
            id: res.last_insert_rowid(),
            kind: triple.kind.clone(),
            color: triple.color.clone(),
            material: triple.material.clone(),
            image_path: image_path.to_string(),
        };
        info!(
            id = record.id,
            kind = ?record.kind,
            color = ?record.color,
            material = ?record.material,
            "added furniture record"
        );
        Ok(record)
    }

    pub async fn list_all(&self) -> Result<Vec<FurnitureRecord>, sqlx::Error> {
        sqlx::query_as::<_, FurnitureRecord>(LIST_RECORDS)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn query(&self, filter: &SearchFilter) -> Result<Vec<FurnitureRecord>, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_RECORDS);
        qb.push(" WHERE 1=1");
        for (column, value) in filter.constraints() {
            qb.push(format!(" AND {column} LIKE "));
            qb.push_bind(like_pattern(value));
            qb.push(" ESCAPE '\\'");
        }
        qb.push(" ORDER BY id");
        debug!(?filter, "querying catalog");
        qb.build_query_as::<FurnitureRecord>()
            .fetch_all(&self.pool)
            .await
    }

    /// Deletes every record. Stored image files are left alone.
    pub async fn clear_all(&self) -> Result<u64, sqlx::Error> {
        let res = sqlx::query("DELETE FROM furniture")
            .execute(&self.pool)
            .await?;
        info!(removed = res.rows_affected(), "cleared catalog");
        Ok(res.rows_affected())
    }
}

/// Substring pattern for `LIKE ... ESCAPE '\'` with the value's own
/// wildcard characters taken literally.
fn like_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn catalog() -> Catalog {
        Catalog::open("sqlite::memory:").await.unwrap()
    }

    async fn seed(catalog: &Catalog) -> Vec<FurnitureRecord> {
        vec![
            catalog
                .insert(&AttributeTriple::known("Bed", "White", "Wood"), "bed.png")
                .await
                .unwrap(),
            catalog
                .insert(&AttributeTriple::known("Chair", "Red", "Metal"), "chair.jpg")
                .await
                .unwrap(),
        ]
    }

    #[tokio::test]
    async fn wildcard_filter_returns_everything_in_insertion_order() {
        let catalog = catalog().await;
        let seeded = seed(&catalog).await;
        let third = catalog
            .insert(&AttributeTriple::known("Table", "Brown", "Oak"), "table.png")
            .await
            .unwrap();

        let all = catalog.query(&SearchFilter::default()).await.unwrap();
        assert_eq!(all, vec![seeded[0].clone(), seeded[1].clone(), third]);
        assert_eq!(all, catalog.list_all().await.unwrap());
    }

    #[tokio::test]
    async fn color_filter_matches_case_insensitive_substring() {
        let catalog = catalog().await;
        seed(&catalog).await;

        let filter = SearchFilter {
            color: Some("red".into()),
            ..Default::default()
        };
        let hits = catalog.query(&filter).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind.as_deref(), Some("Chair"));
        assert_eq!(hits[0].color.as_deref(), Some("Red"));
        assert_eq!(hits[0].material.as_deref(), Some("Metal"));

        let partial = SearchFilter {
            kind: Some("ai".into()),
            ..Default::default()
        };
        assert_eq!(catalog.query(&partial).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn constraints_are_anded() {
        let catalog = catalog().await;
        seed(&catalog).await;

        let filter = SearchFilter {
            kind: Some("Chair".into()),
            color: Some("White".into()),
            material: None,
        };
        assert!(catalog.query(&filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn like_wildcards_in_filter_are_literal() {
        let catalog = catalog().await;
        seed(&catalog).await;
        catalog
            .insert(&AttributeTriple::known("Sofa", "50%_grey", "Linen"), "sofa.png")
            .await
            .unwrap();

        let filter = SearchFilter {
            color: Some("%".into()),
            ..Default::default()
        };
        let hits = catalog.query(&filter).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].image_path, "sofa.png");
    }

    #[tokio::test]
    async fn unknown_attributes_never_match_a_constraint() {
        let catalog = catalog().await;
        catalog
            .insert(&AttributeTriple::default(), "mystery.png")
            .await
            .unwrap();

        let filter = SearchFilter {
            material: Some("Wood".into()),
            ..Default::default()
        };
        assert!(catalog.query(&filter).await.unwrap().is_empty());
        let all = catalog.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].kind, None);
    }

    #[tokio::test]
    async fn repeated_inserts_are_not_deduplicated() {
        let catalog = catalog().await;
        let triple = AttributeTriple::known("Lamp", "Black", "Steel");
        let a = catalog.insert(&triple, "lamp.png").await.unwrap();
        let b = catalog.insert(&triple, "lamp.png").await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(catalog.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn clear_removes_everything_and_ids_are_not_reused() {
        let catalog = catalog().await;
        let seeded = seed(&catalog).await;
        let max_before = seeded.iter().map(|r| r.id).max().unwrap();

        assert_eq!(catalog.clear_all().await.unwrap(), 2);
        assert!(catalog.list_all().await.unwrap().is_empty());
        assert_eq!(catalog.clear_all().await.unwrap(), 0);

        let next = catalog
            .insert(&AttributeTriple::known("Desk", "Grey", "Glass"), "desk.png")
            .await
            .unwrap();
        assert!(next.id > max_before);
    }

    #[tokio::test]
    async fn concurrent_inserts_get_distinct_ids() {
        let temp = tempfile::tempdir().unwrap();
        let db = temp.path().join("album.db");
        let catalog = Catalog::open(&db.to_string_lossy()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let catalog = catalog.clone();
            handles.push(tokio::spawn(async move {
                catalog
                    .insert(
                        &AttributeTriple::known("Stool", "Blue", "Plastic"),
                        &format!("stool-{i}.png"),
                    )
                    .await
                    .unwrap()
                    .id
            }));
        }
        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap());
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("red"), "%red%");
        assert_eq!(like_pattern("a_b%c\\"), "%a\\_b\\%c\\\\%");
    }
}
