use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Category, CategoryGroup};

/// Board for second-hand goods.
pub const USED_GOODS: &str = "중고거래";
/// Board for local promotion.
pub const LOCAL_PROMOTION: &str = "동네홍보";

const USED_GOODS_CATEGORIES: [&str; 15] = [
    "인기매물",
    "디지털/가전",
    "가구/인테리어",
    "유아동/유아도서",
    "생활/가공식품",
    "스포츠/레저",
    "여성잡화",
    "여성의류",
    "남성패션/잡화",
    "게임/취미",
    "뷰티/미용",
    "반려동물용품",
    "도서/티켓/음반",
    "기타 중고물품",
    "삽니다",
];

const LOCAL_PROMOTION_CATEGORIES: [&str; 7] = [
    "중고차/오토바이",
    "동네 구인구직",
    "부동산",
    "농수산물",
    "지역업체 소개",
    "과외/클래스 모집",
    "전시/공연/행사",
];

/// Stable id of a seeded category, identical on every deployment.
pub fn category_id(group_type: &str, name: &str) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("market-category:{}/{}", group_type, name).as_bytes(),
    )
}

/// The seeded catalog, boards in display order.
pub fn default_groups() -> Vec<CategoryGroup> {
    [
        (USED_GOODS, &USED_GOODS_CATEGORIES[..]),
        (LOCAL_PROMOTION, &LOCAL_PROMOTION_CATEGORIES[..]),
    ]
    .into_iter()
    .map(|(group_type, names)| CategoryGroup {
        group_type: group_type.to_string(),
        categories: names
            .iter()
            .map(|name| Category {
                id: category_id(group_type, name),
                name: name.to_string(),
            })
            .collect(),
    })
    .collect()
}

/// Whether any of the ids is a used-goods category.
pub fn is_used_goods(category_ids: &[Uuid]) -> bool {
    USED_GOODS_CATEGORIES
        .iter()
        .any(|name| category_ids.contains(&category_id(USED_GOODS, name)))
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<CategoryGroup>>;

    /// Insert the default catalog when the table is empty. Returns the number
    /// of categories inserted.
    async fn seed_defaults(&self) -> Result<u64>;
}

#[derive(Clone)]
pub struct PgCategoryStore {
    pool: PgPool,
}

impl PgCategoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    group_type: String,
}

#[async_trait]
impl CategoryStore for PgCategoryStore {
    async fn list_groups(&self) -> Result<Vec<CategoryGroup>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT id, name, group_type
            FROM categories
            ORDER BY CASE group_type WHEN $1 THEN 0 ELSE 1 END, group_type, position
            "#,
        )
        .bind(USED_GOODS)
        .fetch_all(&self.pool)
        .await?;

        let mut groups: Vec<CategoryGroup> = Vec::new();
        for row in rows {
            let category = Category {
                id: row.id,
                name: row.name,
            };
            match groups.last_mut() {
                Some(group) if group.group_type == row.group_type => {
                    group.categories.push(category)
                }
                _ => groups.push(CategoryGroup {
                    group_type: row.group_type,
                    categories: vec![category],
                }),
            }
        }

        Ok(groups)
    }

    async fn seed_defaults(&self) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            return Ok(0);
        }

        let mut inserted = 0;
        for group in default_groups() {
            for (position, category) in group.categories.iter().enumerate() {
                let result = sqlx::query(
                    r#"
                    INSERT INTO categories (id, name, group_type, position)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT DO NOTHING
                    "#,
                )
                .bind(category.id)
                .bind(&category.name)
                .bind(&group.group_type)
                .bind(position as i32)
                .execute(&mut *tx)
                .await?;
                inserted += result.rows_affected();
            }
        }

        tx.commit().await?;
        tracing::info!(inserted, "Seeded default categories");
        Ok(inserted)
    }
}
