/// Category handlers
use actix_web::{web, HttpResponse};
use std::sync::Arc;

use crate::db::CategoryStore;
use crate::error::Result;

/// All categories grouped by board
pub async fn list_categories(
    categories: web::Data<Arc<dyn CategoryStore>>,
) -> Result<HttpResponse> {
    let groups = categories.list_groups().await?;
    Ok(HttpResponse::Ok().json(groups))
}
