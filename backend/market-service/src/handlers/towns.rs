/// Town handlers - nearby-area lookup and reverse geocoding
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::neighborhood::ProximityResolver;
use crate::services::GeocodingClient;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TownsQuery {
    pub town: String,
    pub town_range: i64,
}

#[derive(Debug, Serialize)]
pub struct TownsResponse {
    pub towns: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CoordinatesQuery {
    pub lon: Option<f64>,
    pub lat: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct TownNameResponse {
    pub result: String,
}

/// Hop radius from a query string. Unlike the pagination inputs it is never
/// coerced: a negative value is a parameter fault.
pub(crate) fn parse_town_range(raw: i64) -> Result<u32> {
    if raw < 0 {
        return Err(AppError::BadRequest(
            "townRange must be a non-negative integer".to_string(),
        ));
    }
    Ok(u32::try_from(raw).unwrap_or(u32::MAX))
}

/// Areas within `townRange` hops of `town`, nearest first
pub async fn nearby_towns(
    resolver: web::Data<ProximityResolver>,
    query: web::Query<TownsQuery>,
) -> Result<HttpResponse> {
    let radius = parse_town_range(query.town_range)?;
    let areas = resolver.resolve(&query.town, radius)?;
    Ok(HttpResponse::Ok().json(TownsResponse {
        towns: areas.into_vec(),
    }))
}

/// Town name for a coordinate pair
pub async fn town_name(
    geocoding: web::Data<GeocodingClient>,
    query: web::Query<CoordinatesQuery>,
) -> Result<HttpResponse> {
    let (Some(lon), Some(lat)) = (query.lon, query.lat) else {
        return Err(AppError::BadRequest("lon or lat is empty".to_string()));
    };

    let result = geocoding.town_name(lon, lat).await?;
    Ok(HttpResponse::Ok().json(TownNameResponse { result }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_town_range_accepts_zero_and_positive() {
        assert_eq!(parse_town_range(0).unwrap(), 0);
        assert_eq!(parse_town_range(3).unwrap(), 3);
    }

    #[test]
    fn test_negative_town_range_is_rejected() {
        assert!(matches!(parse_town_range(-1), Err(AppError::BadRequest(_))));
    }
}
