/// OpenAPI documentation for Market Service
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Market Service API",
        version = "1.0.0",
        description = "Neighborhood classifieds: location-scoped infinite-scroll feed, post lifecycle (selling, reserved, sold), two-level comment threads, categories, image storage and search-term ranking.",
        contact(
            name = "Groom Market Team",
            email = "team@groom.market"
        ),
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Development server"),
    ),
    tags(
        (name = "health", description = "Service health checks"),
        (name = "posts", description = "Feed, post lifecycle, likes and reports"),
        (name = "comments", description = "Two-level comment threads"),
        (name = "towns", description = "Nearby-area lookup and reverse geocoding"),
        (name = "categories", description = "Listing categories by board"),
        (name = "images", description = "Post image upload and fetch"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("HS256 access token"))
                    .build(),
            ),
        )
    }
}

impl ApiDoc {
    pub fn openapi_json_path() -> &'static str {
        "/api/v1/openapi.json"
    }
}
