use crate::http::routes::*;
use crate::http::types::{WebhookPayload, WebhookResponse};
use utoipa::Modify;

#[derive(utoipa::OpenApi)]
#[openapi(
    tags(
        (name = "System", description = "Liveness checks"),
        (name = "Webhook", description = "Speech input relayed to the completion API")
    ),
    paths(health, webhook),
    components(schemas(WebhookPayload, WebhookResponse)),
    modifiers(&OpenApiModifier)
)]
pub struct ApiDoc;

struct OpenApiModifier;
impl Modify for OpenApiModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info = utoipa::openapi::InfoBuilder::new()
            .title("Speech Relay")
            .version(crate::VERSION)
            .description(Some(env!("CARGO_PKG_DESCRIPTION")))
            .license(Some(
                utoipa::openapi::LicenseBuilder::new()
                    .name(env!("CARGO_PKG_LICENSE"))
                    .url(Some(format!(
                        "https://spdx.org/licenses/{}.html",
                        env!("CARGO_PKG_LICENSE")
                    )))
                    .build(),
            ))
            .build();
    }
}
