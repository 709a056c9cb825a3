//! Print the CAPCO OpenAPI document as JSON, for client generation and CI diffs.
use server::openapi::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), serde_json::Error> {
    let doc = ApiDoc::openapi().to_pretty_json()?;
    println!("{doc}");
    Ok(())
}
