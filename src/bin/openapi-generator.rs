//! Print the OpenAPI document as JSON, for client generation.

use utoipa::OpenApi;
use whose_song_back::services::documentation::ApiDoc;

fn main() -> Result<(), serde_json::Error> {
    println!("{}", ApiDoc::openapi().to_pretty_json()?);
    Ok(())
}
