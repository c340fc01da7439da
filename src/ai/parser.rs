// Bundled parser for plain-text and markdown materials. Anything needing
// real document extraction (PDF, OCR) plugs in behind the same trait.

use async_trait::async_trait;

use crate::ai::DocumentParser;
use crate::error::ProviderError;

pub struct PlainTextParser;

#[async_trait]
impl DocumentParser for PlainTextParser {
    async fn extract_text(&self, file_ref: &str) -> Result<String, ProviderError> {
        let bytes = tokio::fs::read(file_ref)
            .await
            .map_err(|e| ProviderError::Permanent(format!("cannot read '{}': {}", file_ref, e)))?;
        String::from_utf8(bytes)
            .map_err(|_| ProviderError::Permanent(format!("'{}' is not valid UTF-8", file_ref)))
    }
}
