use super::TileSource;
use crate::error::AddressingError;
use crate::scope::Headers;

/// Tile source with one URL per tile.
///
/// The template may contain `{level}`, `{x}` and `{y}` placeholders, e.g.
/// `https://tiles.example.com/image_files/{level}/{x}_{y}.jpg`.
#[derive(Debug, Clone)]
pub struct TemplateTileSource {
    template: String,
    headers: Option<Headers>,
}

impl TemplateTileSource {
    /// Create a source from a URL template.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            headers: None,
        }
    }

    /// Send `headers` with every tile.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }
}

impl TileSource for TemplateTileSource {
    fn tile_url(&self, level: usize, column: usize, row: usize) -> String {
        self.template
            .replace("{level}", &level.to_string())
            .replace("{x}", &column.to_string())
            .replace("{y}", &row.to_string())
    }

    fn tile_headers(
        &self,
        _level: usize,
        _column: usize,
        _row: usize,
    ) -> Result<Option<Headers>, AddressingError> {
        Ok(self.headers.clone())
    }
}
