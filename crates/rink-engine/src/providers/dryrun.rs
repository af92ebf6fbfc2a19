use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use super::{ImageProvider, ProviderError, ProviderRequest, ProviderResponse, ResponsePart};

const DRYRUN_SIZE: u32 = 512;
const PALETTE_MARKER: &str = "Use STRICTLY the following colors:";

/// Offline provider: answers with a solid square in the first requested color.
pub struct DryrunProvider;

impl ImageProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let (r, g, b) =
            palette_color(&request.prompt).unwrap_or_else(|| color_from_prompt(&request.prompt));
        let image = RgbImage::from_pixel(DRYRUN_SIZE, DRYRUN_SIZE, Rgb([r, g, b]));
        let mut encoded = Cursor::new(Vec::new());
        image
            .write_to(&mut encoded, ImageFormat::Png)
            .map_err(|err| ProviderError::service(format!("dryrun image encode failed: {err}")))?;

        Ok(ProviderResponse {
            provider_request: map_object(json!({
                "endpoint": "dryrun-native",
                "model": request.model,
                "aspect_ratio": request.aspect_ratio,
                "has_attachment": request.attachment.is_some(),
            })),
            parts: vec![
                ResponsePart::Text(format!("dryrun #{r:02X}{g:02X}{b:02X}")),
                ResponsePart::InlineImage {
                    mime_type: Some("image/png".to_string()),
                    data: BASE64.encode(encoded.into_inner()),
                },
            ],
        })
    }
}

fn palette_color(prompt: &str) -> Option<(u8, u8, u8)> {
    let line = prompt
        .lines()
        .find_map(|line| line.trim().strip_prefix(PALETTE_MARKER))?;
    line.split(',').find_map(|token| parse_hex(token.trim().trim_end_matches('.')))
}

fn parse_hex(token: &str) -> Option<(u8, u8, u8)> {
    let hex = token.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |idx: usize| u8::from_str_radix(&hex[idx..idx + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

fn color_from_prompt(prompt: &str) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}

fn map_object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
