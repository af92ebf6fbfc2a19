use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::ImageFormat;
use reqwest::blocking::Client;
use rink_contracts::history::GeneratedResult;
use rink_contracts::text::truncate_text;

const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Resolves a result's image URL to raw bytes. Data URIs are decoded in place;
/// `http(s)` URLs are fetched.
pub fn image_url_bytes(image_url: &str) -> Result<Vec<u8>> {
    let trimmed = image_url.trim();
    if let Some(rest) = trimmed.strip_prefix("data:") {
        let Some((header, payload)) = rest.split_once(',') else {
            bail!("malformed data URI: missing ',' separator");
        };
        if !header.ends_with(";base64") {
            bail!("unsupported data URI encoding ({header})");
        }
        return BASE64
            .decode(payload.trim().as_bytes())
            .context("data URI payload is not valid base64");
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return fetch_bytes(trimmed);
    }
    bail!("unsupported image URL: {}", truncate_text(trimmed, 64))
}

fn fetch_bytes(url: &str) -> Result<Vec<u8>> {
    let http = Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;
    let response = http
        .get(url)
        .send()
        .with_context(|| format!("failed downloading image ({url})"))?;
    if !response.status().is_success() {
        let code = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        bail!("image download failed ({code}): {}", truncate_text(&body, 512));
    }
    Ok(response
        .bytes()
        .context("failed reading image bytes")?
        .to_vec())
}

/// Returns PNG bytes for any image the `image` crate can read. PNG input is
/// passed through untouched.
pub fn png_bytes(bytes: &[u8]) -> Result<Vec<u8>> {
    let format = image::guess_format(bytes).context("unrecognized image data")?;
    if format == ImageFormat::Png {
        return Ok(bytes.to_vec());
    }
    let decoded = image::load_from_memory_with_format(bytes, format)
        .with_context(|| format!("failed to decode {format:?} image"))?;
    let mut out = Cursor::new(Vec::new());
    decoded
        .write_to(&mut out, ImageFormat::Png)
        .context("failed to encode PNG")?;
    Ok(out.into_inner())
}

/// Writes `result` into `dir` as `sport-print-style-<n>-<id>.png`.
pub fn save_png(result: &GeneratedResult, dir: &Path) -> Result<PathBuf> {
    let bytes = image_url_bytes(&result.image_url)?;
    let png = png_bytes(&bytes)?;
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(result.download_file_name());
    fs::write(&path, png).with_context(|| format!("failed to save {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Cursor;

    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use image::{ImageFormat, Rgb, RgbImage};
    use rink_contracts::history::GeneratedResult;
    use rink_contracts::params::DesignParams;
    use rink_contracts::styles::StyleCatalog;

    use super::{image_url_bytes, png_bytes, save_png};

    fn encoded(format: ImageFormat) -> anyhow::Result<Vec<u8>> {
        let image = RgbImage::from_pixel(4, 4, Rgb([239, 68, 68]));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, format)?;
        Ok(out.into_inner())
    }

    #[test]
    fn data_uri_decodes_payload() -> anyhow::Result<()> {
        let uri = format!("data:image/png;base64,{}", BASE64.encode(b"abc"));
        assert_eq!(image_url_bytes(&uri)?, b"abc".to_vec());
        assert!(image_url_bytes("data:image/png,abc").is_err());
        assert!(image_url_bytes("ftp://example.com/a.png").is_err());
        Ok(())
    }

    #[test]
    fn jpeg_is_reencoded_as_png() -> anyhow::Result<()> {
        let jpeg = encoded(ImageFormat::Jpeg)?;
        let png = png_bytes(&jpeg)?;
        assert_eq!(image::guess_format(&png)?, ImageFormat::Png);
        assert_eq!(image::load_from_memory(&png)?.width(), 4);
        assert!(png_bytes(b"not an image").is_err());
        Ok(())
    }

    #[test]
    fn save_png_uses_style_number_and_id() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let png = encoded(ImageFormat::Png)?;
        let result = GeneratedResult {
            id: "1718000000000".to_string(),
            image_url: format!("data:image/png;base64,{}", BASE64.encode(&png)),
            params: DesignParams {
                style: StyleCatalog::global().get(7).unwrap_or_default(),
                ..DesignParams::default()
            },
            created_at: 1_718_000_000_000,
            prompt: "prompt".to_string(),
        };

        let path = save_png(&result, &temp.path().join("out"))?;
        assert_eq!(
            path.file_name().and_then(|name| name.to_str()),
            Some("sport-print-style-7-1718000000000.png")
        );
        assert_eq!(fs::read(&path)?, png);
        Ok(())
    }
}
