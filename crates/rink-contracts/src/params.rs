use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::palette::{generate_palette, ColorSlots};
use crate::styles::{Style, StyleCatalog};
use crate::text::truncate_text;

pub const MAX_COLORS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamsError {
    #[error("Subject text is required")]
    EmptyText,
    #[error("At least one color is required")]
    EmptyColors,
    #[error("At most {max} colors are supported (got {count})")]
    TooManyColors { count: usize, max: usize },
    #[error("Unknown style '{0}'")]
    UnknownStyle(String),
    #[error("Invalid mode '{0}'; expected 2D or 3D")]
    InvalidMode(String),
    #[error("Unsupported sport '{0}'")]
    UnknownSport(String),
    #[error("Reference image is not a base64 data URI: {0}")]
    InvalidReference(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sport {
    #[default]
    Hockey,
}

pub const PRESET_SPORTS: &[Sport] = &[Sport::Hockey];

impl Sport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Hockey => "Hockey",
        }
    }

    pub fn theme(&self) -> &'static str {
        match self {
            Sport::Hockey => "Ice Hockey Theme",
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sport {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PRESET_SPORTS
            .iter()
            .copied()
            .find(|sport| sport.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParamsError::UnknownSport(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderMode {
    #[default]
    #[serde(rename = "2D")]
    TwoD,
    #[serde(rename = "3D")]
    ThreeD,
}

impl RenderMode {
    pub const ALL: [RenderMode; 2] = [RenderMode::TwoD, RenderMode::ThreeD];

    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::TwoD => "2D",
            RenderMode::ThreeD => "3D",
        }
    }

    pub fn choose<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderMode {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "2D" => Ok(RenderMode::TwoD),
            "3D" => Ok(RenderMode::ThreeD),
            _ => Err(ParamsError::InvalidMode(s.to_string())),
        }
    }
}

/// A reference image held in its transport form, a `data:<mime>;base64,<payload>` URI.
///
/// Construction validates the header and the payload, so a `ReferenceImage` always
/// decodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ReferenceImage {
    data_uri: String,
}

impl ReferenceImage {
    pub fn from_data_uri(raw: impl Into<String>) -> Result<Self, ParamsError> {
        let data_uri = raw.into().trim().to_string();
        let Some((header, payload)) = data_uri.split_once(',') else {
            return Err(ParamsError::InvalidReference(
                "missing payload separator".to_string(),
            ));
        };
        if !header.starts_with("data:") || !header.ends_with(";base64") {
            return Err(ParamsError::InvalidReference(format!(
                "unexpected header '{}'",
                truncate_text(header, 48)
            )));
        }
        if payload.is_empty() {
            return Err(ParamsError::InvalidReference("empty payload".to_string()));
        }
        BASE64
            .decode(payload.as_bytes())
            .map_err(|err| ParamsError::InvalidReference(err.to_string()))?;
        Ok(Self { data_uri })
    }

    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Self {
        Self {
            data_uri: format!("data:{mime_type};base64,{}", BASE64.encode(bytes)),
        }
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
        if bytes.is_empty() {
            anyhow::bail!("reference image {} is empty", path.display());
        }
        Ok(Self::from_bytes(&bytes, mime_for_path(path)))
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    pub fn mime_type(&self) -> &str {
        self.data_uri
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .filter(|mime| !mime.is_empty())
            .unwrap_or("image/png")
    }

    /// Base64 payload with the transport header stripped.
    pub fn payload(&self) -> &str {
        self.data_uri
            .split_once(',')
            .map(|(_, payload)| payload)
            .unwrap_or_default()
    }

    pub fn decode(&self) -> Option<Vec<u8>> {
        BASE64.decode(self.payload().as_bytes()).ok()
    }
}

impl From<ReferenceImage> for String {
    fn from(image: ReferenceImage) -> Self {
        image.data_uri
    }
}

impl TryFrom<String> for ReferenceImage {
    type Error = ParamsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_data_uri(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignParams {
    pub text: String,
    pub sport: Sport,
    pub colors: String,
    pub style: Style,
    pub mode: RenderMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<ReferenceImage>,
}

impl Default for DesignParams {
    fn default() -> Self {
        Self {
            text: String::new(),
            sport: Sport::default(),
            colors: ColorSlots::default().colors_string(),
            style: Style::default(),
            mode: RenderMode::default(),
            reference_image: None,
        }
    }
}

impl DesignParams {
    pub fn text_lines(&self) -> Vec<&str> {
        self.text.lines().collect()
    }

    pub fn color_list(&self) -> Vec<&str> {
        split_colors(&self.colors)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.text.trim().is_empty() {
            return Err(ParamsError::EmptyText);
        }
        let count = self.color_list().len();
        if count == 0 {
            return Err(ParamsError::EmptyColors);
        }
        if count > MAX_COLORS {
            return Err(ParamsError::TooManyColors {
                count,
                max: MAX_COLORS,
            });
        }
        Ok(())
    }

    pub fn can_submit(&self) -> bool {
        self.validate().is_ok()
    }

    /// Copy of these params with a random style, mode and palette (1 to 10 colors).
    /// Text, sport and reference image carry over. The palette is returned as well so
    /// callers can load it into their color slots.
    pub fn randomized<R: Rng + ?Sized>(&self, rng: &mut R) -> (DesignParams, Vec<&'static str>) {
        let style = StyleCatalog::global().choose(rng);
        let mode = RenderMode::choose(rng);
        let count = rng.gen_range(1..=MAX_COLORS);
        let palette = generate_palette(count, rng);
        let params = DesignParams {
            style,
            mode,
            colors: join_colors(&palette),
            ..self.clone()
        };
        (params, palette)
    }
}

pub fn split_colors(colors: &str) -> Vec<&str> {
    colors
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect()
}

pub fn join_colors<S: AsRef<str>>(colors: &[S]) -> String {
    colors
        .iter()
        .map(|color| color.as_ref())
        .collect::<Vec<&str>>()
        .join(", ")
}

fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "image/png",
    }
}
