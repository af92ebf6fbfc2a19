//! Prompt compiler: turns a validated [`DesignParams`] into the instruction text and
//! the optional image attachment sent to the image model.
//!
//! Compilation is pure. The same params always produce byte-identical prompt text,
//! and nothing here validates; callers reject bad params first.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rink_contracts::params::{DesignParams, RenderMode};

pub const RENDER_3D_DIRECTIVE: &str = "RENDER STYLE: 3D Render, volumetric lighting, realistic materials, depth of field, octane render, high fidelity textures.";

pub const FLAT_2D_DIRECTIVE: &str = "RENDER STYLE: 2D Flat Vector, clean lines, no shadows, no gradients, solid flat colors, SVG style, minimalistic.";

pub const REFERENCE_DIRECTIVE: &str = "REFERENCE IMAGE INSTRUCTION: A reference image has been provided. You MUST incorporate the subject/shape from this image into the design. Do NOT just paste it; REDRAW, STYLIZE and INTEGRATE it completely to match the requested Visual Style. The image should act as the mascot, icon, or texture within the typography composition.";

pub const NO_REFERENCE_DIRECTIVE: &str = "No reference image provided. Create a unique graphic element or mascot based on the text and sport context.";

const NO_SHADING_REQUIREMENT: &str =
    "9. This is a 2D design: ensure there is absolutely no shading or 3D effects.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPrompt {
    pub prompt: String,
    pub attachment: Option<Attachment>,
}

pub fn mode_directive(mode: RenderMode) -> &'static str {
    match mode {
        RenderMode::ThreeD => RENDER_3D_DIRECTIVE,
        RenderMode::TwoD => FLAT_2D_DIRECTIVE,
    }
}

pub fn reference_directive(has_reference: bool) -> &'static str {
    if has_reference {
        REFERENCE_DIRECTIVE
    } else {
        NO_REFERENCE_DIRECTIVE
    }
}

pub fn compile(params: &DesignParams) -> CompiledPrompt {
    let has_reference = params.reference_image.is_some();
    let mut lines: Vec<String> = vec![
        "Create a professional sports typography design.".to_string(),
        format!("Subject Text: \"{}\"", params.text),
        "NOTE: If the Subject Text contains newlines/multiple lines, strictly render the design with the text stacked vertically (one word/phrase per line) as requested.".to_string(),
        String::new(),
        format!(
            "Sport Context: {} ({})",
            params.sport.as_str(),
            params.sport.theme()
        ),
        format!("Visual Style: {}", params.style),
        format!("Mode: {}", params.mode),
        mode_directive(params.mode).to_string(),
        reference_directive(has_reference).to_string(),
        String::new(),
        "COLOR PALETTE INSTRUCTIONS:".to_string(),
        format!("Use STRICTLY the following colors: {}.", params.colors),
        "Do NOT use random colors. Apply the provided hex codes accurately.".to_string(),
        String::new(),
        "CRITICAL REQUIREMENTS:".to_string(),
        "1. The background MUST be PURE WHITE (#FFFFFF).".to_string(),
        "2. The design is a text-based print suitable for t-shirts or merchandise.".to_string(),
        "3. Use bold, dynamic fonts associated with the sport style.".to_string(),
        "4. High contrast between text and background.".to_string(),
        "5. Clean edges.".to_string(),
        "6. Center the design.".to_string(),
        "7. Isolate the design completely on the white background.".to_string(),
        "8. The colors provided must be the dominant colors of the graphic elements.".to_string(),
    ];
    if params.mode == RenderMode::TwoD {
        lines.push(NO_SHADING_REQUIREMENT.to_string());
    }

    let attachment = params.reference_image.as_ref().and_then(|image| {
        image.decode().map(|bytes| Attachment {
            mime_type: image.mime_type().to_string(),
            bytes,
        })
    });

    CompiledPrompt {
        prompt: lines.join("\n"),
        attachment,
    }
}

#[cfg(test)]
mod tests {
    use rink_contracts::params::{DesignParams, ReferenceImage, RenderMode};
    use rink_contracts::styles::StyleCatalog;

    use super::{
        compile, FLAT_2D_DIRECTIVE, NO_REFERENCE_DIRECTIVE, REFERENCE_DIRECTIVE,
        RENDER_3D_DIRECTIVE,
    };

    fn city_hockey() -> DesignParams {
        DesignParams {
            text: "CITY\nHOCKEY".to_string(),
            colors: "#EF4444, #000000".to_string(),
            style: StyleCatalog::global().get(25).unwrap_or_default(),
            mode: RenderMode::TwoD,
            ..DesignParams::default()
        }
    }

    #[test]
    fn flat_prompt_carries_literals_and_one_directive_each() {
        let compiled = compile(&city_hockey());
        let prompt = compiled.prompt.as_str();
        assert!(prompt.contains("Subject Text: \"CITY\nHOCKEY\""));
        assert!(prompt.contains("Use STRICTLY the following colors: #EF4444, #000000."));
        assert!(prompt.contains("#EF4444") && prompt.contains("#000000"));
        assert!(prompt.contains("Visual Style: 25. Modern Athletic"));
        assert!(prompt.contains("Sport Context: Hockey (Ice Hockey Theme)"));
        assert_eq!(prompt.matches(FLAT_2D_DIRECTIVE).count(), 1);
        assert!(!prompt.contains(RENDER_3D_DIRECTIVE));
        assert_eq!(prompt.matches(NO_REFERENCE_DIRECTIVE).count(), 1);
        assert!(!prompt.contains(REFERENCE_DIRECTIVE));
        assert!(prompt.contains("absolutely no shading"));
        assert!(prompt.contains("PURE WHITE (#FFFFFF)"));
        assert!(compiled.attachment.is_none());
    }

    #[test]
    fn render_mode_switches_directive() {
        let mut params = city_hockey();
        params.mode = RenderMode::ThreeD;
        let prompt = compile(&params).prompt;
        assert_eq!(prompt.matches(RENDER_3D_DIRECTIVE).count(), 1);
        assert!(!prompt.contains(FLAT_2D_DIRECTIVE));
        assert!(!prompt.contains("absolutely no shading"));
        assert!(prompt.contains("Mode: 3D"));
    }

    #[test]
    fn reference_image_becomes_attachment() {
        let mut params = city_hockey();
        params.reference_image = Some(ReferenceImage::from_bytes(&[9, 8, 7, 6], "image/webp"));
        let compiled = compile(&params);
        assert_eq!(compiled.prompt.matches(REFERENCE_DIRECTIVE).count(), 1);
        assert!(!compiled.prompt.contains(NO_REFERENCE_DIRECTIVE));
        let attachment = compiled.attachment.unwrap_or_else(|| panic!("missing attachment"));
        assert_eq!(attachment.mime_type, "image/webp");
        assert_eq!(attachment.bytes, vec![9, 8, 7, 6]);
        assert_eq!(attachment.to_base64(), "CQgHBg==");
        assert!(!compiled.prompt.contains("CQgHBg=="));
    }

    #[test]
    fn compilation_is_deterministic() {
        let params = city_hockey();
        let first = compile(&params);
        let second = compile(&params.clone());
        assert_eq!(first, second);
        assert_eq!(first.prompt.as_bytes(), second.prompt.as_bytes());
    }

    #[test]
    fn colors_string_is_passed_through_verbatim() {
        let mut params = city_hockey();
        params.colors = "#881337,#FFFFFF ,  #14B8A6".to_string();
        let prompt = compile(&params).prompt;
        assert!(prompt.contains("colors: #881337,#FFFFFF ,  #14B8A6."));
    }
}
