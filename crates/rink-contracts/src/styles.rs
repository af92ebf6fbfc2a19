//! Closed catalog of visual styles.
//!
//! Every style carries a stable number that is rendered as a "NN. Name" label and
//! parsed back out of that label later (download file names), so lookups always go
//! through the number, never through list position.

use std::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_STYLE_NUMBER: u16 = 25;

const STYLE_NAMES: &[(u16, &str)] = &[
    (1, "Vintage Collegiate"),
    (2, "70s Retro Jersey"),
    (3, "Classic Varsity Script"),
    (4, "Heritage Crest"),
    (5, "Old School Tattoo"),
    (6, "Letterman Jacket Patch"),
    (7, "Victorian Athletic"),
    (8, "Distressed Rubber Stamp"),
    (9, "Vintage Beer Label"),
    (10, "Felt Pennant Style"),
    (11, "Vintage Trading Card"),
    (12, "1920s Art Deco"),
    (13, "50s Mid-Century Modern"),
    (14, "Prohibition Era Whiskey Label"),
    (15, "Union Made Label Badge"),
    (16, "Vintage Newspaper Headline"),
    (17, "80s Synthwave & Neon"),
    (18, "90s Grunge & Flannel"),
    (19, "Y2K Chrome & Blobs"),
    (20, "70s Disco Funk"),
    (21, "60s Space Age Atomic"),
    (22, "Wild West Saloon"),
    (23, "Roaring 20s Gatsby"),
    (24, "60s Psychedelic Rock"),
    (25, "Modern Athletic"),
    (26, "Minimalist Tech"),
    (27, "Futuristic Esports"),
    (28, "Clean Corporate Identity"),
    (29, "Digital Glitch Art"),
    (30, "Cyberpunk HUD"),
    (31, "3D Wireframe"),
    (32, "Electronic Circuit"),
    (33, "Quantum Physics Abstract"),
    (34, "Sacred Geometry"),
    (35, "Holographic Projection"),
    (36, "AR Interface Overlay"),
    (37, "Digital Data Pattern"),
    (38, "Glossy App Icon"),
    (39, "Flat UI Design"),
    (40, "Aggressive Mascot"),
    (41, "Heavy Bold Slab"),
    (42, "Heavy Block Shadow"),
    (43, "Gritty Grunge Texture"),
    (44, "Shattered Glass"),
    (45, "Trash Polka"),
    (46, "Death Metal Band Logo"),
    (47, "Industrial Warning"),
    (48, "Urban Decay"),
    (49, "Caution Hazard Stripes"),
    (50, "Military Stencil Ops"),
    (51, "Biomechanical Giger Style"),
    (52, "Toxic Waste Barrel"),
    (53, "Barbed Wire & Chain"),
    (54, "Street Graffiti"),
    (55, "Hand Lettered Script"),
    (56, "Pencil Sketch"),
    (57, "Comic Book Action"),
    (58, "Pop Art halftone"),
    (59, "Stipple Shading"),
    (60, "Watercolor Splash"),
    (61, "Rorschach Ink Blot"),
    (62, "Paper Folded Origami"),
    (63, "Low Poly 3D"),
    (64, "Voxel Block Art"),
    (65, "Japanese Woodblock Print"),
    (66, "Film Noir High Contrast"),
    (67, "Thick Impasto Oil Paint"),
    (68, "Dreamy Haze"),
    (69, "Technical Blueprint"),
    (70, "Tile Mosaic"),
    (71, "Cathedral Stained Glass"),
    (72, "Engraving Style"),
    (73, "Dotwork"),
    (74, "Embroidered Patch Effect"),
    (75, "Brushed Metal"),
    (76, "Ice Chrome 3D"),
    (77, "Frosted Ice Effect"),
    (78, "Coach Chalkboard"),
    (79, "Neon Cyberpunk"),
    (80, "Wood Carved"),
    (81, "Stone Chiseled"),
    (82, "Denim Texture"),
    (83, "Carbon Fiber"),
    (84, "Gold Foil Stamp"),
    (85, "Embossed Leather"),
    (86, "Medieval Chainmail"),
    (87, "Italian Marble"),
    (88, "Diamond Encrusted"),
    (89, "Rusted Corroded Metal"),
    (90, "Damascus Steel Pattern"),
    (91, "Crushed Velvet Texture"),
    (92, "Knitted Winter Sweater"),
    (93, "Corrugated Cardboard"),
    (94, "Duct Tape DIY"),
    (95, "Engulfed in Flames"),
    (96, "Electric Lightning Storm"),
    (97, "Crashing Ocean Waves"),
    (98, "Overgrown Forest Moss"),
    (99, "Molten Lava Rock"),
    (100, "Toxic Slime Ooze"),
    (101, "Ethereal Smoke Vapor"),
    (102, "Jagged Crystal Shards"),
    (103, "Desert Sandstorm"),
    (104, "Tropical Palm Leaves"),
    (105, "Cosmic Space Nebula"),
    (106, "Scratched Rink Ice"),
    (107, "Vulcanized Rubber"),
    (108, "Goal Net Texture"),
    (109, "Zamboni Ice Trail"),
    (110, "Winter Classic Felt"),
    (111, "Locker Room Steel Mesh"),
    (112, "Hockey Stick Tape Job"),
    (113, "Championship Ring Bling"),
    (114, "Vintage Dot Matrix Scoreboard"),
    (115, "Penalty Box Glass Reflections"),
    (116, "Cracked Frozen Pond Natural"),
    (117, "Airbrushed Goalie Mask Art"),
    (118, "90s Hockey Card Hologram"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct Style {
    number: u16,
    name: &'static str,
}

impl Style {
    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn label(&self) -> String {
        format!("{}. {}", self.number, self.name)
    }
}

impl Default for Style {
    fn default() -> Self {
        StyleCatalog::global().default_style()
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.number, self.name)
    }
}

impl From<Style> for String {
    fn from(style: Style) -> Self {
        style.label()
    }
}

impl TryFrom<String> for Style {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StyleCatalog::global()
            .resolve(&value)
            .ok_or_else(|| format!("unknown style '{value}'"))
    }
}

// Written by hand: a derive would tie `'de` to the `&'static str` name.
impl<'de> Deserialize<'de> for Style {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Style::try_from(label).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone)]
pub struct StyleCatalog {
    styles: IndexMap<u16, &'static str>,
}

impl StyleCatalog {
    pub fn new() -> Self {
        Self {
            styles: STYLE_NAMES.iter().copied().collect(),
        }
    }

    pub fn global() -> &'static StyleCatalog {
        static CATALOG: OnceLock<StyleCatalog> = OnceLock::new();
        CATALOG.get_or_init(StyleCatalog::new)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    pub fn get(&self, number: u16) -> Option<Style> {
        self.styles
            .get_key_value(&number)
            .map(|(number, name)| Style {
                number: *number,
                name: *name,
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = Style> + '_ {
        self.styles.iter().map(|(number, name)| Style {
            number: *number,
            name: *name,
        })
    }

    pub fn default_style(&self) -> Style {
        self.get(DEFAULT_STYLE_NUMBER)
            .or_else(|| self.iter().next())
            .unwrap_or(Style {
                number: DEFAULT_STYLE_NUMBER,
                name: "Modern Athletic",
            })
    }

    /// Accepts a bare number ("25"), a full label ("25. Modern Athletic") or a
    /// case-insensitive name ("modern athletic").
    pub fn resolve(&self, input: &str) -> Option<Style> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(number) = trimmed.parse::<u16>() {
            return self.get(number);
        }
        let number = style_number(trimmed);
        if number != 0 {
            let style = self.get(number)?;
            let rest = trimmed
                .split_once('.')
                .map(|(_, rest)| rest.trim())
                .unwrap_or_default();
            if rest.is_empty() || rest.eq_ignore_ascii_case(style.name) {
                return Some(style);
            }
            return None;
        }
        self.iter()
            .find(|style| style.name.eq_ignore_ascii_case(trimmed))
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Style {
        let idx = rng.gen_range(0..self.styles.len().max(1));
        self.iter()
            .nth(idx)
            .unwrap_or_else(|| self.default_style())
    }
}

impl Default for StyleCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Leading integer of a "NN. Name" label, or 0 when the label has none.
pub fn style_number(label: &str) -> u16 {
    let digits_len = label.chars().take_while(char::is_ascii_digit).count();
    if digits_len == 0 || !label[digits_len..].starts_with('.') {
        return 0;
    }
    label[..digits_len].parse().unwrap_or(0)
}
