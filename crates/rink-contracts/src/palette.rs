use rand::seq::SliceRandom;
use rand::Rng;

use crate::params::{join_colors, MAX_COLORS};

pub const WHITE: &str = "#FFFFFF";
pub const BLACK: &str = "#000000";

/// Curated sport colors the generator draws from. White and black are part of the
/// pool and also get their own bias below.
pub const SPORTS_PALETTE_POOL: [&str; 14] = [
    "#EF4444", // red
    BLACK,
    WHITE,
    "#1E3A8A", // navy
    "#F59E0B", // gold
    "#10B981", // emerald
    "#F97316", // orange
    "#6366F1", // indigo
    "#8B5CF6", // violet
    "#EC4899", // pink
    "#14B8A6", // teal
    "#94A3B8", // silver
    "#78350F", // brown
    "#881337", // maroon
];

pub const DEFAULT_COLORS: [&str; MAX_COLORS] = [
    "#ef4444", "#000000", "#ffffff", "#fbbf24", "#3b82f6", "#10b981", "#8b5cf6", "#f97316",
    "#ec4899", "#64748b",
];

pub const DEFAULT_COLOR_COUNT: usize = 2;

const NEUTRAL_BIAS: f64 = 0.6;

/// Builds `count` distinct colors (clamped to `1..=MAX_COLORS`).
///
/// A base color is drawn from the pool, then white and black are each favoured
/// until present, then the pool is sampled with reject-on-duplicate. The result is
/// shuffled, so position 0 is not necessarily the base color.
pub fn generate_palette<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<&'static str> {
    let count = count.clamp(1, MAX_COLORS);
    let mut colors: Vec<&'static str> = Vec::with_capacity(count);
    colors.push(pick(rng));

    while colors.len() < count {
        if !colors.contains(&WHITE) && rng.gen_bool(NEUTRAL_BIAS) {
            colors.push(WHITE);
            continue;
        }
        if !colors.contains(&BLACK) && rng.gen_bool(NEUTRAL_BIAS) {
            colors.push(BLACK);
            continue;
        }
        let candidate = pick(rng);
        if !colors.contains(&candidate) {
            colors.push(candidate);
        }
    }

    if colors.len() > 1 {
        colors.shuffle(rng);
    }
    colors
}

fn pick<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    SPORTS_PALETTE_POOL[rng.gen_range(0..SPORTS_PALETTE_POOL.len())]
}

/// The ten editable color slots behind the params `colors` string; only the first
/// `count` are active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorSlots {
    slots: Vec<String>,
    count: usize,
}

impl Default for ColorSlots {
    fn default() -> Self {
        Self {
            slots: DEFAULT_COLORS.iter().map(|color| color.to_string()).collect(),
            count: DEFAULT_COLOR_COUNT,
        }
    }
}

impl ColorSlots {
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    pub fn active(&self) -> &[String] {
        &self.slots[..self.count]
    }

    pub fn colors_string(&self) -> String {
        join_colors(self.active())
    }

    pub fn set_count(&mut self, count: usize) -> usize {
        self.count = count.clamp(1, MAX_COLORS);
        self.count
    }

    pub fn set_slot(&mut self, index: usize, color: &str) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = color.trim().to_string();
                true
            }
            None => false,
        }
    }

    /// Replaces the active slots with a fresh palette and leaves the inactive ones
    /// untouched.
    pub fn auto_fill<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<&'static str> {
        let palette = generate_palette(self.count, rng);
        for (slot, color) in self.slots.iter_mut().zip(palette.iter()) {
            *slot = color.to_string();
        }
        palette
    }

    /// Adopts `palette` as the active colors; remaining slots fall back to the
    /// defaults.
    pub fn load_palette(&mut self, palette: &[&str]) {
        if palette.is_empty() {
            return;
        }
        let count = palette.len().min(MAX_COLORS);
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            *slot = match palette.get(idx).filter(|_| idx < count) {
                Some(color) => color.to_string(),
                None => DEFAULT_COLORS[idx].to_string(),
            };
        }
        self.count = count;
    }
}
