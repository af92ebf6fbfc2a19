use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rink_contracts::history::{GeneratedResult, HistoryStore};
use rink_contracts::palette::ColorSlots;
use rink_contracts::params::{
    split_colors, DesignParams, ParamsError, ReferenceImage, RenderMode, MAX_COLORS,
};
use rink_contracts::styles::{Style, StyleCatalog};
use serde_json::{json, Map, Value};

use crate::download::save_png;
use crate::error::GenerateError;
use crate::orchestrator::DesignEngine;

/// One studio sitting: the params being edited, their color slots, the result
/// history and the current error banner.
///
/// A failed generation only sets the banner. History changes on success and on
/// explicit delete, nothing else.
pub struct StudioSession {
    engine: DesignEngine,
    params: DesignParams,
    slots: ColorSlots,
    history: HistoryStore,
    error: Option<String>,
    rng: StdRng,
}

impl StudioSession {
    pub fn new(engine: DesignEngine) -> Self {
        Self::with_rng(engine, StdRng::from_entropy())
    }

    pub fn with_seed(engine: DesignEngine, seed: u64) -> Self {
        Self::with_rng(engine, StdRng::seed_from_u64(seed))
    }

    fn with_rng(engine: DesignEngine, rng: StdRng) -> Self {
        let slots = ColorSlots::default();
        let params = DesignParams {
            colors: slots.colors_string(),
            ..DesignParams::default()
        };
        Self {
            engine,
            params,
            slots,
            history: HistoryStore::new(),
            error: None,
            rng,
        }
    }

    pub fn engine(&self) -> &DesignEngine {
        &self.engine
    }

    pub fn params(&self) -> &DesignParams {
        &self.params
    }

    pub fn slots(&self) -> &ColorSlots {
        &self.slots
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn displayed(&self) -> Option<&GeneratedResult> {
        self.history.displayed()
    }

    pub fn set_text(&mut self, text: &str) {
        self.params.text = text.to_string();
    }

    /// Replaces the palette with a typed color list; the slot count follows the list.
    pub fn set_colors(&mut self, raw: &str) -> Result<(), ParamsError> {
        let colors = split_colors(raw);
        if colors.is_empty() {
            return Err(ParamsError::EmptyColors);
        }
        if colors.len() > MAX_COLORS {
            return Err(ParamsError::TooManyColors {
                count: colors.len(),
                max: MAX_COLORS,
            });
        }
        self.slots.load_palette(&colors);
        self.sync_colors();
        Ok(())
    }

    pub fn set_count(&mut self, count: usize) -> usize {
        let count = self.slots.set_count(count);
        self.sync_colors();
        count
    }

    pub fn set_slot(&mut self, index: usize, color: &str) -> bool {
        let changed = self.slots.set_slot(index, color);
        self.sync_colors();
        changed
    }

    pub fn auto_palette(&mut self) -> Vec<&'static str> {
        let palette = self.slots.auto_fill(&mut self.rng);
        self.sync_colors();
        self.log(
            "palette_generated",
            map_object(json!({
                "count": palette.len(),
                "colors": palette,
            })),
        );
        palette
    }

    pub fn set_style(&mut self, input: &str) -> Result<Style, ParamsError> {
        let style = StyleCatalog::global()
            .resolve(input)
            .ok_or_else(|| ParamsError::UnknownStyle(input.trim().to_string()))?;
        self.params.style = style;
        Ok(style)
    }

    pub fn set_mode(&mut self, input: &str) -> Result<RenderMode, ParamsError> {
        let mode = input.parse::<RenderMode>()?;
        self.params.mode = mode;
        Ok(mode)
    }

    pub fn set_reference_path(&mut self, path: &Path) -> Result<()> {
        let reference = ReferenceImage::from_path(path)?;
        self.params.reference_image = Some(reference);
        Ok(())
    }

    pub fn clear_reference(&mut self) {
        self.params.reference_image = None;
    }

    pub fn can_generate(&self) -> bool {
        self.params.can_submit() && !self.engine.is_busy()
    }

    pub fn generate(&mut self) -> Result<&GeneratedResult, GenerateError> {
        let params = self.params.clone();
        self.run(params)
    }

    /// Picks a random style, mode and palette, loads them into the editor and
    /// generates with them straight away.
    pub fn randomize(&mut self) -> Result<&GeneratedResult, GenerateError> {
        let (params, palette) = self.params.randomized(&mut self.rng);
        self.slots.load_palette(&palette);
        self.params = params.clone();
        self.log(
            "palette_generated",
            map_object(json!({
                "count": palette.len(),
                "colors": palette,
                "style": params.style.label(),
                "mode": params.mode.as_str(),
            })),
        );
        self.run(params)
    }

    fn run(&mut self, params: DesignParams) -> Result<&GeneratedResult, GenerateError> {
        self.error = None;
        match self.engine.submit(&params) {
            Ok(result) => Ok(self.history.prepend(result)),
            Err(err) => {
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn select(&mut self, id: &str) -> Option<&GeneratedResult> {
        self.history.select(id)
    }

    pub fn delete(&mut self, id: &str) -> Option<GeneratedResult> {
        let removed = self.history.delete(id)?;
        self.log(
            "history_deleted",
            map_object(json!({
                "result_id": removed.id,
                "remaining": self.history.len(),
            })),
        );
        Some(removed)
    }

    pub fn copy_prompt(&self) -> Option<&str> {
        self.displayed().map(|result| result.prompt.as_str())
    }

    /// Saves the displayed result, or the one named by `id`, as a PNG under `dir`.
    pub fn download(&self, id: Option<&str>, dir: &Path) -> Result<PathBuf> {
        let result = match id {
            Some(id) => self
                .history
                .get(id)
                .with_context(|| format!("no result with id {id}"))?,
            None => match self.displayed() {
                Some(result) => result,
                None => bail!("nothing is displayed; generate or select a result first"),
            },
        };
        let path = save_png(result, dir)?;
        self.log(
            "result_downloaded",
            map_object(json!({
                "result_id": result.id,
                "path": path.to_string_lossy(),
            })),
        );
        Ok(path)
    }

    pub fn prompt_diff(&self, from_id: &str, to_id: &str) -> Option<Vec<String>> {
        self.history.prompt_diff(from_id, to_id)
    }

    fn sync_colors(&mut self) {
        self.params.colors = self.slots.colors_string();
    }

    fn log(&self, event_type: &str, payload: Map<String, Value>) {
        if let Err(err) = self.engine.events().emit(event_type, payload) {
            eprintln!("rink: failed to record {event_type} event: {err:#}");
        }
    }
}

fn map_object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
