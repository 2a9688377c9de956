// ============================================================================
// HEAT SESSION: one source map, its field, ramp and undo histories
// ============================================================================

use std::sync::mpsc;

use image::RgbaImage;
use uuid::Uuid;

use crate::components::history::{History, MAX_HISTORY};
use crate::config::HeatConfig;
use crate::error::{HeatError, Result};
use crate::field::{FieldSnapshot, IntensityField, clamp_unit};
use crate::ops::brush::{BrushMode, BrushParams, CellRect, apply_brush};
use crate::ops::composite::{RenderParams, render_heatmap};
use crate::ops::extract::{ExtractOptions, Extraction, extract_intensity};
use crate::ops::ramp::ColorRamp;
use crate::ops::region_fill::{FillStats, auto_fill_region};

/// Result of a background extraction, tagged with the generation that
/// requested it.
struct ExtractionResult {
    generation: u64,
    options: ExtractOptions,
    result: Result<Extraction>,
}

/// Single editing session over one source image.
///
/// The session is the only writer of its field. Every edit that should be
/// undoable goes through a method here so the matching history entry is
/// recorded before the mutation.
pub struct Session {
    pub id: Uuid,
    source: RgbaImage,
    field: IntensityField,
    ramp: ColorRamp,
    render: RenderParams,
    brush: BrushParams,
    options: ExtractOptions,
    /// What the session was opened with; `reset` returns here.
    initial: HeatConfig,
    heat_history: History<FieldSnapshot>,
    ramp_history: History<ColorRamp>,

    /// Bumped by every extraction request. Only a background result carrying
    /// the current value is applied.
    generation: u64,
    /// True while the current generation is still running in the background.
    awaiting: bool,
    extraction_sender: mpsc::Sender<ExtractionResult>,
    extraction_receiver: mpsc::Receiver<ExtractionResult>,
}

impl Session {
    /// Open a session: validate the config and bootstrap the field.
    pub fn new(source: RgbaImage, config: &HeatConfig) -> Result<Self> {
        config.brush.validate()?;
        let options = config.extract_options();
        let extraction = extract_intensity(&source, &options)?;
        let (extraction_sender, extraction_receiver) = mpsc::channel();

        let session = Self {
            id: Uuid::new_v4(),
            source,
            field: extraction.field,
            ramp: config.ramp.clone(),
            render: config.render.clamped(),
            brush: config.brush,
            options,
            initial: config.clone(),
            heat_history: History::new(MAX_HISTORY),
            ramp_history: History::new(MAX_HISTORY),
            generation: 0,
            awaiting: false,
            extraction_sender,
            extraction_receiver,
        };
        log::info!(
            "session {} opened on {}x{} map",
            session.id,
            session.source.width(),
            session.source.height()
        );
        Ok(session)
    }

    // ---- accessors ---------------------------------------------------------

    pub fn source(&self) -> &RgbaImage {
        &self.source
    }

    pub fn field(&self) -> &IntensityField {
        &self.field
    }

    pub fn ramp(&self) -> &ColorRamp {
        &self.ramp
    }

    pub fn render_params(&self) -> RenderParams {
        self.render
    }

    pub fn brush_params(&self) -> BrushParams {
        self.brush
    }

    pub fn sensitivity(&self) -> f32 {
        self.options.sensitivity
    }

    pub fn can_undo_heat(&self) -> bool {
        self.heat_history.can_undo()
    }

    pub fn can_redo_heat(&self) -> bool {
        self.heat_history.can_redo()
    }

    pub fn can_undo_ramp(&self) -> bool {
        self.ramp_history.can_undo()
    }

    pub fn can_redo_ramp(&self) -> bool {
        self.ramp_history.can_redo()
    }

    pub fn heat_undo_count(&self) -> usize {
        self.heat_history.undo_count()
    }

    // ---- settings ----------------------------------------------------------

    pub fn set_render_params(&mut self, params: RenderParams) {
        self.render = params.clamped();
    }

    pub fn set_brush_params(&mut self, params: BrushParams) -> Result<()> {
        params.validate()?;
        self.brush = params;
        Ok(())
    }

    /// Change the detection sensitivity and re-extract synchronously.
    ///
    /// The new field replaces the old one outright, so heat history is
    /// cleared. Any background extraction still in flight becomes stale.
    pub fn set_sensitivity(&mut self, sensitivity: f32) -> Result<()> {
        let options = ExtractOptions {
            sensitivity: clamp_unit(sensitivity),
            ..self.options
        };
        let extraction = extract_intensity(&self.source, &options)?;
        self.generation = self.generation.wrapping_add(1);
        self.install(extraction, options);
        Ok(())
    }

    // ---- heat editing ------------------------------------------------------

    /// Record the field before a stroke. Call once per stroke, not per sample.
    pub fn begin_stroke(&mut self) {
        self.heat_history.push(self.field.snapshot());
    }

    /// One brush sample with the session's brush settings.
    pub fn stroke_sample(&mut self, x: f32, y: f32, mode: BrushMode) -> Result<Option<CellRect>> {
        apply_brush(&mut self.field, x, y, &self.brush, mode)
    }

    /// A complete single-sample stroke: snapshot, then one brush application.
    pub fn stamp(&mut self, x: f32, y: f32, mode: BrushMode) -> Result<Option<CellRect>> {
        self.begin_stroke();
        self.stroke_sample(x, y, mode)
    }

    /// Zero the field and bootstrap it from the source with the region filler.
    /// Undoable as a single step.
    pub fn auto_color(&mut self) -> Result<FillStats> {
        self.heat_history.push(self.field.snapshot());
        self.field.clear();
        let stats = auto_fill_region(&mut self.field, &self.source, self.options.background)?;
        log::info!(
            "auto color: {} seeds, {} cells filled",
            stats.seeds,
            stats.filled
        );
        Ok(stats)
    }

    /// Restore the field from before the last stroke or auto color.
    /// Returns `false` when there is nothing to undo.
    pub fn undo_heat(&mut self) -> Result<bool> {
        match self.heat_history.undo(self.field.snapshot()) {
            Some(snapshot) => {
                self.field.restore(&snapshot)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn redo_heat(&mut self) -> Result<bool> {
        match self.heat_history.redo(self.field.snapshot()) {
            Some(snapshot) => {
                self.field.restore(&snapshot)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ---- ramp editing ------------------------------------------------------

    pub fn set_ramp(&mut self, ramp: ColorRamp) {
        if ramp == self.ramp {
            return;
        }
        let previous = std::mem::replace(&mut self.ramp, ramp);
        self.ramp_history.push(previous);
    }

    /// Recolor one stop. Invalid input leaves the ramp and its history alone.
    pub fn set_stop_color(&mut self, index: usize, hex: &str) -> Result<()> {
        let mut next = self.ramp.clone();
        next.set_color(index, hex)?;
        self.set_ramp(next);
        Ok(())
    }

    pub fn set_stop_alpha(&mut self, index: usize, alpha: f32) -> Result<()> {
        let mut next = self.ramp.clone();
        next.set_alpha(index, alpha)?;
        self.set_ramp(next);
        Ok(())
    }

    pub fn undo_ramp(&mut self) -> bool {
        match self.ramp_history.undo(self.ramp.clone()) {
            Some(ramp) => {
                self.ramp = ramp;
                true
            }
            None => false,
        }
    }

    pub fn redo_ramp(&mut self) -> bool {
        match self.ramp_history.redo(self.ramp.clone()) {
            Some(ramp) => {
                self.ramp = ramp;
                true
            }
            None => false,
        }
    }

    // ---- output ------------------------------------------------------------

    pub fn render(&self) -> Result<RgbaImage> {
        render_heatmap(&self.source, &self.field, &self.ramp, &self.render)
    }

    /// Back to the opening config: ramp, render and brush settings, empty
    /// histories, and a fresh extraction.
    pub fn reset(&mut self) -> Result<()> {
        let options = self.initial.extract_options();
        let extraction = extract_intensity(&self.source, &options)?;
        self.generation = self.generation.wrapping_add(1);
        self.install(extraction, options);
        self.ramp = self.initial.ramp.clone();
        self.render = self.initial.render.clamped();
        self.brush = self.initial.brush;
        self.ramp_history.clear();
        log::info!("session {} reset", self.id);
        Ok(())
    }

    // ---- background extraction ---------------------------------------------

    /// Re-extract with a new sensitivity on a worker thread. Returns the
    /// generation of the request; only the latest one will be applied.
    pub fn spawn_extraction(&mut self, sensitivity: f32) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        let options = ExtractOptions {
            sensitivity: clamp_unit(sensitivity),
            ..self.options
        };
        let source = self.source.clone();
        let sender = self.extraction_sender.clone();
        self.awaiting = true;
        rayon::spawn(move || {
            let result = extract_intensity(&source, &options);
            deliver(
                &sender,
                ExtractionResult {
                    generation,
                    options,
                    result,
                },
            );
        });
        log::debug!("extraction generation {} spawned", generation);
        generation
    }

    /// Apply a finished background extraction if the latest one has arrived.
    ///
    /// Stale results are dropped. Returns `Ok(true)` when the field was
    /// replaced; an error from the current generation is passed through.
    pub fn poll_extraction(&mut self) -> Result<bool> {
        let mut applied = false;
        while let Ok(msg) = self.extraction_receiver.try_recv() {
            if msg.generation != self.generation {
                log::debug!(
                    "dropping stale extraction {} (current {})",
                    msg.generation,
                    self.generation
                );
                continue;
            }
            self.awaiting = false;
            let extraction = msg.result?;
            self.install(extraction, msg.options);
            applied = true;
        }
        Ok(applied)
    }

    /// Block until the latest requested extraction lands and apply it.
    /// Returns immediately when nothing is in flight.
    pub fn wait_extraction(&mut self) -> Result<()> {
        while self.awaiting {
            let msg = self.extraction_receiver.recv().map_err(|_| {
                HeatError::Input("extraction worker stopped without a result".to_string())
            })?;
            if msg.generation == self.generation {
                self.awaiting = false;
                let extraction = msg.result?;
                self.install(extraction, msg.options);
            }
        }
        Ok(())
    }

    pub fn extraction_pending(&self) -> bool {
        self.awaiting
    }

    fn install(&mut self, extraction: Extraction, options: ExtractOptions) {
        self.awaiting = false;
        self.field = extraction.field;
        self.options = options;
        self.heat_history.clear();
    }
}

/// Hand a finished extraction back to its session. Returns `false` when the
/// session is gone.
fn deliver(sender: &mpsc::Sender<ExtractionResult>, result: ExtractionResult) -> bool {
    let generation = result.generation;
    if sender.send(result).is_err() {
        log::debug!(
            "extraction generation {} finished after its session was dropped",
            generation
        );
        return false;
    }
    true
}
