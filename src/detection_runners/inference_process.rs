use std::time::{Duration, Instant};
use crate::common::RawDetections;
use crate::data::ConfigOrt;
use crate::detection_runners::image_ops::LetterboxInfo;
use crate::detection_runners::input_wrapper::{Xs, X};
use crate::utils;

pub trait InferenceProcess: Sized {
    type Input; // SpotImage

    /// Creates a new instance of the model with the given options.
    fn new(options: ConfigOrt) -> anyhow::Result<Self>;

    /// Pre-process the input data.
    fn preprocess(&self, x: &Self::Input) -> anyhow::Result<(X, LetterboxInfo)>;

    /// Executes the model on the preprocessed data.
    fn inference(&mut self, x: X) -> anyhow::Result<Xs>;

    /// Post-process the model's output.
    fn postprocess(&self, xs: Xs, info: &LetterboxInfo, threshold: f32) -> anyhow::Result<RawDetections>;

    /// Executes the full pipeline.
    fn run(&mut self, x: &Self::Input, threshold: f32) -> anyhow::Result<RawDetections> {
        let (ys, info) = self.preprocess(x)?;
        let ys = self.inference(ys)?;
        let ys = self.postprocess(ys, &info, threshold)?;
        Ok(ys)
    }

    /// Executes the full pipeline, tracing and accumulating per-stage timings.
    fn forward(&mut self, x: &Self::Input, threshold: f32, profile: bool) -> anyhow::Result<RawDetections> {
        let detect_time = Instant::now();

        let t_pre = Instant::now();
        let (ys, info) = self.preprocess(x)?;
        let t_pre = t_pre.elapsed();

        let mut _detect_elapsed = detect_time.elapsed();
        _detect_elapsed = utils::trace("TIME", "Preprocessing input", detect_time, _detect_elapsed);

        let t_exe = Instant::now();
        let ys = self.inference(ys)?;
        let t_exe = t_exe.elapsed();

        _detect_elapsed = utils::trace("TIME", "Detection run", detect_time, _detect_elapsed);

        let t_post = Instant::now();
        let ys = self.postprocess(ys, &info, threshold)?;
        let t_post = t_post.elapsed();

        utils::trace("TIME", "Postprocessing", detect_time, _detect_elapsed);

        self.record_time(&[t_pre, t_exe, t_post]);
        if profile {
            log::info!("> Preprocess: {t_pre:?} | Inference: {t_exe:?} | Postprocess: {t_post:?} | Candidates: {}", ys.len());
            self.print_time();
        }

        Ok(ys)
    }

    /// Accumulates the durations of one `forward` call.
    fn record_time(&mut self, _stages: &[Duration]) {}

    fn print_time(&self);
}
