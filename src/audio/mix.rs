use std::path::Path;

use crate::assets::media::AudioPcm;
use crate::foundation::error::{ClipError, ClipResult};

/// One audio source routed through a fixed gain.
#[derive(Clone, Debug)]
pub struct GainStage {
    label: String,
    gain: f32,
    pcm: AudioPcm,
}

impl GainStage {
    /// Source name (for logs).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Linear gain in `[0, 1]`.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Add this stage, resampled to `sample_rate` stereo, into `out`.
    fn mix_into(&self, out: &mut [f32], sample_rate: u32) {
        let src = &self.pcm.interleaved_f32;
        let channels = usize::from(self.pcm.channels);
        if channels == 0 || self.pcm.sample_rate == 0 || self.gain == 0.0 {
            return;
        }
        let src_frames = src.len() / channels;
        if src_frames == 0 {
            return;
        }

        let step = f64::from(self.pcm.sample_rate) / f64::from(sample_rate);
        for (dst_frame, dst) in out.chunks_exact_mut(2).enumerate() {
            let src_pos = dst_frame as f64 * step;
            let src_frame0 = src_pos.floor() as usize;
            if src_frame0 >= src_frames {
                break;
            }
            let src_frame1 = (src_frame0 + 1).min(src_frames - 1);
            let frac = (src_pos - src_frame0 as f64) as f32;

            let (l, r) = if channels == 1 {
                let v0 = src[src_frame0];
                let v1 = src[src_frame1];
                let v = v0 + ((v1 - v0) * frac);
                (v, v)
            } else {
                let i0 = src_frame0 * channels;
                let i1 = src_frame1 * channels;
                (
                    src[i0] + ((src[i1] - src[i0]) * frac),
                    src[i0 + 1] + ((src[i1 + 1] - src[i0 + 1]) * frac),
                )
            };
            dst[0] += l * self.gain;
            dst[1] += r * self.gain;
        }
    }
}

/// Per-export audio graph: gain stages summed into one stereo track.
///
/// A graph is opened at the start of a job and released exactly once, either explicitly with
/// [`AudioMixGraph::release`] or when dropped.
#[derive(Debug)]
pub struct AudioMixGraph {
    sample_rate: u32,
    stages: Vec<GainStage>,
    released: bool,
}

impl AudioMixGraph {
    /// Open an empty graph mixing at `sample_rate`.
    pub fn open(sample_rate: u32) -> ClipResult<Self> {
        if sample_rate == 0 {
            return Err(ClipError::validation("audio graph sample_rate must be > 0"));
        }
        tracing::debug!(sample_rate, "audio graph opened");
        Ok(Self {
            sample_rate,
            stages: Vec::new(),
            released: false,
        })
    }

    /// Output sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Route `pcm` through a new gain stage.
    pub fn connect(
        &mut self,
        label: impl Into<String>,
        pcm: AudioPcm,
        gain: f64,
    ) -> ClipResult<()> {
        if pcm.channels == 0 || pcm.channels > 2 {
            return Err(ClipError::validation(format!(
                "audio source must be mono or stereo, got {} channels",
                pcm.channels
            )));
        }
        let gain = if gain.is_finite() { gain.clamp(0.0, 1.0) } else { 0.0 };
        let label = label.into();
        tracing::debug!(stage = %label, gain, frames = pcm.frames(), "audio stage connected");
        self.stages.push(GainStage {
            label,
            gain: gain as f32,
            pcm,
        });
        Ok(())
    }

    /// Connected stages, in connection order.
    pub fn stages(&self) -> &[GainStage] {
        &self.stages
    }

    /// Sum every stage into `duration_secs` of stereo audio, clamped to `[-1, 1]`.
    ///
    /// The result always spans the full duration; sources that end early leave silence.
    pub fn mixdown(&self, duration_secs: f64) -> AudioPcm {
        let frames = (duration_secs.max(0.0) * f64::from(self.sample_rate)).round() as usize;
        let mut out = vec![0.0f32; frames * 2];
        for stage in &self.stages {
            stage.mix_into(&mut out, self.sample_rate);
        }
        for s in &mut out {
            *s = s.clamp(-1.0, 1.0);
        }
        AudioPcm {
            sample_rate: self.sample_rate,
            channels: 2,
            interleaved_f32: out,
        }
    }

    /// Tear the graph down.
    pub fn release(mut self) {
        self.released = true;
        tracing::debug!(stages = self.stages.len(), "audio graph released");
    }
}

impl Drop for AudioMixGraph {
    fn drop(&mut self) {
        if !self.released {
            tracing::debug!(stages = self.stages.len(), "audio graph released on drop");
        }
    }
}

/// Write interleaved `f32` PCM samples to a raw little-endian `.f32le` file.
pub(crate) fn write_mix_to_f32le_file(
    samples_interleaved: &[f32],
    out_path: &Path,
) -> ClipResult<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ClipError::evaluation(format!(
                "failed to create audio mix output directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        ClipError::evaluation(format!(
            "failed to write mixed audio file '{}': {e}",
            out_path.display()
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
