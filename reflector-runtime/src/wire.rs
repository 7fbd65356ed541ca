/// One sample of the external byte stream. `active` going from low to high
/// marks start-of-frame; high to low marks end-of-frame or a stream gap. An
/// inactive sample carries no meaningful data byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WireSample {
    pub data: u8,
    pub active: bool,
}

impl WireSample {
    pub fn active(data: u8) -> Self {
        WireSample { data, active: true }
    }

    pub fn gap() -> Self {
        WireSample {
            data: 0,
            active: false,
        }
    }
}

/// Renders a frame as wire samples: one active sample per byte in order,
/// followed by a single gap sample (the falling edge).
pub fn frame_samples(frame: &[u8]) -> Vec<WireSample> {
    let mut samples: Vec<WireSample> = frame.iter().map(|&byte| WireSample::active(byte)).collect();
    samples.push(WireSample::gap());
    samples
}

/// Splits a sample sequence back into frames at the gaps. Inverse of
/// `frame_samples` for well-formed sequences; empty frames (consecutive
/// gaps) are not reported.
pub fn collect_frames(samples: &[WireSample]) -> Vec<Vec<u8>> {
    let mut frames = vec![];
    let mut current: Vec<u8> = vec![];
    for sample in samples {
        if sample.active {
            current.push(sample.data);
        } else if !current.is_empty() {
            frames.push(std::mem::replace(&mut current, vec![]));
        }
    }
    if !current.is_empty() {
        frames.push(current);
    }
    frames
}
