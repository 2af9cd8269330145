use super::SpatialAudioEngine;
use crate::config::SoundfieldDesc;
use crate::error::{Result, SoundfieldError};
use std::sync::{Arc, Mutex, MutexGuard};

/// PCM sample encoding of the decoded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    Pcm8,
    Pcm16,
    Pcm24,
    PcmFloat,
}

/// Format of the decoded stream handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputFormat {
    pub encoding: SampleEncoding,
    pub sample_rate: u32,
    pub channel_count: u16,
}

impl InputFormat {
    pub fn pcm16(sample_rate: u32, channel_count: u16) -> Self {
        Self {
            encoding: SampleEncoding::Pcm16,
            sample_rate,
            channel_count,
        }
    }
}

/// Surround/ambisonic layout implied by the input channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurroundLayout {
    Mono,
    Stereo,
    FirstOrderAmbisonics,
    /// First-order ambisonics plus a head-locked stereo pair
    FirstOrderAmbisonicsWithStereo,
    SecondOrderAmbisonics,
    SecondOrderAmbisonicsWithStereo,
    ThirdOrderAmbisonics,
    ThirdOrderAmbisonicsWithStereo,
}

impl SurroundLayout {
    pub fn from_channel_count(channels: u16) -> Result<Self> {
        match channels {
            1 => Ok(Self::Mono),
            2 => Ok(Self::Stereo),
            4 => Ok(Self::FirstOrderAmbisonics),
            6 => Ok(Self::FirstOrderAmbisonicsWithStereo),
            9 => Ok(Self::SecondOrderAmbisonics),
            11 => Ok(Self::SecondOrderAmbisonicsWithStereo),
            16 => Ok(Self::ThirdOrderAmbisonics),
            18 => Ok(Self::ThirdOrderAmbisonicsWithStereo),
            other => Err(SoundfieldError::UnsupportedChannelLayout(other)),
        }
    }

    /// Ambisonic order, or `None` for plain mono/stereo.
    pub fn ambisonic_order(&self) -> Option<u8> {
        match self {
            Self::Mono | Self::Stereo => None,
            Self::FirstOrderAmbisonics | Self::FirstOrderAmbisonicsWithStereo => Some(1),
            Self::SecondOrderAmbisonics | Self::SecondOrderAmbisonicsWithStereo => Some(2),
            Self::ThirdOrderAmbisonics | Self::ThirdOrderAmbisonicsWithStereo => Some(3),
        }
    }
}

/// A native binaural renderer instance for one input format.
pub trait NativeSurround: Send {
    fn update_native_orientation(&mut self, w: f32, x: f32, y: f32, z: f32);

    fn release(&mut self) {}
}

/// Creates native renderers when the input format changes.
pub trait NativeSurroundFactory: Send + Sync {
    fn create(
        &self,
        layout: SurroundLayout,
        format: InputFormat,
        output: OutputConfig,
    ) -> Result<Box<dyn NativeSurround>>;
}

/// Output side of the native renderer: block size and binaural channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub frames_per_buffer: usize,
    pub channels: u16,
}

impl OutputConfig {
    pub fn from_desc(desc: &SoundfieldDesc) -> Self {
        Self {
            frames_per_buffer: desc.frames_per_output_buffer,
            channels: desc.output_channels,
        }
    }
}

struct RendererInner {
    /// Latest orientation as (w, x, y, z)
    orientation: [f32; 4],
    format: Option<InputFormat>,
    layout: Option<SurroundLayout>,
    native: Option<Box<dyn NativeSurround>>,
}

impl RendererInner {
    fn release_native(&mut self) {
        if let Some(mut native) = self.native.take() {
            native.release();
            log::debug!("Native surround renderer released");
        }
    }
}

/// Spatial-audio engine backed by a native surround renderer.
///
/// Orientation updates may arrive before the renderer exists (or between
/// format changes); the latest one is cached and replayed into every newly
/// created native renderer. Starts at the identity orientation.
pub struct SurroundRenderer {
    factory: Arc<dyn NativeSurroundFactory>,
    output: OutputConfig,
    inner: Mutex<RendererInner>,
}

impl SurroundRenderer {
    pub fn new(factory: Arc<dyn NativeSurroundFactory>, output: OutputConfig) -> Self {
        Self {
            factory,
            output,
            inner: Mutex::new(RendererInner {
                orientation: [1.0, 0.0, 0.0, 0.0],
                format: None,
                layout: None,
                native: None,
            }),
        }
    }

    pub fn from_desc(factory: Arc<dyn NativeSurroundFactory>, desc: &SoundfieldDesc) -> Self {
        Self::new(factory, OutputConfig::from_desc(desc))
    }

    pub fn output(&self) -> OutputConfig {
        self.output
    }

    /// Prepares a native renderer for `format`.
    ///
    /// Only 16-bit PCM is accepted. Reconfiguring with the current format is a
    /// no-op. The cached orientation is applied to the new renderer. Any
    /// failure leaves the renderer inactive.
    pub fn configure(&self, format: InputFormat) -> Result<SurroundLayout> {
        let mut inner = self.lock();

        if inner.format == Some(format) && inner.native.is_some() {
            if let Some(layout) = inner.layout {
                return Ok(layout);
            }
        }

        inner.release_native();
        inner.format = None;
        inner.layout = None;

        if format.encoding != SampleEncoding::Pcm16 {
            return Err(SoundfieldError::AudioFormat(format!(
                "Unsupported encoding {:?}, expected 16-bit PCM",
                format.encoding
            )));
        }

        let layout = SurroundLayout::from_channel_count(format.channel_count)?;
        let mut native = self.factory.create(layout, format, self.output)?;
        let [w, x, y, z] = inner.orientation;
        native.update_native_orientation(w, x, y, z);

        log::info!(
            "Surround renderer configured: {:?}, {} Hz, {} channels in, {} out",
            layout,
            format.sample_rate,
            format.channel_count,
            self.output.channels
        );

        inner.native = Some(native);
        inner.format = Some(format);
        inner.layout = Some(layout);
        Ok(layout)
    }

    /// Releases the native renderer and forgets the input format.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.release_native();
        inner.format = None;
        inner.layout = None;
    }

    pub fn is_active(&self) -> bool {
        self.lock().native.is_some()
    }

    pub fn layout(&self) -> Option<SurroundLayout> {
        self.lock().layout
    }

    /// Latest orientation as `(w, x, y, z)`.
    pub fn orientation(&self) -> [f32; 4] {
        self.lock().orientation
    }

    fn lock(&self) -> MutexGuard<'_, RendererInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SpatialAudioEngine for SurroundRenderer {
    fn update_orientation(&self, w: f32, x: f32, y: f32, z: f32) {
        let mut inner = self.lock();
        inner.orientation = [w, x, y, z];
        if let Some(native) = inner.native.as_mut() {
            native.update_native_orientation(w, x, y, z);
        }
    }
}

impl Drop for SurroundRenderer {
    fn drop(&mut self) {
        self.lock().release_native();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        created: AtomicUsize,
        released: AtomicUsize,
        orientations: Mutex<Vec<[f32; 4]>>,
    }

    struct CountingSurround(Arc<Counters>);

    impl NativeSurround for CountingSurround {
        fn update_native_orientation(&mut self, w: f32, x: f32, y: f32, z: f32) {
            self.0.orientations.lock().unwrap().push([w, x, y, z]);
        }

        fn release(&mut self) {
            self.0.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct CountingFactory(Arc<Counters>);

    impl NativeSurroundFactory for CountingFactory {
        fn create(
            &self,
            _layout: SurroundLayout,
            _format: InputFormat,
            output: OutputConfig,
        ) -> Result<Box<dyn NativeSurround>> {
            assert_eq!(output.frames_per_buffer, 1024);
            assert_eq!(output.channels, 2);
            self.0.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingSurround(self.0.clone())))
        }
    }

    fn renderer() -> (SurroundRenderer, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        (
            SurroundRenderer::from_desc(
                Arc::new(CountingFactory(counters.clone())),
                &SoundfieldDesc::default(),
            ),
            counters,
        )
    }

    #[test]
    fn test_layout_from_channel_count() {
        assert_eq!(
            SurroundLayout::from_channel_count(4).unwrap(),
            SurroundLayout::FirstOrderAmbisonics
        );
        assert_eq!(
            SurroundLayout::from_channel_count(16).unwrap().ambisonic_order(),
            Some(3)
        );
        assert_eq!(SurroundLayout::from_channel_count(2).unwrap().ambisonic_order(), None);
        assert_eq!(
            SurroundLayout::from_channel_count(5),
            Err(SoundfieldError::UnsupportedChannelLayout(5))
        );
    }

    #[test]
    fn test_orientation_replayed_on_configure() {
        let (renderer, counters) = renderer();
        assert!(!renderer.is_active());

        renderer.update_orientation(0.5, 0.0, -0.5, 0.0);
        renderer.configure(InputFormat::pcm16(48_000, 4)).unwrap();

        assert!(renderer.is_active());
        assert_eq!(*counters.orientations.lock().unwrap(), vec![[0.5, 0.0, -0.5, 0.0]]);

        renderer.update_orientation(1.0, 0.0, 0.0, 0.0);
        assert_eq!(counters.orientations.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_starts_at_identity() {
        let (renderer, counters) = renderer();
        renderer.configure(InputFormat::pcm16(48_000, 2)).unwrap();
        assert_eq!(renderer.orientation(), [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(counters.orientations.lock().unwrap()[0], [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_same_format_is_noop_and_change_recreates() {
        let (renderer, counters) = renderer();
        renderer.configure(InputFormat::pcm16(48_000, 4)).unwrap();
        renderer.configure(InputFormat::pcm16(48_000, 4)).unwrap();
        assert_eq!(counters.created.load(Ordering::SeqCst), 1);

        let layout = renderer.configure(InputFormat::pcm16(48_000, 9)).unwrap();
        assert_eq!(layout, SurroundLayout::SecondOrderAmbisonics);
        assert_eq!(counters.created.load(Ordering::SeqCst), 2);
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rejects_non_pcm16() {
        let (renderer, counters) = renderer();
        renderer.configure(InputFormat::pcm16(48_000, 4)).unwrap();

        let float_format = InputFormat {
            encoding: SampleEncoding::PcmFloat,
            sample_rate: 48_000,
            channel_count: 4,
        };
        assert!(matches!(
            renderer.configure(float_format),
            Err(SoundfieldError::AudioFormat(_))
        ));
        assert!(!renderer.is_active());
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsupported_layout_releases_previous_renderer() {
        let (renderer, counters) = renderer();
        renderer.configure(InputFormat::pcm16(48_000, 2)).unwrap();
        assert_eq!(renderer.layout(), Some(SurroundLayout::Stereo));

        assert_eq!(
            renderer.configure(InputFormat::pcm16(48_000, 7)),
            Err(SoundfieldError::UnsupportedChannelLayout(7))
        );
        assert!(!renderer.is_active());
        assert_eq!(renderer.layout(), None);
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);

        // The refused format is not remembered, so a retry fails again
        assert!(renderer.configure(InputFormat::pcm16(48_000, 7)).is_err());
        assert_eq!(counters.created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reset_releases() {
        let (renderer, counters) = renderer();
        renderer.configure(InputFormat::pcm16(44_100, 6)).unwrap();
        renderer.reset();
        assert!(!renderer.is_active());
        assert_eq!(renderer.layout(), None);
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    }
}
