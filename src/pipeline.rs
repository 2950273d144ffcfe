use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::{debug, info};

use crate::annotation::{LabelFont, generate_random, normalize_manual, render};
use crate::classifier::{Classifier, ClassifierCache, ModelStore, classify_points};
use crate::config::Settings;
use crate::error::{AnnotateError, Result};
use crate::models::{Point, PointRecord};

/// Where the points for a request come from
#[derive(Debug, Clone)]
pub enum PointsInput {
    /// Sample this many points at random
    Random(usize),
    /// Client-placed points, normalized before classification
    Manual(Vec<PointRecord>),
}

/// One image to annotate
#[derive(Debug, Clone)]
pub struct AnnotateRequest<'a> {
    /// Upload name, used in error messages
    pub name: &'a str,
    /// Encoded image in any format the `image` crate can decode
    pub bytes: &'a [u8],
    pub model_id: &'a str,
    pub points: PointsInput,
}

/// Result of annotating one image
#[derive(Debug, Clone)]
pub struct Annotated {
    /// Source image with markers and labels drawn on it
    pub image: RgbImage,
    /// Classified points, in idx order for sampled sets and input order for
    /// manual ones
    pub points: Vec<Point>,
}

impl Annotated {
    pub fn to_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.image)
    }

    pub fn records(&self) -> Vec<PointRecord> {
        self.points.iter().map(PointRecord::from).collect()
    }
}

/// Decode an upload and normalize it to 8-bit RGB.
pub fn decode_rgb(name: &str, bytes: &[u8]) -> Result<RgbImage> {
    let image =
        image::load_from_memory(bytes).map_err(|e| AnnotateError::invalid_image(name, e))?;
    Ok(image.to_rgb8())
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(buf)
}

/// Single-image annotation: validate, decode, build the point set, classify,
/// render.
///
/// ```ignore
/// let annotator = Annotator::from_settings(settings)?.with_verbose(true);
/// let result = annotator.process(request, &mut annotator.rng())?;
/// ```
pub struct Annotator {
    settings: Settings,
    classifiers: Arc<ClassifierCache>,
    font: Arc<LabelFont>,
    verbose: bool,
}

impl Annotator {
    /// Annotator over an existing classifier cache with default settings and
    /// the embedded label font.
    pub fn new(classifiers: Arc<ClassifierCache>) -> Result<Self> {
        Ok(Self {
            settings: Settings::default(),
            classifiers,
            font: Arc::new(LabelFont::builtin()?),
            verbose: false,
        })
    }

    /// Annotator backed by the on-disk model store named in `settings`.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let store = ModelStore::new(settings.models_dir.clone());
        let font = LabelFont::resolve(settings.font_path.as_deref())?;
        Ok(Self::new(Arc::new(ClassifierCache::new(Arc::new(store))))?
            .with_font(font)
            .with_settings(settings))
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_font(mut self, font: LabelFont) -> Self {
        self.font = Arc::new(font);
        self
    }

    /// Log per-image progress at info instead of debug
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn classifiers(&self) -> &ClassifierCache {
        &self.classifiers
    }

    /// RNG for one request: seeded from settings when a seed is configured.
    pub fn rng(&self) -> StdRng {
        self.rng_for(0)
    }

    /// RNG for the image at `position` of a batch. With a seed configured
    /// every position gets its own reproducible stream.
    pub fn rng_for(&self, position: usize) -> StdRng {
        match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(position as u64)),
            None => StdRng::from_os_rng(),
        }
    }

    /// Run the whole pipeline on one request.
    ///
    /// Checks happen in a fixed order: sample count, then model lookup, then
    /// image decoding, so a bad request fails before any expensive work.
    pub fn process<R: Rng + ?Sized>(
        &self,
        request: AnnotateRequest<'_>,
        rng: &mut R,
    ) -> Result<Annotated> {
        if let PointsInput::Random(n) = &request.points {
            self.settings.check_points(*n)?;
        }
        let classifier = self.classifiers.get(request.model_id)?;
        let image = decode_rgb(request.name, request.bytes)?;
        let (width, height) = image.dimensions();

        let points = match &request.points {
            PointsInput::Random(n) => {
                generate_random(rng, width, height, *n, self.settings.margin)
            }
            PointsInput::Manual(records) => normalize_manual(records, width, height)?,
        };

        let annotated = self.annotate(classifier.as_ref(), image, points)?;
        info!(
            image = request.name,
            model = request.model_id,
            width,
            height,
            points = annotated.points.len(),
            "image annotated"
        );
        Ok(annotated)
    }

    /// Classify `points` on an already decoded image and draw the overlay.
    pub fn annotate(
        &self,
        classifier: &dyn Classifier,
        image: RgbImage,
        mut points: Vec<Point>,
    ) -> Result<Annotated> {
        classify_points(
            classifier,
            &image,
            &mut points,
            self.settings.patch_size,
            &self.settings.classes,
        )?;
        if self.verbose {
            info!(points = points.len(), "classified");
        } else {
            debug!(points = points.len(), "classified");
        }

        let image = render(&image, &points, &self.font);
        Ok(Annotated { image, points })
    }
}
