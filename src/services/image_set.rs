use crate::models::{GameMode, RoundImage};
use camino::{Utf8Path, Utf8PathBuf};
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use std::fs;
use std::sync::OnceLock;
use thiserror::Error;

/// Subfolder written by the crop tool; preferred over the originals when non-empty.
pub const CROPPED_SUBDIR: &str = "_cropped";

/// Length of the random seed embedded in distractor references.
const SEED_LEN: usize = 8;

const SEED_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Errors raised while preparing image sources
#[derive(Error, Debug)]
pub enum ImageSetError {
    #[error("No flagged images found in {0}")]
    EmptyPool(Utf8PathBuf),

    #[error("Failed to read image directory {path}: {source}")]
    ReadDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Degradations reported alongside a round set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSetWarning {
    /// The flagged pool was empty; the flagged slot has an empty reference
    EmptyPool,
}

/// Candidate images for one round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSet {
    pub images: Vec<RoundImage>,
    pub warning: Option<ImageSetWarning>,
}

impl RoundSet {
    /// The flagged image of the set.
    pub fn target(&self) -> Option<&RoundImage> {
        self.images.iter().find(|img| img.is_target)
    }
}

fn image_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\.(webp|png|jpe?g)$").expect("Invalid image regex"))
}

/// Whether `name` is an image file the pool and the crop tool should pick up.
///
/// Hidden files and names starting with `_` are skipped.
pub fn is_pool_image(name: &str) -> bool {
    !name.starts_with('_') && !name.starts_with('.') && image_file_pattern().is_match(name)
}

/// List pool images directly inside `dir`, sorted by name.
pub fn list_images(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, ImageSetError> {
    let read_dir = fs::read_dir(dir).map_err(|source| ImageSetError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut images = Vec::new();
    for entry in read_dir.flatten() {
        let Ok(path) = Utf8PathBuf::try_from(entry.path()) else {
            continue;
        };
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if is_file && path.file_name().is_some_and(is_pool_image) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Static bundle of flagged (AI-generated) image references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlaggedPool {
    refs: Vec<String>,
}

impl FlaggedPool {
    pub fn from_refs(refs: Vec<String>) -> Self {
        Self { refs }
    }

    /// Load the pool from `dir`, preferring its `_cropped/` subfolder.
    ///
    /// An empty pool is an error here: the game refuses to start without at
    /// least one flagged image.
    pub fn load(dir: &Utf8Path) -> Result<Self, ImageSetError> {
        let cropped_dir = dir.join(CROPPED_SUBDIR);
        if cropped_dir.is_dir() {
            let cropped = list_images(&cropped_dir)?;
            if !cropped.is_empty() {
                tracing::info!("Using {} cropped flagged images from {}", cropped.len(), cropped_dir);
                return Ok(Self::from_paths(cropped));
            }
        }

        let originals = list_images(dir)?;
        if originals.is_empty() {
            return Err(ImageSetError::EmptyPool(dir.to_path_buf()));
        }
        tracing::info!("Using {} flagged images from {}", originals.len(), dir);
        Ok(Self::from_paths(originals))
    }

    fn from_paths(paths: Vec<Utf8PathBuf>) -> Self {
        Self {
            refs: paths.into_iter().map(Utf8PathBuf::into_string).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.refs.choose(rng).map(String::as_str)
    }
}

/// Assembles each round's candidate set: one flagged image plus distractors
/// from an external photo source.
#[derive(Debug, Clone)]
pub struct ImageSetProvider {
    pool: FlaggedPool,
    distractor_template: String,
}

impl ImageSetProvider {
    /// # Arguments
    /// * `pool` - Flagged images to draw the target from
    /// * `distractor_template` - Distractor reference; `{seed}` is replaced per image
    pub fn new(pool: FlaggedPool, distractor_template: impl Into<String>) -> Self {
        Self {
            pool,
            distractor_template: distractor_template.into(),
        }
    }

    /// Build a set for `mode` using the thread-local RNG.
    pub fn build_set(&self, mode: GameMode) -> RoundSet {
        self.build_set_with(mode, &mut rand::thread_rng())
    }

    /// Build a set for `mode` from the given RNG.
    ///
    /// The flagged image and the distractors are shuffled together and ids
    /// reassigned 1..n in shuffled order, so position says nothing about role.
    pub fn build_set_with<R: Rng + ?Sized>(&self, mode: GameMode, rng: &mut R) -> RoundSet {
        let (target_ref, warning) = match self.pool.pick(rng) {
            Some(src) => (src.to_string(), None),
            None => {
                tracing::warn!("Flagged image pool is empty, using a placeholder");
                (String::new(), Some(ImageSetWarning::EmptyPool))
            }
        };

        let mut candidates: Vec<(String, bool)> = (0..mode.distractor_count())
            .map(|_| (self.distractor_ref(rng), false))
            .collect();
        candidates.push((target_ref, true));
        candidates.shuffle(rng);

        let images = candidates
            .into_iter()
            .enumerate()
            .map(|(idx, (source_ref, is_target))| RoundImage {
                id: idx as u32 + 1,
                source_ref,
                is_target,
            })
            .collect();

        RoundSet { images, warning }
    }

    fn distractor_ref<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let seed: String = (0..SEED_LEN)
            .map(|_| SEED_ALPHABET[rng.gen_range(0..SEED_ALPHABET.len())] as char)
            .collect();
        self.distractor_template.replace("{seed}", &seed)
    }
}
