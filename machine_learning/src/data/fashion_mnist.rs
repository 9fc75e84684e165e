//! Loader for the Fashion-MNIST training set in IDX format.
//!
//! Files are read from a local cache directory, either an explicit one, the
//! [`DIR_ENV`] override, or `$HOME/.cache/fashion-mnist`. Nothing is ever
//! written there.

use std::{
    env, fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use ndarray::{Array1, Array2};

use super::InMemoryDataset;
use crate::{MlErr, Result};

/// Environment variable overriding the cache directory.
pub const DIR_ENV: &str = "FASHION_MNIST_DIR";

pub const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
pub const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";

const IMAGE_MAGIC: u32 = 2051;
const LABEL_MAGIC: u32 = 2049;

/// Loads the training images and labels, pixels normalized into `[0, 1]`.
///
/// # Arguments
/// * `dir` - Optional cache directory overriding [`DIR_ENV`] and the default.
pub fn load(dir: Option<&str>) -> Result<InMemoryDataset> {
    let dir = resolve_dir(dir);

    let (images, shape) = read_images(&dir.join(TRAIN_IMAGES))?;
    let labels = read_labels(&dir.join(TRAIN_LABELS))?;

    InMemoryDataset::new(images, labels, shape)
}

/// Reads the training set length from the image file header alone.
///
/// # Arguments
/// * `dir` - Optional cache directory overriding [`DIR_ENV`] and the default.
pub fn train_len(dir: Option<&str>) -> Result<usize> {
    let path = resolve_dir(dir).join(TRAIN_IMAGES);
    let mut file = fs::File::open(&path).map_err(|e| annotate(&path, e))?;

    let magic = read_u32(&mut file)?;
    if magic != IMAGE_MAGIC {
        return Err(bad_magic(&path, IMAGE_MAGIC, magic));
    }

    Ok(read_u32(&mut file)? as usize)
}

fn resolve_dir(dir: Option<&str>) -> PathBuf {
    if let Some(dir) = dir {
        return PathBuf::from(dir);
    }

    if let Some(dir) = env::var_os(DIR_ENV) {
        return PathBuf::from(dir);
    }

    let home = env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".cache").join("fashion-mnist")
}

fn read_images(path: &Path) -> Result<(Array2<f32>, (usize, usize, usize))> {
    let mut file = fs::File::open(path).map_err(|e| annotate(path, e))?;

    let magic = read_u32(&mut file)?;
    if magic != IMAGE_MAGIC {
        return Err(bad_magic(path, IMAGE_MAGIC, magic));
    }

    let count = read_u32(&mut file)? as usize;
    let rows = read_u32(&mut file)? as usize;
    let cols = read_u32(&mut file)? as usize;

    let mut pixels = Vec::new();
    file.read_to_end(&mut pixels)?;

    if pixels.len() != count * rows * cols {
        return Err(MlErr::Dataset(format!(
            "{} holds {} pixels, expected {count} x {rows} x {cols}",
            path.display(),
            pixels.len()
        )));
    }

    let pixels: Vec<f32> = pixels.into_iter().map(|p| p as f32 / 255.0).collect();

    // SAFETY: The length check above guarantees the shape.
    let images = Array2::from_shape_vec((count, rows * cols), pixels).unwrap();
    Ok((images, (rows, cols, 1)))
}

fn read_labels(path: &Path) -> Result<Array1<u32>> {
    let mut file = fs::File::open(path).map_err(|e| annotate(path, e))?;

    let magic = read_u32(&mut file)?;
    if magic != LABEL_MAGIC {
        return Err(bad_magic(path, LABEL_MAGIC, magic));
    }

    let count = read_u32(&mut file)? as usize;

    let mut labels = Vec::new();
    file.read_to_end(&mut labels)?;

    if labels.len() != count {
        return Err(MlErr::Dataset(format!(
            "{} holds {} labels, expected {count}",
            path.display(),
            labels.len()
        )));
    }

    Ok(labels.into_iter().map(u32::from).collect())
}

fn read_u32<R: Read>(rx: &mut R) -> io::Result<u32> {
    let mut buf = [0; 4];
    rx.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn annotate(path: &Path, e: io::Error) -> MlErr {
    MlErr::Io(io::Error::new(
        e.kind(),
        format!("{}: {e}", path.display()),
    ))
}

fn bad_magic(path: &Path, expected: u32, got: u32) -> MlErr {
    MlErr::Dataset(format!(
        "{} has magic {got}, expected {expected}",
        path.display()
    ))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    /// Writes a tiny IDX pair into a fresh temp directory.
    fn write_fixture(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("fashion-mnist-test-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        // Two 2x2 images: 0..4 and 250..254.
        let mut images = Vec::new();
        images.extend_from_slice(&IMAGE_MAGIC.to_be_bytes());
        images.extend_from_slice(&2_u32.to_be_bytes());
        images.extend_from_slice(&2_u32.to_be_bytes());
        images.extend_from_slice(&2_u32.to_be_bytes());
        images.extend_from_slice(&[0, 1, 2, 3, 251, 252, 253, 254]);
        fs::write(dir.join(TRAIN_IMAGES), images).unwrap();

        let mut labels = Vec::new();
        labels.extend_from_slice(&LABEL_MAGIC.to_be_bytes());
        labels.extend_from_slice(&2_u32.to_be_bytes());
        labels.extend_from_slice(&[9, 4]);
        fs::write(dir.join(TRAIN_LABELS), labels).unwrap();

        dir
    }

    #[test]
    fn loads_and_normalizes_idx_files() {
        let dir = write_fixture("load");
        let ds = load(dir.to_str()).unwrap();

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.sample_shape(), (2, 2, 1));
        assert_eq!(ds.labels()[0], 9);
        assert!((ds.images()[[0, 3]] - 3.0 / 255.0).abs() < 1e-6);
        assert!((ds.images()[[1, 0]] - 251.0 / 255.0).abs() < 1e-6);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn train_len_reads_header_only() {
        let dir = write_fixture("len");
        assert_eq!(train_len(dir.to_str()).unwrap(), 2);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_cache_is_an_error() {
        let missing = env::temp_dir().join("fashion-mnist-test-missing");
        assert!(load(missing.to_str()).is_err());
    }

    #[test]
    fn rejects_wrong_magic() {
        let dir = write_fixture("magic");
        fs::write(dir.join(TRAIN_IMAGES), 7_u32.to_be_bytes()).unwrap();

        assert!(load(dir.to_str()).is_err());
        fs::remove_dir_all(dir).unwrap();
    }
}
