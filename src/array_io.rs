use std::path::Path;

use anyhow::Context as _;
use ndarray::Array3;
use ndarray_npy::{ReadNpyExt as _, WriteNpyExt as _};

use crate::error::StageResult;

pub fn ensure_parent_dir(path: &Path) -> StageResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Writes an H×W×C array as an uncompressed `.npy` file. Round-trips
/// bit-for-bit through [`load_npy`].
pub fn save_npy(path: &Path, arr: &Array3<f32>) -> StageResult<()> {
    ensure_parent_dir(path)?;
    let file = std::fs::File::create(path)
        .with_context(|| format!("create '{}'", path.display()))?;
    arr.write_npy(std::io::BufWriter::new(file))
        .with_context(|| format!("write npy '{}'", path.display()))?;
    Ok(())
}

pub fn load_npy(path: &Path) -> StageResult<Array3<f32>> {
    let file =
        std::fs::File::open(path).with_context(|| format!("open '{}'", path.display()))?;
    let arr = Array3::<f32>::read_npy(std::io::BufReader::new(file))
        .with_context(|| format!("read npy '{}'", path.display()))?;
    Ok(arr)
}

/// Appends `.npy` when the caller passed a bare or differently-suffixed path.
pub fn with_npy_extension(path: &Path) -> std::path::PathBuf {
    match path.extension() {
        Some(ext) if ext == "npy" => path.to_path_buf(),
        _ => {
            let mut p = path.as_os_str().to_owned();
            p.push(".npy");
            std::path::PathBuf::from(p)
        }
    }
}
