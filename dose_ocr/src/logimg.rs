//! Write intermediate bitmaps to disk, gated by the same levels as the `log`
//! framework. Set `RUST_LOG_IMAGE_DIR` to the directory where the images
//! should go.

use lazy_static::lazy_static;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};
use crate::pixmap::{Pixel, Pixmap};

/// Get the path to which we are supposed to log images.
pub fn log_image_dir() -> Option<&'static Path> {
    lazy_static! {
        static ref PATH: Option<PathBuf> = env::var_os("RUST_LOG_IMAGE_DIR").map(PathBuf::from);
    }
    PATH.as_deref()
}

/// Write `pixmap` to `path`, creating parent directories as needed.
pub fn write_pixmap<P: Pixel>(path: &Path, pixmap: &Pixmap<P>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(Error::image)?;
    }
    pixmap.to_image()?.save(path).map_err(Error::image)
}

/// If `lvl` would normally be logged by the `log` framework, and
/// `RUST_LOG_IMAGE_DIR` is set, use `$($path_arg)+` as a format pattern to
/// build a file name, and write out the image. Failing to write the image
/// is only a warning.
macro_rules! log_pixmap {
    ($lvl:expr, $image:expr, $($path_arg:tt)+) => ({
        if ::log::log_enabled!($lvl) {
            if let Some(dir) = $crate::logimg::log_image_dir() {
                let file_path = dir.join(format!($($path_arg)+));
                ::log::log!($lvl, "image: {}", file_path.display());
                if let Err(err) = $crate::logimg::write_pixmap(&file_path, $image) {
                    ::log::warn!("could not write {}: {}", file_path.display(), err);
                }
            }
        }
    })
}

/// See `log_pixmap!`. Uses the log level `log::Level::Debug`.
macro_rules! debug_pixmap {
    ($image:expr, $($path_arg:tt)+) => ({
        log_pixmap!(::log::Level::Debug, $image, $($path_arg)+);
    })
}

/// See `log_pixmap!`. Uses the log level `log::Level::Trace`.
macro_rules! trace_pixmap {
    ($image:expr, $($path_arg:tt)+) => ({
        log_pixmap!(::log::Level::Trace, $image, $($path_arg)+);
    })
}

#[test]
fn writes_pixmaps_as_png() {
    let dir = env::temp_dir().join(format!("dose_ocr_logimg_{}", std::process::id()));
    let path = dir.join("nested").join("bitmap.png");
    let mut bitmap = crate::pixmap::Bitmap::blank(4, 3);
    *bitmap.get_mut(1, 1) = true;
    write_pixmap(&path, &bitmap).unwrap();
    let image = image::open(&path).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (4, 3));
    assert_eq!(image[(1, 1)].0, [0, 0, 0, 0xff]);
    fs::remove_dir_all(&dir).unwrap();
}
