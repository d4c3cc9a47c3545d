//! PNG export of committed regions.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use rfb_pixelbuffer::PixelBuffer;
use rfb_session::Selected;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name for a capture taken at `when`.
pub fn capture_file_name(selected: Selected, when: DateTime<Local>) -> String {
    let stamp = when.format("%Y%m%d-%H%M%S%.3f");
    match selected {
        Selected::Region(r) => format!(
            "capture-{}-x{}-y{}-{}x{}.png",
            stamp, r.x, r.y, r.width, r.height
        ),
        Selected::Point(p) => format!("capture-{}-x{}-y{}.png", stamp, p.x, p.y),
    }
}

/// Write `image` as a PNG into `dir`, creating it if needed.
pub fn save_png(dir: &Path, selected: Selected, image: &PixelBuffer) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating capture directory {}", dir.display()))?;
    let path = dir.join(capture_file_name(selected, Local::now()));
    let (width, height) = image.dimensions();
    let rgba = image::RgbaImage::from_raw(width, height, image.data().to_vec())
        .context("capture buffer has the wrong size")?;
    rgba.save_with_format(&path, image::ImageFormat::Png)
        .with_context(|| format!("writing {}", path.display()))?;
    info!("Saved {}x{} capture to {}", width, height, path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rfb_common::{Point, Rect};

    #[test]
    fn test_file_names() {
        let when = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            capture_file_name(Selected::Region(Rect::new(10, 20, 30, 40)), when),
            "capture-20240309-140507.000-x10-y20-30x40.png"
        );
        assert_eq!(
            capture_file_name(Selected::Point(Point::new(3, 4)), when),
            "capture-20240309-140507.000-x3-y4.png"
        );
    }

    #[test]
    fn test_save_png_round_trips_pixels() {
        let dir = std::env::temp_dir().join(format!("rfbviewer-capture-{}", std::process::id()));
        let image = PixelBuffer::from_rgba(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 255]).unwrap();
        let path = save_png(&dir, Selected::Region(Rect::new(0, 0, 2, 1)), &image).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (2, 1));
        assert_eq!(loaded.get_pixel(1, 0).0, [0, 0, 255, 255]);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
