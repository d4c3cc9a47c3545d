use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rfbviewer")]
#[command(about = "Remote framebuffer viewer with zoom, region selection and update flashing")]
#[command(version)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Initial zoom in percent
    #[arg(short, long, value_name = "PERCENT")]
    pub zoom: Option<i64>,

    /// Use read-only mode (no input sent to the remote desktop)
    #[arg(long)]
    pub read_only: bool,

    /// Select single points instead of rectangles
    #[arg(long)]
    pub point_mode: bool,

    /// Flash regions as they are updated
    #[arg(long)]
    pub flash_updates: bool,

    /// Exit with an error as soon as forwarding input fails
    #[arg(long)]
    pub unattended: bool,

    /// Save committed selections as PNG files in this directory
    #[arg(long, value_name = "DIR")]
    pub capture_dir: Option<PathBuf>,

    /// Demo desktop size
    #[arg(long, value_name = "WxH", default_value = "1024x768", value_parser = parse_geometry)]
    pub geometry: (u32, u32),

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_geometry(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {:?}", s))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("bad width: {}", e))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("bad height: {}", e))?;
    if w == 0 || h == 0 || w > u32::from(u16::MAX) || h > u32::from(u16::MAX) {
        return Err(format!("geometry {}x{} is out of range", w, h));
    }
    Ok((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_geometry() {
        assert_eq!(parse_geometry("800x600"), Ok((800, 600)));
        assert_eq!(parse_geometry("640X480"), Ok((640, 480)));
        assert!(parse_geometry("800").is_err());
        assert!(parse_geometry("0x600").is_err());
        assert!(parse_geometry("70000x10").is_err());
    }

    #[test]
    fn test_flags() {
        let args = Args::parse_from(["rfbviewer", "--zoom", "150", "--read-only", "--geometry", "320x200"]);
        assert_eq!(args.zoom, Some(150));
        assert!(args.read_only);
        assert!(!args.unattended);
        assert_eq!(args.geometry, (320, 200));
    }
}
