//! Plain-text path output: one path per line, points as `x,y` separated by
//! spaces.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path as FsPath;
use topoline_contour::Path;

/// Write `paths` to `writer`.
pub fn write_paths<W: Write>(mut writer: W, paths: &[Path]) -> io::Result<()> {
    for path in paths {
        for (i, p) in path.points().iter().enumerate() {
            if i > 0 {
                writer.write_all(b" ")?;
            }
            write!(writer, "{},{}", p.x, p.y)?;
        }
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Write `paths` to a new file at `file`.
pub fn write_paths_to_file(file: &FsPath, paths: &[Path]) -> io::Result<()> {
    if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_paths(BufWriter::new(File::create(file)?), paths)
}
