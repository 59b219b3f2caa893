//! Dataset directory layout and artifact triples.
//!
//! A dataset lives under a base directory with three sibling folders, one per
//! artifact kind. Files describing the same table share a stem:
//!
//! ```text
//! <base>/tables/html/<stem>.html
//! <base>/tables/tex_files/<stem>.tex
//! <base>/tables/images/<stem>.jpeg
//! ```
//!
//! Nothing links the three files except that naming convention.

use std::io;
use std::path::{Path, PathBuf};

/// Relative location of the HTML tables.
pub const HTML_SUBDIR: &str = "tables/html";
/// Relative location of the LaTeX sources.
pub const TEX_SUBDIR: &str = "tables/tex_files";
/// Relative location of the rendered images.
pub const IMAGES_SUBDIR: &str = "tables/images";

pub const HTML_EXT: &str = "html";
pub const TEX_EXT: &str = "tex";
pub const IMAGE_EXT: &str = "jpeg";

/// The three artifact directories rooted at one base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    pub base: PathBuf,
}

impl Default for DatasetLayout {
    fn default() -> Self {
        Self::new(".")
    }
}

impl DatasetLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn html_dir(&self) -> PathBuf {
        self.base.join(HTML_SUBDIR)
    }

    pub fn tex_dir(&self) -> PathBuf {
        self.base.join(TEX_SUBDIR)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.base.join(IMAGES_SUBDIR)
    }

    /// Paths of the triple identified by `stem`. No existence check.
    pub fn triple(&self, stem: &str) -> ArtifactTriple {
        ArtifactTriple {
            stem: stem.to_string(),
            html: self.html_dir().join(format!("{stem}.{HTML_EXT}")),
            tex: self.tex_dir().join(format!("{stem}.{TEX_EXT}")),
            image: self.images_dir().join(format!("{stem}.{IMAGE_EXT}")),
        }
    }

    /// Triple sharing the stem of an HTML file.
    pub fn triple_for(&self, html_path: &Path) -> ArtifactTriple {
        let mut triple = self.triple(&stem_of(html_path));
        triple.html = html_path.to_path_buf();
        triple
    }
}

/// HTML, TEX and image paths describing one source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactTriple {
    pub stem: String,
    pub html: PathBuf,
    pub tex: PathBuf,
    pub image: PathBuf,
}

impl ArtifactTriple {
    /// The image and TEX siblings that currently exist on disk.
    pub fn existing_siblings(&self) -> Vec<&Path> {
        [self.image.as_path(), self.tex.as_path()]
            .into_iter()
            .filter(|p| p.exists())
            .collect()
    }
}

/// File name without its extension.
pub fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// List `*.<ext>` files in `dir`, sorted by path.
///
/// With `recursive` the whole subtree is scanned. Entries whose metadata
/// cannot be read are skipped.
pub fn list_files(dir: &Path, ext: &str, recursive: bool) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(dir, ext, recursive, &mut files)?;
    files.sort();
    Ok(files)
}

/// Shorthand for [`list_files`] with the `.html` extension.
pub fn list_html_files(dir: &Path, recursive: bool) -> io::Result<Vec<PathBuf>> {
    list_files(dir, HTML_EXT, recursive)
}

fn collect_files(dir: &Path, ext: &str, recursive: bool, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if recursive {
                collect_files(&path, ext, recursive, out)?;
            }
        } else if path.extension().is_some_and(|e| e == ext) {
            out.push(path);
        }
    }
    Ok(())
}

/// Decode `bytes` as UTF-8, dropping every invalid sequence.
pub fn decode_text(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;
    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match e.error_len() {
                    Some(len) => rest = &after[len..],
                    None => return out,
                }
            }
        }
    }
}

/// Read a text file, dropping bytes that are not valid UTF-8.
pub fn read_text(path: &Path) -> io::Result<String> {
    std::fs::read(path).map(|bytes| decode_text(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn triple_uses_conventional_dirs() {
        let layout = DatasetLayout::new("/data");
        let t = layout.triple("t1");
        assert_eq!(t.html, PathBuf::from("/data/tables/html/t1.html"));
        assert_eq!(t.tex, PathBuf::from("/data/tables/tex_files/t1.tex"));
        assert_eq!(t.image, PathBuf::from("/data/tables/images/t1.jpeg"));
    }

    #[test]
    fn stem_of_drops_extension() {
        assert_eq!(stem_of(Path::new("a/b/2301.00001_t3.html")), "2301.00001_t3");
    }

    #[test]
    fn list_files_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.html"), "").unwrap();
        std::fs::write(dir.path().join("a.html"), "").unwrap();
        std::fs::write(dir.path().join("c.tex"), "").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/d.html"), "").unwrap();

        let flat = list_html_files(dir.path(), false).unwrap();
        let names: Vec<String> = flat.iter().map(|p| stem_of(p)).collect();
        assert_eq!(names, vec!["a", "b"]);

        let deep = list_html_files(dir.path(), true).unwrap();
        assert_eq!(deep.len(), 3);
    }

    #[test]
    fn decode_text_drops_invalid_bytes() {
        assert_eq!(decode_text(b"a\xFFb\xC3\xA9"), "ab\u{e9}");
        // Truncated sequence at the end.
        assert_eq!(decode_text(b"x\xE2\x80"), "x");
        assert_eq!(decode_text(b"plain"), "plain");
    }

    #[test]
    fn existing_siblings_skips_missing() {
        let dir = TempDir::new().unwrap();
        let layout = DatasetLayout::new(dir.path());
        std::fs::create_dir_all(layout.tex_dir()).unwrap();
        std::fs::write(layout.tex_dir().join("t1.tex"), "").unwrap();

        let triple = layout.triple("t1");
        assert_eq!(triple.existing_siblings(), vec![triple.tex.as_path()]);
    }
}
