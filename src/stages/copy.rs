//! Selection stage: copy a bounded prefix of the manifest out of a bulk source.
//!
//! Every selected record contributes three copies (HTML, image, TEX), each
//! landing in its own flat output directory under the file's base name.
//! A failed copy aborts the stage.

use crate::config::CopyOptions;
use crate::error::PrepError;
use crate::progress::StageProgressCallback;
use crate::stages::manifest::{read_manifest, ManifestRecord};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Result of the copy stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopySummary {
    /// Manifest records copied.
    pub records: usize,
    /// Individual files copied.
    pub files: usize,
}

/// Copy the first `opts.limit` records of the manifest at `manifest_path`.
pub fn copy_selection(
    manifest_path: &Path,
    opts: &CopyOptions,
    progress: &dyn StageProgressCallback,
) -> Result<CopySummary, PrepError> {
    let records = read_manifest(manifest_path)?;
    copy_records(&records, opts, progress)
}

/// Copy the first `opts.limit` of `records`.
pub fn copy_records(
    records: &[ManifestRecord],
    opts: &CopyOptions,
    progress: &dyn StageProgressCallback,
) -> Result<CopySummary, PrepError> {
    for dir in [&opts.html_out, &opts.image_out, &opts.tex_out] {
        std::fs::create_dir_all(dir).map_err(|e| PrepError::WriteFailed {
            path: dir.clone(),
            source: e,
        })?;
    }

    let selected = &records[..records.len().min(opts.limit)];
    info!(
        "Copying {} of {} manifest records from {}",
        selected.len(),
        records.len(),
        opts.source_root.display()
    );
    progress.on_stage_start("copy", selected.len());

    let mut summary = CopySummary::default();
    for (i, record) in selected.iter().enumerate() {
        let html_src = opts.source_root.join(&record.html_path);
        progress.on_file_start(i + 1, selected.len(), &html_src);

        for (rel, out_dir) in [
            (&record.html_path, &opts.html_out),
            (&record.image_path, &opts.image_out),
            (&record.tex_path, &opts.tex_out),
        ] {
            copy_one(&opts.source_root.join(rel), out_dir)?;
            summary.files += 1;
        }

        summary.records += 1;
        progress.on_file_complete(i + 1, selected.len(), &html_src, true);
    }

    progress.on_stage_complete("copy", selected.len(), summary.records);
    Ok(summary)
}

fn copy_one(from: &Path, out_dir: &Path) -> Result<PathBuf, PrepError> {
    let to = out_dir.join(from.file_name().unwrap_or_default());
    std::fs::copy(from, &to).map_err(|e| PrepError::CopyFailed {
        from: from.to_path_buf(),
        to: to.clone(),
        source: e,
    })?;
    debug!("Copied {} -> {}", from.display(), to.display());
    Ok(to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::DatasetLayout;
    use crate::progress::NoopProgressCallback;
    use crate::stages::manifest::manifest_record;
    use tempfile::TempDir;

    fn seed_source(root: &Path, stems: &[&str]) {
        let layout = DatasetLayout::new(root);
        for dir in [layout.html_dir(), layout.tex_dir(), layout.images_dir()] {
            std::fs::create_dir_all(dir).unwrap();
        }
        for stem in stems {
            let t = layout.triple(stem);
            std::fs::write(t.html, format!("<table id=\"{stem}\"></table>")).unwrap();
            std::fs::write(t.tex, "\\begin{tabular}{c}\\end{tabular}").unwrap();
            std::fs::write(t.image, [0xFF, 0xD8]).unwrap();
        }
    }

    fn options(src: &Path, out: &Path, limit: usize) -> CopyOptions {
        CopyOptions {
            source_root: src.to_path_buf(),
            limit,
            html_out: out.join("table_html"),
            image_out: out.join("table_images"),
            tex_out: out.join("table_tex"),
        }
    }

    #[test]
    fn copies_only_the_prefix() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        seed_source(src.path(), &["a", "b", "c"]);
        let records: Vec<_> = ["a.html", "b.html", "c.html"]
            .iter()
            .map(|n| manifest_record(n))
            .collect();

        let opts = options(src.path(), out.path(), 2);
        let summary = copy_records(&records, &opts, &NoopProgressCallback).unwrap();

        assert_eq!(summary, CopySummary { records: 2, files: 6 });
        assert!(opts.html_out.join("a.html").exists());
        assert!(opts.image_out.join("b.jpeg").exists());
        assert!(opts.tex_out.join("b.tex").exists());
        assert!(!opts.html_out.join("c.html").exists());
    }

    #[test]
    fn missing_source_file_aborts() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        seed_source(src.path(), &["a"]);
        std::fs::remove_file(DatasetLayout::new(src.path()).triple("a").image).unwrap();

        let opts = options(src.path(), out.path(), 10);
        let err = copy_records(&[manifest_record("a.html")], &opts, &NoopProgressCallback)
            .unwrap_err();
        assert!(matches!(err, PrepError::CopyFailed { .. }));
    }
}
