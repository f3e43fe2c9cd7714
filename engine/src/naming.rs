use std::path::{Path, PathBuf};

/// Longest prompt prefix, in characters, that ends up in a derived file name.
pub const MAX_PREFIX_CHARS: usize = 170;

pub fn prompt_prefix(prompt: &str) -> String {
    prompt
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .take(MAX_PREFIX_CHARS)
        .collect()
}

/// File name used when no output path is given. `idx` is 1-based.
pub fn default_file_name(prompt: &str, steps: u32, scale: f64, idx: u64) -> String {
    format!(
        "{}__steps_{steps}__scale_{scale:.2}__n_{idx}.png",
        prompt_prefix(prompt)
    )
}

/// `out/x.png` -> `out/x-{n}.png`. Paths without an extension get `-{n}.png`.
pub fn indexed_path(path: &Path, n: u64) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}-{n}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{n}.png"),
    };
    path.with_file_name(name)
}
