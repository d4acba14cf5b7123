//! File tags used by a hook's `types` filter.
//!
//! Every path is tagged `file`, gets tags for its extension or well-known
//! name, and exactly one of `text` / `binary`.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

/// Bytes inspected when sniffing for binary content.
const SNIFF_LEN: u64 = 8 * 1024;

/// Extension → tags. Every entry here is text.
const TEXT_EXTENSIONS: &[(&str, &[&str])] = &[
    ("bash", &["shell", "bash"]),
    ("c", &["c"]),
    ("cfg", &["ini"]),
    ("cpp", &["c++"]),
    ("css", &["css"]),
    ("csv", &["csv"]),
    ("go", &["go"]),
    ("h", &["header", "c"]),
    ("html", &["html"]),
    ("ini", &["ini"]),
    ("java", &["java"]),
    ("js", &["javascript"]),
    ("json", &["json"]),
    ("jsx", &["javascript", "jsx"]),
    ("md", &["markdown"]),
    ("pyi", &["pyi", "python"]),
    ("py", &["python"]),
    ("rb", &["ruby"]),
    ("rs", &["rust"]),
    ("rst", &["rst"]),
    ("sh", &["shell", "sh"]),
    ("sql", &["sql"]),
    ("toml", &["toml"]),
    ("ts", &["ts"]),
    ("tsx", &["tsx"]),
    ("txt", &["plain-text"]),
    ("xml", &["xml"]),
    ("yaml", &["yaml"]),
    ("yml", &["yaml"]),
    ("zsh", &["shell", "zsh"]),
];

/// Extension → tags. Every entry here is binary.
const BINARY_EXTENSIONS: &[(&str, &[&str])] = &[
    ("gif", &["image", "gif"]),
    ("gz", &["gzip"]),
    ("ico", &["icon"]),
    ("jar", &["jar", "zip"]),
    ("jpeg", &["image", "jpeg"]),
    ("jpg", &["image", "jpeg"]),
    ("pdf", &["pdf"]),
    ("png", &["image", "png"]),
    ("so", &["shared-object"]),
    ("tar", &["tar"]),
    ("wasm", &["wasm"]),
    ("whl", &["wheel", "zip"]),
    ("zip", &["zip"]),
];

/// Well-known extensionless names.
const NAMES: &[(&str, &[&str])] = &[
    ("Dockerfile", &["dockerfile"]),
    ("Makefile", &["makefile"]),
    ("Cargo.lock", &["toml"]),
    ("LICENSE", &["plain-text"]),
];

/// Compute the tags of `path` (relative to `root`).
///
/// Paths with unknown extensions are sniffed for a NUL byte when they exist
/// on disk; missing files are assumed to be text.
#[must_use]
pub fn tags_for_path(root: &Path, path: &str) -> BTreeSet<&'static str> {
    let mut tags = BTreeSet::from(["file"]);
    let file_name = path.rsplit('/').next().unwrap_or(path);

    if let Some((_, named)) = NAMES.iter().find(|(name, _)| *name == file_name) {
        tags.extend(named.iter().copied());
        tags.insert("text");
        return tags;
    }

    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    if let Some(ext) = ext.as_deref() {
        if let Some((_, t)) = TEXT_EXTENSIONS.iter().find(|(e, _)| *e == ext) {
            tags.extend(t.iter().copied());
            tags.insert("text");
            return tags;
        }
        if let Some((_, t)) = BINARY_EXTENSIONS.iter().find(|(e, _)| *e == ext) {
            tags.extend(t.iter().copied());
            tags.insert("binary");
            return tags;
        }
    }

    tags.insert(if is_binary(&root.join(path)) {
        "binary"
    } else {
        "text"
    });
    tags
}

fn is_binary(path: &Path) -> bool {
    let Ok(file) = std::fs::File::open(path) else {
        return false;
    };
    let mut buf = Vec::new();
    if file.take(SNIFF_LEN).read_to_end(&mut buf).is_err() {
        return false;
    }
    buf.contains(&0)
}
