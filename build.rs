// build.rs

use glob::glob;
use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A matrix file shipped under `data/`, paired with the test name generated for it.
#[derive(Debug)]
struct CorpusMatrix {
    pub test_name: String,
    pub path: PathBuf,
}

/// Turns a path such as `data/def_pos/spd-4.mtx` into `def_pos_spd_4`.
fn sanitize(path: &Path) -> String {
    let stem = path.with_extension("");
    let rel = stem.strip_prefix("data").unwrap_or(&stem);
    rel.to_string_lossy()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}

/// Discovers every Matrix Market file below `data/`.
fn get_all_matrices() -> Vec<CorpusMatrix> {
    let mut matrices: Vec<CorpusMatrix> = glob("data/**/*.mtx")
        .expect("Failed to read glob pattern")
        .filter_map(Result::ok)
        .map(|path| CorpusMatrix {
            test_name: sanitize(&path),
            path,
        })
        .collect();
    matrices.sort_by(|a, b| a.path.cmp(&b.path));
    matrices
}

fn main() {
    println!("cargo:rerun-if-changed=data");
    println!("cargo:rerun-if-changed=build.rs");

    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("corpus_tests.rs");
    let mut file = BufWriter::new(File::create(&dest_path).unwrap());
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();

    // One `#[test]` per matrix file.
    for matrix in get_all_matrices() {
        let abs_path = Path::new(&manifest_dir).join(&matrix.path);
        writeln!(
            file,
            r#"
#[test]
fn corpus_{fn_name}() -> anyhow::Result<()> {{
    check_corpus_matrix("{path}")
}}
"#,
            fn_name = matrix.test_name,
            path = abs_path.to_string_lossy().escape_default()
        )
        .unwrap();
    }
}
