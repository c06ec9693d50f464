use std::env;
use std::fs;
use std::path::Path;

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("help_content.rs");

    let help_content = fs::read_to_string("docs/HELP.md").unwrap_or_default();

    let content = format!(
        "pub const HELP_CONTENT: &str = {:?};",
        help_content.trim_end()
    );

    fs::write(dest_path, content).unwrap();

    // Re-run build script if HELP.md changes
    println!("cargo:rerun-if-changed=docs/HELP.md");
}
