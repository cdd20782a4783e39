//! Build script collecting program version information for output metadata.

fn main() {
    built::write_built_file().expect("Failed to acquire build-time information");
}
