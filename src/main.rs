//! # Voxel Pipeline Entry Point
//!
//! Headless demo binary. It calls into the library's `run()` function, which
//! builds the chunks around the origin and logs pipeline statistics.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- config.json
//! ```

fn main() {
    if let Err(err) = voxel_pipeline::run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}
