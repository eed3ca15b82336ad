//! Print chroma-key alpha for a set of probe colors.
//!
//! Usage: cargo run --example chroma_probe [similarity] [smoothness]
//!        cargo run --example chroma_probe -- --shaders

use arsticker::chroma::{self, ChromaKeyParams};

const PROBES: [(&str, [f32; 3]); 9] = [
    ("key green", [0.0, 1.0, 0.0]),
    ("dark green", [0.0, 0.45, 0.0]),
    ("lit screen", [0.35, 0.9, 0.3]),
    ("spill edge", [0.45, 0.7, 0.4]),
    ("skin", [0.9, 0.7, 0.6]),
    ("white", [1.0, 1.0, 1.0]),
    ("black", [0.0, 0.0, 0.0]),
    ("red", [1.0, 0.0, 0.0]),
    ("blue", [0.0, 0.0, 1.0]),
];

fn parse_arg(index: usize, default: f32) -> f32 {
    match std::env::args().nth(index) {
        Some(arg) => match arg.parse::<f32>() {
            Ok(v) => v,
            Err(e) => {
                eprintln!("Invalid number '{}': {}", arg, e);
                std::process::exit(1);
            }
        },
        None => default,
    }
}

fn main() {
    env_logger::init();

    if std::env::args().any(|a| a == "--shaders") {
        println!("// vertex\n{}", chroma::VERTEX_SHADER.trim());
        println!("\n// fragment\n{}", chroma::FRAGMENT_SHADER.trim());
        return;
    }

    let defaults = ChromaKeyParams::default();
    let params = ChromaKeyParams {
        similarity: parse_arg(1, defaults.similarity),
        smoothness: parse_arg(2, defaults.smoothness),
        ..defaults
    };

    println!(
        "key={:?}  similarity={:.3}  smoothness={:.3}",
        params.key_color, params.similarity, params.smoothness
    );
    println!("{:<12} {:>18} {:>8} {:>7}", "probe", "uv", "dist", "alpha");

    for (name, rgb) in PROBES {
        let [u, v] = chroma::rgb_to_uv(rgb);
        let distance = chroma::chroma_distance(rgb, params.key_color);
        let alpha = chroma::chroma_key_alpha(rgb, 1.0, &params);
        println!(
            "{:<12} ({:+.3}, {:+.3}) {:>8.3} {:>7.3}",
            name, u, v, distance, alpha
        );
    }

    let cropped = params.with_crop(0.1, 0.05);
    println!("\ncrop top=0.10 bottom=0.05:");
    for v in [0.0, 0.5, 1.0] {
        println!("  v={:.2} -> {:.3}", v, chroma::crop_v(v, &cropped));
    }
}
