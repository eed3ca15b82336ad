//! Chroma-key compositing contract.
//!
//! Pixels are compared with the key color in the chroma (UV) plane of
//! BT.601 YUV, so brightness differences across a lit green screen do not
//! matter. The distance goes through a smoothstep between `similarity` and
//! `similarity + smoothness` and multiplies the source alpha. The GLSL
//! sources handed to the renderer and the CPU functions below implement the
//! same rule.

/// Shader parameters for the keyed video plane.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromaKeyParams {
    /// Linear RGB in [0, 1].
    pub key_color: [f32; 3],
    /// Chroma distance at or below which pixels are fully transparent.
    pub similarity: f32,
    /// Width of the soft edge above `similarity`. Keep it above zero for
    /// GLSL `smoothstep`.
    pub smoothness: f32,
    /// Fraction of the source height cut from the top (letterbox bars).
    pub crop_top: f32,
    /// Fraction of the source height cut from the bottom.
    pub crop_bottom: f32,
}

impl Default for ChromaKeyParams {
    fn default() -> Self {
        Self {
            key_color: [0.0, 1.0, 0.0],
            similarity: 0.4,
            smoothness: 0.1,
            crop_top: 0.0,
            crop_bottom: 0.0,
        }
    }
}

impl ChromaKeyParams {
    /// Same parameters with a per-media crop.
    pub fn with_crop(mut self, crop_top: f32, crop_bottom: f32) -> Self {
        let finite_or_zero = |v: f32| if v.is_finite() { v } else { 0.0 };
        self.crop_top = finite_or_zero(crop_top).max(0.0).min(1.0);
        self.crop_bottom = finite_or_zero(crop_bottom).max(0.0).min(1.0 - self.crop_top);
        self
    }
}

/// Project RGB onto the BT.601 chroma plane, offset into [0, 1].
pub fn rgb_to_uv(rgb: [f32; 3]) -> [f32; 2] {
    let [r, g, b] = rgb;
    [
        r * -0.169 + g * -0.331 + b * 0.5 + 0.5,
        r * 0.5 + g * -0.419 + b * -0.081 + 0.5,
    ]
}

/// Euclidean distance between two colors in the chroma plane.
pub fn chroma_distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    let [au, av] = rgb_to_uv(a);
    let [bu, bv] = rgb_to_uv(b);
    (au - bu).hypot(av - bv)
}

/// GLSL `smoothstep`, degrading to a hard step when `edge1 <= edge0`.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Keying mask in [0, 1] for a chroma distance.
pub fn key_mask(distance: f32, params: &ChromaKeyParams) -> f32 {
    smoothstep(
        params.similarity,
        params.similarity + params.smoothness,
        distance,
    )
}

/// Output alpha for one pixel.
pub fn chroma_key_alpha(pixel: [f32; 3], source_alpha: f32, params: &ChromaKeyParams) -> f32 {
    source_alpha * key_mask(chroma_distance(pixel, params.key_color), params)
}

/// Map a plane V coordinate (0 = bottom) into the cropped source texture.
pub fn crop_v(v: f32, params: &ChromaKeyParams) -> f32 {
    params.crop_bottom + v * (1.0 - params.crop_top - params.crop_bottom)
}

pub const VERTEX_SHADER: &str = r#"
varying vec2 vUv;

void main() {
    vUv = uv;
    gl_Position = projectionMatrix * modelViewMatrix * vec4(position, 1.0);
}
"#;

pub const FRAGMENT_SHADER: &str = r#"
uniform sampler2D videoTexture;
uniform vec3 keyColor;
uniform float similarity;
uniform float smoothness;
uniform float cropTop;
uniform float cropBottom;
varying vec2 vUv;

vec2 rgbToUv(vec3 rgb) {
    return vec2(
        rgb.r * -0.169 + rgb.g * -0.331 + rgb.b * 0.5 + 0.5,
        rgb.r * 0.5 + rgb.g * -0.419 + rgb.b * -0.081 + 0.5
    );
}

void main() {
    vec2 uv = vec2(vUv.x, cropBottom + vUv.y * (1.0 - cropTop - cropBottom));
    vec4 texColor = texture2D(videoTexture, uv);
    float chromaDist = distance(rgbToUv(texColor.rgb), rgbToUv(keyColor));
    float mask = smoothstep(similarity, similarity + smoothness, chromaDist);
    gl_FragColor = vec4(texColor.rgb, texColor.a * mask);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_color_is_transparent() {
        let params = ChromaKeyParams::default();
        assert_eq!(chroma_key_alpha([0.0, 1.0, 0.0], 1.0, &params), 0.0);
        // Brightness alone does not escape the key.
        assert_eq!(chroma_key_alpha([0.0, 0.8, 0.0], 1.0, &params), 0.0);
    }

    #[test]
    fn test_distant_colors_keep_source_alpha() {
        let params = ChromaKeyParams::default();
        for pixel in [[1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]] {
            assert!(chroma_distance(pixel, params.key_color) >= 0.5);
            assert_eq!(chroma_key_alpha(pixel, 0.75, &params), 0.75);
        }
    }

    #[test]
    fn test_soft_edge_between_thresholds() {
        let params = ChromaKeyParams::default();
        assert!((key_mask(0.45, &params) - 0.5).abs() < 1e-6);
        assert_eq!(key_mask(0.4, &params), 0.0);
        assert_eq!(key_mask(0.5, &params), 1.0);
        let low = key_mask(0.42, &params);
        let high = key_mask(0.48, &params);
        assert!(0.0 < low && low < high && high < 1.0);
    }

    #[test]
    fn test_zero_smoothness_is_hard_step() {
        let params = ChromaKeyParams {
            smoothness: 0.0,
            ..ChromaKeyParams::default()
        };
        assert_eq!(key_mask(0.39, &params), 0.0);
        assert_eq!(key_mask(0.4, &params), 1.0);
    }

    #[test]
    fn test_crop_remaps_vertical() {
        let params = ChromaKeyParams::default().with_crop(0.1, 0.2);
        assert!((crop_v(0.0, &params) - 0.2).abs() < 1e-6);
        assert!((crop_v(1.0, &params) - 0.9).abs() < 1e-6);
        assert_eq!(crop_v(0.5, &ChromaKeyParams::default()), 0.5);
    }

    #[test]
    fn test_crop_sanitizes_bad_values() {
        let params = ChromaKeyParams::default().with_crop(f32::NAN, 0.0);
        assert_eq!(params.crop_top, 0.0);
        assert_eq!(params.crop_bottom, 0.0);

        let params = ChromaKeyParams::default().with_crop(0.8, f32::INFINITY);
        assert_eq!(params.crop_top, 0.8);
        assert_eq!(params.crop_bottom, 0.0);

        let params = ChromaKeyParams::default().with_crop(0.7, 0.5);
        assert!((params.crop_bottom - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_shader_declares_contract_uniforms() {
        for name in ["videoTexture", "keyColor", "similarity", "smoothness", "cropTop", "cropBottom"] {
            assert!(FRAGMENT_SHADER.contains(name), "missing uniform {}", name);
        }
    }
}
