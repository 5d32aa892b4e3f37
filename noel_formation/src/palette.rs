//! Packed ARGB colours (0xAARRGGBB, A = 0xFF) for the tree's materials.

use rand::Rng;

pub const EMERALD:       u32 = 0xFF023020;
pub const FOREST:        u32 = 0xFF0F4D33;
pub const GOLD:          u32 = 0xFFFFD700;
pub const METALLIC_GOLD: u32 = 0xFFD4AF37;
pub const BURGUNDY:      u32 = 0xFF800020;
pub const WARM_WHITE:    u32 = 0xFFFFFDD0;
pub const PURE_WHITE:    u32 = 0xFFFFFFFF;

/// Pick one colour uniformly from `palette`; an empty palette yields gold.
pub fn pick<R: Rng + ?Sized>(rng: &mut R, palette: &[u32]) -> u32 {
    if palette.is_empty() {
        return GOLD;
    }
    palette[rng.random_range(0..palette.len())]
}

/// Linear blend of two ARGB colours. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
pub fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let mix = |shift: u32| {
        let ca = ((a >> shift) & 0xFF) as f32;
        let cb = ((b >> shift) & 0xFF) as f32;
        ((ca * (1.0 - t) + cb * t).round() as u32) << shift
    };
    0xFF000000 | mix(16) | mix(8) | mix(0)
}

/// Scale a colour's brightness; `k` is clamped to `0.0..=1.0`.
pub fn dim(c: u32, k: f32) -> u32 {
    blend(0xFF000000, c, k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(EMERALD, GOLD, 0.0), EMERALD);
        assert_eq!(blend(EMERALD, GOLD, 1.0), GOLD);
    }

    #[test]
    fn blend_is_opaque() {
        assert_eq!(blend(0x00000000, 0x00FFFFFF, 0.5) >> 24, 0xFF);
    }

    #[test]
    fn pick_stays_in_palette() {
        let mut rng = StdRng::seed_from_u64(7);
        let pal = [GOLD, BURGUNDY, EMERALD];
        for _ in 0..100 {
            assert!(pal.contains(&pick(&mut rng, &pal)));
        }
        assert_eq!(pick(&mut rng, &[]), GOLD);
    }
}
