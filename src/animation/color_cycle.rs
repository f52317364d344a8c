/// Straight-alpha RGBA8 colour.
pub type Rgba8 = [u8; 4];

/// Step `c` one unit along the hue cycle red -> yellow -> green -> cyan -> blue -> magenta -> red.
///
/// Colours on the cycle have one channel at 255, one at 0, and one in between. Any other colour
/// is nudged towards the cycle and reaches it after a bounded number of steps; no colour maps
/// to itself. Alpha is left alone.
pub fn color_cycle(c: Rgba8) -> Rgba8 {
    let [mut r, mut g, mut b, a] = c;
    match (r, g, b) {
        (255, g0, 0) if g0 < 255 => g += 1,
        (r0, 255, 0) if r0 > 0 => r -= 1,
        (0, 255, b0) if b0 < 255 => b += 1,
        (0, g0, 255) if g0 > 0 => g -= 1,
        (r0, 0, 255) if r0 < 255 => r += 1,
        (255, 0, b0) if b0 > 0 => b -= 1,
        _ => {
            // Off the cycle: push green up, pull the weaker of red/blue down, and move the
            // dominant one towards an edge.
            if g < 255 {
                g += 1;
            }
            if r < 128 && r > 0 {
                r -= 1;
            }
            if b < 128 && b > 0 {
                b -= 1;
            }
            if r >= 128 {
                if b >= 128 {
                    r -= 1;
                    if b < 255 {
                        b += 1;
                    }
                } else {
                    if r < 255 {
                        r += 1;
                    }
                    if b > 0 {
                        b -= 1;
                    }
                }
            } else if b >= 128 && b < 255 {
                b += 1;
            }
        }
    }
    [r, g, b, a]
}

/// Apply [`color_cycle`] `steps` times.
pub fn color_cycle_n(mut c: Rgba8, steps: u32) -> Rgba8 {
    for _ in 0..steps {
        c = color_cycle(c);
    }
    c
}

#[cfg(test)]
#[path = "../../tests/unit/animation/color_cycle.rs"]
mod tests;
