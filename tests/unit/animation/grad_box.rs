use super::*;

const GREEN: Rgba8 = [0, 255, 0, 255];

fn alpha(gb: &GradBox, x: u32, y: u32) -> u8 {
    gb.mask().get_pixel(x, y).0[0]
}

#[test]
fn rejects_empty_size() {
    assert!(GradBox::new(0, 5, GREEN).is_err());
    assert!(GradBox::new(5, 0, GREEN).is_err());
}

#[test]
fn small_box_is_all_gradient() {
    let gb = GradBox::new(4, 8, GREEN).unwrap();
    assert_eq!(gb.gradient_bounds(), PixelRect::from_size(4, 8));
    // rows ramp 0, 32, 64, ... 224
    for y in 0..8 {
        assert_eq!(alpha(&gb, 0, y), (32 * y) as u8);
        assert_eq!(alpha(&gb, 3, y), (32 * y) as u8);
    }
}

#[test]
fn large_box_has_border_with_soft_outer_ring() {
    let gb = GradBox::new(60, 40, GREEN).unwrap();
    // bw = min(40/10, 5) = 4
    assert_eq!(gb.gradient_bounds(), PixelRect::new(4, 4, 56, 36).unwrap());
    assert_eq!(alpha(&gb, 30, 0), 128);
    assert_eq!(alpha(&gb, 30, 39), 128);
    assert_eq!(alpha(&gb, 0, 20), 128);
    assert_eq!(alpha(&gb, 59, 20), 128);
    assert_eq!(alpha(&gb, 30, 1), 255);
    assert_eq!(alpha(&gb, 2, 20), 255);
    assert_eq!(alpha(&gb, 57, 20), 255);
    // gradient starts transparent at its top row
    assert_eq!(alpha(&gb, 30, 4), 0);
}

#[test]
fn thin_border_has_no_soft_ring() {
    let gb = GradBox::new(20, 20, GREEN).unwrap();
    // bw = 2
    assert_eq!(alpha(&gb, 10, 0), 255);
    assert_eq!(alpha(&gb, 0, 10), 255);
    assert_eq!(gb.gradient_bounds(), PixelRect::new(2, 2, 18, 18).unwrap());
}

#[test]
fn cycle_gradient_scrolls_and_wraps() {
    let mut gb = GradBox::new(4, 8, GREEN).unwrap();
    gb.cycle_gradient(1);
    // the last ramp value moves to the top row
    assert_eq!(alpha(&gb, 0, 0), 224);
    assert_eq!(alpha(&gb, 0, 1), 0);

    gb.cycle_gradient(7);
    assert_eq!(gb.offset(), 0);
    assert_eq!(alpha(&gb, 0, 0), 0);
}

#[test]
fn cycle_color_steps_along_hue() {
    let mut gb = GradBox::new(4, 4, [255, 0, 0, 255]).unwrap();
    gb.cycle_color(10);
    assert_eq!(gb.color(), [255, 10, 0, 255]);
    gb.set_color(GREEN);
    assert_eq!(gb.color(), GREEN);
}

#[test]
fn draw_uses_mask_as_alpha_and_leaves_uncovered_pixels() {
    let gb = GradBox::new(2, 2, GREEN).unwrap();
    // 2x2 gradient rows: alpha 0, 128
    let mut dst = FrameBuffer::new(4, 3).unwrap();
    dst.pixels_mut().fill(9);

    gb.draw(&mut dst, PixelRect::new(1, 0, 4, 3).unwrap());

    let px = |x: usize, y: usize| {
        let i = y * 16 + x * 4;
        dst.pixels()[i..i + 4].to_vec()
    };
    assert_eq!(px(0, 0), vec![9, 9, 9, 9]);
    assert_eq!(px(1, 0), vec![0, 0, 0, 0]);
    assert_eq!(px(1, 1), vec![0, 255, 0, 128]);
    assert_eq!(px(2, 1), vec![0, 255, 0, 128]);
    assert_eq!(px(3, 1), vec![9, 9, 9, 9]);
    assert_eq!(px(1, 2), vec![9, 9, 9, 9]);
}

#[test]
fn draw_is_clipped_to_destination() {
    let gb = GradBox::new(6, 6, GREEN).unwrap();
    let mut dst = FrameBuffer::new(3, 3).unwrap();
    gb.draw(&mut dst, PixelRect::new(1, 1, 7, 7).unwrap());
    assert_eq!(dst.pixels().len(), 36);
    // second gradient row of a 6-row ramp: 256 / 6
    assert_eq!(&dst.pixels()[32..36], &[0, 255, 0, 42]);
    assert_eq!(&dst.pixels()[0..4], &[0, 0, 0, 0]);
}
