use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::modules::inference::{Detection, IssueLabel};

const MASK_ALPHA: f32 = 0.45;
const BOX_THICKNESS: i32 = 2;

/// Draw every detection's mask and box onto `image` in the label's color
pub fn annotate(mut image: RgbImage, detections: &[Detection], label: IssueLabel) -> RgbImage {
    let color = label.color();
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image;
    }

    for detection in detections {
        let mask = &detection.mask;
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            let mx = x as usize * mask.width / width as usize;
            let my = y as usize * mask.height / height as usize;
            if mask.get(mx, my) {
                for (channel, tint) in pixel.0.iter_mut().zip(color) {
                    *channel = blend(*channel, tint);
                }
            }
        }

        let x_min = (detection.bbox[0] * width as f32).floor() as i32;
        let y_min = (detection.bbox[1] * height as f32).floor() as i32;
        let x_max = (detection.bbox[2] * width as f32).ceil() as i32;
        let y_max = (detection.bbox[3] * height as f32).ceil() as i32;

        for t in 0..BOX_THICKNESS {
            let w = x_max - x_min - 2 * t;
            let h = y_max - y_min - 2 * t;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(x_min + t, y_min + t).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(&mut image, rect, Rgb(color));
        }
    }

    image
}

fn blend(base: u8, tint: u8) -> u8 {
    (f32::from(base) * (1.0 - MASK_ALPHA) + f32::from(tint) * MASK_ALPHA).round() as u8
}
