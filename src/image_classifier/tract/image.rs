use image::{imageops, DynamicImage};
use tract_onnx::prelude::*;

/// Crops the largest centered square, then scales it to `size` x `size`.
pub fn center_crop_square(image: &DynamicImage, size: u32) -> DynamicImage {
    let (w, h) = (image.width(), image.height());
    let side = w.min(h);
    let x_offset = (w - side) / 2;
    let y_offset = (h - side) / 2;

    image
        .crop_imm(x_offset, y_offset, side, side)
        .resize_exact(size, size, imageops::FilterType::Triangle)
}

/// NHWC tensor with channels scaled from `[0, 255]` to `[-1, 1]`.
fn image_to_tensor(image: &DynamicImage) -> TractResult<Tensor> {
    let rgb = image.to_rgb8();
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);

    let array = tract_ndarray::Array4::from_shape_fn((1, height, width, 3), |(_, y, x, c)| {
        let pixel = rgb.get_pixel(x as u32, y as u32);
        pixel[c] as f32 / 127.5 - 1.0
    });

    Ok(array.into_tensor())
}

pub fn frame_to_tensor(image: &DynamicImage, size: u32) -> TractResult<Tensor> {
    let cropped = center_crop_square(image, size);
    image_to_tensor(&cropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        let mut img = ImageBuffer::new(width, height);
        for pixel in img.pixels_mut() {
            *pixel = Rgb(color);
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_tensor_shape_is_nhwc() {
        let tensor = frame_to_tensor(&solid(640, 480, [255, 0, 0]), 224).unwrap();
        assert_eq!(tensor.shape(), &[1, 224, 224, 3]);
    }

    #[test]
    fn test_values_scaled_to_unit_range() {
        let tensor = frame_to_tensor(&solid(100, 100, [255, 0, 0]), 32).unwrap();
        let slice = tensor.as_slice::<f32>().unwrap();

        assert!((slice[0] - 1.0).abs() < 1e-6);
        assert!((slice[1] + 1.0).abs() < 1e-6);
        assert!((slice[2] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_center_crop_drops_the_sides() {
        // 300x100: left and right thirds are black, the middle is white
        let mut img = ImageBuffer::new(300, 100);
        for (x, _, pixel) in img.enumerate_pixels_mut() {
            *pixel = if (100..200).contains(&x) {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            };
        }

        let cropped = center_crop_square(&DynamicImage::ImageRgb8(img), 10).to_rgb8();

        assert_eq!(cropped.dimensions(), (10, 10));
        assert_eq!(cropped.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(cropped.get_pixel(9, 9), &Rgb([255, 255, 255]));
    }
}
