// THEORY:
// Side-by-side stereo video stores the left eye in the left half of every frame
// and the right eye in the right half. Splitting at the horizontal midpoint
// gives the two equally sized views the matcher expects; with an odd width the
// last column is dropped so both halves match.
//
// The matcher answers with 16-bit signed disparities. For display and for the
// output video they are narrowed to 8 bits with saturation (negative values
// become 0, values above 255 become 255) and repeated into three channels.

use image::{ImageBuffer, Luma, Rgb, RgbImage, imageops};

/// A decoded video frame, 8-bit RGB.
pub type Frame = RgbImage;

/// Single channel output of the stereo matcher.
pub type DisparityMap = ImageBuffer<Luma<i16>, Vec<i16>>;

/// Splits a side-by-side frame into its `(left, right)` views.
///
/// Returns `None` for frames narrower than two pixels.
pub fn split_stereo(frame: &Frame) -> Option<(Frame, Frame)> {
    let (width, height) = frame.dimensions();
    let half = width / 2;
    if half == 0 || height == 0 {
        return None;
    }
    let left = imageops::crop_imm(frame, 0, 0, half, height).to_image();
    let right = imageops::crop_imm(frame, half, 0, half, height).to_image();
    Some((left, right))
}

/// Narrows a disparity map to a displayable 3-channel image.
pub fn disparity_to_rgb(disparity: &DisparityMap) -> Frame {
    let (width, height) = disparity.dimensions();
    ImageBuffer::from_fn(width, height, |x, y| {
        let Luma([d]) = *disparity.get_pixel(x, y);
        let v = d.clamp(0, u8::MAX as i16) as u8;
        Rgb([v, v, v])
    })
}
