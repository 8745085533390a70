// THEORY (single-pixel colour space):
// The `hsv` module is the most fundamental unit of the segmentation layer. It turns
// one RGB pixel into hue/saturation/value with no knowledge of its neighbours. A
// note is identified first and foremost by its hue, which stays put under the
// brightness swings of an arena, so thresholding happens in HSV rather than RGB.
//
// Scale: the 8-bit convention used by the tuned colour bands.
// - hue:        degrees / 2, so the wheel fits a byte as 0..180
// - saturation: chroma / value, scaled to 0..255
// - value:      max(R, G, B)
// Rounding is half-to-even, which keeps band edges where the tuning put them.

use image::Rgb;

pub type Hue = u8;
pub type Saturation = u8;
pub type Value = u8;

/// A pixel on the 8-bit HSV scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HsvPixel {
    /// Hue in half-degrees (0..=180).
    pub hue: Hue,
    pub saturation: Saturation,
    pub value: Value,
}

impl HsvPixel {
    pub const fn new(hue: Hue, saturation: Saturation, value: Value) -> Self {
        Self {
            hue,
            saturation,
            value,
        }
    }

    /// Converts one RGB pixel.
    ///
    /// - Value is the largest channel.
    /// - Saturation is the channel spread relative to Value; black has none.
    /// - Hue is the angle on the colour wheel; greys get hue 0.
    pub fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        let maximum_channel = red.max(green).max(blue);
        let minimum_channel = red.min(green).min(blue);
        let chroma = (maximum_channel - minimum_channel) as f32;

        let saturation = if maximum_channel == 0 {
            0.0
        } else {
            chroma * 255.0 / maximum_channel as f32
        };

        let hue_degrees = if chroma == 0.0 {
            0.0
        } else {
            let (r, g, b) = (red as f32, green as f32, blue as f32);
            let mut degrees = if maximum_channel == red {
                60.0 * (g - b) / chroma
            } else if maximum_channel == green {
                120.0 + 60.0 * (b - r) / chroma
            } else {
                240.0 + 60.0 * (r - g) / chroma
            };
            if degrees < 0.0 {
                degrees += 360.0;
            }
            degrees
        };

        Self {
            hue: Self::to_byte(hue_degrees / 2.0),
            saturation: Self::to_byte(saturation),
            value: maximum_channel,
        }
    }

    #[inline]
    fn to_byte(channel: f32) -> u8 {
        channel.round_ties_even().clamp(0.0, 255.0) as u8
    }
}

impl From<&Rgb<u8>> for HsvPixel {
    fn from(pixel: &Rgb<u8>) -> Self {
        let [red, green, blue] = pixel.0;
        Self::from_rgb(red, green, blue)
    }
}
