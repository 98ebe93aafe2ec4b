// Decoded resources: sprite images and sound clips

use image::RgbaImage;

/// A decoded sprite image
#[derive(Debug, Clone)]
pub struct Sprite {
    name: String,
    image: RgbaImage,
}

impl Sprite {
    /// Decode a sprite from PNG or JPEG bytes
    pub fn from_bytes(name: &str, bytes: &[u8]) -> Result<Self, String> {
        let img = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
        Ok(Self::from_image(name, img.to_rgba8()))
    }

    pub fn from_image(name: &str, image: RgbaImage) -> Self {
        Self {
            name: name.to_string(),
            image,
        }
    }

    /// Create a solid color sprite (useful for testing)
    pub fn from_color(name: &str, width: u32, height: u32, color: [u8; 4]) -> Self {
        Self::from_image(name, RgbaImage::from_pixel(width, height, image::Rgba(color)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// Container format recognised from a sound file's signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundFormat {
    Wav,
    Ogg,
    Mp3,
}

impl SoundFormat {
    /// Identify the format from the leading bytes
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => Some(SoundFormat::Wav),
            [b'O', b'g', b'g', b'S', ..] => Some(SoundFormat::Ogg),
            [b'I', b'D', b'3', ..] => Some(SoundFormat::Mp3),
            // Bare MPEG audio frame sync
            [0xFF, second, ..] if second & 0xE0 == 0xE0 => Some(SoundFormat::Mp3),
            _ => None,
        }
    }
}

/// An encoded sound clip. Playback belongs to the host.
#[derive(Debug, Clone)]
pub struct SoundClip {
    name: String,
    format: SoundFormat,
    bytes: Vec<u8>,
}

impl SoundClip {
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<Self, String> {
        let format = SoundFormat::detect(&bytes)
            .ok_or_else(|| "unrecognised audio format (expected WAV, OGG or MP3)".to_string())?;
        Ok(Self {
            name: name.to_string(),
            format,
            bytes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> SoundFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprite_from_png_bytes() {
        let img = RgbaImage::from_pixel(3, 2, image::Rgba([255, 0, 0, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();

        let sprite = Sprite::from_bytes("hero", &bytes).unwrap();
        assert_eq!(sprite.name(), "hero");
        assert_eq!((sprite.width(), sprite.height()), (3, 2));
        assert_eq!(sprite.image().get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_sprite_rejects_garbage() {
        assert!(Sprite::from_bytes("bad", b"hello").is_err());
    }

    #[test]
    fn test_sound_format_detection() {
        assert_eq!(SoundFormat::detect(b"RIFF\0\0\0\0WAVEfmt "), Some(SoundFormat::Wav));
        assert_eq!(SoundFormat::detect(b"OggS\0\x02"), Some(SoundFormat::Ogg));
        assert_eq!(SoundFormat::detect(b"ID3\x04"), Some(SoundFormat::Mp3));
        assert_eq!(SoundFormat::detect(&[0xFF, 0xFB, 0x90]), Some(SoundFormat::Mp3));
        assert_eq!(SoundFormat::detect(b"RIFF\0\0\0\0AVI "), None);
        assert_eq!(SoundFormat::detect(b""), None);
    }

    #[test]
    fn test_sound_clip_keeps_bytes() {
        let clip = SoundClip::from_bytes("jump", b"OggS rest".to_vec()).unwrap();
        assert_eq!(clip.format(), SoundFormat::Ogg);
        assert_eq!(clip.bytes(), b"OggS rest");
        assert!(SoundClip::from_bytes("noise", b"text".to_vec()).is_err());
    }
}
